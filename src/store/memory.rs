//! In-memory store implementations.
//!
//! Used by the offline commands when no store URLs are configured, and by tests,
//! which additionally rely on the fault-injection hooks to exercise conflict and
//! partial-failure paths.

use super::{AliasAction, AliasBinding, DocStore, IndexStore, Revision};
use crate::error::ScoringError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory [`DocStore`] with revision-checked writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocStore {
    inner: Arc<MemoryDocStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryDocStoreInner {
    docs: Mutex<BTreeMap<String, (Revision, serde_json::Value)>>,
    sequence: AtomicU64,
    forced_conflicts: AtomicUsize,
}

impl MemoryDocStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the next `count` writes to fail with a conflict, regardless of the
    /// revision supplied. Exercises the optimistic-concurrency retry path.
    pub fn inject_conflicts(&self, count: usize) {
        self.inner.forced_conflicts.store(count, Ordering::SeqCst);
    }

    fn next_revision(&self) -> Revision {
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Revision::new(sequence.to_string())
    }

    fn take_forced_conflict(&self) -> bool {
        self.inner
            .forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| remaining.checked_sub(1))
            .is_ok()
    }
}

impl DocStore for MemoryDocStore {
    async fn get(&self, key: &str) -> Result<Option<(Revision, serde_json::Value)>, ScoringError> {
        let docs = self.inner.docs.lock().expect("lock not poisoned");
        Ok(docs.get(key).cloned())
    }

    async fn put(&self, key: &str, expected: Option<&Revision>, doc: &serde_json::Value) -> Result<Revision, ScoringError> {
        if self.take_forced_conflict() {
            return Err(ScoringError::Conflict(key.to_owned()));
        }

        let mut docs = self.inner.docs.lock().expect("lock not poisoned");
        let current = docs.get(key).map(|(revision, _)| revision);
        if current != expected {
            return Err(ScoringError::Conflict(key.to_owned()));
        }

        let revision = self.next_revision();
        let _ = docs.insert(key.to_owned(), (revision.clone(), doc.clone()));
        Ok(revision)
    }

    async fn delete(&self, key: &str, revision: &Revision) -> Result<(), ScoringError> {
        let mut docs = self.inner.docs.lock().expect("lock not poisoned");
        match docs.get(key) {
            None => Ok(()),
            Some((current, _)) if current == revision => {
                let _ = docs.remove(key);
                Ok(())
            }
            Some(_) => Err(ScoringError::Conflict(key.to_owned())),
        }
    }
}

#[derive(Debug, Default)]
struct Index {
    schema: serde_json::Value,
    docs: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default)]
struct IndexStoreState {
    indices: BTreeMap<String, Index>,
    /// alias name -> bound indices
    aliases: BTreeMap<String, BTreeSet<String>>,
}

/// In-memory [`IndexStore`]. Alias batches are validated up front and applied
/// all-or-nothing, matching the contract of the real store.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndexStore {
    state: Arc<Mutex<IndexStoreState>>,
    forced_alias_failures: Arc<AtomicUsize>,
}

impl MemoryIndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` alias-update batches without applying any action.
    pub fn inject_alias_failures(&self, count: usize) {
        self.forced_alias_failures.store(count, Ordering::SeqCst);
    }

    /// Indices currently bound to `alias`.
    #[must_use]
    pub fn holders_of(&self, alias: &str) -> Vec<String> {
        let state = self.state.lock().expect("lock not poisoned");
        state
            .aliases
            .get(alias)
            .map(|indices| indices.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Documents stored in a physical index, by id.
    #[must_use]
    pub fn documents(&self, index: &str) -> BTreeMap<String, serde_json::Value> {
        let state = self.state.lock().expect("lock not poisoned");
        state.indices.get(index).map(|index| index.docs.clone()).unwrap_or_default()
    }

    fn resolve(state: &IndexStoreState, name: &str) -> Result<String, ScoringError> {
        if state.indices.contains_key(name) {
            return Ok(name.to_owned());
        }

        let Some(bound) = state.aliases.get(name) else {
            return Err(ScoringError::store(
                format!("no index or alias named '{name}'"),
                "not found",
            ));
        };
        if bound.len() != 1 {
            return Err(ScoringError::store(
                format!("alias '{name}' does not resolve to exactly one index"),
                format!("{} bindings", bound.len()),
            ));
        }
        Ok(bound.iter().next().expect("checked non-empty").clone())
    }
}

impl IndexStore for MemoryIndexStore {
    async fn create_index(&self, name: &str, schema: &serde_json::Value) -> Result<(), ScoringError> {
        let mut state = self.state.lock().expect("lock not poisoned");
        if state.indices.contains_key(name) {
            return Err(ScoringError::store(format!("index '{name}' already exists"), "exists"));
        }

        let _ = state.indices.insert(
            name.to_owned(),
            Index {
                schema: schema.clone(),
                docs: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn list_indices(&self) -> Result<Vec<String>, ScoringError> {
        let state = self.state.lock().expect("lock not poisoned");
        Ok(state.indices.keys().cloned().collect())
    }

    async fn list_aliases(&self) -> Result<Vec<AliasBinding>, ScoringError> {
        let state = self.state.lock().expect("lock not poisoned");
        Ok(state
            .aliases
            .iter()
            .flat_map(|(alias, indices)| {
                indices.iter().map(|index| AliasBinding {
                    alias: alias.clone(),
                    index: index.clone(),
                })
            })
            .collect())
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), ScoringError> {
        if self
            .forced_alias_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| remaining.checked_sub(1))
            .is_ok()
        {
            return Err(ScoringError::store("alias update rejected", "injected fault"));
        }

        let mut state = self.state.lock().expect("lock not poisoned");

        // Validate the whole batch before touching anything: a rejected batch
        // must leave the alias table untouched.
        for action in actions {
            let (AliasAction::Add { index, .. } | AliasAction::Remove { index, .. }) = action;
            if !state.indices.contains_key(index) {
                return Err(ScoringError::store(
                    format!("alias action references unknown index '{index}'"),
                    "not found",
                ));
            }
        }

        for action in actions {
            match action {
                AliasAction::Add { index, alias } => {
                    let _ = state.aliases.entry(alias.clone()).or_default().insert(index.clone());
                }
                AliasAction::Remove { index, alias } => {
                    if let Some(bound) = state.aliases.get_mut(alias) {
                        let _ = bound.remove(index);
                        if bound.is_empty() {
                            let _ = state.aliases.remove(alias);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete_indices(&self, indices: &[String]) -> Result<(), ScoringError> {
        let mut state = self.state.lock().expect("lock not poisoned");
        for name in indices {
            let _ = state.indices.remove(name);
            let empty: Vec<String> = state
                .aliases
                .iter_mut()
                .filter_map(|(alias, bound)| {
                    let _ = bound.remove(name);
                    bound.is_empty().then(|| alias.clone())
                })
                .collect();
            for alias in empty {
                let _ = state.aliases.remove(&alias);
            }
        }
        Ok(())
    }

    async fn put_document(&self, index: &str, id: &str, doc: &serde_json::Value) -> Result<(), ScoringError> {
        let mut state = self.state.lock().expect("lock not poisoned");
        let physical = Self::resolve(&state, index)?;
        let target = state.indices.get_mut(&physical).expect("resolved index exists");
        let _ = target.docs.insert(id.to_owned(), doc.clone());
        Ok(())
    }
}
