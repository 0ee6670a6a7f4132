//! Zero-downtime index publishing through alias indirection.
//!
//! Each scoring cycle builds a fresh timestamped index behind the private
//! `new` alias while query traffic keeps resolving the `current` alias. The
//! swap to the fresh index happens in a single atomic alias batch, so at every
//! observable instant exactly one index holds `current`.

use crate::error::ScoringError;
use crate::store::{AliasAction, IndexStore};
use chrono::Utc;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicI64, Ordering};

const LOG_TARGET: &str = " publisher";

/// Prefix of every index generation this publisher manages.
const INDEX_PREFIX: &str = "pkgrank";

/// Alias resolved by query traffic.
pub const CURRENT_ALIAS: &str = "pkgrank-current";

/// Private write target during a scoring cycle; never queried.
pub const NEW_ALIAS: &str = "pkgrank-new";

/// Matches timestamped index generations, ignoring any foreign index that
/// happens to live in the same store.
static GENERATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^pkgrank-\d+$").expect("valid pattern"));

/// The fixed schema every index generation is created from.
static INDEX_SCHEMA: LazyLock<serde_json::Value> =
    LazyLock::new(|| serde_json::from_str(include_str!("../../config/index-schema.json")).expect("embedded schema is valid JSON"));

/// Millisecond timestamp of the last generation name handed out, bumped past
/// the clock when two cycles stage within the same millisecond.
static LAST_GENERATION_MS: AtomicI64 = AtomicI64::new(0);

fn next_generation_name() -> String {
    let now = Utc::now().timestamp_millis();
    let unique = LAST_GENERATION_MS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(last.max(now - 1) + 1))
        .expect("update closure never rejects")
        .max(now - 1)
        + 1;
    format!("{INDEX_PREFIX}-{unique}")
}

/// One staged index generation: the fresh write target plus the indices that
/// held `current` when staging ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexGeneration {
    pub new_index: String,
    pub previous_current: Vec<String>,
}

/// Publishes scored documents with an atomic `current` alias swap.
#[derive(Debug, Clone)]
pub struct Publisher<S> {
    store: S,
}

impl<S: IndexStore> Publisher<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Stage a new index generation.
    ///
    /// Creates a fresh timestamped index, rebinds the `new` alias to it, and
    /// opportunistically deletes generations bound to neither `current` nor the
    /// fresh index. A failure here leaves the serving `current` alias untouched,
    /// so staging is always safe to retry.
    pub async fn stage(&self) -> Result<IndexGeneration, ScoringError> {
        log::info!(target: LOG_TARGET, "Preparing scoring cycle");

        let indices: Vec<String> = self
            .store
            .list_indices()
            .await?
            .into_iter()
            .filter(|index| GENERATION_PATTERN.is_match(index))
            .collect();

        let mut previous_current = Vec::new();
        let mut previous_new = Vec::new();
        for binding in self.store.list_aliases().await? {
            match binding.alias.as_str() {
                CURRENT_ALIAS => previous_current.push(binding.index),
                NEW_ALIAS => previous_new.push(binding.index),
                _ => {}
            }
        }

        let new_index = next_generation_name();
        self.store.create_index(&new_index, &INDEX_SCHEMA).await?;
        log::debug!(target: LOG_TARGET, "Created index {new_index}");

        let mut actions: Vec<AliasAction> = previous_new
            .iter()
            .map(|index| AliasAction::remove(index, NEW_ALIAS))
            .collect();
        actions.push(AliasAction::add(&new_index, NEW_ALIAS));
        self.store.update_aliases(&actions).await?;
        log::debug!(target: LOG_TARGET, "Bound {NEW_ALIAS} to {new_index}");

        // Leftovers from crashed cycles. Their deletion is best-effort; the
        // next cycle will sweep whatever this one cannot.
        let keep: BTreeSet<&str> = previous_current
            .iter()
            .map(String::as_str)
            .chain([new_index.as_str()])
            .collect();
        let stale: Vec<String> = indices.into_iter().filter(|index| !keep.contains(index.as_str())).collect();
        if !stale.is_empty() {
            if let Err(e) = self.store.delete_indices(&stale).await {
                log::warn!(target: LOG_TARGET, "Could not delete stale indices {stale:?}: {e}");
            } else {
                log::debug!(target: LOG_TARGET, "Deleted stale indices {stale:?}");
            }
        }

        Ok(IndexGeneration {
            new_index,
            previous_current,
        })
    }

    /// Write one scored package document into the staged index.
    pub async fn publish_document(
        &self,
        generation: &IndexGeneration,
        name: &str,
        doc: &serde_json::Value,
    ) -> Result<(), ScoringError> {
        self.store.put_document(&generation.new_index, name, doc).await
    }

    /// Promote the staged index to `current`.
    ///
    /// The removal of `current` from its previous holders, the removal of
    /// `new`, and the addition of `current` to the fresh index must travel in
    /// ONE atomic batch. Splitting this into sequential calls would open a
    /// window where zero or two indices hold `current`; a rejected batch
    /// leaves the pre-promotion state intact and retryable.
    pub async fn promote(&self, generation: &IndexGeneration) -> Result<(), ScoringError> {
        let mut actions: Vec<AliasAction> = generation
            .previous_current
            .iter()
            .map(|index| AliasAction::remove(index, CURRENT_ALIAS))
            .collect();
        actions.push(AliasAction::remove(&generation.new_index, NEW_ALIAS));
        actions.push(AliasAction::add(&generation.new_index, CURRENT_ALIAS));

        self.store.update_aliases(&actions).await?;
        log::info!(target: LOG_TARGET, "Promoted {} to {CURRENT_ALIAS}", generation.new_index);
        Ok(())
    }

    /// Delete the indices that held `current` before promotion.
    ///
    /// Failures are logged and swallowed: the swap already happened, and stale
    /// generations are swept again during the next staging.
    pub async fn retire(&self, generation: &IndexGeneration) {
        let retired: Vec<String> = generation
            .previous_current
            .iter()
            .filter(|index| **index != generation.new_index)
            .cloned()
            .collect();
        if retired.is_empty() {
            return;
        }

        match self.store.delete_indices(&retired).await {
            Ok(()) => log::debug!(target: LOG_TARGET, "Removed retired indices {retired:?}"),
            Err(e) => log::warn!(target: LOG_TARGET, "Could not remove retired indices {retired:?}: {e}"),
        }
    }
}
