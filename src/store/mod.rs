//! Narrow interfaces over the document store and the search-index store.
//!
//! Only the operations the scoring pipeline invokes are modeled. The document
//! store exposes revision-checked writes for optimistic concurrency; the index
//! store exposes alias indirection with an atomic batch alias update.

use crate::error::ScoringError;
use serde::{Deserialize, Serialize};

pub mod http;
pub mod memory;

pub use http::{CouchDocStore, EsIndexStore};
pub use memory::{MemoryDocStore, MemoryIndexStore};

/// An opaque document revision used for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(String);

impl Revision {
    #[must_use]
    pub fn new(revision: impl Into<String>) -> Self {
        Self(revision.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Revision {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One element of an atomic alias-update batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    Add { index: String, alias: String },
    Remove { index: String, alias: String },
}

impl AliasAction {
    #[must_use]
    pub fn add(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Add {
            index: index.into(),
            alias: alias.into(),
        }
    }

    #[must_use]
    pub fn remove(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Remove {
            index: index.into(),
            alias: alias.into(),
        }
    }
}

/// An alias bound to a physical index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasBinding {
    pub alias: String,
    pub index: String,
}

/// Key/value document store with revision-checked writes.
pub trait DocStore {
    /// Fetch a document by key, returning `None` when it does not exist.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<(Revision, serde_json::Value)>, ScoringError>> + Send;

    /// Write a document. `expected` must match the stored revision (or be `None`
    /// for a fresh document); a mismatch fails with [`ScoringError::Conflict`].
    fn put(
        &self,
        key: &str,
        expected: Option<&Revision>,
        doc: &serde_json::Value,
    ) -> impl Future<Output = Result<Revision, ScoringError>> + Send;

    /// Delete a document by key and revision. Deleting an absent document succeeds.
    fn delete(&self, key: &str, revision: &Revision) -> impl Future<Output = Result<(), ScoringError>> + Send;
}

/// Search-index store with alias indirection.
pub trait IndexStore {
    fn create_index(&self, name: &str, schema: &serde_json::Value) -> impl Future<Output = Result<(), ScoringError>> + Send;

    fn list_indices(&self) -> impl Future<Output = Result<Vec<String>, ScoringError>> + Send;

    fn list_aliases(&self) -> impl Future<Output = Result<Vec<AliasBinding>, ScoringError>> + Send;

    /// Apply a batch of alias actions in one all-or-nothing call. On failure no
    /// action in the batch may have been applied.
    fn update_aliases(&self, actions: &[AliasAction]) -> impl Future<Output = Result<(), ScoringError>> + Send;

    fn delete_indices(&self, indices: &[String]) -> impl Future<Output = Result<(), ScoringError>> + Send;

    /// Write a document into an index (or through an alias resolving to one).
    fn put_document(
        &self,
        index: &str,
        id: &str,
        doc: &serde_json::Value,
    ) -> impl Future<Output = Result<(), ScoringError>> + Send;
}
