//! HTTP-backed store implementations.
//!
//! [`CouchDocStore`] speaks a CouchDB-style document API (`_rev` revisions,
//! `409` on conflicting writes). [`EsIndexStore`] speaks an Elasticsearch-style
//! index API (`_cat` listings, one `_aliases` batch call for atomic swaps).

use super::{AliasAction, AliasBinding, DocStore, IndexStore, Revision};
use crate::error::ScoringError;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

const LOG_TARGET: &str = "     store";

/// Document ids may contain `/`, which must not split a formatted URL path.
fn encode_key(key: &str) -> String {
    key.replace('%', "%25").replace('/', "%2F")
}

fn join_url(base: &Url, path: &str) -> Result<Url, ScoringError> {
    base.join(path)
        .map_err(|e| ScoringError::store(format!("invalid store URL for '{path}'"), e))
}

/// CouchDB-style [`DocStore`] over HTTP. The base URL must point at a database.
#[derive(Debug, Clone)]
pub struct CouchDocStore {
    client: reqwest::Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    rev: String,
}

impl CouchDocStore {
    #[must_use]
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    fn doc_url(&self, key: &str) -> Result<Url, ScoringError> {
        let mut url = self.base.clone();
        // push() percent-encodes, so a key containing `/` stays one segment.
        url.path_segments_mut()
            .map_err(|()| ScoringError::store("document store URL cannot be a base", self.base.as_str()))?
            .pop_if_empty()
            .push(key);
        Ok(url)
    }
}

impl DocStore for CouchDocStore {
    async fn get(&self, key: &str) -> Result<Option<(Revision, serde_json::Value)>, ScoringError> {
        let url = self.doc_url(key)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoringError::store(format!("fetching document '{key}'"), e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let mut doc: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| ScoringError::store(format!("decoding document '{key}'"), e))?;

                let Some(revision) = doc.get("_rev").and_then(|rev| rev.as_str()).map(Revision::new) else {
                    return Err(ScoringError::store(format!("document '{key}' has no revision"), "missing _rev"));
                };
                if let Some(doc) = doc.as_object_mut() {
                    let _ = doc.remove("_id");
                    let _ = doc.remove("_rev");
                }
                Ok(Some((revision, doc)))
            }
            status => Err(ScoringError::store(format!("fetching document '{key}'"), status)),
        }
    }

    async fn put(&self, key: &str, expected: Option<&Revision>, doc: &serde_json::Value) -> Result<Revision, ScoringError> {
        let url = self.doc_url(key)?;
        let mut body = doc.clone();
        if let (Some(expected), Some(body)) = (expected, body.as_object_mut()) {
            let _ = body.insert("_rev".to_owned(), json!(expected.as_str()));
        }

        let response = self
            .client
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ScoringError::store(format!("writing document '{key}'"), e))?;

        match response.status() {
            StatusCode::CONFLICT => Err(ScoringError::Conflict(key.to_owned())),
            status if status.is_success() => {
                let write: WriteResponse = response
                    .json()
                    .await
                    .map_err(|e| ScoringError::store(format!("decoding write response for '{key}'"), e))?;
                Ok(Revision::new(write.rev))
            }
            status => Err(ScoringError::store(format!("writing document '{key}'"), status)),
        }
    }

    async fn delete(&self, key: &str, revision: &Revision) -> Result<(), ScoringError> {
        let mut url = self.doc_url(key)?;
        let _ = url.query_pairs_mut().append_pair("rev", revision.as_str());

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| ScoringError::store(format!("deleting document '{key}'"), e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            StatusCode::CONFLICT => Err(ScoringError::Conflict(key.to_owned())),
            status if status.is_success() => Ok(()),
            status => Err(ScoringError::store(format!("deleting document '{key}'"), status)),
        }
    }
}

/// Elasticsearch-style [`IndexStore`] over HTTP.
#[derive(Debug, Clone)]
pub struct EsIndexStore {
    client: reqwest::Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct CatIndexRow {
    index: String,
}

#[derive(Debug, Deserialize)]
struct CatAliasRow {
    alias: String,
    index: String,
}

impl EsIndexStore {
    #[must_use]
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    async fn expect_success(response: reqwest::Response, context: &str) -> Result<reqwest::Response, ScoringError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        log::debug!(target: LOG_TARGET, "{context} failed with {status}: {body}");
        Err(ScoringError::store(context.to_owned(), status))
    }
}

impl IndexStore for EsIndexStore {
    async fn create_index(&self, name: &str, schema: &serde_json::Value) -> Result<(), ScoringError> {
        let url = join_url(&self.base, name)?;
        let response = self
            .client
            .put(url)
            .json(schema)
            .send()
            .await
            .map_err(|e| ScoringError::store(format!("creating index '{name}'"), e))?;
        let _ = Self::expect_success(response, &format!("creating index '{name}'")).await?;
        Ok(())
    }

    async fn list_indices(&self) -> Result<Vec<String>, ScoringError> {
        let url = join_url(&self.base, "_cat/indices?format=json&h=index")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoringError::store("listing indices", e))?;
        let rows: Vec<CatIndexRow> = Self::expect_success(response, "listing indices")
            .await?
            .json()
            .await
            .map_err(|e| ScoringError::store("decoding index listing", e))?;
        Ok(rows.into_iter().map(|row| row.index).collect())
    }

    async fn list_aliases(&self) -> Result<Vec<AliasBinding>, ScoringError> {
        let url = join_url(&self.base, "_cat/aliases?format=json&h=alias,index")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ScoringError::store("listing aliases", e))?;
        let rows: Vec<CatAliasRow> = Self::expect_success(response, "listing aliases")
            .await?
            .json()
            .await
            .map_err(|e| ScoringError::store("decoding alias listing", e))?;
        Ok(rows
            .into_iter()
            .map(|row| AliasBinding {
                alias: row.alias,
                index: row.index,
            })
            .collect())
    }

    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), ScoringError> {
        let actions: Vec<serde_json::Value> = actions
            .iter()
            .map(|action| match action {
                AliasAction::Add { index, alias } => json!({"add": {"index": index, "alias": alias}}),
                AliasAction::Remove { index, alias } => json!({"remove": {"index": index, "alias": alias}}),
            })
            .collect();

        let url = join_url(&self.base, "_aliases")?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "actions": actions }))
            .send()
            .await
            .map_err(|e| ScoringError::store("updating aliases", e))?;
        let _ = Self::expect_success(response, "updating aliases").await?;
        Ok(())
    }

    async fn delete_indices(&self, indices: &[String]) -> Result<(), ScoringError> {
        if indices.is_empty() {
            return Ok(());
        }

        let url = join_url(&self.base, &indices.join(","))?;
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| ScoringError::store("deleting indices", e))?;
        let _ = Self::expect_success(response, "deleting indices").await?;
        Ok(())
    }

    async fn put_document(&self, index: &str, id: &str, doc: &serde_json::Value) -> Result<(), ScoringError> {
        let url = join_url(&self.base, &format!("{index}/_doc/{}", encode_key(id)))?;
        let response = self
            .client
            .put(url)
            .json(doc)
            .send()
            .await
            .map_err(|e| ScoringError::store(format!("indexing document '{id}'"), e))?;
        let _ = Self::expect_success(response, &format!("indexing document '{id}'")).await?;
        Ok(())
    }
}
