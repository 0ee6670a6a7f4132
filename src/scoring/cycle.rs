//! One full scoring cycle: evaluate, aggregate, score, publish.

use super::aggregate::{AggregationStore, aggregate};
use super::publisher::{IndexGeneration, Publisher};
use super::score::score;
use crate::collected::CollectedRecord;
use crate::error::{ErrorKind, ScoringError};
use crate::measure::{Evaluation, evaluate};
use crate::store::{DocStore, IndexStore};
use chrono::Utc;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Semaphore;

const LOG_TARGET: &str = "     cycle";

/// A package whose analysis failed, recorded so the population reflects its
/// absence. Unrecoverable entries are explicitly not requeued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedAnalysis {
    pub name: String,
    pub kind: ErrorKind,
    pub unrecoverable: bool,
    pub error: String,
}

/// What a completed scoring cycle produced.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Number of packages scored and published.
    pub scored: usize,
    /// Packages whose analysis failed this cycle.
    pub failed: Vec<FailedAnalysis>,
    /// The promoted index generation, absent when the population was empty.
    pub generation: Option<IndexGeneration>,
}

/// Orchestrates a scoring cycle over independent, parallel package analyses.
///
/// Per-package work is bounded by a semaphore and suspends only on I/O; the
/// aggregation document and the promotion call are the only shared points.
#[derive(Debug)]
pub struct ScoringCycle<D, I> {
    aggregations: AggregationStore<D>,
    doc_store: D,
    publisher: Publisher<I>,
    concurrency: usize,
}

impl<D, I> ScoringCycle<D, I>
where
    D: DocStore + Clone + Send + Sync + 'static,
    I: IndexStore + Send + Sync,
{
    pub fn new(doc_store: D, index_store: I, concurrency: usize) -> Self {
        Self {
            aggregations: AggregationStore::new(doc_store.clone()),
            doc_store,
            publisher: Publisher::new(index_store),
            concurrency: concurrency.max(1),
        }
    }

    /// Run one cycle over the given collected records.
    pub async fn run(&self, records: Vec<(String, CollectedRecord)>) -> Result<CycleOutcome, ScoringError> {
        let total = records.len();
        log::info!(target: LOG_TARGET, "Starting scoring cycle over {total} packages");

        let (evaluations, failed) = self.evaluate_all(records).await;
        for failure in &failed {
            self.record_failure(failure).await;
        }

        let Some(reference) = aggregate(evaluations.iter().map(|(_, evaluation)| evaluation))
            .map_err(|e| ScoringError::store("aggregating evaluations", e))?
        else {
            log::info!(target: LOG_TARGET, "No evaluations produced, nothing to publish");
            return Ok(CycleOutcome {
                scored: 0,
                failed,
                generation: None,
            });
        };

        let _ = self.aggregations.save(&reference).await?;
        log::info!(target: LOG_TARGET, "Aggregated {} evaluations", reference.population);

        let generation = self.publisher.stage().await?;
        let analyzed_at = Utc::now();
        let mut scored = 0_usize;
        for (name, evaluation) in &evaluations {
            let package_score =
                score(evaluation, &reference).map_err(|e| ScoringError::store(format!("scoring package '{name}'"), e))?;
            let doc = json!({
                "name": name,
                "analyzedAt": analyzed_at,
                "evaluation": evaluation,
                "score": package_score,
            });
            self.publisher.publish_document(&generation, name, &doc).await?;
            scored += 1;
        }

        self.publisher.promote(&generation).await?;
        self.publisher.retire(&generation).await;
        log::info!(target: LOG_TARGET, "Scoring cycle published {scored} packages ({} failed)", failed.len());

        Ok(CycleOutcome {
            scored,
            failed,
            generation: Some(generation),
        })
    }

    /// Evaluate every package through the bounded worker pool.
    async fn evaluate_all(&self, records: Vec<(String, CollectedRecord)>) -> (Vec<(String, Evaluation)>, Vec<FailedAnalysis>) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));

        let tasks = records.into_iter().map(|(name, record)| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore is never closed");
                let result = evaluate(&record);
                (name, result)
            }
        });

        let mut evaluations = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in join_all(tasks).await {
            match result {
                Ok(evaluation) => evaluations.push((name, evaluation)),
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Analysis of '{name}' failed: {e}");
                    failed.push(FailedAnalysis {
                        name,
                        kind: e.kind(),
                        unrecoverable: e.is_unrecoverable(),
                        error: e.to_string(),
                    });
                }
            }
        }

        (evaluations, failed)
    }

    /// Record a failed analysis in the document store, best effort.
    async fn record_failure(&self, failure: &FailedAnalysis) {
        let key = format!("failed/{}", failure.name);
        let doc = match serde_json::to_value(failure) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not encode failure entry for '{}': {e}", failure.name);
                return;
            }
        };

        let result = async {
            let current = self.doc_store.get(&key).await?.map(|(revision, _)| revision);
            self.doc_store.put(&key, current.as_ref(), &doc).await
        }
        .await;

        if let Err(e) = result {
            log::warn!(target: LOG_TARGET, "Could not record failed analysis for '{}': {e}", failure.name);
        }
    }
}
