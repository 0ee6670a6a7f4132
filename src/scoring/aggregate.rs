//! Population statistics over all evaluations.
//!
//! Raw metric values mean nothing in isolation; the aggregation reference maps
//! every metric leaf to the distribution of that metric across the whole analyzed
//! population, so the scorer can rank a package relative to its peers.

use crate::Result;
use crate::error::ScoringError;
use crate::measure::Evaluation;
use crate::store::{DocStore, Revision};
use chrono::{DateTime, Utc};
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const LOG_TARGET: &str = " aggregate";

/// Fixed logical id of the aggregation document.
pub const AGGREGATION_KEY: &str = "scoring/aggregation";

/// Share trimmed from each end of a metric's sorted values to normalize skewness.
const TRIM_PERCENTAGE: f64 = 0.01;

/// Maximum read-modify-write attempts before an optimistic-concurrency write
/// gives up.
const MAX_WRITE_ATTEMPTS: u32 = 5;

/// Distribution statistics for one metric leaf across the population.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub truncated_mean: f64,
    pub median: f64,
}

/// Population-wide per-metric statistics, rebuilt wholesale each scoring cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationReference {
    pub aggregated_at: DateTime<Utc>,
    pub population: usize,
    pub metrics: BTreeMap<String, MetricStats>,
}

impl AggregationReference {
    /// Look up the stats for a dotted metric leaf path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&MetricStats> {
        self.metrics.get(path)
    }
}

/// Flatten an evaluation into dotted leaf-path to value pairs.
///
/// Booleans count as 0/1 so every leaf has a distribution; unmeasurable
/// (`null`) leaves are skipped entirely, which keeps "no data" distinct from
/// "measured zero" all the way through scoring.
pub fn flatten(evaluation: &Evaluation) -> Result<BTreeMap<String, f64>> {
    let value = serde_json::to_value(evaluation).into_app_err("unable to flatten evaluation")?;
    let mut leaves = BTreeMap::new();
    collect_leaves(&value, String::new(), &mut leaves);
    Ok(leaves)
}

fn collect_leaves(value: &serde_json::Value, prefix: String, leaves: &mut BTreeMap<String, f64>) {
    match value {
        serde_json::Value::Object(fields) => {
            for (key, nested) in fields {
                let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                collect_leaves(nested, path, leaves);
            }
        }
        serde_json::Value::Number(number) => {
            if let Some(number) = number.as_f64()
                && number.is_finite()
            {
                let _ = leaves.insert(prefix, number);
            }
        }
        serde_json::Value::Bool(flag) => {
            let _ = leaves.insert(prefix, if *flag { 1.0 } else { 0.0 });
        }
        _ => {}
    }
}

/// Statistics over one leaf's sorted, non-negative values.
///
/// The median picks index `round(n/2)` rather than the conventional middle;
/// downstream consumers depend on the observed behavior, so it is kept (the
/// index is clamped so a single-element population stays in bounds).
fn stats(sorted: &[f64]) -> Option<MetricStats> {
    if sorted.is_empty() {
        return None;
    }

    let n = sorted.len();
    let trim = ((n as f64) * TRIM_PERCENTAGE).round() as usize;
    let trimmed = if trim * 2 < n {
        &sorted[trim..n - trim]
    } else {
        // Trimming would drop everything; keep at least the middle element.
        &sorted[n / 2..=n / 2]
    };
    let median_index = ((n as f64) / 2.0).round() as usize;

    Some(MetricStats {
        min: sorted[0],
        max: sorted[n - 1],
        mean: mean(sorted),
        truncated_mean: mean(trimmed),
        median: sorted[median_index.min(n - 1)],
    })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Aggregate the full population of evaluations into one reference.
///
/// Negative values are dropped per leaf before computing statistics: metrics
/// like acceleration go negative for declining packages, which would otherwise
/// distort the score curve. An empty population yields no aggregation.
pub fn aggregate<'a>(evaluations: impl IntoIterator<Item = &'a Evaluation>) -> Result<Option<AggregationReference>> {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut population = 0_usize;

    for evaluation in evaluations {
        population += 1;
        for (path, value) in flatten(evaluation)? {
            if value >= 0.0 {
                grouped.entry(path).or_default().push(value);
            }
        }
    }

    if population == 0 {
        log::debug!(target: LOG_TARGET, "There are no evaluations yet");
        return Ok(None);
    }

    let metrics = grouped
        .into_iter()
        .filter_map(|(path, mut values)| {
            values.sort_by(|a, b| a.partial_cmp(b).expect("non-finite values are filtered out"));
            stats(&values).map(|stats| (path, stats))
        })
        .collect();

    Ok(Some(AggregationReference {
        aggregated_at: Utc::now(),
        population,
        metrics,
    }))
}

/// The aggregation singleton behind a narrow, revision-checked interface.
///
/// Multiple process instances may race on the document, so every write is a
/// versioned read followed by a conditional write, retried wholesale on
/// conflict.
#[derive(Debug, Clone)]
pub struct AggregationStore<S> {
    store: S,
}

impl<S: DocStore> AggregationStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetch the latest committed aggregation.
    ///
    /// Callers must treat [`ScoringError::AggregationNotFound`] as expected:
    /// it simply means the first scoring cycle has not yet run.
    pub async fn get(&self) -> Result<AggregationReference, ScoringError> {
        let Some((_, doc)) = self.store.get(AGGREGATION_KEY).await? else {
            return Err(ScoringError::AggregationNotFound);
        };

        serde_json::from_value(doc).map_err(|e| ScoringError::store("decoding aggregation document", e))
    }

    /// Save a freshly computed aggregation, superseding the previous revision.
    pub async fn save(&self, aggregation: &AggregationReference) -> Result<Revision, ScoringError> {
        let doc = serde_json::to_value(aggregation).map_err(|e| ScoringError::store("encoding aggregation document", e))?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = self.store.get(AGGREGATION_KEY).await?.map(|(revision, _)| revision);

            match self.store.put(AGGREGATION_KEY, current.as_ref(), &doc).await {
                Ok(revision) => {
                    log::debug!(target: LOG_TARGET, "Saved aggregation at revision {revision}");
                    return Ok(revision);
                }
                Err(ScoringError::Conflict(_)) => {
                    log::warn!(target: LOG_TARGET, "Conflict while storing aggregation (attempt {attempt}/{MAX_WRITE_ATTEMPTS})");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ScoringError::RetriesExhausted {
            key: AGGREGATION_KEY.to_owned(),
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    /// Remove the aggregation. Removing an absent aggregation succeeds.
    pub async fn remove(&self) -> Result<(), ScoringError> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let Some((revision, _)) = self.store.get(AGGREGATION_KEY).await? else {
                return Ok(());
            };

            match self.store.delete(AGGREGATION_KEY, &revision).await {
                Ok(()) => {
                    log::debug!(target: LOG_TARGET, "Aggregation removed");
                    return Ok(());
                }
                Err(ScoringError::Conflict(_)) => {
                    log::warn!(target: LOG_TARGET, "Conflict while removing aggregation (attempt {attempt}/{MAX_WRITE_ATTEMPTS})");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ScoringError::RetriesExhausted {
            key: AGGREGATION_KEY.to_owned(),
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }
}
