//! The scoring pipeline: population aggregation, per-package scoring, and
//! zero-downtime index publishing.
//!
//! One scoring cycle rebuilds the aggregation reference from every evaluation,
//! scores each package relative to it, and republishes a fresh index generation
//! behind the `current` alias.

pub mod aggregate;
pub mod cycle;
pub mod publisher;
pub mod score;

pub use aggregate::{AGGREGATION_KEY, AggregationReference, AggregationStore, MetricStats};
pub use cycle::{CycleOutcome, FailedAnalysis, ScoringCycle};
pub use publisher::{CURRENT_ALIAS, IndexGeneration, NEW_ALIAS, Publisher};
pub use score::{Score, ScoreDetail};
