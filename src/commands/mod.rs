//! The offline commands: thin adapters over the extractor, aggregator, scorer,
//! and cycle interfaces, trading JSON lines through flat files.

mod aggregate;
mod common;
mod cycle;
mod evaluate;
mod score;

pub use aggregate::{AggregateArgs, process_aggregate};
pub use cycle::{CycleArgs, process_cycle};
pub use evaluate::{EvaluateArgs, process_evaluate};
pub use score::{ScoreArgs, process_score};
