//! Scores software packages for quality, popularity, and maintenance, and
//! publishes the results into a search index with zero-downtime swaps.
//!
//! # Commands
//!
//! **Derive evaluations from collected records:**
//! ```bash
//! pkgrank evaluate records.ndjson --output evaluations.ndjson
//! ```
//!
//! **Build the population aggregation:**
//! ```bash
//! pkgrank aggregate evaluations.ndjson --output aggregation.json
//! ```
//!
//! **Score evaluations against an aggregation:**
//! ```bash
//! pkgrank score evaluations.ndjson --aggregation aggregation.json
//! ```
//!
//! **Run a full scoring cycle against the configured stores:**
//! ```bash
//! pkgrank cycle records.ndjson \
//!     --doc-store-url http://127.0.0.1:5984/pkgrank \
//!     --index-store-url http://127.0.0.1:9200
//! ```
//!
//! When no store URLs are given, the cycle runs against in-memory stores,
//! which is useful for dry runs over a records file.

use clap::{Parser, Subcommand};
use pkgrank::Result;
use pkgrank::commands::{
    AggregateArgs, CycleArgs, EvaluateArgs, ScoreArgs, process_aggregate, process_cycle, process_evaluate, process_score,
};

#[derive(Parser, Debug)]
#[command(name = "pkgrank", version, about = "Package scoring and search-index publishing")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive metric evaluations from collected records
    Evaluate(EvaluateArgs),
    /// Build a population aggregation from evaluations
    Aggregate(AggregateArgs),
    /// Score evaluations against an aggregation
    Score(ScoreArgs),
    /// Run a full scoring cycle against the configured stores
    Cycle(CycleArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Evaluate(args) => process_evaluate(&args),
        Command::Aggregate(args) => process_aggregate(&args),
        Command::Score(args) => process_score(&args),
        Command::Cycle(args) => process_cycle(&args).await,
    }
}
