use super::common::{read_json_lines, write_json_lines};
use crate::Result;
use crate::collected::CollectedRecord;
use crate::config::ConfigArgs;
use crate::measure::evaluate;
use clap::Parser;
use std::path::PathBuf;

const LOG_TARGET: &str = "  commands";

#[derive(Parser, Debug)]
pub struct EvaluateArgs {
    /// File with one collected record JSON document per line
    #[arg(value_name = "RECORDS")]
    pub records: PathBuf,

    /// Output file for evaluation lines [default: stdout]
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Derive metric evaluations from collected records, one JSON line each.
pub fn process_evaluate(args: &EvaluateArgs) -> Result<()> {
    args.config.init_logging();

    let records: Vec<CollectedRecord> = read_json_lines(&args.records)?;
    let mut evaluations = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        match evaluate(record) {
            Ok(evaluation) => evaluations.push(evaluation),
            Err(e) => {
                let name = record
                    .metadata
                    .as_ref()
                    .map_or_else(|| format!("line {}", index + 1), |metadata| metadata.name.clone());
                log::warn!(target: LOG_TARGET, "Skipping '{name}': {e}");
            }
        }
    }

    write_json_lines(args.output.as_deref(), &evaluations)
}
