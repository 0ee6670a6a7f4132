use super::common::{read_json_lines, write_json_lines};
use crate::Result;
use crate::config::ConfigArgs;
use crate::measure::Evaluation;
use crate::scoring::AggregationReference;
use crate::scoring::score::score;
use clap::Parser;
use ohno::IntoAppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct ScoreArgs {
    /// File with one evaluation JSON document per line
    #[arg(value_name = "EVALUATIONS")]
    pub evaluations: PathBuf,

    /// Aggregation reference document to normalize against
    #[arg(long, value_name = "PATH")]
    pub aggregation: PathBuf,

    /// Output file for score lines [default: stdout]
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Score evaluation lines against an aggregation document.
pub fn process_score(args: &ScoreArgs) -> Result<()> {
    args.config.init_logging();

    let evaluations: Vec<Evaluation> = read_json_lines(&args.evaluations)?;
    let contents = std::fs::read_to_string(&args.aggregation)
        .into_app_err_with(|| format!("unable to read {}", args.aggregation.display()))?;
    let reference: AggregationReference = serde_json::from_str(&contents)
        .into_app_err_with(|| format!("invalid aggregation document {}", args.aggregation.display()))?;

    let scores = evaluations
        .iter()
        .map(|evaluation| score(evaluation, &reference))
        .collect::<Result<Vec<_>>>()?;

    write_json_lines(args.output.as_deref(), &scores)
}
