use super::common::{read_json_lines, write_output};
use crate::Result;
use crate::config::ConfigArgs;
use crate::measure::Evaluation;
use crate::scoring::aggregate::aggregate;
use clap::Parser;
use ohno::{IntoAppError, bail};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct AggregateArgs {
    /// File with one evaluation JSON document per line
    #[arg(value_name = "EVALUATIONS")]
    pub evaluations: PathBuf,

    /// Output file for the aggregation document [default: stdout]
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Build a population aggregation document from evaluation lines.
pub fn process_aggregate(args: &AggregateArgs) -> Result<()> {
    args.config.init_logging();

    let evaluations: Vec<Evaluation> = read_json_lines(&args.evaluations)?;
    let Some(reference) = aggregate(&evaluations)? else {
        bail!("{} holds no evaluations to aggregate", args.evaluations.display());
    };

    let mut doc = serde_json::to_string_pretty(&reference).into_app_err("unable to encode aggregation")?;
    doc.push('\n');
    write_output(args.output.as_deref(), &doc)
}
