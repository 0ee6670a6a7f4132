use super::common::{read_json_lines, write_output};
use crate::Result;
use crate::collected::CollectedRecord;
use crate::config::ConfigArgs;
use crate::scoring::{CycleOutcome, ScoringCycle};
use crate::store::{CouchDocStore, DocStore, EsIndexStore, IndexStore, MemoryDocStore, MemoryIndexStore};
use clap::Parser;
use ohno::IntoAppError;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct CycleArgs {
    /// File with one collected record JSON document per line
    #[arg(value_name = "RECORDS")]
    pub records: PathBuf,

    /// Output file for the cycle summary [default: stdout]
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("pkgrank")
        .build()
        .into_app_err("unable to build HTTP client")
}

async fn run<D, I>(doc_store: D, index_store: I, records: Vec<(String, CollectedRecord)>, concurrency: usize) -> Result<CycleOutcome>
where
    D: DocStore + Clone + Send + Sync + 'static,
    I: IndexStore + Send + Sync,
{
    ScoringCycle::new(doc_store, index_store, concurrency)
        .run(records)
        .await
        .into_app_err("scoring cycle failed")
}

/// Run a full scoring cycle from a records file against the configured stores.
pub async fn process_cycle(args: &CycleArgs) -> Result<()> {
    args.config.init_logging();

    let records: Vec<CollectedRecord> = read_json_lines(&args.records)?;
    let named: Vec<(String, CollectedRecord)> = records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let name = record
                .metadata
                .as_ref()
                .map_or_else(|| format!("package-{}", index + 1), |metadata| metadata.name.clone());
            (name, record)
        })
        .collect();

    let concurrency = args.config.concurrency;
    let outcome = match (args.config.doc_store_url.clone(), args.config.index_store_url.clone()) {
        (None, None) => run(MemoryDocStore::new(), MemoryIndexStore::new(), named, concurrency).await?,
        (Some(doc), None) => run(CouchDocStore::new(http_client()?, doc), MemoryIndexStore::new(), named, concurrency).await?,
        (None, Some(index)) => {
            run(MemoryDocStore::new(), EsIndexStore::new(http_client()?, index), named, concurrency).await?
        }
        (Some(doc), Some(index)) => {
            let client = http_client()?;
            run(
                CouchDocStore::new(client.clone(), doc),
                EsIndexStore::new(client, index),
                named,
                concurrency,
            )
            .await?
        }
    };

    let summary = json!({
        "scored": outcome.scored,
        "failed": outcome.failed,
        "index": outcome.generation.map(|generation| generation.new_index),
    });
    let mut doc = serde_json::to_string_pretty(&summary).into_app_err("unable to encode cycle summary")?;
    doc.push('\n');
    write_output(args.output.as_deref(), &doc)
}
