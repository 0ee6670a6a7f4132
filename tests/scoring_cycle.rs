//! End-to-end scoring cycles over the in-memory stores.

use chrono::{Duration, TimeZone, Utc};
use pkgrank::collected::{CollectedRecord, Metadata, RangeBucket, RegistryData};
use pkgrank::error::ErrorKind;
use pkgrank::scoring::{AggregationStore, CURRENT_ALIAS, NEW_ALIAS, ScoringCycle};
use pkgrank::store::{IndexStore, MemoryDocStore, MemoryIndexStore};

fn buckets(windows: &[(i64, f64)]) -> Vec<RangeBucket> {
    let to = Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap();
    windows
        .iter()
        .map(|&(days, count)| RangeBucket {
            from: to - Duration::days(days),
            to,
            count,
        })
        .collect()
}

/// A package whose only signal is its 90 day download count.
fn package(name: &str, count90: f64) -> (String, CollectedRecord) {
    (
        name.to_owned(),
        CollectedRecord {
            metadata: Some(Metadata {
                name: name.to_owned(),
                version: "1.0.0".into(),
                ..Metadata::default()
            }),
            registry: Some(RegistryData {
                downloads: Some(buckets(&[
                    (30, count90 / 3.0),
                    (90, count90),
                    (180, count90),
                    (365, count90),
                ])),
                ..RegistryData::default()
            }),
            ..CollectedRecord::default()
        },
    )
}

fn population() -> Vec<(String, CollectedRecord)> {
    vec![package("low", 10.0), package("mid", 50.0), package("high", 90.0)]
}

#[tokio::test]
async fn cycle_publishes_scored_documents_behind_current() {
    let docs = MemoryDocStore::new();
    let index = MemoryIndexStore::new();
    let cycle = ScoringCycle::new(docs.clone(), index.clone(), 4);

    let outcome = cycle.run(population()).await.unwrap();
    assert_eq!(outcome.scored, 3);
    assert!(outcome.failed.is_empty());

    let generation = outcome.generation.unwrap();
    assert_eq!(index.holders_of(CURRENT_ALIAS), vec![generation.new_index.clone()]);
    assert!(index.holders_of(NEW_ALIAS).is_empty());

    let documents = index.documents(&generation.new_index);
    assert_eq!(documents.len(), 3);
    for name in ["low", "mid", "high"] {
        let doc = documents.get(name).unwrap();
        assert_eq!(doc.get("name").unwrap(), name);
        let final_score = doc["score"]["final"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&final_score));
    }
}

#[tokio::test]
async fn aggregation_reflects_the_population_distribution() {
    let docs = MemoryDocStore::new();
    let cycle = ScoringCycle::new(docs.clone(), MemoryIndexStore::new(), 4);
    let _ = cycle.run(population()).await.unwrap();

    let reference = AggregationStore::new(docs).get().await.unwrap();
    assert_eq!(reference.population, 3);

    let stats = reference.get("popularity.downloadsCount.count90").unwrap();
    assert_eq!(stats.min, 10.0);
    assert_eq!(stats.max, 90.0);
    assert_eq!(stats.mean, 50.0);
    // The median picks index round(n/2), which lands on the last element here.
    assert_eq!(stats.median, 90.0);
}

#[tokio::test]
async fn midpoint_package_scores_halfway_against_its_peers() {
    let index = MemoryIndexStore::new();
    let cycle = ScoringCycle::new(MemoryDocStore::new(), index.clone(), 4);

    let mut records = population();
    records.push(package("fourth", 50.0));
    let outcome = cycle.run(records).await.unwrap();

    let generation = outcome.generation.unwrap();
    let documents = index.documents(&generation.new_index);
    let popularity = documents.get("fourth").unwrap()["score"]["detail"]["popularity"].as_f64().unwrap();
    assert!((popularity - 0.5).abs() < 1e-9, "popularity was {popularity}");
}

#[tokio::test]
async fn staging_failure_leaves_current_untouched_and_is_retryable() {
    let index = MemoryIndexStore::new();
    let cycle = ScoringCycle::new(MemoryDocStore::new(), index.clone(), 4);

    let first = cycle.run(population()).await.unwrap().generation.unwrap();
    assert_eq!(index.holders_of(CURRENT_ALIAS), vec![first.new_index.clone()]);

    index.inject_alias_failures(1);
    let err = cycle.run(population()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(index.holders_of(CURRENT_ALIAS), vec![first.new_index.clone()]);

    let second = cycle.run(population()).await.unwrap().generation.unwrap();
    assert_eq!(index.holders_of(CURRENT_ALIAS), vec![second.new_index]);
}

#[tokio::test]
async fn aggregation_write_conflicts_are_retried() {
    let docs = MemoryDocStore::new();
    let cycle = ScoringCycle::new(docs.clone(), MemoryIndexStore::new(), 4);

    docs.inject_conflicts(2);
    let outcome = cycle.run(population()).await.unwrap();
    assert_eq!(outcome.scored, 3);

    let reference = AggregationStore::new(docs).get().await.unwrap();
    assert_eq!(reference.population, 3);
}

#[tokio::test]
async fn successive_cycles_retire_the_previous_generation() {
    let index = MemoryIndexStore::new();
    let cycle = ScoringCycle::new(MemoryDocStore::new(), index.clone(), 4);

    let first = cycle.run(population()).await.unwrap().generation.unwrap();
    let second = cycle.run(population()).await.unwrap().generation.unwrap();

    let indices = index.list_indices().await.unwrap();
    assert!(!indices.contains(&first.new_index));
    assert!(indices.contains(&second.new_index));
}
