//! Per-package scoring: normalization against the population plus fixed weights.
//!
//! Pure and cheap: a score is derived entirely from an evaluation and an
//! aggregation reference, and can be recomputed at any time. It is never a
//! durable source of truth on its own.

use super::aggregate::{AggregationReference, MetricStats, flatten};
use crate::Result;
use crate::measure::Evaluation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fixed policy constants for the final combination.
const QUALITY_WEIGHT: f64 = 0.3;
const POPULARITY_WEIGHT: f64 = 0.35;
const MAINTENANCE_WEIGHT: f64 = 0.35;

/// Whether larger raw values rank a package better or worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// A scorer sub-metric: the leaves it reads and how to read them.
struct SubMetric {
    weight: f64,
    leaves: &'static [(&'static str, Direction)],
}

use Direction::{HigherIsBetter, LowerIsBetter};

const QUALITY_SUB_METRICS: &[SubMetric] = &[
    SubMetric {
        weight: 7.0,
        leaves: &[("quality.carefulness", HigherIsBetter)],
    },
    SubMetric {
        weight: 7.0,
        leaves: &[("quality.tests", HigherIsBetter)],
    },
    SubMetric {
        weight: 4.0,
        leaves: &[("quality.health", HigherIsBetter)],
    },
    SubMetric {
        weight: 2.0,
        leaves: &[("quality.branding", HigherIsBetter)],
    },
];

const POPULARITY_SUB_METRICS: &[SubMetric] = &[
    SubMetric {
        weight: 2.0,
        leaves: &[
            ("popularity.communityInterest.starsCount", HigherIsBetter),
            ("popularity.communityInterest.forksCount", HigherIsBetter),
            ("popularity.communityInterest.subscribersCount", HigherIsBetter),
            ("popularity.communityInterest.contributorsCount", HigherIsBetter),
        ],
    },
    SubMetric {
        weight: 2.0,
        leaves: &[
            ("popularity.downloadsCount.count30", HigherIsBetter),
            ("popularity.downloadsCount.count90", HigherIsBetter),
        ],
    },
    SubMetric {
        weight: 1.0,
        leaves: &[
            ("popularity.downloadsAcceleration.mean30", HigherIsBetter),
            ("popularity.downloadsAcceleration.mean90", HigherIsBetter),
            ("popularity.downloadsAcceleration.mean180", HigherIsBetter),
            ("popularity.downloadsAcceleration.mean365", HigherIsBetter),
        ],
    },
    SubMetric {
        weight: 2.0,
        leaves: &[("popularity.dependentsCount", HigherIsBetter)],
    },
];

const MAINTENANCE_SUB_METRICS: &[SubMetric] = &[
    SubMetric {
        weight: 2.0,
        leaves: &[
            ("maintenance.releasesFrequency.mean30", HigherIsBetter),
            ("maintenance.releasesFrequency.mean180", HigherIsBetter),
            ("maintenance.releasesFrequency.mean365", HigherIsBetter),
            ("maintenance.releasesFrequency.mean730", HigherIsBetter),
        ],
    },
    SubMetric {
        weight: 1.0,
        leaves: &[
            ("maintenance.commitsFrequency.mean30", HigherIsBetter),
            ("maintenance.commitsFrequency.mean180", HigherIsBetter),
            ("maintenance.commitsFrequency.mean365", HigherIsBetter),
        ],
    },
    SubMetric {
        weight: 1.0,
        leaves: &[("maintenance.openIssues.openRatio", LowerIsBetter)],
    },
    SubMetric {
        weight: 2.0,
        leaves: &[("maintenance.issuesDistribution.openMeanDays", LowerIsBetter)],
    },
];

/// The per-group score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreDetail {
    pub popularity: f64,
    pub maintenance: f64,
    pub quality: f64,
}

/// The final weighted, normalized ranking numbers for one package.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(rename = "final")]
    pub final_score: f64,
    pub detail: ScoreDetail,
}

/// Normalize a raw value against its population stats into a bounded,
/// monotonic `[0, 1]` value.
///
/// A degenerate distribution (every peer equal) carries no ranking signal, so
/// any in-range value normalizes to the neutral 0.5.
fn normalize(value: f64, stats: &MetricStats) -> f64 {
    let span = stats.max - stats.min;
    if span <= 0.0 {
        return if value >= stats.min { 0.5 } else { 0.0 };
    }

    ((value - stats.min) / span).clamp(0.0, 1.0)
}

/// Score one sub-metric as the unweighted mean of its normalized leaves.
///
/// Leaves that are unmeasurable for this package, or absent from the reference,
/// are skipped; a fully unmeasurable sub-metric scores 0.
fn sub_metric_score(leaves: &BTreeMap<String, f64>, reference: &AggregationReference, sub_metric: &SubMetric) -> f64 {
    let mut sum = 0.0;
    let mut measured = 0_usize;

    for &(path, direction) in sub_metric.leaves {
        let (Some(&value), Some(stats)) = (leaves.get(path), reference.get(path)) else {
            continue;
        };

        let normalized = normalize(value, stats);
        sum += match direction {
            HigherIsBetter => normalized,
            LowerIsBetter => 1.0 - normalized,
        };
        measured += 1;
    }

    if measured == 0 { 0.0 } else { sum / measured as f64 }
}

/// Weighted mean of a group's sub-metric scores.
fn group_score(leaves: &BTreeMap<String, f64>, reference: &AggregationReference, sub_metrics: &[SubMetric]) -> f64 {
    let total_weight: f64 = sub_metrics.iter().map(|sub_metric| sub_metric.weight).sum();
    let weighted_sum: f64 = sub_metrics
        .iter()
        .map(|sub_metric| sub_metric.weight * sub_metric_score(leaves, reference, sub_metric))
        .sum();

    weighted_sum / total_weight
}

/// Score an evaluation against the population reference.
pub fn score(evaluation: &Evaluation, reference: &AggregationReference) -> Result<Score> {
    let leaves = flatten(evaluation)?;

    let quality = group_score(&leaves, reference, QUALITY_SUB_METRICS);
    let popularity = group_score(&leaves, reference, POPULARITY_SUB_METRICS);
    let maintenance = group_score(&leaves, reference, MAINTENANCE_SUB_METRICS);

    Ok(Score {
        final_score: QUALITY_WEIGHT * quality + POPULARITY_WEIGHT * popularity + MAINTENANCE_WEIGHT * maintenance,
        detail: ScoreDetail {
            popularity,
            maintenance,
            quality,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{DownloadsCount, Evaluation, PopularityEvaluation, QualityEvaluation};
    use crate::scoring::aggregate::aggregate;

    fn evaluation_with_count30(count30: f64) -> Evaluation {
        Evaluation {
            popularity: PopularityEvaluation {
                downloads_count: DownloadsCount { count30, count90: count30 * 3.0 },
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn reference_for(values: &[f64]) -> AggregationReference {
        let evaluations: Vec<Evaluation> = values.iter().map(|&n| evaluation_with_count30(n)).collect();
        aggregate(&evaluations).unwrap().unwrap()
    }

    #[test]
    fn scoring_is_pure_and_deterministic() {
        let reference = reference_for(&[10.0, 50.0, 90.0]);
        let evaluation = evaluation_with_count30(50.0);

        let first = score(&evaluation, &reference).unwrap();
        let second = score(&evaluation, &reference).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn normalization_is_bounded_and_monotonic() {
        let stats = MetricStats {
            min: 10.0,
            max: 90.0,
            mean: 50.0,
            truncated_mean: 50.0,
            median: 90.0,
        };

        assert_eq!(normalize(-100.0, &stats), 0.0);
        assert_eq!(normalize(10.0, &stats), 0.0);
        assert_eq!(normalize(50.0, &stats), 0.5);
        assert_eq!(normalize(90.0, &stats), 1.0);
        assert_eq!(normalize(900.0, &stats), 1.0);
        assert!(normalize(30.0, &stats) < normalize(60.0, &stats));
    }

    #[test]
    fn degenerate_distribution_is_neutral() {
        let stats = MetricStats {
            min: 5.0,
            max: 5.0,
            mean: 5.0,
            truncated_mean: 5.0,
            median: 5.0,
        };
        assert_eq!(normalize(5.0, &stats), 0.5);
        assert_eq!(normalize(0.0, &stats), 0.0);
    }

    #[test]
    fn downloads_sub_metric_ranks_against_the_population() {
        // Population count30 = {10, 50, 90}; a package at 50 sits halfway on
        // both download leaves.
        let reference = reference_for(&[10.0, 50.0, 90.0]);
        let leaves = flatten(&evaluation_with_count30(50.0)).unwrap();

        let downloads = &POPULARITY_SUB_METRICS[1];
        assert_eq!(sub_metric_score(&leaves, &reference, downloads), 0.5);
    }

    #[test]
    fn lower_is_better_leaves_are_inverted() {
        use crate::measure::{MaintenanceEvaluation, OpenIssues};

        let make = |open_ratio: f64| Evaluation {
            maintenance: MaintenanceEvaluation {
                open_issues: OpenIssues {
                    is_disabled: Some(false),
                    is_fork: Some(false),
                    count: Some(100.0),
                    open_count: Some(open_ratio * 100.0),
                    open_ratio: Some(open_ratio),
                },
                ..Default::default()
            },
            ..Default::default()
        };

        let evaluations = vec![make(0.0), make(0.5), make(1.0)];
        let reference = aggregate(&evaluations).unwrap().unwrap();

        let open_issues = &MAINTENANCE_SUB_METRICS[2];
        let healthy = sub_metric_score(&flatten(&make(0.0)).unwrap(), &reference, open_issues);
        let unhealthy = sub_metric_score(&flatten(&make(1.0)).unwrap(), &reference, open_issues);
        assert_eq!(healthy, 1.0);
        assert_eq!(unhealthy, 0.0);
    }

    #[test]
    fn unmeasurable_sub_metric_scores_zero() {
        let reference = reference_for(&[10.0, 50.0, 90.0]);
        let leaves = flatten(&Evaluation::default()).unwrap();

        // Open-issue tracking unavailable: the ratio leaf is absent entirely.
        let open_issues = &MAINTENANCE_SUB_METRICS[2];
        assert_eq!(sub_metric_score(&leaves, &reference, open_issues), 0.0);
    }

    #[test]
    fn final_score_uses_the_fixed_policy_weights() {
        let evaluations: Vec<Evaluation> = [0.0, 1.0]
            .iter()
            .map(|&n| Evaluation {
                quality: QualityEvaluation {
                    carefulness: n,
                    tests: n,
                    health: n,
                    branding: n,
                },
                ..Default::default()
            })
            .collect();
        let reference = aggregate(&evaluations).unwrap().unwrap();

        let best = score(&evaluations[1], &reference).unwrap();
        assert_eq!(best.detail.quality, 1.0);
        // Popularity and maintenance leaves are all-zero across the population,
        // so they normalize to the neutral 0.5 where measurable.
        assert!((best.final_score - (0.3 + POPULARITY_WEIGHT * best.detail.popularity + MAINTENANCE_WEIGHT * best.detail.maintenance)).abs() < 1e-12);
    }
}
