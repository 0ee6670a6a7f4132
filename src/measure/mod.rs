//! Metric extraction from collected records.
//!
//! Extractors are pure functions over a [`CollectedRecord`]. A missing upstream
//! section yields an explicit sentinel (zero or an unmeasurable `None`) rather than
//! an error; only a violated input contract (a required window bucket missing while
//! windowed data exists) is a hard failure.

use crate::collected::CollectedRecord;
use crate::error::ScoringError;
use serde::{Deserialize, Serialize};

mod maintenance;
mod popularity;
mod quality;

pub use maintenance::measure_maintenance;
pub use popularity::measure_popularity;
pub use quality::measure_quality;

/// One package's metric groups for one analysis run. Immutable; a later run
/// supersedes it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub popularity: PopularityEvaluation,
    pub maintenance: MaintenanceEvaluation,
    pub quality: QualityEvaluation,
}

/// Popularity metrics: raw counts and per-window download means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularityEvaluation {
    pub community_interest: CommunityInterest,
    pub downloads_count: DownloadsCount,
    pub downloads_acceleration: DownloadsAcceleration,
    pub dependents_count: f64,
}

/// Raw community counts, summed per source but never combined across fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityInterest {
    pub stars_count: f64,
    pub forks_count: f64,
    pub subscribers_count: f64,
    pub contributors_count: f64,
}

/// Download counts over the reference windows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadsCount {
    pub count30: f64,
    pub count90: f64,
}

/// Daily download means per window, the inputs to acceleration scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadsAcceleration {
    pub mean30: f64,
    pub mean90: f64,
    pub mean180: f64,
    pub mean365: f64,
}

/// Maintenance metrics: release/commit velocity and issue health.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceEvaluation {
    pub releases_frequency: ReleasesFrequency,
    pub commits_frequency: CommitsFrequency,
    pub open_issues: OpenIssues,
    pub issues_distribution: IssuesDistribution,
    pub finished: FinishedSignals,
}

/// Releases per quarter over each window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleasesFrequency {
    pub mean30: f64,
    pub mean180: f64,
    pub mean365: f64,
    pub mean730: f64,
}

/// Commits per month over each window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitsFrequency {
    pub mean30: f64,
    pub mean180: f64,
    pub mean365: f64,
}

/// Open-issue health. Fields are `None` when issue tracking is unavailable,
/// zero when it is disabled or the tracker is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenIssues {
    pub is_disabled: Option<bool>,
    pub is_fork: Option<bool>,
    pub count: Option<f64>,
    pub open_count: Option<f64>,
    pub open_ratio: Option<f64>,
}

/// Weighted mean age of open issues, in days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuesDistribution {
    pub is_disabled: Option<bool>,
    pub total_count: f64,
    pub open_mean_days: f64,
}

/// Independent "finished package" signals. Any policy combining them lives
/// downstream, never here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedSignals {
    pub is_stable: bool,
    pub is_not_deprecated: bool,
    pub has_few_issues: bool,
    pub has_readme: bool,
    pub has_tests: bool,
}

/// Quality metrics, each already bounded to `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityEvaluation {
    pub carefulness: f64,
    pub tests: f64,
    pub health: f64,
    pub branding: f64,
}

/// Derive all metric groups from a collected record.
pub fn evaluate(collected: &CollectedRecord) -> Result<Evaluation, ScoringError> {
    Ok(Evaluation {
        popularity: measure_popularity(collected)?,
        maintenance: measure_maintenance(collected)?,
        quality: measure_quality(collected),
    })
}

/// Find the bucket whose window is exactly `window` days long.
///
/// The input contract guarantees the bucket exists whenever any windowed data
/// does, so a miss is a hard error.
fn exact_window(
    buckets: &[crate::collected::RangeBucket],
    series: &'static str,
    window: i64,
) -> Result<f64, ScoringError> {
    buckets
        .iter()
        .find(|bucket| bucket.days() == window)
        .map(|bucket| bucket.count)
        .ok_or(ScoringError::MissingRange { series, window })
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::collected::RangeBucket;
    use chrono::{Duration, TimeZone, Utc};

    /// Build buckets ending "now", one per `(window days, count)` pair.
    pub fn buckets(windows: &[(i64, f64)]) -> Vec<RangeBucket> {
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
}
