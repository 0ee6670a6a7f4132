//! Maintenance metrics: release/commit velocity, issue health, finished signals.

use super::{
    CommitsFrequency, FinishedSignals, IssuesDistribution, MaintenanceEvaluation, OpenIssues, ReleasesFrequency, exact_window,
};
use crate::collected::CollectedRecord;
use crate::error::ScoringError;
use semver::Version;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Open-issue count below which a package counts as having few issues.
const FEW_ISSUES_THRESHOLD: u64 = 15;

/// Issue-age conditioning endpoints: an issue open for 29 days weighs 1x, one
/// open for a year or more weighs 5x.
const AGE_CURVE_START_DAYS: f64 = 29.0;
const AGE_CURVE_END_DAYS: f64 = 365.0;
const AGE_CURVE_MAX_WEIGHT: f64 = 5.0;

/// Releases per quarter over each required window.
fn releases_frequency(collected: &CollectedRecord) -> Result<ReleasesFrequency, ScoringError> {
    let Some(releases) = collected.metadata.as_ref().and_then(|metadata| metadata.releases.as_deref()) else {
        return Ok(ReleasesFrequency::default());
    };

    Ok(ReleasesFrequency {
        mean30: exact_window(releases, "releases", 30)? / (30.0 / 90.0),
        mean180: exact_window(releases, "releases", 180)? / (180.0 / 90.0),
        mean365: exact_window(releases, "releases", 365)? / (365.0 / 90.0),
        mean730: exact_window(releases, "releases", 730)? / (730.0 / 90.0),
    })
}

/// Commits per month over each required window.
fn commits_frequency(collected: &CollectedRecord) -> Result<CommitsFrequency, ScoringError> {
    let Some(commits) = collected.vcs.as_ref().and_then(|vcs| vcs.commits.as_deref()) else {
        return Ok(CommitsFrequency::default());
    };

    Ok(CommitsFrequency {
        mean30: exact_window(commits, "commits", 30)? / (30.0 / 30.0),
        mean180: exact_window(commits, "commits", 180)? / (180.0 / 30.0),
        mean365: exact_window(commits, "commits", 365)? / (365.0 / 30.0),
    })
}

/// Open-issue health: `None` fields when tracking is unavailable, zeros when it
/// is disabled or the tracker is empty, raw counts plus ratio otherwise.
fn open_issues(collected: &CollectedRecord) -> OpenIssues {
    let vcs = collected.vcs.as_ref();
    let is_fork = vcs.map(|vcs| vcs.fork_of.is_some());

    let Some(issues) = vcs.and_then(|vcs| vcs.issues.as_ref()) else {
        return OpenIssues {
            is_disabled: None,
            is_fork,
            count: None,
            open_count: None,
            open_ratio: None,
        };
    };

    if issues.is_disabled || issues.count == 0 {
        return OpenIssues {
            is_disabled: Some(issues.is_disabled),
            is_fork,
            count: Some(0.0),
            open_count: Some(0.0),
            open_ratio: Some(0.0),
        };
    }

    OpenIssues {
        is_disabled: Some(false),
        is_fork,
        count: Some(issues.count as f64),
        open_count: Some(issues.open_count as f64),
        open_ratio: Some(issues.open_count as f64 / issues.count as f64),
    }
}

/// Conditioning weight for an issue-age bucket: scales linearly from 1x at
/// ~29 days to 5x at ~365 days and beyond.
fn age_conditioning(age_days: f64) -> f64 {
    if age_days <= AGE_CURVE_START_DAYS {
        return 1.0;
    }
    if age_days >= AGE_CURVE_END_DAYS {
        return AGE_CURVE_MAX_WEIGHT;
    }

    1.0 + (age_days - AGE_CURVE_START_DAYS) / (AGE_CURVE_END_DAYS - AGE_CURVE_START_DAYS) * (AGE_CURVE_MAX_WEIGHT - 1.0)
}

/// Weighted mean open-issue age in days. Older issues are penalized more via
/// the conditioning curve.
fn issues_distribution(collected: &CollectedRecord) -> IssuesDistribution {
    let Some(issues) = collected.vcs.as_ref().and_then(|vcs| vcs.issues.as_ref()) else {
        return IssuesDistribution {
            is_disabled: None,
            total_count: 0.0,
            open_mean_days: 0.0,
        };
    };

    if issues.is_disabled {
        return IssuesDistribution {
            is_disabled: Some(true),
            total_count: 0.0,
            open_mean_days: 0.0,
        };
    }

    let total_count: u64 = issues.distribution.values().sum();
    if total_count == 0 {
        return IssuesDistribution {
            is_disabled: Some(false),
            total_count: 0.0,
            open_mean_days: 0.0,
        };
    }

    let bucket_count = issues.distribution.len() as f64;
    let weighted_age_sum: f64 = issues
        .distribution
        .iter()
        .map(|(&age_seconds, &count)| {
            let share = count as f64 / total_count as f64;
            let weight = share * age_conditioning(age_seconds as f64 / SECONDS_PER_DAY);
            age_seconds as f64 * weight
        })
        .sum();

    IssuesDistribution {
        is_disabled: Some(false),
        total_count: total_count as f64,
        open_mean_days: weighted_age_sum / bucket_count / SECONDS_PER_DAY,
    }
}

/// Lenient version parsing: tolerates a leading `v`/`=` and missing minor or
/// patch components.
fn parse_version_loose(version: &str) -> Option<Version> {
    let trimmed = version.trim().trim_start_matches(['v', '=']);

    if let Ok(parsed) = Version::parse(trimmed) {
        return Some(parsed);
    }

    let dots = trimmed.split('.').count();
    if dots < 3 && !trimmed.contains(['-', '+']) {
        let padded = format!("{trimmed}{}", ".0".repeat(3 - dots));
        return Version::parse(&padded).ok();
    }

    None
}

/// Independent signals of a package being stable enough to need less scrutiny.
fn finished_signals(collected: &CollectedRecord) -> FinishedSignals {
    let metadata = collected.metadata.as_ref();
    let open_count = collected
        .vcs
        .as_ref()
        .and_then(|vcs| vcs.issues.as_ref())
        .map(|issues| issues.open_count);

    FinishedSignals {
        is_stable: metadata
            .and_then(|metadata| parse_version_loose(&metadata.version))
            .is_some_and(|version| version >= Version::new(1, 0, 0)),
        is_not_deprecated: metadata.is_some_and(|metadata| metadata.deprecated.is_none()),
        has_few_issues: open_count.is_some_and(|count| count < FEW_ISSUES_THRESHOLD),
        has_readme: metadata.is_some_and(|metadata| metadata.readme.as_deref().is_some_and(|readme| !readme.is_empty())),
        has_tests: metadata.is_some_and(|metadata| metadata.has_test_script),
    }
}

/// Derive the maintenance metric group from a collected record.
pub fn measure_maintenance(collected: &CollectedRecord) -> Result<MaintenanceEvaluation, ScoringError> {
    Ok(MaintenanceEvaluation {
        releases_frequency: releases_frequency(collected)?,
        commits_frequency: commits_frequency(collected)?,
        open_issues: open_issues(collected),
        issues_distribution: issues_distribution(collected),
        finished: finished_signals(collected),
    })
}
