//! The collected record: raw, partial per-package data gathered upstream.
//!
//! Every section of a [`CollectedRecord`] may be absent. Absence is a valid state
//! that the metric extractors handle explicitly; it is never an error here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pre-aggregated count over a fixed time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeBucket {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub count: f64,
}

impl RangeBucket {
    /// Window length in whole days.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.to - self.from).num_days()
    }
}

/// Raw per-package data collected from registry, VCS, and static-source analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CollectedRecord {
    pub metadata: Option<Metadata>,
    pub registry: Option<RegistryData>,
    pub vcs: Option<VcsData>,
    pub source: Option<SourceData>,
}

/// Package manifest and release information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub name: String,
    pub version: String,
    pub deprecated: Option<String>,
    pub readme: Option<String>,
    pub repository: Option<String>,
    pub license: Option<String>,
    pub has_test_script: bool,
    pub releases: Option<Vec<RangeBucket>>,
}

/// Statistics reported by the package registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryData {
    pub downloads: Option<Vec<RangeBucket>>,
    pub dependents_count: u64,
    pub stars_count: u64,
}

/// Statistics reported by the version-control host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VcsData {
    pub commits: Option<Vec<RangeBucket>>,
    pub stars_count: u64,
    pub forks_count: u64,
    pub subscribers_count: u64,
    pub contributors_count: u64,
    pub fork_of: Option<String>,
    pub issues: Option<IssueStats>,
}

/// Issue-tracker statistics, including the open-issue age distribution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IssueStats {
    pub count: u64,
    pub open_count: u64,
    pub is_disabled: bool,
    /// Open-issue age distribution: age bucket in seconds mapped to issue count.
    pub distribution: BTreeMap<u64, u64>,
}

/// Statistics derived from static analysis of the package source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceData {
    pub readme_size: u64,
    pub tests_size: u64,
    pub has_changelog: bool,
    pub has_linters: bool,
    pub has_ci: bool,
    /// Test coverage ratio in `[0, 1]`, when a coverage service reported one.
    pub coverage: Option<f64>,
    pub badges_count: u64,
    pub vulnerabilities_count: Option<u64>,
    pub outdated_dependencies_count: Option<u64>,
    pub dependencies_count: Option<u64>,
    pub homepage: Option<String>,
}
