//! Quality metrics: carefulness, tests, health, branding.
//!
//! Unlike the velocity metrics, these are already bounded to `[0, 1]` at
//! extraction time; the population reference still decides how they rank.

use super::QualityEvaluation;
use crate::collected::CollectedRecord;

/// Readme size at which the readme signal saturates.
const README_SATURATION_BYTES: f64 = 400.0;

/// Badge count at which the branding signal saturates.
const BADGES_SATURATION: f64 = 4.0;

/// How carefully the package is put together: license, readme, changelog,
/// linters, not deprecated. Weighted checklist.
fn carefulness(collected: &CollectedRecord) -> f64 {
    let metadata = collected.metadata.as_ref();
    let source = collected.source.as_ref();

    let has_license = metadata.is_some_and(|metadata| metadata.license.is_some());
    let readme_size = source.map_or_else(
        || {
            metadata
                .and_then(|metadata| metadata.readme.as_deref())
                .map_or(0.0, |readme| readme.len() as f64)
        },
        |source| source.readme_size as f64,
    );
    let readme = (readme_size / README_SATURATION_BYTES).min(1.0);
    let has_changelog = source.is_some_and(|source| source.has_changelog);
    let has_linters = source.is_some_and(|source| source.has_linters);
    let is_not_deprecated = metadata.is_some_and(|metadata| metadata.deprecated.is_none());

    f64::from(u8::from(has_license)) * 0.33
        + readme * 0.38
        + f64::from(u8::from(has_changelog)) * 0.08
        + f64::from(u8::from(has_linters)) * 0.13
        + f64::from(u8::from(is_not_deprecated)) * 0.08
}

/// Test discipline: a test suite, CI, and reported coverage.
fn tests(collected: &CollectedRecord) -> f64 {
    let has_test_script = collected.metadata.as_ref().is_some_and(|metadata| metadata.has_test_script);
    let Some(source) = collected.source.as_ref() else {
        return if has_test_script { 0.6 } else { 0.0 };
    };

    let has_tests = source.tests_size > 0 || has_test_script;
    let coverage = source.coverage.unwrap_or(0.0).clamp(0.0, 1.0);

    f64::from(u8::from(has_tests)) * 0.6 + coverage * 0.25 + f64::from(u8::from(source.has_ci)) * 0.15
}

/// Dependency health: penalizes known vulnerabilities and outdated dependencies.
fn health(collected: &CollectedRecord) -> f64 {
    let Some(source) = collected.source.as_ref() else {
        return 0.0;
    };

    let vulnerabilities = source.vulnerabilities_count.unwrap_or(0) as f64;
    let vulnerability_penalty = (vulnerabilities * 0.25).min(1.0);

    let dependencies = source.dependencies_count.unwrap_or(0) as f64;
    let outdated = source.outdated_dependencies_count.unwrap_or(0) as f64;
    let outdated_ratio = if dependencies > 0.0 { (outdated / dependencies).min(1.0) } else { 0.0 };

    (1.0 - vulnerability_penalty) * (1.0 - outdated_ratio / 2.0)
}

/// Presentation effort: a homepage and status badges.
fn branding(collected: &CollectedRecord) -> f64 {
    let Some(source) = collected.source.as_ref() else {
        return 0.0;
    };

    let has_homepage = source.homepage.is_some();
    let badges = (source.badges_count as f64 / BADGES_SATURATION).min(1.0);

    f64::from(u8::from(has_homepage)) * 0.4 + badges * 0.6
}

/// Derive the quality metric group from a collected record. Infallible: every
/// missing input degrades to its sentinel.
#[must_use]
pub fn measure_quality(collected: &CollectedRecord) -> QualityEvaluation {
    QualityEvaluation {
        carefulness: carefulness(collected),
        tests: tests(collected),
        health: health(collected),
        branding: branding(collected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collected::{Metadata, SourceData};

    #[test]
    fn empty_record_scores_zero_everywhere() {
        let quality = measure_quality(&CollectedRecord::default());
        assert_eq!(quality, QualityEvaluation::default());
    }

    #[test]
    fn full_checklist_saturates_carefulness() {
        let record = CollectedRecord {
            metadata: Some(Metadata {
                license: Some("MIT".into()),
                ..Metadata::default()
            }),
            source: Some(SourceData {
                readme_size: 4000,
                has_changelog: true,
                has_linters: true,
                ..SourceData::default()
            }),
            ..CollectedRecord::default()
        };

        assert!((measure_quality(&record).carefulness - 1.0).abs() < 1e-12);
    }

    #[test]
    fn readme_signal_scales_with_size() {
        let record = CollectedRecord {
            source: Some(SourceData {
                readme_size: 200,
                ..SourceData::default()
            }),
            ..CollectedRecord::default()
        };

        // Half the saturation size earns half the readme weight; deprecation
        // cannot count without metadata.
        assert!((measure_quality(&record).carefulness - 0.19).abs() < 1e-12);
    }

    #[test]
    fn tests_combine_suite_coverage_and_ci() {
        let record = CollectedRecord {
            source: Some(SourceData {
                tests_size: 1024,
                coverage: Some(0.8),
                has_ci: true,
                ..SourceData::default()
            }),
            ..CollectedRecord::default()
        };

        assert!((measure_quality(&record).tests - (0.6 + 0.2 + 0.15)).abs() < 1e-12);
    }

    #[test]
    fn vulnerabilities_drag_health_down() {
        let clean = CollectedRecord {
            source: Some(SourceData::default()),
            ..CollectedRecord::default()
        };
        let vulnerable = CollectedRecord {
            source: Some(SourceData {
                vulnerabilities_count: Some(2),
                ..SourceData::default()
            }),
            ..CollectedRecord::default()
        };

        assert_eq!(measure_quality(&clean).health, 1.0);
        assert_eq!(measure_quality(&vulnerable).health, 0.5);
    }

    #[test]
    fn branding_rewards_homepage_and_badges() {
        let record = CollectedRecord {
            source: Some(SourceData {
                homepage: Some("https://example.org".into()),
                badges_count: 2,
                ..SourceData::default()
            }),
            ..CollectedRecord::default()
        };

        assert!((measure_quality(&record).branding - 0.7).abs() < 1e-12);
    }
}
