//! Popularity metrics: community interest, download counts and acceleration.

use super::{CommunityInterest, DownloadsAcceleration, DownloadsCount, PopularityEvaluation, exact_window};
use crate::collected::CollectedRecord;
use crate::error::ScoringError;

/// Download counts over the reference windows.
///
/// The 30 day count is derived from the 90 day bucket, which smooths spiky
/// short-window data.
fn downloads_count(collected: &CollectedRecord) -> Result<DownloadsCount, ScoringError> {
    let Some(downloads) = collected.registry.as_ref().and_then(|registry| registry.downloads.as_deref()) else {
        return Ok(DownloadsCount::default());
    };

    let count90 = exact_window(downloads, "downloads", 90)?;

    Ok(DownloadsCount {
        count30: count90 / 3.0,
        count90,
    })
}

/// Daily download means per window. Downstream scoring reads acceleration out
/// of the differences between windows.
fn downloads_acceleration(collected: &CollectedRecord) -> Result<DownloadsAcceleration, ScoringError> {
    let Some(downloads) = collected.registry.as_ref().and_then(|registry| registry.downloads.as_deref()) else {
        return Ok(DownloadsAcceleration::default());
    };

    Ok(DownloadsAcceleration {
        mean30: exact_window(downloads, "downloads", 30)? / 30.0,
        mean90: exact_window(downloads, "downloads", 90)? / 90.0,
        mean180: exact_window(downloads, "downloads", 180)? / 180.0,
        mean365: exact_window(downloads, "downloads", 365)? / 365.0,
    })
}

/// Raw community counts. Stars are summed across the registry and the VCS
/// host; nothing else is pre-combined.
fn community_interest(collected: &CollectedRecord) -> CommunityInterest {
    let registry_stars = collected.registry.as_ref().map_or(0, |registry| registry.stars_count);
    let vcs = collected.vcs.as_ref();

    CommunityInterest {
        stars_count: (registry_stars + vcs.map_or(0, |vcs| vcs.stars_count)) as f64,
        forks_count: vcs.map_or(0, |vcs| vcs.forks_count) as f64,
        subscribers_count: vcs.map_or(0, |vcs| vcs.subscribers_count) as f64,
        contributors_count: vcs.map_or(0, |vcs| vcs.contributors_count) as f64,
    }
}

/// Derive the popularity metric group from a collected record.
pub fn measure_popularity(collected: &CollectedRecord) -> Result<PopularityEvaluation, ScoringError> {
    Ok(PopularityEvaluation {
        community_interest: community_interest(collected),
        downloads_count: downloads_count(collected)?,
        downloads_acceleration: downloads_acceleration(collected)?,
        dependents_count: collected.registry.as_ref().map_or(0, |registry| registry.dependents_count) as f64,
    })
}
