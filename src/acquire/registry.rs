//! Registry-tarball download strategy, the universal fallback.

use super::{AcquireOptions, PackageDescriptor, extract_tarball};
use crate::error::ScoringError;
use reqwest::{Client, StatusCode};
use std::path::Path;

const LOG_TARGET: &str = "   acquire";

/// Whether this strategy can handle the package. The tarball URL needs a
/// concrete version.
#[must_use]
pub fn claims(package: &PackageDescriptor) -> bool {
    package.version.is_some()
}

/// The registry tarball path for a package: `<name>/-/<basename>-<version>.tgz`,
/// where scoped names keep their scope only in the first segment.
fn tarball_path(name: &str, version: &str) -> String {
    let escaped = name.replace('/', "%2F");
    let basename = name.rsplit('/').next().unwrap_or(name);
    format!("{escaped}/-/{basename}-{version}.tgz")
}

/// Fetch and extract the registry tarball into the workspace.
pub async fn download(
    client: &Client,
    package: &PackageDescriptor,
    options: &AcquireOptions,
    dest: &Path,
) -> Result<(), ScoringError> {
    let context = || format!("downloading registry tarball of '{}'", package.name);

    let version = package
        .version
        .as_ref()
        .ok_or_else(|| ScoringError::acquisition(context(), "package has no version"))?;
    let url = options
        .registry_base
        .join(&tarball_path(&package.name, version))
        .map_err(|e| ScoringError::acquisition(context(), e))?;

    log::debug!(target: LOG_TARGET, "Fetching {url}");
    let response = client.get(url).send().await.map_err(|e| ScoringError::acquisition(context(), e))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ScoringError::PackageNotFound(package.name.clone()));
    }
    if !status.is_success() {
        return Err(ScoringError::acquisition(context(), format!("registry returned {status}")));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ScoringError::acquisition(context(), e))?
        .to_vec();

    // Registry tarballs nest their contents under a single top-level directory.
    extract_tarball(bytes, dest.to_path_buf(), 1)
        .await
        .map_err(|e| ScoringError::acquisition(context(), e))
}
