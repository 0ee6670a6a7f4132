//! Generic repository-clone download strategy.

use super::PackageDescriptor;
use crate::error::ScoringError;
use std::path::Path;
use tokio::process::Command;

const LOG_TARGET: &str = "   acquire";

/// Whether this strategy can handle the package. Any repository URL will do.
#[must_use]
pub fn claims(package: &PackageDescriptor) -> bool {
    package.repository.is_some()
}

/// Shallow-clone the package's repository into the workspace.
pub async fn download(package: &PackageDescriptor, dest: &Path) -> Result<(), ScoringError> {
    let context = || format!("cloning repository of '{}'", package.name);

    let repository = package
        .repository
        .as_ref()
        .ok_or_else(|| ScoringError::acquisition(context(), "package has no repository URL"))?;

    log::debug!(target: LOG_TARGET, "Cloning {repository} into {}", dest.display());
    let output = Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg("--quiet")
        .arg(repository.as_str())
        .arg(dest)
        .output()
        .await
        .map_err(|e| ScoringError::acquisition(context(), e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ScoringError::acquisition(
            context(),
            format!("git clone exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(())
}
