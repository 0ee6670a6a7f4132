//! Package acquisition: ordered download strategies over scratch workspaces.
//!
//! Strategies are tried cheapest-check-first; the first one claiming the
//! package runs, with no cross-strategy retry. Any failure tears the workspace
//! down before the error propagates so no partial workspace leaks.

use crate::Result;
use crate::error::ScoringError;
use ohno::{IntoAppError, bail};
use std::path::{Component, Path, PathBuf};
use url::Url;

pub mod git;
pub mod host_api;
pub mod registry;
pub mod workspace;

pub use host_api::TokenPool;
pub use workspace::{Workspace, WorkspaceRoot};

const LOG_TARGET: &str = "   acquire";

const DEFAULT_REGISTRY_BASE: &str = "https://registry.npmjs.org";
const DEFAULT_ARCHIVE_BASE: &str = "https://codeload.github.com";

/// What the acquirer needs to know about a package.
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: Option<String>,
    pub repository: Option<Url>,
}

/// Knobs shared by every acquisition.
#[derive(Debug)]
pub struct AcquireOptions {
    pub tokens: TokenPool,
    /// When rate limited, sleep until the advertised reset instead of failing.
    pub wait_rate_limit: bool,
    pub registry_base: Url,
    pub archive_base: Url,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            tokens: TokenPool::default(),
            wait_rate_limit: false,
            registry_base: Url::parse(DEFAULT_REGISTRY_BASE).expect("invalid registry URL"),
            archive_base: Url::parse(DEFAULT_ARCHIVE_BASE).expect("invalid archive URL"),
        }
    }
}

/// The download strategies, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    HostApi,
    Git,
    Registry,
}

/// The first strategy claiming the package. The order is a contract: host API
/// before generic clone before registry tarball.
#[must_use]
pub fn selected_strategy(package: &PackageDescriptor) -> Option<Strategy> {
    if host_api::claims(package) {
        return Some(Strategy::HostApi);
    }
    if git::claims(package) {
        return Some(Strategy::Git);
    }
    if registry::claims(package) {
        return Some(Strategy::Registry);
    }

    None
}

/// Runs the acquisition cascade and owns the HTTP client shared by the
/// download strategies.
#[derive(Debug)]
pub struct Acquirer {
    client: reqwest::Client,
    root: WorkspaceRoot,
}

impl Acquirer {
    pub fn new(root: WorkspaceRoot) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pkgrank")
            .build()
            .into_app_err("unable to build HTTP client")?;

        Ok(Self { client, root })
    }

    /// Acquire the package's source material into a fresh workspace.
    ///
    /// On success the caller owns the returned workspace and must release it.
    pub async fn acquire(&self, package: &PackageDescriptor, options: &AcquireOptions) -> Result<Workspace, ScoringError> {
        let Some(strategy) = selected_strategy(package) else {
            return Err(ScoringError::NoDownloader(package.name.clone()));
        };
        log::debug!(target: LOG_TARGET, "Acquiring '{}' via {strategy:?}", package.name);

        let workspace = self
            .root
            .workspace(&package.name)
            .map_err(|e| ScoringError::acquisition(format!("creating workspace for '{}'", package.name), e))?;

        let downloaded = match strategy {
            Strategy::HostApi => host_api::download(&self.client, package, options, workspace.path()).await,
            Strategy::Git => git::download(package, workspace.path()).await,
            Strategy::Registry => registry::download(&self.client, package, options, workspace.path()).await,
        };

        match downloaded {
            Ok(()) => Ok(workspace),
            Err(e) => {
                if let Err(cleanup) = workspace.release() {
                    log::warn!(target: LOG_TARGET, "Could not tear down workspace of '{}': {cleanup}", package.name);
                }
                Err(e)
            }
        }
    }
}

/// Extract a gzipped tarball into `dest`, dropping the first `strip` path
/// components of every entry. Entries that would land outside `dest` are
/// rejected.
pub(crate) async fn extract_tarball(bytes: Vec<u8>, dest: PathBuf, strip: usize) -> Result<()> {
    tokio::task::spawn_blocking(move || extract_tarball_blocking(&bytes, &dest, strip))
        .await
        .into_app_err("tarball extraction task failed")?
}

fn extract_tarball_blocking(bytes: &[u8], dest: &Path, strip: usize) -> Result<()> {
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(bytes));

    for entry in archive.entries().into_app_err("unable to read tarball")? {
        let mut entry = entry.into_app_err("unable to read tarball entry")?;
        let path = entry
            .path()
            .into_app_err("tarball entry has an invalid path")?
            .into_owned();

        let mut components = path.components();
        for _ in 0..strip {
            let _ = components.next();
        }
        let relative = components.as_path();
        if relative.as_os_str().is_empty() {
            continue;
        }
        if relative.components().any(|component| !matches!(component, Component::Normal(_))) {
            bail!("tarball entry '{}' escapes the workspace", path.display());
        }

        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).into_app_err_with(|| format!("unable to create {}", parent.display()))?;
        }
        let _ = entry
            .unpack(&target)
            .into_app_err_with(|| format!("unable to unpack {}", target.display()))?;
    }

    Ok(())
}
