//! Repository-host API download strategy.
//!
//! Downloads a repository snapshot tarball through the host's archive endpoint,
//! authenticating from a round-robin token pool. Rate-limit waiting is explicit
//! opt-in; by default a rate-limited request fails.

use super::{AcquireOptions, PackageDescriptor, extract_tarball};
use crate::error::ScoringError;
use chrono::Utc;
use core::time::Duration;
use ohno::{app_err, bail};
use reqwest::{Client, StatusCode, header};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

const LOG_TARGET: &str = "   acquire";
const MAX_RATE_LIMIT_WAIT_SECS: i64 = 3600;

/// Hosts whose archive endpoint this strategy understands.
pub const SUPPORTED_HOSTS: &[&str] = &["github.com"];

/// Round-robin pool of host API tokens, spreading rate-limit budgets across
/// accounts.
#[derive(Debug, Default)]
pub struct TokenPool {
    tokens: Vec<String>,
    cursor: AtomicUsize,
}

impl TokenPool {
    #[must_use]
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            cursor: AtomicUsize::new(0),
        }
    }

    /// The next token in round-robin order, if the pool holds any.
    #[must_use]
    pub fn next(&self) -> Option<&str> {
        if self.tokens.is_empty() {
            return None;
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.tokens.len();
        Some(&self.tokens[index])
    }
}

/// Whether this strategy can handle the package's repository URL.
#[must_use]
pub fn claims(package: &PackageDescriptor) -> bool {
    package
        .repository
        .as_ref()
        .and_then(Url::host_str)
        .is_some_and(|host| SUPPORTED_HOSTS.contains(&host))
}

fn owner_and_repo(repository: &Url) -> crate::Result<(String, String)> {
    let mut segments = repository
        .path_segments()
        .ok_or_else(|| app_err!("repository URL '{repository}' has no path"))?;
    let owner = segments.next().filter(|s| !s.is_empty());
    let repo = segments.next().filter(|s| !s.is_empty());

    match (owner, repo) {
        (Some(owner), Some(repo)) => Ok((owner.to_owned(), repo.trim_end_matches(".git").to_owned())),
        _ => bail!("repository URL '{repository}' does not name an owner and repository"),
    }
}

/// Download the repository tarball into the workspace.
pub async fn download(
    client: &Client,
    package: &PackageDescriptor,
    options: &AcquireOptions,
    dest: &Path,
) -> Result<(), ScoringError> {
    let context = || format!("downloading '{}' through the host API", package.name);

    let repository = package
        .repository
        .as_ref()
        .ok_or_else(|| ScoringError::acquisition(context(), "package has no repository URL"))?;
    let (owner, repo) = owner_and_repo(repository).map_err(|e| ScoringError::acquisition(context(), e))?;

    let archive_url = options
        .archive_base
        .join(&format!("{owner}/{repo}/tar.gz/HEAD"))
        .map_err(|e| ScoringError::acquisition(context(), e))?;

    loop {
        let mut request = client.get(archive_url.clone());
        if let Some(token) = options.tokens.next() {
            request = request.header(header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await.map_err(|e| ScoringError::acquisition(context(), e))?;
        let status = response.status();

        if status == StatusCode::FORBIDDEN {
            let reset = rate_limit_reset(&response);
            if !options.wait_rate_limit {
                return Err(ScoringError::acquisition(
                    context(),
                    format!("rate limited by {}", archive_url.host_str().unwrap_or("host")),
                ));
            }

            let wait_secs = reset
                .map(|reset| reset - Utc::now().timestamp())
                .unwrap_or(MAX_RATE_LIMIT_WAIT_SECS)
                .clamp(1, MAX_RATE_LIMIT_WAIT_SECS);
            log::warn!(target: LOG_TARGET, "Rate limited while fetching {owner}/{repo}, waiting {wait_secs}s");
            tokio::time::sleep(Duration::from_secs(wait_secs as u64)).await;
            continue;
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ScoringError::PackageNotFound(package.name.clone()));
        }
        if !status.is_success() {
            return Err(ScoringError::acquisition(context(), format!("host returned {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ScoringError::acquisition(context(), e))?
            .to_vec();
        log::debug!(target: LOG_TARGET, "Downloaded {} bytes for {owner}/{repo}", bytes.len());

        // Host archives nest everything under a single top-level directory.
        return extract_tarball(bytes, dest.to_path_buf(), 1)
            .await
            .map_err(|e| ScoringError::acquisition(context(), e));
    }
}

fn rate_limit_reset(response: &reqwest::Response) -> Option<i64> {
    response
        .headers()
        .get("x-ratelimit-reset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(repository: Option<&str>) -> PackageDescriptor {
        PackageDescriptor {
            name: "left-pad".into(),
            version: Some("1.3.0".into()),
            repository: repository.map(|u| Url::parse(u).unwrap()),
        }
    }

    #[test]
    fn claims_only_supported_hosts() {
        assert!(claims(&package(Some("https://github.com/owner/repo"))));
        assert!(!claims(&package(Some("https://example.com/owner/repo"))));
        assert!(!claims(&package(None)));
    }

    #[test]
    fn owner_and_repo_come_from_the_url_path() {
        let (owner, repo) = owner_and_repo(&Url::parse("https://github.com/stevemao/left-pad.git").unwrap()).unwrap();
        assert_eq!(owner, "stevemao");
        assert_eq!(repo, "left-pad");

        assert!(owner_and_repo(&Url::parse("https://github.com/").unwrap()).is_err());
    }

    #[test]
    fn token_pool_rotates() {
        let pool = TokenPool::new(vec!["a".into(), "b".into()]);
        assert_eq!(pool.next(), Some("a"));
        assert_eq!(pool.next(), Some("b"));
        assert_eq!(pool.next(), Some("a"));

        assert_eq!(TokenPool::default().next(), None);
    }
}
