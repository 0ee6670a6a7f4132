//! Acquisition cascade behavior against a stubbed registry and host.

use pkgrank::acquire::{AcquireOptions, Acquirer, PackageDescriptor, Strategy, WorkspaceRoot, selected_strategy};
use pkgrank::error::{ErrorKind, ScoringError};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn package(name: &str, version: Option<&str>, repository: Option<&str>) -> PackageDescriptor {
    PackageDescriptor {
        name: name.to_owned(),
        version: version.map(str::to_owned),
        repository: repository.map(|u| Url::parse(u).unwrap()),
    }
}

/// A gzipped tarball holding the given entries.
fn tarball(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, contents.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn residual_entries(root: &std::path::Path) -> usize {
    std::fs::read_dir(root).unwrap().count()
}

#[test]
fn cascade_order_is_a_contract() {
    // Host API first, generic clone second, registry tarball last.
    assert_eq!(
        selected_strategy(&package("a", Some("1.0.0"), Some("https://github.com/owner/repo"))),
        Some(Strategy::HostApi)
    );
    assert_eq!(
        selected_strategy(&package("a", Some("1.0.0"), Some("https://gitlab.example.com/owner/repo"))),
        Some(Strategy::Git)
    );
    assert_eq!(selected_strategy(&package("a", Some("1.0.0"), None)), Some(Strategy::Registry));
    assert_eq!(selected_strategy(&package("a", None, None)), None);
}

#[tokio::test]
async fn registry_fallback_downloads_and_extracts_the_tarball() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/left-pad/-/left-pad-1.3.0.tgz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(tarball(&[
            ("package/index.js", "module.exports = 1;"),
            ("package/lib/util.js", ""),
        ])))
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let acquirer = Acquirer::new(WorkspaceRoot::new(scratch.path()).unwrap()).unwrap();
    let options = AcquireOptions {
        registry_base: Url::parse(&server.uri()).unwrap(),
        ..AcquireOptions::default()
    };

    let workspace = acquirer
        .acquire(&package("left-pad", Some("1.3.0"), None), &options)
        .await
        .unwrap();

    assert!(workspace.path().join("index.js").is_file());
    assert!(workspace.path().join("lib/util.js").is_file());
    workspace.release().unwrap();
    assert_eq!(residual_entries(scratch.path()), 0);
}

#[tokio::test]
async fn missing_registry_package_is_unrecoverable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let acquirer = Acquirer::new(WorkspaceRoot::new(scratch.path()).unwrap()).unwrap();
    let options = AcquireOptions {
        registry_base: Url::parse(&server.uri()).unwrap(),
        ..AcquireOptions::default()
    };

    let err = acquirer
        .acquire(&package("gone", Some("1.0.0"), None), &options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PackageNotFound);
    assert!(err.is_unrecoverable());
    assert_eq!(residual_entries(scratch.path()), 0);
}

#[tokio::test]
async fn failed_download_leaves_no_residual_workspace() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a gzip stream".to_vec()))
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let acquirer = Acquirer::new(WorkspaceRoot::new(scratch.path()).unwrap()).unwrap();
    let options = AcquireOptions {
        registry_base: Url::parse(&server.uri()).unwrap(),
        ..AcquireOptions::default()
    };

    let err = acquirer
        .acquire(&package("corrupt", Some("1.0.0"), None), &options)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Acquisition);
    assert_eq!(residual_entries(scratch.path()), 0);
}

#[tokio::test]
async fn host_api_downloads_the_repository_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stevemao/left-pad/tar.gz/HEAD"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(tarball(&[("left-pad-HEAD/package.json", "{}")])),
        )
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let acquirer = Acquirer::new(WorkspaceRoot::new(scratch.path()).unwrap()).unwrap();
    let options = AcquireOptions {
        archive_base: Url::parse(&server.uri()).unwrap(),
        ..AcquireOptions::default()
    };

    let workspace = acquirer
        .acquire(
            &package("left-pad", Some("1.3.0"), Some("https://github.com/stevemao/left-pad")),
            &options,
        )
        .await
        .unwrap();

    assert!(workspace.path().join("package.json").is_file());
    workspace.release().unwrap();
}

#[tokio::test]
async fn waiting_through_a_rate_limit_retries_the_download() {
    let server = MockServer::start().await;
    // First request is rate limited with an already-elapsed reset; the retry
    // after the minimum wait gets the tarball.
    Mock::given(method("GET"))
        .and(path("/stevemao/left-pad/tar.gz/HEAD"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-reset", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stevemao/left-pad/tar.gz/HEAD"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(tarball(&[("left-pad-HEAD/package.json", "{}")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let acquirer = Acquirer::new(WorkspaceRoot::new(scratch.path()).unwrap()).unwrap();
    let options = AcquireOptions {
        archive_base: Url::parse(&server.uri()).unwrap(),
        wait_rate_limit: true,
        ..AcquireOptions::default()
    };

    let workspace = acquirer
        .acquire(
            &package("left-pad", Some("1.3.0"), Some("https://github.com/stevemao/left-pad")),
            &options,
        )
        .await
        .unwrap();

    assert!(workspace.path().join("package.json").is_file());
    workspace.release().unwrap();
}

#[tokio::test]
async fn rate_limited_host_fails_fast_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).insert_header("x-ratelimit-reset", "0"))
        .mount(&server)
        .await;

    let scratch = tempfile::tempdir().unwrap();
    let acquirer = Acquirer::new(WorkspaceRoot::new(scratch.path()).unwrap()).unwrap();
    let options = AcquireOptions {
        archive_base: Url::parse(&server.uri()).unwrap(),
        wait_rate_limit: false,
        ..AcquireOptions::default()
    };

    let err = acquirer
        .acquire(
            &package("left-pad", Some("1.3.0"), Some("https://github.com/stevemao/left-pad")),
            &options,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::Acquisition { .. }));
    assert_eq!(residual_entries(scratch.path()), 0);
}
