//! Full crawl-and-download runs against a wiremock site.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use litaudio_core::config::{DownloadFormat, RunOptions};
use litaudio_core::download::{HttpClient, RateLimiter, RetryPolicy};
use litaudio_core::pipeline::{Pipeline, RunContext, RunStats};
use litaudio_core::report::{SummaryCollector, verify_output};

mod support;
use support::{WORKS, collection_page, work_page, work_url};

fn run_options(out: &Path, server: &MockServer) -> RunOptions {
    RunOptions {
        output_dir: out.to_path_buf(),
        threads: 3,
        max_retries: 0,
        write_id3: false,
        base_url: server.uri(),
        ..RunOptions::default()
    }
}

fn pipeline(options: RunOptions) -> Pipeline {
    let client = HttpClient::with_policies(
        Arc::new(RateLimiter::disabled()),
        RetryPolicy::from_max_retries(0).with_base_delay(Duration::ZERO),
    )
    .unwrap();
    let summary = SummaryCollector::new(options.mode(), true);
    Pipeline::with_context(RunContext::new(client, options, Some(summary), None))
}

async fn mount_page(server: &MockServer, slug: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(format!("{WORKS}/{slug}.html")))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

/// Collection "Sherlock Holmes" by one author with three children; the third
/// child's file is missing on the server.
async fn sherlock_site(server: &MockServer) -> String {
    let root = server.uri();
    mount_page(
        server,
        "doyle-sherlock-holmes",
        collection_page(&root, "Sherlock Holmes", "Arthur Conan Doyle", &["doyle-a", "doyle-b", "doyle-c"]),
    )
    .await;
    for (slug, title, file) in [
        ("doyle-a", "Une étude en rouge", "ok-etude.mp3"),
        ("doyle-b", "Le Signe des quatre", "ok-signe.mp3"),
        ("doyle-c", "Le Chien des Baskerville", "missing.mp3"),
    ] {
        let href = format!("{root}/files/{file}");
        mount_page(server, slug, work_page(&root, title, "Arthur Conan Doyle", Some(&href))).await;
    }
    Mock::given(method("HEAD"))
        .and(path_regex(r"^/files/ok-.*\.mp3$"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "audio/mpeg"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/files/ok-.*\.mp3$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
        .mount(server)
        .await;
    work_url(&root, "doyle-sherlock-holmes")
}

#[tokio::test]
async fn test_collection_run_lays_out_children_under_author_prefix() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let url = sherlock_site(&server).await;

    let pipeline = pipeline(run_options(out.path(), &server));
    let stats = pipeline.run(&[url]).await;
    assert_eq!(stats, RunStats { items: 4, files: 2 });

    let project = out.path().join("Arthur Conan Doyle - Sherlock Holmes");
    assert!(project.join("Sherlock Holmes.json").exists());
    assert!(project.join("Une étude en rouge/ok-etude.mp3").exists());
    assert!(project.join("Le Signe des quatre/ok-signe.mp3").exists());
    let missing = project.join("Le Chien des Baskerville");
    assert!(missing.join("Le Chien des Baskerville.json").exists());
    assert_eq!(fs::read_dir(&missing).unwrap().count(), 1, "only the sidecar");

    let ctx = pipeline.context();
    assert_eq!(ctx.progress.status("Sherlock Holmes"), Some((3, 3)));
    let summary = ctx.summary.as_ref().unwrap();
    assert_eq!(summary.total().files, 2);
    assert_eq!(summary.total().bytes, 128);
    assert_eq!(summary.rows().len(), 4);
}

#[tokio::test]
async fn test_run_output_passes_verification() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let url = sherlock_site(&server).await;

    pipeline(run_options(out.path(), &server)).run(&[url]).await;

    let report = verify_output(out.path()).unwrap();
    assert_eq!(report.scanned, 4);
    assert!(report.is_clean(), "{report:?}");
}

#[tokio::test]
async fn test_deleted_file_fails_verification() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let url = sherlock_site(&server).await;

    pipeline(run_options(out.path(), &server)).run(&[url]).await;
    fs::remove_file(out.path().join("Arthur Conan Doyle - Sherlock Holmes/Une étude en rouge/ok-etude.mp3")).unwrap();

    let report = verify_output(out.path()).unwrap();
    assert_eq!(report.missing_files, 1);
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_sequential_and_pooled_runs_agree() {
    let server = MockServer::start().await;
    let url = sherlock_site(&server).await;

    let (seq_out, pool_out) = (TempDir::new().unwrap(), TempDir::new().unwrap());
    let sequential = pipeline(RunOptions {
        threads: 1,
        ..run_options(seq_out.path(), &server)
    })
    .run(&[url.clone()])
    .await;
    let pooled = pipeline(run_options(pool_out.path(), &server)).run(&[url]).await;
    assert_eq!(sequential, pooled);
}

#[tokio::test]
async fn test_zip_format_without_archive_downloads_nothing() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let url = sherlock_site(&server).await;

    let stats = pipeline(RunOptions {
        format: DownloadFormat::Zip,
        ..run_options(out.path(), &server)
    })
    .run(&[url])
    .await;
    assert_eq!(stats, RunStats { items: 4, files: 0 });
}
