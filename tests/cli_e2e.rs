//! End-to-end CLI tests for the litaudio binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn litaudio() -> Command {
    Command::cargo_bin("litaudio").unwrap()
}

/// Without any URL the run has nothing to do and fails.
#[test]
fn test_binary_without_urls_fails() {
    let dir = TempDir::new().unwrap();
    litaudio()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("No URL provided"));
}

#[test]
fn test_binary_help_displays_usage() {
    litaudio()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("litteratureaudio.com"))
        .stdout(predicate::str::contains("--no-duplicates"));
}

#[test]
fn test_binary_version_displays_version() {
    litaudio()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("litaudio"));
}

#[test]
fn test_binary_invalid_format_returns_error() {
    litaudio()
        .args(["--format", "flac"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("flac"));
}

#[test]
fn test_binary_missing_txt_file_fails() {
    let dir = TempDir::new().unwrap();
    litaudio()
        .current_dir(dir.path())
        .args(["--txt", "nope.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--txt"));
}

#[test]
fn test_verify_missing_dir_fails() {
    let dir = TempDir::new().unwrap();
    litaudio()
        .arg("--verify")
        .arg(dir.path().join("absent"))
        .assert()
        .failure();
}

#[test]
fn test_verify_empty_dir_succeeds() {
    let dir = TempDir::new().unwrap();
    litaudio().arg("--verify").arg(dir.path()).assert().success();
}

#[test]
fn test_verify_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let item = dir.path().join("Nana");
    std::fs::create_dir_all(&item).unwrap();
    std::fs::write(
        item.join("Nana.json"),
        r#"{"metadata": {"title": "Nana"}, "downloaded_files": ["nana.mp3"], "tracks": []}"#,
    )
    .unwrap();
    litaudio()
        .arg("--verify")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("missing file"));
}
