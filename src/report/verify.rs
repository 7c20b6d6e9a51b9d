//! Post-hoc check of an output tree against its JSON sidecars.
//!
//! Every `*.json` under the root is read as a sidecar. Files it lists as
//! downloaded must exist next to it, and items with tracks must have at least
//! as many `.mp3` files as tracks (unless nothing was downloaded or only a
//! ZIP was). Findings are logged as warnings; the returned [`VerifyReport`]
//! carries the counts.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::download::UNKNOWN_ARTIST;
use crate::layout::sanitize_name;

/// Missing track titles logged per item.
const TITLE_SAMPLE: usize = 5;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verify path does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Counts gathered by [`verify_output`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Sidecars successfully read.
    pub scanned: usize,
    pub missing_files: usize,
    pub missing_tracks: usize,
}

impl VerifyReport {
    /// True when nothing is missing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.missing_files == 0 && self.missing_tracks == 0
    }
}

#[derive(Debug, Default, Deserialize)]
struct SidecarRecord {
    #[serde(default)]
    metadata: RecordMetadata,
    downloaded_files: Option<Vec<String>>,
    tracks: Option<Vec<RecordTrack>>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordMetadata {
    title: Option<String>,
    author: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordTrack {
    title: Option<String>,
}

/// Verifies every sidecar under `root`.
///
/// # Errors
///
/// Returns [`VerifyError::MissingRoot`] when `root` does not exist and
/// [`VerifyError::Io`] when it cannot be listed.
#[instrument]
pub fn verify_output(root: &Path) -> Result<VerifyReport, VerifyError> {
    if !root.exists() {
        return Err(VerifyError::MissingRoot(root.to_path_buf()));
    }
    let mut sidecars = Vec::new();
    collect_json(root, &mut sidecars).map_err(|source| VerifyError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    sidecars.sort();

    let mut report = VerifyReport::default();
    if sidecars.is_empty() {
        warn!(root = %root.display(), "no JSON metadata found");
        return Ok(report);
    }

    for path in &sidecars {
        let record = match read_record(path) {
            Ok(record) => record,
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to read sidecar");
                continue;
            }
        };
        report.scanned += 1;
        check_record(path, &record, &mut report);
    }

    info!(
        json = report.scanned,
        missing_files = report.missing_files,
        missing_tracks = report.missing_tracks,
        "verify summary"
    );
    Ok(report)
}

fn read_record(path: &Path) -> Result<SidecarRecord, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn check_record(path: &Path, record: &SidecarRecord, report: &mut VerifyReport) {
    let item_dir = path.parent().unwrap_or(Path::new("."));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let title = record.metadata.title.as_deref().unwrap_or(&stem);
    let author = record.metadata.author.as_deref().unwrap_or(UNKNOWN_ARTIST);
    let label = format!("Author: {author} | Book: {title}");

    let expected = record.downloaded_files.as_deref().unwrap_or_default();
    for name in expected {
        if !item_dir.join(name).exists() {
            report.missing_files += 1;
            warn!(file = %name, label = %label, dir = %item_dir.display(), "missing file");
        }
    }

    let tracks = record.tracks.as_deref().unwrap_or_default();
    if tracks.is_empty() {
        return;
    }
    let has_ext = |ext: &str| expected.iter().any(|n| n.to_lowercase().ends_with(ext));
    if expected.is_empty() {
        info!(label = %label, "no downloaded files, skipping track check");
        return;
    }
    if has_ext(".zip") && !has_ext(".mp3") {
        info!(label = %label, "zip-only entry, skipping track check");
        return;
    }

    let stems = mp3_stems(item_dir);
    if stems.len() >= tracks.len() {
        return;
    }
    report.missing_tracks += tracks.len() - stems.len();
    warn!(
        label = %label,
        expected = tracks.len(),
        found = stems.len(),
        dir = %item_dir.display(),
        "missing tracks"
    );

    let sample: Vec<&str> = tracks
        .iter()
        .filter_map(|t| t.title.as_deref())
        .filter(|t| {
            let norm = normalize_for_match(t);
            !norm.is_empty() && !stems.iter().any(|s| s.contains(&norm))
        })
        .take(TITLE_SAMPLE)
        .collect();
    if !sample.is_empty() {
        info!(sample = %sample.join(", "), "missing titles");
    }
}

/// Normalized stems of the `.mp3` files directly inside `dir`.
fn mp3_stems(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("mp3"))
        })
        .filter_map(|p| p.file_stem().map(|s| normalize_for_match(&s.to_string_lossy())))
        .collect()
}

/// Lower-cased alphanumerics of the sanitized text.
fn normalize_for_match(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    sanitize_name(text)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Recursively gathers `*.json` files. Symlinked directories are not followed.
fn collect_json(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if let Err(error) = collect_json(&path, out) {
                warn!(dir = %path.display(), error = %error, "cannot read directory");
            }
        } else if file_type.is_file() && path.extension().is_some_and(|e| e == "json") {
            out.push(path);
        }
    }
    Ok(())
}
