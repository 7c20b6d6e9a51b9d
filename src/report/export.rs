//! Per-item metadata files: the JSON sidecar and `description.txt`.
//!
//! The sidecar is rewritten on every run so its `downloaded_files` list always
//! matches what the run left on disk.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::item::{DownloadLink, ItemContext, Track, WorkItem};

/// Name of the description file written next to the sidecar.
pub const DESCRIPTION_FILE: &str = "description.txt";

/// Value of the sidecar's `tool` field.
pub const TOOL_NAME: &str = "litaudio";

/// Errors produced while writing item metadata files.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON serialization error for {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ExportError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Serialize)]
struct Sidecar<'a> {
    tool: &'static str,
    version: &'static str,
    timestamp: String,
    source_url: &'a str,
    metadata: Metadata<'a>,
    download_links: &'a [DownloadLink],
    tracks: &'a [Track],
    downloaded_files: Vec<String>,
    context: &'a ItemContext,
    extra: &'a Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct Metadata<'a> {
    title: Option<&'a str>,
    author: Option<&'a str>,
    reader: Option<&'a str>,
    series: Option<&'a str>,
    language: Option<&'a str>,
    duration: Option<&'a str>,
    description: Option<&'a str>,
    cover_url: Option<&'a str>,
    is_collective_project: bool,
}

/// Sidecar location for an item named `item_name` stored in `item_dir`.
#[must_use]
pub fn sidecar_path(item_dir: &Path, item_name: &str) -> PathBuf {
    item_dir.join(format!("{item_name}.json"))
}

/// Writes the JSON sidecar of `item` to `path`, listing `downloaded` by file name.
///
/// An existing file is replaced. A partially written file is removed.
///
/// # Errors
///
/// Returns [`ExportError`] on I/O or serialization failure.
#[instrument(skip(item, downloaded), fields(url = %item.source_url))]
pub fn export_json(item: &WorkItem, path: &Path, downloaded: &[PathBuf]) -> Result<(), ExportError> {
    let sidecar = build_sidecar(item, downloaded);
    let file = fs::File::create(path).map_err(|e| ExportError::io(path, e))?;

    let write_result = {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &sidecar)
            .map_err(|source| ExportError::Json {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|()| writer.flush().map_err(|e| ExportError::io(path, e)))
    };
    if let Err(err) = write_result {
        let _ = fs::remove_file(path);
        return Err(err);
    }

    debug!(path = %path.display(), files = downloaded.len(), "sidecar written");
    Ok(())
}

/// Writes `description` (trimmed, newline-terminated) to `dir/description.txt`.
///
/// Returns `Ok(false)` without touching the disk when there is no description.
///
/// # Errors
///
/// Returns [`ExportError::Io`] when the file cannot be written.
pub fn export_description(description: Option<&str>, dir: &Path) -> Result<bool, ExportError> {
    let Some(text) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(false);
    };
    let path = dir.join(DESCRIPTION_FILE);
    fs::write(&path, format!("{text}\n")).map_err(|e| ExportError::io(&path, e))?;
    Ok(true)
}

fn build_sidecar<'a>(item: &'a WorkItem, downloaded: &[PathBuf]) -> Sidecar<'a> {
    Sidecar {
        tool: TOOL_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Local::now().to_rfc3339(),
        source_url: &item.source_url,
        metadata: Metadata {
            title: item.title.as_deref(),
            author: item.author.as_deref(),
            reader: item.reader.as_deref(),
            series: item.series.as_deref(),
            language: item.language.as_deref(),
            duration: item.duration.as_deref(),
            description: item.description.as_deref(),
            cover_url: item.cover_url.as_deref(),
            is_collective_project: item.is_collective_project,
        },
        download_links: &item.download_links,
        tracks: &item.tracks,
        downloaded_files: downloaded
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect(),
        context: &item.context,
        extra: &item.extra,
    }
}
