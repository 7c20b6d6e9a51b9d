//! Run totals and the optional per-item CSV report.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::debug;

use super::ReportError;
use crate::download::UNKNOWN_ARTIST;
use crate::item::WorkItem;

/// File and byte counts for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub files: usize,
    pub bytes: u64,
}

impl Totals {
    fn add(&mut self, files: usize, bytes: u64) {
        self.files += files;
        self.bytes += bytes;
    }
}

/// One CSV row, one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub source_url: String,
    pub title: String,
    pub author: String,
    pub reader: String,
    pub project: String,
    pub output_dir: String,
    pub track_count: usize,
    pub file_count: usize,
    pub total_bytes: u64,
    pub mode: String,
}

#[derive(Debug, Default)]
struct State {
    total: Totals,
    by_author: BTreeMap<String, Totals>,
    by_project: BTreeMap<String, Totals>,
    rows: Vec<SummaryRow>,
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    mode: &'a str,
    timestamp: String,
    total: Totals,
    by_author: &'a BTreeMap<String, Totals>,
    by_project: &'a BTreeMap<String, Totals>,
}

/// Collects per-item counts from concurrent workers.
#[derive(Debug)]
pub struct SummaryCollector {
    mode: String,
    capture_rows: bool,
    state: Mutex<State>,
}

impl SummaryCollector {
    /// Collector for a run in `mode`; rows are kept only when `capture_rows` is set.
    #[must_use]
    pub fn new(mode: impl Into<String>, capture_rows: bool) -> Self {
        Self {
            mode: mode.into(),
            capture_rows,
            state: Mutex::new(State::default()),
        }
    }

    /// Records one finished item.
    ///
    /// `file_count` is the planned count in dry-run mode and the downloaded
    /// count otherwise.
    pub fn add_item(&self, item: &WorkItem, item_dir: &Path, file_count: usize, bytes: u64) {
        let author = item
            .author
            .clone()
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
        let project = item
            .context
            .collection_root
            .clone()
            .or_else(|| item.title.clone())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.total.add(file_count, bytes);
        state.by_author.entry(author.clone()).or_default().add(file_count, bytes);
        state.by_project.entry(project.clone()).or_default().add(file_count, bytes);
        if self.capture_rows {
            state.rows.push(SummaryRow {
                source_url: item.source_url.clone(),
                title: item.title.clone().unwrap_or_default(),
                author,
                reader: item.reader.clone().unwrap_or_default(),
                project,
                output_dir: item_dir.display().to_string(),
                track_count: item.tracks.len(),
                file_count,
                total_bytes: bytes,
                mode: self.mode.clone(),
            });
        }
    }

    /// Totals across every recorded item.
    #[must_use]
    pub fn total(&self) -> Totals {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).total
    }

    /// Copy of the captured rows, in recording order.
    #[must_use]
    pub fn rows(&self) -> Vec<SummaryRow> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .clone()
    }

    /// Writes the JSON summary to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on I/O or serialization failure.
    pub fn write_summary(&self, path: &Path) -> Result<(), ReportError> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let report = SummaryReport {
            mode: &self.mode,
            timestamp: chrono::Local::now().to_rfc3339(),
            total: state.total,
            by_author: &state.by_author,
            by_project: &state.by_project,
        };
        let mut writer = BufWriter::new(create(path)?);
        serde_json::to_writer_pretty(&mut writer, &report).map_err(|source| ReportError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(|e| ReportError::io(path, e))?;
        debug!(path = %path.display(), "summary written");
        Ok(())
    }

    /// Writes the captured rows as CSV to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] on I/O or CSV failure.
    pub fn write_csv(&self, path: &Path) -> Result<(), ReportError> {
        let csv_error = |source| ReportError::Csv {
            path: path.to_path_buf(),
            source,
        };
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut writer = csv::Writer::from_writer(create(path)?);
        if state.rows.is_empty() {
            writer
                .write_record(CSV_HEADER)
                .map_err(csv_error)?;
        }
        for row in &state.rows {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush().map_err(|e| ReportError::io(path, e))?;
        debug!(path = %path.display(), rows = state.rows.len(), "CSV report written");
        Ok(())
    }
}

const CSV_HEADER: [&str; 10] = [
    "source_url",
    "title",
    "author",
    "reader",
    "project",
    "output_dir",
    "track_count",
    "file_count",
    "total_bytes",
    "mode",
];

fn create(path: &Path) -> Result<fs::File, ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }
    fs::File::create(path).map_err(|e| ReportError::io(path, e))
}

/// Sum of the on-disk sizes of `files`; unreadable entries count as zero.
#[must_use]
pub fn bytes_on_disk(files: &[PathBuf]) -> u64 {
    files
        .iter()
        .filter_map(|f| fs::metadata(f).ok())
        .map(|m| m.len())
        .sum()
}
