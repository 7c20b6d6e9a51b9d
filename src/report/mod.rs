//! Everything written about a run rather than downloaded by it.
//!
//! # Overview
//!
//! - [`export_json`] and [`export_description`]: per-item sidecar and `description.txt`
//! - [`SummaryCollector`]: run totals by author and project, plus CSV rows
//! - [`DryRunReporter`]: the dry-run log, one line per item
//! - [`ProjectProgressTracker`]: finished children per collection
//! - [`verify_output`]: checks an output tree against its sidecars
//!
//! Collectors are shared between download workers behind `&self` methods.

mod dry_run;
mod export;
mod progress;
mod summary;
mod verify;

pub use dry_run::{DRY_RUN_REPORT, DryRunReporter};
pub use export::{DESCRIPTION_FILE, ExportError, TOOL_NAME, export_description, export_json, sidecar_path};
pub use progress::ProjectProgressTracker;
pub use summary::{SummaryCollector, SummaryRow, Totals, bytes_on_disk};
pub use verify::{VerifyError, VerifyReport, verify_output};

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Default `--summary-report` path.
pub const SUMMARY_REPORT: &str = "summary-report.json";

/// Default `--csv-report` path.
pub const CSV_REPORT: &str = "report.csv";

/// Errors writing run-level report files.
#[derive(Debug, Error)]
pub enum ReportError {
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
    #[error("CSV error for {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ReportError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
