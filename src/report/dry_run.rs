//! Line-per-item log of what a dry run would have done.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::ReportError;

/// Default dry-run log location, relative to the working directory.
pub const DRY_RUN_REPORT: &str = "dry-run-report.log";

/// Appends dry-run lines to a file truncated when the reporter is created.
#[derive(Debug)]
pub struct DryRunReporter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DryRunReporter {
    /// Creates (or empties) the log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the file cannot be created.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let path = path.into();
        fs::write(&path, "").map_err(|e| ReportError::io(&path, e))?;
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one line.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the file cannot be written.
    pub fn write_line(&self, line: &str) -> Result<(), ReportError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| ReportError::io(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| ReportError::io(&self.path, e))
    }
}
