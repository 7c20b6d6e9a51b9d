//! Run options shared by the crawler and the download pipeline.
//!
//! The binary builds a [`RunOptions`] from the command line; the library
//! never reads arguments or the environment itself.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::download::DEFAULT_MAX_RETRIES;
use crate::site::SITE_BASE_URL;

/// Default number of items downloaded concurrently.
pub const DEFAULT_THREADS: usize = 4;

/// Upper bound accepted for `threads`.
pub const MAX_THREADS: usize = 32;

/// Which files of an item to download.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadFormat {
    /// MP3 tracks, else the ZIP archive.
    #[default]
    Default,
    Mp3,
    Zip,
    Mp3Zip,
    /// Every track, MP3 and resolved link.
    All,
    /// ZIP archives, extracted after download.
    Unzip,
}

impl DownloadFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Mp3 => "mp3",
            Self::Zip => "zip",
            Self::Mp3Zip => "mp3+zip",
            Self::All => "all",
            Self::Unzip => "unzip",
        }
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a run needs to know.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// Items downloaded concurrently.
    pub threads: usize,
    /// Minimum pause between two requests to the same host; zero disables pacing.
    pub sleep: Duration,
    pub max_retries: u32,
    pub format: DownloadFormat,
    pub write_json: bool,
    pub write_cover: bool,
    pub write_description: bool,
    pub write_id3: bool,
    /// Listing pages followed per listing; `None` means no cap.
    pub max_pages: Option<usize>,
    pub dry_run: bool,
    pub metadata_only: bool,
    /// Replace already-downloaded folders with shortcuts.
    pub no_duplicates: bool,
    /// Site root used for the metadata API.
    pub base_url: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("dl"),
            threads: DEFAULT_THREADS,
            sleep: Duration::ZERO,
            max_retries: DEFAULT_MAX_RETRIES,
            format: DownloadFormat::Default,
            write_json: true,
            write_cover: true,
            write_description: true,
            write_id3: true,
            max_pages: None,
            dry_run: false,
            metadata_only: false,
            no_duplicates: false,
            base_url: SITE_BASE_URL.to_string(),
        }
    }
}

impl RunOptions {
    /// Worker count clamped to `1..=MAX_THREADS`.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.threads.clamp(1, MAX_THREADS)
    }

    /// Mode name used in summaries.
    #[must_use]
    pub fn mode(&self) -> &'static str {
        if self.dry_run {
            "dry-run"
        } else if self.metadata_only {
            "metadata-only"
        } else {
            "download"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RunOptions::default();
        assert_eq!(options.worker_count(), DEFAULT_THREADS);
        assert_eq!(options.format, DownloadFormat::Default);
        assert_eq!(options.base_url, SITE_BASE_URL);
        assert_eq!(options.mode(), "download");
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let mut options = RunOptions {
            threads: 0,
            ..RunOptions::default()
        };
        assert_eq!(options.worker_count(), 1);
        options.threads = 500;
        assert_eq!(options.worker_count(), MAX_THREADS);
    }

    #[test]
    fn test_mode_prefers_dry_run() {
        let options = RunOptions {
            dry_run: true,
            metadata_only: true,
            ..RunOptions::default()
        };
        assert_eq!(options.mode(), "dry-run");
    }

    #[test]
    fn test_format_names() {
        assert_eq!(DownloadFormat::Mp3Zip.to_string(), "mp3+zip");
        assert_eq!(DownloadFormat::Unzip.as_str(), "unzip");
    }
}
