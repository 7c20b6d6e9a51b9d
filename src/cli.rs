//! CLI argument definitions using clap derive macros.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use litaudio_core::config::{DEFAULT_THREADS, DownloadFormat, RunOptions};
use litaudio_core::download::DEFAULT_MAX_RETRIES;
use litaudio_core::report::{CSV_REPORT, SUMMARY_REPORT};
use litaudio_core::site::normalize_url;

/// Download audiobooks from litteratureaudio.com.
///
/// Accepts single works, collections and author, reader or member listings,
/// and lays them out as `Author/Project/Book` folders.
#[derive(Parser, Debug)]
#[command(name = "litaudio")]
#[command(author, version, about)]
#[allow(clippy::struct_excessive_bools)]
pub struct Args {
    /// URLs to process
    pub urls: Vec<String>,

    /// Text file with one URL per line (`#` starts a comment)
    #[arg(long = "txt", value_name = "FILE")]
    pub txt_file: Option<PathBuf>,

    /// Output folder
    #[arg(short, long, default_value = "./dl")]
    pub output: PathBuf,

    /// Items downloaded concurrently (1-32)
    #[arg(short, long, default_value_t = DEFAULT_THREADS as u8, value_parser = clap::value_parser!(u8).range(1..=32))]
    pub threads: u8,

    /// Minimum delay between requests to the same host, in seconds (0 disables)
    #[arg(long, default_value_t = 0.0, value_parser = parse_seconds)]
    pub sleep: f64,

    /// Maximum retry attempts for transient failures (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Which files to download
    #[arg(long, value_enum, default_value_t = FormatArg::Default)]
    pub format: FormatArg,

    /// Do not export JSON metadata
    #[arg(long)]
    pub no_json: bool,

    /// Do not download cover images
    #[arg(long)]
    pub no_cover: bool,

    /// Do not export description.txt
    #[arg(long)]
    pub no_description: bool,

    /// Do not write ID3 tags
    #[arg(long)]
    pub no_id3: bool,

    /// Listing pages followed per listing (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    pub max_pages: usize,

    /// Extract only: log what would be downloaded, write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Download cover, description and JSON only
    #[arg(long)]
    pub metadata_only: bool,

    /// Create relative shortcuts for albums already downloaded in this run
    #[arg(long)]
    pub no_duplicates: bool,

    /// Write a JSON summary report
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = SUMMARY_REPORT)]
    pub summary_report: Option<PathBuf>,

    /// Write a CSV report, one row per item
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = CSV_REPORT)]
    pub csv_report: Option<PathBuf>,

    /// Verify a folder against its JSON sidecars and report missing tracks
    #[arg(long, value_name = "DIR")]
    pub verify: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// `--format` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// MP3 tracks, else the ZIP archive
    Default,
    Mp3,
    Zip,
    #[value(name = "mp3+zip")]
    Mp3Zip,
    /// Every track, MP3 and resolved link
    All,
    /// ZIP archives, extracted into `unzipped/`
    Unzip,
}

impl From<FormatArg> for DownloadFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Default => Self::Default,
            FormatArg::Mp3 => Self::Mp3,
            FormatArg::Zip => Self::Zip,
            FormatArg::Mp3Zip => Self::Mp3Zip,
            FormatArg::All => Self::All,
            FormatArg::Unzip => Self::Unzip,
        }
    }
}

fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|_| format!("`{value}` is not a number"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("`{value}` must be a non-negative number of seconds"));
    }
    Ok(seconds)
}

impl Args {
    /// Log level used when `RUST_LOG` is not set.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }

    /// Positional URLs followed by those of `--txt`, fragment-normalized.
    pub fn load_urls(&self) -> std::io::Result<Vec<String>> {
        let mut urls = self.urls.clone();
        if let Some(path) = &self.txt_file {
            let text = fs::read_to_string(path)?;
            urls.extend(
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }
        Ok(urls
            .iter()
            .filter(|u| !u.trim().is_empty())
            .map(|u| normalize_url(u.trim()))
            .collect())
    }

    /// Library options for this invocation.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            output_dir: self.output.clone(),
            threads: usize::from(self.threads),
            sleep: if self.sleep > 0.0 {
                Duration::from_secs_f64(self.sleep)
            } else {
                Duration::ZERO
            },
            max_retries: u32::from(self.max_retries),
            format: self.format.into(),
            write_json: !self.no_json,
            write_cover: !self.no_cover,
            write_description: !self.no_description,
            write_id3: !self.no_id3,
            max_pages: (self.max_pages > 0).then_some(self.max_pages),
            dry_run: self.dry_run,
            metadata_only: self.metadata_only,
            no_duplicates: self.no_duplicates,
            ..RunOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_defaults() {
        let args = Args::try_parse_from(["litaudio"]).unwrap();
        assert!(args.urls.is_empty());
        assert_eq!(args.output, PathBuf::from("./dl"));
        assert_eq!(args.threads, 4);
        assert_eq!(args.max_retries, 3);
        assert_eq!(args.format, FormatArg::Default);
        assert_eq!(args.summary_report, None);
        assert_eq!(args.default_log_level(), "info");

        let options = args.run_options();
        assert_eq!(options.max_pages, None);
        assert_eq!(options.sleep, Duration::ZERO);
        assert!(options.write_json && options.write_cover && options.write_id3);
    }

    #[test]
    fn test_cli_format_values() {
        let args = Args::try_parse_from(["litaudio", "--format", "mp3+zip"]).unwrap();
        assert_eq!(DownloadFormat::from(args.format), DownloadFormat::Mp3Zip);
        let args = Args::try_parse_from(["litaudio", "--format", "unzip"]).unwrap();
        assert_eq!(args.run_options().format, DownloadFormat::Unzip);
        assert!(Args::try_parse_from(["litaudio", "--format", "flac"]).is_err());
    }

    #[test]
    fn test_cli_threads_range() {
        assert_eq!(Args::try_parse_from(["litaudio", "-t", "32"]).unwrap().threads, 32);
        assert!(Args::try_parse_from(["litaudio", "-t", "0"]).is_err());
        assert!(Args::try_parse_from(["litaudio", "--threads", "33"]).is_err());
    }

    #[test]
    fn test_cli_sleep_must_be_non_negative() {
        let args = Args::try_parse_from(["litaudio", "--sleep", "1.5"]).unwrap();
        assert_eq!(args.run_options().sleep, Duration::from_millis(1500));
        assert!(Args::try_parse_from(["litaudio", "--sleep", "-1"]).is_err());
        assert!(Args::try_parse_from(["litaudio", "--sleep", "soon"]).is_err());
    }

    #[test]
    fn test_cli_reports_with_and_without_path() {
        let args = Args::try_parse_from(["litaudio", "--summary-report", "--csv-report", "out.csv"]).unwrap();
        assert_eq!(args.summary_report, Some(PathBuf::from(SUMMARY_REPORT)));
        assert_eq!(args.csv_report, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_cli_switches_map_to_options() {
        let args = Args::try_parse_from([
            "litaudio",
            "--no-json",
            "--no-cover",
            "--no-description",
            "--no-id3",
            "--max-pages",
            "2",
            "--dry-run",
            "--no-duplicates",
        ])
        .unwrap();
        let options = args.run_options();
        assert!(!options.write_json && !options.write_cover && !options.write_description && !options.write_id3);
        assert_eq!(options.max_pages, Some(2));
        assert!(options.dry_run && options.no_duplicates);
        assert_eq!(options.mode(), "dry-run");
    }

    #[test]
    fn test_cli_verbosity() {
        assert_eq!(Args::try_parse_from(["litaudio", "-v"]).unwrap().default_log_level(), "debug");
        assert_eq!(Args::try_parse_from(["litaudio", "-vv"]).unwrap().default_log_level(), "trace");
        assert_eq!(Args::try_parse_from(["litaudio", "-q", "-v"]).unwrap().default_log_level(), "error");
    }

    #[test]
    fn test_load_urls_merges_txt_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# favourites\n\nhttps://www.litteratureaudio.com/livre-audio-gratuit-mp3/b.html#top").unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let args = Args::try_parse_from([
            "litaudio",
            "https://www.litteratureaudio.com/livre-audio-gratuit-mp3/a.html",
            "--txt",
            &path,
        ])
        .unwrap();
        assert_eq!(
            args.load_urls().unwrap(),
            vec![
                "https://www.litteratureaudio.com/livre-audio-gratuit-mp3/a.html",
                "https://www.litteratureaudio.com/livre-audio-gratuit-mp3/b.html",
            ]
        );
    }

    #[test]
    fn test_cli_help_and_unknown_flag() {
        let err = Args::try_parse_from(["litaudio", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let err = Args::try_parse_from(["litaudio", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
