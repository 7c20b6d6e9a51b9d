//! CLI entry point for litaudio.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use litaudio_core::pipeline::Pipeline;
use litaudio_core::report::{DRY_RUN_REPORT, DryRunReporter, SummaryCollector, verify_output};
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.default_log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    if let Some(root) = &args.verify {
        return Ok(match verify_output(root) {
            Ok(report) if report.is_clean() => ExitCode::SUCCESS,
            Ok(_) => ExitCode::FAILURE,
            Err(e) => {
                error!(error = %e, "verification failed");
                ExitCode::FAILURE
            }
        });
    }

    let urls = args.load_urls().context("failed to read the --txt file")?;
    if urls.is_empty() {
        error!("No URL provided");
        return Ok(ExitCode::FAILURE);
    }

    let options = args.run_options();
    let dry_run = if options.dry_run {
        Some(DryRunReporter::create(DRY_RUN_REPORT)?)
    } else {
        None
    };
    let summary = (args.summary_report.is_some() || args.csv_report.is_some())
        .then(|| SummaryCollector::new(options.mode(), args.csv_report.is_some()));
    let output_dir = options.output_dir.clone();

    info!(urls = urls.len(), mode = options.mode(), format = %options.format, "litaudio starting");
    let pipeline = Pipeline::new(options, summary, dry_run)?;
    let stats = pipeline.run(&urls).await;

    if stats.items == 0 {
        warn!("No items found");
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = pipeline.context();
    if let Some(reporter) = &ctx.dry_run {
        info!(path = %reporter.path().display(), "Dry-run report written");
    }
    if let Some(summary) = &ctx.summary {
        if let Some(path) = &args.summary_report {
            summary.write_summary(path)?;
            info!(path = %path.display(), "Summary report written");
        }
        if let Some(path) = &args.csv_report {
            summary.write_csv(path)?;
            info!(path = %path.display(), "CSV report written");
        }
    }

    info!(
        items = stats.items,
        files = stats.files,
        output = %output_dir.display(),
        "Download complete"
    );
    Ok(ExitCode::SUCCESS)
}
