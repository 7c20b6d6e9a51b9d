//! Crawl-then-download driver.
//!
//! # Overview
//!
//! Input URLs are handled one at a time, end to end: the whole crawl for a
//! URL runs first (single-threaded, so context tables are filled before any
//! child is read), then its items are downloaded by a bounded worker pool.
//! With one worker items run in order on the current task. Otherwise up to
//! `workers` items run at once and at most `2 × workers` are held in flight;
//! reaching that bound waits for one to finish before submitting more.
//!
//! The [`RunContext`] holds everything workers share: the HTTP client, the
//! download and folder registries, and the report collectors. Registries
//! live for the whole run, so a file or folder met again under a later
//! input URL is skipped or shortcut.
//!
//! # Example
//!
//! ```no_run
//! use litaudio_core::config::RunOptions;
//! use litaudio_core::pipeline::Pipeline;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(RunOptions::default(), None, None)?;
//! let stats = pipeline
//!     .run(&["https://www.litteratureaudio.com/livre-audio-gratuit-mp3/zola-nana.html".to_string()])
//!     .await;
//! println!("{} items, {} files", stats.items, stats.files);
//! # Ok(())
//! # }
//! ```

mod item;
mod registry;
mod shortcut;

pub use item::{ItemError, ItemOutcome, download_item};
pub use registry::{DownloadRegistry, FolderRegistry};
pub use shortcut::{REDIRECT_SUFFIX, Shortcut, create_shortcut, relative_path};

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::config::RunOptions;
use crate::crawl::{CrawlOptions, Crawler};
use crate::download::{HttpClient, RateLimiter, RetryPolicy};
use crate::item::WorkItem;
use crate::report::{DryRunReporter, ProjectProgressTracker, SummaryCollector};

/// State shared by every download worker of a run.
#[derive(Debug)]
pub struct RunContext {
    pub client: HttpClient,
    pub options: RunOptions,
    pub downloads: DownloadRegistry,
    pub folders: FolderRegistry,
    pub progress: ProjectProgressTracker,
    pub summary: Option<SummaryCollector>,
    pub dry_run: Option<DryRunReporter>,
}

impl RunContext {
    /// Context with fresh registries around an existing client.
    #[must_use]
    pub fn new(
        client: HttpClient,
        options: RunOptions,
        summary: Option<SummaryCollector>,
        dry_run: Option<DryRunReporter>,
    ) -> Self {
        Self {
            client,
            options,
            downloads: DownloadRegistry::new(),
            folders: FolderRegistry::new(),
            progress: ProjectProgressTracker::new(),
            summary,
            dry_run,
        }
    }
}

/// Items seen and files downloaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub items: usize,
    pub files: usize,
}

impl std::ops::AddAssign for RunStats {
    fn add_assign(&mut self, other: Self) {
        self.items += other.items;
        self.files += other.files;
    }
}

/// Runs input URLs through crawl and download.
#[derive(Debug, Clone)]
pub struct Pipeline {
    ctx: Arc<RunContext>,
}

impl Pipeline {
    /// Pipeline with a client built from `options` (`sleep`, `max_retries`).
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when the HTTP client cannot be built.
    pub fn new(
        options: RunOptions,
        summary: Option<SummaryCollector>,
        dry_run: Option<DryRunReporter>,
    ) -> Result<Self, reqwest::Error> {
        let client = HttpClient::with_policies(
            Arc::new(RateLimiter::new(options.sleep)),
            RetryPolicy::from_max_retries(options.max_retries),
        )?;
        Ok(Self::with_context(RunContext::new(client, options, summary, dry_run)))
    }

    #[must_use]
    pub fn with_context(ctx: RunContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Processes every URL in order and returns the run totals.
    pub async fn run(&self, urls: &[String]) -> RunStats {
        let mut stats = RunStats::default();
        for url in urls {
            stats += self.run_url(url).await;
        }
        info!(items = stats.items, files = stats.files, "run finished");
        stats
    }

    #[instrument(skip(self))]
    async fn run_url(&self, url: &str) -> RunStats {
        let options = &self.ctx.options;
        let crawl_options = CrawlOptions {
            max_pages: options.max_pages,
            drop_description: !options.write_description,
            api_base_url: options.base_url.clone(),
            ..CrawlOptions::default()
        };
        let items = Crawler::new(&self.ctx.client, crawl_options, [url]).collect().await;
        if items.is_empty() {
            warn!(url, "no items found");
            return RunStats::default();
        }

        for item in items.iter().filter(|i| i.context.skip_download) {
            if let Some(project) = item.context.collection_root.as_deref() {
                self.ctx.progress.register(project, item.child_urls.len());
            }
        }

        let workers = options.worker_count();
        let files = if workers <= 1 {
            self.download_sequential(&items).await
        } else {
            self.download_pooled(items.clone(), workers).await
        };
        RunStats {
            items: items.len(),
            files,
        }
    }

    async fn download_sequential(&self, items: &[WorkItem]) -> usize {
        let mut files = 0;
        for item in items {
            files += settle(&item.source_url, download_item(&self.ctx, item).await);
        }
        files
    }

    async fn download_pooled(&self, items: Vec<WorkItem>, workers: usize) -> usize {
        let semaphore = Arc::new(Semaphore::new(workers));
        let max_in_flight = workers * 2;
        let mut tasks = JoinSet::new();
        let mut files = 0;

        for item in items {
            while tasks.len() >= max_in_flight {
                files += join_one(&mut tasks).await;
            }
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return 0;
                };
                settle(&item.source_url, download_item(&ctx, &item).await)
            });
        }
        debug!(pending = tasks.len(), "waiting for download workers");
        while !tasks.is_empty() {
            files += join_one(&mut tasks).await;
        }
        files
    }
}

async fn join_one(tasks: &mut JoinSet<usize>) -> usize {
    match tasks.join_next().await {
        Some(Ok(files)) => files,
        Some(Err(error)) => {
            error!(error = %error, "download worker panicked");
            0
        }
        None => 0,
    }
}

fn settle(url: &str, result: Result<ItemOutcome, ItemError>) -> usize {
    match result {
        Ok(outcome) => {
            debug!(url, outcome = ?outcome_name(&outcome), "item finished");
            outcome.downloaded()
        }
        Err(error) => {
            error!(url, error = %error, "item failed");
            0
        }
    }
}

fn outcome_name(outcome: &ItemOutcome) -> &'static str {
    match outcome {
        ItemOutcome::Shortcut { .. } => "shortcut",
        ItemOutcome::Reported { .. } => "reported",
        ItemOutcome::MetadataWritten => "metadata-written",
        ItemOutcome::Done { .. } => "done",
    }
}
