//! Breadth-first crawl producing enriched [`WorkItem`]s.
//!
//! # Overview
//!
//! A [`Crawler`] owns the FIFO queue, the visited set and the [`ContextTable`].
//! Each dequeued URL is fetched once and classified:
//!
//! - listings are walked page by page; every listed work gets its
//!   `group_root` recorded before it is enqueued, and nothing is yielded
//! - work, track and unknown pages are parsed, enriched through the API and
//!   the track loader, given their recorded context, then yielded
//! - a collection yields its own metadata-only item, then records the
//!   context of each child ([`expand_collection`]) and enqueues it
//!
//! Items come out in discovery order, one at a time. A URL that cannot be
//! fetched is logged and skipped.
//!
//! # Example
//!
//! ```no_run
//! use litaudio_core::crawl::{CrawlOptions, Crawler};
//! use litaudio_core::download::HttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let urls = ["https://www.litteratureaudio.com/livre-audio-gratuit-mp3/auteur/emile-zola"];
//! let items = Crawler::new(&client, CrawlOptions::default(), urls).collect().await;
//! println!("{} items", items.len());
//! # Ok(())
//! # }
//! ```

mod context;
mod enrich;
mod expand;
mod fetcher;
mod listing;

pub use context::ContextTable;
pub use enrich::{
    EXTRA_API_META, EXTRA_DURATION_MS, api_post_url, apply_api_post, enrich_from_api,
    format_duration_ms, load_more_tracks,
};
pub use expand::{Expansion, expand_collection, is_various_authors};
pub use fetcher::{Fetcher, MemoryFetcher};
pub use listing::{ListingWalk, walk_listing};

use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::item::WorkItem;
use crate::site::{PageType, SITE_BASE_URL, classify, normalize_url, parse_work_page};

/// Pause unit between metadata API attempts.
pub const DEFAULT_API_RETRY_PAUSE: Duration = Duration::from_millis(500);

/// Crawl settings.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Listing pages followed per listing; `None` means no cap.
    pub max_pages: Option<usize>,
    /// Drop page descriptions before enrichment.
    pub drop_description: bool,
    /// Site root of the metadata API.
    pub api_base_url: String,
    pub api_retry_pause: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            drop_description: false,
            api_base_url: SITE_BASE_URL.to_string(),
            api_retry_pause: DEFAULT_API_RETRY_PAUSE,
        }
    }
}

/// Single-consumer BFS over site pages.
pub struct Crawler<'f> {
    fetcher: &'f dyn Fetcher,
    options: CrawlOptions,
    queue: VecDeque<String>,
    visited: HashSet<String>,
    contexts: ContextTable,
}

impl<'f> Crawler<'f> {
    /// Crawler seeded with `start_urls`, in order.
    pub fn new<I, S>(fetcher: &'f dyn Fetcher, options: CrawlOptions, start_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fetcher,
            options,
            queue: start_urls
                .into_iter()
                .map(|u| normalize_url(u.as_ref()))
                .collect(),
            visited: HashSet::new(),
            contexts: ContextTable::new(),
        }
    }

    /// URLs fetched so far (listing pagination included).
    #[must_use]
    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    /// Produces the next item, or `None` when the queue is exhausted.
    pub async fn next_item(&mut self) -> Option<WorkItem> {
        while let Some(url) = self.queue.pop_front() {
            if !self.visited.insert(url.clone()) {
                continue;
            }
            let html = match self.fetcher.fetch_document(&url).await {
                Ok(html) => html,
                Err(error) => {
                    warn!(url = %url, error = %error, "failed to fetch page, skipping");
                    continue;
                }
            };

            let page_type = classify(&url, &html);
            debug!(url = %url, page_type = %page_type, "page classified");
            if page_type.is_listing() {
                self.walk(&url, html, page_type).await;
                continue;
            }
            return Some(self.process_work(&url, &html).await);
        }
        None
    }

    /// Runs the crawl to completion.
    pub async fn collect(mut self) -> Vec<WorkItem> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await {
            items.push(item);
        }
        info!(items = items.len(), pages = self.visited.len(), "crawl finished");
        items
    }

    async fn walk(&mut self, url: &str, html: String, page_type: PageType) {
        let walk = walk_listing(
            self.fetcher,
            &mut self.visited,
            url,
            html,
            page_type,
            self.options.max_pages,
        )
        .await;
        info!(
            url,
            group = %walk.group_root,
            works = walk.work_urls.len(),
            pages = walk.pages,
            "listing walked"
        );
        for work in walk.work_urls {
            self.contexts.record_group(&work, &walk.group_root);
            self.enqueue(work);
        }
    }

    #[instrument(skip(self, html))]
    async fn process_work(&mut self, url: &str, html: &str) -> WorkItem {
        let parsed = parse_work_page(url, html);
        let mut item = parsed.item;
        if self.options.drop_description {
            item.description = None;
        }
        enrich_from_api(
            self.fetcher,
            &self.options.api_base_url,
            &mut item,
            self.options.api_retry_pause,
        )
        .await;
        if let Some(loop_url) = parsed.loop_more_url.as_deref() {
            load_more_tracks(self.fetcher, &mut item, loop_url).await;
        }
        if !item.tracks.is_empty() {
            item.is_collective_project = true;
        }
        item.context = self.contexts.context_for(url);

        if item.is_collection {
            let expansion = expand_collection(&item, &item.context);
            info!(
                url,
                children = item.child_urls.len(),
                tier = ?parsed.extraction_tier,
                label = %item.display_label(),
                "collection found"
            );
            for child in &item.child_urls {
                let child = normalize_url(child);
                let ctx = &expansion.child;
                if let Some(root) = ctx.collection_root.as_deref() {
                    self.contexts.record_collection(&child, root);
                }
                if let Some(group) = ctx.group_root.as_deref() {
                    self.contexts.record_group(&child, group);
                }
                if let Some(prefixed) = ctx.author_prefixed.as_deref() {
                    self.contexts.record_author_prefixed(&child, prefixed);
                }
                self.enqueue(child);
            }
            item.context = expansion.collection;
        }
        item
    }

    fn enqueue(&mut self, url: String) {
        if !self.visited.contains(&url) {
            self.queue.push_back(url);
        }
    }
}
