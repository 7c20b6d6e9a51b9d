//! Post-parse enrichment: WordPress API metadata and paginated track lists.
//!
//! Both are best effort. A failed call leaves the item as parsed.

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::fetcher::Fetcher;
use crate::html::{Document, html_to_text};
use crate::item::{DownloadLink, LinkKind, WorkItem};
use crate::site::tracks::{extract_loop_more_url, extract_tracks};
use crate::text::non_blank;

/// API attempts per item.
const API_ATTEMPTS: u32 = 3;

/// `extra` key holding the raw API `meta` object.
pub const EXTRA_API_META: &str = "wp_meta";

/// `extra` key holding the API duration in milliseconds.
pub const EXTRA_DURATION_MS: &str = "duration_ms";

/// Post endpoint of the site's WordPress API.
#[must_use]
pub fn api_post_url(base_url: &str, post_id: u64) -> String {
    format!("{}/wp-json/wp/v2/posts/{post_id}?_embed=1", base_url.trim_end_matches('/'))
}

/// Fills missing item fields from the WordPress API.
///
/// Only empty fields are filled; download and stream URLs are appended as
/// links when new. `retry_pause` is multiplied by the attempt number between
/// attempts.
#[instrument(skip(fetcher, item, retry_pause), fields(url = %item.source_url))]
pub async fn enrich_from_api(
    fetcher: &dyn Fetcher,
    base_url: &str,
    item: &mut WorkItem,
    retry_pause: Duration,
) {
    let Some(post_id) = item.post_id else {
        return;
    };
    let api_url = api_post_url(base_url, post_id);

    let mut data = None;
    for attempt in 1..=API_ATTEMPTS {
        match fetcher.fetch_json(&api_url).await {
            Ok(value) => {
                data = Some(value);
                break;
            }
            Err(error) if attempt < API_ATTEMPTS => {
                debug!(post_id, attempt, error = %error, "API lookup failed, retrying");
                tokio::time::sleep(retry_pause * attempt).await;
            }
            Err(error) => debug!(post_id, error = %error, "API lookup failed, giving up"),
        }
    }
    if let Some(data) = data {
        apply_api_post(item, &data);
    }
}

/// Merges an API post document into `item`.
pub fn apply_api_post(item: &mut WorkItem, data: &Value) {
    if item.title.is_none() {
        item.title = rendered_text(&data["title"]["rendered"]);
    }
    if item.description.is_none() {
        item.description = rendered_text(&data["excerpt"]["rendered"]);
    }
    if item.cover_url.is_none() {
        item.cover_url = non_blank(data["_embedded"]["wp:featuredmedia"][0]["source_url"].as_str());
    }

    let meta = &data["meta"];
    if meta.as_object().is_some_and(|m| !m.is_empty()) {
        let duration_ms = as_millis(&meta["duration"]);
        if let Some(ms) = duration_ms {
            item.extra.insert(EXTRA_DURATION_MS.to_string(), Value::from(ms));
            if item.duration.is_none() {
                item.duration = Some(format_duration_ms(ms));
            }
        }
        let stream = meta["stream"].as_str().or_else(|| meta["stream_url"].as_str());
        for url in [meta["download_url"].as_str(), stream].into_iter().flatten() {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            let kind = if url.to_lowercase().ends_with(".mp3") {
                LinkKind::Mp3
            } else {
                LinkKind::Unknown
            };
            item.push_link(DownloadLink::new(url, kind));
        }
    }
    if !meta.is_null() {
        item.extra.insert(EXTRA_API_META.to_string(), meta.clone());
    }
}

fn rendered_text(value: &Value) -> Option<String> {
    non_blank(Some(&html_to_text(value.as_str()?)))
}

fn as_millis(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Renders milliseconds as `H:MM:SS`, or `M:SS` under an hour.
///
/// ```
/// use litaudio_core::crawl::format_duration_ms;
///
/// assert_eq!(format_duration_ms(3_723_000), "1:02:03");
/// assert_eq!(format_duration_ms(65_000), "1:05");
/// ```
#[must_use]
pub fn format_duration_ms(ms: u64) -> String {
    let total = ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Follows "load more" pages from `start_url`, appending unseen tracks.
///
/// Each page is JSON with a `content` markup fragment that may carry the next
/// "load more" link. Stops on a repeated URL, a failed fetch, empty content,
/// or a page that adds nothing and links nowhere.
#[instrument(skip(fetcher, item), fields(url = %item.source_url))]
pub async fn load_more_tracks(fetcher: &dyn Fetcher, item: &mut WorkItem, start_url: &str) {
    let mut seen_tracks: HashSet<String> = item.tracks.iter().map(|t| t.download_url.clone()).collect();
    let mut seen_pages = HashSet::new();
    let mut next = Some(start_url.to_string());
    let mut pages = 0usize;

    while let Some(url) = next.take() {
        if !seen_pages.insert(url.clone()) {
            break;
        }
        pages += 1;
        let data = match fetcher.fetch_json(&url).await {
            Ok(data) => data,
            Err(error) => {
                warn!(url = %url, error = %error, "load-more fetch failed");
                break;
            }
        };
        let Some(content) = data["content"].as_str().filter(|c| !c.trim().is_empty()) else {
            break;
        };

        let doc = Document::parse(content);
        let mut added = 0usize;
        for track in extract_tracks(&doc, None, &item.source_url) {
            if seen_tracks.insert(track.download_url.clone()) {
                item.tracks.push(track);
                added += 1;
            }
        }
        next = extract_loop_more_url(&doc, &item.source_url);
        if added == 0 && next.is_none() {
            break;
        }
    }

    if pages > 0 {
        info!(pages, tracks = item.tracks.len(), label = %item.display_label(), "loaded extra track pages");
    }
}
