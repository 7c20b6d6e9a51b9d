//! Download buttons, track lists and "load more" links on work pages.
//!
//! The same extractors run on full pages and on the markup fragments returned
//! by the track pagination endpoint, so every function takes an optional scope.

use url::Url;

use super::absolutize;
use crate::html::{Document, NodeId};
use crate::item::{DownloadLink, LinkKind, Track};
use crate::text::normalize_whitespace;

const TRACK_CLASSES: &[&str] = &["station", "type-station"];

/// Kind of a download button target, judged from its URL alone.
#[must_use]
pub fn button_link_kind(url: &str) -> LinkKind {
    if url.contains("?download=") {
        LinkKind::DownloadToken
    } else if url.contains("/d?nonce=") {
        LinkKind::NonceEndpoint
    } else {
        LinkKind::Unknown
    }
}

/// Download buttons of the work itself.
///
/// A page also shows buttons for related works; buttons whose `data-url`
/// names this page win, otherwise only the first button is trusted.
#[must_use]
pub fn extract_download_links(
    doc: &Document<'_>,
    scope: Option<NodeId>,
    page_url: &str,
) -> Vec<DownloadLink> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let buttons = doc.find_all_scoped(scope, "a", Some("btn-download"));
    let this_page = strip_query(page_url);
    let matched: Vec<NodeId> = buttons
        .iter()
        .copied()
        .filter(|&id| {
            doc.element(id)
                .attr("data-url")
                .is_some_and(|data_url| strip_query(data_url) == this_page)
        })
        .collect();
    let chosen = if matched.is_empty() {
        buttons.into_iter().take(1).collect()
    } else {
        matched
    };

    chosen
        .into_iter()
        .filter_map(|id| doc.element(id).attr("href"))
        .filter_map(|href| absolutize(&base, href))
        .map(|url| {
            let kind = button_link_kind(&url);
            DownloadLink::new(url, kind)
        })
        .collect()
}

/// Tracks listed as `station` articles.
///
/// Articles inside `div.entry-content` are preferred when it holds any;
/// tracks without a download button are dropped.
#[must_use]
pub fn extract_tracks(doc: &Document<'_>, scope: Option<NodeId>, page_url: &str) -> Vec<Track> {
    let Ok(base) = Url::parse(page_url) else {
        return Vec::new();
    };
    let station_articles = |within: Option<NodeId>| -> Vec<NodeId> {
        doc.find_all_scoped(within, "article", None)
            .into_iter()
            .filter(|&id| TRACK_CLASSES.iter().any(|c| doc.element(id).has_class(c)))
            .collect()
    };

    let entry = doc
        .find_all_scoped(scope, "div", Some("entry-content"))
        .into_iter()
        .next();
    let articles = match entry.map(|e| station_articles(Some(e))) {
        Some(found) if !found.is_empty() => found,
        _ => station_articles(scope),
    };

    articles
        .into_iter()
        .filter_map(|article| {
            let download = doc.find_in(article, "a", Some("btn-download"))?;
            let download_url = absolutize(&base, doc.element(download).attr("href")?)?;
            let title = doc
                .find_all_in(article, "*", Some("entry-title"))
                .into_iter()
                .find(|&id| matches!(doc.element(id).tag(), "h2" | "h3" | "h4"))
                .map(|id| normalize_whitespace(&doc.text(id)))
                .unwrap_or_default();
            let page_url = doc
                .find_all_in(article, "a", None)
                .into_iter()
                .find_map(|a| doc.element(a).attr("href"))
                .filter(|href| href.contains("/piste/"))
                .and_then(|href| absolutize(&base, href));
            Some(Track {
                title,
                download_url,
                page_url,
            })
        })
        .collect()
}

/// URL of the "load more tracks" link (`a.scroller.no-ajax`).
#[must_use]
pub fn extract_loop_more_url(doc: &Document<'_>, page_url: &str) -> Option<String> {
    let base = Url::parse(page_url).ok()?;
    doc.find_all("a", Some("scroller"))
        .into_iter()
        .filter(|&id| doc.element(id).has_class("no-ajax"))
        .find_map(|id| doc.element(id).attr("href"))
        .and_then(|href| absolutize(&base, href))
}

fn strip_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or(url)
            .trim_end_matches('/')
            .to_string(),
    }
}
