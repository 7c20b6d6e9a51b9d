//! Page-level knowledge of litteratureaudio.com.
//!
//! Everything here is a pure function over a URL and a scanned [`Document`]:
//! no network access and no crawl state.
//!
//! - [`classify`] - page-type detection
//! - [`listing`] - author/reader/member listing pages
//! - [`work`] - work and track pages
//! - [`tracks`] - track lists, download buttons and "load more" links
//! - [`collection`] - collection detection and child-URL extraction tiers
//!
//! [`Document`]: crate::html::Document

pub mod classify;
pub mod collection;
pub mod listing;
pub mod tracks;
pub mod work;

pub use classify::{PageType, classify};
pub use collection::{ChildExtraction, ExtractionTier, extract_collection_urls, is_collection_page};
pub use listing::{ListingPage, parse_listing};
pub use work::{ParsedWork, parse_work_page};

use url::Url;

/// Public site root.
pub const SITE_BASE_URL: &str = "https://www.litteratureaudio.com";

/// Path segment shared by every work, track and listing page.
pub const WORK_PATH_MARKER: &str = "/livre-audio-gratuit-mp3/";

/// Suffix the site appends to every `<title>`.
pub const TITLE_SUFFIX: &str = " | Litteratureaudio.com";

/// Removes the fragment so the same page reached through anchors is visited once.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split('#').next().unwrap_or(url).to_string(),
    }
}

/// Last path segment of a URL without its `.html` suffix.
///
/// ```
/// use litaudio_core::site::slug_from_url;
///
/// assert_eq!(
///     slug_from_url("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/zola-emile-nana.html"),
///     "zola-emile-nana"
/// );
/// assert_eq!(slug_from_url("https://www.litteratureaudio.com/membre/jean/"), "jean");
/// ```
#[must_use]
pub fn slug_from_url(url: &str) -> String {
    let tail = url.trim_end_matches('/').rsplit('/').next().unwrap_or("");
    tail.strip_suffix(".html").unwrap_or(tail).to_string()
}

/// Returns true for links to a work page (`/livre-audio-gratuit-mp3/...html`).
#[must_use]
pub fn is_work_link(href: &str) -> bool {
    href.contains(WORK_PATH_MARKER) && href.ends_with(".html")
}

/// Resolves `href` against `base`, returning `None` for unusable references.
#[must_use]
pub fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href.starts_with("mailto:") {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url_strips_fragment_only() {
        assert_eq!(
            normalize_url("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/a.html?x=1#comments"),
            "https://www.litteratureaudio.com/livre-audio-gratuit-mp3/a.html?x=1"
        );
        assert_eq!(normalize_url("not a url#frag"), "not a url");
    }

    #[test]
    fn test_is_work_link() {
        assert!(is_work_link("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/a.html"));
        assert!(!is_work_link("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/auteur/zola"));
        assert!(!is_work_link("https://example.com/a.html"));
    }

    #[test]
    fn test_absolutize_relative_and_rejects_scripts() {
        let base = Url::parse("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/a.html").unwrap();
        assert_eq!(
            absolutize(&base, "b.html").as_deref(),
            Some("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/b.html")
        );
        assert_eq!(absolutize(&base, "javascript:void(0)"), None);
        assert_eq!(absolutize(&base, "  "), None);
    }
}
