//! Page-type detection.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::text::compile_static_regex;

static AUTHOR_LISTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"^https?://[^/]+/livre-audio-gratuit-mp3/auteur/([^/?#]+)(?:/page/(\d+))?/?$")
});

static READER_LISTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"^https?://[^/]+/livre-audio-gratuit-mp3/voix/([^/?#]+)(?:/page/(\d+))?/?$")
});

static MEMBER_LISTING_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"^https?://[^/]+/membre/([^/?#]+)(?:/page/(\d+))?/?$")
});

static TRACK_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"/livre-audio-gratuit-mp3/piste/"));

static WORK_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"^https?://[^/]+/livre-audio-gratuit-mp3/([^/?#]+)\.html(?:$|\?)")
});

/// Kind of page behind a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    AuthorListing,
    ReaderListing,
    MemberListing,
    Work,
    Track,
    /// Not recognised; parsed as a work on a best-effort basis.
    Unknown,
}

impl PageType {
    /// Returns true for paginated listing pages.
    #[must_use]
    pub fn is_listing(self) -> bool {
        matches!(
            self,
            Self::AuthorListing | Self::ReaderListing | Self::MemberListing
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthorListing => "author_listing",
            Self::ReaderListing => "reader_listing",
            Self::MemberListing => "member_listing",
            Self::Work => "work",
            Self::Track => "track",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a fetched page.
///
/// URL patterns decide first; when none matches, listing markup in the body
/// (entry titles alongside author links) marks an author listing.
#[must_use]
pub fn classify(url: &str, html: &str) -> PageType {
    if AUTHOR_LISTING_RE.is_match(url) {
        PageType::AuthorListing
    } else if READER_LISTING_RE.is_match(url) {
        PageType::ReaderListing
    } else if MEMBER_LISTING_RE.is_match(url) {
        PageType::MemberListing
    } else if TRACK_RE.is_match(url) {
        PageType::Track
    } else if WORK_RE.is_match(url) {
        PageType::Work
    } else if html.contains("entry-title") && html.contains("/auteur/") {
        PageType::AuthorListing
    } else {
        PageType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.litteratureaudio.com";

    #[test]
    fn test_classify_by_url_pattern() {
        let cases = [
            ("/livre-audio-gratuit-mp3/auteur/emile-zola", PageType::AuthorListing),
            ("/livre-audio-gratuit-mp3/auteur/emile-zola/page/3/", PageType::AuthorListing),
            ("/livre-audio-gratuit-mp3/voix/ren", PageType::ReaderListing),
            ("/membre/jean-paul/page/2", PageType::MemberListing),
            ("/livre-audio-gratuit-mp3/piste/chapitre-01.html", PageType::Track),
            ("/livre-audio-gratuit-mp3/zola-emile-nana.html", PageType::Work),
            ("/livre-audio-gratuit-mp3/zola-emile-nana.html?x=1", PageType::Work),
        ];
        for (path, expected) in cases {
            assert_eq!(classify(&format!("{BASE}{path}"), ""), expected, "{path}");
        }
    }

    #[test]
    fn test_classify_content_fallback_and_unknown() {
        let listing_html = r#"<h2 class="entry-title"><a href="/livre-audio-gratuit-mp3/auteur/x">x</a></h2>"#;
        assert_eq!(classify(&format!("{BASE}/tag/roman"), listing_html), PageType::AuthorListing);
        assert_eq!(classify(&format!("{BASE}/tag/roman"), "<p>nothing</p>"), PageType::Unknown);
    }

    #[test]
    fn test_classify_is_idempotent() {
        let url = format!("{BASE}/livre-audio-gratuit-mp3/a.html");
        let html = "<html></html>";
        assert_eq!(classify(&url, html), classify(&url, html));
    }

    #[test]
    fn test_is_listing() {
        assert!(PageType::MemberListing.is_listing());
        assert!(!PageType::Work.is_listing());
        assert!(!PageType::Unknown.is_listing());
    }
}
