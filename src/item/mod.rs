//! Data model for crawled works, their tracks and their download links.
//!
//! A [`WorkItem`] is built when its page is parsed, enriched in place by the
//! crawler, then handed to the pipeline which consumes it exactly once.

use serde::Serialize;
use serde_json::{Map, Value};

/// Page language used when the site does not say otherwise.
pub const DEFAULT_LANGUAGE: &str = "fr";

/// What a download link is believed to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// An audio file (MP3).
    Mp3,
    /// A ZIP archive of the whole work.
    Zip,
    /// A playlist.
    M3u,
    /// A link discovered through the metadata API.
    Api,
    /// A `/d?nonce=` endpoint that redirects to the file.
    NonceEndpoint,
    /// A `?download=` token that redirects to the file.
    DownloadToken,
    /// A direct file link of unknown type that needs no resolution.
    Direct,
    /// Not classified yet.
    Unknown,
}

impl LinkKind {
    /// Kinds that need no HEAD request before downloading.
    #[must_use]
    pub fn is_self_resolving(self) -> bool {
        matches!(self, Self::Mp3 | Self::Zip | Self::M3u | Self::Direct)
    }
}

/// One candidate file link and what is known about its target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadLink {
    pub url: String,
    pub kind: LinkKind,
    #[serde(rename = "filename")]
    pub suggested_filename: Option<String>,
    pub size_bytes: Option<u64>,
    #[serde(skip)]
    pub resolved: bool,
    pub final_url: Option<String>,
}

impl DownloadLink {
    /// Creates an unresolved link.
    #[must_use]
    pub fn new(url: impl Into<String>, kind: LinkKind) -> Self {
        Self {
            url: url.into(),
            kind,
            suggested_filename: None,
            size_bytes: None,
            resolved: false,
            final_url: None,
        }
    }

    /// URL to fetch: the resolved target when known, else the original URL.
    #[must_use]
    pub fn effective_url(&self) -> &str {
        self.final_url.as_deref().unwrap_or(&self.url)
    }
}

/// One track of a multi-track work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub title: String,
    pub download_url: String,
    pub page_url: Option<String>,
}

/// Folder-naming context propagated down the crawl tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemContext {
    /// Sanitized title of the nearest ancestor collection (or of the item itself for a collection root).
    pub collection_root: Option<String>,
    /// Sanitized name of the listing the item was discovered from.
    pub group_root: Option<String>,
    /// `Author - Project` folder of an enclosing author-prefixed collection.
    pub author_prefixed: Option<String>,
    /// Set on collection roots: export metadata only, never files.
    pub skip_download: bool,
}

/// One audiobook, track page or collection node.
#[derive(Debug, Clone, Default)]
pub struct WorkItem {
    /// Fragment-stripped page URL; identity key of the item.
    pub source_url: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub reader: Option<String>,
    pub series: Option<String>,
    pub language: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
    pub cover_url: Option<String>,
    /// WordPress post id, used for API enrichment.
    pub post_id: Option<u64>,
    pub download_links: Vec<DownloadLink>,
    pub tracks: Vec<Track>,
    /// True when the page was recognised as a collection with children to expand.
    pub is_collection: bool,
    /// Ordered child work URLs of a collection.
    pub child_urls: Vec<String>,
    /// True for multi-track works and collections.
    pub is_collective_project: bool,
    pub context: ItemContext,
    /// Free-form values carried to the JSON sidecar (API metadata, durations).
    pub extra: Map<String, Value>,
}

impl WorkItem {
    /// Creates an empty item for `source_url`.
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            language: Some(DEFAULT_LANGUAGE.to_string()),
            ..Self::default()
        }
    }

    /// Adds a link unless one with the same URL is already present.
    pub fn push_link(&mut self, link: DownloadLink) -> bool {
        if self.download_links.iter().any(|l| l.url == link.url) {
            return false;
        }
        self.download_links.push(link);
        true
    }

    /// Human-readable label used in logs and reports.
    ///
    /// `Author: A | Reader: R | Project: P | Book: T`, with parts omitted when unknown.
    #[must_use]
    pub fn display_label(&self) -> String {
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| crate::site::slug_from_url(&self.source_url));
        let title = if title.is_empty() {
            "item".to_string()
        } else {
            title
        };
        let mut parts = Vec::new();
        if let Some(author) = &self.author {
            parts.push(format!("Author: {author}"));
        }
        if let Some(reader) = &self.reader {
            parts.push(format!("Reader: {reader}"));
        }
        if self.context.skip_download {
            let project = self.context.collection_root.as_deref().unwrap_or(&title);
            parts.push(format!("Project: {project}"));
        } else {
            if let Some(project) = &self.context.collection_root {
                parts.push(format!("Project: {project}"));
            }
            parts.push(format!("Book: {title}"));
        }
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_link_rejects_same_url() {
        let mut item = WorkItem::new("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/x.html");
        assert!(item.push_link(DownloadLink::new("https://a/1.mp3", LinkKind::Mp3)));
        assert!(!item.push_link(DownloadLink::new("https://a/1.mp3", LinkKind::Unknown)));
        assert_eq!(item.download_links.len(), 1);
    }

    #[test]
    fn test_display_label_for_book_and_project() {
        let mut item = WorkItem::new("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/zola-nana.html");
        item.title = Some("Nana".into());
        item.author = Some("Émile Zola".into());
        item.context.collection_root = Some("Les Rougon-Macquart".into());
        assert_eq!(
            item.display_label(),
            "Author: Émile Zola | Project: Les Rougon-Macquart | Book: Nana"
        );

        item.context.skip_download = true;
        assert_eq!(item.display_label(), "Author: Émile Zola | Project: Les Rougon-Macquart");
    }

    #[test]
    fn test_display_label_falls_back_to_slug() {
        let item = WorkItem::new("https://www.litteratureaudio.com/livre-audio-gratuit-mp3/le-horla.html");
        assert_eq!(item.display_label(), "Book: le-horla");
    }

    #[test]
    fn test_self_resolving_kinds() {
        assert!(LinkKind::Mp3.is_self_resolving());
        assert!(LinkKind::Direct.is_self_resolving());
        assert!(!LinkKind::NonceEndpoint.is_self_resolving());
        assert!(!LinkKind::Unknown.is_self_resolving());
    }
}
