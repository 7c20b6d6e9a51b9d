//! Link resolution and the per-item download plan.
//!
//! Track buttons and download tokens redirect to the real file, so their kind
//! is unknown until a HEAD request follows the redirect. Resolution is lazy:
//! pending links are only resolved with HEAD when the chosen format needs them.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use super::client::HttpClient;
use super::filename::filename_from_url;
use crate::config::DownloadFormat;
use crate::item::{DownloadLink, LinkKind, WorkItem};
use crate::layout::sanitize_name;

/// Guesses a link kind from a file name or URL, then from a content type.
///
/// ```
/// use litaudio_core::download::guess_kind;
/// use litaudio_core::item::LinkKind;
///
/// assert_eq!(guess_kind(Some("Nana 01.MP3"), None), LinkKind::Mp3);
/// assert_eq!(guess_kind(None, Some("application/octet-stream")), LinkKind::Zip);
/// assert_eq!(guess_kind(Some("page.html"), Some("text/html")), LinkKind::Unknown);
/// ```
#[must_use]
pub fn guess_kind(name: Option<&str>, content_type: Option<&str>) -> LinkKind {
    if let Some(name) = name {
        let lowered = name.to_lowercase();
        let path = lowered.split(['?', '#']).next().unwrap_or(&lowered);
        if path.ends_with(".mp3") {
            return LinkKind::Mp3;
        }
        if path.ends_with(".zip") {
            return LinkKind::Zip;
        }
        if path.ends_with(".m3u") || path.ends_with(".m3u8") {
            return LinkKind::M3u;
        }
    }
    if let Some(content_type) = content_type {
        let ct = content_type.to_lowercase();
        if ct.contains("audio") {
            return LinkKind::Mp3;
        }
        if ct.contains("zip") || ct.contains("application/octet-stream") {
            return LinkKind::Zip;
        }
    }
    LinkKind::Unknown
}

/// Resolves `link` in place.
///
/// Self-resolving kinds are marked resolved without a request. Others get a
/// HEAD request; on failure the link stays unresolved and a warning is logged.
pub async fn resolve_link(client: &HttpClient, link: &mut DownloadLink) {
    if link.resolved {
        return;
    }
    if link.kind.is_self_resolving() {
        link.resolved = true;
        link.final_url = Some(link.url.clone());
        return;
    }
    match client.head(&link.url).await {
        Ok(info) => {
            link.kind = guess_kind(
                Some(info.filename.as_deref().unwrap_or(&info.final_url)),
                info.content_type.as_deref(),
            );
            link.suggested_filename = info.filename;
            link.size_bytes = info.content_length;
            link.final_url = Some(info.final_url);
            link.resolved = true;
            debug!(url = %link.url, kind = ?link.kind, "link resolved");
        }
        Err(error) => warn!(url = %link.url, error = %error, "HEAD failed, link left unresolved"),
    }
}

/// Files to fetch for one item, in order.
#[derive(Debug, Clone, Default)]
pub struct DownloadPlan {
    pub links: Vec<DownloadLink>,
    /// Track title per track download URL, for ID3 titles.
    pub track_titles: HashMap<String, String>,
}

impl DownloadPlan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Track title for a planned link, looked up by its original URL.
    #[must_use]
    pub fn track_title(&self, link: &DownloadLink) -> Option<&str> {
        self.track_titles.get(&link.url).map(String::as_str)
    }
}

/// Chooses which links of `item` to download for `format`.
///
/// Track links come first, then direct MP3 links, then pending links whose
/// HEAD request revealed an MP3. ZIP links are only looked for when the format
/// asks for them or no MP3 exists.
pub async fn build_download_plan(
    client: &HttpClient,
    item: &WorkItem,
    format: DownloadFormat,
) -> DownloadPlan {
    let mut track_links = Vec::with_capacity(item.tracks.len());
    for track in &item.tracks {
        let mut link = DownloadLink::new(&track.download_url, LinkKind::NonceEndpoint);
        resolve_link(client, &mut link).await;
        track_links.push(link);
    }
    let track_titles = item
        .tracks
        .iter()
        .filter(|t| !t.title.trim().is_empty())
        .map(|t| (t.download_url.clone(), t.title.clone()))
        .collect();

    let (direct_mp3, pending): (Vec<DownloadLink>, Vec<DownloadLink>) = item
        .download_links
        .iter()
        .cloned()
        .partition(|l| l.kind == LinkKind::Mp3);

    let mut pending = Pending::new(pending);

    let mp3_links = if !track_links.is_empty() {
        track_links.clone()
    } else if !direct_mp3.is_empty() {
        direct_mp3.clone()
    } else {
        pending.of_kind(client, LinkKind::Mp3).await
    };

    let links = match format {
        DownloadFormat::Default => {
            if mp3_links.is_empty() {
                pending.of_kind(client, LinkKind::Zip).await
            } else {
                mp3_links
            }
        }
        DownloadFormat::Mp3 => {
            if mp3_links.is_empty() {
                warn!(url = %item.source_url, "no MP3 available (only ZIP)");
            }
            mp3_links
        }
        DownloadFormat::Zip => {
            let zips = pending.of_kind(client, LinkKind::Zip).await;
            if zips.is_empty() {
                warn!(url = %item.source_url, "no ZIP available (only MP3)");
            }
            zips
        }
        DownloadFormat::Mp3Zip => {
            let mut links = mp3_links;
            links.extend(pending.of_kind(client, LinkKind::Zip).await);
            links
        }
        DownloadFormat::All => {
            let mut links = track_links;
            links.extend(direct_mp3);
            links.extend(pending.resolved(client).await.iter().cloned());
            links
        }
        DownloadFormat::Unzip => {
            let zips = pending.of_kind(client, LinkKind::Zip).await;
            if zips.is_empty() {
                warn!(url = %item.source_url, "no ZIP available");
            }
            zips
        }
    };

    DownloadPlan {
        links: dedupe_links(links),
        track_titles,
    }
}

/// Non-MP3 links, resolved on first use.
struct Pending {
    links: Vec<DownloadLink>,
    resolved: bool,
}

impl Pending {
    fn new(links: Vec<DownloadLink>) -> Self {
        Self {
            links,
            resolved: false,
        }
    }

    async fn resolved(&mut self, client: &HttpClient) -> &[DownloadLink] {
        if !self.resolved {
            for link in &mut self.links {
                resolve_link(client, link).await;
            }
            self.resolved = true;
        }
        &self.links
    }

    async fn of_kind(&mut self, client: &HttpClient, kind: LinkKind) -> Vec<DownloadLink> {
        self.resolved(client)
            .await
            .iter()
            .filter(|l| l.kind == kind)
            .cloned()
            .collect()
    }
}

/// Drops links that would produce the same file.
///
/// The key is the sanitized, lower-cased suggested name, else the URL's
/// file name, else the URL itself.
#[must_use]
pub fn dedupe_links(links: Vec<DownloadLink>) -> Vec<DownloadLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(dedupe_key(link)))
        .collect()
}

fn dedupe_key(link: &DownloadLink) -> String {
    let url = link.effective_url();
    let name = link
        .suggested_filename
        .clone()
        .or_else(|| filename_from_url(url));
    match name {
        Some(name) => format!("file:{}", sanitize_name(&name).to_lowercase()),
        None => url.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::item::Track;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = "https://www.litteratureaudio.com/livre-audio-gratuit-mp3/zola-emile-nana.html";

    fn client() -> HttpClient {
        HttpClient::new().unwrap()
    }

    async fn mount_head(server: &MockServer, route: &str, filename: &str, content_type: &str) {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Disposition", format!(r#"attachment; filename="{filename}""#).as_str())
                    .insert_header("Content-Type", content_type),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_guess_kind_by_name_then_content_type() {
        assert_eq!(guess_kind(Some("https://x/a.zip?token=1"), None), LinkKind::Zip);
        assert_eq!(guess_kind(Some("list.m3u8"), None), LinkKind::M3u);
        assert_eq!(guess_kind(Some("https://x/d?nonce=1"), Some("audio/mpeg")), LinkKind::Mp3);
        assert_eq!(guess_kind(None, None), LinkKind::Unknown);
    }

    #[test]
    fn test_dedupe_links_by_sanitized_name() {
        let mut a = DownloadLink::new("https://x/d?nonce=1", LinkKind::Mp3);
        a.suggested_filename = Some("Nana: 01.mp3".into());
        let b = DownloadLink::new("https://cdn/other/NANA%3A%2001.mp3", LinkKind::Mp3);
        let c = DownloadLink::new("https://cdn/nana-02.mp3", LinkKind::Mp3);
        let kept = dedupe_links(vec![a, b, c]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[1].url, "https://cdn/nana-02.mp3");
    }

    #[tokio::test]
    async fn test_self_resolving_link_needs_no_request() {
        let mut link = DownloadLink::new("https://cdn/a.mp3", LinkKind::Mp3);
        resolve_link(&client(), &mut link).await;
        assert!(link.resolved);
        assert_eq!(link.final_url.as_deref(), Some("https://cdn/a.mp3"));
    }

    #[tokio::test]
    async fn test_resolve_link_reads_head() {
        let server = MockServer::start().await;
        mount_head(&server, "/dl", "Nana.zip", "application/zip").await;
        let mut link = DownloadLink::new(format!("{}/dl", server.uri()), LinkKind::DownloadToken);
        resolve_link(&client(), &mut link).await;
        assert!(link.resolved);
        assert_eq!(link.kind, LinkKind::Zip);
        assert_eq!(link.suggested_filename.as_deref(), Some("Nana.zip"));
    }

    #[tokio::test]
    async fn test_failed_head_leaves_link_unresolved() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let mut link = DownloadLink::new(format!("{}/dl", server.uri()), LinkKind::DownloadToken);
        resolve_link(&client(), &mut link).await;
        assert!(!link.resolved);
        assert_eq!(link.kind, LinkKind::DownloadToken);
    }

    #[tokio::test]
    async fn test_default_plan_prefers_tracks_and_falls_back_to_zip() {
        let server = MockServer::start().await;
        mount_head(&server, "/t1", "01.mp3", "audio/mpeg").await;
        mount_head(&server, "/zip", "Nana.zip", "application/zip").await;

        let mut item = WorkItem::new(PAGE);
        item.tracks.push(Track {
            title: "Chapitre 1".into(),
            download_url: format!("{}/t1", server.uri()),
            page_url: None,
        });
        item.push_link(DownloadLink::new(format!("{}/zip", server.uri()), LinkKind::DownloadToken));

        let plan = build_download_plan(&client(), &item, DownloadFormat::Default).await;
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.links[0].kind, LinkKind::Mp3);
        assert_eq!(plan.track_title(&plan.links[0]), Some("Chapitre 1"));

        item.tracks.clear();
        let plan = build_download_plan(&client(), &item, DownloadFormat::Default).await;
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.links[0].kind, LinkKind::Zip);

        let plan = build_download_plan(&client(), &item, DownloadFormat::Mp3).await;
        assert!(plan.is_empty());
    }

    #[tokio::test]
    async fn test_all_plan_takes_everything() {
        let server = MockServer::start().await;
        mount_head(&server, "/zip", "Nana.zip", "application/zip").await;

        let mut item = WorkItem::new(PAGE);
        item.push_link(DownloadLink::new("https://cdn.example.com/nana.mp3", LinkKind::Mp3));
        item.push_link(DownloadLink::new(format!("{}/zip", server.uri()), LinkKind::DownloadToken));

        let plan = build_download_plan(&client(), &item, DownloadFormat::All).await;
        let kinds: Vec<LinkKind> = plan.links.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![LinkKind::Mp3, LinkKind::Zip]);

        let plan = build_download_plan(&client(), &item, DownloadFormat::Mp3Zip).await;
        assert_eq!(plan.len(), 2);
    }
}
