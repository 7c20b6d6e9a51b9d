//! Work and track page parsing.

use std::sync::LazyLock;

use regex::Regex;

use super::collection::{ExtractionTier, extract_collection_urls, is_collection_page};
use super::tracks::{extract_download_links, extract_loop_more_url, extract_tracks};
use super::TITLE_SUFFIX;
use crate::html::{Document, NodeId};
use crate::item::WorkItem;
use crate::text::{non_blank, normalize_whitespace, truncate_chars};

static TITLE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| crate::text::compile_static_regex(r"^([^-]+?)\s*-\s*(.+)$"));

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| crate::text::compile_static_regex(r"(?i)dur[ée]e\s*:\s*([^.]+)"));

static POST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| crate::text::compile_static_regex(r"postid-(\d+)"));

static PWC_POST_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| crate::text::compile_static_regex(r#"postID":(\d+)"#));

const MAX_BODY_DESCRIPTION_CHARS: usize = 1000;

/// A parsed work page plus the page hints the crawler needs afterwards.
#[derive(Debug, Clone)]
pub struct ParsedWork {
    pub item: WorkItem,
    /// First "load more tracks" URL, when the track list is paginated.
    pub loop_more_url: Option<String>,
    /// Author slug (`/auteur/<slug>`), used to filter collection children.
    pub author_slug: Option<String>,
    /// Tier that produced `item.child_urls`, for collections.
    pub extraction_tier: Option<ExtractionTier>,
}

/// Parses a work (or track) page into a [`WorkItem`].
///
/// Collections get their ordered child URLs here; expansion into crawl
/// context happens in the crawler.
#[must_use]
pub fn parse_work_page(url: &str, html: &str) -> ParsedWork {
    let doc = Document::parse(html);
    let mut item = WorkItem::new(url);

    item.title = extract_title(&doc);
    item.author = extract_author(&doc);
    item.reader = tag_link_text(&doc, "entry-voix");
    item.cover_url = meta_content(&doc, "property", "og:image");
    item.description = extract_description(&doc);
    item.duration = extract_duration(&doc);
    item.post_id = extract_post_id(&doc);

    let main = find_main_article(&doc, item.post_id);
    for link in extract_download_links(&doc, main, url) {
        item.push_link(link);
    }
    item.tracks = extract_tracks(&doc, main, url);
    item.is_collective_project = !item.tracks.is_empty();

    let loop_more_url = extract_loop_more_url(&doc, url);
    let author_slug = extract_author_slug(&doc);

    let mut extraction_tier = None;
    if is_collection_page(
        &doc,
        url,
        item.title.as_deref(),
        item.description.as_deref(),
    ) {
        let extraction = extract_collection_urls(&doc, url, author_slug.as_deref());
        if !extraction.urls.is_empty() {
            item.child_urls = extraction.urls;
            item.is_collection = true;
            item.is_collective_project = true;
            extraction_tier = extraction.tier;
        }
    }

    ParsedWork {
        item,
        loop_more_url,
        author_slug,
        extraction_tier,
    }
}

fn strip_title_suffix(raw: &str) -> String {
    normalize_whitespace(&raw.replace(TITLE_SUFFIX, ""))
}

/// `Author - Title` pages keep only the title part.
fn title_part(title: &str) -> Option<String> {
    let title = TITLE_SPLIT_RE
        .captures(title)
        .and_then(|caps| caps.get(2))
        .map_or(title, |m| m.as_str());
    non_blank(Some(&normalize_whitespace(title)))
}

fn extract_title(doc: &Document<'_>) -> Option<String> {
    if let Some(id) = doc.find("title", None) {
        let text = strip_title_suffix(&doc.text(id));
        if !text.is_empty() {
            return title_part(&text);
        }
    }
    if let Some(og) = meta_content(doc, "property", "og:title") {
        return title_part(&strip_title_suffix(&og));
    }
    doc.find("h1", Some("entry-title"))
        .and_then(|id| non_blank(Some(&doc.text(id))))
}

fn extract_author(doc: &Document<'_>) -> Option<String> {
    if let Some(author) = tag_link_text(doc, "entry-auteur") {
        return Some(author);
    }
    let title = doc.text(doc.find("title", None)?);
    let author = normalize_whitespace(TITLE_SPLIT_RE.captures(&title)?.get(1)?.as_str());
    // "Zola, Émile" -> "Émile Zola"
    match author.split_once(',') {
        Some((last, first)) => non_blank(Some(&format!("{} {}", first.trim(), last.trim()))),
        None => non_blank(Some(&author)),
    }
}

/// Text of the `a[rel=tag]` inside `span.<class>`.
fn tag_link_text(doc: &Document<'_>, class: &str) -> Option<String> {
    let span = doc.find("span", Some(class))?;
    let link = doc
        .find_all_in(span, "a", None)
        .into_iter()
        .find(|&a| doc.element(a).attr("rel") == Some("tag"))?;
    non_blank(Some(&doc.text(link)))
}

fn meta_content(doc: &Document<'_>, key: &str, value: &str) -> Option<String> {
    doc.find_all("meta", None)
        .into_iter()
        .find(|&id| doc.element(id).attr(key) == Some(value))
        .and_then(|id| non_blank(doc.element(id).attr("content")))
}

fn extract_description(doc: &Document<'_>) -> Option<String> {
    if let Some(description) = meta_content(doc, "name", "description") {
        return Some(normalize_whitespace(&description));
    }
    let entry = doc.find("div", Some("entry-content"))?;
    non_blank(Some(&truncate_chars(&doc.text(entry), MAX_BODY_DESCRIPTION_CHARS)))
}

fn extract_duration(doc: &Document<'_>) -> Option<String> {
    if let Some(span) = doc.find("span", Some("play-duration")) {
        return non_blank(Some(&doc.text(span)));
    }
    let description = meta_content(doc, "name", "description")?;
    let caps = DURATION_RE.captures(&description)?;
    non_blank(Some(&normalize_whitespace(caps.get(1)?.as_str())))
}

fn extract_post_id(doc: &Document<'_>) -> Option<u64> {
    let from_body = doc.find("body", None).and_then(|body| {
        doc.element(body)
            .classes()
            .find_map(|c| c.strip_prefix("postid-")?.parse().ok())
    });
    from_body
        .or_else(|| capture_number(&POST_ID_RE, doc.source()))
        .or_else(|| capture_number(&PWC_POST_ID_RE, doc.source()))
        .or_else(|| {
            doc.find_all("*", None)
                .into_iter()
                .find_map(|id| doc.element(id).attr("data-play-id")?.trim().parse().ok())
        })
}

fn capture_number(re: &Regex, haystack: &str) -> Option<u64> {
    re.captures(haystack)?.get(1)?.as_str().parse().ok()
}

fn find_main_article(doc: &Document<'_>, post_id: Option<u64>) -> Option<NodeId> {
    let articles = doc.find_all("article", None);
    if let Some(id) = post_id {
        let wanted = format!("post-{id}");
        if let Some(found) = articles
            .iter()
            .copied()
            .find(|&a| doc.element(a).attr("id") == Some(wanted.as_str()))
        {
            return Some(found);
        }
    }
    articles.into_iter().find(|&a| {
        let element = doc.element(a);
        element.has_class("post") && element.has_class("entry")
    })
}

fn extract_author_slug(doc: &Document<'_>) -> Option<String> {
    let from_link = doc.find("span", Some("entry-auteur")).and_then(|span| {
        doc.find_all_in(span, "a", None)
            .into_iter()
            .find_map(|a| doc.element(a).attr("href"))
            .and_then(|href| {
                let (_, slug) = href.trim_end_matches('/').rsplit_once("/auteur/")?;
                non_blank(Some(slug))
            })
    });
    from_link.or_else(|| {
        let body = doc.find("body", None)?;
        doc.element(body).classes().find_map(|c| {
            let slug = c.strip_prefix("auteur-")?;
            non_blank(Some(slug.strip_prefix("auteur-").unwrap_or(slug)))
        })
    })
}
