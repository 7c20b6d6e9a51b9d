//! Collection detection and child-URL extraction.
//!
//! # Overview
//!
//! A collection page (anthology, complete works, collective project) links
//! to its child works instead of carrying files. The page markup varies a
//! lot, so child URLs come from a chain of extraction tiers, most selective
//! first. Each tier is a plain function over a [`CollectionScope`]; the first
//! one returning a usable set wins and later tiers are never evaluated.
//!
//! | Tier | Source | Accepted when |
//! |---|---|---|
//! | [`LoopBlock`](ExtractionTier::LoopBlock) | first `block-loop-items` in `station-content` | covers at least 70% of the station links |
//! | [`TokenBlock`](ExtractionTier::TokenBlock) | best `block-loop-items` by slug-token score | covers at least 50% of the station links |
//! | [`TokenGlobal`](ExtractionTier::TokenGlobal) | every entry link sharing a slug token | more than 10 links |
//! | [`ScriptureKeywords`](ExtractionTier::ScriptureKeywords) | bible/testament/evangile links | slug names a scripture project |
//! | [`AllLinks`](ExtractionTier::AllLinks) | all station links, else author articles | non-empty |

use std::collections::BTreeSet;

use url::Url;

use super::{absolutize, is_work_link, slug_from_url};
use crate::html::{Document, NodeId};

/// Slug words that say nothing about which children belong to a collection.
const SLUG_STOPWORDS: &[&str] = &[
    "oeuvre", "integrale", "integral", "tome", "tomes", "livre", "audio", "gratuit", "mp3",
    "et", "de", "du", "des", "la", "le", "les", "a", "au", "aux", "d", "l",
];

const SCRIPTURE_SLUG_MARKERS: &[&str] = &["bible", "testament"];
const SCRIPTURE_LINK_MARKERS: &[&str] = &["bible", "testament", "evangile"];

const COLLECTION_KEYWORDS: &[&str] = &["oeuvre integrale", "sommaire", "projet collectif"];

/// Global token matches must exceed this count to be trusted.
const MIN_GLOBAL_TOKEN_MATCHES: usize = 10;

/// Minimum distinct work links for a loop block to mark a collection.
const MIN_BLOCK_LINKS: usize = 3;

/// Which extraction tier produced a child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionTier {
    LoopBlock,
    TokenBlock,
    TokenGlobal,
    ScriptureKeywords,
    AllLinks,
}

/// Signature shared by every tier.
pub type TierFn = fn(&CollectionScope<'_, '_>) -> Option<BTreeSet<String>>;

/// The default tier chain, most selective first.
pub const TIERS: [(ExtractionTier, TierFn); 5] = [
    (ExtractionTier::LoopBlock, tier_loop_block),
    (ExtractionTier::TokenBlock, tier_token_block),
    (ExtractionTier::TokenGlobal, tier_token_global),
    (ExtractionTier::ScriptureKeywords, tier_scripture_keywords),
    (ExtractionTier::AllLinks, tier_all_links),
];

/// Ordered child URLs and the tier that found them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildExtraction {
    pub urls: Vec<String>,
    pub tier: Option<ExtractionTier>,
}

/// Everything the tiers look at, computed once per page.
#[derive(Debug)]
pub struct CollectionScope<'d, 'a> {
    doc: &'d Document<'a>,
    base: Url,
    page_url: String,
    slug: String,
    entry: NodeId,
    station: Option<NodeId>,
    station_links: BTreeSet<String>,
    slug_tokens: BTreeSet<String>,
    author_slug: Option<String>,
}

impl<'d, 'a> CollectionScope<'d, 'a> {
    /// Builds the scope, or `None` when the page has no `div.entry-content`.
    #[must_use]
    pub fn new(doc: &'d Document<'a>, page_url: &str, author_slug: Option<&str>) -> Option<Self> {
        let base = Url::parse(page_url).ok()?;
        let entry = doc.find("div", Some("entry-content"))?;
        let station = doc.find_in(entry, "div", Some("station-content"));
        let slug = slug_from_url(page_url);

        let author_tokens: Vec<&str> = author_slug.map(|s| s.split('-').collect()).unwrap_or_default();
        let slug_tokens = slug
            .split('-')
            .filter(|t| !t.is_empty() && !SLUG_STOPWORDS.contains(t) && !author_tokens.contains(t))
            .map(str::to_string)
            .collect();

        let mut scope = Self {
            doc,
            page_url: base.to_string(),
            base,
            slug,
            entry,
            station,
            station_links: BTreeSet::new(),
            slug_tokens,
            author_slug: author_slug.map(str::to_string),
        };
        scope.station_links = station.map(|s| scope.work_links(s)).unwrap_or_default();
        Some(scope)
    }

    /// Distinct absolute work links under `node`, excluding the page itself.
    fn work_links(&self, node: NodeId) -> BTreeSet<String> {
        self.work_links_where(node, |_| true)
    }

    fn work_links_where(&self, node: NodeId, keep: impl Fn(&str) -> bool) -> BTreeSet<String> {
        self.doc
            .find_all_in(node, "a", None)
            .into_iter()
            .filter_map(|a| self.doc.element(a).attr("href"))
            .filter(|href| is_work_link(href) && keep(href))
            .filter_map(|href| self.absolute(href))
            .collect()
    }

    fn absolute(&self, href: &str) -> Option<String> {
        absolutize(&self.base, href).filter(|url| *url != self.page_url)
    }

    fn matches_token(&self, href: &str) -> bool {
        let link_slug = slug_from_url(href);
        self.slug_tokens.iter().any(|t| link_slug.contains(t.as_str()))
    }
}

/// Runs the default tier chain.
#[must_use]
pub fn extract_collection_urls(
    doc: &Document<'_>,
    page_url: &str,
    author_slug: Option<&str>,
) -> ChildExtraction {
    match CollectionScope::new(doc, page_url, author_slug) {
        Some(scope) => extract_with(&scope, &TIERS),
        None => ChildExtraction::default(),
    }
}

/// Runs `tiers` in order and stops at the first usable result.
#[must_use]
pub fn extract_with(scope: &CollectionScope<'_, '_>, tiers: &[(ExtractionTier, TierFn)]) -> ChildExtraction {
    tiers
        .iter()
        .find_map(|(tier, run)| {
            run(scope)
                .filter(|urls| !urls.is_empty())
                .map(|urls| ChildExtraction {
                    urls: urls.into_iter().collect(),
                    tier: Some(*tier),
                })
        })
        .unwrap_or_default()
}

/// Tier 1: the station's first loop block, when it holds most station links.
#[must_use]
pub fn tier_loop_block(scope: &CollectionScope<'_, '_>) -> Option<BTreeSet<String>> {
    let station = scope.station?;
    let block = scope.doc.find_in(station, "div", Some("block-loop-items"))?;
    let links = scope.work_links(block);
    (!links.is_empty() && links.len() * 10 >= scope.station_links.len() * 7).then_some(links)
}

/// Tier 2: the loop block whose links best share the page slug's tokens.
#[must_use]
pub fn tier_token_block(scope: &CollectionScope<'_, '_>) -> Option<BTreeSet<String>> {
    if scope.slug_tokens.is_empty() {
        return None;
    }
    let mut best: Option<(usize, BTreeSet<String>)> = None;
    for block in scope.doc.find_all_in(scope.entry, "div", Some("block-loop-items")) {
        let hrefs: Vec<&str> = scope
            .doc
            .find_all_in(block, "a", None)
            .into_iter()
            .filter_map(|a| scope.doc.element(a).attr("href"))
            .filter(|href| is_work_link(href))
            .collect();
        let score = hrefs.iter().filter(|href| scope.matches_token(href)).count();
        let links: BTreeSet<String> = hrefs.iter().filter_map(|href| scope.absolute(href)).collect();
        let best_score = best.as_ref().map_or(0, |(s, _)| *s);
        if score > best_score && !links.is_empty() {
            best = Some((score, links));
        }
    }
    let (_, links) = best?;
    (links.len() * 2 >= scope.station_links.len()).then_some(links)
}

/// Tier 3: every entry link sharing a slug token, when there are many.
#[must_use]
pub fn tier_token_global(scope: &CollectionScope<'_, '_>) -> Option<BTreeSet<String>> {
    if scope.slug_tokens.is_empty() {
        return None;
    }
    let matched = scope.work_links_where(scope.entry, |href| scope.matches_token(href));
    (matched.len() > MIN_GLOBAL_TOKEN_MATCHES).then_some(matched)
}

/// Tier 4: scripture projects whose books share no slug tokens with the page.
#[must_use]
pub fn tier_scripture_keywords(scope: &CollectionScope<'_, '_>) -> Option<BTreeSet<String>> {
    if !SCRIPTURE_SLUG_MARKERS.iter().any(|m| scope.slug.contains(m)) {
        return None;
    }
    Some(scope.work_links_where(scope.entry, |href| {
        SCRIPTURE_LINK_MARKERS.iter().any(|m| href.contains(m))
    }))
}

/// Tier 5: all station links, else the first link of each of the author's articles.
#[must_use]
pub fn tier_all_links(scope: &CollectionScope<'_, '_>) -> Option<BTreeSet<String>> {
    if !scope.station_links.is_empty() {
        return Some(scope.station_links.clone());
    }
    let author_class = scope.author_slug.as_ref().map(|slug| format!("auteur-{slug}"));
    let doc = scope.doc;
    let links = doc
        .find_all_in(scope.entry, "article", None)
        .into_iter()
        .filter(|&art| {
            author_class
                .as_deref()
                .is_none_or(|class| doc.element(art).has_class(class))
        })
        .filter_map(|art| {
            let href = doc
                .find_all_in(art, "a", None)
                .into_iter()
                .find_map(|a| doc.element(a).attr("href"))?;
            is_work_link(href).then(|| scope.absolute(href)).flatten()
        })
        .collect();
    Some(links)
}

/// Decides whether a work page is a collection.
///
/// Checked in order: a `sommaire` body class, a station loop block with at
/// least three distinct work links, an `oeuvre-integrale` URL, then keywords
/// in the title and description.
#[must_use]
pub fn is_collection_page(
    doc: &Document<'_>,
    url: &str,
    title: Option<&str>,
    description: Option<&str>,
) -> bool {
    let body_marked = doc
        .find("body", None)
        .is_some_and(|body| doc.element(body).classes().any(|c| c.contains("sommaire")));
    if body_marked {
        return true;
    }

    let block = doc
        .find("div", Some("entry-content"))
        .and_then(|entry| doc.find_in(entry, "div", Some("station-content")))
        .and_then(|station| doc.find_in(station, "div", Some("block-loop-items")));
    if let Some(block) = block {
        let distinct: BTreeSet<&str> = doc
            .find_all_in(block, "a", None)
            .into_iter()
            .filter_map(|a| doc.element(a).attr("href"))
            .filter(|href| is_work_link(href))
            .collect();
        if distinct.len() >= MIN_BLOCK_LINKS {
            return true;
        }
    }

    if url.to_lowercase().contains("oeuvre-integrale") {
        return true;
    }
    let text = format!("{} {}", title.unwrap_or(""), description.unwrap_or("")).to_lowercase();
    COLLECTION_KEYWORDS.iter().any(|k| text.contains(k))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const BASE: &str = "https://www.litteratureaudio.com/livre-audio-gratuit-mp3";

    fn link(slug: &str) -> String {
        format!(r#"<a href="{BASE}/{slug}.html">{slug}</a>"#)
    }

    fn page(station: &str, rest: &str) -> String {
        format!(
            r#"<body><div class="entry-content"><div class="station-content">{station}</div>{rest}</div></body>"#
        )
    }

    #[test]
    fn test_loop_block_used_when_it_covers_station() {
        let block: String = ["a", "b", "c"].iter().map(|s| link(s)).collect();
        let html = page(&format!(r#"<div class="block-loop-items">{block}</div>{}"#, link("d")), "");
        let doc = Document::parse(&html);
        let out = extract_collection_urls(&doc, &format!("{BASE}/recueil.html"), None);
        assert_eq!(out.tier, Some(ExtractionTier::LoopBlock));
        assert_eq!(out.urls.len(), 3);
        assert!(out.urls.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_partial_loop_block_falls_through_to_all_links() {
        let block = link("a");
        let rest: String = ["b", "c", "d"].iter().map(|s| link(s)).collect();
        let html = page(&format!(r#"<div class="block-loop-items">{block}</div><p>{rest}</p>"#), "");
        let doc = Document::parse(&html);
        let out = extract_collection_urls(&doc, &format!("{BASE}/recueil.html"), None);
        assert_eq!(out.tier, Some(ExtractionTier::AllLinks));
        assert_eq!(out.urls.len(), 4);
    }

    #[test]
    fn test_token_block_scores_slug_tokens_without_author_tokens() {
        let station: String = ["x1", "x2", "x3", "x4"].iter().map(|s| link(s)).collect();
        let good: String = ["maupassant-contes-1", "maupassant-contes-2", "maupassant-contes-3"]
            .iter()
            .map(|s| link(s))
            .collect();
        let bad: String = ["maupassant-bel-ami", "maupassant-horla"].iter().map(|s| link(s)).collect();
        let html = page(
            &station,
            &format!(r#"<div class="block-loop-items">{bad}</div><div class="block-loop-items">{good}</div>"#),
        );
        let doc = Document::parse(&html);
        let out = extract_collection_urls(&doc, &format!("{BASE}/maupassant-guy-de-contes.html"), Some("guy-de-maupassant"));
        assert_eq!(out.tier, Some(ExtractionTier::TokenBlock));
        assert_eq!(out.urls.len(), 3);
        assert!(out.urls.iter().all(|u| u.contains("contes")));
    }

    #[test]
    fn test_scripture_keywords_tier() {
        let rest: String = ["evangile-selon-jean", "livre-de-job", "apocalypse"].iter().map(|s| link(s)).collect();
        let html = format!(r#"<div class="entry-content"><p>{rest}</p></div>"#);
        let doc = Document::parse(&html);
        let out = extract_collection_urls(&doc, &format!("{BASE}/la-sainte-bible.html"), None);
        assert_eq!(out.tier, Some(ExtractionTier::ScriptureKeywords));
        assert_eq!(out.urls, vec![format!("{BASE}/evangile-selon-jean.html")]);
    }

    #[test]
    fn test_author_articles_are_last_resort_and_page_is_excluded() {
        let html = format!(
            r#"<div class="entry-content">
            <article class="post auteur-emile-zola">{}</article>
            <article class="post auteur-victor-hugo">{}</article>
            <article class="post auteur-emile-zola">{}</article></div>"#,
            link("zola-nana"),
            link("hugo-notre-dame"),
            link("zola-oeuvre")
        );
        let doc = Document::parse(&html);
        let out = extract_collection_urls(&doc, &format!("{BASE}/zola-oeuvre.html"), Some("emile-zola"));
        assert_eq!(out.tier, Some(ExtractionTier::AllLinks));
        assert_eq!(out.urls, vec![format!("{BASE}/zola-nana.html")]);
    }

    static LATER_TIER_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn counted_token_block(scope: &CollectionScope<'_, '_>) -> Option<BTreeSet<String>> {
        LATER_TIER_CALLS.fetch_add(1, Ordering::SeqCst);
        tier_token_block(scope)
    }

    fn counted_all_links(scope: &CollectionScope<'_, '_>) -> Option<BTreeSet<String>> {
        LATER_TIER_CALLS.fetch_add(1, Ordering::SeqCst);
        tier_all_links(scope)
    }

    #[test]
    fn test_later_tiers_not_evaluated_after_loop_block_succeeds() {
        let block: String = ["a", "b", "c"].iter().map(|s| link(s)).collect();
        let html = page(&format!(r#"<div class="block-loop-items">{block}</div>"#), "");
        let doc = Document::parse(&html);
        let scope = CollectionScope::new(&doc, &format!("{BASE}/recueil-a-b-c.html"), None).unwrap();
        let tiers: [(ExtractionTier, TierFn); 3] = [
            (ExtractionTier::LoopBlock, tier_loop_block),
            (ExtractionTier::TokenBlock, counted_token_block),
            (ExtractionTier::AllLinks, counted_all_links),
        ];
        let out = extract_with(&scope, &tiers);
        assert_eq!(out.tier, Some(ExtractionTier::LoopBlock));
        assert_eq!(LATER_TIER_CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_is_collection_page_signals() {
        let url = format!("{BASE}/recueil.html");
        let doc = Document::parse(r#"<body class="single sommaire-page"></body>"#);
        assert!(is_collection_page(&doc, &url, None, None));

        let block: String = ["a", "b", "c"].iter().map(|s| link(s)).collect();
        let html = page(&format!(r#"<div class="block-loop-items">{block}</div>"#), "");
        assert!(is_collection_page(&Document::parse(&html), &url, None, None));

        let empty = Document::parse("<body></body>");
        assert!(is_collection_page(&empty, &format!("{BASE}/zola-oeuvre-integrale.html"), None, None));
        assert!(is_collection_page(&empty, &url, Some("Contes"), Some("Un projet collectif")));
        assert!(!is_collection_page(&empty, &url, Some("Nana"), Some("Roman")));
    }
}
