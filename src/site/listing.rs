//! Author, reader and member listing pages.

use url::Url;

use super::{PageType, absolutize, is_work_link};
use crate::html::Document;
use crate::text::{non_blank, normalize_whitespace};

/// What one page of a listing yields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Display name of the author/reader/member, when the page shows one.
    pub name: Option<String>,
    /// Sorted, de-duplicated work URLs listed on this page.
    pub work_urls: Vec<String>,
    /// Absolute URL of the following page.
    pub next_page: Option<String>,
}

/// Parses one listing page.
#[must_use]
pub fn parse_listing(url: &str, html: &str, page_type: PageType) -> ListingPage {
    let doc = Document::parse(html);
    let base = Url::parse(url).ok();
    ListingPage {
        name: listing_name(&doc, page_type),
        work_urls: base
            .as_ref()
            .map(|base| listing_urls(&doc, base))
            .unwrap_or_default(),
        next_page: base.as_ref().and_then(|base| next_page(&doc, base)),
    }
}

fn listing_name(doc: &Document<'_>, page_type: PageType) -> Option<String> {
    match page_type {
        PageType::AuthorListing | PageType::ReaderListing => {
            let header = doc.find("h1", Some("archive-title"))?;
            let text = doc.text(header);
            // "Auteur : Émile Zola"
            let name = text.split_once(':').map_or(text.as_str(), |(_, rest)| rest);
            non_blank(Some(&normalize_whitespace(name)))
        }
        PageType::MemberListing => {
            let h1 = doc
                .find("h1", Some("entry-title"))
                .or_else(|| doc.find("h1", None))?;
            non_blank(Some(&doc.text(h1)))
        }
        _ => None,
    }
}

fn listing_urls(doc: &Document<'_>, base: &Url) -> Vec<String> {
    let mut urls: Vec<String> = doc
        .find_all("*", Some("entry-title"))
        .into_iter()
        .flat_map(|title| doc.find_all_in(title, "a", None))
        .filter_map(|a| doc.element(a).attr("href"))
        .filter_map(|href| absolutize(base, href))
        .filter(|url| is_work_link(url))
        .collect();
    urls.sort();
    urls.dedup();
    urls
}

fn next_page(doc: &Document<'_>, base: &Url) -> Option<String> {
    doc.find_all("a", Some("next"))
        .into_iter()
        .find_map(|a| doc.element(a).attr("href"))
        .and_then(|href| absolutize(base, href))
}
