//! Listing walker: follows a listing's pagination and gathers its works.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::fetcher::Fetcher;
use crate::layout::sanitize_name;
use crate::site::{PageType, normalize_url, parse_listing, slug_from_url};

/// Every work of one listing plus the group folder they share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingWalk {
    /// Sanitized listing name (author, reader or member).
    pub group_root: String,
    /// Normalized work URLs in page order, without duplicates.
    pub work_urls: Vec<String>,
    /// Listing pages read, the first one included.
    pub pages: usize,
}

/// Walks a listing starting from its already-fetched first page.
///
/// Follows "next" links until there is none, `max_pages` pages were read,
/// or a page repeats. Every page read is added to `visited`, so the crawl
/// never fetches it again.
pub async fn walk_listing(
    fetcher: &dyn Fetcher,
    visited: &mut HashSet<String>,
    url: &str,
    html: String,
    page_type: PageType,
    max_pages: Option<usize>,
) -> ListingWalk {
    let mut current_url = url.to_string();
    let mut html = html;
    let mut name = None;
    let mut pages = 0usize;
    let mut seen_works = HashSet::new();
    let mut work_urls = Vec::new();

    loop {
        pages += 1;
        let page = parse_listing(&current_url, &html, page_type);
        if name.is_none() {
            name = page.name;
        }
        for work in page.work_urls {
            let work = normalize_url(&work);
            if seen_works.insert(work.clone()) {
                work_urls.push(work);
            }
        }

        let Some(next) = page.next_page.map(|n| normalize_url(&n)) else {
            break;
        };
        if max_pages.is_some_and(|max| pages >= max) {
            debug!(url, pages, "listing page cap reached");
            break;
        }
        if !visited.insert(next.clone()) {
            debug!(url = %next, "listing page already seen, stopping");
            break;
        }
        html = match fetcher.fetch_document(&next).await {
            Ok(html) => html,
            Err(error) => {
                warn!(url = %next, error = %error, "failed to fetch listing page");
                break;
            }
        };
        current_url = next;
    }

    let slug = slug_from_url(url);
    let raw_name = name
        .or_else(|| (!slug.is_empty()).then_some(slug))
        .unwrap_or_else(|| "listing".to_string());
    ListingWalk {
        group_root: sanitize_name(&raw_name),
        work_urls,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawl::MemoryFetcher;

    const AUTHOR: &str = "https://www.litteratureaudio.com/livre-audio-gratuit-mp3/auteur/emile-zola";

    fn listing_page(works: &[&str], next: Option<&str>) -> String {
        let mut html = String::from(r#"<h1 class="archive-title">Auteur : Émile Zola</h1>"#);
        for work in works {
            html.push_str(&format!(
                r#"<h2 class="entry-title"><a href="https://www.litteratureaudio.com/livre-audio-gratuit-mp3/{work}.html">{work}</a></h2>"#
            ));
        }
        if let Some(next) = next {
            html.push_str(&format!(r#"<a class="next" href="{next}">Suivant</a>"#));
        }
        html
    }

    #[tokio::test]
    async fn test_walk_follows_pagination() {
        let page2 = format!("{AUTHOR}/page/2");
        let fetcher = MemoryFetcher::new().with_page(&page2, listing_page(&["zola-nana", "zola-germinal"], None));
        let mut visited = HashSet::from([AUTHOR.to_string()]);

        let walk = walk_listing(
            &fetcher,
            &mut visited,
            AUTHOR,
            listing_page(&["zola-assommoir", "zola-nana"], Some(&page2)),
            PageType::AuthorListing,
            None,
        )
        .await;

        assert_eq!(walk.group_root, "Émile Zola");
        assert_eq!(walk.pages, 2);
        assert_eq!(walk.work_urls.len(), 3);
        assert!(visited.contains(&page2));
    }

    #[tokio::test]
    async fn test_walk_respects_page_cap() {
        let page2 = format!("{AUTHOR}/page/2");
        let fetcher = MemoryFetcher::new().with_page(&page2, listing_page(&["zola-germinal"], None));
        let mut visited = HashSet::new();
        let walk = walk_listing(
            &fetcher,
            &mut visited,
            AUTHOR,
            listing_page(&["zola-nana"], Some(&page2)),
            PageType::AuthorListing,
            Some(1),
        )
        .await;
        assert_eq!(walk.pages, 1);
        assert_eq!(fetcher.fetch_count(&page2), 0);
    }

    #[tokio::test]
    async fn test_walk_stops_on_pagination_cycle() {
        let page2 = format!("{AUTHOR}/page/2");
        let fetcher = MemoryFetcher::new().with_page(&page2, listing_page(&["zola-germinal"], Some(AUTHOR)));
        let mut visited = HashSet::from([AUTHOR.to_string()]);
        let walk = walk_listing(
            &fetcher,
            &mut visited,
            AUTHOR,
            listing_page(&["zola-nana"], Some(&page2)),
            PageType::AuthorListing,
            None,
        )
        .await;
        assert_eq!(walk.pages, 2);
        assert_eq!(fetcher.max_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_group_root_falls_back_to_slug() {
        let fetcher = MemoryFetcher::new();
        let mut visited = HashSet::new();
        let walk = walk_listing(
            &fetcher,
            &mut visited,
            AUTHOR,
            "<p>empty</p>".to_string(),
            PageType::AuthorListing,
            None,
        )
        .await;
        assert_eq!(walk.group_root, "emile-zola");
        assert!(walk.work_urls.is_empty());
    }
}
