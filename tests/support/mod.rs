//! Page fixtures shared by the integration tests.
//!
//! Each builder takes the site root so the same pages can be served from an
//! in-memory fetcher or a wiremock server.

#![allow(dead_code)]

/// Path prefix of work pages.
pub const WORKS: &str = "/livre-audio-gratuit-mp3";

/// Absolute URL of the work page `slug`.
pub fn work_url(root: &str, slug: &str) -> String {
    format!("{root}{WORKS}/{slug}.html")
}

/// Author listing page with one entry per slug.
pub fn author_listing(root: &str, name: &str, slugs: &[&str]) -> String {
    let entries: String = slugs
        .iter()
        .map(|s| format!(r#"<h2 class="entry-title"><a href="{}">{s}</a></h2>"#, work_url(root, s)))
        .collect();
    format!(
        r#"<html><body class="archive author"><h1 class="archive-title">Auteur : {name}</h1>{entries}</body></html>"#
    )
}

/// Single work page; `download` is an optional download button target.
pub fn work_page(root: &str, title: &str, author: &str, download: Option<&str>) -> String {
    let button = download
        .map(|href| format!(r#"<a class="btn-download" href="{href}">Télécharger</a>"#))
        .unwrap_or_default();
    format!(
        r#"<html><head><title>{title} | Litteratureaudio.com</title></head><body>
        <article class="post entry">
        <span class="entry-auteur"><a rel="tag" href="{root}{WORKS}/auteur/x">{author}</a></span>
        {button}</article></body></html>"#
    )
}

/// Collection page whose loop block links to `children`.
pub fn collection_page(root: &str, title: &str, author: &str, children: &[&str]) -> String {
    let links: String = children
        .iter()
        .map(|c| format!(r#"<a href="{}">{c}</a>"#, work_url(root, c)))
        .collect();
    format!(
        r#"<html><head><title>{title} | Litteratureaudio.com</title></head>
        <body class="single sommaire">
        <span class="entry-auteur"><a rel="tag" href="{root}{WORKS}/auteur/x">{author}</a></span>
        <div class="entry-content"><div class="station-content">
        <div class="block-loop-items">{links}</div></div></div></body></html>"#
    )
}
