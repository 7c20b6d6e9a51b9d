//! Fetch seam between the crawler and the network.
//!
//! The crawler only needs page bodies and JSON documents. [`HttpClient`]
//! provides both over HTTP (with its own retries and pacing);
//! [`MemoryFetcher`] serves canned responses for offline runs and tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::download::{DownloadError, HttpClient};

/// Source of pages and JSON documents for the crawler.
///
/// Any error means "skip this URL": the crawler logs it and moves on.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a page body.
    async fn fetch_document(&self, url: &str) -> Result<String, DownloadError>;

    /// Fetches and decodes a JSON document.
    async fn fetch_json(&self, url: &str) -> Result<Value, DownloadError>;
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch_document(&self, url: &str) -> Result<String, DownloadError> {
        self.get_text(url).await
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, DownloadError> {
        self.get_json(url).await
    }
}

/// In-memory fetcher that also counts requests per URL.
///
/// Unknown URLs answer with a 404 [`DownloadError::HttpStatus`].
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, String>,
    json: HashMap<String, Value>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MemoryFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a page body for `url`.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Registers a JSON document for `url`.
    #[must_use]
    pub fn with_json(mut self, url: impl Into<String>, value: Value) -> Self {
        self.json.insert(url.into(), value);
        self
    }

    /// Number of fetches of `url` so far.
    #[must_use]
    pub fn fetch_count(&self, url: &str) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    /// Highest fetch count over every URL.
    #[must_use]
    pub fn max_fetch_count(&self) -> usize {
        self.hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .copied()
            .max()
            .unwrap_or(0)
    }

    fn hit(&self, url: &str) {
        *self
            .hits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(url.to_string())
            .or_default() += 1;
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch_document(&self, url: &str) -> Result<String, DownloadError> {
        self.hit(url);
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::http_status(url, 404))
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, DownloadError> {
        self.hit(url);
        self.json
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::http_status(url, 404))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_fetcher_serves_and_counts() {
        let fetcher = MemoryFetcher::new()
            .with_page("https://a/1.html", "<p>1</p>")
            .with_json("https://a/api", json!({"ok": true}));

        assert_eq!(fetcher.fetch_document("https://a/1.html").await.unwrap(), "<p>1</p>");
        assert_eq!(fetcher.fetch_json("https://a/api").await.unwrap()["ok"], true);
        let err = fetcher.fetch_document("https://a/missing").await.unwrap_err();
        assert!(matches!(err, DownloadError::HttpStatus { status: 404, .. }));

        assert_eq!(fetcher.fetch_count("https://a/1.html"), 1);
        assert_eq!(fetcher.fetch_count("https://a/missing"), 1);
        assert_eq!(fetcher.fetch_count("https://a/never"), 0);
        assert_eq!(fetcher.max_fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_http_client_fetcher() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let fetcher: &dyn Fetcher = &client;
        let body = fetcher
            .fetch_document(&format!("{}/page.html", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html></html>");
    }
}
