//! HTTP client for site pages, API calls and file transfers.
//!
//! Every request goes through the shared [`RateLimiter`] and is retried per
//! the [`RetryPolicy`]; 429 responses also push the host's next slot out by
//! the server's Retry-After value.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::filename::{
    Reservation, cover_extension, filename_from_url, parse_content_disposition, part_path, persist,
    reserve,
};
use super::rate_limiter::{RateLimiter, parse_retry_after};
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::user_agent;

/// Times a finished download looks for a new name after losing its own.
const MAX_PERSIST_ATTEMPTS: usize = 3;

/// What a HEAD request revealed about a link target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadInfo {
    /// URL after following redirects.
    pub final_url: String,
    /// `Content-Disposition` filename.
    pub filename: Option<String>,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
}

/// A file written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Shared HTTP client; clone freely, clones share the connection pool and pacing.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
}

impl HttpClient {
    /// Client with default timeouts, no pacing and the default retry budget.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_policies(Arc::new(RateLimiter::disabled()), RetryPolicy::default())
    }

    /// Client sharing `rate_limiter` and retrying per `retry_policy`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when the TLS backend cannot be initialised.
    pub fn with_policies(
        rate_limiter: Arc<RateLimiter>,
        retry_policy: RetryPolicy,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .gzip(true)
            .cookie_store(true)
            .user_agent(user_agent::BROWSER_USER_AGENT)
            .default_headers(user_agent::default_headers())
            .build()?;
        Ok(Self {
            client,
            rate_limiter,
            retry_policy,
        })
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Fetches a page body as text.
    ///
    /// # Errors
    ///
    /// Returns the last [`DownloadError`] once retries are exhausted.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_text(&self, url: &str) -> Result<String, DownloadError> {
        self.with_retry(url, || async {
            let response = self.send(Method::GET, url).await?;
            response
                .text()
                .await
                .map_err(|e| DownloadError::network(url, e))
        })
        .await
    }

    /// Fetches and decodes a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Decode`] for malformed JSON, otherwise as [`get_text`](Self::get_text).
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, DownloadError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| DownloadError::decode(url, e.to_string()))
    }

    /// Sends a HEAD request, following redirects.
    ///
    /// # Errors
    ///
    /// Returns the last [`DownloadError`] once retries are exhausted.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn head(&self, url: &str) -> Result<HeadInfo, DownloadError> {
        self.with_retry(url, || async {
            let response = self.send(Method::HEAD, url).await?;
            let headers = response.headers();
            let header = |name| {
                headers
                    .get(name)
                    .and_then(|v: &reqwest::header::HeaderValue| v.to_str().ok())
                    .map(str::to_string)
            };
            Ok(HeadInfo {
                final_url: response.url().to_string(),
                filename: header(CONTENT_DISPOSITION)
                    .as_deref()
                    .and_then(parse_content_disposition),
                content_length: header(CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()),
                content_type: header(CONTENT_TYPE),
            })
        })
        .await
    }

    /// Streams `url` into `dir`.
    ///
    /// The file name is `suggested_name`, else the `Content-Disposition`
    /// name, else the last URL segment; it is sanitized and gets a ` (n)`
    /// suffix when taken. The name is claimed by creating `name.part`, so
    /// concurrent downloads into one folder never share a file, and the
    /// finished file never replaces an existing one.
    ///
    /// # Errors
    ///
    /// Returns the last [`DownloadError`] once retries are exhausted; no
    /// partial file is left behind.
    #[instrument(skip(self, dir), fields(url = %url))]
    pub async fn download_file(
        &self,
        url: &str,
        dir: &Path,
        suggested_name: Option<&str>,
    ) -> Result<DownloadedFile, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let file = self
            .with_retry(url, || self.download_once(url, dir, suggested_name))
            .await?;
        info!(path = %file.path.display(), bytes = file.bytes, "download complete");
        Ok(file)
    }

    /// Saves a cover image as `dir/cover.{jpg,png,webp}`, replacing any previous cover.
    ///
    /// # Errors
    ///
    /// Returns the last [`DownloadError`] once retries are exhausted.
    #[instrument(skip(self, dir), fields(url = %url))]
    pub async fn download_cover(&self, url: &str, dir: &Path) -> Result<DownloadedFile, DownloadError> {
        self.with_retry(url, || async {
            let response = self.send(Method::GET, url).await?;
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            let path = dir.join(format!("cover.{}", cover_extension(content_type)));
            let bytes = write_body(response, url, &path).await?;
            debug!(path = %path.display(), bytes, "cover saved");
            Ok(DownloadedFile { path, bytes })
        })
        .await
    }

    async fn download_once(
        &self,
        url: &str,
        dir: &Path,
        suggested_name: Option<&str>,
    ) -> Result<DownloadedFile, DownloadError> {
        let response = self.send(Method::GET, url).await?;
        let name = suggested_name
            .map(str::to_string)
            .or_else(|| {
                response
                    .headers()
                    .get(CONTENT_DISPOSITION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_disposition)
            })
            .or_else(|| filename_from_url(response.url().as_str()))
            .unwrap_or_else(|| "download".to_string());
        let reservation = reserve(dir, &name)
            .await
            .map_err(|e| DownloadError::io(dir, e))?;
        let Reservation { mut path, mut part, file } = reservation;

        let bytes = match stream_to_file(response, url, file, &part).await {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(path = %part.display(), "removing partial file");
                let _ = tokio::fs::remove_file(&part).await;
                return Err(error);
            }
        };

        for _ in 0..MAX_PERSIST_ATTEMPTS {
            match persist(&part, &path).await {
                Ok(()) => return Ok(DownloadedFile { path, bytes }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "name taken while downloading, picking another");
                    let next = reserve(dir, &name).await.map_err(|e| DownloadError::io(dir, e))?;
                    drop(next.file);
                    tokio::fs::rename(&part, &next.part)
                        .await
                        .map_err(|e| DownloadError::io(&next.part, e))?;
                    (path, part) = (next.path, next.part);
                }
                Err(e) => {
                    let _ = tokio::fs::remove_file(&part).await;
                    return Err(DownloadError::io(path, e));
                }
            }
        }
        let _ = tokio::fs::remove_file(&part).await;
        Err(DownloadError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "no free file name"),
        ))
    }

    /// Runs `op` until it succeeds or the retry policy gives up.
    async fn with_retry<T, F, Fut>(&self, url: &str, mut op: F) -> Result<T, DownloadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DownloadError>>,
    {
        let mut attempt = 1;
        loop {
            self.rate_limiter.acquire(url).await;
            let error = match op().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let failure = classify_error(&error);
            if failure == FailureType::RateLimited
                && let DownloadError::HttpStatus {
                    retry_after: Some(value),
                    ..
                } = &error
                && let Some(delay) = parse_retry_after(value)
            {
                self.rate_limiter.record_rate_limit(url, delay).await;
            }

            match self.retry_policy.should_retry(failure, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(url, attempt, error = %error, "request failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url, reason, "giving up");
                    return Err(error);
                }
            }
        }
    }

    async fn send(&self, method: Method, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DownloadError::timeout(url)
                } else if e.is_builder() {
                    DownloadError::invalid_url(url)
                } else {
                    DownloadError::network(url, e)
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Err(DownloadError::http_status_with_retry_after(
            url,
            status.as_u16(),
            retry_after,
        ))
    }
}

/// Streams a response body to `path` via `path.part`, replacing `path`.
async fn write_body(response: reqwest::Response, url: &str, path: &Path) -> Result<u64, DownloadError> {
    let part = part_path(path);
    let file = File::create(&part)
        .await
        .map_err(|e| DownloadError::io(&part, e))?;
    let result = stream_to_file(response, url, file, &part).await;
    match result {
        Ok(bytes) => {
            tokio::fs::rename(&part, path)
                .await
                .map_err(|e| DownloadError::io(path, e))?;
            Ok(bytes)
        }
        Err(error) => {
            debug!(path = %part.display(), "removing partial file");
            let _ = tokio::fs::remove_file(&part).await;
            Err(error)
        }
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    url: &str,
    file: File,
    path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(path, e))?;
        written += chunk.len() as u64;
    }
    writer.flush().await.map_err(|e| DownloadError::io(path, e))?;
    Ok(written)
}
