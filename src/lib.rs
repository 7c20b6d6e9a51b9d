//! Litaudio Core Library
//!
//! Crawls litteratureaudio.com pages (single works, collections, author,
//! reader and member listings) and turns them into a deterministic folder
//! tree of audiobooks with their metadata.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`site`] - Page classification and work, listing, track and collection parsing
//! - [`crawl`] - Breadth-first crawl with folder-context propagation
//! - [`layout`] - Folder naming and path resolution
//! - [`download`] - HTTP client, retries, rate limiting, link planning, tags, unzip
//! - [`pipeline`] - Per-item download state machine and worker pool
//! - [`report`] - Sidecars, summaries, dry-run log and verification
//! - [`config`] - Run options
//!
//! [`html`] and [`item`] hold the markup scanner and the shared data model.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod crawl;
pub mod download;
pub mod html;
pub mod item;
pub mod layout;
pub mod pipeline;
pub mod report;
pub mod site;
pub mod text;
mod user_agent;

// Re-export commonly used types
pub use config::{DownloadFormat, RunOptions};
pub use crawl::{CrawlOptions, Crawler, Fetcher};
pub use download::{DownloadError, HttpClient, RateLimiter, RetryPolicy};
pub use item::{DownloadLink, ItemContext, LinkKind, Track, WorkItem};
pub use layout::{FolderPaths, resolve};
pub use pipeline::{ItemOutcome, Pipeline, RunContext, RunStats};
pub use report::{DryRunReporter, SummaryCollector, VerifyReport, verify_output};
pub use site::{PageType, classify};
