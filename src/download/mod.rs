//! File transfer: HTTP client, retries, pacing, link resolution and post-processing.
//!
//! # Features
//!
//! - Streaming downloads through a `.part` file, renamed when complete
//! - File names from `Content-Disposition`, sanitized, with ` (n)` suffixes on collision
//! - Bounded retries with exponential backoff and jitter; 429 honours `Retry-After`
//! - Per-host pacing shared by every request of a run
//! - HEAD-based resolution of redirecting download buttons
//! - ID3 tagging ([`tag_mp3`]) and ZIP extraction ([`extract_zip`])
//!
//! # Example
//!
//! ```no_run
//! use litaudio_core::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let file = client
//!     .download_file("https://www.litteratureaudio.com/mp3/nana.mp3", Path::new("./dl"), None)
//!     .await?;
//! println!("Downloaded: {}", file.path.display());
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod filename;
mod links;
pub mod rate_limiter;
mod retry;
mod tagging;
mod unzip;

pub use client::{DownloadedFile, HeadInfo, HttpClient};
pub use error::DownloadError;
pub use filename::{sanitize_file_name, unique_path};
pub use links::{DownloadPlan, build_download_plan, dedupe_links, guess_kind, resolve_link};
pub use rate_limiter::{RateLimiter, extract_domain, parse_retry_after};
pub use retry::{DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error};
pub use tagging::{TagError, TrackTags, UNKNOWN_ARTIST, tag_mp3};
pub use unzip::{UNZIP_DIR, UnzipError, extract_zip};
