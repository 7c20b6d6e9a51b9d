//! Per-host request pacing (`--sleep`).
//!
//! Every request to a host waits until that host's "next allowed" instant,
//! which moves forward by the configured pause after each request. A 429
//! response pushes it further out by the server's Retry-After value, so
//! concurrent workers all back off together instead of hammering the site.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use litaudio_core::download::RateLimiter;
//!
//! # async fn example() {
//! let limiter = RateLimiter::new(Duration::from_millis(500));
//! limiter.acquire("https://www.litteratureaudio.com/a.html").await; // immediate
//! limiter.acquire("https://www.litteratureaudio.com/b.html").await; // waits ~500ms
//! limiter.acquire("https://cdn.example.com/c.mp3").await; // other host, immediate
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use super::constants::{CUMULATIVE_DELAY_WARNING_THRESHOLD, MAX_RETRY_AFTER};

/// Shared pacing state, one entry per host.
#[derive(Debug)]
pub struct RateLimiter {
    pause: Duration,
    disabled: bool,
    /// `Arc` so the map shard lock is released before awaiting on the host lock.
    hosts: DashMap<String, Arc<HostState>>,
}

#[derive(Debug, Default)]
struct HostState {
    /// `None` until the first request: the first request never waits.
    next_allowed: Mutex<Option<Instant>>,
    waited_ms: AtomicU64,
}

impl HostState {
    #[allow(clippy::cast_possible_truncation)]
    fn add_wait(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis() as u64;
        Duration::from_millis(self.waited_ms.fetch_add(ms, Ordering::Relaxed) + ms)
    }
}

impl RateLimiter {
    /// Limiter spacing requests to the same host by `pause`.
    #[must_use]
    pub fn new(pause: Duration) -> Self {
        Self {
            pause,
            disabled: pause.is_zero(),
            hosts: DashMap::new(),
        }
    }

    /// Limiter that never waits, except after a server-mandated Retry-After.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Builds a limiter from `--sleep` seconds; zero or negative disables pacing.
    #[must_use]
    pub fn from_seconds(seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            Self::new(Duration::from_secs_f64(seconds))
        } else {
            Self::disabled()
        }
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn pause(&self) -> Duration {
        self.pause
    }

    fn state(&self, host: &str) -> Arc<HostState> {
        self.hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(HostState::default()))
            .clone()
    }

    /// Waits until a request to `url`'s host is allowed, then books the next slot.
    #[instrument(skip(self), fields(host))]
    pub async fn acquire(&self, url: &str) {
        let host = extract_domain(url);
        tracing::Span::current().record("host", &host);
        let state = self.state(&host);
        let mut next_allowed = state.next_allowed.lock().await;

        if let Some(at) = *next_allowed {
            let now = Instant::now();
            if at > now {
                let delay = at - now;
                let total = state.add_wait(delay);
                debug!(host = %host, delay_ms = delay.as_millis(), "pacing request");
                if total >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
                    warn!(host = %host, waited_secs = total.as_secs(), "heavy rate limiting");
                }
                tokio::time::sleep(delay).await;
            }
        }

        *next_allowed = if self.disabled {
            None
        } else {
            Some(Instant::now() + self.pause)
        };
    }

    /// Pushes the host's next slot out by a server-mandated delay.
    #[instrument(skip(self), fields(host))]
    pub async fn record_rate_limit(&self, url: &str, delay: Duration) {
        let host = extract_domain(url);
        tracing::Span::current().record("host", &host);
        let state = self.state(&host);
        let total = state.add_wait(delay);
        let target = Instant::now() + delay;
        let mut next_allowed = state.next_allowed.lock().await;
        if next_allowed.is_none_or(|at| at < target) {
            *next_allowed = Some(target);
        }
        debug!(host = %host, delay_ms = delay.as_millis(), "server asked to slow down");
        if total >= CUMULATIVE_DELAY_WARNING_THRESHOLD {
            warn!(host = %host, waited_secs = total.as_secs(), "site is rate limiting heavily");
        }
    }
}

/// Lower-cased host of a URL, `"unknown"` when it has none.
///
/// ```
/// use litaudio_core::download::extract_domain;
///
/// assert_eq!(extract_domain("https://WWW.LitteratureAudio.com/x"), "www.litteratureaudio.com");
/// assert_eq!(extract_domain("http://127.0.0.1:8080/x"), "127.0.0.1");
/// assert_eq!(extract_domain("not a url"), "unknown");
/// ```
#[must_use]
pub fn extract_domain(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Parses a Retry-After value: integer seconds or an HTTP date.
///
/// Values are capped at one hour; dates in the past mean "now".
///
/// ```
/// use std::time::Duration;
/// use litaudio_core::download::parse_retry_after;
///
/// assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
/// assert_eq!(parse_retry_after("soon"), None);
/// ```
#[must_use]
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    let value = header_value.trim();
    let delay = if let Ok(seconds) = value.parse::<u64>() {
        Duration::from_secs(seconds)
    } else {
        let at = httpdate::parse_http_date(value).ok()?;
        at.duration_since(std::time::SystemTime::now())
            .unwrap_or(Duration::ZERO)
    };
    if delay > MAX_RETRY_AFTER {
        warn!(delay_secs = delay.as_secs(), "Retry-After capped at one hour");
        return Some(MAX_RETRY_AFTER);
    }
    Some(delay)
}
