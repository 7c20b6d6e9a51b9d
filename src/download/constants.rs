//! Transport timeouts and pacing limits.

use std::time::Duration;

/// HTTP connect timeout.
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// HTTP read timeout; audiobook archives can be large.
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Cumulative per-host wait after which a warning is logged.
pub const CUMULATIVE_DELAY_WARNING_THRESHOLD: Duration = Duration::from_secs(30);

/// Upper bound for a server-supplied Retry-After.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Suffix of in-progress downloads.
pub const PART_SUFFIX: &str = ".part";
