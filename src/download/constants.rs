//! Constants for the download module (timeouts, pacing).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default pause after each attempted acquisition (10 seconds).
pub const DEFAULT_PACING: Duration = Duration::from_secs(10);
