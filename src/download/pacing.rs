//! Fixed courtesy pause between acquisitions.
//!
//! The catalog service has no published rate limit; the harvester waits a
//! fixed interval after every attempted (not skipped) acquisition.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use harvester_core::download::Pacer;
//!
//! # async fn example() {
//! let pacer = Pacer::new(Duration::from_secs(10));
//! // ... download one asset
//! pacer.pause().await;
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, instrument};

use super::constants::DEFAULT_PACING;

/// Sleeps a fixed interval on each [`pause`](Self::pause).
#[derive(Debug)]
pub struct Pacer {
    delay: Duration,
    /// Total milliseconds spent pausing, for the run summary.
    paused_ms: AtomicU64,
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

impl Pacer {
    /// Creates a pacer that sleeps `delay` per pause.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            paused_ms: AtomicU64::new(0),
        }
    }

    /// Creates a pacer that never sleeps.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Returns whether pauses are no-ops.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.delay.is_zero()
    }

    /// Returns the configured delay.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the total time spent in [`pause`](Self::pause) so far.
    #[must_use]
    pub fn paused_total(&self) -> Duration {
        Duration::from_millis(self.paused_ms.load(Ordering::Relaxed))
    }

    /// Waits the configured delay.
    #[instrument(level = "trace", skip(self), fields(delay_ms = self.delay.as_millis()))]
    pub async fn pause(&self) {
        if self.is_disabled() {
            return;
        }
        debug!("pacing before next request");
        tokio::time::sleep(self.delay).await;
        let millis = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX);
        self.paused_ms.fetch_add(millis, Ordering::Relaxed);
    }
}
