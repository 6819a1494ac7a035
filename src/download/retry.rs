//! Bounded retries for catalog queries, translations and downloads.
//!
//! Every network call of a harvest goes through [`RetryPolicy::run`]. Only
//! failures classified as [`FailureType::Transient`] (the connection could not
//! be opened, or the response did not arrive in time) are attempted again; an
//! HTTP rejection, a blank locator or an undecodable body goes straight back to
//! the caller, which records it against the title.
//!
//! Waits grow exponentially from the base delay and are clamped to
//! `[min_delay, max_delay]`. When attempts run out the last transient error is
//! returned unchanged.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use harvester_core::download::{HttpClient, RetryPolicy};
//!
//! # async fn example() -> Result<(), harvester_core::download::DownloadError> {
//! let client = HttpClient::new();
//! let policy = RetryPolicy::default();
//! let url = "https://example.com/books/7/ipa.pdf";
//!
//! let bytes = policy
//!     .run(url, || client.download_to_path(url, Path::new("books/7/ipa.pdf")))
//!     .await?;
//! println!("saved {bytes} bytes");
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, instrument};

use super::DownloadError;

/// Attempts per network call, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);
const DEFAULT_MULTIPLIER: f32 = 2.0;

/// Whether a failed call is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Connect failure or timeout.
    Transient,
    /// Anything the server or the content itself decided.
    Permanent,
}

/// Outcome of [`RetryPolicy::should_retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep `delay`, then make attempt number `next_attempt`.
    Retry { delay: Duration, next_attempt: u32 },
    /// Stop and surface the error.
    GiveUp { reason: String },
}

/// Retry budget and backoff curve for one kind of network call.
///
/// Defaults: 3 attempts, waits of 2s then 4s (base 2s, multiplier 2,
/// clamped to 2s..=10s).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    min_delay: Duration,
    max_delay: Duration,
    multiplier: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            DEFAULT_BASE_DELAY,
            DEFAULT_MIN_DELAY,
            DEFAULT_MAX_DELAY,
            DEFAULT_MULTIPLIER,
        )
    }
}

impl RetryPolicy {
    /// Creates a policy.
    ///
    /// `max_attempts` is at least 1 and `max_delay` at least `min_delay`.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        min_delay: Duration,
        max_delay: Duration,
        multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            min_delay,
            max_delay: max_delay.max(min_delay),
            multiplier,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what follows failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn should_retry(&self, failure: FailureType, attempt: u32) -> RetryDecision {
        match failure {
            FailureType::Permanent => RetryDecision::GiveUp {
                reason: "permanent failure".to_string(),
            },
            FailureType::Transient if attempt >= self.max_attempts => RetryDecision::GiveUp {
                reason: format!("all {} attempts used", self.max_attempts),
            },
            FailureType::Transient => RetryDecision::Retry {
                delay: self.delay_after(attempt),
                next_attempt: attempt + 1,
            },
        }
    }

    /// Calls `operation` until it succeeds, fails permanently or the attempt
    /// budget is spent. `label` names the call in logs.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt, unwrapped and unchanged.
    #[instrument(level = "debug", skip(self, operation), fields(max_attempts = self.max_attempts))]
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, DownloadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DownloadError>>,
    {
        let mut attempt = 1u32;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            match self.should_retry(classify_error(&error), attempt) {
                RetryDecision::Retry {
                    delay,
                    next_attempt,
                } => {
                    info!(
                        label,
                        attempt = next_attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next_attempt;
                }
                RetryDecision::GiveUp { reason } => {
                    debug!(label, attempt, %reason, "giving up");
                    return Err(error);
                }
            }
        }
    }

    /// `clamp(base * multiplier^(attempt - 1), min, max)`
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw = self.base_delay.as_millis() as f64 * f64::from(self.multiplier).powi(exponent);
        let clamped = raw.clamp(
            self.min_delay.as_millis() as f64,
            self.max_delay.as_millis() as f64,
        );
        Duration::from_millis(clamped as u64)
    }
}

/// Sorts a [`DownloadError`] into transient or permanent.
///
/// Only [`DownloadError::Connect`] and [`DownloadError::Timeout`] are
/// transient. Every HTTP status is permanent, 5xx included.
#[must_use]
pub fn classify_error(error: &DownloadError) -> FailureType {
    match error {
        DownloadError::Connect { .. } | DownloadError::Timeout { .. } => FailureType::Transient,
        DownloadError::HttpStatus { .. }
        | DownloadError::Network { .. }
        | DownloadError::BlankUrl { .. }
        | DownloadError::InvalidUrl { .. }
        | DownloadError::Decode { .. }
        | DownloadError::Io { .. } => FailureType::Permanent,
    }
}
