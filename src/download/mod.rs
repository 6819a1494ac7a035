//! HTTP fetching, retry and pacing for catalog assets.
//!
//! This module provides the network layer every collaborator shares: one
//! [`HttpClient`] with explicit timeouts and User-Agent, a [`RetryPolicy`]
//! that re-runs transiently failing operations with clamped exponential
//! backoff, and the fixed [`Pacer`] applied between acquisitions.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Partial files removed when the body stream fails
//! - Configurable timeouts (30s connect, 5min read by default)
//! - Structured error types with full context
//! - Filesystem-safe names derived from content locators
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::download::{HttpClient, RetryPolicy};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let policy = RetryPolicy::default();
//! let url = "https://example.com/book.pdf";
//! let bytes = policy
//!     .run(url, || client.download_to_path(url, Path::new("./books/7/book.pdf")))
//!     .await?;
//! println!("Downloaded {bytes} bytes");
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod filename;
mod pacing;
mod retry;

pub use client::{ClientSettings, HttpClient};
pub use constants::{CONNECT_TIMEOUT_SECS, DEFAULT_PACING, READ_TIMEOUT_SECS};
pub use error::DownloadError;
pub use filename::{file_name_from_locator, safe_dir_name};
pub use pacing::Pacer;
pub use retry::{DEFAULT_MAX_ATTEMPTS, FailureType, RetryDecision, RetryPolicy, classify_error};
