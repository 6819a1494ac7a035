//! Error types for acquiring a single catalog entry.
//!
//! Every variant is converted to a [`FailureRecord`] at the pipeline
//! boundary; none of them stop a harvest run.

use thiserror::Error;

use crate::download::DownloadError;
use crate::inspect::InspectError;
use crate::model::{AssetKind, FailureRecord};
use crate::store::StoreError;

/// Why one entry (or one audio attachment) could not be acquired.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Fetching or saving the asset failed.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The title could not be translated.
    #[error("Failed to translate title: {0}")]
    Translate(#[source] DownloadError),

    /// The attachment list of an audio entry could not be retrieved.
    #[error("Failed to get book details: {0}")]
    Details(#[source] DownloadError),

    /// The saved document did not parse.
    #[error(transparent)]
    Inspect(#[from] InspectError),

    /// A per-title attachment table could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AcquireError {
    /// Converts the error into the failure row recorded for `title` of
    /// `kind`.
    #[must_use]
    pub fn into_failure(self, kind: AssetKind, title: impl Into<String>) -> FailureRecord {
        FailureRecord::for_kind(kind, title, self.to_string())
    }
}
