//! Content inspection of downloaded documents.
//!
//! The page count recorded for each document comes from parsing the saved
//! file; a file that does not parse is treated as a failed acquisition.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};

/// Errors raised while inspecting a saved document.
#[derive(Debug, Error)]
pub enum InspectError {
    /// The file is missing, truncated or not a valid document.
    #[error("corrupt document {path}: {reason}")]
    Corrupt {
        /// The inspected file.
        path: PathBuf,
        /// What the parser reported.
        reason: String,
    },
}

impl InspectError {
    /// Creates a corrupt-document error.
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Reads the size metric of a saved document.
pub trait DocumentInspector: Send + Sync {
    /// Returns the page count of the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`InspectError::Corrupt`] if the file cannot be parsed.
    fn inspect(&self, path: &Path) -> Result<u32, InspectError>;
}

/// Counts pages of PDF files with `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfInspector;

impl DocumentInspector for PdfInspector {
    #[instrument(level = "debug", skip(self), fields(path = %path.display()))]
    fn inspect(&self, path: &Path) -> Result<u32, InspectError> {
        let document =
            lopdf::Document::load(path).map_err(|e| InspectError::corrupt(path, e.to_string()))?;
        let pages = u32::try_from(document.get_pages().len())
            .map_err(|_| InspectError::corrupt(path, "page count out of range"))?;
        debug!(pages, "document inspected");
        Ok(pages)
    }
}
