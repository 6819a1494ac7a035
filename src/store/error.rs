//! Error types for persisted record tables.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`PersistedSet`](super::PersistedSet) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A key was removed that is not in the set.
    ///
    /// Callers check [`exists`](super::PersistedSet::exists) first, so this
    /// indicates a bookkeeping bug rather than a runtime condition.
    #[error("no record with key {key:?} in {path}")]
    NotFound {
        /// The missing key.
        key: String,
        /// Backing file of the set.
        path: PathBuf,
    },

    /// Reading or writing the backing file failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not a valid record table.
    #[error("malformed table {path}: {source}")]
    Csv {
        /// The table that failed to parse or serialize.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    /// Creates a not-found error.
    pub fn not_found(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            key: key.into(),
            path: path.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a CSV error.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
