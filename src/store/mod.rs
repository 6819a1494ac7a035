//! Durable keyed record tables backed by CSV files.
//!
//! A [`PersistedSet`] holds every record of one table in memory and rewrites
//! the whole file on [`save`](PersistedSet::save). After a save the file
//! equals the last completed checkpoint.
//!
//! # Example
//!
//! ```no_run
//! use harvester_core::model::{AssetKind, FailureRecord};
//! use harvester_core::store::PersistedSet;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut failures: PersistedSet<FailureRecord> = PersistedSet::new("failures.csv");
//! failures.load()?;
//! failures.add(FailureRecord::new("Matematika", "HTTP 404 downloading ..."));
//! assert!(failures.exists(AssetKind::Document, "Matematika"));
//! failures.save()?;
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::StoreError;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

/// A row type that can live in a [`PersistedSet`].
///
/// A record is identified by its scope plus its key: two rows may share a key
/// as long as their scopes differ.
pub trait Record: Serialize + DeserializeOwned {
    /// Namespace a key is unique within. Tables holding one kind of row use `()`.
    type Scope: Copy + PartialEq + fmt::Debug;

    /// Returns the scope of this record.
    fn scope(&self) -> Self::Scope;

    /// Returns the key of this record within its scope.
    fn key(&self) -> &str;
}

/// An insertion-ordered set of records keyed by [`Record::scope`] and
/// [`Record::key`], mirrored to a CSV file.
#[derive(Debug, Clone)]
pub struct PersistedSet<T> {
    path: PathBuf,
    records: Vec<T>,
}

impl<T: Record> PersistedSet<T> {
    /// Creates an empty set backed by `path`. Nothing is read until
    /// [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory contents with the backing file's records.
    ///
    /// A missing backing file is the first-run case and leaves the set empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file exists but cannot be read or parsed.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        if !self.path.is_file() {
            debug!("no backing table yet");
            return Ok(());
        }

        let mut reader =
            csv::Reader::from_path(&self.path).map_err(|e| StoreError::csv(&self.path, e))?;
        for row in reader.deserialize::<T>() {
            let record = row.map_err(|e| StoreError::csv(&self.path, e))?;
            self.add(record);
        }

        debug!(records = self.records.len(), "table loaded");
        Ok(())
    }

    /// Overwrites the backing file with the full in-memory contents.
    ///
    /// Rows are written to a sibling temp file which is then renamed over the
    /// target, so an interrupted save leaves the previous table in place.
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if writing or renaming fails.
    #[instrument(skip(self), fields(path = %self.path.display(), records = self.records.len()))]
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }

        let temp_path = temp_path_for(&self.path);
        let result = self.write_rows(&temp_path).and_then(|()| {
            fs::rename(&temp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))
        });
        if result.is_err() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn write_rows(&self, temp_path: &Path) -> Result<(), StoreError> {
        let mut writer =
            csv::Writer::from_path(temp_path).map_err(|e| StoreError::csv(temp_path, e))?;
        for record in &self.records {
            writer
                .serialize(record)
                .map_err(|e| StoreError::csv(temp_path, e))?;
        }
        writer.flush().map_err(|e| StoreError::io(temp_path, e))
    }

    /// Returns true if a record with `key` is present in `scope`.
    #[must_use]
    pub fn exists(&self, scope: T::Scope, key: &str) -> bool {
        self.position(scope, key).is_some()
    }

    /// Returns the record with `key` in `scope`, if present.
    #[must_use]
    pub fn get(&self, scope: T::Scope, key: &str) -> Option<&T> {
        self.position(scope, key).map(|index| &self.records[index])
    }

    /// Adds a record, replacing any record with the same scope and key in
    /// place.
    pub fn add(&mut self, record: T) {
        match self.position(record.scope(), record.key()) {
            Some(index) => self.records[index] = record,
            None => self.records.push(record),
        }
    }

    /// Removes and returns the record with `key` in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such record exists.
    pub fn remove(&mut self, scope: T::Scope, key: &str) -> Result<T, StoreError> {
        let index = self
            .position(scope, key)
            .ok_or_else(|| StoreError::not_found(format!("{scope:?}/{key}"), &self.path))?;
        Ok(self.records.remove(index))
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.records.iter()
    }

    fn position(&self, scope: T::Scope, key: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.scope() == scope && record.key() == key)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
