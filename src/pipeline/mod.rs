//! Acquisition of single catalog entries.
//!
//! The [`AcquisitionPipeline`] turns one [`CatalogEntry`] into either an
//! [`AssetRecord`] or a set of [`FailureRecord`]s, and keeps the persisted
//! [`HarvestState`] consistent: for each kind, a title is in the asset table
//! or the failure table, never both, and both tables are checkpointed after
//! every entry.
//!
//! # Overview
//!
//! - Documents: one retried download, then page counting. Any error fails the
//!   whole entry.
//! - Audio books: one retried download per attachment. Attachments are tracked
//!   in a per-title table, so a failed attachment does not cost its siblings
//!   and a re-run only fetches what is still missing.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use harvester_core::catalog::{CatalogSource, HttpCatalogSource};
//! use harvester_core::download::{HttpClient, RetryPolicy};
//! use harvester_core::model::CatalogEntry;
//! use harvester_core::pipeline::{AcquisitionPipeline, HarvestState};
//!
//! # async fn example(entry: CatalogEntry) -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new();
//! let source: Arc<dyn CatalogSource> = Arc::new(HttpCatalogSource::new(
//!     client.clone(),
//!     RetryPolicy::default(),
//!     "https://api.example.com",
//! ));
//! let pipeline = AcquisitionPipeline::new(client, source, "./harvest");
//!
//! let mut state = HarvestState::new("./harvest/books.csv", "./harvest/failures.csv");
//! state.load()?;
//! let status = pipeline.process(&entry, &mut state).await;
//! println!("{status:?}");
//! # Ok(())
//! # }
//! ```

mod audio;
mod document;
mod error;

pub use error::AcquireError;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::catalog::CatalogSource;
use crate::download::{HttpClient, Pacer, RetryPolicy};
use crate::inspect::{DocumentInspector, PdfInspector};
use crate::model::{AssetKind, AssetRecord, CatalogEntry, FailureRecord};
use crate::store::{PersistedSet, StoreError};
use crate::translate::{IdentityTranslator, Translator};

/// Directory (under the output dir) holding downloaded documents.
pub const BOOKS_DIR: &str = "books";

/// Directory (under the output dir) holding audio book folders.
pub const AUDIO_DIR: &str = "audiobooks";

const DEFAULT_SOURCE_LANG: &str = "id";
const DEFAULT_TARGET_LANG: &str = "en";

/// The two persisted tables a harvest run reads and updates.
#[derive(Debug)]
pub struct HarvestState {
    /// Fully acquired titles.
    pub assets: PersistedSet<AssetRecord>,
    /// Titles whose last acquisition attempt failed.
    pub failures: PersistedSet<FailureRecord>,
}

impl HarvestState {
    /// Creates an empty state backed by the two table paths.
    pub fn new(asset_path: impl Into<PathBuf>, failure_path: impl Into<PathBuf>) -> Self {
        Self {
            assets: PersistedSet::new(asset_path),
            failures: PersistedSet::new(failure_path),
        }
    }

    /// Loads both tables.
    ///
    /// Failure rows for titles that are also in the asset table under the
    /// same kind are dropped, so a hand-edited pair of tables still starts
    /// out disjoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if either table exists but cannot be read.
    pub fn load(&mut self) -> Result<(), StoreError> {
        self.assets.load()?;
        self.failures.load()?;

        let stale: Vec<(AssetKind, String)> = self
            .failures
            .iter()
            .filter(|failure| self.assets.exists(failure.kind, &failure.title))
            .map(|failure| (failure.kind, failure.title.clone()))
            .collect();
        for (kind, title) in stale {
            debug!(title = %title, ?kind, "dropping failure row for acquired title");
            self.failures.remove(kind, &title)?;
        }

        info!(
            assets = self.assets.len(),
            failures = self.failures.len(),
            "harvest state loaded"
        );
        Ok(())
    }

    /// Saves both tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if either table cannot be written.
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        self.assets.save()?;
        self.failures.save()
    }

    /// Records a fully acquired title and clears its failure row of the same
    /// kind.
    pub fn record_success(&mut self, record: AssetRecord) {
        let (kind, title) = (record.kind, record.title.clone());
        self.assets.add(record);
        if self.failures.exists(kind, &title)
            && let Err(error) = self.failures.remove(kind, &title)
        {
            warn!(title = %title, error = %error, "failed to clear failure row");
        }
    }

    /// Records the latest failure for a title not acquired under that kind.
    pub fn record_failure(&mut self, failure: FailureRecord) {
        if self.assets.exists(failure.kind, &failure.title) {
            warn!(title = %failure.title, "ignoring failure for an acquired title");
            return;
        }
        self.failures.add(failure);
    }
}

/// Successful result of [`AcquisitionPipeline::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The title is already in the asset table; nothing was fetched.
    Skipped,
    /// The title was fully acquired.
    Acquired(AssetRecord),
    /// Some attachments of an audio book are saved, others still fail.
    Partial {
        /// Attachments saved so far, this run or earlier.
        saved: usize,
        /// Per-attachment failures still outstanding.
        failures: Vec<FailureRecord>,
    },
}

/// What [`AcquisitionPipeline::process`] did with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Skipped,
    Acquired,
    Partial,
    Failed,
}

/// Acquires catalog entries one at a time.
pub struct AcquisitionPipeline {
    client: HttpClient,
    source: Arc<dyn CatalogSource>,
    translator: Arc<dyn Translator>,
    inspector: Arc<dyn DocumentInspector>,
    retry: RetryPolicy,
    pacer: Pacer,
    output_dir: PathBuf,
    source_lang: String,
    target_lang: String,
}

impl std::fmt::Debug for AcquisitionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquisitionPipeline")
            .field("retry", &self.retry)
            .field("pacer", &self.pacer)
            .field("output_dir", &self.output_dir)
            .field("source_lang", &self.source_lang)
            .field("target_lang", &self.target_lang)
            .finish_non_exhaustive()
    }
}

impl AcquisitionPipeline {
    /// Creates a pipeline writing under `output_dir`.
    ///
    /// Titles are not translated and documents are inspected as PDF until
    /// configured otherwise.
    pub fn new(
        client: HttpClient,
        source: Arc<dyn CatalogSource>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            source,
            translator: Arc::new(IdentityTranslator),
            inspector: Arc::new(PdfInspector),
            retry: RetryPolicy::default(),
            pacer: Pacer::default(),
            output_dir: output_dir.into(),
            source_lang: DEFAULT_SOURCE_LANG.to_string(),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
        }
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    #[must_use]
    pub fn with_inspector(mut self, inspector: Arc<dyn DocumentInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    #[must_use]
    pub fn with_languages(
        mut self,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        self.source_lang = source_lang.into();
        self.target_lang = target_lang.into();
        self
    }

    /// Returns the catalog source entries are read from.
    #[must_use]
    pub fn source(&self) -> &dyn CatalogSource {
        self.source.as_ref()
    }

    #[must_use]
    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Acquires `entry` without touching the shared tables.
    ///
    /// Audio books update their own per-title tables as attachments complete.
    ///
    /// # Errors
    ///
    /// Returns the failure rows to record when nothing usable was acquired:
    /// one row keyed by the entry title for documents, one row per failed
    /// attachment (keyed by attachment title) for audio books. Every row
    /// carries the entry's kind.
    pub async fn acquire(
        &self,
        entry: &CatalogEntry,
        state: &HarvestState,
    ) -> Result<Outcome, Vec<FailureRecord>> {
        if state.assets.exists(entry.kind, &entry.title) {
            return Ok(Outcome::Skipped);
        }

        match entry.kind {
            AssetKind::Document => self
                .acquire_document(entry)
                .await
                .map(Outcome::Acquired)
                .map_err(|error| vec![error.into_failure(AssetKind::Document, &entry.title)]),
            AssetKind::Audio => self.acquire_audio(entry).await,
        }
    }

    /// Acquires `entry`, records the result in `state` and checkpoints.
    ///
    /// Never fails: errors become failure rows. Pauses for the pacing delay
    /// after every entry that was not skipped.
    #[instrument(skip(self, entry, state), fields(title = %entry.title, kind = ?entry.kind))]
    pub async fn process(&self, entry: &CatalogEntry, state: &mut HarvestState) -> EntryStatus {
        let status = match self.acquire(entry, state).await {
            Ok(Outcome::Skipped) => {
                debug!("already acquired; skipping");
                return EntryStatus::Skipped;
            }
            Ok(Outcome::Acquired(record)) => {
                info!(file = %record.file, pages = ?record.pages, "acquired");
                state.record_success(record);
                EntryStatus::Acquired
            }
            Ok(Outcome::Partial { saved, failures }) => {
                let summary = summarize_failures(entry.kind, &entry.title, saved, &failures);
                warn!(saved, failed = failures.len(), "partially acquired");
                state.record_failure(summary);
                EntryStatus::Partial
            }
            Err(failures) => {
                let summary = summarize_failures(entry.kind, &entry.title, 0, &failures);
                warn!(failure = %summary.message, "acquisition failed");
                state.record_failure(summary);
                EntryStatus::Failed
            }
        };

        if let Err(error) = state.checkpoint() {
            error!(error = %error, "checkpoint failed; retrying after the next entry");
        }
        self.pacer.pause().await;
        status
    }

    async fn translate(&self, text: &str) -> Result<String, AcquireError> {
        self.translator
            .translate(text, &self.source_lang, &self.target_lang)
            .await
            .map_err(AcquireError::Translate)
    }
}

/// Collapses the failures of one entry into the row for its title.
fn summarize_failures(
    kind: AssetKind,
    title: &str,
    saved: usize,
    failures: &[FailureRecord],
) -> FailureRecord {
    match failures {
        [only] if only.title == title => FailureRecord::for_kind(kind, title, &only.message),
        [] => FailureRecord::for_kind(kind, title, "acquisition failed"),
        [first, ..] => FailureRecord::for_kind(
            kind,
            title,
            format!(
                "{} attachment(s) failed, {saved} saved; {}: {}",
                failures.len(),
                first.title,
                first.message
            ),
        ),
    }
}

/// Timestamp recorded on acquired assets.
fn acquired_at() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
