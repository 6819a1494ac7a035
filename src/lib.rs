//! Harvester Core Library
//!
//! This library incrementally mirrors a remote book catalog to disk. Every
//! run reconciles the catalog against two persisted record tables (acquired
//! assets and outstanding failures), downloads only what is missing and
//! retries what failed before.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`store`] - Keyed CSV-backed record tables with atomic save
//! - [`model`] - Catalog entries and the records persisted about them
//! - [`download`] - HTTP client, retry policy, pacing and file naming
//! - [`catalog`] - Partitioned catalog queries and the source trait
//! - [`translate`] - Title translation collaborators
//! - [`inspect`] - Document validation (PDF page counting)
//! - [`pipeline`] - Per-entry acquisition and state bookkeeping
//! - [`harvest`] - The reconciliation loop over a harvest plan

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod download;
pub mod harvest;
pub mod inspect;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod translate;
mod user_agent;

// Re-export commonly used types
pub use catalog::{CatalogPage, CatalogQuery, CatalogSource, HttpCatalogSource};
pub use download::{
    DEFAULT_MAX_ATTEMPTS, DownloadError, FailureType, HttpClient, Pacer, RetryDecision,
    RetryPolicy, classify_error,
};
pub use harvest::{HarvestPlan, HarvestStats, Harvester, PlanError};
pub use inspect::{DocumentInspector, InspectError, PdfInspector};
pub use model::{AssetKind, AssetRecord, CatalogEntry, FailureRecord};
pub use pipeline::{AcquireError, AcquisitionPipeline, EntryStatus, HarvestState, Outcome};
pub use store::{PersistedSet, Record, StoreError};
pub use translate::{GoogleTranslator, IdentityTranslator, Translator};
