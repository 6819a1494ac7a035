//! Remote catalog access.
//!
//! The catalog is queried one partition at a time: a class or level, a
//! category, and an asset kind. Each query returns a single page of
//! [`CatalogEntry`] values; there is no further pagination.
//!
//! # Architecture
//!
//! - [`CatalogSource`] - Async trait the harvest loop and pipeline consume
//! - [`CatalogQuery`] - One partition × category × kind request
//! - [`CatalogPage`] - The `{results: [...]}` body of a catalog response
//! - [`HttpCatalogSource`] - Implementation against the public book API

mod http;

pub use http::{DEFAULT_API_HOST, DEFAULT_PAGE_LIMIT, HttpCatalogSource};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::download::DownloadError;
use crate::model::{AssetKind, AttachmentEntry, CatalogEntry};

/// Every text-book class the catalog knows.
pub const TEXT_CLASSES: [&str; 12] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12",
];

/// Every non-text reading level the catalog knows.
pub const NONTEXT_LEVELS: [&str; 8] = ["A", "B1", "B2", "B3", "C", "D", "E", "transisi"];

/// The axis value a catalog query is restricted to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Partition {
    /// A school class, `1` to `12`.
    Class(String),
    /// A non-text reading level such as `B1`.
    Level(String),
}

impl Partition {
    /// Returns the partition value (`"7"`, `"B1"`).
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Class(value) | Self::Level(value) => value,
        }
    }

    /// Returns the query parameter selecting this partition (`class_7`).
    #[must_use]
    pub fn query_key(&self) -> String {
        match self {
            Self::Class(value) => format!("class_{value}"),
            Self::Level(value) => format!("level_{value}"),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(value) => write!(f, "class {value}"),
            Self::Level(value) => write!(f, "level {value}"),
        }
    }
}

/// Catalog section a query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogCategory {
    /// Books of the current national curriculum.
    Curriculum,
    /// Regular text books.
    Text,
    /// Non-text (reading) books.
    NonText,
}

impl CatalogCategory {
    /// Returns the category code recorded for entries found under it.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Curriculum => "curriculum",
            Self::Text => "text",
            Self::NonText => "nontext",
        }
    }

    /// Returns the API path listing this category.
    #[must_use]
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Curriculum => "/api/catalogue/getPenggerakTextBooks",
            Self::Text => "/api/catalogue/getTextBooks",
            Self::NonText => "/api/catalogue/getNonTextBooks",
        }
    }
}

/// One single-page catalog request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub partition: Partition,
    pub category: CatalogCategory,
    pub kind: AssetKind,
}

impl CatalogQuery {
    #[must_use]
    pub fn new(partition: Partition, category: CatalogCategory, kind: AssetKind) -> Self {
        Self {
            partition,
            category,
            kind,
        }
    }
}

impl fmt::Display for CatalogQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.category.code(),
            self.kind.api_name(),
            self.partition
        )
    }
}

/// One page of catalog results.
///
/// Rows are decoded one at a time; a row that does not parse is logged and
/// dropped without costing the rest of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogPage {
    #[serde(default, deserialize_with = "valid_entries")]
    pub results: Vec<CatalogEntry>,
    /// Set when the fetch failed and the page stands in for the real one.
    #[serde(skip)]
    pub degraded: bool,
}

impl CatalogPage {
    /// Returns an empty page standing in for a failed fetch.
    #[must_use]
    pub fn degraded() -> Self {
        Self {
            results: Vec::new(),
            degraded: true,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

fn valid_entries<'de, D>(deserializer: D) -> Result<Vec<CatalogEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let total = rows.len();
    let entries: Vec<CatalogEntry> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value(row) {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(index, error = %error, "dropping malformed catalog row");
                None
            }
        })
        .collect();
    if entries.len() < total {
        warn!(dropped = total - entries.len(), total, "catalog page had malformed rows");
    }
    Ok(entries)
}

/// Read access to the remote catalog.
///
/// # Object Safety
///
/// Uses `async_trait` so the pipeline and loop can hold a `&dyn CatalogSource`.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetches one page for `query`.
    ///
    /// Never fails: any fetch error is logged and degrades to an empty page
    /// flagged [`degraded`](CatalogPage::degraded).
    /// Returned entries carry the queried partition, category and kind.
    async fn fetch(&self, query: &CatalogQuery) -> CatalogPage;

    /// Returns the ordered attachment list of an audio entry.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the detail lookup fails.
    async fn attachments(&self, entry: &CatalogEntry)
    -> Result<Vec<AttachmentEntry>, DownloadError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_query_key() {
        assert_eq!(Partition::Class("7".into()).query_key(), "class_7");
        assert_eq!(Partition::Level("B1".into()).query_key(), "level_B1");
    }

    #[test]
    fn test_partition_display() {
        assert_eq!(Partition::Class("12".into()).to_string(), "class 12");
        assert_eq!(Partition::Level("transisi".into()).to_string(), "level transisi");
    }

    #[test]
    fn test_category_endpoints_are_distinct() {
        let endpoints = [
            CatalogCategory::Curriculum.endpoint(),
            CatalogCategory::Text.endpoint(),
            CatalogCategory::NonText.endpoint(),
        ];
        assert_eq!(endpoints[0], "/api/catalogue/getPenggerakTextBooks");
        assert_ne!(endpoints[0], endpoints[1]);
        assert_ne!(endpoints[1], endpoints[2]);
    }

    #[test]
    fn test_catalog_page_missing_results_is_empty() {
        let page: CatalogPage = serde_json::from_str("{}").unwrap();
        assert!(page.is_empty());
        assert!(!page.degraded);
    }

    #[test]
    fn test_catalog_page_drops_only_malformed_rows() {
        let page: CatalogPage = serde_json::from_str(
            r#"{"results":[
                {"title":"IPA","attachment":"https://x/ipa.pdf","type":"pdf"},
                {"title":null,"type":"pdf"},
                {"type":"epub"},
                {"title":"IPS","attachment":"https://x/ips.pdf","type":null},
                "not an object"
            ]}"#,
        )
        .unwrap();
        let titles: Vec<_> = page.results.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["IPA", "IPS"]);
    }

    #[test]
    fn test_catalog_page_null_results_is_empty() {
        let page: CatalogPage = serde_json::from_str(r#"{"results":null}"#).unwrap();
        assert!(page.is_empty());
    }

    #[test]
    fn test_query_display() {
        let query = CatalogQuery::new(
            Partition::Class("3".into()),
            CatalogCategory::Text,
            AssetKind::Audio,
        );
        assert_eq!(query.to_string(), "text audio class 3");
    }
}
