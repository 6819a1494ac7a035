//! Data model for catalog entries and the records persisted about them.
//!
//! [`CatalogEntry`] and [`AttachmentEntry`] are transient: they are parsed from
//! one catalog page, handed to the pipeline and dropped. [`AssetRecord`],
//! [`FailureRecord`] and [`AudioFileRecord`] are the rows of the persisted
//! tables (see [`crate::store`]).

use serde::{Deserialize, Deserializer, Serialize};

use crate::store::Record;

/// Label used when a catalog category is not in the lookup table.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Category assumed for asset rows written before the column existed.
pub const LEGACY_CATEGORY: &str = "Curriculum Text";

/// Kind of asset a catalog entry describes.
///
/// The API spells these `pdf`/`audio`; the persisted tables spell them
/// `PDF`/`Audio`. Both spellings are accepted when reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// A single downloadable document.
    #[default]
    #[serde(rename = "PDF", alias = "pdf")]
    Document,
    /// An audio book made of several attachment files.
    #[serde(rename = "Audio", alias = "audio")]
    Audio,
}

impl AssetKind {
    /// Returns the query-parameter spelling used by the catalog API.
    #[must_use]
    pub fn api_name(self) -> &'static str {
        match self {
            Self::Document => "pdf",
            Self::Audio => "audio",
        }
    }
}

/// One item of a catalog page.
///
/// Only `title` is required. The kind is never read from the API row; the
/// catalog source sets it from the query the row answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    /// Title; the identifying key within a partition.
    #[serde(deserialize_with = "required_string")]
    pub title: String,
    /// Class the entry belongs to, when it is a text book.
    #[serde(default, deserialize_with = "lenient_string")]
    pub class: Option<String>,
    /// Level the entry belongs to, when it is a non-text book.
    #[serde(default, deserialize_with = "lenient_string")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub isbn: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub edition: Option<String>,
    /// Raw category code as reported by the API.
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    /// Document download URL.
    #[serde(default, deserialize_with = "lenient_string")]
    pub attachment: Option<String>,
    /// Opaque slug identifying an audio book's detail page.
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: Option<String>,
    #[serde(skip)]
    pub kind: AssetKind,
    /// Partition value the entry was queried under. Set by the catalog source.
    #[serde(skip)]
    pub partition: String,
    /// Category the entry was queried under. Set by the catalog source.
    #[serde(skip)]
    pub query_category: String,
    /// Attachments of an audio entry, if already known.
    #[serde(skip)]
    pub attachments: Vec<AttachmentEntry>,
}

impl CatalogEntry {
    /// Returns the content locator: the download URL for documents, the
    /// detail slug for audio books.
    #[must_use]
    pub fn locator(&self) -> Option<&str> {
        match self.kind {
            AssetKind::Document => self.attachment.as_deref(),
            AssetKind::Audio => self.slug.as_deref(),
        }
    }

    /// Returns the partition key recorded for this entry: its class, else its
    /// level, else the partition it was queried under.
    #[must_use]
    pub fn partition_key(&self) -> &str {
        non_blank(self.class.as_deref())
            .or_else(|| non_blank(self.level.as_deref()))
            .unwrap_or(&self.partition)
    }

    /// Returns the human-readable category label for this entry.
    #[must_use]
    pub fn category_label(&self) -> &'static str {
        let code = non_blank(self.category.as_deref()).unwrap_or(&self.query_category);
        category_label(code)
    }
}

/// One file of an audio book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AttachmentEntry {
    /// Sub-title; identifies the attachment within its audio book.
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub chapter: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sub_chapter: Option<String>,
    /// Download URL of the audio file.
    #[serde(default, deserialize_with = "lenient_string")]
    pub attachment: Option<String>,
}

/// A fully acquired title, one row of the asset table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(rename = "Book List Title")]
    pub title: String,
    #[serde(rename = "Class")]
    pub partition: String,
    #[serde(rename = "ISBN", default)]
    pub isbn: Option<String>,
    #[serde(rename = "Edition", default)]
    pub edition: Option<String>,
    /// Local file (documents) or directory (audio) the asset was saved to.
    #[serde(rename = "File Name")]
    pub file: String,
    /// Page count for documents; empty for audio.
    #[serde(rename = "Pages", default)]
    pub pages: Option<u32>,
    #[serde(rename = "English Title", default)]
    pub translated_title: String,
    #[serde(rename = "Date Downloaded", default)]
    pub acquired_at: String,
    #[serde(rename = "Category", default = "legacy_category")]
    pub category: String,
    #[serde(rename = "Type", default)]
    pub kind: AssetKind,
}

impl Record for AssetRecord {
    type Scope = AssetKind;

    fn scope(&self) -> AssetKind {
        self.kind
    }

    fn key(&self) -> &str {
        &self.title
    }
}

/// Last failure recorded for a title (or, in a per-book table, a sub-title).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Failure")]
    pub message: String,
    /// Kind of the failed asset; rows without the column are documents.
    #[serde(rename = "Type", default)]
    pub kind: AssetKind,
}

impl FailureRecord {
    /// Creates a failure row for a document title.
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::for_kind(AssetKind::Document, title, message)
    }

    pub fn for_kind(
        kind: AssetKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
        }
    }
}

impl Record for FailureRecord {
    type Scope = AssetKind;

    fn scope(&self) -> AssetKind {
        self.kind
    }

    fn key(&self) -> &str {
        &self.title
    }
}

/// A downloaded audio attachment, one row of a per-book `files.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFileRecord {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "English Title", default)]
    pub translated_title: String,
    #[serde(rename = "Chapter", default)]
    pub chapter: String,
    #[serde(rename = "Subchapter", default)]
    pub sub_chapter: String,
    #[serde(rename = "File Name")]
    pub file_name: String,
}

impl Record for AudioFileRecord {
    type Scope = ();

    fn scope(&self) -> Self::Scope {}

    fn key(&self) -> &str {
        &self.title
    }
}

/// Maps a category code to its display label.
///
/// Unrecognized codes map to [`UNKNOWN_CATEGORY`].
#[must_use]
pub fn category_label(code: &str) -> &'static str {
    match code.trim().to_lowercase().as_str() {
        "curriculum" => "Curriculum Text",
        "text" | "buku_teks" => "Text",
        "nontext" | "non_text" | "buku_non_teks" => "Non-Text",
        _ => UNKNOWN_CATEGORY,
    }
}

fn legacy_category() -> String {
    LEGACY_CATEGORY.to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts a string or a number; rejects null.
fn required_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}

/// Accepts strings, numbers and null for fields the API is inconsistent about.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_entry_parses_api_document() {
        let entry: CatalogEntry = serde_json::from_str(
            r#"{"title":"Matematika","class":"7","level":null,"isbn":9786022,"edition":"2021",
                "category":"buku_teks","attachment":"https://static.example/Matematika%207.pdf",
                "type":"pdf"}"#,
        )
        .unwrap();
        assert_eq!(entry.kind, AssetKind::Document);
        assert_eq!(entry.isbn.as_deref(), Some("9786022"));
        assert_eq!(entry.level, None);
        assert_eq!(
            entry.locator(),
            Some("https://static.example/Matematika%207.pdf")
        );
    }

    #[test]
    fn test_catalog_entry_audio_locator_is_slug() {
        let mut entry: CatalogEntry =
            serde_json::from_str(r#"{"title":"Cerita","slug":"cerita-rakyat","type":"audio"}"#)
                .unwrap();
        entry.kind = AssetKind::Audio;
        assert_eq!(entry.locator(), Some("cerita-rakyat"));
    }

    #[test]
    fn test_catalog_entry_ignores_unknown_type() {
        let entry: CatalogEntry =
            serde_json::from_str(r#"{"title":2024,"type":"epub","attachment":"https://x/a.pdf"}"#)
                .unwrap();
        assert_eq!(entry.title, "2024");
        assert_eq!(entry.kind, AssetKind::Document);
    }

    #[test]
    fn test_catalog_entry_requires_title() {
        assert!(serde_json::from_str::<CatalogEntry>(r#"{"title":null}"#).is_err());
        assert!(serde_json::from_str::<CatalogEntry>(r#"{"type":"pdf"}"#).is_err());
    }

    #[test]
    fn test_legacy_failure_row_is_document() {
        let mut reader = csv::Reader::from_reader("Title,Failure\nSejarah,HTTP 404\n".as_bytes());
        let failure: FailureRecord = reader.deserialize().next().unwrap().unwrap();
        assert_eq!(failure.kind, AssetKind::Document);
        assert_eq!(failure, FailureRecord::new("Sejarah", "HTTP 404"));
    }

    #[test]
    fn test_partition_key_falls_back_to_level_then_query() {
        let mut entry = CatalogEntry {
            class: Some(String::new()),
            level: Some("B1".to_string()),
            partition: "3".to_string(),
            ..CatalogEntry::default()
        };
        assert_eq!(entry.partition_key(), "B1");
        entry.level = None;
        assert_eq!(entry.partition_key(), "3");
        entry.class = Some("4".to_string());
        assert_eq!(entry.partition_key(), "4");
    }

    #[test]
    fn test_category_label_lookup() {
        assert_eq!(category_label("curriculum"), "Curriculum Text");
        assert_eq!(category_label("TEXT"), "Text");
        assert_eq!(category_label("nontext"), "Non-Text");
        assert_eq!(category_label("comics"), UNKNOWN_CATEGORY);
        assert_eq!(category_label(""), UNKNOWN_CATEGORY);
    }

    #[test]
    fn test_category_label_prefers_entry_category() {
        let entry = CatalogEntry {
            category: Some("buku_non_teks".to_string()),
            query_category: "curriculum".to_string(),
            ..CatalogEntry::default()
        };
        assert_eq!(entry.category_label(), "Non-Text");

        let entry = CatalogEntry {
            query_category: "curriculum".to_string(),
            ..CatalogEntry::default()
        };
        assert_eq!(entry.category_label(), "Curriculum Text");
    }
}
