//! Title translation.
//!
//! Catalog titles are Indonesian; each acquired asset also records an English
//! title. Translation is a network call like any other and runs under the
//! shared [`RetryPolicy`].

use async_trait::async_trait;
use serde::de::Error as _;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::download::{DownloadError, HttpClient, RetryPolicy};

/// Public translate endpoint used by the web widget.
pub const DEFAULT_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Text translation capability.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translates `text` from `source_lang` to `target_lang`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] if the translation service cannot be reached
    /// or answers with something other than a translation.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, DownloadError>;
}

/// Returns every input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String, DownloadError> {
        Ok(text.to_string())
    }
}

/// Translator backed by the public Google translate endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: HttpClient,
    retry: RetryPolicy,
    endpoint: String,
}

impl GoogleTranslator {
    #[must_use]
    pub fn new(client: HttpClient, retry: RetryPolicy) -> Self {
        Self::with_endpoint(client, retry, DEFAULT_TRANSLATE_URL)
    }

    /// Creates a translator against a custom endpoint (for testing with wiremock).
    #[must_use]
    pub fn with_endpoint(
        client: HttpClient,
        retry: RetryPolicy,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            retry,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    #[instrument(skip(self), fields(chars = text.chars().count()))]
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, DownloadError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let params = [
            ("client", "gtx"),
            ("sl", source_lang),
            ("tl", target_lang),
            ("dt", "t"),
            ("q", text),
        ];
        let body: Value = self
            .retry
            .run(&self.endpoint, || {
                self.client.get_json::<Value>(&self.endpoint, &params)
            })
            .await?;

        let translated = join_segments(&body).ok_or_else(|| {
            DownloadError::decode(
                &self.endpoint,
                serde_json::Error::custom("response carries no translation segments"),
            )
        })?;
        debug!(translated = %translated, "title translated");
        Ok(translated)
    }
}

/// Concatenates the translated text of every segment in
/// `[[["seg", "src", ...], ...], ...]`.
fn join_segments(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;
    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    if translated.is_empty() {
        None
    } else {
        Some(translated)
    }
}
