//! Catalog source backed by the public book API.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{CatalogPage, CatalogQuery, CatalogSource};
use crate::download::{DownloadError, HttpClient, RetryPolicy};
use crate::model::{AttachmentEntry, CatalogEntry};

/// Production API host.
pub const DEFAULT_API_HOST: &str = "https://api.buku.kemdikbud.go.id";

/// Page size requested per query; one page covers a whole partition.
pub const DEFAULT_PAGE_LIMIT: u32 = 2000;

const DETAILS_ENDPOINT: &str = "/api/catalogue/getDetails";

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    results: Details,
}

#[derive(Debug, Deserialize)]
struct Details {
    #[serde(default)]
    audio_attachment: Vec<AttachmentEntry>,
}

/// [`CatalogSource`] issuing GET requests against the catalog API.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: HttpClient,
    retry: RetryPolicy,
    api_host: String,
    page_limit: u32,
}

impl HttpCatalogSource {
    /// Creates a source for `api_host` (no trailing slash needed).
    #[must_use]
    pub fn new(client: HttpClient, retry: RetryPolicy, api_host: impl Into<String>) -> Self {
        Self {
            client,
            retry,
            api_host: api_host.into().trim_end_matches('/').to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Overrides the requested page size.
    #[must_use]
    pub fn with_page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit;
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.api_host)
    }

    async fn fetch_page(&self, query: &CatalogQuery) -> Result<CatalogPage, DownloadError> {
        let url = self.url(query.category.endpoint());
        let limit = self.page_limit.to_string();
        let kind_key = format!("type_{}", query.kind.api_name());
        let partition_key = query.partition.query_key();
        let params = [
            ("limit", limit.as_str()),
            (kind_key.as_str(), ""),
            (partition_key.as_str(), ""),
        ];

        self.retry
            .run(&url, || self.client.get_json::<CatalogPage>(&url, &params))
            .await
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    #[instrument(skip(self), fields(query = %query))]
    async fn fetch(&self, query: &CatalogQuery) -> CatalogPage {
        let mut page = match self.fetch_page(query).await {
            Ok(page) => page,
            Err(error) => {
                warn!(error = %error, "catalog fetch failed; treating partition as empty");
                return CatalogPage::degraded();
            }
        };

        for entry in &mut page.results {
            entry.partition = query.partition.value().to_string();
            entry.query_category = query.category.code().to_string();
            entry.kind = query.kind;
        }
        info!(entries = page.results.len(), "catalog page fetched");
        page
    }

    #[instrument(skip(self, entry), fields(title = %entry.title))]
    async fn attachments(
        &self,
        entry: &CatalogEntry,
    ) -> Result<Vec<AttachmentEntry>, DownloadError> {
        if !entry.attachments.is_empty() {
            return Ok(entry.attachments.clone());
        }
        let slug = entry
            .slug
            .as_deref()
            .map(str::trim)
            .filter(|slug| !slug.is_empty())
            .ok_or_else(|| DownloadError::blank_url(&entry.title))?;

        let url = self.url(DETAILS_ENDPOINT);
        let params = [("slug", slug)];
        let details = self
            .retry
            .run(&url, || self.client.get_json::<DetailsResponse>(&url, &params))
            .await?;

        debug!(
            attachments = details.results.audio_attachment.len(),
            "audio details fetched"
        );
        Ok(details.results.audio_attachment)
    }
}
