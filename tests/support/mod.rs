//! Shared fixtures for harvester integration tests: mock catalog pages,
//! deterministic collaborators and a fast pipeline.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use harvester_core::catalog::{CatalogSource, HttpCatalogSource};
use harvester_core::download::{DownloadError, HttpClient, Pacer, RetryPolicy};
use harvester_core::inspect::{DocumentInspector, InspectError};
use harvester_core::pipeline::{AcquisitionPipeline, HarvestState};
use harvester_core::translate::Translator;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ASSET_TABLE: &str = "sibi_book_list.csv";
pub const FAILURE_TABLE: &str = "sibi_failures.csv";

/// Three attempts with millisecond backoff.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(
        3,
        Duration::from_millis(1),
        Duration::from_millis(1),
        Duration::from_millis(5),
        2.0,
    )
}

/// Reports a fixed page count for every file.
pub struct FixedPages(pub u32);

impl DocumentInspector for FixedPages {
    fn inspect(&self, path: &Path) -> Result<u32, InspectError> {
        if path.is_file() {
            Ok(self.0)
        } else {
            Err(InspectError::corrupt(path, "missing"))
        }
    }
}

/// Rejects every file as corrupt.
pub struct RejectAll;

impl DocumentInspector for RejectAll {
    fn inspect(&self, path: &Path) -> Result<u32, InspectError> {
        Err(InspectError::corrupt(path, "not a PDF"))
    }
}

/// Panics inside the parser, as a malformed file can make it do.
pub struct PanickingParser;

impl DocumentInspector for PanickingParser {
    fn inspect(&self, _path: &Path) -> Result<u32, InspectError> {
        panic!("xref table points past end of file");
    }
}

/// Prefixes text with the target language and counts calls.
#[derive(Default)]
pub struct TaggingTranslator {
    pub calls: AtomicUsize,
}

impl TaggingTranslator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for TaggingTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> Result<String, DownloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{target_lang}] {text}"))
    }
}

/// Catalog source pointed at the mock server.
pub fn source(server: &MockServer) -> Arc<dyn CatalogSource> {
    Arc::new(HttpCatalogSource::new(
        HttpClient::new(),
        fast_retry(),
        server.uri(),
    ))
}

/// Pipeline with fast retries, no pacing and a fixed page count.
pub fn pipeline(server: &MockServer, output_dir: &Path) -> AcquisitionPipeline {
    AcquisitionPipeline::new(HttpClient::new(), source(server), output_dir)
        .with_inspector(Arc::new(FixedPages(12)))
        .with_retry(fast_retry())
        .with_pacer(Pacer::disabled())
}

/// Loaded state backed by tables inside `dir`.
pub fn load_state(dir: &Path) -> HarvestState {
    let mut state = HarvestState::new(dir.join(ASSET_TABLE), dir.join(FAILURE_TABLE));
    state.load().expect("failed to load harvest state");
    state
}

/// Catalog row for a document.
pub fn document_json(title: &str, attachment: &str) -> Value {
    json!({
        "title": title,
        "class": null,
        "isbn": "978-602-244-000-1",
        "edition": "1",
        "attachment": attachment,
        "type": "pdf",
    })
}

/// Mounts one catalog page answering `endpoint` for `kind` in `partition_key`.
pub async fn mount_page(
    server: &MockServer,
    endpoint: &str,
    kind: &str,
    partition_key: &str,
    results: Vec<Value>,
) {
    Mock::given(method("GET"))
        .and(path(format!("/api/catalogue/{endpoint}")))
        .and(query_param(format!("type_{kind}"), ""))
        .and(query_param(partition_key, ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": results })))
        .mount(server)
        .await;
}

/// Mounts a file body at `file_path`.
pub async fn mount_file(server: &MockServer, file_path: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Number of requests the server received for `request_path`.
pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == request_path)
        .count()
}

/// Number of requests the server received outside the catalog API.
pub async fn non_catalog_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| !request.url.path().starts_with("/api/catalogue/get"))
        .count()
}
