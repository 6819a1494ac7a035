//! Integration tests for audio book acquisition.
//!
//! Audio books are processed through [`AcquisitionPipeline::process`] with a
//! wiremock details endpoint and attachment files.

mod support;

use std::sync::Arc;
use std::time::Duration;

use harvester_core::download::{ClientSettings, HttpClient, Pacer};
use harvester_core::model::{AssetKind, AudioFileRecord, CatalogEntry, FailureRecord};
use harvester_core::pipeline::{AcquisitionPipeline, EntryStatus};
use harvester_core::store::PersistedSet;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{FixedPages, fast_retry, load_state, mount_file, pipeline, requests_to, source};

fn audio_entry(title: &str, slug: &str) -> CatalogEntry {
    CatalogEntry {
        title: title.to_string(),
        slug: Some(slug.to_string()),
        kind: AssetKind::Audio,
        partition: "3".to_string(),
        query_category: "text".to_string(),
        ..CatalogEntry::default()
    }
}

fn attachment(title: &str, chapter: &str, sub_chapter: &str, url: &str) -> Value {
    json!({
        "title": title,
        "chapter": chapter,
        "sub_chapter": sub_chapter,
        "attachment": url,
    })
}

async fn mount_details(server: &MockServer, slug: &str, attachments: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/api/catalogue/getDetails"))
        .and(query_param("slug", slug))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "results": { "audio_attachment": attachments } })),
        )
        .mount(server)
        .await;
}

fn per_title_failures(dir: &std::path::Path) -> PersistedSet<FailureRecord> {
    let mut failures = PersistedSet::new(dir.join("failures.csv"));
    failures.load().expect("per-title failure table loads");
    failures
}

fn per_title_files(dir: &std::path::Path) -> PersistedSet<AudioFileRecord> {
    let mut files = PersistedSet::new(dir.join("files.csv"));
    files.load().expect("per-title file table loads");
    files
}

#[tokio::test]
async fn test_partial_audio_book_completes_on_rerun() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("failed to create temp dir");
    let base = server.uri();
    mount_details(
        &server,
        "cerita-rakyat",
        vec![
            attachment("Bab 1", "1", "1.1", &format!("{base}/audio/bab1.mp3")),
            attachment("Bab 2", "2", "2.1", &format!("{base}/audio/bab2.mp3")),
            attachment("Bab 3", "3", "3.1", &format!("{base}/audio/bab3.mp3")),
        ],
    )
    .await;
    mount_file(&server, "/audio/bab1.mp3", b"ID3 one").await;
    Mock::given(method("GET"))
        .and(path("/audio/bab2.mp3"))
        .respond_with(ResponseTemplate::new(404))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_file(&server, "/audio/bab2.mp3", b"ID3 two").await;
    mount_file(&server, "/audio/bab3.mp3", b"ID3 three").await;

    let entry = audio_entry("Cerita Rakyat", "cerita-rakyat");
    let book_dir = dir.path().join("audiobooks/3/cerita-rakyat");

    let mut state = load_state(dir.path());
    let status = pipeline(&server, dir.path()).process(&entry, &mut state).await;

    assert_eq!(status, EntryStatus::Partial);
    assert!(!state.assets.exists(AssetKind::Audio, "Cerita Rakyat"));
    let summary = state.failures.get(AssetKind::Audio, "Cerita Rakyat").expect("summary failure");
    assert!(
        summary.message.starts_with("1 attachment(s) failed, 2 saved"),
        "{}",
        summary.message
    );
    assert!(book_dir.join("bab1.mp3").is_file());
    assert!(book_dir.join("bab3.mp3").is_file());
    assert_eq!(per_title_files(&book_dir).len(), 2);
    assert!(per_title_failures(&book_dir).exists(AssetKind::Audio, "Bab 2"));

    let mut state = load_state(dir.path());
    let status = pipeline(&server, dir.path()).process(&entry, &mut state).await;

    assert_eq!(status, EntryStatus::Acquired);
    let record = state.assets.get(AssetKind::Audio, "Cerita Rakyat").expect("asset recorded");
    assert_eq!(record.kind, AssetKind::Audio);
    assert_eq!(record.pages, None);
    assert_eq!(record.partition, "3");
    assert!(!state.failures.exists(AssetKind::Audio, "Cerita Rakyat"));
    assert_eq!(per_title_files(&book_dir).len(), 3);
    assert!(per_title_failures(&book_dir).is_empty());

    assert_eq!(requests_to(&server, "/audio/bab1.mp3").await, 1);
    assert_eq!(requests_to(&server, "/audio/bab2.mp3").await, 2);
    assert_eq!(requests_to(&server, "/audio/bab3.mp3").await, 1);
}

#[tokio::test]
async fn test_attachment_timing_out_is_retried_then_refetched_alone() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("failed to create temp dir");
    let base = server.uri();
    mount_details(
        &server,
        "hikayat",
        vec![
            attachment("Bab 1", "1", "1.1", &format!("{base}/audio/hikayat1.mp3")),
            attachment("Bab 2", "2", "2.1", &format!("{base}/audio/hikayat2.mp3")),
            attachment("Bab 3", "3", "3.1", &format!("{base}/audio/hikayat3.mp3")),
        ],
    )
    .await;
    mount_file(&server, "/audio/hikayat1.mp3", b"ID3 one").await;
    Mock::given(method("GET"))
        .and(path("/audio/hikayat2.mp3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"ID3 two".to_vec())
                .set_delay(Duration::from_secs(2)),
        )
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    mount_file(&server, "/audio/hikayat2.mp3", b"ID3 two").await;
    mount_file(&server, "/audio/hikayat3.mp3", b"ID3 three").await;

    let entry = audio_entry("Hikayat", "hikayat");
    let book_dir = dir.path().join("audiobooks/3/hikayat");
    let impatient = HttpClient::with_settings(&ClientSettings {
        read_timeout: Duration::from_millis(200),
        ..ClientSettings::default()
    })
    .expect("client builds");
    let first_run = AcquisitionPipeline::new(impatient, source(&server), dir.path())
        .with_inspector(Arc::new(FixedPages(12)))
        .with_retry(fast_retry())
        .with_pacer(Pacer::disabled());

    let mut state = load_state(dir.path());
    let status = first_run.process(&entry, &mut state).await;

    assert_eq!(status, EntryStatus::Partial);
    assert_eq!(requests_to(&server, "/audio/hikayat2.mp3").await, 3);
    let book_failures = per_title_failures(&book_dir);
    assert_eq!(book_failures.len(), 1);
    let failure = book_failures
        .get(AssetKind::Audio, "Bab 2")
        .expect("attachment failure");
    assert!(failure.message.starts_with("timeout downloading"), "{}", failure.message);
    assert_eq!(per_title_files(&book_dir).len(), 2);

    let mut state = load_state(dir.path());
    let status = pipeline(&server, dir.path()).process(&entry, &mut state).await;

    assert_eq!(status, EntryStatus::Acquired);
    assert!(state.assets.exists(AssetKind::Audio, "Hikayat"));
    assert!(per_title_failures(&book_dir).is_empty());
    assert_eq!(requests_to(&server, "/audio/hikayat1.mp3").await, 1);
    assert_eq!(requests_to(&server, "/audio/hikayat2.mp3").await, 4);
    assert_eq!(requests_to(&server, "/audio/hikayat3.mp3").await, 1);
}

#[tokio::test]
async fn test_audio_book_with_no_saved_attachment_fails() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("failed to create temp dir");
    let base = server.uri();
    mount_details(
        &server,
        "lagu-daerah",
        vec![
            attachment("Lagu 1", "1", "", &format!("{base}/audio/lagu1.mp3")),
            attachment("Lagu 2", "2", "", &format!("{base}/audio/lagu2.mp3")),
        ],
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/audio/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut state = load_state(dir.path());
    let status = pipeline(&server, dir.path())
        .process(&audio_entry("Lagu Daerah", "lagu-daerah"), &mut state)
        .await;

    assert_eq!(status, EntryStatus::Failed);
    let summary = state.failures.get(AssetKind::Audio, "Lagu Daerah").expect("summary failure");
    assert!(
        summary.message.starts_with("2 attachment(s) failed, 0 saved"),
        "{}",
        summary.message
    );
}

#[tokio::test]
async fn test_details_lookup_failure_is_recorded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("failed to create temp dir");
    Mock::given(method("GET"))
        .and(path("/api/catalogue/getDetails"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = load_state(dir.path());
    let status = pipeline(&server, dir.path())
        .process(&audio_entry("Dongeng Hilang", "dongeng-hilang"), &mut state)
        .await;

    assert_eq!(status, EntryStatus::Failed);
    let failure = state.failures.get(AssetKind::Audio, "Dongeng Hilang").expect("failure recorded");
    assert!(
        failure.message.starts_with("Failed to get book details: HTTP 404"),
        "{}",
        failure.message
    );
}

#[tokio::test]
async fn test_blank_attachment_locator_names_the_attachment() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("failed to create temp dir");
    let base = server.uri();
    mount_details(
        &server,
        "dongeng",
        vec![
            attachment("Bab 1", "1", "1.1", &format!("{base}/audio/dongeng1.mp3")),
            attachment("Bab 2", "2", "2.1", ""),
        ],
    )
    .await;
    mount_file(&server, "/audio/dongeng1.mp3", b"ID3 one").await;

    let mut state = load_state(dir.path());
    let status = pipeline(&server, dir.path())
        .process(&audio_entry("Dongeng", "dongeng"), &mut state)
        .await;

    assert_eq!(status, EntryStatus::Partial);
    let book_failures = per_title_failures(&dir.path().join("audiobooks/3/dongeng"));
    let failure = book_failures.get(AssetKind::Audio, "Bab 2").expect("attachment failure");
    assert_eq!(failure.message, "Blank URL: Dongeng - Bab 2 - 2 - 2.1");
}

#[tokio::test]
async fn test_acquired_audio_book_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("failed to create temp dir");
    let base = server.uri();
    mount_details(
        &server,
        "pantun",
        vec![attachment("Pantun 1", "1", "", &format!("{base}/audio/pantun.mp3"))],
    )
    .await;
    mount_file(&server, "/audio/pantun.mp3", b"ID3").await;
    let entry = audio_entry("Pantun", "pantun");

    let mut state = load_state(dir.path());
    let first = pipeline(&server, dir.path()).process(&entry, &mut state).await;
    let second = pipeline(&server, dir.path()).process(&entry, &mut state).await;

    assert_eq!(first, EntryStatus::Acquired);
    assert_eq!(second, EntryStatus::Skipped);
    assert_eq!(requests_to(&server, "/api/catalogue/getDetails").await, 1);
}
