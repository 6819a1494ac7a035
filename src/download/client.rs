//! HTTP client wrapper shared by every network collaborator.
//!
//! This module provides the [`HttpClient`] struct which issues catalog and
//! translation queries and streams asset downloads to disk, with timeouts and
//! a User-Agent header applied from explicit configuration.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Connection settings for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Time allowed to establish a connection.
    pub connect_timeout: Duration,
    /// Time allowed for a whole request, body included.
    pub read_timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            user_agent: user_agent::default_user_agent().to_string(),
        }
    }
}

/// HTTP client for catalog queries and streaming downloads.
///
/// Created once per run and passed to every collaborator, so all requests
/// share one connection pool and one set of headers.
///
/// # Example
///
/// ```no_run
/// use harvester_core::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let bytes = client
///     .download_to_path("https://example.com/file.pdf", Path::new("./books/7/file.pdf"))
///     .await?;
/// println!("Downloaded {bytes} bytes");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a new HTTP client with default settings.
    ///
    /// # Panics
    ///
    /// Panics if the builder rejects [`ClientSettings::default`].
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_settings(&ClientSettings::default())
            .expect("failed to build HTTP client with static configuration")
    }

    /// Creates a new HTTP client from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the settings are rejected (e.g. a
    /// User-Agent that is not a valid header value).
    #[instrument(level = "debug", skip(settings), fields(user_agent = %settings.user_agent))]
    pub fn with_settings(settings: &ClientSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .gzip(true)
            .user_agent(settings.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    /// Sends a GET with query parameters and decodes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if `url` is not an absolute URL, the request
    /// fails, the server returns a non-2xx status, or the body is not the
    /// expected JSON.
    #[instrument(level = "debug", skip(self, params), fields(url = %url))]
    pub async fn get_json<T>(&self, url: &str, params: &[(&str, &str)]) -> Result<T, DownloadError>
    where
        T: DeserializeOwned,
    {
        let full_url = Url::parse_with_params(url, params)
            .map_err(|_| DownloadError::invalid_url(url))?;
        let response = send_checked(self.client.get(full_url), url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e))?;
        serde_json::from_slice(&body).map_err(|e| DownloadError::decode(url, e))
    }

    /// Downloads `url` into `path`, creating parent directories as needed.
    ///
    /// An existing file at `path` is overwritten. If the body stream fails
    /// midway the partial file is removed.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - `url` is blank
    /// - The request fails (connection, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - Writing to disk fails
    #[instrument(skip(self), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        if url.trim().is_empty() {
            return Err(DownloadError::blank_url(path.display().to_string()));
        }

        let response = send_checked(self.client.get(url), url).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }
        let mut file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path, e))?;

        let stream_result = stream_to_file(&mut file, response, url, path).await;
        if stream_result.is_err() {
            debug!("cleaning up partial file after error");
            let _ = tokio::fs::remove_file(path).await;
        }
        let bytes_written = stream_result?;

        debug!(bytes = bytes_written, "download complete");
        Ok(bytes_written)
    }
}

/// Sends a request and rejects non-2xx responses.
async fn send_checked(
    request: reqwest::RequestBuilder,
    url: &str,
) -> Result<reqwest::Response, DownloadError> {
    let response = request
        .send()
        .await
        .map_err(|e| DownloadError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        debug!(status = status.as_u16(), "request rejected");
        return Err(DownloadError::http_status(url, status.as_u16()));
    }
    Ok(response)
}

/// Streams response body to file, returning bytes written.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::from_reqwest(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}
