//! HTTP client wrapper for streaming assets to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ASSET_SIZE_BYTES, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Verification applied to a downloaded asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadLimits {
    /// Largest accepted asset, in bytes.
    pub max_bytes: u64,
    /// When set, the declared content type must be `image/*` and the size
    /// must not exceed `max_bytes`.
    pub verify: bool,
}

impl Default for DownloadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_ASSET_SIZE_BYTES,
            verify: true,
        }
    }
}

/// A completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedAsset {
    pub path: PathBuf,
    pub bytes: u64,
    pub content_type: Option<String>,
}

/// Streams a remote asset to a local path.
///
/// Implementations must not leave a partial file behind when they fail.
#[async_trait]
pub trait AssetDownloader: Send + Sync {
    /// Downloads `url` to `dest`. An existing file is replaced only once the
    /// new download is complete and verified.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError`] on transport, disk, or verification failure.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        limits: &DownloadLimits,
    ) -> Result<DownloadedAsset, DownloadError>;
}

/// HTTP client shared by the fetcher and the asset downloader.
///
/// Created once per run and cloned freely; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] when the TLS backend cannot be
    /// initialized.
    pub fn new() -> Result<Self, DownloadError> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] when the client cannot be built.
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn send_request(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl AssetDownloader for HttpClient {
    #[instrument(skip(self, limits), fields(path = %dest.display()))]
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        limits: &DownloadLimits,
    ) -> Result<DownloadedAsset, DownloadError> {
        debug!("starting download");
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self.send_request(url).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        if limits.verify {
            if !content_type.as_deref().is_some_and(is_image_content_type) {
                return Err(DownloadError::unexpected_content_type(url, content_type));
            }
            if let Some(declared) = response.content_length()
                && declared > limits.max_bytes
            {
                return Err(DownloadError::too_large(url, limits.max_bytes, declared));
            }
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::io(parent, e))?;
        }
        let partial = partial_path(dest);
        let mut file = File::create(&partial)
            .await
            .map_err(|e| DownloadError::io(&partial, e))?;

        let cap = limits.verify.then_some(limits.max_bytes);
        let stream_result = stream_to_file(&mut file, response, url, &partial, cap).await;
        drop(file);

        let bytes = match stream_result {
            Ok(bytes) => bytes,
            Err(error) => {
                debug!(path = %partial.display(), "cleaning up partial file after error");
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(error);
            }
        };

        // Replaces any existing asset only once the new one is complete.
        if let Err(e) = tokio::fs::rename(&partial, dest).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(DownloadError::io(dest, e));
        }

        info!(path = %dest.display(), bytes, "download complete");
        Ok(DownloadedAsset {
            path: dest.to_path_buf(),
            bytes,
            content_type,
        })
    }
}

/// Sibling path a download is streamed into before it replaces `dest`.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(dest.file_name().unwrap_or(dest.as_os_str()));
    name.push(".part");
    dest.with_file_name(name)
}

/// Streams the response body to `file`, returning bytes written.
///
/// Stops with [`DownloadError::TooLarge`] as soon as `cap` would be exceeded.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
    cap: Option<u64>,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        let next_total = bytes_written + chunk.len() as u64;
        if let Some(cap) = cap
            && next_total > cap
        {
            return Err(DownloadError::too_large(url, cap, next_total));
        }

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;
        bytes_written = next_total;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|mime| mime.to_ascii_lowercase().starts_with("image/"))
}
