//! Error types for the download module.
//!
//! Every variant carries the URL or path it concerns so a failure outcome can
//! be reported without further context.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while streaming an asset to disk.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {source}")]
    Client {
        /// The underlying builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The server declared a content type other than an image.
    #[error("unexpected content type {content_type:?} downloading {url}")]
    UnexpectedContentType {
        /// The URL that was downloaded.
        url: String,
        /// Declared content type, if any.
        content_type: Option<String>,
    },

    /// The asset exceeds the configured size limit.
    #[error("{url} exceeds the {limit_bytes} byte limit ({actual_bytes} bytes)")]
    TooLarge {
        /// The URL that was downloaded.
        url: String,
        /// Configured limit.
        limit_bytes: u64,
        /// Bytes declared or received when the limit was crossed.
        actual_bytes: u64,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an unexpected content type error.
    pub fn unexpected_content_type(url: impl Into<String>, content_type: Option<String>) -> Self {
        Self::UnexpectedContentType {
            url: url.into(),
            content_type,
        }
    }

    /// Creates a size limit error.
    pub fn too_large(url: impl Into<String>, limit_bytes: u64, actual_bytes: u64) -> Self {
        Self::TooLarge {
            url: url.into(),
            limit_bytes,
            actual_bytes,
        }
    }

    /// Whether the failure came from verifying the downloaded content rather
    /// than from transport or disk.
    #[must_use]
    pub fn is_verification(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedContentType { .. } | Self::TooLarge { .. }
        )
    }
}

// No `From<reqwest::Error>` or `From<std::io::Error>`: every variant needs the
// URL or path, which the source errors do not carry.
