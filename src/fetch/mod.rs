//! Remote record fetching.
//!
//! [`RecordFetcher`] is the seam between the pipeline and the content API;
//! [`HoyolabFetcher`] is the HTTP implementation against the wiki's
//! `entry_page` endpoint. Tests substitute their own fetchers.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::download::HttpClient;
use crate::model::{Language, RawPayload};

/// Public wiki API base for the game.
pub const DEFAULT_API_BASE: &str = "https://sg-wiki-api-static.hoyolab.com/hoyowiki/zzz/wapi";

/// Header selecting the response language.
const LANGUAGE_HEADER: &str = "x-rpc-language";

/// Header naming the wiki the request targets.
const WIKI_APP_HEADER: &str = "x-rpc-wiki_app";

/// A decoded payload plus the size of the response body.
#[derive(Debug, Clone)]
pub struct FetchedPayload {
    pub payload: RawPayload,
    pub bytes: u64,
}

/// Errors raised while fetching one entry in one language.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timeout fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid response body from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The API answered but reported an error in its envelope.
    #[error("API error {retcode} for entry {remote_id}: {message}")]
    Api {
        remote_id: u64,
        retcode: i64,
        message: String,
    },

    #[error("invalid API base URL: {url}")]
    InvalidBaseUrl { url: String },
}

impl FetchError {
    /// Creates a network error, promoting timeouts to [`FetchError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }
}

/// Fetches the raw payload of one entry in one language.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    /// # Errors
    ///
    /// Returns [`FetchError`] when the payload cannot be retrieved or decoded.
    async fn fetch(&self, remote_id: u64, language: Language) -> Result<FetchedPayload, FetchError>;
}

/// [`RecordFetcher`] backed by the HoYoLAB wiki API.
#[derive(Debug, Clone)]
pub struct HoyolabFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HoyolabFetcher {
    /// Fetcher against [`DEFAULT_API_BASE`].
    ///
    /// # Errors
    ///
    /// Never fails for the built-in base URL; the `Result` mirrors
    /// [`Self::with_base_url`].
    pub fn new(client: &HttpClient) -> Result<Self, FetchError> {
        Self::with_base_url(client, DEFAULT_API_BASE)
    }

    /// Fetcher against a custom API base (a mirror, or a mock server).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidBaseUrl`] when `base_url` does not parse.
    pub fn with_base_url(client: &HttpClient, base_url: &str) -> Result<Self, FetchError> {
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|_| FetchError::InvalidBaseUrl {
            url: base_url.to_string(),
        })?;
        Ok(Self {
            client: client.inner().clone(),
            base_url,
        })
    }

    fn entry_url(&self, remote_id: u64) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join("entry_page")
            .map_err(|_| FetchError::InvalidBaseUrl {
                url: self.base_url.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("entry_page_id", &remote_id.to_string());
        Ok(url)
    }
}

#[async_trait]
impl RecordFetcher for HoyolabFetcher {
    #[instrument(skip(self), fields(%language))]
    async fn fetch(&self, remote_id: u64, language: Language) -> Result<FetchedPayload, FetchError> {
        let url = self.entry_url(remote_id)?;
        let url_str = url.to_string();

        let response = self
            .client
            .get(url)
            .header(LANGUAGE_HEADER, language.code())
            .header(WIKI_APP_HEADER, "zzz")
            .send()
            .await
            .map_err(|e| FetchError::network(&url_str, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(&url_str, status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(&url_str, e))?;
        let payload = RawPayload::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url_str.clone(),
            source,
        })?;

        if payload.retcode != 0 {
            return Err(FetchError::Api {
                remote_id,
                retcode: payload.retcode,
                message: payload.message,
            });
        }

        debug!(bytes = body.len(), "fetched payload");
        Ok(FetchedPayload {
            payload,
            bytes: body.len() as u64,
        })
    }
}
