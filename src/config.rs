//! Run configuration.
//!
//! A [`RunConfig`] is built once per run (defaults, then an optional JSON
//! file, then command-line overrides) and passed by reference from there on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_MAX_ASSET_SIZE_BYTES, READ_TIMEOUT_SECS,
};
use crate::download::{DEFAULT_ALLOWED_HOSTS, DownloadLimits, SecurityPolicy};
use crate::extract::{DEFAULT_MAX_DESCRIPTION_CHARS, ExtractOptions};
use crate::fetch::DEFAULT_API_BASE;

/// Largest accepted concurrency limit.
pub const MAX_CONCURRENCY: usize = 100;

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config value for `{field}`: {value}. Expected {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

/// Every tunable of a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Items processed concurrently per window (1..=100).
    pub concurrency_limit: usize,
    /// Retries after the first attempt.
    pub retry_attempts: u32,
    pub base_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    /// Pause between windows.
    pub inter_batch_delay_ms: u64,
    /// Start offset between items of one window.
    pub stagger_ms: u64,
    pub max_asset_size_bytes: u64,
    /// Keep assets already on disk instead of downloading again.
    pub skip_existing: bool,
    /// Verify content type and size of downloaded assets.
    pub validate_downloads: bool,
    pub max_description_chars: usize,
    /// Retry items whose payload failed extraction.
    pub retry_extraction_errors: bool,
    pub api_base_url: String,
    pub allowed_hosts: Vec<String>,
    /// Accept plain-http asset URLs. Only for local mirrors.
    pub allow_insecure_assets: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            retry_attempts: 3,
            base_retry_delay_ms: 1_000,
            max_retry_delay_ms: 10_000,
            inter_batch_delay_ms: 1_000,
            stagger_ms: 100,
            max_asset_size_bytes: DEFAULT_MAX_ASSET_SIZE_BYTES,
            skip_existing: true,
            validate_downloads: true,
            max_description_chars: DEFAULT_MAX_DESCRIPTION_CHARS,
            retry_extraction_errors: true,
            api_base_url: DEFAULT_API_BASE.to_string(),
            allowed_hosts: DEFAULT_ALLOWED_HOSTS
                .iter()
                .map(ToString::to_string)
                .collect(),
            allow_insecure_assets: false,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

impl RunConfig {
    /// Reads a JSON config file. Absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed, or when
    /// a value is out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value as [`ConfigError::OutOfRange`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency_limit) {
            return Err(ConfigError::out_of_range(
                "concurrency_limit",
                self.concurrency_limit,
                "range: 1..=100",
            ));
        }
        if self.max_retry_delay_ms < self.base_retry_delay_ms {
            return Err(ConfigError::out_of_range(
                "max_retry_delay_ms",
                self.max_retry_delay_ms,
                "a value >= base_retry_delay_ms",
            ));
        }
        if self.max_asset_size_bytes == 0 {
            return Err(ConfigError::out_of_range(
                "max_asset_size_bytes",
                0,
                "a positive byte count",
            ));
        }
        if self.max_description_chars == 0 {
            return Err(ConfigError::out_of_range(
                "max_description_chars",
                0,
                "a positive character count",
            ));
        }
        if self.allowed_hosts.is_empty() {
            return Err(ConfigError::out_of_range(
                "allowed_hosts",
                "[]",
                "at least one host",
            ));
        }
        for (field, secs) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("read_timeout_secs", self.read_timeout_secs),
        ] {
            if !(1..=3_600).contains(&secs) {
                return Err(ConfigError::out_of_range(field, secs, "range: 1..=3600"));
            }
        }
        Ok(())
    }

    /// Total attempts per item, first attempt included.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }

    #[must_use]
    pub fn inter_batch_delay(&self) -> Duration {
        Duration::from_millis(self.inter_batch_delay_ms)
    }

    #[must_use]
    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    #[must_use]
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            max_description_chars: self.max_description_chars,
        }
    }

    #[must_use]
    pub fn download_limits(&self) -> DownloadLimits {
        DownloadLimits {
            max_bytes: self.max_asset_size_bytes,
            verify: self.validate_downloads,
        }
    }

    #[must_use]
    pub fn security_policy(&self) -> SecurityPolicy {
        let policy = SecurityPolicy::new(self.allowed_hosts.iter().cloned());
        if self.allow_insecure_assets {
            policy.allow_insecure()
        } else {
            policy
        }
    }
}
