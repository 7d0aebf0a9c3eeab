//! Per-item processing with bounded retry.
//!
//! An [`ItemProcessor`] turns one [`SourceEntry`] into exactly one
//! [`ItemOutcome`]. Errors never escape a processor: every failure is
//! classified into an [`ErrorKind`] and reported inside the outcome.
//!
//! Two processors exist: [`RecordPipeline`] builds validated dataset records
//! and [`AssetPipeline`] downloads entry icons.

mod asset;
mod record;
mod retry;

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

pub use asset::{AssetPipeline, AssetResult};
pub use record::RecordPipeline;
pub use retry::{RetryDecision, RetryPolicy};

use crate::download::{DownloadError, SecurityError};
use crate::extract::ExtractionError;
use crate::fetch::FetchError;
use crate::model::SourceEntry;
use crate::validate::ValidationResult;

/// Classification of an item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Transport failure or non-success response.
    Network,
    /// The payload lacks required structure.
    Extraction,
    /// The record breaks a structural rule, or a downloaded asset failed
    /// verification.
    Validation,
    /// A URL or destination was rejected.
    Security,
    /// Local disk failure.
    FileSystem,
    /// The item's task panicked.
    Aborted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Network => "network",
            Self::Extraction => "extraction",
            Self::Validation => "validation",
            Self::Security => "security",
            Self::FileSystem => "filesystem",
            Self::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// The last error of a failed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl ItemFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

impl From<FetchError> for ItemFailure {
    fn from(error: FetchError) -> Self {
        let kind = match error {
            FetchError::Decode { .. } | FetchError::Api { .. } => ErrorKind::Extraction,
            _ => ErrorKind::Network,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<ExtractionError> for ItemFailure {
    fn from(error: ExtractionError) -> Self {
        Self::new(ErrorKind::Extraction, error.to_string())
    }
}

impl From<ValidationResult> for ItemFailure {
    fn from(result: ValidationResult) -> Self {
        Self::new(ErrorKind::Validation, result.summary())
    }
}

impl From<SecurityError> for ItemFailure {
    fn from(error: SecurityError) -> Self {
        let kind = match error {
            SecurityError::Unresolvable { .. } => ErrorKind::FileSystem,
            _ => ErrorKind::Security,
        };
        Self::new(kind, error.to_string())
    }
}

impl From<DownloadError> for ItemFailure {
    fn from(error: DownloadError) -> Self {
        let kind = match error {
            DownloadError::Io { .. } => ErrorKind::FileSystem,
            DownloadError::InvalidUrl { .. } => ErrorKind::Extraction,
            DownloadError::UnexpectedContentType { .. } | DownloadError::TooLarge { .. } => {
                ErrorKind::Validation
            }
            DownloadError::Client { .. }
            | DownloadError::Network { .. }
            | DownloadError::Timeout { .. }
            | DownloadError::HttpStatus { .. } => ErrorKind::Network,
        };
        Self::new(kind, error.to_string())
    }
}

/// Result of processing one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome<T> {
    pub entry_id: String,
    pub result: Result<T, ItemFailure>,
    /// Attempts made, first attempt included.
    pub attempts_used: u32,
    /// Bytes transferred by the successful attempt.
    pub bytes: u64,
}

impl<T> ItemOutcome<T> {
    /// Outcome for an item whose task was lost before it could report.
    pub fn aborted(entry_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            result: Err(ItemFailure::new(ErrorKind::Aborted, message)),
            attempts_used: 0,
            bytes: 0,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Turns one entry into one outcome. Implementations never panic on bad
/// input and never return early without an outcome.
#[async_trait]
pub trait ItemProcessor: Send + Sync + 'static {
    type Output: Send + 'static;

    async fn process(&self, entry: &SourceEntry) -> ItemOutcome<Self::Output>;
}

/// Runs `attempt` until it succeeds or `policy` gives up.
///
/// `attempt` receives the 1-indexed attempt number and yields the value plus
/// the bytes it transferred.
pub async fn run_with_retry<T, F, Fut>(
    entry_id: &str,
    policy: &RetryPolicy,
    mut attempt: F,
) -> ItemOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<(T, u64), ItemFailure>>,
{
    let mut number = 1;
    loop {
        match attempt(number).await {
            Ok((value, bytes)) => {
                return ItemOutcome {
                    entry_id: entry_id.to_string(),
                    result: Ok(value),
                    attempts_used: number,
                    bytes,
                };
            }
            Err(failure) => match policy.should_retry(failure.kind, number) {
                RetryDecision::Retry {
                    delay,
                    attempt: next,
                } => {
                    warn!(
                        entry_id,
                        attempt = number,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %failure,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    number = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(entry_id, attempts = number, error = %failure, %reason, "item failed");
                    return ItemOutcome {
                        entry_id: entry_id.to_string(),
                        result: Err(failure),
                        attempts_used: number,
                        bytes: 0,
                    };
                }
            },
        }
    }
}
