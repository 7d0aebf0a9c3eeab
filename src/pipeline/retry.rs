//! Retry decisions with capped exponential backoff.
//!
//! A failed attempt is classified by its [`ErrorKind`]; [`RetryPolicy`] then
//! decides whether another attempt follows and how long to wait first.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use zzz_datagen::pipeline::{ErrorKind, RetryDecision, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_millis(250));
//! match policy.should_retry(ErrorKind::Network, 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         assert_eq!(delay, Duration::from_millis(100));
//!         assert_eq!(attempt, 2);
//!     }
//!     RetryDecision::DoNotRetry { reason } => panic!("unexpected: {reason}"),
//! }
//! ```

use std::time::Duration;

use tracing::{debug, instrument};

use super::ErrorKind;
use crate::config::RunConfig;

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Number of the attempt that follows (1-indexed, so the first retry is 2).
        attempt: u32,
    },

    /// Give up.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Attempt budget and backoff schedule.
///
/// The delay after failed attempt `n` is `min(base_delay * 2^(n-1), max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    retry_extraction_errors: bool,
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is raised to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            retry_extraction_errors: true,
        }
    }

    /// Policy described by a run configuration.
    #[must_use]
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.max_attempts(),
            Duration::from_millis(config.base_retry_delay_ms),
            Duration::from_millis(config.max_retry_delay_ms),
        )
        .with_extraction_retry(config.retry_extraction_errors)
    }

    /// Sets whether extraction errors are retried.
    #[must_use]
    pub fn with_extraction_retry(mut self, enabled: bool) -> Self {
        self.retry_extraction_errors = enabled;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what follows failed attempt `attempt` (1-indexed).
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, kind: ErrorKind, attempt: u32) -> RetryDecision {
        let retryable = match kind {
            ErrorKind::Network | ErrorKind::FileSystem => true,
            ErrorKind::Extraction => self.retry_extraction_errors,
            ErrorKind::Validation | ErrorKind::Security | ErrorKind::Aborted => false,
        };
        if !retryable {
            return RetryDecision::DoNotRetry {
                reason: format!("{kind} failures are not retried"),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.delay_after(attempt);
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "will retry"
        );
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Backoff after failed attempt `attempt`: `min(base * 2^(attempt-1), max)`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2_u32.checked_pow(exponent).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(4, Duration::from_millis(100), Duration::from_millis(350))
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let policy = policy();
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(350));
        assert_eq!(policy.delay_after(40), Duration::from_millis(350));
    }

    #[test]
    fn test_network_retries_until_exhausted() {
        let policy = policy();
        assert_eq!(
            policy.should_retry(ErrorKind::Network, 1),
            RetryDecision::Retry {
                delay: Duration::from_millis(100),
                attempt: 2
            }
        );
        assert!(matches!(
            policy.should_retry(ErrorKind::FileSystem, 3),
            RetryDecision::Retry { attempt: 4, .. }
        ));
        match policy.should_retry(ErrorKind::Network, 4) {
            RetryDecision::DoNotRetry { reason } => assert!(reason.contains("exhausted")),
            RetryDecision::Retry { .. } => panic!("attempt budget must be respected"),
        }
    }

    #[test]
    fn test_security_and_validation_never_retry() {
        let policy = policy();
        for kind in [ErrorKind::Security, ErrorKind::Validation, ErrorKind::Aborted] {
            assert!(matches!(
                policy.should_retry(kind, 1),
                RetryDecision::DoNotRetry { .. }
            ));
        }
    }

    #[test]
    fn test_extraction_retry_is_configurable() {
        let policy = policy();
        assert!(matches!(
            policy.should_retry(ErrorKind::Extraction, 1),
            RetryDecision::Retry { .. }
        ));
        let policy = policy.with_extraction_retry(false);
        assert!(matches!(
            policy.should_retry(ErrorKind::Extraction, 1),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_zero_attempts_is_raised_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
        assert!(matches!(
            policy.should_retry(ErrorKind::Network, 1),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_from_config_counts_first_attempt() {
        let config = RunConfig {
            retry_attempts: 2,
            ..RunConfig::default()
        };
        assert_eq!(RetryPolicy::from_config(&config).max_attempts(), 3);
    }
}
