//! Dataset variant: fetch, extract, merge, and validate one entry.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::{ItemFailure, ItemOutcome, ItemProcessor, RetryPolicy, run_with_retry};
use crate::config::RunConfig;
use crate::extract::{ExtractOptions, extract, merge};
use crate::fetch::RecordFetcher;
use crate::model::{DomainRecord, Language, SourceEntry};
use crate::validate::finalize;

/// Builds one validated [`DomainRecord`] per entry.
///
/// The primary language is required. A secondary language that cannot be
/// fetched or extracted is treated as unavailable and filled from the primary
/// language during the merge.
pub struct RecordPipeline {
    fetcher: Arc<dyn RecordFetcher>,
    retry: RetryPolicy,
    options: ExtractOptions,
}

impl RecordPipeline {
    #[must_use]
    pub fn new(fetcher: Arc<dyn RecordFetcher>, config: &RunConfig) -> Self {
        Self {
            fetcher,
            retry: RetryPolicy::from_config(config),
            options: config.extract_options(),
        }
    }

    async fn attempt(&self, entry: &SourceEntry) -> Result<(DomainRecord, u64), ItemFailure> {
        let primary = self
            .fetcher
            .fetch(entry.remote_id, Language::PRIMARY)
            .await?;
        let mut bytes = primary.bytes;
        let primary_record = extract(&primary.payload, entry, Language::PRIMARY, &self.options)?;

        let mut secondaries = Vec::new();
        for language in Language::secondaries() {
            let fetched = match self.fetcher.fetch(entry.remote_id, language).await {
                Ok(fetched) => fetched,
                Err(error) => {
                    warn!(entry_id = %entry.id, %language, error = %error, "secondary fetch failed");
                    continue;
                }
            };
            bytes += fetched.bytes;
            match extract(&fetched.payload, entry, language, &self.options) {
                Ok(record) => secondaries.push(record),
                Err(error) => {
                    warn!(entry_id = %entry.id, %language, error = %error, "secondary extraction failed");
                }
            }
        }

        let merged = merge(entry, primary_record, secondaries);
        if !merged.fallback_languages.is_empty() {
            debug!(entry_id = %entry.id, fallback = ?merged.fallback_languages, "merged with fallback");
        }
        let record = finalize(merged)?;
        Ok((record, bytes))
    }
}

#[async_trait]
impl ItemProcessor for RecordPipeline {
    type Output = DomainRecord;

    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    async fn process(&self, entry: &SourceEntry) -> ItemOutcome<DomainRecord> {
        run_with_retry(&entry.id, &self.retry, move |_| self.attempt(entry)).await
    }
}
