//! Run output: the surviving records, the failures, and summary counters.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::batch::BatchReport;
use crate::pipeline::ErrorKind;

/// Output file could not be written.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot serialize run output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One failed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureEntry {
    pub id: String,
    pub kind: ErrorKind,
    pub error: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_bytes: u64,
    pub elapsed_ms: u64,
    pub cancelled: bool,
}

impl RunSummary {
    /// Share of succeeded items in `0.0..=1.0`; an empty run counts as 1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }
}

/// Everything a run produces, ready to serialize.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput<T> {
    pub records: Vec<T>,
    pub failures: Vec<FailureEntry>,
    pub summary: RunSummary,
}

impl<T: Serialize> RunOutput<T> {
    /// Collects a batch report. Outcomes are deduplicated by entry id, the
    /// first outcome for an id wins.
    #[must_use]
    pub fn from_report(report: BatchReport<T>) -> Self {
        let elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX);
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut failures = Vec::new();
        let mut total_bytes = 0;

        for outcome in report.outcomes {
            if !seen.insert(outcome.entry_id.clone()) {
                continue;
            }
            total_bytes += outcome.bytes;
            match outcome.result {
                Ok(record) => records.push(record),
                Err(failure) => failures.push(FailureEntry {
                    id: outcome.entry_id,
                    kind: failure.kind,
                    error: failure.message,
                    attempts: outcome.attempts_used,
                }),
            }
        }

        let summary = RunSummary {
            total: records.len() + failures.len(),
            succeeded: records.len(),
            failed: failures.len(),
            total_bytes,
            elapsed_ms,
            cancelled: report.cancelled,
        };
        Self {
            records,
            failures,
            summary,
        }
    }

    /// Writes the output as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when serialization or the write fails.
    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| ReportError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}
