//! zzz-datagen core library
//!
//! Batch-ingests game wiki entries into a validated, bilingual dataset and a
//! matching icon set.
//!
//! # Architecture
//!
//! - [`enumerate`] - Entry list parsing (JSON or markdown link lists)
//! - [`fetch`] - Remote entry payloads per language
//! - [`extract`] - Double-encoded payload navigation, level tables, tags, merge
//! - [`validate`] - Structural rules for merged records
//! - [`download`] - Streaming asset downloads and URL/path security checks
//! - [`pipeline`] - Per-item processing with bounded retry
//! - [`batch`] - Windowed concurrent execution with fault isolation
//! - [`report`] - Run output and summary counters

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod config;
pub mod download;
pub mod enumerate;
pub mod extract;
pub mod fetch;
pub mod model;
pub mod pipeline;
pub mod report;
mod user_agent;
pub mod validate;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use batch::{BatchOrchestrator, BatchProgress, BatchReport, CancelFlag, SetupError};
pub use config::{ConfigError, RunConfig};
pub use download::{AssetDownloader, HttpClient, SecurityPolicy};
pub use enumerate::{EnumerationError, parse_entries};
pub use fetch::{HoyolabFetcher, RecordFetcher};
pub use model::{DomainRecord, EntityKind, Language, SourceEntry};
pub use pipeline::{
    AssetPipeline, AssetResult, ErrorKind, ItemFailure, ItemOutcome, ItemProcessor,
    RecordPipeline,
};
pub use report::{RunOutput, RunSummary};
