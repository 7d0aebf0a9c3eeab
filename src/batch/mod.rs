//! Windowed batch execution over a fixed entry set.
//!
//! Entries are split into windows of `concurrency_limit`. Every item of a
//! window runs as its own tokio task, and the window settles fully before the
//! next one starts. Item failures live inside their [`ItemOutcome`]; only
//! setup problems are returned as errors.
//!
//! If a task faults (panics), the window's unsettled entries are processed
//! again one by one on the orchestrator task. A panic there is caught and
//! recorded as an [`ErrorKind::Aborted`](crate::pipeline::ErrorKind::Aborted)
//! outcome, so every entry ends with exactly one outcome.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigError, RunConfig};
use crate::download::sanitize_asset_name;
use crate::model::SourceEntry;
use crate::pipeline::{ItemOutcome, ItemProcessor};

/// Problems detected before any item starts.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("duplicate entry id: {id}")]
    DuplicateEntry { id: String },

    #[error("entry ids {first} and {second} both map to the asset name {name}")]
    AssetNameCollision {
        first: String,
        second: String,
        name: String,
    },
}

/// Shared stop signal. Once set, the in-flight window finishes and no new
/// window starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Snapshot handed to the progress callback after each window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Window just settled (1-indexed).
    pub window: usize,
    pub total_windows: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    /// Average time per window so far, times the windows left.
    pub eta: Duration,
}

/// Every outcome of a run, in entry order.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub outcomes: Vec<ItemOutcome<T>>,
    /// The run stopped early; `outcomes` covers the windows that ran.
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl<T> BatchReport<T> {
    #[must_use]
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes).sum()
    }
}

/// Runs an [`ItemProcessor`] over entries window by window.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    concurrency: usize,
    inter_batch_delay: Duration,
    stagger: Duration,
    cancel: CancelFlag,
}

impl BatchOrchestrator {
    /// Builds an orchestrator from a run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Config`] when the configuration is invalid.
    pub fn new(config: &RunConfig) -> Result<Self, SetupError> {
        config.validate()?;
        Ok(Self {
            concurrency: config.concurrency_limit,
            inter_batch_delay: config.inter_batch_delay(),
            stagger: config.stagger(),
            cancel: CancelFlag::new(),
        })
    }

    /// Uses `flag` as this orchestrator's stop signal.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    #[must_use]
    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Processes every entry and returns one outcome per processed entry.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DuplicateEntry`] when two entries share an id,
    /// and [`SetupError::AssetNameCollision`] when two ids sanitize to the same
    /// asset file name. Item failures are never returned as errors.
    #[instrument(skip_all, fields(total = entries.len(), concurrency = self.concurrency))]
    pub async fn run<P, F>(
        &self,
        entries: &[SourceEntry],
        processor: Arc<P>,
        mut on_progress: F,
    ) -> Result<BatchReport<P::Output>, SetupError>
    where
        P: ItemProcessor,
        F: FnMut(&BatchProgress),
    {
        check_unique(entries)?;

        let started = Instant::now();
        let total = entries.len();
        let total_windows = total.div_ceil(self.concurrency);
        let mut outcomes = Vec::with_capacity(total);
        let mut succeeded = 0;
        let mut cancelled = false;

        info!(total, total_windows, "starting batch");

        for (index, window) in entries.chunks(self.concurrency).enumerate() {
            if self.cancel.is_cancelled() {
                info!(window = index + 1, "cancelled, not starting further windows");
                cancelled = true;
                break;
            }

            let window_number = index + 1;
            debug!(window = window_number, size = window.len(), "starting window");
            let settled = self.run_window(window, &processor).await;
            succeeded += settled.iter().filter(|o| o.is_success()).count();
            outcomes.extend(settled);

            let progress = BatchProgress {
                window: window_number,
                total_windows,
                processed: outcomes.len(),
                succeeded,
                failed: outcomes.len() - succeeded,
                total,
                eta: eta(started.elapsed(), window_number, total_windows),
            };
            info!(
                window = window_number,
                total_windows,
                processed = progress.processed,
                succeeded,
                failed = progress.failed,
                "window settled"
            );
            on_progress(&progress);

            if window_number < total_windows {
                if self.cancel.is_cancelled() {
                    info!(window = window_number + 1, "cancelled, not starting further windows");
                    cancelled = true;
                    break;
                }
                if !self.inter_batch_delay.is_zero() {
                    tokio::time::sleep(self.inter_batch_delay).await;
                }
            }
        }

        let report = BatchReport {
            outcomes,
            cancelled,
            elapsed: started.elapsed(),
        };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            cancelled,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "batch complete"
        );
        Ok(report)
    }

    async fn run_window<P: ItemProcessor>(
        &self,
        window: &[SourceEntry],
        processor: &Arc<P>,
    ) -> Vec<ItemOutcome<P::Output>> {
        let mut tasks = JoinSet::new();
        for (slot, entry) in window.iter().enumerate() {
            let processor = Arc::clone(processor);
            let entry = entry.clone();
            let delay = self
                .stagger
                .saturating_mul(u32::try_from(slot).unwrap_or(u32::MAX));
            tasks.spawn(async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                (slot, processor.process(&entry).await)
            });
        }

        let mut settled: Vec<Option<ItemOutcome<P::Output>>> =
            window.iter().map(|_| None).collect();
        let mut faulted = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => {
                    if let Some(place) = settled.get_mut(slot) {
                        *place = Some(outcome);
                    }
                }
                Err(error) => {
                    warn!(error = %error, "item task faulted");
                    faulted = true;
                }
            }
        }

        if faulted {
            warn!("re-processing unsettled entries of the window sequentially");
            for (place, entry) in settled.iter_mut().zip(window) {
                if place.is_none() {
                    *place = Some(process_guarded(processor.as_ref(), entry).await);
                }
            }
        }

        settled
            .into_iter()
            .zip(window)
            .map(|(outcome, entry)| {
                outcome.unwrap_or_else(|| ItemOutcome::aborted(&entry.id, "item task was lost"))
            })
            .collect()
    }
}

/// Runs one entry on the current task, turning a panic into an outcome.
async fn process_guarded<P: ItemProcessor>(processor: &P, entry: &SourceEntry) -> ItemOutcome<P::Output> {
    match AssertUnwindSafe(processor.process(entry)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(entry_id = %entry.id, "item panicked during sequential processing");
            ItemOutcome::aborted(&entry.id, "item processing panicked")
        }
    }
}

/// Entry ids double as asset file names, so they must stay distinct after
/// sanitizing too.
fn check_unique(entries: &[SourceEntry]) -> Result<(), SetupError> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut names: HashMap<String, &str> = HashMap::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.id.as_str()) {
            return Err(SetupError::DuplicateEntry {
                id: entry.id.clone(),
            });
        }
        let name = sanitize_asset_name(&entry.id);
        if let Some(first) = names.get(&name) {
            return Err(SetupError::AssetNameCollision {
                first: (*first).to_string(),
                second: entry.id.clone(),
                name,
            });
        }
        names.insert(name, &entry.id);
    }
    Ok(())
}

fn eta(elapsed: Duration, windows_done: usize, total_windows: usize) -> Duration {
    let done = u32::try_from(windows_done).unwrap_or(u32::MAX).max(1);
    let remaining = u32::try_from(total_windows.saturating_sub(windows_done)).unwrap_or(u32::MAX);
    (elapsed / done).saturating_mul(remaining)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::pipeline::{ErrorKind, ItemFailure};

    /// Succeeds for every entry except those listed as failing or panicking.
    #[derive(Default)]
    struct ScriptedProcessor {
        failing: Vec<&'static str>,
        panicking: Vec<&'static str>,
        /// Simulated processing time per item.
        work: Duration,
        started: Mutex<Vec<(String, tokio::time::Instant)>>,
    }

    impl ScriptedProcessor {
        /// Start offset of each item relative to `origin`, in start order.
        fn start_offsets(&self, origin: tokio::time::Instant) -> Vec<(String, Duration)> {
            self.started
                .lock()
                .unwrap()
                .iter()
                .map(|(id, at)| (id.clone(), at.duration_since(origin)))
                .collect()
        }
    }

    #[async_trait]
    impl ItemProcessor for ScriptedProcessor {
        type Output = String;

        async fn process(&self, entry: &SourceEntry) -> ItemOutcome<String> {
            self.started
                .lock()
                .unwrap()
                .push((entry.id.clone(), tokio::time::Instant::now()));
            assert!(
                !self.panicking.contains(&entry.id.as_str()),
                "scripted panic for {}",
                entry.id
            );
            if !self.work.is_zero() {
                tokio::time::sleep(self.work).await;
            }
            let result = if self.failing.contains(&entry.id.as_str()) {
                Err(ItemFailure::new(ErrorKind::Network, "scripted failure"))
            } else {
                Ok(entry.id.to_uppercase())
            };
            ItemOutcome {
                entry_id: entry.id.clone(),
                result,
                attempts_used: 1,
                bytes: 10,
            }
        }
    }

    fn entries(ids: &[&str]) -> Vec<SourceEntry> {
        ids.iter()
            .zip(1_u64..)
            .map(|(id, remote_id)| SourceEntry::new(*id, remote_id))
            .collect()
    }

    fn orchestrator(concurrency_limit: usize) -> BatchOrchestrator {
        paced_orchestrator(concurrency_limit, 0, 0)
    }

    fn paced_orchestrator(
        concurrency_limit: usize,
        inter_batch_delay_ms: u64,
        stagger_ms: u64,
    ) -> BatchOrchestrator {
        BatchOrchestrator::new(&RunConfig {
            concurrency_limit,
            inter_batch_delay_ms,
            stagger_ms,
            ..RunConfig::default()
        })
        .unwrap()
    }

    #[track_caller]
    fn assert_near(actual: Duration, expected_ms: u64) {
        let expected = Duration::from_millis(expected_ms);
        let diff = actual.abs_diff(expected);
        assert!(
            diff <= Duration::from_millis(5),
            "expected about {expected:?}, got {actual:?}"
        );
    }

    #[tokio::test]
    async fn test_outcomes_follow_entry_order_and_count() {
        let processor = Arc::new(ScriptedProcessor {
            failing: vec!["b"],
            ..ScriptedProcessor::default()
        });
        let mut progress = Vec::new();
        let report = orchestrator(2)
            .run(&entries(&["a", "b", "c"]), processor, |p| progress.push(p.clone()))
            .await
            .unwrap();

        let ids: Vec<_> = report.outcomes.iter().map(|o| o.entry_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(report.succeeded() + report.failed(), report.total());
        assert_eq!((report.succeeded(), report.failed()), (2, 1));
        assert_eq!(report.total_bytes(), 30);
        assert!(!report.cancelled);

        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0].processed, 2);
        assert_eq!(progress[1].window, 2);
        assert_eq!(progress[1].total_windows, 2);
        assert_eq!(progress[1].eta, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_panicking_item_becomes_aborted_outcome() {
        let processor = Arc::new(ScriptedProcessor {
            panicking: vec!["boom"],
            ..ScriptedProcessor::default()
        });
        let report = orchestrator(3)
            .run(&entries(&["a", "boom", "c"]), processor, |_| {})
            .await
            .unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(report.outcomes[0].result, Ok("A".to_string()));
        assert_eq!(report.outcomes[2].result, Ok("C".to_string()));
        let failure = report.outcomes[1].result.as_ref().unwrap_err();
        assert_eq!(failure.kind, ErrorKind::Aborted);
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected_before_processing() {
        let processor = Arc::new(ScriptedProcessor::default());
        let result = orchestrator(2)
            .run(&entries(&["a", "a"]), Arc::clone(&processor), |_| {})
            .await;

        assert!(matches!(result, Err(SetupError::DuplicateEntry { id }) if id == "a"));
        assert!(processor.started.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_config_is_setup_error() {
        let config = RunConfig {
            concurrency_limit: 0,
            ..RunConfig::default()
        };
        assert!(matches!(
            BatchOrchestrator::new(&config),
            Err(SetupError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_stops_after_current_window() {
        let processor = Arc::new(ScriptedProcessor::default());
        let orchestrator = orchestrator(1);
        let flag = orchestrator.cancel_flag().clone();
        let report = orchestrator
            .run(&entries(&["a", "b", "c"]), processor, |_| flag.cancel())
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.total(), 1);
        assert_eq!(report.outcomes[0].entry_id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_start_staggered_within_a_window() {
        let processor = Arc::new(ScriptedProcessor {
            work: Duration::from_millis(50),
            ..ScriptedProcessor::default()
        });
        let origin = tokio::time::Instant::now();
        paced_orchestrator(3, 0, 100)
            .run(&entries(&["a", "b", "c"]), Arc::clone(&processor), |_| {})
            .await
            .unwrap();

        let starts = processor.start_offsets(origin);
        let ids: Vec<_> = starts.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        for ((_, offset), expected_ms) in starts.iter().zip([0, 100, 200]) {
            assert_near(*offset, expected_ms);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_window_waits_for_settle_and_delay() {
        let processor = Arc::new(ScriptedProcessor {
            work: Duration::from_millis(50),
            ..ScriptedProcessor::default()
        });
        let origin = tokio::time::Instant::now();
        let mut settled_at = Vec::new();
        paced_orchestrator(3, 1000, 100)
            .run(
                &entries(&["a", "b", "c", "d", "e"]),
                Arc::clone(&processor),
                |_| settled_at.push(origin.elapsed()),
            )
            .await
            .unwrap();
        let total = origin.elapsed();

        // Window 1 starts at 0, 100 and 200 ms; its slowest item ends at 250 ms.
        assert_eq!(settled_at.len(), 2);
        assert_near(settled_at[0], 250);

        let starts = processor.start_offsets(origin);
        let (first_window, second_window) = starts.split_at(3);
        assert!(first_window.iter().all(|(_, at)| *at < settled_at[0]));
        assert!(
            second_window
                .iter()
                .all(|(_, at)| *at >= settled_at[0] + Duration::from_millis(1000))
        );
        assert_near(second_window[0].1, 1250);
        assert_near(second_window[1].1, 1350);

        // No pause after the last window.
        assert_near(settled_at[1], 1400);
        assert_near(total, 1400);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_skips_pending_inter_batch_delay() {
        let processor = Arc::new(ScriptedProcessor {
            work: Duration::from_millis(50),
            ..ScriptedProcessor::default()
        });
        let orchestrator = paced_orchestrator(1, 60_000, 0);
        let flag = orchestrator.cancel_flag().clone();
        let origin = tokio::time::Instant::now();
        let report = orchestrator
            .run(&entries(&["a", "b"]), processor, |_| flag.cancel())
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.total(), 1);
        assert_near(origin.elapsed(), 50);
    }

    #[tokio::test]
    async fn test_colliding_asset_names_are_rejected_before_processing() {
        let processor = Arc::new(ScriptedProcessor::default());
        let result = orchestrator(2)
            .run(&entries(&["a b", "c", "a_b"]), Arc::clone(&processor), |_| {})
            .await;

        match result {
            Err(SetupError::AssetNameCollision { first, second, name }) => {
                assert_eq!((first.as_str(), second.as_str()), ("a b", "a_b"));
                assert_eq!(name, "a_b");
            }
            other => panic!("expected asset name collision, got {other:?}"),
        }
        assert!(processor.started.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_entry_set() {
        let processor = Arc::new(ScriptedProcessor::default());
        let mut calls = 0;
        let report = orchestrator(4)
            .run(&[], processor, |_| calls += 1)
            .await
            .unwrap();
        assert_eq!(report.total(), 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_eta_scales_average_window_time() {
        let eta = eta(Duration::from_secs(4), 2, 5);
        assert_eq!(eta, Duration::from_secs(6));
    }
}
