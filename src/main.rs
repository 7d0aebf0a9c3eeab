//! CLI entry point for zzz-datagen.

use std::io::{self, IsTerminal};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};
use zzz_datagen::{
    AssetPipeline, BatchOrchestrator, BatchProgress, CancelFlag, HoyolabFetcher, HttpClient,
    ItemProcessor, RecordFetcher, RecordPipeline, RunConfig, RunOutput, SourceEntry,
    parse_entries,
};

mod cli;

use cli::{Args, Command, RunArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let show_progress = !args.quiet;
    match args.command {
        Command::Data(data) => {
            let mut config = base_config(&data.run)?;
            data.run.apply(&mut config);
            let (entries, fetcher) = prepare(&data.run, &config)?;

            let pipeline = Arc::new(RecordPipeline::new(fetcher, &config));
            let output = run_batch(
                &entries,
                pipeline,
                &config,
                show_progress && !data.run.no_progress,
            )
            .await?;
            output
                .write_json(&data.output)
                .with_context(|| format!("writing dataset to {}", data.output.display()))?;
            info!(path = %data.output.display(), records = output.records.len(), "dataset written");
            Ok(exit_code(&output, data.run.min_success_rate))
        }
        Command::Assets(assets) => {
            let mut config = base_config(&assets.run)?;
            assets.apply(&mut config);
            let (entries, fetcher) = prepare(&assets.run, &config)?;

            let downloader = Arc::new(
                HttpClient::new_with_timeouts(config.connect_timeout_secs, config.read_timeout_secs)
                    .context("creating HTTP client")?,
            );
            let pipeline = Arc::new(AssetPipeline::new(
                fetcher,
                downloader,
                &assets.output_dir,
                &config,
            ));
            let output = run_batch(
                &entries,
                pipeline,
                &config,
                show_progress && !assets.run.no_progress,
            )
            .await?;
            let manifest = assets.output_dir.join("manifest.json");
            output
                .write_json(&manifest)
                .with_context(|| format!("writing manifest to {}", manifest.display()))?;
            info!(path = %manifest.display(), "asset manifest written");
            Ok(exit_code(&output, assets.run.min_success_rate))
        }
    }
}

/// Defaults, or the `--config` file when one is given.
fn base_config(run: &RunArgs) -> Result<RunConfig> {
    match &run.config {
        Some(path) => RunConfig::load(path).context("loading config file"),
        None => Ok(RunConfig::default()),
    }
}

/// Reads the entry list and builds the fetcher for a run.
fn prepare(run: &RunArgs, config: &RunConfig) -> Result<(Vec<SourceEntry>, Arc<dyn RecordFetcher>)> {
    config.validate().context("invalid configuration")?;
    let entries = read_entries(&run.entries)?;

    let client = HttpClient::new_with_timeouts(config.connect_timeout_secs, config.read_timeout_secs)
        .context("creating HTTP client")?;
    let fetcher = HoyolabFetcher::with_base_url(&client, &config.api_base_url)
        .context("configuring wiki API client")?;
    Ok((entries, Arc::new(fetcher)))
}

fn read_entries(path: &Path) -> Result<Vec<SourceEntry>> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("reading entry list {}", path.display()))?;
    let entries = parse_entries(&document)
        .with_context(|| format!("parsing entry list {}", path.display()))?;
    if entries.is_empty() {
        warn!(path = %path.display(), "entry list is empty");
    }
    info!(entries = entries.len(), "entry list loaded");
    Ok(entries)
}

async fn run_batch<P>(
    entries: &[SourceEntry],
    processor: Arc<P>,
    config: &RunConfig,
    show_progress: bool,
) -> Result<RunOutput<P::Output>>
where
    P: ItemProcessor,
    P::Output: Serialize,
{
    let cancel = CancelFlag::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing the current window");
            signal.cancel();
        }
    });

    let bar = progress_bar(entries.len(), show_progress);
    let orchestrator = BatchOrchestrator::new(config)?.with_cancel_flag(cancel);
    let report = orchestrator
        .run(entries, processor, |progress: &BatchProgress| {
            bar.set_position(u64::try_from(progress.processed).unwrap_or(u64::MAX));
            bar.set_message(format!(
                "window {}/{} | {} failed | eta {}s",
                progress.window,
                progress.total_windows,
                progress.failed,
                progress.eta.as_secs()
            ));
        })
        .await?;
    bar.finish_and_clear();

    let output = RunOutput::from_report(report);
    let summary = output.summary;
    info!(
        total = summary.total,
        succeeded = summary.succeeded,
        failed = summary.failed,
        total_bytes = summary.total_bytes,
        elapsed_ms = summary.elapsed_ms,
        cancelled = summary.cancelled,
        "run complete"
    );
    for failure in &output.failures {
        warn!(entry_id = %failure.id, kind = %failure.kind, attempts = failure.attempts, error = %failure.error, "entry failed");
    }
    Ok(output)
}

fn progress_bar(total: usize, show: bool) -> ProgressBar {
    if !show || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn exit_code<T>(output: &RunOutput<T>, min_success_rate: f64) -> ExitCode {
    let rate = output.summary.success_rate();
    if rate < min_success_rate {
        warn!(
            success_rate = rate,
            min_success_rate, "success rate below the required minimum"
        );
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
