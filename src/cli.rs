//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use zzz_datagen::RunConfig;

/// Build the ZZZ character dataset and icon set from the HoYoLAB wiki.
///
/// Entries come from a JSON array or a markdown link list. Every entry is
/// fetched in each supported language, validated, and written out; failures
/// are listed in the output instead of aborting the run.
#[derive(Parser, Debug)]
#[command(name = "zzz-datagen")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the validated dataset as a JSON file
    Data(DataArgs),
    /// Download entry icons into a directory
    Assets(AssetArgs),
}

#[derive(clap::Args, Debug)]
pub struct DataArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Dataset output file
    #[arg(short, long)]
    pub output: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct AssetArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Directory icons are saved into
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Download icons even when the file already exists
    #[arg(long)]
    pub force: bool,

    /// Skip content-type and size checks on downloaded icons
    #[arg(long)]
    pub no_verify: bool,

    /// Largest accepted icon in bytes
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_asset_size: Option<u64>,
}

/// Flags shared by every subcommand.
#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Entry list (JSON array or markdown links)
    #[arg(short, long)]
    pub entries: PathBuf,

    /// JSON config file; flags given here override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Items processed concurrently per window (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,

    /// Retries after the first attempt (0-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: Option<u8>,

    /// Pause between windows in milliseconds (max 60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub batch_delay: Option<u64>,

    /// Start offset between items of one window in milliseconds (max 10000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=10000))]
    pub stagger: Option<u64>,

    /// Wiki API base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Exit with an error when fewer than this share of entries succeed (0.0-1.0)
    #[arg(long, default_value_t = 0.0, value_parser = parse_rate)]
    pub min_success_rate: f64,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl RunArgs {
    /// Applies the flags given on the command line on top of `config`.
    pub fn apply(&self, config: &mut RunConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency_limit = usize::from(concurrency);
        }
        if let Some(retries) = self.max_retries {
            config.retry_attempts = u32::from(retries);
        }
        if let Some(delay) = self.batch_delay {
            config.inter_batch_delay_ms = delay;
        }
        if let Some(stagger) = self.stagger {
            config.stagger_ms = stagger;
        }
        if let Some(api_base) = &self.api_base {
            config.api_base_url.clone_from(api_base);
        }
    }
}

impl AssetArgs {
    pub fn apply(&self, config: &mut RunConfig) {
        self.run.apply(config);
        if self.force {
            config.skip_existing = false;
        }
        if self.no_verify {
            config.validate_downloads = false;
        }
        if let Some(max) = self.max_asset_size {
            config.max_asset_size_bytes = max;
        }
    }
}

fn parse_rate(raw: &str) -> Result<f64, String> {
    let rate: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{rate} is outside 0.0..=1.0"))
    }
}
