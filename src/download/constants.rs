//! Constants for the download module (timeouts, size limits).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (2 minutes; assets are small images).
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Default cap on a downloaded asset (10 MiB).
pub const DEFAULT_MAX_ASSET_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Extension used when the asset URL carries none.
pub const DEFAULT_ASSET_EXTENSION: &str = ".png";
