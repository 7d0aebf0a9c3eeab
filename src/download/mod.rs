//! Asset download: HTTP streaming, filename derivation, and the security
//! checks every destination passes before anything is written.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use zzz_datagen::download::{AssetDownloader, DownloadLimits, HttpClient, SecurityPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let root = Path::new("./assets");
//! let url = "https://act-webstatic.hoyoverse.com/icons/anby.png";
//! let dest = SecurityPolicy::default().validate_all(url, Path::new("anby.png"), root)?;
//! let asset = client.download(url, &dest, &DownloadLimits::default()).await?;
//! println!("Downloaded {} bytes", asset.bytes);
//! # Ok(())
//! # }
//! ```

mod client;
pub mod constants;
mod error;
pub mod filename;
pub mod security;

pub use client::{AssetDownloader, DownloadLimits, DownloadedAsset, HttpClient};
pub use error::DownloadError;
pub use filename::{asset_file_name, sanitize_asset_name};
pub use security::{DEFAULT_ALLOWED_HOSTS, SecurityError, SecurityPolicy};
