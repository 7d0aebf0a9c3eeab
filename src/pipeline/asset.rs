//! Asset variant: fetch an entry's payload and download its icon.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::{ErrorKind, ItemFailure, ItemOutcome, ItemProcessor, RetryPolicy, run_with_retry};
use crate::config::RunConfig;
use crate::download::{AssetDownloader, DownloadLimits, SecurityPolicy, asset_file_name};
use crate::fetch::RecordFetcher;
use crate::model::{Language, SourceEntry};

/// A downloaded (or already present) asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResult {
    pub id: String,
    pub path: PathBuf,
    pub bytes: u64,
    /// The file was already on disk and was kept.
    pub skipped: bool,
}

/// Downloads one icon per entry into an output root.
///
/// Every destination passes [`SecurityPolicy`] checks before anything is
/// written. Failed verification never leaves a file behind.
pub struct AssetPipeline {
    fetcher: Arc<dyn RecordFetcher>,
    downloader: Arc<dyn AssetDownloader>,
    policy: SecurityPolicy,
    retry: RetryPolicy,
    limits: DownloadLimits,
    output_root: PathBuf,
    skip_existing: bool,
}

impl AssetPipeline {
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn RecordFetcher>,
        downloader: Arc<dyn AssetDownloader>,
        output_root: impl Into<PathBuf>,
        config: &RunConfig,
    ) -> Self {
        Self {
            fetcher,
            downloader,
            policy: config.security_policy(),
            retry: RetryPolicy::from_config(config),
            limits: config.download_limits(),
            output_root: output_root.into(),
            skip_existing: config.skip_existing,
        }
    }

    async fn attempt(&self, entry: &SourceEntry) -> Result<(AssetResult, u64), ItemFailure> {
        // The icon is language-independent; a hint only picks which locale to ask.
        let language = entry.language_hint.unwrap_or(Language::PRIMARY);
        let fetched = self.fetcher.fetch(entry.remote_id, language).await?;

        let icon_url = fetched
            .payload
            .page()
            .and_then(|page| page.icon_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ItemFailure::new(ErrorKind::Extraction, "payload has no icon URL"))?;

        tokio::fs::create_dir_all(&self.output_root)
            .await
            .map_err(|e| {
                ItemFailure::new(
                    ErrorKind::FileSystem,
                    format!("cannot create {}: {e}", self.output_root.display()),
                )
            })?;

        let file_name = asset_file_name(&entry.id, icon_url);
        let dest = self
            .policy
            .validate_all(icon_url, Path::new(&file_name), &self.output_root)?;

        if self.skip_existing
            && let Ok(metadata) = tokio::fs::metadata(&dest).await
            && metadata.is_file()
        {
            debug!(path = %dest.display(), "asset already present, skipping");
            return Ok((
                AssetResult {
                    id: entry.id.clone(),
                    path: dest,
                    bytes: metadata.len(),
                    skipped: true,
                },
                metadata.len(),
            ));
        }

        let asset = self.downloader.download(icon_url, &dest, &self.limits).await?;
        info!(path = %asset.path.display(), bytes = asset.bytes, "asset saved");
        Ok((
            AssetResult {
                id: entry.id.clone(),
                path: asset.path,
                bytes: asset.bytes,
                skipped: false,
            },
            asset.bytes,
        ))
    }
}

#[async_trait]
impl ItemProcessor for AssetPipeline {
    type Output = AssetResult;

    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    async fn process(&self, entry: &SourceEntry) -> ItemOutcome<AssetResult> {
        run_with_retry(&entry.id, &self.retry, move |_| self.attempt(entry)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::download::{DownloadError, DownloadedAsset};
    use crate::fetch::{FetchError, FetchedPayload};
    use crate::model::RawPayload;
    use tempfile::TempDir;

    struct IconFetcher {
        icon_url: Option<String>,
    }

    #[async_trait]
    impl RecordFetcher for IconFetcher {
        async fn fetch(&self, _: u64, _: Language) -> Result<FetchedPayload, FetchError> {
            let body = serde_json::json!({"retcode": 0, "data": {"page": {
                "name": "Anby", "icon_url": self.icon_url, "modules": []
            }}})
            .to_string();
            Ok(FetchedPayload {
                payload: RawPayload::from_slice(body.as_bytes()).unwrap(),
                bytes: body.len() as u64,
            })
        }
    }

    /// Writes a fixed body, counting calls.
    struct FakeDownloader {
        calls: AtomicU32,
    }

    #[async_trait]
    impl AssetDownloader for FakeDownloader {
        async fn download(
            &self,
            _url: &str,
            dest: &Path,
            _limits: &DownloadLimits,
        ) -> Result<DownloadedAsset, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, b"png")
                .await
                .map_err(|e| DownloadError::io(dest, e))?;
            Ok(DownloadedAsset {
                path: dest.to_path_buf(),
                bytes: 3,
                content_type: Some("image/png".into()),
            })
        }
    }

    fn pipeline(
        icon_url: Option<&str>,
        root: &Path,
        skip_existing: bool,
    ) -> (AssetPipeline, Arc<FakeDownloader>) {
        let downloader = Arc::new(FakeDownloader {
            calls: AtomicU32::new(0),
        });
        let config = RunConfig {
            skip_existing,
            retry_attempts: 2,
            base_retry_delay_ms: 1,
            max_retry_delay_ms: 1,
            ..RunConfig::default()
        };
        let fetcher = Arc::new(IconFetcher {
            icon_url: icon_url.map(str::to_string),
        });
        (
            AssetPipeline::new(fetcher, downloader.clone(), root, &config),
            downloader,
        )
    }

    const ICON: &str = "https://act-webstatic.hoyoverse.com/icons/anby.webp";

    #[tokio::test]
    async fn test_downloads_icon_under_sanitized_name() {
        let root = TempDir::new().unwrap();
        let (pipeline, downloader) = pipeline(Some(ICON), root.path(), true);

        let outcome = pipeline.process(&SourceEntry::new("anby", 1001)).await;
        let asset = outcome.result.unwrap();
        assert_eq!(asset.path.file_name().unwrap(), "anby.webp");
        assert!(!asset.skipped);
        assert_eq!(outcome.bytes, 3);
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_traversal_id_stays_inside_root() {
        let root = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(Some(ICON), root.path(), true);

        let outcome = pipeline
            .process(&SourceEntry::new("../../etc/passwd", 1))
            .await;
        let asset = outcome.result.unwrap();
        let canonical_root = std::fs::canonicalize(root.path()).unwrap();
        assert_eq!(asset.path, canonical_root.join("etcpasswd.webp"));
    }

    #[tokio::test]
    async fn test_existing_file_is_skipped() {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("anby.webp"), b"already here").unwrap();
        let (pipeline, downloader) = pipeline(Some(ICON), root.path(), true);

        let outcome = pipeline.process(&SourceEntry::new("anby", 1001)).await;
        let asset = outcome.result.unwrap();
        assert!(asset.skipped);
        assert_eq!(asset.bytes, 12);
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_disallowed_host_is_not_retried() {
        let root = TempDir::new().unwrap();
        let (pipeline, downloader) =
            pipeline(Some("https://evil.example.com/x.png"), root.path(), true);

        let outcome = pipeline.process(&SourceEntry::new("anby", 1001)).await;
        assert_eq!(outcome.attempts_used, 1);
        assert_eq!(outcome.result.unwrap_err().kind, ErrorKind::Security);
        assert_eq!(downloader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_icon_is_extraction_failure() {
        let root = TempDir::new().unwrap();
        let (pipeline, _) = pipeline(None, root.path(), true);

        let outcome = pipeline.process(&SourceEntry::new("anby", 1001)).await;
        assert_eq!(outcome.result.unwrap_err().kind, ErrorKind::Extraction);
        assert_eq!(outcome.attempts_used, 3, "extraction errors retry by default");
    }
}
