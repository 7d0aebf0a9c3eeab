//! URL and destination-path checks applied before any asset is written.
//!
//! A remote URL must use HTTPS and point at an allow-listed host. A destination
//! must resolve to a path strictly inside the output root, after `..`
//! segments are folded and symlinks in the existing part of the path are
//! followed.

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use url::Url;

/// Hosts the wiki serves entry icons from.
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "act-webstatic.hoyoverse.com",
    "act-upload.hoyoverse.com",
    "upload-os-bbs.hoyolab.com",
    "upload-static.hoyoverse.com",
    "sg-wiki-api-static.hoyolab.com",
];

/// Rejections raised by [`SecurityPolicy`].
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("invalid asset URL: {url}")]
    InvalidUrl { url: String },

    #[error("asset URL {url} uses scheme '{scheme}', only https is allowed")]
    InsecureScheme { url: String, scheme: String },

    #[error("asset host '{host}' is not allow-listed ({url})")]
    HostNotAllowed { url: String, host: String },

    #[error("destination {path} is outside output root {root}")]
    PathEscapesRoot { path: PathBuf, root: PathBuf },

    #[error("cannot resolve {path}: {source}")]
    Unresolvable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Allow-list of asset hosts and the scheme requirement.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    allowed_hosts: Vec<String>,
    require_https: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_HOSTS.iter().copied())
    }
}

impl SecurityPolicy {
    /// Policy allowing exactly `hosts` (and their subdomains) over HTTPS.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_hosts: hosts
                .into_iter()
                .map(|host| host.into().to_ascii_lowercase())
                .collect(),
            require_https: true,
        }
    }

    /// Also accepts plain `http` URLs. Meant for local mirrors.
    #[must_use]
    pub fn allow_insecure(mut self) -> Self {
        self.require_https = false;
        self
    }

    /// Checks scheme and host of `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError`] when the URL is malformed, not HTTPS (unless
    /// allowed), or points at a host outside the allow-list.
    pub fn validate_url(&self, url: &str) -> Result<Url, SecurityError> {
        let parsed = Url::parse(url).map_err(|_| SecurityError::InvalidUrl {
            url: url.to_string(),
        })?;

        let scheme = parsed.scheme();
        let scheme_ok = scheme == "https" || (!self.require_https && scheme == "http");
        if !scheme_ok {
            return Err(SecurityError::InsecureScheme {
                url: url.to_string(),
                scheme: scheme.to_string(),
            });
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| SecurityError::InvalidUrl {
                url: url.to_string(),
            })?
            .to_ascii_lowercase();
        let allowed = self
            .allowed_hosts
            .iter()
            .any(|allowed| host == *allowed || host.ends_with(&format!(".{allowed}")));
        if !allowed {
            return Err(SecurityError::HostNotAllowed {
                url: url.to_string(),
                host,
            });
        }
        Ok(parsed)
    }

    /// Resolves `destination` and checks it lies strictly inside `root`.
    ///
    /// A relative destination is taken relative to `root`. Returns the
    /// resolved absolute path to write to.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::PathEscapesRoot`] when the resolved path is the
    /// root itself or lies outside it, and [`SecurityError::Unresolvable`] when
    /// the root or an existing ancestor of the destination cannot be resolved.
    pub fn validate_path(&self, destination: &Path, root: &Path) -> Result<PathBuf, SecurityError> {
        let canonical_root = std::fs::canonicalize(root).map_err(|source| {
            SecurityError::Unresolvable {
                path: root.to_path_buf(),
                source,
            }
        })?;

        let joined = if destination.is_absolute() {
            destination.to_path_buf()
        } else {
            canonical_root.join(destination)
        };
        let escapes = || SecurityError::PathEscapesRoot {
            path: destination.to_path_buf(),
            root: canonical_root.clone(),
        };

        let normalized = normalize_lexically(&joined).ok_or_else(escapes)?;
        let resolved = canonicalize_existing_prefix(&normalized).map_err(|source| {
            SecurityError::Unresolvable {
                path: normalized.clone(),
                source,
            }
        })?;

        if resolved == canonical_root || !resolved.starts_with(&canonical_root) {
            return Err(escapes());
        }
        Ok(resolved)
    }

    /// Runs both checks, returning the resolved destination.
    ///
    /// # Errors
    ///
    /// Returns the first [`SecurityError`] raised by [`Self::validate_url`]
    /// or [`Self::validate_path`].
    pub fn validate_all(
        &self,
        remote_url: &str,
        destination: &Path,
        root: &Path,
    ) -> Result<PathBuf, SecurityError> {
        self.validate_url(remote_url)?;
        self.validate_path(destination, root)
    }

    /// Boolean form of [`Self::validate_all`]; rejections are logged.
    #[must_use]
    pub fn is_allowed(&self, remote_url: &str, destination: &Path, root: &Path) -> bool {
        match self.validate_all(remote_url, destination, root) {
            Ok(_) => true,
            Err(error) => {
                warn!(error = %error, "security check rejected asset");
                false
            }
        }
    }
}

/// Folds `.` and `..` without touching the filesystem. `None` when `..`
/// climbs above the start of the path.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}

/// Canonicalizes the deepest existing ancestor of `path` and re-appends the
/// components that do not exist yet.
fn canonicalize_existing_prefix(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path;
    let mut missing: Vec<OsString> = Vec::new();
    loop {
        match std::fs::canonicalize(existing) {
            Ok(mut resolved) => {
                for part in missing.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_os_string());
                        existing = parent;
                    }
                    _ => return Err(error),
                }
            }
            Err(error) => return Err(error),
        }
    }
}
