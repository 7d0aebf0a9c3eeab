//! Asset filename derivation and sanitization.

use std::path::{Component, Path};

use url::Url;

use super::constants::DEFAULT_ASSET_EXTENSION;

/// Reduces `name` to a single safe path segment.
///
/// Path separators and characters outside `[A-Za-z0-9._-]` (plus non-ASCII
/// alphanumerics) are dropped, whitespace becomes `_`, and leading dots are
/// stripped so the result is never hidden, `.` or `..`. An empty result
/// becomes `asset`.
#[must_use]
pub fn sanitize_asset_name(name: &str) -> String {
    let mapped: String = name
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            c if c.is_control() => None,
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => Some(c),
            _ => None,
        })
        .collect();
    let trimmed = mapped.trim_start_matches('.').trim_end_matches('.');

    if trimmed.is_empty() || !is_safe_filename_segment(trimmed) {
        return "asset".to_string();
    }
    trimmed.to_string()
}

/// Lowercase extension (with the dot) of the URL's last path segment.
pub(crate) fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index..];
    if ext.len() <= 1 || ext.len() > 6 || !ext[1..].chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_lowercase())
}

/// File name for an entry's asset: the sanitized id plus the URL's extension.
#[must_use]
pub fn asset_file_name(entry_id: &str, url: &str) -> String {
    let extension = extension_from_url(url).unwrap_or_else(|| DEFAULT_ASSET_EXTENSION.to_string());
    format!("{}{extension}", sanitize_asset_name(entry_id))
}

fn is_safe_filename_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_traversal() {
        assert_eq!(sanitize_asset_name("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_asset_name("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_asset_name(".hidden"), "hidden");
    }

    #[test]
    fn test_sanitize_keeps_valid_names() {
        assert_eq!(sanitize_asset_name("anby-demara"), "anby-demara");
        assert_eq!(sanitize_asset_name("soldier 11"), "soldier_11");
        assert_eq!(sanitize_asset_name("安比"), "安比");
    }

    #[test]
    fn test_sanitize_drops_disallowed_chars() {
        assert_eq!(sanitize_asset_name("a:b*c?d\"e<f>g|h"), "abcdefgh");
        assert_eq!(sanitize_asset_name("nul\0byte"), "nulbyte");
    }

    #[test]
    fn test_sanitize_empty_becomes_asset() {
        assert_eq!(sanitize_asset_name(""), "asset");
        assert_eq!(sanitize_asset_name("../.."), "asset");
        assert_eq!(sanitize_asset_name("///"), "asset");
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://cdn.example.com/a/b/icon.PNG?x=1"),
            Some(".png".to_string())
        );
        assert_eq!(extension_from_url("https://cdn.example.com/a/b/icon"), None);
        assert_eq!(extension_from_url("not a url"), None);
    }

    #[test]
    fn test_asset_file_name() {
        assert_eq!(
            asset_file_name("anby", "https://cdn.example.com/x/1a2b.webp"),
            "anby.webp"
        );
        assert_eq!(
            asset_file_name("../evil", "https://cdn.example.com/x/noext"),
            "evil.png"
        );
    }
}
