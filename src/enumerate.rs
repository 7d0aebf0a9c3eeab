//! Entry list parsing.
//!
//! Two document shapes are accepted:
//!
//! - a JSON array of [`SourceEntry`] objects (`{"id", "remoteId", "kind"?, "languageHint"?}`)
//! - a markdown list of wiki links grouped under `##` section headings:
//!
//! ```markdown
//! ## Characters
//! - [Anby Demara](https://wiki.hoyolab.com/pc/zzz/entry/1001)
//!
//! ## W-Engines
//! - [Steel Cushion](https://wiki.hoyolab.com/pc/zzz/entry/2001)
//! ```
//!
//! Markdown entries get a slug id derived from the link text. Entries before
//! the first section heading are characters.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::model::{EntityKind, SourceEntry};

#[allow(clippy::expect_used)]
static LINK_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*+]\s*\[([^\]]+)\]\(\s*([^)\s]+)\s*\)").expect("link item regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static REMOTE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:/entry/|entry_page_id=)(\d+)").expect("remote id regex is valid") // Static pattern, safe to panic
});

/// Entry list that cannot be turned into a valid entry set.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("invalid JSON entry list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line {line}: unknown section `{heading}`")]
    UnknownSection { line: usize, heading: String },

    #[error("line {line}: no wiki entry id in link `{target}`")]
    MissingRemoteId { line: usize, target: String },

    #[error("entry has an empty id (remote id {remote_id})")]
    EmptyId { remote_id: u64 },

    #[error("duplicate entry id: {id}")]
    DuplicateId { id: String },
}

/// Parses an entry list document.
///
/// # Errors
///
/// Returns [`EnumerationError`] on malformed input or duplicate ids.
#[instrument(skip(document), fields(len = document.len()))]
pub fn parse_entries(document: &str) -> Result<Vec<SourceEntry>, EnumerationError> {
    let entries = if document.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<SourceEntry>>(document)?
    } else {
        parse_markdown(document)?
    };

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in &entries {
        if entry.id.trim().is_empty() {
            return Err(EnumerationError::EmptyId {
                remote_id: entry.remote_id,
            });
        }
        if !seen.insert(entry.id.as_str()) {
            return Err(EnumerationError::DuplicateId {
                id: entry.id.clone(),
            });
        }
    }
    debug!(count = entries.len(), "entries parsed");
    Ok(entries)
}

fn parse_markdown(document: &str) -> Result<Vec<SourceEntry>, EnumerationError> {
    let mut kind = EntityKind::Character;
    let mut entries = Vec::new();

    for (index, line) in document.lines().enumerate() {
        let line_number = index + 1;
        if let Some(heading) = line.trim().strip_prefix("## ") {
            kind = section_kind(heading).ok_or_else(|| EnumerationError::UnknownSection {
                line: line_number,
                heading: heading.trim().to_string(),
            })?;
            continue;
        }

        let Some(captures) = LINK_ITEM.captures(line) else {
            continue;
        };
        let (name, target) = (&captures[1], &captures[2]);
        let remote_id = REMOTE_ID
            .captures(target)
            .and_then(|id| id[1].parse::<u64>().ok())
            .ok_or_else(|| EnumerationError::MissingRemoteId {
                line: line_number,
                target: target.to_string(),
            })?;

        let mut slug = slugify(name);
        if slug.is_empty() {
            slug = format!("entry-{remote_id}");
        }
        entries.push(SourceEntry::new(slug, remote_id).with_kind(kind));
    }
    Ok(entries)
}

fn section_kind(heading: &str) -> Option<EntityKind> {
    let normalized: String = heading
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    match normalized.as_str() {
        "characters" | "agents" => Some(EntityKind::Character),
        "wengines" | "weapons" => Some(EntityKind::Weapon),
        "bangboo" | "bangboos" => Some(EntityKind::Bangboo),
        "drivediscs" | "discs" => Some(EntityKind::DriveDisc),
        _ => None,
    }
}

/// Lowercase ASCII slug: alphanumeric runs joined by `-`.
fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
