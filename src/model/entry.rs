//! Source entries and the languages they are fetched in.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Languages the dataset is published in.
///
/// [`Language::PRIMARY`] is the canonical source for non-localized fields and
/// the fallback for every localized field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "zh-cn")]
    ZhCn,
    #[serde(rename = "en-us")]
    EnUs,
}

impl Language {
    /// Canonical language.
    pub const PRIMARY: Language = Language::ZhCn;

    /// Every supported language, primary first.
    pub const ALL: [Language; 2] = [Language::ZhCn, Language::EnUs];

    /// Locale code sent to the content API.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::ZhCn => "zh-cn",
            Self::EnUs => "en-us",
        }
    }

    /// Parses a locale code (`zh-cn`, `en-us`, case-insensitive).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|language| language.code().eq_ignore_ascii_case(code.trim()))
    }

    /// Languages other than the primary one.
    pub fn secondaries() -> impl Iterator<Item = Language> {
        Self::ALL
            .into_iter()
            .filter(|language| *language != Self::PRIMARY)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of game entity an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    #[default]
    Character,
    Weapon,
    Bangboo,
    DriveDisc,
}

impl EntityKind {
    /// Whether the entity carries a faction and a full level table.
    #[must_use]
    pub fn is_character_like(self) -> bool {
        matches!(self, Self::Character)
    }
}

/// One wiki entry to ingest. Created by the enumerator, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    /// Stable slug, unique within a run.
    pub id: String,
    /// Numeric wiki entry id.
    pub remote_id: u64,
    #[serde(default)]
    pub kind: EntityKind,
    #[serde(default)]
    pub language_hint: Option<Language>,
}

impl SourceEntry {
    /// Creates a character entry without a language hint.
    pub fn new(id: impl Into<String>, remote_id: u64) -> Self {
        Self {
            id: id.into(),
            remote_id,
            kind: EntityKind::Character,
            language_hint: None,
        }
    }

    /// Sets the entity kind.
    #[must_use]
    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = kind;
        self
    }
}
