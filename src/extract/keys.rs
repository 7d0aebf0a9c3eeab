//! Localized key lookup over the flattened base-info list.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::model::Language;
use crate::model::payload::KeyValueEntry;

#[allow(clippy::expect_used)]
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("HTML tag regex is valid")); // Static pattern, safe to panic

/// Semantic keys read from the base-info list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoKey {
    Name,
    Faction,
    Rarity,
    Specialty,
    Attribute,
    AttackType,
}

impl InfoKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Faction => "faction",
            Self::Rarity => "rarity",
            Self::Specialty => "specialty",
            Self::Attribute => "attribute",
            Self::AttackType => "attack type",
        }
    }

    /// Literal key labels the base-info list uses in `language`.
    #[must_use]
    pub fn labels(self, language: Language) -> &'static [&'static str] {
        match (self, language) {
            (Self::Name, Language::ZhCn) => &["名称", "姓名"],
            (Self::Faction, Language::ZhCn) => &["阵营"],
            (Self::Rarity, Language::ZhCn) => &["稀有度"],
            (Self::Specialty, Language::ZhCn) => &["特性"],
            (Self::Attribute, Language::ZhCn) => &["属性"],
            (Self::AttackType, Language::ZhCn) => &["攻击类型"],
            (Self::Name, Language::EnUs) => &["Name"],
            (Self::Faction, Language::EnUs) => &["Faction"],
            (Self::Rarity, Language::EnUs) => &["Rarity"],
            (Self::Specialty, Language::EnUs) => &["Specialty"],
            (Self::Attribute, Language::EnUs) => &["Attribute"],
            (Self::AttackType, Language::EnUs) => &["Attack Type"],
        }
    }
}

/// Key lookup over one language's base-info entries.
///
/// Duplicate policy: the first entry in list order whose key matches and whose
/// value is non-blank wins. A later duplicate with a different value is kept
/// out of the record and reported as a warning.
#[derive(Debug, Clone, Copy)]
pub struct KeyLookup<'a> {
    entries: &'a [KeyValueEntry],
    language: Language,
}

impl<'a> KeyLookup<'a> {
    #[must_use]
    pub fn new(entries: &'a [KeyValueEntry], language: Language) -> Self {
        Self { entries, language }
    }

    /// Returns the cleaned value for `key`, or `None` when no entry carries it.
    pub fn find(&self, key: InfoKey, warnings: &mut Vec<String>) -> Option<String> {
        let labels = key.labels(self.language);
        let mut matches = self
            .entries
            .iter()
            .filter(|entry| {
                let entry_key = entry.key.trim();
                labels.iter().any(|label| label.eq_ignore_ascii_case(entry_key))
            })
            .filter_map(KeyValueEntry::first_text)
            .map(clean_text)
            .filter(|text| !text.is_empty());

        let first = matches.next()?;
        for duplicate in matches.filter(|text| *text != first) {
            let message = format!(
                "duplicate '{}' key ignored: kept '{first}', dropped '{duplicate}'",
                key.as_str()
            );
            warn!(language = %self.language, key = key.as_str(), "{message}");
            warnings.push(message);
        }
        Some(first)
    }
}

/// Strips HTML tags, decodes common entities, and collapses whitespace.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let stripped = HTML_TAG.replace_all(raw, " ");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}
