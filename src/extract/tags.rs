//! Attribute tags mined from free-text descriptions.

use std::collections::BTreeSet;

use tracing::warn;

use crate::model::{Attribute, Language};

/// Default cap on description length before scanning.
pub const DEFAULT_MAX_DESCRIPTION_CHARS: usize = 10_000;

/// Trigger phrase → tag. `None` marks a recognized phrase without a tag in the
/// vocabulary. Phrases are lowercase.
type Trigger = (&'static str, Option<Attribute>);

const ZH_TRIGGERS: &[Trigger] = &[
    ("物理伤害", Some(Attribute::Physical)),
    ("火属性伤害", Some(Attribute::Fire)),
    ("冰属性伤害", Some(Attribute::Ice)),
    ("电属性伤害", Some(Attribute::Electric)),
    ("以太伤害", Some(Attribute::Ether)),
    ("以太属性伤害", Some(Attribute::Ether)),
    ("霜寒伤害", None),
    ("玄墨伤害", None),
];

const EN_TRIGGERS: &[Trigger] = &[
    ("physical dmg", Some(Attribute::Physical)),
    ("fire dmg", Some(Attribute::Fire)),
    ("ice dmg", Some(Attribute::Ice)),
    ("electric dmg", Some(Attribute::Electric)),
    ("ether dmg", Some(Attribute::Ether)),
    ("frost dmg", None),
    ("auric ink dmg", None),
];

fn triggers(language: Language) -> &'static [Trigger] {
    match language {
        Language::ZhCn => ZH_TRIGGERS,
        Language::EnUs => EN_TRIGGERS,
    }
}

/// Tags found in one description, plus any warnings raised while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagScan {
    pub tags: BTreeSet<Attribute>,
    pub warnings: Vec<String>,
}

/// Scans `description` for the language's trigger phrases.
///
/// Text beyond `max_chars` characters is not scanned. Matching is
/// case-insensitive and a phrase contributes its tag once however often it
/// occurs.
#[must_use]
pub fn extract_tags(description: &str, language: Language, max_chars: usize) -> TagScan {
    let mut scan = TagScan::default();

    let total_chars = description.chars().count();
    let text = if total_chars > max_chars {
        let message =
            format!("description truncated from {total_chars} to {max_chars} characters");
        warn!(%language, "{message}");
        scan.warnings.push(message);
        description.chars().take(max_chars).collect::<String>()
    } else {
        description.to_string()
    };
    let lowered = text.to_lowercase();

    for (phrase, tag) in triggers(language) {
        if !lowered.contains(phrase) {
            continue;
        }
        match tag {
            Some(tag) => {
                scan.tags.insert(*tag);
            }
            None => {
                let message = format!("recognized phrase '{phrase}' has no tag, dropped");
                warn!(%language, "{message}");
                scan.warnings.push(message);
            }
        }
    }

    scan
}
