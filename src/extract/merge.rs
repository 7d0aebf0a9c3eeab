//! Bilingual merge of per-language extractions.

use tracing::warn;

use crate::model::vocab::faction_id;
use crate::model::{ExtractedRecord, Language, Localized, MergedRecord, SourceEntry};

/// Combines the primary-language record with whatever secondary records were
/// obtained.
///
/// Non-localized fields come from `primary` alone. For every other supported
/// language, a missing record or a blank localized name is filled from the
/// primary value, and that language is listed in
/// [`MergedRecord::fallback_languages`]. The result always has a name for
/// every language the primary record had one for.
#[must_use]
pub fn merge(
    entry: &SourceEntry,
    primary: ExtractedRecord,
    secondaries: Vec<ExtractedRecord>,
) -> MergedRecord {
    let primary_language = primary.language;
    let mut name = Localized::<String>::default();
    let mut fallback_languages = Vec::new();

    for language in Language::ALL {
        if language == primary_language {
            name.get_mut(language).clone_from(&primary.localized_name);
            continue;
        }
        let localized = secondaries
            .iter()
            .find(|record| record.language == language)
            .map(|record| record.localized_name.trim())
            .filter(|value| !value.is_empty());
        match localized {
            Some(value) => *name.get_mut(language) = value.to_string(),
            None => {
                warn!(
                    entry_id = %entry.id,
                    %language,
                    "secondary name unavailable, using {primary_language} value"
                );
                name.get_mut(language).clone_from(&primary.localized_name);
                fallback_languages.push(language);
            }
        }
    }

    let faction_id = primary.faction_raw.as_deref().and_then(faction_id);

    MergedRecord {
        id: entry.id.clone(),
        remote_id: entry.remote_id,
        kind: entry.kind,
        name,
        faction_raw: primary.faction_raw,
        faction_id,
        rarity_raw: primary.rarity_raw,
        specialty_raw: primary.specialty_raw,
        attribute_raw: primary.attribute_raw,
        attack_type_raw: primary.attack_type_raw,
        tags: primary.tags,
        level_table: primary.level_table,
        icon_url: primary.icon_url,
        fallback_languages,
    }
}
