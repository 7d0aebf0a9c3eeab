//! Extraction and mapping of wiki payloads into typed records.
//!
//! [`extract`] walks one language's payload and produces an
//! [`ExtractedRecord`]; [`merge`] combines the per-language records into a
//! [`MergedRecord`](crate::model::MergedRecord). Nothing here performs I/O.
//!
//! Absent optional fields never fail extraction. Only a missing page, a
//! missing or undecodable required component, or a missing name does.

mod error;
pub mod keys;
mod merge;
pub mod table;
pub mod tags;

pub use error::ExtractionError;
pub use keys::{InfoKey, KeyLookup, clean_text};
pub use merge::merge;
pub use tags::{DEFAULT_MAX_DESCRIPTION_CHARS, TagScan, extract_tags};

use tracing::{debug, instrument};

use crate::model::payload::{BASE_INFO_COMPONENT, KeyValueList};
use crate::model::{ExtractedRecord, Language, RawPayload, SourceEntry};

/// Tunables for one extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Description characters scanned for tags.
    pub max_description_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_description_chars: DEFAULT_MAX_DESCRIPTION_CHARS,
        }
    }
}

/// Extracts one language's record for `entry` from `payload`.
///
/// The level table is required for character-like entries and optional for
/// everything else.
///
/// # Errors
///
/// Returns [`ExtractionError`] when the page, the base-info component, a
/// required level table, or the name is absent, or when a present component
/// cannot be decoded.
#[instrument(skip(payload, options), fields(entry_id = %entry.id, %language))]
pub fn extract(
    payload: &RawPayload,
    entry: &SourceEntry,
    language: Language,
    options: &ExtractOptions,
) -> Result<ExtractedRecord, ExtractionError> {
    let page = payload
        .page()
        .ok_or(ExtractionError::MissingPage { language })?;

    let base_info: KeyValueList = page
        .component(BASE_INFO_COMPONENT)
        .ok_or_else(|| ExtractionError::missing_component(BASE_INFO_COMPONENT, language))?
        .decode()
        .map_err(|e| ExtractionError::malformed(BASE_INFO_COMPONENT, language, e))?;

    let mut record = ExtractedRecord::new(entry.id.clone(), language);
    let lookup = KeyLookup::new(&base_info.list, language);
    let warnings = &mut record.warnings;

    record.localized_name = lookup
        .find(InfoKey::Name, warnings)
        .or_else(|| {
            page.name
                .as_deref()
                .map(clean_text)
                .filter(|name| !name.is_empty())
        })
        .ok_or(ExtractionError::MissingKey {
            key: InfoKey::Name.as_str(),
            language,
        })?;
    record.faction_raw = lookup.find(InfoKey::Faction, warnings);
    record.rarity_raw = lookup.find(InfoKey::Rarity, warnings);
    record.specialty_raw = lookup.find(InfoKey::Specialty, warnings);
    record.attribute_raw = lookup.find(InfoKey::Attribute, warnings);
    record.attack_type_raw = lookup.find(InfoKey::AttackType, warnings);

    record.stats_raw = table::read_level_rows(page, language, entry.kind.is_character_like())?;
    record.level_table = table::select_checkpoints(&record.stats_raw, language, warnings);

    if let Some(desc) = page.desc.as_deref() {
        let scan = extract_tags(&clean_text(desc), language, options.max_description_chars);
        record.tags = scan.tags;
        warnings.extend(scan.warnings);
    }

    record.icon_url = page
        .icon_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);

    debug!(
        name = %record.localized_name,
        checkpoints = record.level_table.len(),
        tags = record.tags.len(),
        warnings = record.warnings.len(),
        "Extracted record"
    );
    Ok(record)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Attribute, EntityKind, StatKind};

    fn payload(base_info: &str, table: Option<&str>, desc: &str) -> RawPayload {
        let mut components = vec![serde_json::json!({
            "component_id": "baseInfo",
            "data": serde_json::to_string(&serde_json::json!({ "list": serde_json::from_str::<serde_json::Value>(base_info).unwrap() })).unwrap(),
        })];
        if let Some(table) = table {
            components.push(serde_json::json!({
                "component_id": "ascension",
                "data": serde_json::to_string(&serde_json::json!({ "list": serde_json::from_str::<serde_json::Value>(table).unwrap() })).unwrap(),
            }));
        }
        let envelope = serde_json::json!({
            "retcode": 0,
            "message": "OK",
            "data": { "page": {
                "name": "Page Name",
                "icon_url": "https://act-webstatic.hoyoverse.com/icon.png",
                "desc": desc,
                "modules": [{ "name": "Info", "components": components }]
            }}
        });
        RawPayload::from_slice(envelope.to_string().as_bytes()).unwrap()
    }

    const TABLE: &str = r#"[
        {"key":"1","combatList":[{"key":"HP","values":["600"]},{"key":"Impact","values":["90"]}]},
        {"key":"10","combatList":[{"key":"HP","values":["1000","1100"]}]}
    ]"#;

    #[test]
    fn test_extract_full_character() {
        let payload = payload(
            r#"[{"key":"Name","value":["<p>Anby</p>"]},{"key":"Rarity","value":["A"]},{"key":"Faction","value":["Cunning Hares"]}]"#,
            Some(TABLE),
            "<p>Deals Electric DMG.</p>",
        );
        let entry = SourceEntry::new("anby", 1001);
        let record = extract(&payload, &entry, Language::EnUs, &ExtractOptions::default()).unwrap();

        assert_eq!(record.localized_name, "Anby");
        assert_eq!(record.rarity_raw.as_deref(), Some("A"));
        assert_eq!(record.faction_raw.as_deref(), Some("Cunning Hares"));
        assert_eq!(record.level_table[&1].get(StatKind::Hp), Some(600.0));
        assert_eq!(record.level_table[&10].get(StatKind::Hp), Some(1100.0));
        assert_eq!(record.level_table[&1].get(StatKind::Impact), Some(90.0));
        assert!(record.tags.contains(&Attribute::Electric));
        assert_eq!(
            record.icon_url.as_deref(),
            Some("https://act-webstatic.hoyoverse.com/icon.png")
        );
    }

    #[test]
    fn test_name_falls_back_to_page_name() {
        let payload = payload(r#"[{"key":"Rarity","value":["S"]}]"#, Some(TABLE), "");
        let entry = SourceEntry::new("x", 1);
        let record = extract(&payload, &entry, Language::EnUs, &ExtractOptions::default()).unwrap();
        assert_eq!(record.localized_name, "Page Name");
    }

    #[test]
    fn test_character_requires_level_table() {
        let payload = payload(r#"[{"key":"Name","value":["Anby"]}]"#, None, "");
        let entry = SourceEntry::new("anby", 1001);
        let err = extract(&payload, &entry, Language::EnUs, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::MissingComponent {
                component: "ascension",
                ..
            }
        ));
    }

    #[test]
    fn test_weapon_without_level_table_is_fine() {
        let payload = payload(r#"[{"key":"Name","value":["Starlight Engine"]}]"#, None, "");
        let entry = SourceEntry::new("starlight-engine", 2001).with_kind(EntityKind::Weapon);
        let record = extract(&payload, &entry, Language::EnUs, &ExtractOptions::default()).unwrap();
        assert!(record.level_table.is_empty());
    }

    #[test]
    fn test_missing_page_is_an_error() {
        let payload = RawPayload::from_slice(br#"{"retcode":0,"data":{"page":null}}"#).unwrap();
        let entry = SourceEntry::new("anby", 1001);
        let err = extract(&payload, &entry, Language::ZhCn, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingPage { .. }));
    }

    #[test]
    fn test_malformed_base_info_is_an_error() {
        let raw = serde_json::json!({
            "data": { "page": { "modules": [{ "components": [
                { "component_id": "baseInfo", "data": "{not json" }
            ]}]}}
        });
        let payload = RawPayload::from_slice(raw.to_string().as_bytes()).unwrap();
        let entry = SourceEntry::new("anby", 1001);
        let err = extract(&payload, &entry, Language::ZhCn, &ExtractOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedComponent { .. }));
    }
}
