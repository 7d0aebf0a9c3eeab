//! Typed schema for wiki entry payloads.
//!
//! The API envelope is ordinary JSON, but every component inside a page stores
//! its content as a JSON document serialized into a string field. Reaching the
//! `{key, value}` entries therefore takes two decoding passes: one for the
//! envelope ([`RawPayload::from_slice`]) and one per component
//! ([`WikiComponent::decode`]).
//!
//! Each navigation step returns `Option` or `Result`, so absent structure is
//! always handled at the call site.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Component holding the `{key, value}` base-info list.
pub const BASE_INFO_COMPONENT: &str = "baseInfo";

/// Component holding the per-level stat rows.
pub const LEVEL_TABLE_COMPONENT: &str = "ascension";

/// Top-level API envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
    #[serde(default)]
    pub retcode: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<PayloadData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadData {
    #[serde(default)]
    pub page: Option<WikiPage>,
}

/// One wiki entry page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WikiPage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub modules: Vec<WikiModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WikiModule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub components: Vec<WikiComponent>,
}

/// A module component whose `data` field is itself encoded JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WikiComponent {
    pub component_id: String,
    #[serde(default)]
    pub data: String,
}

impl RawPayload {
    /// Decodes the envelope from response bytes.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the bytes are not a valid envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Returns the page, if the envelope carries one.
    #[must_use]
    pub fn page(&self) -> Option<&WikiPage> {
        self.data.as_ref()?.page.as_ref()
    }
}

impl WikiPage {
    /// First component with the given id, searching modules in order.
    #[must_use]
    pub fn component(&self, component_id: &str) -> Option<&WikiComponent> {
        self.modules
            .iter()
            .flat_map(|module| module.components.iter())
            .find(|component| component.component_id == component_id)
    }
}

impl WikiComponent {
    /// Decodes the component's embedded JSON document.
    ///
    /// Some pages wrap the document in one more layer of string encoding; a
    /// decoded JSON string is unwrapped and decoded again.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the embedded document does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(&self.data)?;
        match value {
            serde_json::Value::String(inner) => serde_json::from_str(&inner),
            other => serde_json::from_value(other),
        }
    }
}

/// Decoded base-info document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyValueList {
    #[serde(default)]
    pub list: Vec<KeyValueEntry>,
}

/// A `{key, value}` or `{key, values}` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyValueEntry {
    pub key: String,
    #[serde(default)]
    pub value: Option<EntryValue>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

/// `value` is either a single string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EntryValue {
    Text(String),
    List(Vec<String>),
}

impl KeyValueEntry {
    /// First non-blank text carried by `value`, falling back to `values`.
    #[must_use]
    pub fn first_text(&self) -> Option<&str> {
        let from_value = match &self.value {
            Some(EntryValue::Text(text)) => Some(text.as_str()),
            Some(EntryValue::List(items)) => first_non_blank(items),
            None => None,
        };
        from_value
            .filter(|text| !text.trim().is_empty())
            .or_else(|| self.values.as_deref().and_then(first_non_blank))
    }
}

fn first_non_blank(items: &[String]) -> Option<&str> {
    items
        .iter()
        .map(String::as_str)
        .find(|text| !text.trim().is_empty())
}

/// Decoded level-table document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LevelTableDoc {
    #[serde(default)]
    pub list: Vec<LevelRowDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelRowDoc {
    pub key: String,
    #[serde(default, rename = "combatList")]
    pub combat_list: Vec<StatCellDoc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatCellDoc {
    pub key: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Pre- and post-ascension values of one stat at one level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatPair {
    pub before: Option<String>,
    pub after: Option<String>,
}

/// One level row: the level label and its stat pairs keyed by stat label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelStatRow {
    pub level_key: String,
    pub stat_entries: BTreeMap<String, StatPair>,
}

impl From<LevelRowDoc> for LevelStatRow {
    fn from(doc: LevelRowDoc) -> Self {
        let mut stat_entries = BTreeMap::new();
        for cell in doc.combat_list {
            let mut values = cell.values.into_iter();
            let pair = StatPair {
                before: values.next(),
                after: values.next(),
            };
            // First cell for a label wins.
            stat_entries.entry(cell.key.trim().to_string()).or_insert(pair);
        }
        Self {
            level_key: doc.key,
            stat_entries,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn component(id: &str, data: &str) -> WikiComponent {
        WikiComponent {
            component_id: id.to_string(),
            data: data.to_string(),
        }
    }

    #[test]
    fn test_envelope_without_page_has_no_page() {
        let payload = RawPayload::from_slice(br#"{"retcode":0,"message":"OK","data":{}}"#).unwrap();
        assert!(payload.page().is_none());
    }

    #[test]
    fn test_component_lookup_spans_modules() {
        let page = WikiPage {
            modules: vec![
                WikiModule {
                    name: "Info".into(),
                    components: vec![component("gallery", "{}")],
                },
                WikiModule {
                    name: "Stats".into(),
                    components: vec![component(LEVEL_TABLE_COMPONENT, "{}")],
                },
            ],
            ..WikiPage::default()
        };
        assert!(page.component(LEVEL_TABLE_COMPONENT).is_some());
        assert!(page.component(BASE_INFO_COMPONENT).is_none());
    }

    #[test]
    fn test_decode_handles_extra_string_layer() {
        let inner = r#"{"list":[{"key":"Name","value":["Anby"]}]}"#;
        let wrapped = serde_json::to_string(inner).unwrap();
        let doc: KeyValueList = component(BASE_INFO_COMPONENT, &wrapped).decode().unwrap();
        assert_eq!(doc.list[0].first_text(), Some("Anby"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result: Result<KeyValueList, _> = component(BASE_INFO_COMPONENT, "not json").decode();
        assert!(result.is_err());
    }

    #[test]
    fn test_first_text_prefers_value_then_values() {
        let entry: KeyValueEntry =
            serde_json::from_str(r#"{"key":"Rarity","value":"","values":["S"]}"#).unwrap();
        assert_eq!(entry.first_text(), Some("S"));

        let entry: KeyValueEntry =
            serde_json::from_str(r#"{"key":"Rarity","value":["", "A"]}"#).unwrap();
        assert_eq!(entry.first_text(), Some("A"));

        let entry: KeyValueEntry = serde_json::from_str(r#"{"key":"Rarity"}"#).unwrap();
        assert_eq!(entry.first_text(), None);
    }

    #[test]
    fn test_level_row_conversion_keeps_first_duplicate() {
        let doc: LevelRowDoc = serde_json::from_str(
            r#"{"key":"10","combatList":[
                {"key":"HP","values":["100","120"]},
                {"key":"HP","values":["1","2"]},
                {"key":"ATK","values":["50"]}
            ]}"#,
        )
        .unwrap();
        let row = LevelStatRow::from(doc);
        assert_eq!(row.stat_entries["HP"].after.as_deref(), Some("120"));
        assert_eq!(row.stat_entries["ATK"].before.as_deref(), Some("50"));
        assert_eq!(row.stat_entries["ATK"].after, None);
    }
}
