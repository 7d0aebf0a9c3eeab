//! Records produced along the pipeline: per-language extraction, bilingual
//! merge, and the validated domain record.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::payload::LevelStatRow;
use super::vocab::{AttackType, Attribute, CHECKPOINT_COUNT, Rarity, Specialty, StatKind};
use super::{EntityKind, Language};

/// The ten stat values sampled at one checkpoint. `None` marks a stat absent
/// from the row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatBlock {
    values: [Option<f64>; 10],
}

impl StatBlock {
    #[must_use]
    pub fn get(&self, stat: StatKind) -> Option<f64> {
        self.values[stat as usize]
    }

    pub fn set(&mut self, stat: StatKind, value: f64) {
        self.values[stat as usize] = Some(value);
    }
}

/// Checkpoint level -> stat values, iterated in ascending level order.
pub type LevelTable = BTreeMap<u32, StatBlock>;

/// Output of one extraction pass over one language's payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord {
    pub id: String,
    pub language: Language,
    pub localized_name: String,
    pub faction_raw: Option<String>,
    pub rarity_raw: Option<String>,
    pub specialty_raw: Option<String>,
    pub attribute_raw: Option<String>,
    pub attack_type_raw: Option<String>,
    /// Level rows as found in the payload, before checkpoint selection.
    pub stats_raw: Vec<LevelStatRow>,
    pub level_table: LevelTable,
    pub tags: BTreeSet<Attribute>,
    pub icon_url: Option<String>,
    /// Non-fatal anomalies met during extraction.
    pub warnings: Vec<String>,
}

impl ExtractedRecord {
    /// Empty record for `id` in `language`.
    pub fn new(id: impl Into<String>, language: Language) -> Self {
        Self {
            id: id.into(),
            language,
            localized_name: String::new(),
            faction_raw: None,
            rarity_raw: None,
            specialty_raw: None,
            attribute_raw: None,
            attack_type_raw: None,
            stats_raw: Vec::new(),
            level_table: LevelTable::new(),
            tags: BTreeSet::new(),
            icon_url: None,
            warnings: Vec::new(),
        }
    }
}

/// One value per supported language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Localized<T> {
    #[serde(rename = "zh-cn")]
    pub zh_cn: T,
    #[serde(rename = "en-us")]
    pub en_us: T,
}

impl<T> Localized<T> {
    #[must_use]
    pub fn get(&self, language: Language) -> &T {
        match language {
            Language::ZhCn => &self.zh_cn,
            Language::EnUs => &self.en_us,
        }
    }

    pub fn get_mut(&mut self, language: Language) -> &mut T {
        match language {
            Language::ZhCn => &mut self.zh_cn,
            Language::EnUs => &mut self.en_us,
        }
    }
}

/// Bilingual record assembled from per-language extractions.
///
/// Non-localized fields come from the primary language only.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub id: String,
    pub remote_id: u64,
    pub kind: EntityKind,
    pub name: Localized<String>,
    pub faction_raw: Option<String>,
    pub faction_id: Option<u32>,
    pub rarity_raw: Option<String>,
    pub specialty_raw: Option<String>,
    pub attribute_raw: Option<String>,
    pub attack_type_raw: Option<String>,
    pub tags: BTreeSet<Attribute>,
    pub level_table: LevelTable,
    pub icon_url: Option<String>,
    /// Languages whose localized fields were filled from the primary language.
    pub fallback_languages: Vec<Language>,
}

impl MergedRecord {
    /// Values of a stat at every checkpoint that has one, ascending by level.
    #[must_use]
    pub fn scaling_series(&self, stat: StatKind) -> Vec<f64> {
        self.level_table
            .values()
            .filter_map(|block| block.get(stat))
            .collect()
    }

    /// Value of a flat stat, read from the highest checkpoint that carries it.
    #[must_use]
    pub fn scalar(&self, stat: StatKind) -> Option<f64> {
        self.level_table
            .values()
            .rev()
            .find_map(|block| block.get(stat))
    }
}

/// Fixed-shape stats of a validated record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStats {
    pub hp: [f64; CHECKPOINT_COUNT],
    pub atk: [f64; CHECKPOINT_COUNT],
    pub def: [f64; CHECKPOINT_COUNT],
    pub impact: f64,
    pub crit_rate: f64,
    pub crit_dmg: f64,
    pub anomaly_mastery: f64,
    pub anomaly_proficiency: f64,
    pub pen_ratio: f64,
    pub energy: f64,
}

/// Final, validated dataset record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRecord {
    pub id: String,
    pub remote_id: u64,
    pub kind: EntityKind,
    pub name: Localized<String>,
    pub rarity: Rarity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialty: Option<Specialty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_type: Option<AttackType>,
    pub tags: BTreeSet<Attribute>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faction_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DomainStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}
