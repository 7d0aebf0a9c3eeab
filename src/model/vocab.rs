//! Closed vocabularies: checkpoints, stats, and categorical fields.
//!
//! Every categorical value that reaches a [`DomainRecord`](super::DomainRecord)
//! is one of the enums below. Raw strings from either supported language are
//! mapped through `parse` functions that return `None` for anything outside the
//! vocabulary, which the validator reports as an error.

use serde::Serialize;

use super::Language;

/// Progression levels at which level-scaling stats are sampled, ascending.
pub const CHECKPOINTS: [u32; 7] = [1, 10, 20, 30, 40, 50, 60];

/// Number of checkpoints every level-scaling array must hold.
pub const CHECKPOINT_COUNT: usize = CHECKPOINTS.len();

/// Highest faction id assigned by [`faction_id`].
pub const MAX_FACTION_ID: u32 = 11;

/// Maps a level-table row label to a checkpoint level.
///
/// Accepts bare numbers (`"10"`) and `Lv`-prefixed labels (`"Lv.10"`, `"Lv. 10"`).
/// Labels with ascension markers (`"10+"`) or levels outside [`CHECKPOINTS`]
/// are not checkpoints.
#[must_use]
pub fn checkpoint_from_label(label: &str) -> Option<u32> {
    let trimmed = label.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let digits = lowered
        .strip_prefix("lv")
        .map_or(lowered.as_str(), |rest| rest.trim_start_matches('.').trim());
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let level: u32 = digits.parse().ok()?;
    CHECKPOINTS.contains(&level).then_some(level)
}

/// The ten stats sampled at every checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StatKind {
    Hp,
    Atk,
    Def,
    Impact,
    CritRate,
    CritDmg,
    AnomalyMastery,
    AnomalyProficiency,
    PenRatio,
    EnergyRegen,
}

impl StatKind {
    /// All stats, in table order.
    pub const ALL: [StatKind; 10] = [
        StatKind::Hp,
        StatKind::Atk,
        StatKind::Def,
        StatKind::Impact,
        StatKind::CritRate,
        StatKind::CritDmg,
        StatKind::AnomalyMastery,
        StatKind::AnomalyProficiency,
        StatKind::PenRatio,
        StatKind::EnergyRegen,
    ];

    /// Output field name.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Hp => "hp",
            Self::Atk => "atk",
            Self::Def => "def",
            Self::Impact => "impact",
            Self::CritRate => "critRate",
            Self::CritDmg => "critDmg",
            Self::AnomalyMastery => "anomalyMastery",
            Self::AnomalyProficiency => "anomalyProficiency",
            Self::PenRatio => "penRatio",
            Self::EnergyRegen => "energy",
        }
    }

    /// Stat labels used by the level table in the given language.
    #[must_use]
    pub fn labels(self, language: Language) -> &'static [&'static str] {
        match (self, language) {
            (Self::Hp, Language::ZhCn) => &["生命值", "基础生命值"],
            (Self::Atk, Language::ZhCn) => &["攻击力", "基础攻击力"],
            (Self::Def, Language::ZhCn) => &["防御力", "基础防御力"],
            (Self::Impact, Language::ZhCn) => &["冲击力"],
            (Self::CritRate, Language::ZhCn) => &["暴击率"],
            (Self::CritDmg, Language::ZhCn) => &["暴击伤害"],
            (Self::AnomalyMastery, Language::ZhCn) => &["异常掌控"],
            (Self::AnomalyProficiency, Language::ZhCn) => &["异常精通"],
            (Self::PenRatio, Language::ZhCn) => &["穿透率"],
            (Self::EnergyRegen, Language::ZhCn) => &["能量自动回复", "能量回复"],
            (Self::Hp, Language::EnUs) => &["HP", "Base HP"],
            (Self::Atk, Language::EnUs) => &["ATK", "Base ATK"],
            (Self::Def, Language::EnUs) => &["DEF", "Base DEF"],
            (Self::Impact, Language::EnUs) => &["Impact"],
            (Self::CritRate, Language::EnUs) => &["CRIT Rate"],
            (Self::CritDmg, Language::EnUs) => &["CRIT DMG"],
            (Self::AnomalyMastery, Language::EnUs) => &["Anomaly Mastery"],
            (Self::AnomalyProficiency, Language::EnUs) => &["Anomaly Proficiency"],
            (Self::PenRatio, Language::EnUs) => &["PEN Ratio"],
            (Self::EnergyRegen, Language::EnUs) => &["Energy Regen", "Energy Generation"],
        }
    }

    /// Resolves a level-table stat label (case-insensitive).
    #[must_use]
    pub fn from_label(label: &str, language: Language) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|stat| {
            stat.labels(language)
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(label))
        })
    }
}

/// Entity rarity. Only A and S ranks exist for entries in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Rarity {
    A,
    S,
}

impl Rarity {
    /// Parses `"S"`, `"S级"`, `"S-Rank"`, `"Rank S"` and similar forms.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        let core = upper
            .trim_end_matches('级')
            .trim_end_matches("-RANK")
            .trim_end_matches(" RANK")
            .trim_start_matches("RANK")
            .trim_start_matches(['-', ' '])
            .trim();
        match core {
            "S" => Some(Self::S),
            "A" => Some(Self::A),
            _ => None,
        }
    }
}

/// Combat specialty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialty {
    Attack,
    Stun,
    Anomaly,
    Support,
    Defense,
    Rupture,
}

impl Specialty {
    const TERMS: [(Specialty, &'static str, &'static str); 6] = [
        (Specialty::Attack, "强攻", "attack"),
        (Specialty::Stun, "击破", "stun"),
        (Specialty::Anomaly, "异常", "anomaly"),
        (Specialty::Support, "支援", "support"),
        (Specialty::Defense, "防护", "defense"),
        (Specialty::Rupture, "命破", "rupture"),
    ];

    /// Parses a specialty term in either supported language.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        Self::TERMS
            .iter()
            .find(|(_, zh, en)| lowered == *zh || lowered == *en)
            .map(|(specialty, _, _)| *specialty)
    }
}

/// Damage attribute. Also the vocabulary for free-text attribute tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    Physical,
    Fire,
    Ice,
    Electric,
    Ether,
}

impl Attribute {
    const TERMS: [(Attribute, &'static str, &'static str); 5] = [
        (Attribute::Physical, "物理", "physical"),
        (Attribute::Fire, "火", "fire"),
        (Attribute::Ice, "冰", "ice"),
        (Attribute::Electric, "电", "electric"),
        (Attribute::Ether, "以太", "ether"),
    ];

    /// Parses `"火"`, `"火属性"`, `"Fire"`, `"Fire Attribute"` and similar forms.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        let core = lowered
            .trim_end_matches("属性")
            .trim_end_matches(" attribute")
            .trim();
        Self::TERMS
            .iter()
            .find(|(_, zh, en)| core == *zh || core == *en)
            .map(|(attribute, _, _)| *attribute)
    }
}

/// Attack type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackType {
    Strike,
    Slash,
    Pierce,
}

impl AttackType {
    const TERMS: [(AttackType, &'static str, &'static str); 3] = [
        (AttackType::Strike, "打击", "strike"),
        (AttackType::Slash, "斩击", "slash"),
        (AttackType::Pierce, "穿透", "pierce"),
    ];

    /// Parses an attack-type term in either supported language.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_lowercase();
        Self::TERMS
            .iter()
            .find(|(_, zh, en)| lowered == *zh || lowered == *en)
            .map(|(attack_type, _, _)| *attack_type)
    }
}

/// Faction names and their stable ids, `(id, zh-cn, en-us)`.
const FACTIONS: [(u32, &str, &str); 11] = [
    (1, "狡兔屋", "Cunning Hares"),
    (2, "维多利亚家政", "Victoria Housekeeping"),
    (3, "白祇重工", "Belobog Heavy Industries"),
    (4, "卡吕冬之子", "Sons of Calydon"),
    (5, "奥波勒斯小队", "Obol Squad"),
    (6, "对空洞特别行动部第六课", "Hollow Special Operations Section 6"),
    (7, "刑侦特勤组", "Criminal Investigation Special Response Team"),
    (8, "天琴座", "Stars of Lyra"),
    (9, "反舌鸟", "Mockingbird"),
    (10, "云岿山", "Yunkui Summit"),
    (11, "怪啖屋", "Spook Shack"),
];

/// Resolves a faction name in either language to its id.
#[must_use]
pub fn faction_id(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    FACTIONS
        .iter()
        .find(|(_, zh, en)| trimmed == *zh || trimmed.eq_ignore_ascii_case(en))
        .map(|(id, _, _)| *id)
}
