//! Structural validation of merged records.
//!
//! [`validate`] reports every problem with a record at once and never fails;
//! [`finalize`] turns a valid record into the typed [`DomainRecord`].

use std::fmt;

use crate::model::vocab::{CHECKPOINT_COUNT, MAX_FACTION_ID};
use crate::model::{
    AttackType, Attribute, DomainRecord, DomainStats, Language, MergedRecord, Rarity, Specialty,
    StatKind,
};

/// Stats that scale with level and must be present at every checkpoint.
const SCALING_STATS: [StatKind; 3] = [StatKind::Hp, StatKind::Atk, StatKind::Def];

/// Stats read once from the table.
const SCALAR_STATS: [StatKind; 7] = [
    StatKind::Impact,
    StatKind::CritRate,
    StatKind::CritDmg,
    StatKind::AnomalyMastery,
    StatKind::AnomalyProficiency,
    StatKind::PenRatio,
    StatKind::EnergyRegen,
];

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Output field the check concerns.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Verdict on one record. `is_valid` is true exactly when `errors` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// All issues joined into one line.
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Checks a merged record against the dataset's structural rules.
#[must_use]
pub fn validate(record: &MergedRecord) -> ValidationResult {
    let mut errors = Vec::new();
    let character = record.kind.is_character_like();

    for language in Language::ALL {
        if record.name.get(language).trim().is_empty() {
            errors.push(ValidationIssue::new(
                format!("name.{language}"),
                "localized name is empty",
            ));
        }
    }

    match record.rarity_raw.as_deref() {
        Some(raw) if Rarity::parse(raw).is_none() => errors.push(ValidationIssue::new(
            "rarity",
            format!("'{raw}' is not a known rarity"),
        )),
        Some(_) => {}
        None => errors.push(ValidationIssue::new("rarity", "missing")),
    }

    check_vocab(
        &mut errors,
        "specialty",
        record.specialty_raw.as_deref(),
        character,
        |raw| Specialty::parse(raw).is_some(),
    );
    check_vocab(
        &mut errors,
        "attribute",
        record.attribute_raw.as_deref(),
        character,
        |raw| Attribute::parse(raw).is_some(),
    );
    check_vocab(
        &mut errors,
        "attackType",
        record.attack_type_raw.as_deref(),
        character,
        |raw| AttackType::parse(raw).is_some(),
    );

    if character {
        match record.faction_id {
            Some(id) if (1..=MAX_FACTION_ID).contains(&id) => {}
            Some(id) => errors.push(ValidationIssue::new(
                "factionId",
                format!("{id} is outside 1..={MAX_FACTION_ID}"),
            )),
            None => errors.push(ValidationIssue::new(
                "factionId",
                format!(
                    "faction '{}' is not recognized",
                    record.faction_raw.as_deref().unwrap_or_default()
                ),
            )),
        }
    }

    if character || !record.level_table.is_empty() {
        check_stats(record, character, &mut errors);
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

fn check_vocab(
    errors: &mut Vec<ValidationIssue>,
    field: &str,
    raw: Option<&str>,
    required: bool,
    known: impl Fn(&str) -> bool,
) {
    match raw {
        Some(raw) if !known(raw) => errors.push(ValidationIssue::new(
            field,
            format!("'{raw}' is not a known value"),
        )),
        Some(_) => {}
        None if required => errors.push(ValidationIssue::new(field, "missing")),
        None => {}
    }
}

/// Characters must carry every stat. Other kinds carry a subset: each
/// level-scaling stat they have must be complete, and at least one must exist.
fn check_stats(record: &MergedRecord, character: bool, errors: &mut Vec<ValidationIssue>) {
    let mut carried = 0;
    for stat in SCALING_STATS {
        let actual = record.scaling_series(stat).len();
        if actual > 0 {
            carried += 1;
        }
        if actual == CHECKPOINT_COUNT || (!character && actual == 0) {
            continue;
        }
        errors.push(ValidationIssue::new(
            format!("stats.{}", stat.field_name()),
            format!("expected {CHECKPOINT_COUNT} checkpoint values, found {actual}"),
        ));
    }
    if !character {
        if carried == 0 {
            errors.push(ValidationIssue::new(
                "stats",
                "level table has no level-scaling stat",
            ));
        }
        return;
    }
    for stat in SCALAR_STATS {
        if record.scalar(stat).is_none() {
            errors.push(ValidationIssue::new(
                format!("stats.{}", stat.field_name()),
                "missing",
            ));
        }
    }
}

/// Builds the domain record from a merged record that passes [`validate`].
///
/// Entries other than characters carry no stats when their level table is
/// empty. Stats such an entry does not carry are written as zeros.
///
/// # Errors
///
/// Returns the [`ValidationResult`] when the record is not valid.
pub fn finalize(record: MergedRecord) -> Result<DomainRecord, ValidationResult> {
    let verdict = validate(&record);
    if !verdict.is_valid {
        return Err(verdict);
    }
    // Checked by `validate`.
    let Some(rarity) = record.rarity_raw.as_deref().and_then(Rarity::parse) else {
        return Err(verdict);
    };

    let stats = if record.level_table.is_empty() {
        None
    } else {
        Some(DomainStats {
            hp: series(&record, StatKind::Hp),
            atk: series(&record, StatKind::Atk),
            def: series(&record, StatKind::Def),
            impact: record.scalar(StatKind::Impact).unwrap_or_default(),
            crit_rate: record.scalar(StatKind::CritRate).unwrap_or_default(),
            crit_dmg: record.scalar(StatKind::CritDmg).unwrap_or_default(),
            anomaly_mastery: record.scalar(StatKind::AnomalyMastery).unwrap_or_default(),
            anomaly_proficiency: record
                .scalar(StatKind::AnomalyProficiency)
                .unwrap_or_default(),
            pen_ratio: record.scalar(StatKind::PenRatio).unwrap_or_default(),
            energy: record.scalar(StatKind::EnergyRegen).unwrap_or_default(),
        })
    };

    Ok(DomainRecord {
        specialty: record.specialty_raw.as_deref().and_then(Specialty::parse),
        attribute: record.attribute_raw.as_deref().and_then(Attribute::parse),
        attack_type: record.attack_type_raw.as_deref().and_then(AttackType::parse),
        faction_id: record.faction_id,
        stats,
        rarity,
        id: record.id,
        remote_id: record.remote_id,
        kind: record.kind,
        name: record.name,
        tags: record.tags,
        icon_url: record.icon_url,
    })
}

fn series(record: &MergedRecord, stat: StatKind) -> [f64; CHECKPOINT_COUNT] {
    let mut values = [0.0; CHECKPOINT_COUNT];
    for (slot, value) in values.iter_mut().zip(record.scaling_series(stat)) {
        *slot = value;
    }
    values
}
