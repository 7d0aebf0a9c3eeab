//! Checkpoint selection over the level-table component.
//!
//! A level table has one row per level label, including intermediate levels
//! and ascension rows (`"10+"`). Only rows labelled with a checkpoint level are
//! sampled. Each stat cell holds up to two values: the value before ascending
//! at that level and the value after. The post-ascension value is used, except
//! at level 1 where rows often carry only the base value.

use tracing::{debug, warn};

use crate::model::payload::{LEVEL_TABLE_COMPONENT, LevelTableDoc, WikiPage};
use crate::model::vocab::checkpoint_from_label;
use crate::model::{Language, LevelStatRow, LevelTable, StatKind, StatPair};

use super::ExtractionError;

/// Reads the level rows of a page.
///
/// Returns an empty list when the component is absent and not `required`.
///
/// # Errors
///
/// Returns [`ExtractionError::MissingComponent`] when a required table is
/// absent, and [`ExtractionError::MalformedComponent`] when it cannot be decoded.
pub fn read_level_rows(
    page: &WikiPage,
    language: Language,
    required: bool,
) -> Result<Vec<LevelStatRow>, ExtractionError> {
    let Some(component) = page.component(LEVEL_TABLE_COMPONENT) else {
        if required {
            return Err(ExtractionError::missing_component(
                LEVEL_TABLE_COMPONENT,
                language,
            ));
        }
        return Ok(Vec::new());
    };

    let doc: LevelTableDoc = component
        .decode()
        .map_err(|e| ExtractionError::malformed(LEVEL_TABLE_COMPONENT, language, e))?;
    Ok(doc.list.into_iter().map(LevelStatRow::from).collect())
}

/// Samples the ten stats at every checkpoint row present in `rows`.
///
/// The first row for a checkpoint wins. Stat labels outside the language's
/// vocabulary are ignored. A value that is present but unparsable becomes
/// `0.0` and leaves a warning.
pub fn select_checkpoints(
    rows: &[LevelStatRow],
    language: Language,
    warnings: &mut Vec<String>,
) -> LevelTable {
    let mut table = LevelTable::new();

    for row in rows {
        let Some(level) = checkpoint_from_label(&row.level_key) else {
            continue;
        };
        if table.contains_key(&level) {
            debug!(level, "duplicate checkpoint row ignored");
            continue;
        }

        let block = table.entry(level).or_default();
        for (label, pair) in &row.stat_entries {
            let Some(stat) = StatKind::from_label(label, language) else {
                debug!(label = %label, "unknown stat label ignored");
                continue;
            };
            let Some(raw) = checkpoint_value(pair, level) else {
                let message = format!("level {level}: no usable value for {}", stat.field_name());
                warn!(%language, "{message}");
                warnings.push(message);
                continue;
            };
            let value = parse_stat_value(raw).unwrap_or_else(|| {
                let message = format!(
                    "level {level}: unparsable {} value '{raw}', using 0",
                    stat.field_name()
                );
                warn!(%language, "{message}");
                warnings.push(message);
                0.0
            });
            block.set(stat, value);
        }
    }

    table
}

/// Picks the raw value for a checkpoint: post-value, or at level 1 the lone
/// pre-value.
fn checkpoint_value(pair: &StatPair, level: u32) -> Option<&str> {
    let after = pair.after.as_deref().filter(|v| is_present(v));
    if level == 1 {
        after.or_else(|| pair.before.as_deref().filter(|v| is_present(v)))
    } else {
        after
    }
}

fn is_present(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed != "-"
}

/// Parses a displayed stat value, ignoring `%`, thousands separators,
/// whitespace, and a trailing `+`.
#[must_use]
pub fn parse_stat_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('+')
        .chars()
        .filter(|c| !matches!(c, '%' | '％' | ',') && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
