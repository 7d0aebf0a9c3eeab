//! Shared data model: source entries, payload schema, records, vocabularies.
//!
//! Lifecycle: [`SourceEntry`] → fetch → [`ExtractedRecord`] per language →
//! [`MergedRecord`] → validate → [`DomainRecord`]. Only the domain record
//! survives a run.

mod entry;
pub mod payload;
mod record;
pub mod vocab;

pub use entry::{EntityKind, Language, SourceEntry};
pub use payload::{LevelStatRow, RawPayload, StatPair};
pub use record::{
    DomainRecord, DomainStats, ExtractedRecord, LevelTable, Localized, MergedRecord, StatBlock,
};
pub use vocab::{AttackType, Attribute, CHECKPOINTS, Rarity, Specialty, StatKind};
