#![deny(warnings)]

//! Save slots for careers.
//!
//! A slot holds one career wrapped in a [`SaveEnvelope`]. [`FsStore`] keeps one JSON file per
//! slot and replaces it atomically; [`MemoryStore`] behaves the same without touching disk and
//! backs demo mode and tests.

mod fs_store;
mod memory;

pub use fs_store::FsStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use league_core::{Career, CareerId, ClubId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Version written into every envelope. Older or newer files are refused.
pub const FORMAT_VERSION: u32 = 1;

/// Errors raised by a [`SaveStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no save slot for career {0}")]
    NotFound(CareerId),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save slot {id} is corrupt: {reason}")]
    Corrupt { id: CareerId, reason: String },
    #[error("save slot {id} has format version {found}, expected {expected}")]
    VersionMismatch {
        id: CareerId,
        found: u32,
        expected: u32,
    },
    #[error("invalid save slot id '{0}'")]
    InvalidSlot(String),
}

/// What goes on disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveEnvelope {
    pub format_version: u32,
    pub saved_at: DateTime<Utc>,
    pub career: Career,
}

impl SaveEnvelope {
    /// Wrap a career with the current time and format version.
    pub fn new(career: Career) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            saved_at: Utc::now(),
            career,
        }
    }

    fn summary(&self) -> SlotSummary {
        let meta = &self.career.meta;
        SlotSummary {
            id: meta.id.clone(),
            name: meta.name.clone(),
            managed_club: meta.managed_club,
            season: self.career.graph.season.number,
            revision: meta.revision,
            saved_at: self.saved_at,
        }
    }
}

/// Listing entry for a slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSummary {
    pub id: CareerId,
    pub name: String,
    pub managed_club: Option<ClubId>,
    pub season: u32,
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
}

/// Storage backend for career slots.
pub trait SaveStore: Send + Sync {
    /// Every readable slot, most recently saved first.
    fn list(&self) -> Result<Vec<SlotSummary>, StoreError>;
    /// Load the career stored under `id`.
    fn read(&self, id: &CareerId) -> Result<Career, StoreError>;
    /// Store a career under its own id, replacing the slot atomically.
    fn write(&self, career: &Career) -> Result<SlotSummary, StoreError>;
    /// Remove a slot.
    fn delete(&self, id: &CareerId) -> Result<(), StoreError>;
    /// Whether a slot exists.
    fn exists(&self, id: &CareerId) -> bool;
}

/// Refuse ids that cannot be used as a file name.
pub fn check_slot_id(id: &CareerId) -> Result<(), StoreError> {
    let s = id.as_str();
    let ok = !s.is_empty()
        && s.len() <= 64
        && s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidSlot(s.to_string()))
    }
}

/// Lower-case slot name derived from a display name: runs of other characters become `-`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_end_matches('-');
    if out.is_empty() {
        "save".to_string()
    } else {
        out.chars().take(48).collect()
    }
}

fn decode(id: &CareerId, text: &str) -> Result<SaveEnvelope, StoreError> {
    let envelope: SaveEnvelope =
        serde_json::from_str(text).map_err(|e| StoreError::Corrupt {
            id: id.clone(),
            reason: e.to_string(),
        })?;
    if envelope.format_version != FORMAT_VERSION {
        return Err(StoreError::VersionMismatch {
            id: id.clone(),
            found: envelope.format_version,
            expected: FORMAT_VERSION,
        });
    }
    if envelope.career.meta.id != *id {
        return Err(StoreError::Corrupt {
            id: id.clone(),
            reason: format!("slot holds career {}", envelope.career.meta.id),
        });
    }
    Ok(envelope)
}

fn encode(envelope: &SaveEnvelope) -> Result<String, StoreError> {
    serde_json::to_string_pretty(envelope).map_err(|e| StoreError::Corrupt {
        id: envelope.career.meta.id.clone(),
        reason: e.to_string(),
    })
}

fn sort_summaries(list: &mut [SlotSummary]) {
    list.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then(a.id.cmp(&b.id)));
}

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{NaiveDate, Utc};
    use league_core::{
        Calendar, Career, CareerId, CareerMeta, EntityGraph, IdAllocator, League, LeagueRules,
        Ledger, Mailbox, Season, SeasonPhase, TrainingBook, TransferMarket, YouthAcademy,
    };
    use std::collections::BTreeMap;

    pub(crate) fn career(id: &str, name: &str) -> Career {
        let start = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();
        Career {
            meta: CareerMeta {
                id: CareerId::from(id),
                name: name.into(),
                managed_club: None,
                revision: 0,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            graph: EntityGraph {
                seed: 1,
                league: League {
                    name: "Test League".into(),
                    rules: LeagueRules {
                        double_round_robin: true,
                        promotion_slots: 1,
                        cup: false,
                        youth_pool_size: 3,
                    },
                    divisions: vec![],
                },
                clubs: BTreeMap::new(),
                players: BTreeMap::new(),
                fixtures: BTreeMap::new(),
                season: Season {
                    number: 1,
                    start_date: start,
                    phase: SeasonPhase::NotStarted,
                    calendar: Calendar {
                        today: start,
                        week: 1,
                        round: 1,
                    },
                    cup: None,
                },
                market: TransferMarket::default(),
                ledger: Ledger::default(),
                youth: YouthAcademy::default(),
                training: TrainingBook::default(),
                mailbox: Mailbox::default(),
                history: vec![],
                ids: IdAllocator::default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slugs_are_file_safe() {
        assert_eq!(slugify("My First Career!"), "my-first-career");
        assert_eq!(slugify("  --  "), "save");
        assert_eq!(slugify("Rival FC / 2025"), "rival-fc-2025");
    }

    #[test]
    fn slot_ids_are_checked() {
        assert!(check_slot_id(&CareerId::from("c-1a2b3c4d")).is_ok());
        assert!(matches!(
            check_slot_id(&CareerId::from("../etc/passwd")),
            Err(StoreError::InvalidSlot(_))
        ));
        assert!(check_slot_id(&CareerId::from("")).is_err());
    }

    #[test]
    fn decode_refuses_other_versions_and_foreign_ids() {
        let mut env = SaveEnvelope::new(testutil::career("c-1", "One"));
        env.format_version = 99;
        let text = encode(&env).unwrap();
        assert!(matches!(
            decode(&CareerId::from("c-1"), &text),
            Err(StoreError::VersionMismatch { found: 99, .. })
        ));
        env.format_version = FORMAT_VERSION;
        let text = encode(&env).unwrap();
        assert!(matches!(
            decode(&CareerId::from("c-2"), &text),
            Err(StoreError::Corrupt { .. })
        ));
        assert!(matches!(
            decode(&CareerId::from("c-1"), "{not json"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    proptest! {
        #[test]
        fn slugs_always_pass_the_slot_check(name in ".{0,80}") {
            let slug = slugify(&name);
            let id = CareerId(format!("c-{slug}"));
            prop_assert!(check_slot_id(&id).is_ok());
        }
    }
}
