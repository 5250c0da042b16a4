//! Youth intake pools.

use crate::ids::{ClubId, PlayerId};
use crate::ledger::Money;
use crate::player::{PlayerTrait, Position};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A junior offered to a club at intake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YouthCandidate {
    pub first_name: String,
    pub last_name: String,
    pub age: u8,
    pub position: Position,
    pub skill: u8,
    pub hidden: u8,
    pub traits: Vec<PlayerTrait>,
    pub signing_fee: Money,
}

/// What became of a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Candidate,
    Accepted { player: PlayerId },
    Rejected,
}

/// A fixed position in the pool; slots are never removed, only consumed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YouthSlot {
    pub candidate: YouthCandidate,
    pub status: SlotStatus,
}

/// One club's intake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YouthPool {
    /// Season in which the intake happened.
    pub season: u32,
    pub slots: Vec<YouthSlot>,
}

impl YouthPool {
    /// Candidates still open for a decision.
    pub fn available(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.status == SlotStatus::Candidate)
            .count()
    }
}

/// Pools of every club. An intake replaces a club's pool wholesale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YouthAcademy {
    pub pools: BTreeMap<ClubId, YouthPool>,
}

impl YouthAcademy {
    /// Open candidates of a club.
    pub fn available(&self, club: ClubId) -> usize {
        self.pools.get(&club).map_or(0, YouthPool::available)
    }
}
