//! Clubs and their tactical setup.

use crate::ids::{ClubId, PlayerId};
use crate::ledger::Money;
use crate::player::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Players allowed on a club's books.
pub const MAX_SQUAD_SIZE: usize = 30;
/// A club may not sell below this many players.
pub const MIN_SQUAD_SIZE: usize = 14;
/// Size of a starting eleven.
pub const STARTING_ELEVEN: usize = 11;
/// Accepted tempo range, in percent of normal.
pub const TEMPO_RANGE: std::ops::RangeInclusive<u8> = 50..=150;

/// Supported formations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Formation {
    /// Balanced 4-4-2.
    #[serde(rename = "4-4-2")]
    F442,
    /// Defensive 4-5-1.
    #[serde(rename = "4-5-1")]
    F451,
    /// Attacking 4-3-3.
    #[serde(rename = "4-3-3")]
    F433,
    /// High-press 4-2-3-1.
    #[serde(rename = "4-2-3-1")]
    F4231,
    /// Counter-attacking 4-1-4-1.
    #[serde(rename = "4-1-4-1")]
    F4141,
}

impl Formation {
    /// All formations.
    pub const ALL: [Formation; 5] = [
        Formation::F442,
        Formation::F451,
        Formation::F433,
        Formation::F4231,
        Formation::F4141,
    ];

    /// Players per unit, indexed like [`Position::index`]. Always sums to eleven.
    pub fn slots(self) -> [usize; 4] {
        match self {
            Formation::F442 => [1, 4, 4, 2],
            Formation::F451 => [1, 4, 5, 1],
            Formation::F433 => [1, 4, 3, 3],
            Formation::F4231 => [1, 4, 5, 1],
            Formation::F4141 => [1, 4, 5, 1],
        }
    }

    /// Display label, e.g. "4-2-3-1".
    pub fn label(self) -> &'static str {
        match self {
            Formation::F442 => "4-4-2",
            Formation::F451 => "4-5-1",
            Formation::F433 => "4-3-3",
            Formation::F4231 => "4-2-3-1",
            Formation::F4141 => "4-1-4-1",
        }
    }
}

/// How hard the team goes into challenges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggression {
    Calm,
    Medium,
    Aggressive,
}

/// A club's tactical profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tactics {
    pub formation: Formation,
    pub aggression: Aggression,
    /// Percent of normal tempo, within [`TEMPO_RANGE`].
    pub tempo: u8,
    pub captain: Option<PlayerId>,
    /// Preferred starting eleven; empty means automatic selection.
    pub lineup: Vec<PlayerId>,
}

impl Default for Tactics {
    fn default() -> Self {
        Self {
            formation: Formation::F442,
            aggression: Aggression::Medium,
            tempo: 100,
            captain: None,
            lineup: Vec::new(),
        }
    }
}

impl Tactics {
    /// Drop every reference to a player who left the club.
    pub fn forget_player(&mut self, player: PlayerId) {
        self.lineup.retain(|p| *p != player);
        if self.captain == Some(player) {
            self.captain = None;
        }
    }
}

/// Why a tactical payload was refused.
#[derive(Debug, Error, PartialEq)]
pub enum TacticsError {
    #[error("tempo {0} is outside 50..=150")]
    TempoOutOfRange(u8),
    #[error("lineup lists {0} players, at most 11 are allowed")]
    LineupTooLong(usize),
    #[error("{0} appears twice in the lineup")]
    DuplicateInLineup(PlayerId),
    #[error("{0} is not in the squad")]
    NotInSquad(PlayerId),
}

/// Validate tactics against the ids of the club's squad.
pub fn check_tactics(tactics: &Tactics, squad: &BTreeSet<PlayerId>) -> Result<(), TacticsError> {
    if !TEMPO_RANGE.contains(&tactics.tempo) {
        return Err(TacticsError::TempoOutOfRange(tactics.tempo));
    }
    if tactics.lineup.len() > STARTING_ELEVEN {
        return Err(TacticsError::LineupTooLong(tactics.lineup.len()));
    }
    let mut seen = BTreeSet::new();
    for id in &tactics.lineup {
        if !seen.insert(*id) {
            return Err(TacticsError::DuplicateInLineup(*id));
        }
        if !squad.contains(id) {
            return Err(TacticsError::NotInSquad(*id));
        }
    }
    if let Some(captain) = tactics.captain {
        if !squad.contains(&captain) {
            return Err(TacticsError::NotInSquad(captain));
        }
    }
    Ok(())
}

/// Recurring income.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finances {
    /// Sponsorship income credited every calendar week.
    pub weekly_sponsorship: Money,
}

/// A club. Its squad and cash are derived from players and the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: ClubId,
    pub name: String,
    /// Three-letter abbreviation.
    pub short_name: String,
    pub finances: Finances,
    pub tactics: Tactics,
    /// Biases youth intake towards a position.
    pub youth_preference: Option<Position>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn squad(ids: &[u32]) -> BTreeSet<PlayerId> {
        ids.iter().map(|i| PlayerId(*i)).collect()
    }

    #[test]
    fn formations_field_eleven() {
        for f in Formation::ALL {
            assert_eq!(f.slots().iter().sum::<usize>(), STARTING_ELEVEN, "{}", f.label());
        }
    }

    #[test]
    fn rejects_outsiders_and_duplicates() {
        let mut t = Tactics {
            lineup: vec![PlayerId(1), PlayerId(9)],
            ..Tactics::default()
        };
        assert_eq!(
            check_tactics(&t, &squad(&[1, 2])),
            Err(TacticsError::NotInSquad(PlayerId(9)))
        );
        t.lineup = vec![PlayerId(1), PlayerId(1)];
        assert_eq!(
            check_tactics(&t, &squad(&[1, 2])),
            Err(TacticsError::DuplicateInLineup(PlayerId(1)))
        );
        t.lineup.clear();
        t.captain = Some(PlayerId(5));
        assert!(check_tactics(&t, &squad(&[1, 2])).is_err());
    }

    #[test]
    fn forget_player_clears_captaincy() {
        let mut t = Tactics {
            captain: Some(PlayerId(4)),
            lineup: vec![PlayerId(4), PlayerId(5)],
            ..Tactics::default()
        };
        t.forget_player(PlayerId(4));
        assert_eq!(t.captain, None);
        assert_eq!(t.lineup, vec![PlayerId(5)]);
    }

    proptest! {
        #[test]
        fn tempo_bounds(tempo in 0u8..=255) {
            let t = Tactics { tempo, ..Tactics::default() };
            let ok = check_tactics(&t, &BTreeSet::new()).is_ok();
            prop_assert_eq!(ok, (50..=150).contains(&tempo));
        }
    }
}
