//! Fixtures and their lifecycle.
//!
//! `Scheduled -> Played` is terminal. `Scheduled -> Postponed` parks a fixture until it is
//! rearranged (`Postponed -> Scheduled`) or a result is entered directly.

use crate::ids::{ClubId, DivisionId, FixtureId};
use crate::report::MatchReport;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which competition a fixture belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Competition {
    League { division: DivisionId },
    Cup { round: u8 },
}

/// How a result came to be.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultOrigin {
    Simulated { seed: u64 },
    Manual,
    Corrected,
}

/// A final score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FixtureResult {
    pub home_goals: u8,
    pub away_goals: u8,
    pub penalties: Option<(u8, u8)>,
    pub origin: ResultOrigin,
    pub report: Option<MatchReport>,
}

/// Lifecycle state of a fixture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FixtureStatus {
    Scheduled,
    Postponed,
    Played(FixtureResult),
}

/// A single match between two clubs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub season: u32,
    pub competition: Competition,
    /// League round, or cup round number.
    pub round: u32,
    pub date: NaiveDate,
    pub home: ClubId,
    pub away: ClubId,
    pub status: FixtureStatus,
}

impl Fixture {
    /// Whether a result exists.
    pub fn is_played(&self) -> bool {
        matches!(self.status, FixtureStatus::Played(_))
    }

    /// The result, when played.
    pub fn result(&self) -> Option<&FixtureResult> {
        match &self.status {
            FixtureStatus::Played(r) => Some(r),
            _ => None,
        }
    }

    /// Whether the club is one of the two sides.
    pub fn involves(&self, club: ClubId) -> bool {
        self.home == club || self.away == club
    }

    /// League fixture of the given division.
    pub fn is_league_in(&self, division: DivisionId) -> bool {
        self.competition == Competition::League { division }
    }

    /// Winner after extra steps such as penalties. `None` for draws or unplayed fixtures.
    pub fn winner(&self) -> Option<ClubId> {
        let r = self.result()?;
        let (h, a) = match r.penalties {
            Some((ph, pa)) if r.home_goals == r.away_goals => (ph, pa),
            _ => (r.home_goals, r.away_goals),
        };
        match h.cmp(&a) {
            std::cmp::Ordering::Greater => Some(self.home),
            std::cmp::Ordering::Less => Some(self.away),
            std::cmp::Ordering::Equal => None,
        }
    }
}
