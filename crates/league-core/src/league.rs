//! League structure: an ordered pyramid of divisions.

use crate::ids::{ClubId, DivisionId};
use serde::{Deserialize, Serialize};

/// Competition rules fixed at career creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueRules {
    /// Home and away against every opponent.
    pub double_round_robin: bool,
    /// Clubs swapped between adjacent divisions each season.
    pub promotion_slots: u8,
    /// Whether a knockout cup runs alongside the league.
    pub cup: bool,
    /// Candidates offered to each club at a youth intake.
    pub youth_pool_size: u8,
}

/// One level of the pyramid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: DivisionId,
    pub name: String,
    /// 1 is the top level.
    pub level: u8,
    /// Member clubs, in seeding order.
    pub clubs: Vec<ClubId>,
}

/// The league and its divisions, top level first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub name: String,
    pub rules: LeagueRules,
    pub divisions: Vec<Division>,
}

impl League {
    /// Look up a division by id.
    pub fn division(&self, id: DivisionId) -> Option<&Division> {
        self.divisions.iter().find(|d| d.id == id)
    }

    /// The division a club currently plays in.
    pub fn division_of(&self, club: ClubId) -> Option<&Division> {
        self.divisions.iter().find(|d| d.clubs.contains(&club))
    }

    /// Every club, top division first.
    pub fn club_ids(&self) -> Vec<ClubId> {
        self.divisions
            .iter()
            .flat_map(|d| d.clubs.iter().copied())
            .collect()
    }
}
