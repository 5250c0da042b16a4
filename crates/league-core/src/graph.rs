//! The entity graph and the career aggregate that owns it.

use crate::club::Club;
use crate::fixture::Fixture;
use crate::ids::{CareerId, ClubId, DivisionId, FixtureId, IdAllocator, PlayerId};
use crate::league::League;
use crate::ledger::{Ledger, Money};
use crate::mail::Mailbox;
use crate::market::TransferMarket;
use crate::player::Player;
use crate::season::{Season, SeasonReport};
use crate::standings::{compute_table, player_stats, PlayerSeasonStats, TableRow};
use crate::training::TrainingBook;
use crate::youth::YouthAcademy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identity and bookkeeping of a career.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerMeta {
    pub id: CareerId,
    pub name: String,
    /// Club controlled by the human manager.
    pub managed_club: Option<ClubId>,
    /// Incremented on every committed transaction.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Root aggregate: exactly one graph per career.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Career {
    pub meta: CareerMeta,
    pub graph: EntityGraph,
}

/// All state of one career, related by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityGraph {
    /// Root seed; every random draw in the career derives from it.
    pub seed: u64,
    pub league: League,
    pub clubs: BTreeMap<ClubId, Club>,
    pub players: BTreeMap<PlayerId, Player>,
    pub fixtures: BTreeMap<FixtureId, Fixture>,
    pub season: Season,
    pub market: TransferMarket,
    pub ledger: Ledger,
    pub youth: YouthAcademy,
    #[serde(default)]
    pub training: TrainingBook,
    pub mailbox: Mailbox,
    pub history: Vec<SeasonReport>,
    pub ids: IdAllocator,
}

impl EntityGraph {
    /// Case-insensitive club lookup by name.
    pub fn club_by_name(&self, name: &str) -> Option<&Club> {
        self.clubs
            .values()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Players on a club's books, by id.
    pub fn squad(&self, club: ClubId) -> Vec<&Player> {
        self.players
            .values()
            .filter(|p| p.club == Some(club))
            .collect()
    }

    /// Ids of a club's players.
    pub fn squad_ids(&self, club: ClubId) -> BTreeSet<PlayerId> {
        self.players
            .values()
            .filter(|p| p.club == Some(club))
            .map(|p| p.id)
            .collect()
    }

    /// Current cash of a club.
    pub fn cash(&self, club: ClubId) -> Money {
        self.ledger.balance(club)
    }

    /// Club name or a placeholder for unknown ids.
    pub fn club_name(&self, club: ClubId) -> String {
        self.clubs
            .get(&club)
            .map_or_else(|| club.to_string(), |c| c.name.clone())
    }

    /// Fixtures of the current season, in id order.
    pub fn season_fixtures(&self) -> impl Iterator<Item = &Fixture> + '_ {
        let season = self.season.number;
        self.fixtures.values().filter(move |f| f.season == season)
    }

    /// Live table of a division for the current season.
    pub fn table(&self, division: DivisionId) -> Vec<TableRow> {
        let Some(div) = self.league.division(division) else {
            return Vec::new();
        };
        compute_table(
            &div.clubs,
            self.season_fixtures().filter(|f| f.is_league_in(division)),
            |c| self.club_name(c),
        )
    }

    /// Player statistics for the current season, all competitions.
    pub fn season_stats(&self) -> BTreeMap<PlayerId, PlayerSeasonStats> {
        player_stats(self.season_fixtures())
    }

    /// Move a player to a new owner in one step, clearing stale tactical references and
    /// cancelling training the old club paid for.
    pub fn relocate_player(&mut self, player: PlayerId, to: Option<ClubId>) -> Option<ClubId> {
        let p = self.players.get_mut(&player)?;
        let from = p.club;
        p.club = to;
        if let Some(old) = from.filter(|old| Some(*old) != to) {
            if let Some(club) = self.clubs.get_mut(&old) {
                club.tactics.forget_player(player);
            }
            self.training.cancel_for(player);
        }
        from
    }

    /// Lowest free shirt number in a club.
    pub fn free_shirt_number(&self, club: ClubId) -> u8 {
        let taken: BTreeSet<u8> = self.squad(club).iter().map(|p| p.shirt_number).collect();
        (1..=99).find(|n| !taken.contains(n)).unwrap_or(99)
    }
}
