//! Season lifecycle, calendar, cup bracket and archived season reports.

use crate::ids::{ClubId, DivisionId, FixtureId};
use crate::ledger::Money;
use crate::standings::TableRow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `NotStarted -> InProgress -> Ended`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeasonPhase {
    NotStarted,
    InProgress,
    Ended,
}

/// In-game clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Fixtures dated on or before this day are due.
    pub today: NaiveDate,
    /// Calendar week of the season, starting at 1.
    pub week: u32,
    /// Earliest league round that still has scheduled fixtures.
    pub round: u32,
}

/// A knockout pairing. `away == None` is a bye.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CupTie {
    pub home: ClubId,
    pub away: Option<ClubId>,
    pub fixture: Option<FixtureId>,
    pub winner: Option<ClubId>,
}

/// One round of the cup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CupRound {
    pub number: u8,
    pub name: String,
    pub date: NaiveDate,
    pub ties: Vec<CupTie>,
}

impl CupRound {
    /// Every tie has a winner.
    pub fn is_complete(&self) -> bool {
        self.ties.iter().all(|t| t.winner.is_some())
    }
}

/// Single-leg knockout cup for all clubs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cup {
    pub name: String,
    /// Entrants in seeding order.
    pub entrants: Vec<ClubId>,
    /// Rounds drawn so far; later rounds appear once the previous one completes.
    pub rounds: Vec<CupRound>,
    /// Total rounds the bracket needs.
    pub total_rounds: u8,
    /// Spacing between cup rounds, in league weeks.
    pub interval_weeks: u32,
    pub winner: Option<ClubId>,
}

/// One season of a career.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub number: u32,
    pub start_date: NaiveDate,
    pub phase: SeasonPhase,
    pub calendar: Calendar,
    pub cup: Option<Cup>,
}

/// Final state of one division.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionOutcome {
    pub division: DivisionId,
    pub name: String,
    pub champion: Option<ClubId>,
    pub table: Vec<TableRow>,
}

/// Archived outcome of an ended season.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonReport {
    pub season: u32,
    pub cup_winner: Option<ClubId>,
    pub divisions: Vec<DivisionOutcome>,
    pub promoted: Vec<ClubId>,
    pub relegated: Vec<ClubId>,
    /// Youth candidates generated across all clubs.
    pub youth_candidates: usize,
    pub prize_money: Vec<(ClubId, Money)>,
}
