#![deny(warnings)]

//! Core domain model of a football management career.
//!
//! Every entity of a career lives in one [`EntityGraph`] and refers to other entities by id.
//! Cash, tables and player statistics are derived from the ledger and from played fixtures;
//! [`validate_graph`] checks every cross-entity invariant and runs after each transaction.

pub mod club;
pub mod fixture;
pub mod graph;
pub mod ids;
pub mod invariants;
pub mod league;
pub mod ledger;
pub mod mail;
pub mod market;
pub mod player;
pub mod report;
pub mod season;
pub mod standings;
pub mod training;
pub mod youth;

pub use club::{
    check_tactics, Aggression, Club, Finances, Formation, Tactics, TacticsError, MAX_SQUAD_SIZE,
    MIN_SQUAD_SIZE, STARTING_ELEVEN, TEMPO_RANGE,
};
pub use fixture::{Competition, Fixture, FixtureResult, FixtureStatus, ResultOrigin};
pub use graph::{Career, CareerMeta, EntityGraph};
pub use ids::{
    BidId, CareerId, ClubId, DivisionId, EntryId, FixtureId, IdAllocator, ListingId, MailId,
    PlayerId, TrainingId,
};
pub use invariants::{validate_graph, InvariantError};
pub use league::{Division, League, LeagueRules};
pub use ledger::{
    Ledger, LedgerCategory, LedgerEntry, LedgerError, Money, Posting, Shortfall, MAX_BALANCE,
};
pub use mail::{MailItem, MailStatus, Mailbox};
pub use market::{Bid, BidStatus, Listing, Seller, TransferMarket};
pub use player::{
    Contract, Player, PlayerTrait, Position, MAX_FORM, MAX_SKILL, MIN_SKILL, NEUTRAL_FORM,
};
pub use report::{EventKind, MatchEvent, MatchMode, MatchReport, Side, TeamStats};
pub use season::{Calendar, Cup, CupRound, CupTie, DivisionOutcome, Season, SeasonPhase, SeasonReport};
pub use standings::{compute_table, player_stats, PlayerSeasonStats, TableRow};
pub use training::{TrainingBook, TrainingOrder, TrainingStatus};
pub use youth::{SlotStatus, YouthAcademy, YouthCandidate, YouthPool, YouthSlot};
