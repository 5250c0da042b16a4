//! Errors raised by career operations and their stable kinds.

use league_core::{
    BidId, CareerId, ClubId, DivisionId, FixtureId, InvariantError, LedgerError, ListingId,
    MailId, PlayerId, Shortfall, TacticsError,
};
use league_econ::EconError;
use league_match::MatchError;
use persistence::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification shown to front ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidConfig,
    NotFound,
    InvalidState,
    InsufficientFunds,
    IndexOutOfRange,
    InvariantViolation,
    InvalidInput,
    Storage,
}

/// Everything a career operation can fail with.
#[derive(Debug, Error)]
pub enum CareerError {
    #[error("invalid career configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid tactics: {0}")]
    InvalidTactic(#[from] TacticsError),
    #[error(transparent)]
    Economy(#[from] EconError),
    #[error("career {0} not found")]
    CareerNotFound(CareerId),
    #[error("{0} not found")]
    ClubNotFound(ClubId),
    #[error("no club named '{0}'")]
    ClubNameNotFound(String),
    #[error("{0} not found")]
    DivisionNotFound(DivisionId),
    #[error("{0} not found")]
    PlayerNotFound(PlayerId),
    #[error("{0} not found")]
    FixtureNotFound(FixtureId),
    #[error("{0} not found")]
    ListingNotFound(ListingId),
    #[error("{0} not found")]
    BidNotFound(BidId),
    #[error("{0} not found")]
    MailNotFound(MailId),
    #[error("{0} has already been played")]
    AlreadyPlayed(FixtureId),
    #[error(transparent)]
    InvalidSquad(#[from] MatchError),
    #[error("{remaining} fixtures of the season are still unplayed")]
    NotAllFixturesPlayed { remaining: usize },
    #[error("season {0} has already ended")]
    AlreadyEnded(u32),
    #[error("{0}")]
    InvalidState(String),
    #[error("youth slot {index} of {club} has already been decided")]
    SlotConsumed { club: ClubId, index: usize },
    #[error("insufficient funds: {0}")]
    InsufficientFunds(#[from] Shortfall),
    #[error("index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invariant violated: {0}")]
    Invariant(#[from] InvariantError),
    #[error("storage failure: {0}")]
    Storage(#[source] StoreError),
}

impl CareerError {
    /// Stable kind for this error.
    pub fn kind(&self) -> ErrorKind {
        use CareerError::*;
        match self {
            InvalidConfig(_) => ErrorKind::InvalidConfig,
            InvalidInput(_) | InvalidTactic(_) | Economy(_) => ErrorKind::InvalidInput,
            CareerNotFound(_)
            | ClubNotFound(_)
            | ClubNameNotFound(_)
            | DivisionNotFound(_)
            | PlayerNotFound(_)
            | FixtureNotFound(_)
            | ListingNotFound(_)
            | BidNotFound(_)
            | MailNotFound(_) => ErrorKind::NotFound,
            AlreadyPlayed(_)
            | InvalidSquad(_)
            | NotAllFixturesPlayed { .. }
            | AlreadyEnded(_)
            | InvalidState(_)
            | SlotConsumed { .. } => ErrorKind::InvalidState,
            InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Invariant(_) => ErrorKind::InvariantViolation,
            Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        CareerError::InvalidState(msg.into())
    }

    pub(crate) fn input(msg: impl Into<String>) -> Self {
        CareerError::InvalidInput(msg.into())
    }
}

impl From<LedgerError> for CareerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Shortfall(s) => CareerError::InsufficientFunds(s),
            overflow @ LedgerError::Overflow { .. } => {
                CareerError::InvalidInput(overflow.to_string())
            }
        }
    }
}

impl From<StoreError> for CareerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => CareerError::CareerNotFound(id),
            other => CareerError::Storage(other),
        }
    }
}

/// Serialisable result envelope for front ends.
///
/// Serialises as `{"status":"ok","data":…}` or
/// `{"status":"error","kind":"not_found","message":…}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok { data: T },
    Error { kind: ErrorKind, message: String },
}

impl<T> From<Result<T, CareerError>> for Outcome<T> {
    fn from(r: Result<T, CareerError>) -> Self {
        match r {
            Ok(data) => Outcome::Ok { data },
            Err(e) => Outcome::Error {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}
