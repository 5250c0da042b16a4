//! Stable identifiers. Every cross-reference in the graph goes through one of these.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, " {}"), self.0)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a club, unique within a career.
    ClubId,
    "club"
);
numeric_id!(
    /// Identifier of a player, unique within a career and never reused.
    PlayerId,
    "player"
);
numeric_id!(
    /// Identifier of a fixture across all seasons of a career.
    FixtureId,
    "fixture"
);
numeric_id!(
    /// Identifier of a division.
    DivisionId,
    "division"
);
numeric_id!(
    /// Identifier of a transfer listing.
    ListingId,
    "listing"
);
numeric_id!(
    /// Identifier of a transfer bid.
    BidId,
    "bid"
);
numeric_id!(
    /// Identifier of a mail item.
    MailId,
    "mail"
);
numeric_id!(
    /// Identifier of a ledger entry.
    EntryId,
    "entry"
);
numeric_id!(
    /// Identifier of a training order.
    TrainingId,
    "training order"
);

/// Identifier of a career and of its save slot, e.g. "c-1a2b3c4d".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CareerId(pub String);

impl CareerId {
    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CareerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CareerId {
    fn from(value: &str) -> Self {
        CareerId(value.to_string())
    }
}

/// Monotonic counters for ids that are allocated after career creation.
///
/// Mail and ledger ids are positional and do not need a counter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    /// Next player id to hand out.
    pub next_player: u32,
    /// Next fixture id to hand out.
    pub next_fixture: u32,
    /// Next listing id to hand out.
    pub next_listing: u32,
    /// Next bid id to hand out.
    pub next_bid: u32,
    /// Next training order id to hand out.
    #[serde(default = "first_id")]
    pub next_training: u32,
}

fn first_id() -> u32 {
    1
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next_player: 1,
            next_fixture: 1,
            next_listing: 1,
            next_bid: 1,
            next_training: 1,
        }
    }
}

impl IdAllocator {
    /// Allocate a fresh player id.
    pub fn player(&mut self) -> PlayerId {
        let id = PlayerId(self.next_player);
        self.next_player += 1;
        id
    }

    /// Allocate a fresh fixture id.
    pub fn fixture(&mut self) -> FixtureId {
        let id = FixtureId(self.next_fixture);
        self.next_fixture += 1;
        id
    }

    /// Allocate a fresh listing id.
    pub fn listing(&mut self) -> ListingId {
        let id = ListingId(self.next_listing);
        self.next_listing += 1;
        id
    }

    /// Allocate a fresh bid id.
    pub fn bid(&mut self) -> BidId {
        let id = BidId(self.next_bid);
        self.next_bid += 1;
        id
    }

    /// Allocate a fresh training order id.
    pub fn training(&mut self) -> TrainingId {
        let id = TrainingId(self.next_training);
        self.next_training += 1;
        id
    }
}
