//! Append-only club ledger. A club's cash is the fold of its entries.

use crate::ids::{ClubId, EntryId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Money in the smallest currency unit.
pub type Money = i64;

/// Largest balance, positive or negative, a club may reach.
pub const MAX_BALANCE: Money = 1_000_000_000_000_000;

/// What a ledger entry pays for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerCategory {
    OpeningBalance,
    WeeklySponsorship,
    SponsorActivity,
    TransferPurchase,
    TransferSale,
    YouthSigning,
    PrizeMoney,
    Training,
}

/// One recorded monetary change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub club: ClubId,
    pub season: u32,
    pub week: u32,
    pub category: LedgerCategory,
    /// Signed amount: credits are positive.
    pub amount: Money,
    /// Entries the club chose to make (purchases, signings). These must never overdraw.
    pub voluntary: bool,
    pub memo: String,
}

/// Input for [`Ledger::post`]; the ledger assigns the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Posting {
    pub club: ClubId,
    pub season: u32,
    pub week: u32,
    pub category: LedgerCategory,
    pub amount: Money,
    pub voluntary: bool,
    pub memo: String,
}

/// A voluntary debit larger than the club's balance.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
#[error("{club} needs {needed} but has {available}")]
pub struct Shortfall {
    pub club: ClubId,
    pub needed: Money,
    pub available: Money,
}

/// Why a posting was refused. The ledger is unchanged in both cases.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum LedgerError {
    #[error(transparent)]
    Shortfall(#[from] Shortfall),
    #[error("posting {amount} to {club} would move its balance of {balance} beyond {MAX_BALANCE}")]
    Overflow {
        club: ClubId,
        amount: Money,
        balance: Money,
    },
}

/// `balance + amount`, if the result stays within [`MAX_BALANCE`].
fn bounded_add(balance: Money, amount: Money) -> Option<Money> {
    balance
        .checked_add(amount)
        .filter(|b| (-MAX_BALANCE..=MAX_BALANCE).contains(b))
}

/// The ledger for every club in a career.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// All entries in posting order.
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Entries of one club, oldest first.
    pub fn entries_for(&self, club: ClubId) -> impl Iterator<Item = &LedgerEntry> + '_ {
        self.entries.iter().filter(move |e| e.club == club)
    }

    /// Current balance of a club. Saturates on a ledger that [`Ledger::first_out_of_range`]
    /// would reject.
    pub fn balance(&self, club: ClubId) -> Money {
        self.entries_for(club)
            .fold(0, |acc: Money, e| acc.saturating_add(e.amount))
    }

    /// Balances of every club that has at least one entry.
    pub fn balances(&self) -> BTreeMap<ClubId, Money> {
        let mut out = BTreeMap::new();
        for e in &self.entries {
            let bal: &mut Money = out.entry(e.club).or_insert(0);
            *bal = bal.saturating_add(e.amount);
        }
        out
    }

    /// Append an entry. Refused if the club's balance would leave ±[`MAX_BALANCE`].
    pub fn post(&mut self, posting: Posting) -> Result<EntryId, LedgerError> {
        let balance = self.balance(posting.club);
        if bounded_add(balance, posting.amount).is_none() {
            return Err(LedgerError::Overflow {
                club: posting.club,
                amount: posting.amount,
                balance,
            });
        }
        let id = EntryId(self.entries.len() as u32 + 1);
        self.entries.push(LedgerEntry {
            id,
            club: posting.club,
            season: posting.season,
            week: posting.week,
            category: posting.category,
            amount: posting.amount,
            voluntary: posting.voluntary,
            memo: posting.memo,
        });
        Ok(id)
    }

    /// Append a voluntary debit of `posting.amount.abs()` only if the club can afford it.
    pub fn debit(&mut self, mut posting: Posting) -> Result<EntryId, LedgerError> {
        let needed = posting.amount.saturating_abs();
        let available = self.balance(posting.club);
        if available < needed {
            return Err(Shortfall {
                club: posting.club,
                needed,
                available,
            }
            .into());
        }
        posting.amount = -needed;
        posting.voluntary = true;
        self.post(posting)
    }

    /// First voluntary entry that left its club overdrawn, if any.
    pub fn first_overdraft(&self) -> Option<&LedgerEntry> {
        let mut running: BTreeMap<ClubId, Money> = BTreeMap::new();
        for e in &self.entries {
            let bal: &mut Money = running.entry(e.club).or_insert(0);
            *bal = bal.saturating_add(e.amount);
            if e.voluntary && e.amount < 0 && *bal < 0 {
                return Some(e);
            }
        }
        None
    }

    /// First entry that took its club's running balance beyond ±[`MAX_BALANCE`], if any.
    pub fn first_out_of_range(&self) -> Option<&LedgerEntry> {
        let mut running: BTreeMap<ClubId, Money> = BTreeMap::new();
        for e in &self.entries {
            let bal: &mut Money = running.entry(e.club).or_insert(0);
            match bounded_add(*bal, e.amount) {
                Some(next) => *bal = next,
                None => return Some(e),
            }
        }
        None
    }
}
