//! Transfer listings and bids.

use crate::ids::{BidId, ClubId, ListingId, PlayerId};
use crate::ledger::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who sells a listed player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seller {
    Club(ClubId),
    /// Unattached player; buying credits nobody.
    FreeAgent,
}

impl Seller {
    /// The selling club, if any.
    pub fn club(self) -> Option<ClubId> {
        match self {
            Seller::Club(c) => Some(c),
            Seller::FreeAgent => None,
        }
    }
}

/// An active offer to sell one player at a fixed price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub player: PlayerId,
    pub seller: Seller,
    pub asking_price: Money,
    pub season: u32,
    pub week: u32,
}

/// Negotiation state of a bid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    /// Superseded by another completed transfer of the same player.
    Withdrawn,
}

/// An offer from `buyer` to `seller` for `player`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub player: PlayerId,
    pub buyer: ClubId,
    pub seller: ClubId,
    pub amount: Money,
    pub status: BidStatus,
    pub season: u32,
    pub week: u32,
}

/// Active listings plus the full bid history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMarket {
    pub listings: BTreeMap<ListingId, Listing>,
    pub bids: BTreeMap<BidId, Bid>,
}

impl TransferMarket {
    /// The active listing of a player.
    pub fn listing_for(&self, player: PlayerId) -> Option<&Listing> {
        self.listings.values().find(|l| l.player == player)
    }

    /// Remove the listing of a player, if any.
    pub fn delist(&mut self, player: PlayerId) -> Option<Listing> {
        let id = self.listing_for(player)?.id;
        self.listings.remove(&id)
    }

    /// Pending bids for a player, oldest first.
    pub fn pending_for(&self, player: PlayerId) -> impl Iterator<Item = &Bid> + '_ {
        self.bids
            .values()
            .filter(move |b| b.player == player && b.status == BidStatus::Pending)
    }

    /// Withdraw every pending bid for a player except `keep`.
    pub fn withdraw_pending(&mut self, player: PlayerId, keep: Option<BidId>) {
        for bid in self.bids.values_mut() {
            if bid.player == player && bid.status == BidStatus::Pending && Some(bid.id) != keep {
                bid.status = BidStatus::Withdrawn;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bid(id: u32, player: u32) -> Bid {
        Bid {
            id: BidId(id),
            player: PlayerId(player),
            buyer: ClubId(1),
            seller: ClubId(2),
            amount: 1_000,
            status: BidStatus::Pending,
            season: 1,
            week: 1,
        }
    }

    #[test]
    fn withdraw_keeps_the_winning_bid() {
        let mut m = TransferMarket::default();
        m.bids.insert(BidId(1), bid(1, 42));
        m.bids.insert(BidId(2), bid(2, 42));
        m.bids.insert(BidId(3), bid(3, 7));
        m.withdraw_pending(PlayerId(42), Some(BidId(2)));
        assert_eq!(m.bids[&BidId(1)].status, BidStatus::Withdrawn);
        assert_eq!(m.bids[&BidId(2)].status, BidStatus::Pending);
        assert_eq!(m.pending_for(PlayerId(7)).count(), 1);
    }

    #[test]
    fn delist_removes_by_player() {
        let mut m = TransferMarket::default();
        m.listings.insert(
            ListingId(5),
            Listing {
                id: ListingId(5),
                player: PlayerId(9),
                seller: Seller::FreeAgent,
                asking_price: 100,
                season: 1,
                week: 1,
            },
        );
        assert_eq!(m.delist(PlayerId(9)).map(|l| l.id), Some(ListingId(5)));
        assert!(m.listings.is_empty());
        assert!(m.delist(PlayerId(9)).is_none());
    }
}
