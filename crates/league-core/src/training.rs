//! Paid form training.

use crate::ids::{ClubId, PlayerId, TrainingId};
use crate::ledger::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a training order stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingStatus {
    Active,
    Done,
    /// The player left the club before the order completed.
    Cancelled,
}

/// A week of extra form work bought for one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingOrder {
    pub id: TrainingId,
    pub club: ClubId,
    pub player: PlayerId,
    /// Season and week the order was placed.
    pub season: u32,
    pub week: u32,
    pub weeks_left: u8,
    pub cost: Money,
    pub status: TrainingStatus,
    /// Form points granted on completion.
    pub boost: Option<u8>,
}

/// Every training order of a career, completed ones included.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingBook {
    pub orders: BTreeMap<TrainingId, TrainingOrder>,
}

impl TrainingBook {
    /// The running order of a player, if any.
    pub fn active_for(&self, player: PlayerId) -> Option<&TrainingOrder> {
        self.orders
            .values()
            .find(|o| o.player == player && o.status == TrainingStatus::Active)
    }

    pub fn active(&self) -> impl Iterator<Item = &TrainingOrder> + '_ {
        self.orders
            .values()
            .filter(|o| o.status == TrainingStatus::Active)
    }

    /// Cancel the running order of a player. The fee is not refunded.
    pub fn cancel_for(&mut self, player: PlayerId) -> Option<TrainingId> {
        let order = self
            .orders
            .values_mut()
            .find(|o| o.player == player && o.status == TrainingStatus::Active)?;
        order.status = TrainingStatus::Cancelled;
        Some(order.id)
    }
}
