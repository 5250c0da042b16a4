//! Match reports as stored on played fixtures.

use crate::ids::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How much of the timeline a simulation keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchMode {
    /// Goals, cards, injuries and substitutions only.
    Quick,
    /// Everything, including shots and period markers.
    Viewer,
}

/// Home or away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    /// The other side.
    pub fn opponent(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// What happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    KickOff,
    HalfTime,
    FullTime,
    Shot {
        player: PlayerId,
        on_target: bool,
    },
    Goal {
        scorer: PlayerId,
        assist: Option<PlayerId>,
    },
    YellowCard {
        player: PlayerId,
    },
    RedCard {
        player: PlayerId,
    },
    Injury {
        player: PlayerId,
        weeks: u8,
    },
    Substitution {
        off: PlayerId,
        on: PlayerId,
    },
    PenaltyKick {
        player: PlayerId,
        scored: bool,
    },
}

/// A timestamped event. Period markers have no side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub minute: u8,
    pub side: Option<Side>,
    pub kind: EventKind,
}

/// Aggregate numbers for one team.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStats {
    /// Share of ball possession in percent.
    pub possession: u8,
    pub shots: u16,
    pub shots_on_target: u16,
    pub corners: u16,
    pub fouls: u16,
    pub yellow_cards: u8,
    pub red_cards: u8,
}

/// Full output of one simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub mode: MatchMode,
    pub seed: u64,
    pub home_goals: u8,
    pub away_goals: u8,
    pub half_time: (u8, u8),
    /// Shoot-out score for a drawn knockout tie.
    pub penalties: Option<(u8, u8)>,
    pub events: Vec<MatchEvent>,
    pub home_stats: TeamStats,
    pub away_stats: TeamStats,
    /// Starting elevens, in selection order.
    pub home_lineup: Vec<PlayerId>,
    pub away_lineup: Vec<PlayerId>,
    /// Minutes on the pitch for everyone who played.
    pub minutes: BTreeMap<PlayerId, u8>,
    /// Ratings on a 3.0–10.0 scale, one decimal.
    pub ratings: BTreeMap<PlayerId, f32>,
}

impl MatchReport {
    /// Goal events in order.
    pub fn goals(&self) -> impl Iterator<Item = &MatchEvent> + '_ {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::Goal { .. }))
    }

    /// Players injured during the match with the weeks they will miss.
    pub fn injuries(&self) -> Vec<(PlayerId, u8)> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::Injury { player, weeks } => Some((player, weeks)),
                _ => None,
            })
            .collect()
    }
}
