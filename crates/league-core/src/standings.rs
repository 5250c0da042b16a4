//! Derived league tables and player statistics. Nothing here is stored as ground truth.

use crate::fixture::Fixture;
use crate::ids::{ClubId, PlayerId};
use crate::report::EventKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Points for a win.
pub const POINTS_WIN: u32 = 3;
/// Points for a draw.
pub const POINTS_DRAW: u32 = 1;

/// One line of a league table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub club: ClubId,
    pub name: String,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub points: u32,
}

impl TableRow {
    fn new(club: ClubId, name: String) -> Self {
        Self {
            club,
            name,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        }
    }

    /// Goals for minus goals against.
    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    fn record(&mut self, scored: u8, conceded: u8) {
        self.played += 1;
        self.goals_for += u32::from(scored);
        self.goals_against += u32::from(conceded);
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.won += 1;
                self.points += POINTS_WIN;
            }
            std::cmp::Ordering::Equal => {
                self.drawn += 1;
                self.points += POINTS_DRAW;
            }
            std::cmp::Ordering::Less => self.lost += 1,
        }
    }
}

/// Build a sorted table for `clubs` from the given fixtures.
///
/// Only played fixtures between two listed clubs count. Order: points, goal difference,
/// head-to-head points among the tied clubs, then club name.
pub fn compute_table<'a, I, N>(clubs: &[ClubId], fixtures: I, name_of: N) -> Vec<TableRow>
where
    I: IntoIterator<Item = &'a Fixture>,
    N: Fn(ClubId) -> String,
{
    let mut rows: BTreeMap<ClubId, TableRow> = clubs
        .iter()
        .map(|c| (*c, TableRow::new(*c, name_of(*c))))
        .collect();
    let played: Vec<&Fixture> = fixtures
        .into_iter()
        .filter(|f| f.is_played() && rows.contains_key(&f.home) && rows.contains_key(&f.away))
        .collect();
    for f in &played {
        if let Some(r) = f.result() {
            if let Some(row) = rows.get_mut(&f.home) {
                row.record(r.home_goals, r.away_goals);
            }
            if let Some(row) = rows.get_mut(&f.away) {
                row.record(r.away_goals, r.home_goals);
            }
        }
    }

    let mut ordered: Vec<TableRow> = rows.into_values().collect();
    ordered.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_difference().cmp(&a.goal_difference()))
            .then(a.name.cmp(&b.name))
            .then(a.club.cmp(&b.club))
    });

    let mut i = 0;
    while i < ordered.len() {
        let mut j = i + 1;
        while j < ordered.len()
            && ordered[j].points == ordered[i].points
            && ordered[j].goal_difference() == ordered[i].goal_difference()
        {
            j += 1;
        }
        if j - i > 1 {
            let group: BTreeSet<ClubId> = ordered[i..j].iter().map(|r| r.club).collect();
            let h2h = head_to_head_points(&played, &group);
            ordered[i..j].sort_by(|a, b| {
                let pa = h2h.get(&a.club).copied().unwrap_or(0);
                let pb = h2h.get(&b.club).copied().unwrap_or(0);
                pb.cmp(&pa)
                    .then(a.name.cmp(&b.name))
                    .then(a.club.cmp(&b.club))
            });
        }
        i = j;
    }
    ordered
}

fn head_to_head_points(played: &[&Fixture], group: &BTreeSet<ClubId>) -> BTreeMap<ClubId, u32> {
    let mut points: BTreeMap<ClubId, u32> = group.iter().map(|c| (*c, 0)).collect();
    for f in played {
        if !(group.contains(&f.home) && group.contains(&f.away)) {
            continue;
        }
        let Some(r) = f.result() else { continue };
        let (home_pts, away_pts) = match r.home_goals.cmp(&r.away_goals) {
            std::cmp::Ordering::Greater => (POINTS_WIN, 0),
            std::cmp::Ordering::Equal => (POINTS_DRAW, POINTS_DRAW),
            std::cmp::Ordering::Less => (0, POINTS_WIN),
        };
        *points.entry(f.home).or_insert(0) += home_pts;
        *points.entry(f.away).or_insert(0) += away_pts;
    }
    points
}

/// Per-player numbers collected from match reports.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonStats {
    pub appearances: u32,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    rating_sum: f32,
}

impl PlayerSeasonStats {
    /// Mean match rating, `None` before the first appearance.
    pub fn average_rating(&self) -> Option<f32> {
        (self.appearances > 0).then(|| self.rating_sum / self.appearances as f32)
    }
}

/// Aggregate statistics from every fixture that carries a match report.
pub fn player_stats<'a, I>(fixtures: I) -> BTreeMap<PlayerId, PlayerSeasonStats>
where
    I: IntoIterator<Item = &'a Fixture>,
{
    let mut out: BTreeMap<PlayerId, PlayerSeasonStats> = BTreeMap::new();
    for f in fixtures {
        let Some(report) = f.result().and_then(|r| r.report.as_ref()) else {
            continue;
        };
        for (player, minutes) in &report.minutes {
            let s = out.entry(*player).or_default();
            s.appearances += 1;
            s.minutes += u32::from(*minutes);
            s.rating_sum += report.ratings.get(player).copied().unwrap_or(6.0);
        }
        for ev in &report.events {
            match ev.kind {
                EventKind::Goal { scorer, assist } => {
                    out.entry(scorer).or_default().goals += 1;
                    if let Some(a) = assist {
                        out.entry(a).or_default().assists += 1;
                    }
                }
                EventKind::YellowCard { player } => out.entry(player).or_default().yellow_cards += 1,
                EventKind::RedCard { player } => out.entry(player).or_default().red_cards += 1,
                _ => {}
            }
        }
    }
    out
}
