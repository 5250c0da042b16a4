//! Post-match player ratings.

use crate::lineup::PlayerProfile;
use league_core::{EventKind, MatchEvent, PlayerId, Position};
use rand::Rng;
use std::collections::BTreeMap;

/// Lowest possible rating.
pub const MIN_RATING: f32 = 3.0;
/// Highest possible rating.
pub const MAX_RATING: f32 = 10.0;

/// Per-player event counts for one match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tally {
    pub goals: u8,
    pub assists: u8,
    pub yellows: u8,
    pub reds: u8,
}

/// Count goals, assists and cards per player. Shoot-out kicks do not count.
pub fn tally(events: &[MatchEvent]) -> BTreeMap<PlayerId, Tally> {
    let mut out: BTreeMap<PlayerId, Tally> = BTreeMap::new();
    for ev in events {
        match ev.kind {
            EventKind::Goal { scorer, assist } => {
                out.entry(scorer).or_default().goals += 1;
                if let Some(a) = assist {
                    out.entry(a).or_default().assists += 1;
                }
            }
            EventKind::YellowCard { player } => out.entry(player).or_default().yellows += 1,
            EventKind::RedCard { player } => out.entry(player).or_default().reds += 1,
            _ => {}
        }
    }
    out
}

fn goal_bonus(pos: Position) -> f64 {
    match pos {
        Position::FW => 1.0,
        Position::MF => 0.9,
        Position::DF => 0.7,
        Position::GK => 0.6,
    }
}

/// Rating for one player.
///
/// Base 6.0 scaled by minutes played and by skill, plus event bonuses, a result bonus and
/// a clean-sheet adjustment for keepers and defenders. The random part is the sum of three
/// uniform draws so that it stays bounded.
pub fn match_rating<R: Rng>(
    rng: &mut R,
    player: &PlayerProfile,
    minutes: u8,
    tally: &Tally,
    scored: u8,
    conceded: u8,
) -> f32 {
    let played = f64::from(minutes.min(90)) / 90.0;
    let base = 6.0 * played.powf(0.7);
    let skill_norm = (f64::from(player.skill) - 5.0) / 25.0;
    let mut r = base * (1.0 + 0.4 * skill_norm);

    r += goal_bonus(player.position) * f64::from(tally.goals);
    r += 0.6 * f64::from(tally.assists);
    r -= 0.4 * f64::from(tally.yellows) + 2.0 * f64::from(tally.reds);

    match scored.cmp(&conceded) {
        std::cmp::Ordering::Greater => r += 0.3,
        std::cmp::Ordering::Equal => r += 0.1,
        std::cmp::Ordering::Less => {}
    }
    if matches!(player.position, Position::GK | Position::DF) {
        if conceded == 0 {
            r += 0.5;
        } else if conceded >= 3 {
            r -= 0.5;
        }
    }

    let jitter: f64 = rng.gen::<f64>() + rng.gen::<f64>() + rng.gen::<f64>();
    r += (jitter - 1.5) * 0.8;

    let clamped = r.clamp(f64::from(MIN_RATING), f64::from(MAX_RATING));
    ((clamped * 10.0).round() / 10.0) as f32
}
