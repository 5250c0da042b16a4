//! Minute-by-minute simulation.
//!
//! Each of the 90 ticks resolves possession from midfield control, then a possible chance
//! for the side on the ball, a possible foul by the side without it and a possible injury
//! on either side. Every random draw happens regardless of the timeline mode, so a quick
//! and a viewer simulation of the same setup produce the same match.

use crate::lineup::{PlayerProfile, Starter, TeamSheet};
use crate::rating::{match_rating, tally};
use crate::tactics::{aggression_modifiers, counter_multiplier, unit_weights, UnitWeights};
use crate::{MatchError, MatchSetup};
use league_core::{
    EventKind, Formation, MatchEvent, MatchMode, MatchReport, PlayerId, PlayerTrait, Position,
    Side, TeamStats,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Length of a match in ticks, one tick per minute.
pub const MATCH_MINUTES: u8 = 90;
/// Minute after which the half-time score is taken.
pub const HALF_TIME: u8 = 45;
/// Substitutions allowed per side.
pub const MAX_SUBSTITUTIONS: usize = 3;
/// Minutes at which each side makes a planned change.
pub const PLANNED_SUBSTITUTIONS: [u8; 2] = [60, 75];

const HOME_ADVANTAGE: f64 = 1.05;
const OUT_OF_POSITION: f64 = 0.75;
const EMPTY_UNIT: f64 = 2.0;
const BASE_CHANCE: f64 = 0.24;
const ON_TARGET: f64 = 0.35;
const CONVERSION: f64 = 0.32;
const ASSIST_RATE: f64 = 0.8;
const CORNER_RATE: f64 = 0.3;
const FOUL_RATE: f64 = 0.11;
const CARD_RATE: f64 = 0.16;
const STRAIGHT_RED_SHARE: f64 = 0.03;
const INJURY_RATE: f64 = 0.004;
const SHOOTOUT_KICKS: u8 = 5;
const SHOOTOUT_MAX_ROUNDS: u8 = 40;

/// Skill after form and position fit.
fn effective(s: &Starter) -> f64 {
    let form = 0.85 + 0.015 * f64::from(s.player.form);
    let fit = if s.out_of_position() {
        OUT_OF_POSITION
    } else {
        1.0
    };
    f64::from(s.player.skill) * form * fit
}

fn share(a: f64, b: f64) -> f64 {
    if a + b <= 0.0 {
        0.5
    } else {
        a / (a + b)
    }
}

/// Index drawn with probability proportional to its weight; `None` if all weights are zero.
pub fn weighted_index<R: Rng>(rng: &mut R, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let mut x = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if x < *w {
            return Some(i);
        }
        x -= w;
    }
    weights.iter().rposition(|w| *w > 0.0)
}

#[derive(Clone, Copy, Debug)]
struct Strength {
    midfield: f64,
    attack: f64,
    defence: f64,
    keeper: f64,
}

struct SideState {
    formation: Formation,
    weights: UnitWeights,
    attack_mult: f64,
    card_mult: f64,
    tempo: f64,
    venue: f64,
    on_pitch: Vec<Starter>,
    bench: Vec<PlayerProfile>,
    subs_used: usize,
    booked: BTreeSet<PlayerId>,
    entered: BTreeMap<PlayerId, u8>,
    left: BTreeMap<PlayerId, u8>,
    goals: u8,
    stats: TeamStats,
    possession_ticks: u32,
}

impl SideState {
    fn new(sheet: &TeamSheet, side: Side) -> Self {
        let (attack_mult, card_mult) = aggression_modifiers(sheet.tactics.aggression);
        Self {
            formation: sheet.tactics.formation,
            weights: unit_weights(sheet.tactics.formation),
            attack_mult,
            card_mult,
            tempo: f64::from(sheet.tactics.tempo) / 100.0,
            venue: if side == Side::Home {
                HOME_ADVANTAGE
            } else {
                1.0
            },
            on_pitch: sheet.starters.clone(),
            bench: sheet.bench.clone(),
            subs_used: 0,
            booked: BTreeSet::new(),
            entered: sheet.starters.iter().map(|s| (s.player.id, 0)).collect(),
            left: BTreeMap::new(),
            goals: 0,
            stats: TeamStats::default(),
            possession_ticks: 0,
        }
    }

    fn unit(&self, pos: Position) -> f64 {
        let (sum, n) = self
            .on_pitch
            .iter()
            .filter(|s| s.role == pos)
            .fold((0.0, 0u32), |(sum, n), s| (sum + effective(s), n + 1));
        if n == 0 {
            EMPTY_UNIT
        } else {
            sum / f64::from(n)
        }
    }

    fn strength(&self, opponent: Formation) -> Strength {
        let w = &self.weights;
        let manned = self.on_pitch.len() as f64 / 11.0;
        let mid = self.unit(Position::MF) * w.of(Position::MF);
        let attack = (self.unit(Position::FW) * w.of(Position::FW) + 0.5 * mid)
            * w.offence
            * self.attack_mult
            * counter_multiplier(self.formation, opponent)
            * self.venue
            * manned;
        let defence = (self.unit(Position::DF) * w.of(Position::DF)
            + 0.5 * mid
            + self.unit(Position::GK) * w.of(Position::GK))
            / w.defence
            * manned;
        let keeper = self
            .on_pitch
            .iter()
            .find(|s| s.role == Position::GK)
            .map_or(EMPTY_UNIT, effective);
        Strength {
            midfield: mid * manned * self.venue,
            attack,
            defence,
            keeper,
        }
    }

    fn take_off(&mut self, idx: usize, minute: u8) -> Starter {
        let s = self.on_pitch.remove(idx);
        self.left.insert(s.player.id, minute);
        s
    }

    /// Replace the player at `idx` from the bench; `None` if no change is possible.
    fn substitute(&mut self, idx: usize, minute: u8) -> Option<(PlayerId, PlayerId)> {
        if self.subs_used >= MAX_SUBSTITUTIONS || self.bench.is_empty() {
            return None;
        }
        let role = self.on_pitch[idx].role;
        let pick = self
            .bench
            .iter()
            .position(|p| p.position == role)
            .or_else(|| {
                self.bench
                    .iter()
                    .position(|p| p.position.is_outfield() == role.is_outfield())
            })
            .unwrap_or(0);
        let incoming = self.bench.remove(pick);
        let off = self.on_pitch[idx].player.id;
        let on = incoming.id;
        self.left.insert(off, minute);
        self.entered.insert(on, minute);
        self.on_pitch[idx] = Starter {
            player: incoming,
            role,
        };
        self.subs_used += 1;
        Some((off, on))
    }

    fn outfield_indices(&self) -> Vec<usize> {
        self.on_pitch
            .iter()
            .enumerate()
            .filter(|(_, s)| s.role.is_outfield())
            .map(|(i, _)| i)
            .collect()
    }
}

fn side_mut<'a>(home: &'a mut SideState, away: &'a mut SideState, side: Side) -> &'a mut SideState {
    match side {
        Side::Home => home,
        Side::Away => away,
    }
}

struct Timeline {
    mode: MatchMode,
    events: Vec<MatchEvent>,
}

impl Timeline {
    fn key(&mut self, minute: u8, side: Option<Side>, kind: EventKind) {
        self.events.push(MatchEvent { minute, side, kind });
    }

    fn detail(&mut self, minute: u8, side: Option<Side>, kind: EventKind) {
        if self.mode == MatchMode::Viewer {
            self.key(minute, side, kind);
        }
    }
}

struct Simulation {
    rng: ChaCha8Rng,
    home: SideState,
    away: SideState,
    timeline: Timeline,
}

impl Simulation {
    fn play_minute(&mut self, minute: u8) {
        let hs = self.home.strength(self.away.formation);
        let aw = self.away.strength(self.home.formation);
        let attacker = if self.rng.gen::<f64>() < share(hs.midfield, aw.midfield) {
            Side::Home
        } else {
            Side::Away
        };
        let (att, def) = match attacker {
            Side::Home => (hs, aw),
            Side::Away => (aw, hs),
        };
        let side = side_mut(&mut self.home, &mut self.away, attacker);
        side.possession_ticks += 1;
        let p_chance = BASE_CHANCE * 2.0 * share(att.attack, def.defence) * side.tempo;
        if self.rng.gen::<f64>() < p_chance {
            self.chance(minute, attacker, def.keeper);
        }
        self.foul(minute, attacker.opponent());
        for side in [Side::Home, Side::Away] {
            self.injury(minute, side);
        }
        if PLANNED_SUBSTITUTIONS.contains(&minute) {
            for side in [Side::Home, Side::Away] {
                self.planned_change(minute, side);
            }
        }
    }

    fn chance(&mut self, minute: u8, side: Side, keeper: f64) {
        let rng = &mut self.rng;
        let s = side_mut(&mut self.home, &mut self.away, side);
        let weights: Vec<f64> = s
            .on_pitch
            .iter()
            .map(|st| {
                let role = match st.role {
                    Position::FW => 5.0,
                    Position::MF => 3.0,
                    Position::DF => 1.0,
                    Position::GK => 0.0,
                };
                role * effective(st)
            })
            .collect();
        let Some(idx) = weighted_index(rng, &weights) else {
            return;
        };
        let shooter = s.on_pitch[idx].player.id;
        let finishing = effective(&s.on_pitch[idx]);
        s.stats.shots += 1;
        let on_target = rng.gen::<f64>() < ON_TARGET;
        self.timeline.detail(
            minute,
            Some(side),
            EventKind::Shot {
                player: shooter,
                on_target,
            },
        );
        if on_target {
            s.stats.shots_on_target += 1;
            let p_goal = CONVERSION * 2.0 * share(finishing, keeper);
            if rng.gen::<f64>() < p_goal {
                let assist = if rng.gen::<f64>() < ASSIST_RATE {
                    let w: Vec<f64> = s
                        .on_pitch
                        .iter()
                        .enumerate()
                        .map(|(i, st)| {
                            if i == idx {
                                return 0.0;
                            }
                            match st.role {
                                Position::MF => 4.0,
                                Position::FW => 3.0,
                                Position::DF => 1.0,
                                Position::GK => 0.2,
                            }
                        })
                        .collect();
                    weighted_index(rng, &w).map(|i| s.on_pitch[i].player.id)
                } else {
                    None
                };
                s.goals += 1;
                self.timeline.key(
                    minute,
                    Some(side),
                    EventKind::Goal {
                        scorer: shooter,
                        assist,
                    },
                );
                return;
            }
        }
        if rng.gen::<f64>() < CORNER_RATE {
            s.stats.corners += 1;
        }
    }

    fn foul(&mut self, minute: u8, side: Side) {
        let rng = &mut self.rng;
        let s = side_mut(&mut self.home, &mut self.away, side);
        if rng.gen::<f64>() >= FOUL_RATE {
            return;
        }
        s.stats.fouls += 1;
        let outfield = s.outfield_indices();
        if outfield.is_empty() {
            return;
        }
        let idx = outfield[rng.gen_range(0..outfield.len())];
        let offender = &s.on_pitch[idx].player;
        let id = offender.id;
        let mut p_card = CARD_RATE * s.card_mult;
        if offender.has_trait(PlayerTrait::CardProne) {
            p_card *= 1.5;
        }
        if offender.has_trait(PlayerTrait::Aggressive) {
            p_card *= 1.2;
        }
        let roll = rng.gen::<f64>();
        if roll < p_card * STRAIGHT_RED_SHARE {
            s.stats.red_cards += 1;
            s.take_off(idx, minute);
            self.timeline
                .key(minute, Some(side), EventKind::RedCard { player: id });
        } else if roll < p_card {
            s.stats.yellow_cards += 1;
            self.timeline
                .key(minute, Some(side), EventKind::YellowCard { player: id });
            if !s.booked.insert(id) {
                s.stats.red_cards += 1;
                s.take_off(idx, minute);
                self.timeline
                    .key(minute, Some(side), EventKind::RedCard { player: id });
            }
        }
    }

    fn injury(&mut self, minute: u8, side: Side) {
        let rng = &mut self.rng;
        let s = side_mut(&mut self.home, &mut self.away, side);
        if rng.gen::<f64>() >= INJURY_RATE || s.on_pitch.is_empty() {
            return;
        }
        let idx = rng.gen_range(0..s.on_pitch.len());
        let victim = &s.on_pitch[idx].player;
        let id = victim.id;
        let extra = u8::from(victim.has_trait(PlayerTrait::InjuryProne));
        let weeks = rng.gen_range(1..=4u8) + extra;
        self.timeline.key(
            minute,
            Some(side),
            EventKind::Injury { player: id, weeks },
        );
        match s.substitute(idx, minute) {
            Some((off, on)) => self
                .timeline
                .key(minute, Some(side), EventKind::Substitution { off, on }),
            None => {
                s.take_off(idx, minute);
            }
        }
    }

    fn planned_change(&mut self, minute: u8, side: Side) {
        let s = side_mut(&mut self.home, &mut self.away, side);
        if !s.bench.iter().any(|p| p.position.is_outfield()) {
            return;
        }
        let weakest = s.outfield_indices().into_iter().min_by(|a, b| {
            effective(&s.on_pitch[*a])
                .total_cmp(&effective(&s.on_pitch[*b]))
                .then(s.on_pitch[*b].player.id.cmp(&s.on_pitch[*a].player.id))
        });
        let Some(idx) = weakest else {
            return;
        };
        if let Some((off, on)) = s.substitute(idx, minute) {
            self.timeline
                .key(minute, Some(side), EventKind::Substitution { off, on });
        }
    }

    fn shootout(&mut self) -> (u8, u8) {
        let takers = |s: &SideState| -> Vec<PlayerProfile> {
            let mut t: Vec<&Starter> = s.on_pitch.iter().collect();
            t.sort_by(|a, b| {
                b.player
                    .has_trait(PlayerTrait::PenaltySpecialist)
                    .cmp(&a.player.has_trait(PlayerTrait::PenaltySpecialist))
                    .then(b.player.skill.cmp(&a.player.skill))
                    .then(a.player.id.cmp(&b.player.id))
            });
            t.into_iter().map(|s| s.player.clone()).collect()
        };
        let home_takers = takers(&self.home);
        let away_takers = takers(&self.away);
        let home_keeper = self.home.strength(self.away.formation).keeper;
        let away_keeper = self.away.strength(self.home.formation).keeper;
        let mut score = (0u8, 0u8);

        for round in 0..SHOOTOUT_MAX_ROUNDS {
            for side in [Side::Home, Side::Away] {
                let (list, keeper) = match side {
                    Side::Home => (&home_takers, away_keeper),
                    Side::Away => (&away_takers, home_keeper),
                };
                let Some(taker) = list.get(usize::from(round) % list.len().max(1)) else {
                    continue;
                };
                let mut p = 0.75 + (f64::from(taker.skill) - keeper) * 0.005;
                if taker.has_trait(PlayerTrait::PenaltySpecialist) {
                    p += 0.08;
                }
                let scored = self.rng.gen::<f64>() < p.clamp(0.5, 0.95);
                if scored {
                    match side {
                        Side::Home => score.0 += 1,
                        Side::Away => score.1 += 1,
                    }
                }
                self.timeline.key(
                    MATCH_MINUTES,
                    Some(side),
                    EventKind::PenaltyKick {
                        player: taker.id,
                        scored,
                    },
                );
                if round < SHOOTOUT_KICKS && decided(score, round, side) {
                    return score;
                }
            }
            if round + 1 >= SHOOTOUT_KICKS && score.0 != score.1 {
                return score;
            }
        }
        // Round cap reached: toss a coin.
        if self.rng.gen::<bool>() {
            score.0 += 1;
        } else {
            score.1 += 1;
        }
        score
    }
}

/// Whether the first five kicks already decide the shoot-out after `side` kicked in `round`.
fn decided(score: (u8, u8), round: u8, side: Side) -> bool {
    let home_left = SHOOTOUT_KICKS - round - 1;
    let away_left = match side {
        Side::Home => SHOOTOUT_KICKS - round,
        Side::Away => SHOOTOUT_KICKS - round - 1,
    };
    score.0 > score.1 + away_left || score.1 > score.0 + home_left
}

/// Run a match. Identical setups produce identical reports.
pub fn simulate(setup: &MatchSetup) -> Result<MatchReport, MatchError> {
    setup.home.validate()?;
    setup.away.validate()?;
    if setup.home.club == setup.away.club {
        return Err(MatchError::SameClub(setup.home.club));
    }
    let mut everyone: BTreeMap<PlayerId, (&PlayerProfile, Side)> = BTreeMap::new();
    for (sheet, side) in [(&setup.home, Side::Home), (&setup.away, Side::Away)] {
        for p in sheet
            .starters
            .iter()
            .map(|s| &s.player)
            .chain(sheet.bench.iter())
        {
            if everyone.insert(p.id, (p, side)).is_some() {
                return Err(MatchError::DuplicatePlayer(p.id));
            }
        }
    }

    let mut sim = Simulation {
        rng: ChaCha8Rng::seed_from_u64(setup.seed),
        home: SideState::new(&setup.home, Side::Home),
        away: SideState::new(&setup.away, Side::Away),
        timeline: Timeline {
            mode: setup.mode,
            events: Vec::new(),
        },
    };
    sim.timeline.detail(0, None, EventKind::KickOff);
    let mut half_time = (0, 0);
    for minute in 1..=MATCH_MINUTES {
        sim.play_minute(minute);
        if minute == HALF_TIME {
            half_time = (sim.home.goals, sim.away.goals);
            sim.timeline.detail(minute, None, EventKind::HalfTime);
        }
    }
    sim.timeline.detail(MATCH_MINUTES, None, EventKind::FullTime);
    let penalties = (setup.knockout && sim.home.goals == sim.away.goals).then(|| sim.shootout());

    let home_possession = (f64::from(sim.home.possession_ticks) * 100.0
        / f64::from(MATCH_MINUTES))
    .round() as u8;
    sim.home.stats.possession = home_possession;
    sim.away.stats.possession = 100 - home_possession;

    let mut minutes = BTreeMap::new();
    for s in [&sim.home, &sim.away] {
        for (id, on) in &s.entered {
            let off = s.left.get(id).copied().unwrap_or(MATCH_MINUTES);
            minutes.insert(*id, off.saturating_sub(*on).max(1));
        }
    }

    let tallies = tally(&sim.timeline.events);
    let mut ratings = BTreeMap::new();
    for (id, played) in &minutes {
        let Some((profile, side)) = everyone.get(id) else {
            continue;
        };
        let (scored, conceded) = match side {
            Side::Home => (sim.home.goals, sim.away.goals),
            Side::Away => (sim.away.goals, sim.home.goals),
        };
        let t = tallies.get(id).copied().unwrap_or_default();
        let r = match_rating(&mut sim.rng, profile, *played, &t, scored, conceded);
        ratings.insert(*id, r);
    }

    debug!(
        seed = setup.seed,
        home = %setup.home.club,
        away = %setup.away.club,
        score = %format!("{}-{}", sim.home.goals, sim.away.goals),
        "match simulated"
    );

    Ok(MatchReport {
        mode: setup.mode,
        seed: setup.seed,
        home_goals: sim.home.goals,
        away_goals: sim.away.goals,
        half_time,
        penalties,
        events: sim.timeline.events,
        home_stats: sim.home.stats,
        away_stats: sim.away.stats,
        home_lineup: setup.home.starters.iter().map(|s| s.player.id).collect(),
        away_lineup: setup.away.starters.iter().map(|s| s.player.id).collect(),
        minutes,
        ratings,
    })
}
