//! Season lifecycle: start, calendar, end-of-season settlement and development.

use crate::economy;
use crate::error::CareerError;
use crate::mail;
use crate::rng::{self, Purpose};
use crate::schedule;
use crate::training;
use crate::transfers;
use crate::youth;
use chrono::{Duration, NaiveDate};
use league_core::{
    Calendar, Career, ClubId, DivisionId, DivisionOutcome, EntityGraph, Fixture, Money, Player,
    PlayerTrait, SeasonPhase, SeasonReport, TableRow, MAX_SKILL, MIN_SKILL,
};
use league_match::MATCH_MINUTES;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Longest single calendar jump.
pub const MAX_CALENDAR_WEEKS: u32 = 52;
/// Seasons start this many weeks apart.
const SEASON_WEEKS: i64 = 52;
/// Share of possible minutes a player needs for a good season to count.
const MIN_PLAYING_SHARE: f64 = 0.25;
/// Chance that a development trend is cancelled by luck.
const TREND_CANCEL: f64 = 0.15;
/// Skill points a season can add or remove at most.
const MAX_SKILL_STEPS: i32 = 2;
const HIDDEN_SPAN: i32 = 99;

/// A season that just kicked off.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonStart {
    pub season: u32,
    pub start_date: NaiveDate,
    /// Fixtures scheduled for the season, cup included.
    pub fixtures: usize,
}

/// What passing time did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarAdvance {
    pub weeks: u32,
    pub today: NaiveDate,
    pub week: u32,
    /// Sponsorship paid across all clubs.
    pub sponsorship: Money,
    pub new_listings: usize,
    pub trainings_completed: usize,
    /// Listings bought by engine clubs.
    pub ai_signings: usize,
}

/// A division's live table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionStanding {
    pub division: DivisionId,
    pub name: String,
    pub level: u8,
    pub rows: Vec<TableRow>,
}

pub(crate) fn require_in_progress(graph: &EntityGraph) -> Result<(), CareerError> {
    match graph.season.phase {
        SeasonPhase::InProgress => Ok(()),
        SeasonPhase::NotStarted => Err(CareerError::state(format!(
            "season {} has not started",
            graph.season.number
        ))),
        SeasonPhase::Ended => Err(CareerError::AlreadyEnded(graph.season.number)),
    }
}

/// Kick off the season. After an ended season this rolls over to the next one and schedules it
/// from the current division membership.
pub(crate) fn start(career: &mut Career) -> Result<SeasonStart, CareerError> {
    let g = &mut career.graph;
    match g.season.phase {
        SeasonPhase::InProgress => {
            return Err(CareerError::state(format!(
                "season {} is already in progress",
                g.season.number
            )))
        }
        SeasonPhase::NotStarted => {}
        SeasonPhase::Ended => {
            let start = g.season.start_date + Duration::weeks(SEASON_WEEKS);
            g.season.number += 1;
            g.season.start_date = start;
            g.season.calendar = Calendar {
                today: start,
                week: 1,
                round: 1,
            };
            schedule::schedule_season(g);
        }
    }
    g.season.phase = SeasonPhase::InProgress;
    let started = SeasonStart {
        season: g.season.number,
        start_date: g.season.start_date,
        fixtures: g.season_fixtures().count(),
    };
    info!(season = started.season, fixtures = started.fixtures, "season started");
    mail::notify_all(
        career,
        format!("Season {} begins", started.season),
        format!(
            "The first round is played on {}. {} fixtures are on the calendar.",
            started.start_date, started.fixtures
        ),
    );
    Ok(started)
}

/// Let `weeks` calendar weeks pass. Each week pays sponsorship, heals injuries, completes
/// form training, revalues players, refreshes the market and lets engine clubs buy from it.
/// Matches are not played; see `advance_week`.
pub(crate) fn advance_calendar(
    career: &mut Career,
    weeks: u32,
) -> Result<CalendarAdvance, CareerError> {
    if !(1..=MAX_CALENDAR_WEEKS).contains(&weeks) {
        return Err(CareerError::input(format!(
            "weeks must be within 1..={MAX_CALENDAR_WEEKS}, got {weeks}"
        )));
    }
    let mut sponsorship: Money = 0;
    let mut new_listings = 0;
    let mut trainings_completed = 0;
    let mut ai_signings = 0;
    for _ in 0..weeks {
        let g = &mut career.graph;
        sponsorship = sponsorship.saturating_add(economy::weekly_sponsorship(g)?);
        for p in g.players.values_mut() {
            p.injured_weeks = p.injured_weeks.saturating_sub(1);
        }
        trainings_completed += training::process_week(career);
        let g = &mut career.graph;
        transfers::refresh_values(g);
        g.season.calendar.week += 1;
        g.season.calendar.today += Duration::weeks(1);
        new_listings += transfers::refresh_market(career)?;
        ai_signings += transfers::ai_signings(career)?;
    }
    let cal = &career.graph.season.calendar;
    debug!(weeks, today = %cal.today, week = cal.week, "calendar advanced");
    Ok(CalendarAdvance {
        weeks,
        today: cal.today,
        week: cal.week,
        sponsorship,
        new_listings,
        trainings_completed,
        ai_signings,
    })
}

/// Live tables of one division, or of every division top first.
pub(crate) fn standings(
    career: &Career,
    division: Option<DivisionId>,
) -> Result<Vec<DivisionStanding>, CareerError> {
    let g = &career.graph;
    let divisions: Vec<_> = match division {
        Some(id) => vec![g.league.division(id).ok_or(CareerError::DivisionNotFound(id))?],
        None => g.league.divisions.iter().collect(),
    };
    Ok(divisions
        .into_iter()
        .map(|d| DivisionStanding {
            division: d.id,
            name: d.name.clone(),
            level: d.level,
            rows: g.table(d.id),
        })
        .collect())
}

/// Clubs changing division: `(promoted, relegated)` plus the new membership per division.
fn movements(
    tables: &[(DivisionId, Vec<TableRow>)],
    slots: usize,
) -> (Vec<ClubId>, Vec<ClubId>, Vec<Vec<ClubId>>) {
    let order: Vec<Vec<ClubId>> = tables
        .iter()
        .map(|(_, rows)| rows.iter().map(|r| r.club).collect())
        .collect();
    let n = order.len();
    let mut down: Vec<Vec<ClubId>> = vec![Vec::new(); n];
    let mut up: Vec<Vec<ClubId>> = vec![Vec::new(); n];
    if slots > 0 {
        for i in 0..n.saturating_sub(1) {
            let k = slots.min(order[i].len()).min(order[i + 1].len());
            down[i] = order[i][order[i].len() - k..].to_vec();
            up[i + 1] = order[i + 1][..k].to_vec();
        }
    }
    let mut membership = Vec::with_capacity(n);
    for i in 0..n {
        let mut clubs = Vec::new();
        if i > 0 {
            clubs.extend(down[i - 1].iter().copied());
        }
        clubs.extend(
            order[i]
                .iter()
                .copied()
                .filter(|c| !down[i].contains(c) && !up[i].contains(c)),
        );
        if i + 1 < n {
            clubs.extend(up[i + 1].iter().copied());
        }
        membership.push(clubs);
    }
    let promoted = up.into_iter().flatten().collect();
    let relegated = down.into_iter().flatten().collect();
    (promoted, relegated, membership)
}

/// End the season. Settles, in order: cup winner, final tables, promotion and relegation,
/// youth intake, prize money, player development and ageing. Archives the report.
pub(crate) fn end(career: &mut Career) -> Result<SeasonReport, CareerError> {
    let g = &career.graph;
    match g.season.phase {
        SeasonPhase::Ended => return Err(CareerError::AlreadyEnded(g.season.number)),
        SeasonPhase::NotStarted => {
            return Err(CareerError::state(format!(
                "season {} has not started",
                g.season.number
            )))
        }
        SeasonPhase::InProgress => {}
    }
    let remaining = unplayed(g).len();
    if remaining > 0 {
        return Err(CareerError::NotAllFixturesPlayed { remaining });
    }
    let season = g.season.number;
    let cup_winner = g.season.cup.as_ref().and_then(|c| c.winner);

    let tables: Vec<(DivisionId, Vec<TableRow>)> = g
        .league
        .divisions
        .iter()
        .map(|d| (d.id, g.table(d.id)))
        .collect();
    let outcomes: Vec<DivisionOutcome> = g
        .league
        .divisions
        .iter()
        .zip(&tables)
        .map(|(d, (_, rows))| DivisionOutcome {
            division: d.id,
            name: d.name.clone(),
            champion: rows.first().map(|r| r.club),
            table: rows.clone(),
        })
        .collect();
    let levels: Vec<(u8, Vec<TableRow>)> = g
        .league
        .divisions
        .iter()
        .zip(&tables)
        .map(|(d, (_, rows))| (d.level, rows.clone()))
        .collect();

    let slots = usize::from(g.league.rules.promotion_slots);
    let (promoted, relegated, membership) = movements(&tables, slots);
    for (division, clubs) in career.graph.league.divisions.iter_mut().zip(membership) {
        division.clubs = clubs;
    }

    let youth_candidates = youth::intake(career, 1);
    let prize_money = economy::settle_prize_money(&mut career.graph, &levels)?;
    develop_players(&mut career.graph);
    transfers::refresh_values(&mut career.graph);

    let report = SeasonReport {
        season,
        cup_winner,
        divisions: outcomes,
        promoted,
        relegated,
        youth_candidates,
        prize_money,
    };
    career.graph.history.push(report.clone());
    career.graph.season.phase = SeasonPhase::Ended;
    info!(
        season,
        promoted = report.promoted.len(),
        relegated = report.relegated.len(),
        "season ended"
    );
    let body = season_summary(&career.graph, &report);
    mail::notify_all(career, format!("Season {season} review"), body);
    Ok(report)
}

fn season_summary(graph: &EntityGraph, report: &SeasonReport) -> String {
    let mut lines: Vec<String> = report
        .divisions
        .iter()
        .filter_map(|d| {
            d.champion
                .map(|c| format!("{} champions: {}", d.name, graph.club_name(c)))
        })
        .collect();
    if let Some(winner) = report.cup_winner {
        lines.push(format!("Cup winners: {}", graph.club_name(winner)));
    }
    let names = |clubs: &[ClubId]| {
        clubs
            .iter()
            .map(|c| graph.club_name(*c))
            .collect::<Vec<_>>()
            .join(", ")
    };
    if !report.promoted.is_empty() {
        lines.push(format!("Promoted: {}", names(&report.promoted)));
        lines.push(format!("Relegated: {}", names(&report.relegated)));
    }
    lines.join("\n")
}

/// `(gain, loss)` multipliers by age.
fn age_factors(age: u8) -> (f64, f64) {
    match age {
        0..=21 => (1.3, 0.7),
        22..=28 => (1.0, 1.0),
        29..=31 => (0.8, 1.1),
        _ => (0.5, 1.5),
    }
}

/// Change in hidden points for one season.
fn development_delta<R: Rng>(rng: &mut R, p: &Player, share: f64, captain: bool) -> i32 {
    let mut gain = p.season_form > 10 && share >= MIN_PLAYING_SHARE;
    let mut loss = p.season_form < 10 || share < MIN_PLAYING_SHARE;
    if gain && rng.gen_bool(TREND_CANCEL) {
        gain = false;
    }
    if loss && rng.gen_bool(TREND_CANCEL) {
        loss = false;
    }
    let (mut up, mut down) = age_factors(p.age);
    if p.has_trait(PlayerTrait::Hardworking) {
        up *= 1.2;
    }
    if p.has_trait(PlayerTrait::Leader) || p.has_trait(PlayerTrait::Intelligent) {
        up *= 1.05;
    }
    if captain {
        up *= 1.05;
    }
    if p.has_trait(PlayerTrait::InjuryProne) {
        down *= 1.25;
    }
    if gain {
        (f64::from(rng.gen_range(8..=20u8)) * up).round() as i32
    } else if loss {
        -(f64::from(rng.gen_range(5..=15u8)) * down).round() as i32
    } else {
        rng.gen_range(-3..=3)
    }
}

/// Apply hidden points, rolling over into skill by at most [`MAX_SKILL_STEPS`].
fn apply_delta(p: &mut Player, delta: i32) {
    let mut hidden = i32::from(p.hidden) + delta;
    let mut steps = 0;
    while hidden > HIDDEN_SPAN && steps < MAX_SKILL_STEPS {
        hidden -= HIDDEN_SPAN;
        steps += 1;
    }
    while hidden < 1 && steps > -MAX_SKILL_STEPS {
        hidden += HIDDEN_SPAN;
        steps -= 1;
    }
    let skill = (i32::from(p.skill) + steps).clamp(i32::from(MIN_SKILL), i32::from(MAX_SKILL));
    p.skill = skill as u8;
    p.hidden = hidden.clamp(1, HIDDEN_SPAN) as u8;
}

/// Seeded development and ageing for every player, free agents included.
fn develop_players(graph: &mut EntityGraph) {
    let season = graph.season.number;
    let mut rng = rng::stream(graph.seed, Purpose::Development, season, 0);
    let stats = graph.season_stats();
    let mut played: BTreeMap<ClubId, u32> = BTreeMap::new();
    for f in graph.season_fixtures().filter(|f| f.is_played()) {
        *played.entry(f.home).or_default() += 1;
        *played.entry(f.away).or_default() += 1;
    }
    let captains: Vec<_> = graph.clubs.values().filter_map(|c| c.tactics.captain).collect();

    let mut changed = 0;
    for p in graph.players.values_mut() {
        let possible = p
            .club
            .and_then(|c| played.get(&c))
            .map_or(0, |n| n * u32::from(MATCH_MINUTES));
        let minutes = stats.get(&p.id).map_or(0, |s| s.minutes);
        let share = if possible == 0 {
            0.0
        } else {
            f64::from(minutes) / f64::from(possible)
        };
        let before = p.skill;
        let delta = development_delta(&mut rng, p, share, captains.contains(&p.id));
        apply_delta(p, delta);
        if p.skill != before {
            changed += 1;
        }
        p.form = rng.gen_range(9..=11);
        p.season_form = 10;
        p.age = p.age.saturating_add(1);
    }
    debug!(season, changed, "players developed");
}

/// Unplayed fixtures of the current season.
pub(crate) fn unplayed(graph: &EntityGraph) -> Vec<&Fixture> {
    graph.season_fixtures().filter(|f| !f.is_played()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::matchday;
    use crate::testutil::{play_out, small_career, started};
    use league_core::{validate_graph, Contract, LedgerCategory, PlayerId, Position, MAX_FORM};
    use proptest::prelude::*;

    fn player(age: u8, skill: u8, hidden: u8, season_form: u8) -> Player {
        Player {
            id: PlayerId(1),
            first_name: "Jon".into(),
            last_name: "Lund".into(),
            age,
            position: Position::MF,
            shirt_number: 8,
            skill,
            hidden,
            form: 10,
            season_form,
            traits: vec![],
            value: 0,
            club: None,
            contract: Contract {
                weekly_wage: 1_000,
                expires_season: 2,
            },
            injured_weeks: 0,
        }
    }

    #[test]
    fn start_only_from_a_fresh_or_ended_season() {
        let mut c = small_career(true);
        let s = start(&mut c).unwrap();
        assert_eq!(s.season, 1);
        assert_eq!(s.fixtures, 24 + 4);
        assert_eq!(start(&mut c).unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn ending_early_changes_nothing() {
        let mut c = started(small_career(true));
        matchday::advance_week(&mut c).unwrap();
        let divisions = c.graph.league.divisions.clone();
        let err = end(&mut c).unwrap_err();
        assert!(matches!(err, CareerError::NotAllFixturesPlayed { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(c.graph.league.divisions, divisions);
        assert!(c.graph.history.is_empty());

        let mut fresh = small_career(true);
        assert_eq!(end(&mut fresh).unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn full_season_promotes_relegates_and_rolls_over() {
        let mut c = play_out(started(small_career(true)));
        let tables: Vec<Vec<TableRow>> = c
            .graph
            .league
            .divisions
            .iter()
            .map(|d| c.graph.table(d.id))
            .collect();
        let bottom = tables[0].last().unwrap().club;
        let top = tables[1][0].club;
        let ages: BTreeMap<PlayerId, u8> =
            c.graph.players.values().map(|p| (p.id, p.age)).collect();
        let pools_before = c.graph.youth.pools.clone();

        let report = end(&mut c).unwrap();
        assert_eq!(report.season, 1);
        assert_eq!(report.promoted, vec![top]);
        assert_eq!(report.relegated, vec![bottom]);
        assert_eq!(report.divisions[0].champion, Some(tables[0][0].club));
        assert_eq!(report.prize_money.len(), 8);
        assert_eq!(report.youth_candidates, 24);
        assert!(report.cup_winner.is_some());
        assert_ne!(c.graph.youth.pools, pools_before);
        assert!(c.graph.league.divisions[0].clubs.contains(&top));
        assert!(c.graph.league.divisions[1].clubs.contains(&bottom));
        assert!(c
            .graph
            .players
            .values()
            .all(|p| p.age == ages[&p.id] + 1));
        assert_eq!(c.graph.history.len(), 1);
        validate_graph(&c.graph).unwrap();

        assert!(matches!(end(&mut c), Err(CareerError::AlreadyEnded(1))));

        let next = start(&mut c).unwrap();
        assert_eq!(next.season, 2);
        assert_eq!(
            next.start_date,
            small_career(true).graph.season.start_date + Duration::weeks(52)
        );
        assert_eq!(c.graph.season.calendar.today, next.start_date);
        assert!(unplayed(&c.graph).len() >= 24);
        validate_graph(&c.graph).unwrap();
    }

    #[test]
    fn calendar_pays_and_heals() {
        let mut c = small_career(true);
        let club = c.meta.managed_club.unwrap();
        let cash = c.graph.cash(club);
        let weekly = c.graph.clubs[&club].finances.weekly_sponsorship;
        let hurt = c.graph.squad(club)[0].id;
        c.graph.players.get_mut(&hurt).unwrap().injured_weeks = 2;
        let today = c.graph.season.calendar.today;

        let adv = advance_calendar(&mut c, 3).unwrap();
        assert_eq!(adv.weeks, 3);
        assert_eq!(adv.today, today + Duration::weeks(3));
        assert_eq!(adv.week, 4);
        assert_eq!(adv.sponsorship, 3 * 8 * weekly);
        assert_eq!(c.graph.cash(club), cash + 3 * weekly);
        assert_eq!(c.graph.players[&hurt].injured_weeks, 0);
        validate_graph(&c.graph).unwrap();
        let bought = c
            .graph
            .ledger
            .entries()
            .iter()
            .filter(|e| e.category == LedgerCategory::TransferPurchase)
            .count();
        assert_eq!(bought, adv.ai_signings);

        assert_eq!(
            advance_calendar(&mut c, 0).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            advance_calendar(&mut c, 53).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn booked_training_completes_when_the_week_passes() {
        let mut c = small_career(true);
        let club = c.meta.managed_club.unwrap();
        let player = c.graph.squad(club)[0].id;
        training::start_form_training(&mut c, club, player).unwrap();
        let form = c.graph.players[&player].form;

        let adv = advance_calendar(&mut c, 1).unwrap();
        assert_eq!(adv.trainings_completed, 1);
        assert!(c.graph.players[&player].form > form || form == MAX_FORM);
        assert!(c.graph.training.active_for(player).is_none());
        validate_graph(&c.graph).unwrap();
    }

    #[test]
    fn standings_cover_one_or_all_divisions() {
        let c = small_career(true);
        let all = standings(&c, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].level, 1);
        assert!(all.iter().all(|s| s.rows.len() == 4));
        let one = standings(&c, Some(DivisionId(2))).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].division, DivisionId(2));
        assert!(matches!(
            standings(&c, Some(DivisionId(9))),
            Err(CareerError::DivisionNotFound(_))
        ));
    }

    #[test]
    fn movements_swap_adjacent_divisions() {
        let row = |club: u32| TableRow {
            club: ClubId(club),
            name: format!("club {club}"),
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            points: 0,
        };
        let tables = vec![
            (DivisionId(1), (1..=4).map(row).collect::<Vec<_>>()),
            (DivisionId(2), (5..=8).map(row).collect()),
            (DivisionId(3), (9..=12).map(row).collect()),
        ];
        let (promoted, relegated, membership) = movements(&tables, 1);
        assert_eq!(promoted, vec![ClubId(5), ClubId(9)]);
        assert_eq!(relegated, vec![ClubId(4), ClubId(8)]);
        let ids = |v: &[u32]| v.iter().map(|i| ClubId(*i)).collect::<Vec<_>>();
        assert_eq!(membership[0], ids(&[1, 2, 3, 5]));
        assert_eq!(membership[1], ids(&[4, 6, 7, 9]));
        assert_eq!(membership[2], ids(&[8, 10, 11, 12]));

        let (p, r, m) = movements(&tables, 0);
        assert!(p.is_empty() && r.is_empty());
        assert_eq!(m[1], ids(&[5, 6, 7, 8]));
    }

    #[test]
    fn development_rolls_hidden_points_into_skill() {
        let mut p = player(24, 10, 95, 10);
        apply_delta(&mut p, 10);
        assert_eq!((p.skill, p.hidden), (11, 6));
        apply_delta(&mut p, -10);
        assert_eq!((p.skill, p.hidden), (10, 95));
        let mut q = player(24, 10, 50, 10);
        apply_delta(&mut q, 400);
        assert_eq!(q.skill, 12);
        assert_eq!(q.hidden, 99);
        let mut floor = player(24, 1, 3, 10);
        apply_delta(&mut floor, -20);
        assert_eq!(floor.skill, MIN_SKILL);
    }

    proptest! {
        #[test]
        fn development_stays_in_range(
            seed in any::<u64>(),
            age in 16u8..40,
            skill in 1u8..=30,
            hidden in 1u8..=99,
            form in 1u8..=20,
            share in 0.0f64..1.0,
        ) {
            let mut rng = rng::stream(seed, Purpose::Development, 1, 0);
            let mut p = player(age, skill, hidden, form);
            let delta = development_delta(&mut rng, &p, share, false);
            apply_delta(&mut p, delta);
            prop_assert!((MIN_SKILL..=MAX_SKILL).contains(&p.skill));
            prop_assert!((1..=99).contains(&p.hidden));
            prop_assert!((i32::from(p.skill) - i32::from(skill)).abs() <= MAX_SKILL_STEPS);
        }
    }
}
