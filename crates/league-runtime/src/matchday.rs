//! Playing fixtures: simulation, manual results, corrections and the weekly match loop.

use crate::error::CareerError;
use crate::schedule;
use crate::season::{self, CalendarAdvance};
use chrono::NaiveDate;
use league_core::{
    check_tactics, Career, ClubId, Competition, EntityGraph, EventKind, Fixture, FixtureId,
    FixtureResult, FixtureStatus, MatchMode, MatchReport, PlayerId, ResultOrigin, Tactics,
};
use league_match::{fixture_seed, pick_team_sheet, simulate, MatchSetup, PlayerProfile, TeamSheet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Ratings at or above this lift a player's form.
const FORM_UP_RATING: f32 = 7.5;
/// Ratings below this drop it.
const FORM_DOWN_RATING: f32 = 5.5;

/// Compact view of a played fixture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub fixture: FixtureId,
    pub competition: Competition,
    pub date: NaiveDate,
    pub home: ClubId,
    pub away: ClubId,
    pub home_name: String,
    pub away_name: String,
    pub home_goals: u8,
    pub away_goals: u8,
    pub penalties: Option<(u8, u8)>,
    pub origin: ResultOrigin,
    /// `(minute, scorer)` in match order; empty for entered results.
    pub scorers: Vec<(u8, PlayerId)>,
}

/// What `play_next_matchday` did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchdayReport {
    /// Calendar movement needed to reach the matchday, if any.
    pub advanced: Option<CalendarAdvance>,
    pub played: Vec<MatchSummary>,
}

pub(crate) fn fixture(graph: &EntityGraph, id: FixtureId) -> Result<&Fixture, CareerError> {
    graph.fixtures.get(&id).ok_or(CareerError::FixtureNotFound(id))
}

fn summarize(graph: &EntityGraph, id: FixtureId) -> Result<MatchSummary, CareerError> {
    let f = fixture(graph, id)?;
    let result = f
        .result()
        .ok_or_else(|| CareerError::state(format!("{id} has no result")))?;
    let scorers = result
        .report
        .as_ref()
        .map(|r| {
            r.goals()
                .filter_map(|e| match e.kind {
                    EventKind::Goal { scorer, .. } => Some((e.minute, scorer)),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(MatchSummary {
        fixture: id,
        competition: f.competition,
        date: f.date,
        home: f.home,
        away: f.away,
        home_name: graph.club_name(f.home),
        away_name: graph.club_name(f.away),
        home_goals: result.home_goals,
        away_goals: result.away_goals,
        penalties: result.penalties,
        origin: result.origin,
        scorers,
    })
}

/// Team sheet of a club from its current squad and tactics.
pub(crate) fn team_sheet(graph: &EntityGraph, club: ClubId) -> Result<TeamSheet, CareerError> {
    let tactics = &graph
        .clubs
        .get(&club)
        .ok_or(CareerError::ClubNotFound(club))?
        .tactics;
    let squad: Vec<PlayerProfile> = graph
        .squad(club)
        .into_iter()
        .map(PlayerProfile::from)
        .collect();
    Ok(pick_team_sheet(club, &squad, tactics)?)
}

fn match_setup(graph: &EntityGraph, f: &Fixture, mode: MatchMode) -> Result<MatchSetup, CareerError> {
    Ok(MatchSetup {
        home: team_sheet(graph, f.home)?,
        away: team_sheet(graph, f.away)?,
        seed: fixture_seed(graph.seed, f.season, f.id),
        mode,
        knockout: matches!(f.competition, Competition::Cup { .. }),
    })
}

/// Store a result and apply what follows from it: injuries, form and cup progress.
fn record_result(graph: &mut EntityGraph, id: FixtureId, result: FixtureResult) {
    if let Some(report) = &result.report {
        apply_report(graph, report);
    }
    let is_cup = match graph.fixtures.get_mut(&id) {
        Some(f) => {
            f.status = FixtureStatus::Played(result);
            matches!(f.competition, Competition::Cup { .. })
        }
        None => return,
    };
    if is_cup {
        schedule::settle_cup_tie(graph, id);
    }
}

fn apply_report(graph: &mut EntityGraph, report: &MatchReport) {
    for (player, weeks) in report.injuries() {
        if let Some(p) = graph.players.get_mut(&player) {
            p.injured_weeks = p.injured_weeks.max(weeks);
        }
    }
    for (player, rating) in &report.ratings {
        let Some(p) = graph.players.get_mut(player) else {
            continue;
        };
        if *rating >= FORM_UP_RATING {
            p.form = (p.form + 1).min(20);
        } else if *rating < FORM_DOWN_RATING {
            p.form = p.form.saturating_sub(1).max(1);
        }
        let blended = 0.8 * f32::from(p.season_form) + 0.2 * f32::from(p.form);
        p.season_form = (blended.round() as u8).clamp(1, 20);
    }
}

fn ensure_playable(f: &Fixture) -> Result<(), CareerError> {
    match f.status {
        FixtureStatus::Played(_) => Err(CareerError::AlreadyPlayed(f.id)),
        FixtureStatus::Postponed => Err(CareerError::state(format!(
            "{} is postponed; reschedule it first",
            f.id
        ))),
        FixtureStatus::Scheduled => Ok(()),
    }
}

/// Simulate one fixture and record the result.
pub(crate) fn simulate_fixture(
    career: &mut Career,
    id: FixtureId,
    mode: MatchMode,
) -> Result<MatchSummary, CareerError> {
    let g = &mut career.graph;
    season::require_in_progress(g)?;
    let f = fixture(g, id)?;
    ensure_playable(f)?;
    let setup = match_setup(g, f, mode)?;
    let report = simulate(&setup)?;
    debug!(fixture = %id, home = report.home_goals, away = report.away_goals, "fixture simulated");
    let result = FixtureResult {
        home_goals: report.home_goals,
        away_goals: report.away_goals,
        penalties: report.penalties,
        origin: ResultOrigin::Simulated { seed: setup.seed },
        report: Some(report),
    };
    record_result(g, id, result);
    summarize(g, id)
}

/// Read-only simulation of an unplayed fixture. Agrees with the later real simulation as long
/// as neither squad changes in between.
pub(crate) fn preview(
    career: &Career,
    id: FixtureId,
    mode: MatchMode,
) -> Result<MatchReport, CareerError> {
    let g = &career.graph;
    let f = fixture(g, id)?;
    if f.is_played() {
        return Err(CareerError::AlreadyPlayed(id));
    }
    Ok(simulate(&match_setup(g, f, mode)?)?)
}

/// Enter a score directly. A postponed fixture may be settled this way.
pub(crate) fn set_result(
    career: &mut Career,
    id: FixtureId,
    home_goals: u8,
    away_goals: u8,
) -> Result<MatchSummary, CareerError> {
    let g = &mut career.graph;
    season::require_in_progress(g)?;
    let f = fixture(g, id)?;
    if f.is_played() {
        return Err(CareerError::AlreadyPlayed(id));
    }
    if matches!(f.competition, Competition::Cup { .. }) && home_goals == away_goals {
        return Err(CareerError::input(format!(
            "{id} is a cup tie and needs a winner"
        )));
    }
    record_result(
        g,
        id,
        FixtureResult {
            home_goals,
            away_goals,
            penalties: None,
            origin: ResultOrigin::Manual,
            report: None,
        },
    );
    info!(fixture = %id, home_goals, away_goals, "result entered");
    summarize(g, id)
}

/// Replace the score of a played fixture of the current season.
///
/// The match report is dropped. A cup result may only change if the tie keeps its winner,
/// since later rounds were drawn from it.
pub(crate) fn correct_result(
    career: &mut Career,
    id: FixtureId,
    home_goals: u8,
    away_goals: u8,
) -> Result<MatchSummary, CareerError> {
    let g = &mut career.graph;
    season::require_in_progress(g)?;
    let f = fixture(g, id)?;
    let Some(old) = f.result() else {
        return Err(CareerError::state(format!("{id} has not been played")));
    };
    let penalties = if home_goals == away_goals {
        old.penalties
    } else {
        None
    };
    let mut corrected = f.clone();
    corrected.status = FixtureStatus::Played(FixtureResult {
        home_goals,
        away_goals,
        penalties,
        origin: ResultOrigin::Corrected,
        report: None,
    });
    if matches!(f.competition, Competition::Cup { .. }) && corrected.winner() != f.winner() {
        return Err(CareerError::state(format!(
            "{id} decided a cup tie; the correction must keep its winner"
        )));
    }
    info!(fixture = %id, home_goals, away_goals, "result corrected");
    g.fixtures.insert(id, corrected);
    summarize(g, id)
}

/// Park a scheduled fixture.
pub(crate) fn postpone(career: &mut Career, id: FixtureId) -> Result<Fixture, CareerError> {
    let g = &mut career.graph;
    let season = g.season.number;
    let f = g
        .fixtures
        .get_mut(&id)
        .ok_or(CareerError::FixtureNotFound(id))?;
    if f.status != FixtureStatus::Scheduled || f.season != season {
        return Err(CareerError::state(format!(
            "only scheduled fixtures of the current season can be postponed, {id} cannot"
        )));
    }
    f.status = FixtureStatus::Postponed;
    let out = f.clone();
    update_round_pointer(g);
    Ok(out)
}

/// Give a postponed fixture a new date, no earlier than today.
pub(crate) fn reschedule(
    career: &mut Career,
    id: FixtureId,
    date: NaiveDate,
) -> Result<Fixture, CareerError> {
    let g = &mut career.graph;
    let today = g.season.calendar.today;
    if date < today {
        return Err(CareerError::input(format!(
            "{date} is before today ({today})"
        )));
    }
    let f = g
        .fixtures
        .get_mut(&id)
        .ok_or(CareerError::FixtureNotFound(id))?;
    if f.status != FixtureStatus::Postponed {
        return Err(CareerError::state(format!("{id} is not postponed")));
    }
    f.status = FixtureStatus::Scheduled;
    f.date = date;
    Ok(f.clone())
}

fn due_fixtures(graph: &EntityGraph) -> Vec<FixtureId> {
    let today = graph.season.calendar.today;
    let mut due: Vec<(NaiveDate, FixtureId)> = graph
        .season_fixtures()
        .filter(|f| f.status == FixtureStatus::Scheduled && f.date <= today)
        .map(|f| (f.date, f.id))
        .collect();
    due.sort();
    due.into_iter().map(|(_, id)| id).collect()
}

fn update_round_pointer(graph: &mut EntityGraph) {
    let next = graph
        .season_fixtures()
        .filter(|f| matches!(f.competition, Competition::League { .. }) && !f.is_played())
        .map(|f| f.round)
        .min();
    if let Some(round) = next {
        graph.season.calendar.round = round;
    }
}

/// Fails with the first club in `due` that cannot field a side.
fn check_team_sheets(graph: &EntityGraph, due: &[FixtureId]) -> Result<(), CareerError> {
    let mut clubs = BTreeSet::new();
    for id in due {
        let f = fixture(graph, *id)?;
        clubs.insert(f.home);
        clubs.insert(f.away);
    }
    for club in clubs {
        team_sheet(graph, club)?;
    }
    Ok(())
}

/// Play every due fixture in (date, id) order. Cup rounds drawn along the way are played too
/// if they are already due, so a second call without time passing plays nothing.
///
/// All or nothing: if any club due to play cannot field a side the whole matchday fails with
/// `InvalidSquad` and nothing is played.
pub(crate) fn advance_week(career: &mut Career) -> Result<Vec<MatchSummary>, CareerError> {
    season::require_in_progress(&career.graph)?;
    let mut played = Vec::new();
    loop {
        let due = due_fixtures(&career.graph);
        if due.is_empty() {
            break;
        }
        check_team_sheets(&career.graph, &due)?;
        for id in due {
            played.push(simulate_fixture(career, id, MatchMode::Quick)?);
        }
    }
    update_round_pointer(&mut career.graph);
    info!(
        played = played.len(),
        today = %career.graph.season.calendar.today,
        round = career.graph.season.calendar.round,
        "matchday played"
    );
    Ok(played)
}

/// Move the calendar to the next due fixture (when nothing is due yet) and play.
pub(crate) fn play_next_matchday(career: &mut Career) -> Result<MatchdayReport, CareerError> {
    season::require_in_progress(&career.graph)?;
    let g = &career.graph;
    let today = g.season.calendar.today;
    let next = g
        .season_fixtures()
        .filter(|f| f.status == FixtureStatus::Scheduled)
        .map(|f| f.date)
        .min();
    let Some(next) = next else {
        return Ok(MatchdayReport {
            advanced: None,
            played: Vec::new(),
        });
    };
    let advanced = if next > today {
        let days = (next - today).num_days();
        let weeks = u32::try_from((days + 6) / 7).unwrap_or(u32::MAX);
        Some(season::advance_calendar(career, weeks)?)
    } else {
        None
    };
    let played = advance_week(career)?;
    Ok(MatchdayReport { advanced, played })
}

/// Replace a club's tactics after checking them against its squad.
pub(crate) fn set_tactics(
    career: &mut Career,
    club: ClubId,
    tactics: Tactics,
) -> Result<Tactics, CareerError> {
    let g = &mut career.graph;
    let squad = g.squad_ids(club);
    let entry = g.clubs.get_mut(&club).ok_or(CareerError::ClubNotFound(club))?;
    check_tactics(&tactics, &squad)?;
    entry.tactics = tactics.clone();
    debug!(%club, formation = tactics.formation.label(), "tactics updated");
    Ok(tactics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testutil::{small_career, started};
    use league_core::{validate_graph, Formation, SeasonPhase};

    fn first_league_fixture(c: &Career) -> FixtureId {
        c.graph
            .season_fixtures()
            .find(|f| matches!(f.competition, Competition::League { .. }))
            .unwrap()
            .id
    }

    #[test]
    fn nothing_plays_before_the_season_starts() {
        let mut c = small_career(true);
        let id = first_league_fixture(&c);
        let err = simulate_fixture(&mut c, id, MatchMode::Quick).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(c.graph.season.phase, SeasonPhase::NotStarted);
    }

    #[test]
    fn simulated_fixture_cannot_be_played_twice() {
        let mut c = started(small_career(true));
        let id = first_league_fixture(&c);
        let summary = simulate_fixture(&mut c, id, MatchMode::Viewer).unwrap();
        assert!(matches!(summary.origin, ResultOrigin::Simulated { .. }));
        assert!(matches!(
            simulate_fixture(&mut c, id, MatchMode::Quick),
            Err(CareerError::AlreadyPlayed(_))
        ));
        assert!(matches!(
            set_result(&mut c, id, 1, 0),
            Err(CareerError::AlreadyPlayed(_))
        ));
        validate_graph(&c.graph).unwrap();
    }

    #[test]
    fn preview_matches_the_real_simulation() {
        let mut c = started(small_career(true));
        let id = first_league_fixture(&c);
        let preview = preview(&c, id, MatchMode::Quick).unwrap();
        let summary = simulate_fixture(&mut c, id, MatchMode::Quick).unwrap();
        assert_eq!(
            (preview.home_goals, preview.away_goals),
            (summary.home_goals, summary.away_goals)
        );
        assert!(preview_is_refused_after_play(&c, id));
    }

    fn preview_is_refused_after_play(c: &Career, id: FixtureId) -> bool {
        matches!(preview(c, id, MatchMode::Quick), Err(CareerError::AlreadyPlayed(_)))
    }

    #[test]
    fn advance_week_is_idempotent_without_time_passing() {
        let mut c = started(small_career(true));
        let first = advance_week(&mut c).unwrap();
        assert_eq!(first.len(), 4);
        assert!(advance_week(&mut c).unwrap().is_empty());
        assert_eq!(c.graph.season.calendar.round, 2);
        validate_graph(&c.graph).unwrap();
    }

    #[test]
    fn matchdays_walk_through_league_and_cup() {
        let mut c = started(small_career(true));
        let mut total = 0;
        for _ in 0..40 {
            let report = play_next_matchday(&mut c).unwrap();
            if report.played.is_empty() {
                break;
            }
            total += report.played.len();
            validate_graph(&c.graph).unwrap();
        }
        // Two divisions of four clubs: 12 league fixtures each, plus a cup of 7 ties.
        assert_eq!(total, 24 + 7);
        let cup = c.graph.season.cup.as_ref().unwrap();
        assert!(cup.winner.is_some());
        assert!(c.graph.season_fixtures().all(Fixture::is_played));
    }

    #[test]
    fn manual_results_need_a_cup_winner() {
        let mut c = started(small_career(true));
        let cup_fixture = c
            .graph
            .season_fixtures()
            .find(|f| matches!(f.competition, Competition::Cup { .. }))
            .unwrap()
            .id;
        let err = set_result(&mut c, cup_fixture, 2, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let s = set_result(&mut c, cup_fixture, 3, 1).unwrap();
        assert_eq!(s.origin, ResultOrigin::Manual);
        assert!(s.scorers.is_empty());

        let err = correct_result(&mut c, cup_fixture, 0, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        let s = correct_result(&mut c, cup_fixture, 2, 0).unwrap();
        assert_eq!(s.origin, ResultOrigin::Corrected);
        validate_graph(&c.graph).unwrap();
    }

    #[test]
    fn corrections_need_a_played_fixture() {
        let mut c = started(small_career(true));
        let id = first_league_fixture(&c);
        assert_eq!(
            correct_result(&mut c, id, 1, 1).unwrap_err().kind(),
            ErrorKind::InvalidState
        );
        set_result(&mut c, id, 0, 0).unwrap();
        let s = correct_result(&mut c, id, 4, 4).unwrap();
        assert_eq!((s.home_goals, s.away_goals), (4, 4));
    }

    #[test]
    fn postponed_fixtures_wait_for_a_new_date() {
        let mut c = started(small_career(true));
        let id = first_league_fixture(&c);
        postpone(&mut c, id).unwrap();
        assert!(postpone(&mut c, id).is_err());
        let played = advance_week(&mut c).unwrap();
        assert!(played.iter().all(|s| s.fixture != id));
        assert!(matches!(
            simulate_fixture(&mut c, id, MatchMode::Quick),
            Err(CareerError::InvalidState(_))
        ));

        let today = c.graph.season.calendar.today;
        let yesterday = today.pred_opt().unwrap();
        assert_eq!(
            reschedule(&mut c, id, yesterday).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        let f = reschedule(&mut c, id, today).unwrap();
        assert_eq!(f.status, FixtureStatus::Scheduled);
        let played = advance_week(&mut c).unwrap();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].fixture, id);
    }

    #[test]
    fn tactics_are_checked_against_the_squad() {
        let mut c = small_career(true);
        let club = c.meta.managed_club.unwrap();
        let outsider = c
            .graph
            .players
            .values()
            .find(|p| p.club != Some(club))
            .unwrap()
            .id;
        let bad = Tactics {
            captain: Some(outsider),
            ..Tactics::default()
        };
        assert_eq!(
            set_tactics(&mut c, club, bad).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        let good = Tactics {
            formation: Formation::F433,
            tempo: 120,
            ..Tactics::default()
        };
        set_tactics(&mut c, club, good.clone()).unwrap();
        assert_eq!(c.graph.clubs[&club].tactics, good);
    }

    #[test]
    fn squads_without_eleven_fit_players_cannot_play() {
        let mut c = started(small_career(true));
        let id = first_league_fixture(&c);
        let home = c.graph.fixtures[&id].home;
        for p in c.graph.players.values_mut().filter(|p| p.club == Some(home)) {
            p.injured_weeks = 3;
        }
        let err = simulate_fixture(&mut c, id, MatchMode::Quick).unwrap_err();
        assert!(matches!(err, CareerError::InvalidSquad(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn one_short_squad_stops_the_whole_matchday_before_kick_off() {
        let mut c = started(small_career(true));
        let due = due_fixtures(&c.graph);
        let last = c.graph.fixtures[due.last().unwrap()].away;
        for p in c.graph.players.values_mut().filter(|p| p.club == Some(last)) {
            p.injured_weeks = 3;
        }
        let err = advance_week(&mut c).unwrap_err();
        assert!(matches!(err, CareerError::InvalidSquad(_)));
        assert!(c.graph.season_fixtures().all(|f| !f.is_played()));
        assert_eq!(due_fixtures(&c.graph), due);
    }
}
