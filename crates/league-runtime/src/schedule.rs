//! League fixtures and the cup bracket.

use chrono::{Duration, NaiveDate};
use league_core::{
    ClubId, Competition, Cup, CupRound, CupTie, EntityGraph, Fixture, FixtureId, FixtureStatus,
};
use tracing::debug;

/// Pairings per round for a circle-method round robin; `(home, away)`.
///
/// An odd number of clubs gets a rotating bye. The second half of a double round robin
/// mirrors the first with venues swapped.
pub(crate) fn round_robin(clubs: &[ClubId], double: bool) -> Vec<Vec<(ClubId, ClubId)>> {
    let mut slots: Vec<Option<ClubId>> = clubs.iter().copied().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let n = slots.len();
    if n < 2 {
        return Vec::new();
    }
    let mut rounds = Vec::with_capacity(n - 1);
    for r in 0..n - 1 {
        let mut pairs = Vec::with_capacity(n / 2);
        for i in 0..n / 2 {
            if let (Some(a), Some(b)) = (slots[i], slots[n - 1 - i]) {
                pairs.push(if (r + i) % 2 == 0 { (a, b) } else { (b, a) });
            }
        }
        rounds.push(pairs);
        slots[1..].rotate_right(1);
    }
    if double {
        let mirrored: Vec<Vec<(ClubId, ClubId)>> = rounds
            .iter()
            .map(|pairs| pairs.iter().map(|(h, a)| (*a, *h)).collect())
            .collect();
        rounds.extend(mirrored);
    }
    rounds
}

/// Date of league round `round` (1-based): one round per week from the season start.
pub(crate) fn round_date(start: NaiveDate, round: u32) -> NaiveDate {
    start + Duration::days(7 * i64::from(round.saturating_sub(1)))
}

/// Cup round `number` is played midweek, `interval` league weeks apart.
pub(crate) fn cup_round_date(start: NaiveDate, number: u8, interval: u32) -> NaiveDate {
    start + Duration::days(7 * i64::from(number) * i64::from(interval) - 3)
}

fn round_name(teams: usize) -> String {
    match teams {
        2 => "Final".to_string(),
        4 => "Semi-final".to_string(),
        8 => "Quarter-final".to_string(),
        n => format!("Round of {n}"),
    }
}

fn add_fixture(
    graph: &mut EntityGraph,
    competition: Competition,
    round: u32,
    date: NaiveDate,
    home: ClubId,
    away: ClubId,
) -> FixtureId {
    let id = graph.ids.fixture();
    graph.fixtures.insert(
        id,
        Fixture {
            id,
            season: graph.season.number,
            competition,
            round,
            date,
            home,
            away,
            status: FixtureStatus::Scheduled,
        },
    );
    id
}

/// Create the current season's league fixtures and, when enabled, draw the cup.
/// Returns the number of fixtures created.
pub(crate) fn schedule_season(graph: &mut EntityGraph) -> usize {
    let before = graph.fixtures.len();
    let start = graph.season.start_date;
    let double = graph.league.rules.double_round_robin;
    let divisions: Vec<_> = graph
        .league
        .divisions
        .iter()
        .map(|d| (d.id, d.clubs.clone()))
        .collect();
    let mut league_rounds = 0;
    for (division, clubs) in divisions {
        let rounds = round_robin(&clubs, double);
        league_rounds = league_rounds.max(rounds.len() as u32);
        for (r, pairs) in rounds.into_iter().enumerate() {
            let round = r as u32 + 1;
            for (home, away) in pairs {
                add_fixture(
                    graph,
                    Competition::League { division },
                    round,
                    round_date(start, round),
                    home,
                    away,
                );
            }
        }
    }
    graph.season.cup = None;
    if graph.league.rules.cup {
        draw_cup(graph, league_rounds);
    }
    let created = graph.fixtures.len() - before;
    debug!(season = graph.season.number, created, league_rounds, "season scheduled");
    created
}

fn draw_cup(graph: &mut EntityGraph, league_rounds: u32) {
    let entrants = graph.league.club_ids();
    let n = entrants.len();
    if n < 2 {
        return;
    }
    let size = n.next_power_of_two();
    let total_rounds = size.trailing_zeros() as u8;
    let interval = (league_rounds / (u32::from(total_rounds) + 1)).max(1);
    let date = cup_round_date(graph.season.start_date, 1, interval);

    let mut ties = Vec::with_capacity(size / 2);
    for i in 0..size / 2 {
        let home = entrants[i];
        let j = size - 1 - i;
        if j >= n {
            ties.push(CupTie {
                home,
                away: None,
                fixture: None,
                winner: Some(home),
            });
        } else {
            let away = entrants[j];
            let fixture = add_fixture(graph, Competition::Cup { round: 1 }, 1, date, home, away);
            ties.push(CupTie {
                home,
                away: Some(away),
                fixture: Some(fixture),
                winner: None,
            });
        }
    }
    graph.season.cup = Some(Cup {
        name: format!("{} Cup", graph.league.name),
        entrants,
        rounds: vec![CupRound {
            number: 1,
            name: round_name(size),
            date,
            ties,
        }],
        total_rounds,
        interval_weeks: interval,
        winner: None,
    });
}

/// Record the winner of a played cup fixture on its tie, then draw on if the round is done.
pub(crate) fn settle_cup_tie(graph: &mut EntityGraph, fixture: FixtureId) {
    let winner = graph.fixtures.get(&fixture).and_then(Fixture::winner);
    if let Some(cup) = graph.season.cup.as_mut() {
        for tie in cup.rounds.iter_mut().flat_map(|r| r.ties.iter_mut()) {
            if tie.fixture == Some(fixture) {
                tie.winner = winner;
            }
        }
    }
    progress_cup(graph);
}

/// Draw the next round once the last one is complete; crown the winner after the final.
fn progress_cup(graph: &mut EntityGraph) {
    loop {
        let Some(cup) = graph.season.cup.as_ref() else {
            return;
        };
        if cup.winner.is_some() {
            return;
        }
        let Some(last) = cup.rounds.last() else {
            return;
        };
        if !last.is_complete() {
            return;
        }
        let winners: Vec<ClubId> = last.ties.iter().filter_map(|t| t.winner).collect();
        if winners.len() <= 1 {
            let champion = winners.first().copied();
            if let Some(cup) = graph.season.cup.as_mut() {
                cup.winner = champion;
            }
            debug!(?champion, "cup decided");
            return;
        }
        let number = last.number + 1;
        let date = cup_round_date(graph.season.start_date, number, cup.interval_weeks);

        let mut ties = Vec::with_capacity(winners.len() / 2);
        for pair in winners.chunks(2) {
            match *pair {
                [home, away] => {
                    let fixture = add_fixture(
                        graph,
                        Competition::Cup { round: number },
                        u32::from(number),
                        date,
                        home,
                        away,
                    );
                    ties.push(CupTie {
                        home,
                        away: Some(away),
                        fixture: Some(fixture),
                        winner: None,
                    });
                }
                [home] => ties.push(CupTie {
                    home,
                    away: None,
                    fixture: None,
                    winner: Some(home),
                }),
                _ => {}
            }
        }
        let name = round_name(winners.len());
        debug!(round = number, %name, %date, "cup round drawn");
        if let Some(cup) = graph.season.cup.as_mut() {
            cup.rounds.push(CupRound {
                number,
                name,
                date,
                ties,
            });
        }
    }
}
