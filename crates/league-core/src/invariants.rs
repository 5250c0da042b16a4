//! Full consistency check of an entity graph.
//!
//! Run after every transaction; any error here is a defect in the operation that produced
//! the graph, never a user mistake.

use crate::club::{check_tactics, TacticsError, MAX_SQUAD_SIZE};
use crate::fixture::{Competition, FixtureStatus};
use crate::graph::EntityGraph;
use crate::ids::{BidId, ClubId, DivisionId, EntryId, FixtureId, ListingId, PlayerId, TrainingId};
use crate::market::{BidStatus, Seller};
use crate::player::{MAX_FORM, MAX_SKILL, MIN_SKILL};
use crate::season::SeasonPhase;
use crate::training::TrainingStatus;
use crate::youth::SlotStatus;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::debug;

/// A broken invariant.
#[derive(Debug, Error, PartialEq)]
pub enum InvariantError {
    #[error("{club} belongs to {count} divisions")]
    DivisionMembership { club: ClubId, count: usize },
    #[error("{division} lists unknown {club}")]
    UnknownDivisionClub { division: DivisionId, club: ClubId },
    #[error("division ids must be unique, {0} repeats")]
    DuplicateDivision(DivisionId),
    #[error("{key} is stored under a different id")]
    KeyMismatch { key: String },
    #[error("{player} is owned by unknown {club}")]
    UnknownOwner { player: PlayerId, club: ClubId },
    #[error("{player} has out-of-range attributes")]
    PlayerAttributes { player: PlayerId },
    #[error("{club} carries {size} players")]
    SquadTooLarge { club: ClubId, size: usize },
    #[error("tactics of {club}: {source}")]
    Tactics {
        club: ClubId,
        #[source]
        source: TacticsError,
    },
    #[error("{fixture} references an unknown club or division")]
    FixtureReference { fixture: FixtureId },
    #[error("{fixture} pits a club against itself")]
    FixtureSelfMatch { fixture: FixtureId },
    #[error("{fixture} result disagrees with its match report")]
    ResultMismatch { fixture: FixtureId },
    #[error("{fixture} is a drawn cup tie without a shoot-out")]
    UndecidedCupTie { fixture: FixtureId },
    #[error("{listing} does not match the current owner of its player")]
    ListingOwner { listing: ListingId },
    #[error("{player} has more than one active listing")]
    DuplicateListing { player: PlayerId },
    #[error("{bid} is pending but inconsistent with the graph")]
    StaleBid { bid: BidId },
    #[error("{entry} references an unknown club")]
    LedgerClub { entry: EntryId },
    #[error("ledger ids are not sequential at {entry}")]
    LedgerOrder { entry: EntryId },
    #[error("voluntary {entry} overdrew {club}")]
    Overdraft { entry: EntryId, club: ClubId },
    #[error("{entry} takes the balance of {club} out of range")]
    BalanceRange { entry: EntryId, club: ClubId },
    #[error("youth slot {index} of {club} is inconsistent")]
    YouthSlot { club: ClubId, index: usize },
    #[error("{order} is inconsistent with the graph")]
    TrainingOrder { order: TrainingId },
    #[error("{player} has more than one running training order")]
    DuplicateTraining { player: PlayerId },
    #[error("mail ids are not sequential")]
    MailOrder,
    #[error("cup bracket is inconsistent: {0}")]
    Cup(String),
    #[error("season {season} is ended but has unplayed fixtures")]
    EndedWithOpenFixtures { season: u32 },
    #[error("id counter for {0} is behind the data")]
    IdCounter(&'static str),
}

/// Check every invariant of the graph.
pub fn validate_graph(g: &EntityGraph) -> Result<(), InvariantError> {
    check_league(g)?;
    check_players(g)?;
    check_fixtures(g)?;
    check_market(g)?;
    check_ledger(g)?;
    check_youth(g)?;
    check_training(g)?;
    check_mail(g)?;
    check_cup(g)?;
    check_counters(g)?;
    debug!(
        clubs = g.clubs.len(),
        players = g.players.len(),
        fixtures = g.fixtures.len(),
        "graph validated"
    );
    Ok(())
}

fn check_league(g: &EntityGraph) -> Result<(), InvariantError> {
    let mut seen_divisions = BTreeSet::new();
    let mut membership: BTreeMap<ClubId, usize> = g.clubs.keys().map(|c| (*c, 0)).collect();
    for div in &g.league.divisions {
        if !seen_divisions.insert(div.id) {
            return Err(InvariantError::DuplicateDivision(div.id));
        }
        for club in &div.clubs {
            match membership.get_mut(club) {
                Some(n) => *n += 1,
                None => {
                    return Err(InvariantError::UnknownDivisionClub {
                        division: div.id,
                        club: *club,
                    })
                }
            }
        }
    }
    if let Some((club, count)) = membership.into_iter().find(|(_, n)| *n != 1) {
        return Err(InvariantError::DivisionMembership { club, count });
    }
    for (id, club) in &g.clubs {
        if *id != club.id {
            return Err(InvariantError::KeyMismatch {
                key: id.to_string(),
            });
        }
        let squad = g.squad_ids(*id);
        if squad.len() > MAX_SQUAD_SIZE {
            return Err(InvariantError::SquadTooLarge {
                club: *id,
                size: squad.len(),
            });
        }
        check_tactics(&club.tactics, &squad)
            .map_err(|source| InvariantError::Tactics { club: *id, source })?;
    }
    Ok(())
}

fn check_players(g: &EntityGraph) -> Result<(), InvariantError> {
    for (id, p) in &g.players {
        if *id != p.id {
            return Err(InvariantError::KeyMismatch {
                key: id.to_string(),
            });
        }
        if let Some(club) = p.club {
            if !g.clubs.contains_key(&club) {
                return Err(InvariantError::UnknownOwner { player: *id, club });
            }
        }
        let skill_ok = (MIN_SKILL..=MAX_SKILL).contains(&p.skill);
        let form_ok = (1..=MAX_FORM).contains(&p.form) && (1..=MAX_FORM).contains(&p.season_form);
        if !skill_ok || !form_ok || !(1..=99).contains(&p.hidden) || p.value < 0 {
            return Err(InvariantError::PlayerAttributes { player: *id });
        }
    }
    Ok(())
}

fn check_fixtures(g: &EntityGraph) -> Result<(), InvariantError> {
    for (id, f) in &g.fixtures {
        if *id != f.id {
            return Err(InvariantError::KeyMismatch {
                key: id.to_string(),
            });
        }
        if f.home == f.away {
            return Err(InvariantError::FixtureSelfMatch { fixture: *id });
        }
        let clubs_known = g.clubs.contains_key(&f.home) && g.clubs.contains_key(&f.away);
        let competition_known = match f.competition {
            Competition::League { division } => g.league.division(division).is_some(),
            Competition::Cup { .. } => true,
        };
        if !clubs_known || !competition_known {
            return Err(InvariantError::FixtureReference { fixture: *id });
        }
        if let FixtureStatus::Played(r) = &f.status {
            if let Some(report) = &r.report {
                if report.home_goals != r.home_goals
                    || report.away_goals != r.away_goals
                    || report.penalties != r.penalties
                {
                    return Err(InvariantError::ResultMismatch { fixture: *id });
                }
            }
            if matches!(f.competition, Competition::Cup { .. }) && f.winner().is_none() {
                return Err(InvariantError::UndecidedCupTie { fixture: *id });
            }
        } else if f.season == g.season.number && g.season.phase == SeasonPhase::Ended {
            return Err(InvariantError::EndedWithOpenFixtures { season: f.season });
        }
    }
    Ok(())
}

fn check_market(g: &EntityGraph) -> Result<(), InvariantError> {
    let mut listed = BTreeSet::new();
    for (id, l) in &g.market.listings {
        if *id != l.id {
            return Err(InvariantError::KeyMismatch {
                key: id.to_string(),
            });
        }
        if !listed.insert(l.player) {
            return Err(InvariantError::DuplicateListing { player: l.player });
        }
        let owner = g.players.get(&l.player).map(|p| p.club);
        let consistent = match (l.seller, owner) {
            (Seller::Club(c), Some(Some(owner))) => c == owner,
            (Seller::FreeAgent, Some(None)) => true,
            _ => false,
        };
        if !consistent || l.asking_price <= 0 {
            return Err(InvariantError::ListingOwner { listing: *id });
        }
    }
    for (id, b) in &g.market.bids {
        if *id != b.id {
            return Err(InvariantError::KeyMismatch {
                key: id.to_string(),
            });
        }
        if b.status != BidStatus::Pending {
            continue;
        }
        let owner = g.players.get(&b.player).and_then(|p| p.club);
        let ok = b.buyer != b.seller
            && owner == Some(b.seller)
            && g.clubs.contains_key(&b.buyer)
            && b.amount > 0;
        if !ok {
            return Err(InvariantError::StaleBid { bid: *id });
        }
    }
    Ok(())
}

fn check_ledger(g: &EntityGraph) -> Result<(), InvariantError> {
    for (i, e) in g.ledger.entries().iter().enumerate() {
        if e.id.0 as usize != i + 1 {
            return Err(InvariantError::LedgerOrder { entry: e.id });
        }
        if !g.clubs.contains_key(&e.club) {
            return Err(InvariantError::LedgerClub { entry: e.id });
        }
    }
    if let Some(e) = g.ledger.first_out_of_range() {
        return Err(InvariantError::BalanceRange {
            entry: e.id,
            club: e.club,
        });
    }
    if let Some(e) = g.ledger.first_overdraft() {
        return Err(InvariantError::Overdraft {
            entry: e.id,
            club: e.club,
        });
    }
    Ok(())
}

fn check_youth(g: &EntityGraph) -> Result<(), InvariantError> {
    for (club, pool) in &g.youth.pools {
        if !g.clubs.contains_key(club) {
            return Err(InvariantError::YouthSlot {
                club: *club,
                index: 0,
            });
        }
        for (index, slot) in pool.slots.iter().enumerate() {
            if let SlotStatus::Accepted { player } = slot.status {
                if !g.players.contains_key(&player) {
                    return Err(InvariantError::YouthSlot { club: *club, index });
                }
            }
        }
    }
    Ok(())
}

fn check_training(g: &EntityGraph) -> Result<(), InvariantError> {
    let mut running = BTreeSet::new();
    for (id, o) in &g.training.orders {
        if *id != o.id {
            return Err(InvariantError::KeyMismatch {
                key: id.to_string(),
            });
        }
        if !g.clubs.contains_key(&o.club) || !g.players.contains_key(&o.player) || o.cost < 0 {
            return Err(InvariantError::TrainingOrder { order: *id });
        }
        if o.status != TrainingStatus::Active {
            continue;
        }
        let owner = g.players.get(&o.player).and_then(|p| p.club);
        if owner != Some(o.club) || o.weeks_left == 0 {
            return Err(InvariantError::TrainingOrder { order: *id });
        }
        if !running.insert(o.player) {
            return Err(InvariantError::DuplicateTraining { player: o.player });
        }
    }
    Ok(())
}

fn check_mail(g: &EntityGraph) -> Result<(), InvariantError> {
    let sequential = g
        .mailbox
        .items()
        .iter()
        .enumerate()
        .all(|(i, m)| m.id.0 as usize == i + 1);
    if !sequential {
        return Err(InvariantError::MailOrder);
    }
    Ok(())
}

fn check_cup(g: &EntityGraph) -> Result<(), InvariantError> {
    let Some(cup) = &g.season.cup else {
        return Ok(());
    };
    let entrants: BTreeSet<ClubId> = cup.entrants.iter().copied().collect();
    if entrants.len() != cup.entrants.len() {
        return Err(InvariantError::Cup("duplicate entrant".into()));
    }
    for round in &cup.rounds {
        for tie in &round.ties {
            if !entrants.contains(&tie.home) || tie.away.is_some_and(|a| !entrants.contains(&a)) {
                return Err(InvariantError::Cup(format!("unknown club in {}", round.name)));
            }
            if let Some(fid) = tie.fixture {
                let Some(f) = g.fixtures.get(&fid) else {
                    return Err(InvariantError::Cup(format!("missing {fid}")));
                };
                if Some(f.away) != tie.away || f.home != tie.home {
                    return Err(InvariantError::Cup(format!("{fid} does not match its tie")));
                }
                if tie.winner.is_some() && tie.winner != f.winner() {
                    return Err(InvariantError::Cup(format!("{fid} winner mismatch")));
                }
            } else if tie.away.is_some() {
                return Err(InvariantError::Cup(format!("tie in {} has no fixture", round.name)));
            }
        }
    }
    if let Some(winner) = cup.winner {
        let final_winner = cup
            .rounds
            .last()
            .filter(|r| r.ties.len() == 1)
            .and_then(|r| r.ties[0].winner);
        if final_winner != Some(winner) {
            return Err(InvariantError::Cup("winner is not the final's winner".into()));
        }
    }
    Ok(())
}

fn check_counters(g: &EntityGraph) -> Result<(), InvariantError> {
    let max_player = g.players.keys().next_back().map_or(0, |p| p.0);
    if g.ids.next_player <= max_player {
        return Err(InvariantError::IdCounter("players"));
    }
    let max_fixture = g.fixtures.keys().next_back().map_or(0, |f| f.0);
    if g.ids.next_fixture <= max_fixture {
        return Err(InvariantError::IdCounter("fixtures"));
    }
    let max_listing = g.market.listings.keys().next_back().map_or(0, |l| l.0);
    if g.ids.next_listing <= max_listing {
        return Err(InvariantError::IdCounter("listings"));
    }
    let max_bid = g.market.bids.keys().next_back().map_or(0, |b| b.0);
    if g.ids.next_bid <= max_bid {
        return Err(InvariantError::IdCounter("bids"));
    }
    let max_training = g.training.orders.keys().next_back().map_or(0, |t| t.0);
    if g.ids.next_training <= max_training {
        return Err(InvariantError::IdCounter("training orders"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::club::{Club, Finances, Tactics};
    use crate::fixture::{Fixture, FixtureResult, ResultOrigin};
    use crate::ids::IdAllocator;
    use crate::league::{Division, League, LeagueRules};
    use crate::ledger::{LedgerCategory, Posting};
    use crate::market::{Bid, Listing};
    use crate::player::{Contract, Player, Position};
    use crate::season::{Calendar, Season};
    use crate::training::TrainingOrder;
    use chrono::NaiveDate;

    fn player(id: u32, club: Option<u32>) -> Player {
        Player {
            id: PlayerId(id),
            first_name: "Test".into(),
            last_name: format!("Player{id}"),
            age: 24,
            position: Position::MF,
            shirt_number: id as u8,
            skill: 5,
            hidden: 50,
            form: 10,
            season_form: 10,
            traits: vec![],
            value: 1_000_000,
            club: club.map(ClubId),
            contract: Contract {
                weekly_wage: 5_000,
                expires_season: 3,
            },
            injured_weeks: 0,
        }
    }

    fn club(id: u32, name: &str) -> Club {
        Club {
            id: ClubId(id),
            name: name.into(),
            short_name: name[..3].to_uppercase(),
            finances: Finances {
                weekly_sponsorship: 600_000,
            },
            tactics: Tactics::default(),
            youth_preference: None,
        }
    }

    fn graph() -> EntityGraph {
        let start = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();
        let mut g = EntityGraph {
            seed: 7,
            league: League {
                name: "Test".into(),
                rules: LeagueRules {
                    double_round_robin: true,
                    promotion_slots: 1,
                    cup: false,
                    youth_pool_size: 3,
                },
                divisions: vec![Division {
                    id: DivisionId(1),
                    name: "Top".into(),
                    level: 1,
                    clubs: vec![ClubId(1), ClubId(2)],
                }],
            },
            clubs: [(ClubId(1), club(1, "Example FC")), (ClubId(2), club(2, "Rival FC"))]
                .into_iter()
                .collect(),
            players: (1..=4)
                .map(|i| (PlayerId(i), player(i, Some(if i <= 2 { 1 } else { 2 }))))
                .collect(),
            fixtures: BTreeMap::new(),
            season: Season {
                number: 1,
                start_date: start,
                phase: SeasonPhase::InProgress,
                calendar: Calendar {
                    today: start,
                    week: 1,
                    round: 1,
                },
                cup: None,
            },
            market: Default::default(),
            ledger: Default::default(),
            youth: Default::default(),
            training: Default::default(),
            mailbox: Default::default(),
            history: vec![],
            ids: IdAllocator {
                next_player: 5,
                ..IdAllocator::default()
            },
        };
        for c in [1, 2] {
            g.ledger.post(Posting {
                club: ClubId(c),
                season: 1,
                week: 1,
                category: LedgerCategory::OpeningBalance,
                amount: 1_000_000,
                voluntary: false,
                memo: String::new(),
            })
            .unwrap();
        }
        g
    }

    #[test]
    fn sample_graph_is_valid() {
        validate_graph(&graph()).unwrap();
    }

    #[test]
    fn club_in_two_divisions_is_rejected() {
        let mut g = graph();
        g.league.divisions.push(Division {
            id: DivisionId(2),
            name: "Second".into(),
            level: 2,
            clubs: vec![ClubId(1)],
        });
        assert_eq!(
            validate_graph(&g),
            Err(InvariantError::DivisionMembership {
                club: ClubId(1),
                count: 2
            })
        );
    }

    #[test]
    fn unknown_owner_is_rejected() {
        let mut g = graph();
        g.players.get_mut(&PlayerId(1)).unwrap().club = Some(ClubId(99));
        assert!(matches!(
            validate_graph(&g),
            Err(InvariantError::UnknownOwner { .. })
        ));
    }

    #[test]
    fn listing_must_follow_owner() {
        let mut g = graph();
        g.market.listings.insert(
            ListingId(1),
            Listing {
                id: ListingId(1),
                player: PlayerId(1),
                seller: Seller::Club(ClubId(2)),
                asking_price: 100,
                season: 1,
                week: 1,
            },
        );
        g.ids.next_listing = 2;
        assert_eq!(
            validate_graph(&g),
            Err(InvariantError::ListingOwner {
                listing: ListingId(1)
            })
        );
        g.market.listings.get_mut(&ListingId(1)).unwrap().seller = Seller::Club(ClubId(1));
        validate_graph(&g).unwrap();
    }

    #[test]
    fn pending_bid_must_point_at_current_owner() {
        let mut g = graph();
        g.market.bids.insert(
            BidId(1),
            Bid {
                id: BidId(1),
                player: PlayerId(3),
                buyer: ClubId(1),
                seller: ClubId(2),
                amount: 500,
                status: BidStatus::Pending,
                season: 1,
                week: 1,
            },
        );
        g.ids.next_bid = 2;
        validate_graph(&g).unwrap();
        g.relocate_player(PlayerId(3), Some(ClubId(1)));
        assert_eq!(
            validate_graph(&g),
            Err(InvariantError::StaleBid { bid: BidId(1) })
        );
    }

    #[test]
    fn training_follows_the_player() {
        let mut g = graph();
        let order = |id: u32| TrainingOrder {
            id: TrainingId(id),
            club: ClubId(1),
            player: PlayerId(1),
            season: 1,
            week: 1,
            weeks_left: 1,
            cost: 200_000,
            status: TrainingStatus::Active,
            boost: None,
        };
        g.training.orders.insert(TrainingId(1), order(1));
        assert_eq!(
            validate_graph(&g),
            Err(InvariantError::IdCounter("training orders"))
        );
        g.ids.next_training = 3;
        validate_graph(&g).unwrap();

        g.training.orders.insert(TrainingId(2), order(2));
        assert_eq!(
            validate_graph(&g),
            Err(InvariantError::DuplicateTraining {
                player: PlayerId(1)
            })
        );
        g.training.orders.remove(&TrainingId(2));

        g.relocate_player(PlayerId(1), Some(ClubId(2)));
        assert_eq!(
            g.training.orders[&TrainingId(1)].status,
            TrainingStatus::Cancelled
        );
        validate_graph(&g).unwrap();

        g.training.orders.get_mut(&TrainingId(1)).unwrap().status = TrainingStatus::Active;
        assert_eq!(
            validate_graph(&g),
            Err(InvariantError::TrainingOrder {
                order: TrainingId(1)
            })
        );
    }

    #[test]
    fn voluntary_overdraft_is_rejected() {
        let mut g = graph();
        g.ledger.post(Posting {
            club: ClubId(1),
            season: 1,
            week: 1,
            category: LedgerCategory::TransferPurchase,
            amount: -2_000_000,
            voluntary: true,
            memo: String::new(),
        })
        .unwrap();
        assert!(matches!(
            validate_graph(&g),
            Err(InvariantError::Overdraft { .. })
        ));
    }

    #[test]
    fn out_of_range_balance_in_a_loaded_ledger_is_rejected() {
        let mut g = graph();
        let mut v = serde_json::to_value(&g.ledger).unwrap();
        v["entries"][1]["amount"] = serde_json::json!(i64::MAX);
        g.ledger = serde_json::from_value(v).unwrap();
        assert_eq!(
            validate_graph(&g),
            Err(InvariantError::BalanceRange {
                entry: EntryId(2),
                club: ClubId(2),
            })
        );
    }

    #[test]
    fn tactics_referencing_departed_player_are_rejected() {
        let mut g = graph();
        g.clubs.get_mut(&ClubId(1)).unwrap().tactics.lineup = vec![PlayerId(3)];
        assert!(matches!(
            validate_graph(&g),
            Err(InvariantError::Tactics { .. })
        ));
    }

    #[test]
    fn report_must_match_result() {
        use crate::report::{MatchMode, MatchReport, TeamStats};
        let mut g = graph();
        let report = MatchReport {
            mode: MatchMode::Quick,
            seed: 1,
            home_goals: 2,
            away_goals: 0,
            half_time: (1, 0),
            penalties: None,
            events: vec![],
            home_stats: TeamStats::default(),
            away_stats: TeamStats::default(),
            home_lineup: vec![],
            away_lineup: vec![],
            minutes: BTreeMap::new(),
            ratings: BTreeMap::new(),
        };
        g.fixtures.insert(
            FixtureId(1),
            Fixture {
                id: FixtureId(1),
                season: 1,
                competition: Competition::League {
                    division: DivisionId(1),
                },
                round: 1,
                date: g.season.start_date,
                home: ClubId(1),
                away: ClubId(2),
                status: FixtureStatus::Played(FixtureResult {
                    home_goals: 1,
                    away_goals: 0,
                    penalties: None,
                    origin: ResultOrigin::Simulated { seed: 1 },
                    report: Some(report),
                }),
            },
        );
        g.ids.next_fixture = 2;
        assert_eq!(
            validate_graph(&g),
            Err(InvariantError::ResultMismatch {
                fixture: FixtureId(1)
            })
        );
    }

    #[test]
    fn ended_season_needs_every_fixture_played() {
        let mut g = graph();
        g.fixtures.insert(
            FixtureId(1),
            Fixture {
                id: FixtureId(1),
                season: 1,
                competition: Competition::League {
                    division: DivisionId(1),
                },
                round: 1,
                date: g.season.start_date,
                home: ClubId(1),
                away: ClubId(2),
                status: FixtureStatus::Postponed,
            },
        );
        g.ids.next_fixture = 2;
        validate_graph(&g).unwrap();
        g.season.phase = SeasonPhase::Ended;
        assert!(matches!(
            validate_graph(&g),
            Err(InvariantError::EndedWithOpenFixtures { season: 1 })
        ));
    }

    #[test]
    fn graph_survives_json_roundtrip() {
        let g = graph();
        let s = serde_json::to_string(&g).unwrap();
        let back: EntityGraph = serde_json::from_str(&s).unwrap();
        assert_eq!(back, g);
    }
}
