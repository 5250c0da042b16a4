//! Youth intake and the decisions a club takes on its candidates.

use crate::error::CareerError;
use crate::generate::{random_name, random_traits, wage_for, POSITION_WEIGHTS};
use crate::mail;
use crate::rng::{self, gauss_u8, pick_weighted, Purpose};
use league_core::{
    Career, ClubId, Contract, LedgerCategory, Money, Player, PlayerId, Position, Posting,
    SlotStatus, YouthCandidate, YouthPool, YouthSlot, MAX_SQUAD_SIZE, NEUTRAL_FORM,
};
use league_econ::{junior_signing_fee, player_value};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const TRAIT_COUNT_WEIGHTS: [f64; 3] = [50.0, 35.0, 15.0];
/// Share of draws that follow a club's position preference.
const PREFERENCE_SHARE: f64 = 0.5;
/// Seasons covered by a first contract.
const JUNIOR_CONTRACT_SEASONS: u32 = 3;

/// A junior who joined a squad.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JuniorSigning {
    pub club: ClubId,
    pub index: usize,
    pub player: PlayerId,
    pub fee: Money,
    /// Open candidates left in the pool.
    pub remaining: usize,
}

/// A candidate turned away.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JuniorRejection {
    pub club: ClubId,
    pub index: usize,
    pub remaining: usize,
}

fn junior_player(
    c: &YouthCandidate,
    id: PlayerId,
    club: Option<ClubId>,
    shirt: u8,
    season: u32,
) -> Player {
    let mut p = Player {
        id,
        first_name: c.first_name.clone(),
        last_name: c.last_name.clone(),
        age: c.age,
        position: c.position,
        shirt_number: shirt,
        skill: c.skill,
        hidden: c.hidden,
        form: NEUTRAL_FORM,
        season_form: NEUTRAL_FORM,
        traits: c.traits.clone(),
        value: 0,
        club,
        contract: Contract {
            weekly_wage: 0,
            expires_season: season + JUNIOR_CONTRACT_SEASONS,
        },
        injured_weeks: 0,
    };
    p.value = player_value(&p);
    p.contract.weekly_wage = wage_for(p.value);
    p
}

fn candidate<R: Rng>(rng: &mut R, preference: Option<Position>, season: u32) -> YouthCandidate {
    let position = match preference {
        Some(pos) if rng.gen_bool(PREFERENCE_SHARE) => pos,
        _ => pick_weighted(rng, &POSITION_WEIGHTS).unwrap_or(Position::MF),
    };
    let age = if rng.gen_bool(0.6) {
        rng.gen_range(17..=18)
    } else {
        rng.gen_range(16..=20)
    };
    let (first_name, last_name) = random_name(rng);
    let mut c = YouthCandidate {
        first_name,
        last_name,
        age,
        position,
        skill: gauss_u8(rng, 4.5, 1.8, 2, 12),
        hidden: rng.gen_range(30..=80),
        traits: random_traits(rng, &TRAIT_COUNT_WEIGHTS),
        signing_fee: 0,
    };
    let value = junior_player(&c, PlayerId(0), None, 0, season).value;
    c.signing_fee = junior_signing_fee(value);
    c
}

/// Replace every club's pool with a fresh intake. Returns the number of candidates drawn.
pub(crate) fn intake(career: &mut Career, step: u32) -> usize {
    let g = &mut career.graph;
    let season = g.season.number;
    let size = usize::from(g.league.rules.youth_pool_size);
    let mut rng = rng::stream(g.seed, Purpose::Youth, season, step);
    let mut drawn = 0;
    for club in g.league.club_ids() {
        let preference = g.clubs.get(&club).and_then(|c| c.youth_preference);
        let slots = (0..size)
            .map(|_| YouthSlot {
                candidate: candidate(&mut rng, preference, season),
                status: SlotStatus::Candidate,
            })
            .collect::<Vec<_>>();
        drawn += slots.len();
        g.youth.pools.insert(club, YouthPool { season, slots });
    }
    debug!(season, step, drawn, "youth intake");
    if let Some(club) = career.meta.managed_club {
        let names: Vec<String> = career
            .graph
            .youth
            .pools
            .get(&club)
            .map(|p| {
                p.slots
                    .iter()
                    .map(|s| {
                        let c = &s.candidate;
                        format!(
                            "{} {} ({}, age {}, skill {})",
                            c.first_name,
                            c.last_name,
                            c.position.as_str(),
                            c.age,
                            c.skill
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        mail::notify_clubs(career, &[club], "Youth intake", names.join("\n"));
    } else {
        mail::notify_all(
            career,
            "Youth intake",
            format!("{drawn} juniors are waiting for a decision."),
        );
    }
    drawn
}

fn open_slot(career: &Career, club: ClubId, index: usize) -> Result<&YouthSlot, CareerError> {
    let g = &career.graph;
    if !g.clubs.contains_key(&club) {
        return Err(CareerError::ClubNotFound(club));
    }
    let slots = g.youth.pools.get(&club).map_or(&[][..], |p| &p.slots[..]);
    let slot = slots.get(index).ok_or(CareerError::IndexOutOfRange {
        index,
        len: slots.len(),
    })?;
    if slot.status != SlotStatus::Candidate {
        return Err(CareerError::SlotConsumed { club, index });
    }
    Ok(slot)
}

/// Sign candidate `index` of a club's pool: pay the fee and move the junior into the squad.
pub(crate) fn accept_junior(
    career: &mut Career,
    club: ClubId,
    index: usize,
) -> Result<JuniorSigning, CareerError> {
    let c = open_slot(career, club, index)?.candidate.clone();
    let g = &mut career.graph;
    if g.squad(club).len() >= MAX_SQUAD_SIZE {
        return Err(CareerError::state(format!(
            "{} already has {MAX_SQUAD_SIZE} players",
            g.club_name(club)
        )));
    }
    let (season, week) = (g.season.number, g.season.calendar.week);
    g.ledger.debit(Posting {
        club,
        season,
        week,
        category: LedgerCategory::YouthSigning,
        amount: c.signing_fee,
        voluntary: true,
        memo: format!("youth signing {} {}", c.first_name, c.last_name),
    })?;
    let id = g.ids.player();
    let shirt = g.free_shirt_number(club);
    let player = junior_player(&c, id, Some(club), shirt, season);
    let name = player.full_name();
    g.players.insert(id, player);
    let remaining = match g.youth.pools.get_mut(&club) {
        Some(pool) => {
            pool.slots[index].status = SlotStatus::Accepted { player: id };
            pool.available()
        }
        None => 0,
    };
    info!(%club, index, player = %id, fee = c.signing_fee, "junior signed");
    mail::notify_clubs(
        career,
        &[club],
        format!("{name} signs"),
        format!("{name} joins the first team for a fee of {}.", c.signing_fee),
    );
    Ok(JuniorSigning {
        club,
        index,
        player: id,
        fee: c.signing_fee,
        remaining,
    })
}

/// Turn candidate `index` away. The slot stays in the pool as rejected.
pub(crate) fn reject_junior(
    career: &mut Career,
    club: ClubId,
    index: usize,
) -> Result<JuniorRejection, CareerError> {
    open_slot(career, club, index)?;
    let pool = career
        .graph
        .youth
        .pools
        .get_mut(&club)
        .ok_or(CareerError::IndexOutOfRange { index, len: 0 })?;
    pool.slots[index].status = SlotStatus::Rejected;
    Ok(JuniorRejection {
        club,
        index,
        remaining: pool.available(),
    })
}

/// Bias future intakes towards a position; `None` clears the preference.
pub(crate) fn set_youth_preference(
    career: &mut Career,
    club: ClubId,
    position: Option<Position>,
) -> Result<Option<Position>, CareerError> {
    let entry = career
        .graph
        .clubs
        .get_mut(&club)
        .ok_or(CareerError::ClubNotFound(club))?;
    entry.youth_preference = position;
    Ok(position)
}
