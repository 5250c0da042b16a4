//! Form training: a club pays up front and the player's form rises when the week is over.

use crate::error::CareerError;
use crate::mail;
use crate::rng::{self, Purpose};
use league_core::{
    Career, ClubId, LedgerCategory, Money, PlayerId, PlayerTrait, Posting, TrainingId,
    TrainingOrder, TrainingStatus, MAX_FORM,
};
use league_econ::FORM_TRAINING_COST;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Calendar weeks a form training order runs.
const TRAINING_WEEKS: u8 = 1;

/// A placed training order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingReceipt {
    pub order: TrainingId,
    pub club: ClubId,
    pub player: PlayerId,
    pub cost: Money,
    /// Club balance after paying.
    pub balance: Money,
    pub weeks_left: u8,
}

/// Form points from one completed order: 2..=5, plus 1..=3 for a hard worker.
fn form_boost<R: Rng>(rng: &mut R, hardworking: bool) -> u8 {
    let base = rng.gen_range(2..=5u8);
    if hardworking {
        base + rng.gen_range(1..=3u8)
    } else {
        base
    }
}

/// Book a week of form training for one of the club's players.
pub(crate) fn start_form_training(
    career: &mut Career,
    club: ClubId,
    player: PlayerId,
) -> Result<TrainingReceipt, CareerError> {
    let g = &mut career.graph;
    if !g.clubs.contains_key(&club) {
        return Err(CareerError::ClubNotFound(club));
    }
    let p = g.players.get(&player).ok_or(CareerError::PlayerNotFound(player))?;
    let name = p.full_name();
    if p.club != Some(club) {
        return Err(CareerError::input(format!(
            "{name} does not play for {}",
            g.club_name(club)
        )));
    }
    if g.training.active_for(player).is_some() {
        return Err(CareerError::state(format!(
            "{name} is already in form training"
        )));
    }
    let (season, week) = (g.season.number, g.season.calendar.week);
    g.ledger.debit(Posting {
        club,
        season,
        week,
        category: LedgerCategory::Training,
        amount: FORM_TRAINING_COST,
        voluntary: true,
        memo: format!("form training {name}"),
    })?;
    let id = g.ids.training();
    g.training.orders.insert(
        id,
        TrainingOrder {
            id,
            club,
            player,
            season,
            week,
            weeks_left: TRAINING_WEEKS,
            cost: FORM_TRAINING_COST,
            status: TrainingStatus::Active,
            boost: None,
        },
    );
    info!(%club, %player, order = %id, "form training booked");
    Ok(TrainingReceipt {
        order: id,
        club,
        player,
        cost: FORM_TRAINING_COST,
        balance: g.cash(club),
        weeks_left: TRAINING_WEEKS,
    })
}

/// Count one week off every running order and apply the boost of those that finish.
/// Returns the number of orders completed.
pub(crate) fn process_week(career: &mut Career) -> usize {
    let g = &mut career.graph;
    let (season, week) = (g.season.number, g.season.calendar.week);
    let mut rng = rng::stream(g.seed, Purpose::Training, season, week);
    let running: Vec<TrainingId> = g.training.active().map(|o| o.id).collect();
    let mut finished = Vec::new();
    for id in running {
        let Some(order) = g.training.orders.get_mut(&id) else {
            continue;
        };
        order.weeks_left = order.weeks_left.saturating_sub(1);
        if order.weeks_left > 0 {
            continue;
        }
        let Some(p) = g.players.get_mut(&order.player) else {
            order.status = TrainingStatus::Cancelled;
            continue;
        };
        let boost = form_boost(&mut rng, p.has_trait(PlayerTrait::Hardworking));
        p.form = p.form.saturating_add(boost).clamp(1, MAX_FORM);
        p.season_form = p.season_form.saturating_add(boost.div_ceil(2)).min(MAX_FORM);
        order.status = TrainingStatus::Done;
        order.boost = Some(boost);
        finished.push((order.club, p.full_name(), boost, p.form));
    }
    for (club, name, boost, form) in &finished {
        mail::notify_clubs(
            career,
            &[*club],
            format!("{name} completes form training"),
            format!("{name} gains {boost} form and is now at {form}."),
        );
    }
    debug!(completed = finished.len(), "training processed");
    finished.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testutil::small_career;
    use league_core::validate_graph;
    use proptest::prelude::*;

    fn managed(c: &Career) -> ClubId {
        c.meta.managed_club.unwrap()
    }

    #[test]
    fn booking_debits_the_fee_once_per_player() {
        let mut c = small_career(true);
        let club = managed(&c);
        let player = c.graph.squad(club)[0].id;
        let cash = c.graph.cash(club);

        let receipt = start_form_training(&mut c, club, player).unwrap();
        assert_eq!(receipt.cost, FORM_TRAINING_COST);
        assert_eq!(receipt.balance, cash - FORM_TRAINING_COST);
        assert_eq!(c.graph.training.active_for(player).map(|o| o.id), Some(receipt.order));
        validate_graph(&c.graph).unwrap();

        let err = start_form_training(&mut c, club, player).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(c.graph.cash(club), cash - FORM_TRAINING_COST);
    }

    #[test]
    fn only_own_players_can_be_booked() {
        let mut c = small_career(true);
        let club = managed(&c);
        let other = c
            .graph
            .players
            .values()
            .find(|p| p.club.is_some() && p.club != Some(club))
            .unwrap()
            .id;
        assert_eq!(
            start_form_training(&mut c, club, other).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert!(matches!(
            start_form_training(&mut c, ClubId(99), other),
            Err(CareerError::ClubNotFound(_))
        ));
        assert!(matches!(
            start_form_training(&mut c, club, PlayerId(9_999)),
            Err(CareerError::PlayerNotFound(_))
        ));
    }

    #[test]
    fn booking_needs_the_fee() {
        let mut c = small_career(true);
        let club = managed(&c);
        let player = c.graph.squad(club)[0].id;
        let cash = c.graph.cash(club);
        c.graph
            .ledger
            .debit(Posting {
                club,
                season: 1,
                week: 1,
                category: LedgerCategory::TransferPurchase,
                amount: cash - FORM_TRAINING_COST + 1,
                voluntary: true,
                memo: "drain".into(),
            })
            .unwrap();
        let err = start_form_training(&mut c, club, player).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert!(c.graph.training.orders.is_empty());
    }

    #[test]
    fn a_finished_week_lifts_form() {
        let mut c = small_career(true);
        let club = managed(&c);
        let player = c.graph.squad(club)[0].id;
        c.graph.players.get_mut(&player).unwrap().traits.clear();
        let form = c.graph.players[&player].form;
        let receipt = start_form_training(&mut c, club, player).unwrap();

        assert_eq!(process_week(&mut c), 1);
        let order = &c.graph.training.orders[&receipt.order];
        assert_eq!(order.status, TrainingStatus::Done);
        let boost = order.boost.unwrap();
        assert!((2..=5).contains(&boost));
        assert_eq!(c.graph.players[&player].form, (form + boost).min(MAX_FORM));
        assert!(c.graph.training.active_for(player).is_none());
        assert!(c
            .graph
            .mailbox
            .items()
            .iter()
            .any(|m| m.subject.ends_with("completes form training")));
        assert_eq!(process_week(&mut c), 0);
        validate_graph(&c.graph).unwrap();
    }

    #[test]
    fn a_released_player_loses_the_booking() {
        let mut c = small_career(true);
        let club = managed(&c);
        let player = c.graph.squad(club)[0].id;
        let form = c.graph.players[&player].form;
        let receipt = start_form_training(&mut c, club, player).unwrap();
        c.graph.relocate_player(player, None);

        assert_eq!(process_week(&mut c), 0);
        assert_eq!(
            c.graph.training.orders[&receipt.order].status,
            TrainingStatus::Cancelled
        );
        assert_eq!(c.graph.players[&player].form, form);
    }

    proptest! {
        #[test]
        fn boosts_stay_in_range(seed in any::<u64>(), hardworking in any::<bool>()) {
            let mut rng = rng::stream(seed, Purpose::Training, 1, 1);
            let boost = form_boost(&mut rng, hardworking);
            let top = if hardworking { 8 } else { 5 };
            prop_assert!((2..=top).contains(&boost));
        }
    }
}
