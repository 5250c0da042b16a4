#![deny(warnings)]

//! Economic models: player valuation, seller behaviour and prize money.
//!
//! Everything here is pure: no graph access, no clock. Multipliers are kept as
//! [`Decimal`] and only the final amount is rounded to whole currency units.
//! This module provides validated utilities for:
//! - Market value of a player from skill, age, form and traits
//! - The acceptance threshold of a selling club for a transfer bid
//! - Seeded asking prices, junior signing fees and season prize money
//! - Training costs and when an engine club shops on the open market

use league_core::{Money, Player, PlayerTrait, Position};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Value of one point of open skill before multipliers.
pub const VALUE_PER_SKILL: Money = 400_000;
/// No player is ever valued below this.
pub const MIN_PLAYER_VALUE: Money = 50_000;
/// Lowest asking price for a club sale.
pub const MIN_CLUB_ASKING_PRICE: Money = 150_000;
/// Default sponsorship income per calendar week.
pub const DEFAULT_WEEKLY_SPONSORSHIP: Money = 600_000;
/// Default one-off sponsor activity payment.
pub const DEFAULT_SPONSOR_ACTIVITY: Money = 1_000_000;
/// Prize pot of the top division; lower levels get a fraction.
pub const TOP_DIVISION_PRIZE: Money = 4_000_000;
/// Price of one week of form training, paid up front.
pub const FORM_TRAINING_COST: Money = 200_000;
/// Weekly chance that a listing is picked up by an engine club, by seller kind.
pub const AI_FREE_AGENT_CHANCE: f64 = 0.08;
pub const AI_CLUB_SALE_CHANCE: f64 = 0.04;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Monetary values must be non-negative.
    #[error("invalid price or value: {0}")]
    InvalidPrice(Money),
    /// Table positions are 1-based and within the table.
    #[error("position {position} is outside a table of {size}")]
    InvalidPosition { position: usize, size: usize },
    /// Division levels start at 1.
    #[error("invalid division level {0}")]
    InvalidLevel(u8),
}

fn to_money(d: Decimal) -> Money {
    d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(Money::MAX)
}

/// Age curve: young players carry a premium, veterans a discount.
pub fn age_multiplier(age: u8) -> Decimal {
    match age {
        0..=20 => Decimal::new(135, 2),
        21..=23 => Decimal::new(115, 2),
        24..=28 => Decimal::ONE,
        29..=31 => Decimal::new(85, 2),
        _ => Decimal::new(70, 2),
    }
}

/// Combined multiplier of all traits.
pub fn trait_multiplier(traits: &[PlayerTrait]) -> Decimal {
    traits.iter().fold(Decimal::ONE, |acc, t| {
        let m = match t {
            PlayerTrait::Leader | PlayerTrait::Intelligent | PlayerTrait::Stamina => {
                Decimal::new(108, 2)
            }
            PlayerTrait::Quick => Decimal::new(105, 2),
            PlayerTrait::PenaltySpecialist | PlayerTrait::FreeKickSpecialist => {
                Decimal::new(104, 2)
            }
            PlayerTrait::InjuryProne => Decimal::new(80, 2),
            PlayerTrait::Inconsistent | PlayerTrait::CardProne => Decimal::new(90, 2),
            PlayerTrait::Aggressive | PlayerTrait::Hardworking => Decimal::ONE,
        };
        acc * m
    })
}

/// `0.85 + 0.15 * (form + season_form) / 20`; neutral form (10, 10) gives 1.0.
pub fn form_multiplier(form: u8, season_form: u8) -> Decimal {
    let sum = Decimal::from(u32::from(form) + u32::from(season_form));
    Decimal::new(85, 2) + Decimal::new(15, 2) * sum / Decimal::from(20)
}

/// Market value of a player in whole currency units.
///
/// Example:
/// let v = player_value(&player); // skill 5, age 25, neutral form, no traits
/// assert_eq!(v, 2_000_000);
pub fn player_value(p: &Player) -> Money {
    let skill = Decimal::from(VALUE_PER_SKILL * Money::from(p.skill.max(1)));
    let mut v = skill
        * age_multiplier(p.age)
        * form_multiplier(p.form, p.season_form)
        * trait_multiplier(&p.traits);
    if p.position == Position::GK {
        v *= Decimal::new(9, 1);
    }
    to_money(v).max(MIN_PLAYER_VALUE)
}

/// Fee to sign a youth candidate of the given value.
pub fn junior_signing_fee(value: Money) -> Money {
    to_money(Decimal::from(value.max(0)) * Decimal::new(6, 1))
}

/// Asking price for a club sale: `max(value, 150 000) * U(0.9, 1.2)`, seeded.
///
/// Example:
/// let a = asking_price_with_noise(1_000_000, 7).unwrap();
/// assert_eq!(a, asking_price_with_noise(1_000_000, 7).unwrap());
pub fn asking_price_with_noise(value: Money, seed: u64) -> Result<Money, EconError> {
    if value < 0 {
        return Err(EconError::InvalidPrice(value));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let per_mille: i64 = rng.gen_range(900..=1200);
    let base = Decimal::from(value.max(MIN_CLUB_ASKING_PRICE));
    Ok(to_money(base * Decimal::new(per_mille, 3)))
}

/// Prize money for finishing `position` (1-based) in a division of `size` clubs at `level`.
///
/// The pot halves with every level below the top; within a division it falls linearly
/// from the champion to the bottom club, who still receives a share.
pub fn prize_money(level: u8, position: usize, size: usize) -> Result<Money, EconError> {
    if level == 0 {
        return Err(EconError::InvalidLevel(level));
    }
    if position == 0 || position > size {
        return Err(EconError::InvalidPosition { position, size });
    }
    let pot = Decimal::from(TOP_DIVISION_PRIZE) / Decimal::from(1u64 << (level - 1).min(30));
    let share = Decimal::from(size - position + 1) / Decimal::from(size);
    Ok(to_money(pot * share))
}

/// An engine club only buys when its cash exceeds the price by 30 %.
pub fn covers_with_margin(cash: Money, price: Money) -> bool {
    Decimal::from(cash) > Decimal::from(price.max(0)) * Decimal::new(13, 1)
}

/// Weekly chance that an engine club buys a listing.
pub fn ai_purchase_chance(free_agent: bool) -> f64 {
    if free_agent {
        AI_FREE_AGENT_CHANCE
    } else {
        AI_CLUB_SALE_CHANCE
    }
}

/// What a selling club knows about itself when it weighs a bid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerContext {
    /// 1-based position in the live table.
    pub table_position: usize,
    pub table_size: usize,
    pub cash: Money,
    pub squad_size: usize,
    /// Sum of open skill over the squad; compared against the player's skill.
    pub squad_skill_total: u32,
    pub player_skill: u8,
}

/// Why a seller said no, beyond the price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefusalReason {
    PriceTooLow,
    SquadTooThin,
    ChasingTopPlaces,
}

/// Result of weighing a bid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SellerVerdict {
    pub accepted: bool,
    /// Minimum offer/value ratio the seller wanted.
    pub threshold: Decimal,
    /// Offer/value ratio of the bid.
    pub ratio: Decimal,
    pub reason: Option<RefusalReason>,
}

/// Minimum offer/value ratio a seller accepts. Never below 0.85.
pub fn seller_threshold(ctx: &SellerContext, offer: Money, value: Money) -> Decimal {
    let mut t = Decimal::new(105, 2);
    let pos = Decimal::from(ctx.table_position) / Decimal::from(ctx.table_size.max(1));
    if pos <= Decimal::new(25, 2) {
        t += Decimal::new(35, 2);
    } else if pos <= Decimal::new(5, 1) {
        t += Decimal::new(15, 2);
    } else if pos >= Decimal::new(9, 1) {
        t -= Decimal::new(15, 2);
    }

    if ctx.cash < value {
        t -= Decimal::new(1, 1);
    }
    if ctx.cash < offer / 2 {
        t -= Decimal::new(1, 1);
    }
    if ctx.cash > 7_500_000 {
        t += Decimal::new(5, 2);
    }

    if ctx.squad_size <= 14 {
        t += Decimal::new(15, 2);
    } else if ctx.squad_size >= 23 {
        t -= Decimal::new(5, 2);
    }

    if ctx.squad_size > 0 {
        let scaled = u64::from(ctx.player_skill) * ctx.squad_size as u64;
        let total = u64::from(ctx.squad_skill_total);
        let n = ctx.squad_size as u64;
        if scaled >= total + 2 * n {
            t += Decimal::new(1, 1);
        } else if scaled + n <= total {
            t -= Decimal::new(5, 2);
        }
    }
    t.max(Decimal::new(85, 2))
}

/// Decide whether a seller takes `offer` for a player worth `value`.
pub fn seller_verdict(ctx: &SellerContext, offer: Money, value: Money) -> SellerVerdict {
    let threshold = seller_threshold(ctx, offer, value);
    let ratio = Decimal::from(offer.max(0)) / Decimal::from(value.max(1));
    let accepted = ratio >= threshold;
    let reason = if accepted {
        None
    } else if ctx.squad_size <= 14 {
        Some(RefusalReason::SquadTooThin)
    } else if ctx.table_position * 2 <= ctx.table_size {
        Some(RefusalReason::ChasingTopPlaces)
    } else {
        Some(RefusalReason::PriceTooLow)
    };
    debug!(%threshold, %ratio, accepted, "seller weighed bid");
    SellerVerdict {
        accepted,
        threshold,
        ratio,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_core::{Contract, PlayerId};
    use proptest::prelude::*;

    fn player(skill: u8, age: u8) -> Player {
        Player {
            id: PlayerId(1),
            first_name: "Erik".into(),
            last_name: "Berg".into(),
            age,
            position: Position::MF,
            shirt_number: 8,
            skill,
            hidden: 50,
            form: 10,
            season_form: 10,
            traits: vec![],
            value: 0,
            club: None,
            contract: Contract {
                weekly_wage: 5_000,
                expires_season: 2,
            },
            injured_weeks: 0,
        }
    }

    fn ctx(position: usize, cash: Money, squad: usize) -> SellerContext {
        SellerContext {
            table_position: position,
            table_size: 12,
            cash,
            squad_size: squad,
            squad_skill_total: 5 * squad as u32,
            player_skill: 5,
        }
    }

    #[test]
    fn prime_age_neutral_form_is_linear_in_skill() {
        assert_eq!(player_value(&player(5, 25)), 2_000_000);
        assert_eq!(player_value(&player(10, 25)), 4_000_000);
    }

    #[test]
    fn goalkeepers_and_traits_adjust_value() {
        let mut gk = player(5, 25);
        gk.position = Position::GK;
        assert_eq!(player_value(&gk), 1_800_000);
        let mut leader = player(5, 25);
        leader.traits = vec![PlayerTrait::Leader, PlayerTrait::InjuryProne];
        assert_eq!(player_value(&leader), 1_728_000);
    }

    #[test]
    fn zero_skill_counts_as_one() {
        assert_eq!(player_value(&player(0, 25)), player_value(&player(1, 25)));
        assert!(player_value(&player(1, 40)) >= MIN_PLAYER_VALUE);
    }

    #[test]
    fn junior_fee_is_sixty_percent() {
        assert_eq!(junior_signing_fee(1_000_000), 600_000);
        assert_eq!(junior_signing_fee(-5), 0);
    }

    #[test]
    fn asking_price_is_seeded_and_bounded() {
        let a = asking_price_with_noise(1_000_000, 42).unwrap();
        assert_eq!(a, asking_price_with_noise(1_000_000, 42).unwrap());
        assert!((900_000..=1_200_000).contains(&a));
        let cheap = asking_price_with_noise(10_000, 1).unwrap();
        assert!(cheap >= 135_000);
        assert!(asking_price_with_noise(-1, 1).is_err());
    }

    #[test]
    fn prize_money_by_level_and_position() {
        assert_eq!(prize_money(1, 1, 12).unwrap(), 4_000_000);
        assert_eq!(prize_money(2, 1, 12).unwrap(), 2_000_000);
        assert_eq!(prize_money(1, 12, 12).unwrap(), 333_333);
        assert!(prize_money(1, 0, 12).is_err());
        assert!(prize_money(1, 13, 12).is_err());
        assert!(prize_money(0, 1, 12).is_err());
    }

    #[test]
    fn engine_clubs_keep_a_cash_margin() {
        assert!(covers_with_margin(1_300_001, 1_000_000));
        assert!(!covers_with_margin(1_300_000, 1_000_000));
        assert!(!covers_with_margin(0, 0));
        assert!(ai_purchase_chance(true) > ai_purchase_chance(false));
    }

    #[test]
    fn top_club_demands_a_premium() {
        let top = seller_threshold(&ctx(1, 5_000_000, 20), 2_000_000, 2_000_000);
        let bottom = seller_threshold(&ctx(12, 5_000_000, 20), 2_000_000, 2_000_000);
        assert_eq!(top, Decimal::new(140, 2));
        assert_eq!(bottom, Decimal::new(90, 2));
    }

    #[test]
    fn thin_squad_refuses() {
        let v = seller_verdict(&ctx(8, 5_000_000, 14), 2_100_000, 2_000_000);
        assert!(!v.accepted);
        assert_eq!(v.reason, Some(RefusalReason::SquadTooThin));
    }

    #[test]
    fn threshold_never_below_floor() {
        let poor = SellerContext {
            table_position: 12,
            table_size: 12,
            cash: 0,
            squad_size: 28,
            squad_skill_total: 28 * 9,
            player_skill: 5,
        };
        assert_eq!(seller_threshold(&poor, 10_000_000, 2_000_000), Decimal::new(85, 2));
        assert!(seller_verdict(&poor, 1_700_000, 2_000_000).accepted);
    }

    proptest! {
        #[test]
        fn value_monotonic_in_skill(skill in 1u8..29, age in 16u8..38) {
            prop_assert!(player_value(&player(skill + 1, age)) >= player_value(&player(skill, age)));
        }

        #[test]
        fn higher_offer_never_hurts(offer in 1i64..20_000_000, extra in 0i64..5_000_000, pos in 1usize..=12) {
            let c = ctx(pos, 3_000_000, 20);
            let low = seller_verdict(&c, offer, 2_000_000);
            let high = seller_verdict(&c, offer + extra, 2_000_000);
            prop_assert!(!low.accepted || high.accepted);
        }
    }
}
