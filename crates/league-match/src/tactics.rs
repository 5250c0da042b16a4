//! Tactical modifiers: unit weights per formation, formation match-ups and aggression.

use league_core::{Aggression, Formation, Position};

/// Weighting of the four units plus attacking and defensive bonuses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitWeights {
    /// Indexed like [`Position::index`].
    pub units: [f64; 4],
    pub offence: f64,
    pub defence: f64,
}

impl UnitWeights {
    /// Weight of one unit.
    pub fn of(&self, pos: Position) -> f64 {
        self.units[pos.index()]
    }
}

/// Weights for a formation.
pub fn unit_weights(formation: Formation) -> UnitWeights {
    let (units, offence, defence) = match formation {
        Formation::F442 => ([0.20, 0.30, 0.30, 0.20], 1.00, 1.00),
        Formation::F451 => ([0.22, 0.35, 0.28, 0.15], 0.97, 0.98),
        Formation::F433 => ([0.18, 0.26, 0.28, 0.28], 1.03, 1.02),
        Formation::F4231 => ([0.18, 0.28, 0.34, 0.20], 1.02, 1.03),
        Formation::F4141 => ([0.20, 0.32, 0.30, 0.18], 0.99, 0.98),
    };
    UnitWeights {
        units,
        offence,
        defence,
    }
}

/// Multiplier on the attack of a side playing `own` against `other`.
///
/// Match-ups not listed are neutral.
pub fn counter_multiplier(own: Formation, other: Formation) -> f64 {
    use Formation::*;
    match (own, other) {
        (F442, F433) => 1.03,
        (F433, F442) => 0.98,
        (F451, F433) => 1.05,
        (F433, F451) => 0.96,
        (F4231, F451) => 1.04,
        (F451, F4231) => 0.97,
        (F4141, F4231) => 1.04,
        (F4231, F4141) => 0.97,
        (F4141, F433) => 1.02,
        (F433, F4141) => 0.99,
        _ => 1.0,
    }
}

/// `(attack, cards)` multipliers for an aggression level.
pub fn aggression_modifiers(aggression: Aggression) -> (f64, f64) {
    match aggression {
        Aggression::Calm => (0.99, 0.85),
        Aggression::Medium => (1.00, 1.00),
        Aggression::Aggressive => (1.02, 1.20),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_are_roughly_normalised() {
        for f in Formation::ALL {
            let sum: f64 = unit_weights(f).units.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "{f:?} sums to {sum}");
        }
    }

    #[test]
    fn counter_matrix_is_neutral_on_mirror() {
        for f in Formation::ALL {
            assert_eq!(counter_multiplier(f, f), 1.0);
        }
        assert!(counter_multiplier(Formation::F451, Formation::F433) > 1.0);
        assert!(counter_multiplier(Formation::F433, Formation::F451) < 1.0);
    }

    #[test]
    fn aggression_trades_cards_for_attack() {
        let (calm_att, calm_cards) = aggression_modifiers(Aggression::Calm);
        let (agg_att, agg_cards) = aggression_modifiers(Aggression::Aggressive);
        assert!(agg_att > calm_att);
        assert!(agg_cards > calm_cards);
    }
}
