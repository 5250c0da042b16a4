//! Players, positions and traits.

use crate::ids::{ClubId, PlayerId};
use crate::ledger::Money;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowest open skill rating.
pub const MIN_SKILL: u8 = 1;
/// Highest open skill rating.
pub const MAX_SKILL: u8 = 30;
/// Form ratings live in 1..=20 with 10 as neutral.
pub const NEUTRAL_FORM: u8 = 10;
pub const MAX_FORM: u8 = 20;

/// Playing position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    /// Goalkeeper
    GK,
    /// Defender
    DF,
    /// Midfielder
    MF,
    /// Forward
    FW,
}

impl Position {
    /// All positions in line order.
    pub const ALL: [Position; 4] = [Position::GK, Position::DF, Position::MF, Position::FW];

    /// True for every position except goalkeeper.
    pub fn is_outfield(self) -> bool {
        self != Position::GK
    }

    /// Index into per-unit arrays (GK=0 .. FW=3).
    pub fn index(self) -> usize {
        match self {
            Position::GK => 0,
            Position::DF => 1,
            Position::MF => 2,
            Position::FW => 3,
        }
    }

    /// Short code, e.g. "MF".
    pub fn as_str(self) -> &'static str {
        match self {
            Position::GK => "GK",
            Position::DF => "DF",
            Position::MF => "MF",
            Position::FW => "FW",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a position code cannot be parsed.
#[derive(Debug, Error, PartialEq)]
#[error("unknown position '{0}', expected GK, DF, MF or FW")]
pub struct ParsePositionError(pub String);

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GK" => Ok(Position::GK),
            "DF" => Ok(Position::DF),
            "MF" => Ok(Position::MF),
            "FW" => Ok(Position::FW),
            _ => Err(ParsePositionError(s.to_string())),
        }
    }
}

/// Personality and playing traits. The last three are negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayerTrait {
    Leader,
    Intelligent,
    Quick,
    Stamina,
    Aggressive,
    PenaltySpecialist,
    FreeKickSpecialist,
    Hardworking,
    InjuryProne,
    Inconsistent,
    CardProne,
}

impl PlayerTrait {
    /// Every trait, used when drawing random traits.
    pub const ALL: [PlayerTrait; 11] = [
        PlayerTrait::Leader,
        PlayerTrait::Intelligent,
        PlayerTrait::Quick,
        PlayerTrait::Stamina,
        PlayerTrait::Aggressive,
        PlayerTrait::PenaltySpecialist,
        PlayerTrait::FreeKickSpecialist,
        PlayerTrait::Hardworking,
        PlayerTrait::InjuryProne,
        PlayerTrait::Inconsistent,
        PlayerTrait::CardProne,
    ];
}

/// Employment terms. Ownership lives on [`Player::club`], not here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Weekly wage in the smallest currency unit.
    pub weekly_wage: Money,
    /// Last season covered by the contract.
    pub expires_season: u32,
}

/// A footballer. Belongs to at most one club at a time through `club`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub first_name: String,
    pub last_name: String,
    /// Age in whole years.
    pub age: u8,
    pub position: Position,
    pub shirt_number: u8,
    /// Open skill rating in [`MIN_SKILL`, `MAX_SKILL`].
    pub skill: u8,
    /// Hidden development points (1..=99); rolls over into skill at season end.
    pub hidden: u8,
    /// Current form (1..=20).
    pub form: u8,
    /// Season form (1..=20).
    pub season_form: u8,
    pub traits: Vec<PlayerTrait>,
    /// Last computed market value.
    pub value: Money,
    /// Owning club; `None` is the free-agent pool.
    pub club: Option<ClubId>,
    pub contract: Contract,
    /// Weeks until fit again after an injury.
    pub injured_weeks: u8,
}

impl Player {
    /// "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether the player carries a trait.
    pub fn has_trait(&self, t: PlayerTrait) -> bool {
        self.traits.contains(&t)
    }

    /// Not owned by any club.
    pub fn is_free_agent(&self) -> bool {
        self.club.is_none()
    }

    /// Fit to be picked.
    pub fn is_available(&self) -> bool {
        self.injured_weeks == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_parses_case_insensitively() {
        assert_eq!("mf".parse::<Position>(), Ok(Position::MF));
        assert_eq!(" GK ".parse::<Position>(), Ok(Position::GK));
        assert!("striker".parse::<Position>().is_err());
    }

    #[test]
    fn outfield_excludes_goalkeeper() {
        let outfield: Vec<_> = Position::ALL.iter().filter(|p| p.is_outfield()).collect();
        assert_eq!(outfield.len(), 3);
        assert_eq!(Position::FW.index(), 3);
    }
}
