//! Team sheets: who starts, in which role, and who waits on the bench.

use crate::MatchError;
use league_core::{ClubId, Player, PlayerId, PlayerTrait, Position, Tactics, STARTING_ELEVEN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Outfield players a side must field.
pub const MIN_OUTFIELD: usize = 10;
/// Substitutes named on a team sheet.
pub const BENCH_SIZE: usize = 7;

/// The parts of a player the match engine reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub position: Position,
    pub skill: u8,
    pub form: u8,
    pub traits: Vec<PlayerTrait>,
    pub available: bool,
}

impl From<&Player> for PlayerProfile {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id,
            position: p.position,
            skill: p.skill,
            form: p.form,
            traits: p.traits.clone(),
            available: p.is_available(),
        }
    }
}

impl PlayerProfile {
    /// Whether the player carries a trait.
    pub fn has_trait(&self, t: PlayerTrait) -> bool {
        self.traits.contains(&t)
    }
}

/// A starter and the role they fill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Starter {
    pub player: PlayerProfile,
    pub role: Position,
}

impl Starter {
    /// Playing away from the natural position.
    pub fn out_of_position(&self) -> bool {
        self.role != self.player.position
    }
}

/// Everything one side brings to a match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamSheet {
    pub club: ClubId,
    pub tactics: Tactics,
    pub starters: Vec<Starter>,
    /// Substitutes in order of preference.
    pub bench: Vec<PlayerProfile>,
}

impl TeamSheet {
    /// Outfield roles among the starters.
    pub fn outfield(&self) -> usize {
        self.starters.iter().filter(|s| s.role.is_outfield()).count()
    }

    /// Structural check used before every simulation.
    pub fn validate(&self) -> Result<(), MatchError> {
        if self.starters.len() != STARTING_ELEVEN || self.outfield() < MIN_OUTFIELD {
            return Err(MatchError::InvalidSquad {
                club: self.club,
                available: self.starters.len(),
                outfield: self.outfield(),
            });
        }
        let mut seen = BTreeSet::new();
        for id in self
            .starters
            .iter()
            .map(|s| s.player.id)
            .chain(self.bench.iter().map(|p| p.id))
        {
            if !seen.insert(id) {
                return Err(MatchError::DuplicatePlayer(id));
            }
        }
        Ok(())
    }
}

fn by_strength(a: &&PlayerProfile, b: &&PlayerProfile) -> std::cmp::Ordering {
    b.skill
        .cmp(&a.skill)
        .then(b.form.cmp(&a.form))
        .then(a.id.cmp(&b.id))
}

/// Pick a starting eleven and bench from a squad.
///
/// The club's preferred lineup is used when it names eleven fit players including exactly
/// one goalkeeper. Otherwise the formation's slots are filled with the strongest fit players
/// per position, topped up out of position when a unit is short.
pub fn pick_team_sheet(
    club: ClubId,
    squad: &[PlayerProfile],
    tactics: &Tactics,
) -> Result<TeamSheet, MatchError> {
    let fit: Vec<&PlayerProfile> = squad.iter().filter(|p| p.available).collect();
    let fit_outfield = fit.iter().filter(|p| p.position.is_outfield()).count();
    if fit.len() < STARTING_ELEVEN || fit_outfield < MIN_OUTFIELD {
        return Err(MatchError::InvalidSquad {
            club,
            available: fit.len(),
            outfield: fit_outfield,
        });
    }

    let starters = preferred_eleven(&fit, tactics).unwrap_or_else(|| {
        debug!(%club, formation = tactics.formation.label(), "automatic selection");
        auto_eleven(&fit, tactics)
    });

    let chosen: BTreeSet<PlayerId> = starters.iter().map(|s| s.player.id).collect();
    let mut rest: Vec<&PlayerProfile> = fit
        .iter()
        .copied()
        .filter(|p| !chosen.contains(&p.id))
        .collect();
    rest.sort_by(by_strength);
    let bench = rest.into_iter().take(BENCH_SIZE).cloned().collect();

    let sheet = TeamSheet {
        club,
        tactics: tactics.clone(),
        starters,
        bench,
    };
    sheet.validate()?;
    Ok(sheet)
}

fn preferred_eleven(fit: &[&PlayerProfile], tactics: &Tactics) -> Option<Vec<Starter>> {
    if tactics.lineup.len() != STARTING_ELEVEN {
        return None;
    }
    let picked: Vec<&PlayerProfile> = tactics
        .lineup
        .iter()
        .filter_map(|id| fit.iter().copied().find(|p| p.id == *id))
        .collect();
    let keepers = picked.iter().filter(|p| p.position == Position::GK).count();
    if picked.len() != STARTING_ELEVEN || keepers != 1 {
        return None;
    }
    Some(
        picked
            .into_iter()
            .map(|p| Starter {
                player: p.clone(),
                role: p.position,
            })
            .collect(),
    )
}

fn auto_eleven(fit: &[&PlayerProfile], tactics: &Tactics) -> Vec<Starter> {
    let mut pool: Vec<&PlayerProfile> = fit.to_vec();
    pool.sort_by(by_strength);
    let mut taken: BTreeSet<PlayerId> = BTreeSet::new();
    let mut starters = Vec::with_capacity(STARTING_ELEVEN);
    let slots = tactics.formation.slots();

    for pos in Position::ALL {
        let natural: Vec<&PlayerProfile> = pool
            .iter()
            .copied()
            .filter(|p| p.position == pos && !taken.contains(&p.id))
            .take(slots[pos.index()])
            .collect();
        for p in natural {
            taken.insert(p.id);
            starters.push(Starter {
                player: p.clone(),
                role: pos,
            });
        }
    }

    // Fill short units with the best remaining outfield players.
    for pos in Position::ALL {
        let have = starters.iter().filter(|s| s.role == pos).count();
        for _ in have..slots[pos.index()] {
            let next = pool
                .iter()
                .copied()
                .find(|p| p.position.is_outfield() && !taken.contains(&p.id));
            if let Some(p) = next {
                taken.insert(p.id);
                starters.push(Starter {
                    player: p.clone(),
                    role: pos,
                });
            }
        }
    }
    starters.sort_by_key(|s| s.role.index());
    starters
}

#[cfg(test)]
mod tests {
    use super::*;
    use league_core::Formation;

    fn profile(id: u32, position: Position, skill: u8) -> PlayerProfile {
        PlayerProfile {
            id: PlayerId(id),
            position,
            skill,
            form: 10,
            traits: vec![],
            available: true,
        }
    }

    fn squad() -> Vec<PlayerProfile> {
        let mut s = vec![profile(1, Position::GK, 6), profile(2, Position::GK, 4)];
        for i in 0..6 {
            s.push(profile(10 + i, Position::DF, 5 + i as u8));
            s.push(profile(20 + i, Position::MF, 5 + i as u8));
        }
        for i in 0..4 {
            s.push(profile(30 + i, Position::FW, 6 + i as u8));
        }
        s
    }

    #[test]
    fn auto_selection_follows_formation() {
        let sheet = pick_team_sheet(ClubId(1), &squad(), &Tactics::default()).unwrap();
        let roles: Vec<usize> = Position::ALL
            .iter()
            .map(|p| sheet.starters.iter().filter(|s| s.role == *p).count())
            .collect();
        assert_eq!(roles, vec![1, 4, 4, 2]);
        assert_eq!(sheet.starters[0].player.id, PlayerId(1));
        assert!(sheet.starters.iter().all(|s| !s.out_of_position()));
        assert_eq!(sheet.bench.len(), BENCH_SIZE);
    }

    #[test]
    fn short_unit_is_filled_out_of_position() {
        let squad: Vec<PlayerProfile> = squad()
            .into_iter()
            .filter(|p| p.position != Position::FW)
            .collect();
        let tactics = Tactics {
            formation: Formation::F433,
            ..Tactics::default()
        };
        let sheet = pick_team_sheet(ClubId(1), &squad, &tactics).unwrap();
        assert_eq!(sheet.starters.len(), 11);
        let forwards: Vec<&Starter> = sheet
            .starters
            .iter()
            .filter(|s| s.role == Position::FW)
            .collect();
        assert_eq!(forwards.len(), 3);
        assert!(forwards.iter().all(|s| s.out_of_position()));
    }

    #[test]
    fn injured_players_are_skipped_and_too_few_is_an_error() {
        let mut s = squad();
        for p in s.iter_mut().skip(2).take(12) {
            p.available = false;
        }
        let err = pick_team_sheet(ClubId(4), &s, &Tactics::default()).unwrap_err();
        assert!(matches!(err, MatchError::InvalidSquad { club: ClubId(4), .. }));
    }

    #[test]
    fn valid_preferred_lineup_is_respected() {
        let s = squad();
        let mut lineup = vec![PlayerId(2)];
        lineup.extend([10, 11, 12, 13, 20, 21, 22, 23, 30, 31].map(PlayerId));
        let tactics = Tactics {
            lineup: lineup.clone(),
            ..Tactics::default()
        };
        let sheet = pick_team_sheet(ClubId(1), &s, &tactics).unwrap();
        let ids: Vec<PlayerId> = sheet.starters.iter().map(|s| s.player.id).collect();
        assert_eq!(ids, lineup);
        assert!(!sheet.bench.iter().any(|p| lineup.contains(&p.id)));
    }

    #[test]
    fn preferred_lineup_without_keeper_falls_back() {
        let s = squad();
        let tactics = Tactics {
            lineup: [10, 11, 12, 13, 14, 20, 21, 22, 23, 30, 31].map(PlayerId).to_vec(),
            ..Tactics::default()
        };
        let sheet = pick_team_sheet(ClubId(1), &s, &tactics).unwrap();
        assert_eq!(sheet.starters[0].role, Position::GK);
        assert_eq!(sheet.starters[0].player.id, PlayerId(1));
    }
}
