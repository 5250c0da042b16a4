//! Career and engine configuration.

use crate::error::CareerError;
use chrono::NaiveDate;
use league_core::{Money, MAX_SQUAD_SIZE};
use league_econ::DEFAULT_WEEKLY_SPONSORSHIP;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Largest opening balance a club may be given.
pub const MAX_STARTING_CASH: Money = 1_000_000_000_000;
/// Largest weekly sponsorship a club may be given.
pub const MAX_WEEKLY_SPONSORSHIP: Money = 1_000_000_000;

/// Settings for a new career. Every field has a default, so a YAML file only needs to name
/// what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerConfig {
    /// Display name of the career.
    pub name: String,
    pub league_name: String,
    pub divisions: u8,
    pub clubs_per_division: u8,
    pub double_round_robin: bool,
    /// Clubs promoted and relegated between adjacent divisions.
    pub promotion_slots: u8,
    pub squad_size: u8,
    pub starting_cash: Money,
    pub weekly_sponsorship: Money,
    /// Candidates per club at each youth intake.
    pub youth_pool_size: u8,
    /// Run a knockout cup alongside the league.
    pub cup: bool,
    /// Club names, top division first. Missing names are generated.
    pub club_names: Vec<String>,
    /// Name of the club the human manages; `None` leaves every club to the engine.
    pub managed_club: Option<String>,
    pub season_start: NaiveDate,
    /// Root seed; a random one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for CareerConfig {
    fn default() -> Self {
        Self {
            name: "New Career".into(),
            league_name: "National League".into(),
            divisions: 2,
            clubs_per_division: 12,
            double_round_robin: true,
            promotion_slots: 2,
            squad_size: 21,
            starting_cash: 5_000_000,
            weekly_sponsorship: DEFAULT_WEEKLY_SPONSORSHIP,
            youth_pool_size: 3,
            cup: true,
            club_names: Vec::new(),
            managed_club: None,
            season_start: NaiveDate::from_ymd_opt(2025, 8, 2).unwrap_or_default(),
            seed: None,
        }
    }
}

impl CareerConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, CareerError> {
        serde_yaml::from_str(text).map_err(|e| CareerError::InvalidConfig(e.to_string()))
    }

    /// Read and parse a YAML file.
    pub fn load(path: &Path) -> Result<Self, CareerError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CareerError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    /// Total number of clubs.
    pub fn club_count(&self) -> usize {
        usize::from(self.divisions) * usize::from(self.clubs_per_division)
    }

    /// Check every field; the message names the first offending one.
    pub fn validate(&self) -> Result<(), CareerError> {
        let bad = |msg: String| Err(CareerError::InvalidConfig(msg));
        if self.name.trim().is_empty() {
            return bad("name must not be empty".into());
        }
        if !(1..=8).contains(&self.divisions) {
            return bad(format!("divisions must be 1..=8, got {}", self.divisions));
        }
        if !(2..=40).contains(&self.clubs_per_division) {
            return bad(format!(
                "clubs_per_division must be 2..=40, got {}",
                self.clubs_per_division
            ));
        }
        if self.divisions > 1
            && (self.promotion_slots == 0
                || usize::from(self.promotion_slots) * 2 > usize::from(self.clubs_per_division))
        {
            return bad(format!(
                "promotion_slots {} does not fit divisions of {} clubs",
                self.promotion_slots, self.clubs_per_division
            ));
        }
        if !(16..=MAX_SQUAD_SIZE).contains(&usize::from(self.squad_size)) {
            return bad(format!("squad_size must be 16..=30, got {}", self.squad_size));
        }
        if !(0..=MAX_STARTING_CASH).contains(&self.starting_cash) {
            return bad(format!(
                "starting_cash must be 0..={MAX_STARTING_CASH}, got {}",
                self.starting_cash
            ));
        }
        if !(0..=MAX_WEEKLY_SPONSORSHIP).contains(&self.weekly_sponsorship) {
            return bad(format!(
                "weekly_sponsorship must be 0..={MAX_WEEKLY_SPONSORSHIP}, got {}",
                self.weekly_sponsorship
            ));
        }
        if !(1..=10).contains(&self.youth_pool_size) {
            return bad(format!(
                "youth_pool_size must be 1..=10, got {}",
                self.youth_pool_size
            ));
        }
        if self.club_names.len() > self.club_count() {
            return bad(format!(
                "{} club names given for {} clubs",
                self.club_names.len(),
                self.club_count()
            ));
        }
        let mut seen = BTreeSet::new();
        for name in &self.club_names {
            let key = name.trim().to_lowercase();
            if key.is_empty() {
                return bad("club names must not be empty".into());
            }
            if !seen.insert(key) {
                return bad(format!("club name '{name}' is used twice"));
            }
        }
        if let Some(managed) = &self.managed_club {
            let listed = self
                .club_names
                .iter()
                .any(|n| n.trim().eq_ignore_ascii_case(managed.trim()));
            if !listed {
                return bad(format!("managed club '{managed}' is not among club_names"));
            }
        }
        Ok(())
    }
}

/// Where careers are kept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory of save slots.
    pub save_dir: PathBuf,
    /// Keep careers in memory only.
    pub demo: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            save_dir: persistence::FsStore::default_root(),
            demo: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn defaults_are_valid() {
        let c = CareerConfig::default();
        c.validate().unwrap();
        assert_eq!(c.club_count(), 24);
    }

    #[test]
    fn yaml_overrides_only_named_fields() {
        let c = CareerConfig::from_yaml_str(
            "name: Test\ndivisions: 1\nclubs_per_division: 4\nseed: 9\nclub_names: [Example FC, Rival FC]\nmanaged_club: example fc\n",
        )
        .unwrap();
        assert_eq!(c.divisions, 1);
        assert_eq!(c.squad_size, 21);
        assert_eq!(c.seed, Some(9));
        c.validate().unwrap();
    }

    #[test]
    fn invalid_settings_are_named() {
        let mut c = CareerConfig {
            clubs_per_division: 3,
            promotion_slots: 2,
            ..CareerConfig::default()
        };
        let err = c.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert!(err.to_string().contains("promotion_slots"));

        c = CareerConfig {
            club_names: vec!["A".into(), "a ".into()],
            ..CareerConfig::default()
        };
        assert!(c.validate().unwrap_err().to_string().contains("used twice"));

        c = CareerConfig {
            managed_club: Some("Nowhere FC".into()),
            ..CareerConfig::default()
        };
        assert!(c.validate().is_err());

        assert!(CareerConfig::from_yaml_str("divisions: [1").is_err());
    }

    #[test]
    fn money_settings_are_bounded() {
        for (cash, weekly, field) in [
            (i64::MAX, 0, "starting_cash"),
            (-1, 0, "starting_cash"),
            (0, MAX_WEEKLY_SPONSORSHIP + 1, "weekly_sponsorship"),
            (0, i64::MAX, "weekly_sponsorship"),
        ] {
            let c = CareerConfig {
                starting_cash: cash,
                weekly_sponsorship: weekly,
                ..CareerConfig::default()
            };
            let err = c.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidConfig);
            assert!(err.to_string().contains(field), "{err}");
        }
        CareerConfig {
            starting_cash: MAX_STARTING_CASH,
            weekly_sponsorship: MAX_WEEKLY_SPONSORSHIP,
            ..CareerConfig::default()
        }
        .validate()
        .unwrap();
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("career.yaml");
        std::fs::write(&path, "name: From File\ncup: false\n").unwrap();
        let c = CareerConfig::load(&path).unwrap();
        assert_eq!(c.name, "From File");
        assert!(!c.cup);
        assert!(CareerConfig::load(&dir.path().join("missing.yaml")).is_err());
    }
}
