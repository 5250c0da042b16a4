#![deny(warnings)]

//! Career runtime: generation, the season calendar, matchdays, the transfer market, youth
//! intake, form training and club income, all driven through [`CareerEngine`].
//!
//! Each engine call is one transaction against a single career. It either commits a validated
//! and persisted new state or leaves the career exactly as it was.

mod config;
mod economy;
mod engine;
mod error;
mod generate;
mod mail;
mod matchday;
mod rng;
mod schedule;
mod season;
mod training;
mod transfers;
mod youth;

pub use config::{CareerConfig, EngineConfig};
pub use economy::LedgerReceipt;
pub use engine::{CareerEngine, SaveConfirmation};
pub use error::{CareerError, ErrorKind, Outcome};
pub use mail::MailReceipt;
pub use matchday::{MatchSummary, MatchdayReport};
pub use season::{CalendarAdvance, DivisionStanding, SeasonStart, MAX_CALENDAR_WEEKS};
pub use training::TrainingReceipt;
pub use transfers::{
    BidDecision, BidOutcome, BidResolution, ListingReceipt, TransferReceipt, MIN_ACTIVE_LISTINGS,
};
pub use youth::{JuniorRejection, JuniorSigning};

#[cfg(test)]
pub(crate) mod testutil {
    use crate::config::CareerConfig;
    use crate::generate::build_career;
    use crate::{matchday, season};
    use chrono::{TimeZone, Utc};
    use league_core::{Career, CareerId};

    /// Two divisions of four clubs with 16-player squads.
    pub(crate) fn config(managed: bool) -> CareerConfig {
        CareerConfig {
            divisions: 2,
            clubs_per_division: 4,
            squad_size: 16,
            promotion_slots: 1,
            club_names: vec!["Example FC".into(), "Rival FC".into()],
            managed_club: managed.then(|| "Example FC".to_string()),
            seed: Some(42),
            ..CareerConfig::default()
        }
    }

    pub(crate) fn small_career(managed: bool) -> Career {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        build_career(&config(managed), CareerId::from("c-test0001"), 42, now).unwrap()
    }

    pub(crate) fn started(mut career: Career) -> Career {
        season::start(&mut career).unwrap();
        career
    }

    /// Play every remaining fixture of the current season.
    pub(crate) fn play_out(mut career: Career) -> Career {
        for _ in 0..200 {
            if season::unplayed(&career.graph).is_empty() {
                return career;
            }
            matchday::play_next_matchday(&mut career).unwrap();
        }
        panic!("season did not finish");
    }
}
