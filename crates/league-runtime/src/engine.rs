//! The transaction engine.
//!
//! Every mutating operation runs against a private copy of the committed career while holding
//! that career's writer lock. The copy is validated, persisted and only then published; any
//! failure on the way drops it, so readers only ever see committed snapshots.

use crate::config::{CareerConfig, EngineConfig};
use crate::economy::{self, LedgerReceipt};
use crate::error::{CareerError, ErrorKind};
use crate::generate::build_career;
use crate::mail::{self, MailReceipt};
use crate::matchday::{self, MatchSummary, MatchdayReport};
use crate::season::{self, CalendarAdvance, DivisionStanding, SeasonStart};
use crate::transfers::{
    self, BidDecision, BidOutcome, BidResolution, ListingReceipt, TransferReceipt,
};
use crate::training::{self, TrainingReceipt};
use crate::youth::{self, JuniorRejection, JuniorSigning};
use chrono::{DateTime, NaiveDate, Utc};
use league_core::{
    validate_graph, BidId, Career, CareerId, ClubId, DivisionId, Fixture, FixtureId, Listing,
    ListingId, MailId, MatchMode, MatchReport, Money, PlayerId, Position, SeasonReport, Tactics,
};
use parking_lot::{Mutex, RwLock};
use persistence::{slugify, FsStore, MemoryStore, SaveStore, SlotSummary};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// A loaded career: the writer lock and the last committed snapshot.
struct CareerSlot {
    /// Held for the whole of a transaction. `true` once the career has been deleted.
    writer: Mutex<bool>,
    committed: RwLock<Arc<Career>>,
}

impl CareerSlot {
    fn new(career: Career) -> Self {
        Self {
            writer: Mutex::new(false),
            committed: RwLock::new(Arc::new(career)),
        }
    }

    fn snapshot(&self) -> Arc<Career> {
        self.committed.read().clone()
    }
}

/// Result of copying a career into a named slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveConfirmation {
    pub id: CareerId,
    pub name: String,
    pub revision: u64,
    pub saved_at: DateTime<Utc>,
}

impl From<SlotSummary> for SaveConfirmation {
    fn from(s: SlotSummary) -> Self {
        Self {
            id: s.id,
            name: s.name,
            revision: s.revision,
            saved_at: s.saved_at,
        }
    }
}

/// Owns every loaded career and the store behind them. `Send + Sync`; share it behind an `Arc`.
pub struct CareerEngine {
    store: Box<dyn SaveStore>,
    slots: Mutex<BTreeMap<CareerId, Arc<CareerSlot>>>,
}

impl CareerEngine {
    pub fn new(store: Box<dyn SaveStore>) -> Self {
        Self {
            store,
            slots: Mutex::new(BTreeMap::new()),
        }
    }

    /// File-backed engine, or an in-memory one in demo mode.
    pub fn from_config(config: &EngineConfig) -> Self {
        if config.demo {
            info!("demo mode: careers are kept in memory");
            Self::in_memory()
        } else {
            info!(dir = %config.save_dir.display(), "using save directory");
            Self::new(Box::new(FsStore::new(config.save_dir.clone())))
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    fn slot(&self, id: &CareerId) -> Result<Arc<CareerSlot>, CareerError> {
        if let Some(slot) = self.slots.lock().get(id) {
            return Ok(slot.clone());
        }
        let career = self.read_valid(id)?;
        let mut slots = self.slots.lock();
        // a delete may have run since the read
        if !slots.contains_key(id) && !self.store.exists(id) {
            return Err(CareerError::CareerNotFound(id.clone()));
        }
        Ok(slots
            .entry(id.clone())
            .or_insert_with(|| Arc::new(CareerSlot::new(career)))
            .clone())
    }

    fn read_valid(&self, id: &CareerId) -> Result<Career, CareerError> {
        let career = self.store.read(id)?;
        if let Err(e) = validate_graph(&career.graph) {
            error!(career = %id, error = %e, "stored career is inconsistent");
            return Err(e.into());
        }
        Ok(career)
    }

    /// Run `op` as one transaction on career `id`.
    fn transact<T>(
        &self,
        id: &CareerId,
        name: &'static str,
        op: impl FnOnce(&mut Career) -> Result<T, CareerError>,
    ) -> Result<T, CareerError> {
        let slot = self.slot(id)?;
        self.commit(&slot, id, name, op)
    }

    fn commit<T>(
        &self,
        slot: &CareerSlot,
        id: &CareerId,
        name: &'static str,
        op: impl FnOnce(&mut Career) -> Result<T, CareerError>,
    ) -> Result<T, CareerError> {
        let deleted = slot.writer.lock();
        if *deleted {
            return Err(CareerError::CareerNotFound(id.clone()));
        }
        let mut working = Career::clone(&slot.snapshot());
        let outcome = op(&mut working).and_then(|value| {
            validate_graph(&working.graph)?;
            Ok(value)
        });
        let value = match outcome {
            Ok(value) => value,
            Err(e) => {
                log_failure(id, name, &e);
                return Err(e);
            }
        };
        working.meta.revision += 1;
        working.meta.updated_at = Utc::now();
        if let Err(e) = self.store.write(&working) {
            let e = CareerError::from(e);
            log_failure(id, name, &e);
            return Err(e);
        }
        let revision = working.meta.revision;
        *slot.committed.write() = Arc::new(working);
        info!(career = %id, txn = name, revision, "committed");
        Ok(value)
    }

    /// Read-only access to the committed snapshot.
    fn read<T>(
        &self,
        id: &CareerId,
        op: impl FnOnce(&Career) -> Result<T, CareerError>,
    ) -> Result<T, CareerError> {
        op(&self.slot(id)?.snapshot())
    }

    fn fresh_id(&self) -> CareerId {
        loop {
            let hex = Uuid::new_v4().simple().to_string();
            let id = CareerId(format!("c-{}", &hex[..8]));
            if !self.store.exists(&id) && !self.slots.lock().contains_key(&id) {
                return id;
            }
        }
    }

    /// Generate and persist a new career.
    pub fn new_career(&self, config: &CareerConfig) -> Result<Arc<Career>, CareerError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let id = self.fresh_id();
        let career = build_career(config, id.clone(), seed, Utc::now())?;
        validate_graph(&career.graph)?;
        self.store.write(&career)?;
        let slot = Arc::new(CareerSlot::new(career));
        let snapshot = slot.snapshot();
        self.slots.lock().insert(id.clone(), slot);
        info!(career = %id, seed, "career created");
        Ok(snapshot)
    }

    /// Remove a career from memory and storage. Waits for a running transaction on it; later
    /// ones fail with `CareerNotFound`.
    pub fn delete_career(&self, id: &CareerId) -> Result<(), CareerError> {
        let mut slots = self.slots.lock();
        let slot = slots.remove(id);
        let mut deleted = slot.as_ref().map(|s| s.writer.lock());
        if let Err(e) = self.store.delete(id) {
            drop(deleted);
            if let Some(slot) = slot {
                slots.insert(id.clone(), slot);
            }
            return Err(e.into());
        }
        if let Some(flag) = deleted.as_mut() {
            **flag = true;
        }
        info!(career = %id, "career deleted");
        Ok(())
    }

    /// The committed state of a career.
    pub fn dump(&self, id: &CareerId) -> Result<Arc<Career>, CareerError> {
        Ok(self.slot(id)?.snapshot())
    }

    /// Reload a career from storage, replacing whatever is in memory.
    pub fn load_career(&self, id: &CareerId) -> Result<Arc<Career>, CareerError> {
        let career = self.read_valid(id)?;
        let mut slots = self.slots.lock();
        if !self.store.exists(id) {
            return Err(CareerError::CareerNotFound(id.clone()));
        }
        let snapshot = match slots.get(id).cloned() {
            Some(slot) => {
                let _writer = slot.writer.lock();
                *slot.committed.write() = Arc::new(career);
                slot.snapshot()
            }
            None => {
                let slot = Arc::new(CareerSlot::new(career));
                let snapshot = slot.snapshot();
                slots.insert(id.clone(), slot);
                snapshot
            }
        };
        drop(slots);
        info!(career = %id, revision = snapshot.meta.revision, "career loaded");
        Ok(snapshot)
    }

    /// Saved careers, most recently saved first.
    pub fn list_careers(&self) -> Result<Vec<SlotSummary>, CareerError> {
        Ok(self.store.list()?)
    }

    /// Copy a career into the slot derived from `name`, e.g. "My Save" → `c-my-save`.
    pub fn save(&self, id: &CareerId, name: &str) -> Result<SaveConfirmation, CareerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CareerError::input("save name must not be empty"));
        }
        let target = CareerId(format!("c-{}", slugify(name)));
        let mut copy = Career::clone(&*self.dump(id)?);
        copy.meta.id = target.clone();
        copy.meta.name = name.to_string();
        copy.meta.updated_at = Utc::now();

        let loaded = self.slots.lock().get(&target).cloned();
        let summary = match loaded {
            Some(slot) => {
                let deleted = slot.writer.lock();
                let summary = self.store.write(&copy)?;
                if !*deleted {
                    *slot.committed.write() = Arc::new(copy);
                }
                summary
            }
            None => self.store.write(&copy)?,
        };
        info!(career = %id, slot = %target, "career saved");
        Ok(summary.into())
    }

    /// Run an arbitrary mutation as one transaction. The career id cannot change.
    pub fn apply<T>(
        &self,
        id: &CareerId,
        f: impl FnOnce(&mut Career) -> Result<T, CareerError>,
    ) -> Result<T, CareerError> {
        self.transact(id, "apply", |career| {
            let value = f(career)?;
            if &career.meta.id != id {
                return Err(CareerError::input("a transaction cannot change the career id"));
            }
            Ok(value)
        })
    }

    pub fn start_season(&self, id: &CareerId) -> Result<SeasonStart, CareerError> {
        self.transact(id, "start_season", season::start)
    }

    /// Archive the season; fails while fixtures are unplayed.
    pub fn end_season(&self, id: &CareerId) -> Result<SeasonReport, CareerError> {
        self.transact(id, "end_season", season::end)
    }

    /// Play every fixture that is due today.
    pub fn advance_week(&self, id: &CareerId) -> Result<Vec<MatchSummary>, CareerError> {
        self.transact(id, "advance_week", matchday::advance_week)
    }

    pub fn advance_calendar(
        &self,
        id: &CareerId,
        weeks: u32,
    ) -> Result<CalendarAdvance, CareerError> {
        self.transact(id, "advance_calendar", |c| season::advance_calendar(c, weeks))
    }

    pub fn play_next_matchday(&self, id: &CareerId) -> Result<MatchdayReport, CareerError> {
        self.transact(id, "play_next_matchday", matchday::play_next_matchday)
    }

    pub fn simulate_match(
        &self,
        id: &CareerId,
        fixture: FixtureId,
        mode: MatchMode,
    ) -> Result<MatchSummary, CareerError> {
        self.transact(id, "simulate_match", |c| {
            matchday::simulate_fixture(c, fixture, mode)
        })
    }

    /// Simulate without recording anything.
    pub fn preview_match(
        &self,
        id: &CareerId,
        fixture: FixtureId,
        mode: MatchMode,
    ) -> Result<MatchReport, CareerError> {
        self.read(id, |c| matchday::preview(c, fixture, mode))
    }

    pub fn set_match_result(
        &self,
        id: &CareerId,
        fixture: FixtureId,
        home_goals: u8,
        away_goals: u8,
    ) -> Result<MatchSummary, CareerError> {
        self.transact(id, "set_match_result", |c| {
            matchday::set_result(c, fixture, home_goals, away_goals)
        })
    }

    pub fn correct_match_result(
        &self,
        id: &CareerId,
        fixture: FixtureId,
        home_goals: u8,
        away_goals: u8,
    ) -> Result<MatchSummary, CareerError> {
        self.transact(id, "correct_match_result", |c| {
            matchday::correct_result(c, fixture, home_goals, away_goals)
        })
    }

    pub fn postpone_fixture(
        &self,
        id: &CareerId,
        fixture: FixtureId,
    ) -> Result<Fixture, CareerError> {
        self.transact(id, "postpone_fixture", |c| matchday::postpone(c, fixture))
    }

    pub fn reschedule_fixture(
        &self,
        id: &CareerId,
        fixture: FixtureId,
        date: NaiveDate,
    ) -> Result<Fixture, CareerError> {
        self.transact(id, "reschedule_fixture", |c| {
            matchday::reschedule(c, fixture, date)
        })
    }

    pub fn set_tactics(
        &self,
        id: &CareerId,
        club: ClubId,
        tactics: Tactics,
    ) -> Result<Tactics, CareerError> {
        self.transact(id, "set_tactics", |c| matchday::set_tactics(c, club, tactics))
    }

    pub fn buy_from_market(
        &self,
        id: &CareerId,
        buyer: ClubId,
        listing: ListingId,
    ) -> Result<TransferReceipt, CareerError> {
        self.transact(id, "buy_from_market", |c| {
            transfers::buy_from_market(c, buyer, listing)
        })
    }

    pub fn submit_transfer_bid(
        &self,
        id: &CareerId,
        buyer: ClubId,
        player: PlayerId,
        amount: Money,
    ) -> Result<BidOutcome, CareerError> {
        self.transact(id, "submit_transfer_bid", |c| {
            transfers::submit_transfer_bid(c, buyer, player, amount)
        })
    }

    pub fn resolve_bid(
        &self,
        id: &CareerId,
        bid: BidId,
        decision: BidDecision,
    ) -> Result<BidResolution, CareerError> {
        self.transact(id, "resolve_bid", |c| {
            transfers::resolve_bid(c, bid, decision)
        })
    }

    pub fn list_player(
        &self,
        id: &CareerId,
        club: ClubId,
        player: PlayerId,
        asking: Option<Money>,
    ) -> Result<ListingReceipt, CareerError> {
        self.transact(id, "list_player", |c| {
            transfers::list_player(c, club, player, asking)
        })
    }

    pub fn withdraw_listing(
        &self,
        id: &CareerId,
        listing: ListingId,
    ) -> Result<Listing, CareerError> {
        self.transact(id, "withdraw_listing", |c| {
            transfers::withdraw_listing(c, listing)
        })
    }

    /// Credit a sponsor event; `None` pays the default amount.
    pub fn sponsor_activity(
        &self,
        id: &CareerId,
        club: ClubId,
        amount: Option<Money>,
    ) -> Result<LedgerReceipt, CareerError> {
        self.transact(id, "sponsor_activity", |c| {
            economy::sponsor_activity(c, club, amount)
        })
    }

    /// Pay for a week of form training; it completes on the next calendar week.
    pub fn start_form_training(
        &self,
        id: &CareerId,
        club: ClubId,
        player: PlayerId,
    ) -> Result<TrainingReceipt, CareerError> {
        self.transact(id, "start_form_training", |c| {
            training::start_form_training(c, club, player)
        })
    }

    pub fn accept_junior(
        &self,
        id: &CareerId,
        club: ClubId,
        index: usize,
    ) -> Result<JuniorSigning, CareerError> {
        self.transact(id, "accept_junior", |c| youth::accept_junior(c, club, index))
    }

    pub fn reject_junior(
        &self,
        id: &CareerId,
        club: ClubId,
        index: usize,
    ) -> Result<JuniorRejection, CareerError> {
        self.transact(id, "reject_junior", |c| youth::reject_junior(c, club, index))
    }

    pub fn set_youth_preference(
        &self,
        id: &CareerId,
        club: ClubId,
        position: Option<Position>,
    ) -> Result<Option<Position>, CareerError> {
        self.transact(id, "set_youth_preference", |c| {
            youth::set_youth_preference(c, club, position)
        })
    }

    pub fn mark_mail_read(&self, id: &CareerId, mail: MailId) -> Result<MailReceipt, CareerError> {
        self.transact(id, "mark_mail_read", |c| mail::mark_read(c, mail))
    }

    /// Live tables; `None` returns every division.
    pub fn standings(
        &self,
        id: &CareerId,
        division: Option<DivisionId>,
    ) -> Result<Vec<DivisionStanding>, CareerError> {
        self.read(id, |c| season::standings(c, division))
    }
}

fn log_failure(id: &CareerId, txn: &str, e: &CareerError) {
    match e.kind() {
        ErrorKind::InvariantViolation => {
            error!(career = %id, txn, error = %e, "transaction broke an invariant")
        }
        ErrorKind::Storage => error!(career = %id, txn, error = %e, "commit not persisted"),
        kind => warn!(career = %id, txn, ?kind, error = %e, "transaction rejected"),
    }
}
