//! In-memory store for demo mode and tests.

use crate::{
    check_slot_id, decode, encode, sort_summaries, SaveEnvelope, SaveStore, SlotSummary,
    StoreError,
};
use league_core::{Career, CareerId};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Keeps encoded slots in a map so reads never alias the caller's data.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<BTreeMap<CareerId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SaveStore for MemoryStore {
    fn list(&self) -> Result<Vec<SlotSummary>, StoreError> {
        let slots = self.slots.read();
        let mut out = Vec::with_capacity(slots.len());
        for (id, text) in slots.iter() {
            out.push(decode(id, text)?.summary());
        }
        sort_summaries(&mut out);
        Ok(out)
    }

    fn read(&self, id: &CareerId) -> Result<Career, StoreError> {
        let slots = self.slots.read();
        let text = slots
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(decode(id, text)?.career)
    }

    fn write(&self, career: &Career) -> Result<SlotSummary, StoreError> {
        check_slot_id(&career.meta.id)?;
        let envelope = SaveEnvelope::new(career.clone());
        let text = encode(&envelope)?;
        self.slots.write().insert(career.meta.id.clone(), text);
        Ok(envelope.summary())
    }

    fn delete(&self, id: &CareerId) -> Result<(), StoreError> {
        self.slots
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn exists(&self, id: &CareerId) -> bool {
        self.slots.read().contains_key(id)
    }
}
