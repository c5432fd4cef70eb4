// crates/shoal-economics/src/slots.rs
//
// The set of staking slots the minter has already funded.
//
// The deposit sink happily accepts a second deposit for the same validator
// key, so the minter keeps its own record. Membership is monotonic: there is
// no removal API.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use shoal_core::error::ShoalError;
use shoal_core::types::SlotId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSlotSet {
    slots: BTreeSet<SlotId>,
}

impl ActiveSlotSet {
    pub fn new() -> Self {
        Self {
            slots: BTreeSet::new(),
        }
    }

    pub fn contains(&self, id: &SlotId) -> bool {
        self.slots.contains(id)
    }

    /// Mark a slot as funded.
    ///
    /// # Errors
    /// Returns `ShoalError::State` if the slot is already active.
    pub fn activate(&mut self, id: SlotId) -> Result<(), ShoalError> {
        if self.slots.contains(&id) {
            return Err(ShoalError::State(format!("Slot {} is already active", id)));
        }
        self.slots.insert(id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotId> {
        self.slots.iter()
    }
}
