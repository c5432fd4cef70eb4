// crates/shoal-store/src/allocator.rs
//
// FIFO slot allocator: operators register staking slots ahead of time and
// the minter takes them in registration order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use shoal_core::crypto::hash_bytes;
use shoal_core::error::ShoalError;
use shoal_core::traits::SlotAllocator;
use shoal_core::types::{SlotId, StakingSlot};

/// Length of a validator public key.
pub const SLOT_ID_LEN: usize = 48;

/// Length of a deposit signature.
pub const SLOT_SIGNATURE_LEN: usize = 96;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotQueue {
    slots: VecDeque<StakingSlot>,
}

impl SlotQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_slots(slots: Vec<StakingSlot>) -> Self {
        Self {
            slots: slots.into(),
        }
    }

    /// Register a slot at the back of the queue.
    pub fn push(&mut self, slot: StakingSlot) -> Result<(), ShoalError> {
        if slot.id.0.len() != SLOT_ID_LEN {
            return Err(ShoalError::Validation(format!(
                "Slot id must be {} bytes, got {}",
                SLOT_ID_LEN,
                slot.id.0.len()
            )));
        }
        if self.slots.iter().any(|queued| queued.id == slot.id) {
            return Err(ShoalError::State(format!("Slot {} is already queued", slot.id)));
        }
        self.slots.push_back(slot);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StakingSlot> {
        self.slots.iter()
    }
}

impl SlotAllocator for SlotQueue {
    fn next_slot(&mut self) -> Result<StakingSlot, ShoalError> {
        self.slots
            .pop_front()
            .ok_or_else(|| ShoalError::State("No free slots".to_string()))
    }

    fn free_slots(&self) -> usize {
        self.slots.len()
    }
}

/// Deterministic slot for local runs and tests.
///
/// The id, signature, and deposit data root are derived from `index` by
/// hashing, so the same index always yields the same slot.
pub fn synthetic_slot(index: u32, withdrawal_credential: [u8; 32]) -> StakingSlot {
    let seed = [&b"shoal-slot"[..], &index.to_be_bytes()[..]].concat();
    let head = hash_bytes(&seed);
    let tail = hash_bytes(&head);

    let mut id = Vec::with_capacity(SLOT_ID_LEN);
    id.extend_from_slice(&head);
    id.extend_from_slice(&tail[..SLOT_ID_LEN - head.len()]);

    let mut signature = Vec::with_capacity(SLOT_SIGNATURE_LEN);
    while signature.len() < SLOT_SIGNATURE_LEN {
        let block = hash_bytes(&[&tail[..], &signature[..]].concat());
        signature.extend_from_slice(&block);
    }
    signature.truncate(SLOT_SIGNATURE_LEN);

    build_slot(id, withdrawal_credential, signature)
}

/// Assemble a slot from operator-supplied deposit data, computing the
/// deposit data root the sink checks.
pub fn build_slot(id: Vec<u8>, withdrawal_credential: [u8; 32], signature: Vec<u8>) -> StakingSlot {
    let deposit_data_root = hash_bytes(&[&id[..], &withdrawal_credential[..], &signature[..]].concat());
    StakingSlot {
        id: SlotId(id),
        withdrawal_credential,
        signature,
        deposit_data_root,
    }
}
