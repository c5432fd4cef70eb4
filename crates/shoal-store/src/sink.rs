// crates/shoal-store/src/sink.rs
//
// Recording deposit sink. Accepts exactly one unit per call and keeps every
// accepted deposit. Like the real staking deposit contract it does not care
// whether a slot was funded before.

use serde::{Deserialize, Serialize};

use shoal_core::crypto::hash_bytes;
use shoal_core::error::ShoalError;
use shoal_core::traits::DepositSink;
use shoal_core::types::{SlotId, StakingSlot};

/// One accepted deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkDeposit {
    pub slot_id: SlotId,
    #[serde(with = "hex::serde")]
    pub withdrawal_credential: [u8; 32],
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositLog {
    unit_size: u128,
    deposits: Vec<SinkDeposit>,
}

impl DepositLog {
    pub fn new(unit_size: u128) -> Self {
        Self {
            unit_size,
            deposits: Vec::new(),
        }
    }

    pub fn deposits(&self) -> &[SinkDeposit] {
        &self.deposits
    }

    pub fn total_deposited(&self) -> u128 {
        self.deposits.iter().map(|d| d.amount).sum()
    }
}

impl DepositSink for DepositLog {
    fn deposit(&mut self, slot: &StakingSlot, amount: u128) -> Result<(), ShoalError> {
        if amount != self.unit_size {
            return Err(ShoalError::Transfer(format!(
                "Deposit sink accepts exactly {} wei, got {}",
                self.unit_size, amount
            )));
        }
        let root = hash_bytes(
            &[
                &slot.id.0[..],
                &slot.withdrawal_credential[..],
                &slot.signature[..],
            ]
            .concat(),
        );
        if root != slot.deposit_data_root {
            return Err(ShoalError::Transfer(format!(
                "Deposit data root mismatch for slot {}",
                slot.id
            )));
        }
        self.deposits.push(SinkDeposit {
            slot_id: slot.id.clone(),
            withdrawal_credential: slot.withdrawal_credential,
            amount,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::synthetic_slot;

    #[test]
    fn test_accepts_exact_unit() {
        let mut sink = DepositLog::new(32);
        sink.deposit(&synthetic_slot(0, [1; 32]), 32).unwrap();
        assert_eq!(sink.deposits().len(), 1);
        assert_eq!(sink.total_deposited(), 32);
    }

    #[test]
    fn test_rejects_wrong_amount() {
        let mut sink = DepositLog::new(32);
        let result = sink.deposit(&synthetic_slot(0, [1; 32]), 31);
        assert!(matches!(result, Err(ShoalError::Transfer(_))));
        assert!(sink.deposits().is_empty());
    }

    #[test]
    fn test_rejects_bad_deposit_root() {
        let mut sink = DepositLog::new(32);
        let mut slot = synthetic_slot(0, [1; 32]);
        slot.withdrawal_credential = [2; 32];
        assert!(sink.deposit(&slot, 32).is_err());
    }

    #[test]
    fn test_same_slot_accepted_twice() {
        let mut sink = DepositLog::new(32);
        let slot = synthetic_slot(0, [1; 32]);
        sink.deposit(&slot, 32).unwrap();
        sink.deposit(&slot, 32).unwrap();
        assert_eq!(sink.deposits().len(), 2);
    }
}
