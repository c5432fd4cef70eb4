// crates/shoal-economics/src/reserve.rs
//
// The withheld reserve: the share of every submission the minter keeps back
// instead of queueing it for staking.
//
// The reserve grows on each submission by `amount * ratio / PRECISION` and
// shrinks only through an explicit governance move. It is an accounting
// claim on the minter's base-asset balance, never a separate pot, so the
// minter must keep `reserve <= balance` at all times.

use serde::{Deserialize, Serialize};

use shoal_core::error::ShoalError;

/// Accumulator of withheld base asset (in wei).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithheldReserve {
    amount: u128,
}

impl WithheldReserve {
    /// Create an empty reserve.
    pub fn new() -> Self {
        Self { amount: 0 }
    }

    /// Add withheld base asset.
    ///
    /// # Errors
    /// Returns `ShoalError::Validation` if the reserve would overflow.
    pub fn credit(&mut self, amount: u128) -> Result<(), ShoalError> {
        self.amount = self
            .amount
            .checked_add(amount)
            .ok_or_else(|| ShoalError::Validation("withheld reserve overflow".to_string()))?;
        Ok(())
    }

    /// Release withheld base asset.
    ///
    /// # Errors
    /// Returns `ShoalError::State` if `amount` exceeds the reserve.
    pub fn debit(&mut self, amount: u128) -> Result<(), ShoalError> {
        if amount > self.amount {
            return Err(ShoalError::State(format!(
                "Withheld amount {} wei exceeds reserve of {} wei",
                amount, self.amount
            )));
        }
        self.amount -= amount;
        Ok(())
    }

    /// Current reserve in wei.
    pub fn amount(&self) -> u128 {
        self.amount
    }
}
