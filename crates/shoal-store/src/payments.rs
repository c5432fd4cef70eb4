// crates/shoal-store/src/payments.rs
//
// Base-asset wallets reached through the payment rail.
//
// Tracks what each recipient has been paid. Addresses marked as rejecting
// refuse every payment, which is how callers exercise the transfer-failure
// path.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use shoal_core::error::ShoalError;
use shoal_core::traits::PaymentRail;
use shoal_core::types::Address;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallets {
    balances: BTreeMap<Address, u128>,
    rejecting: BTreeSet<Address>,
}

impl Wallets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `address` refuse all incoming payments.
    pub fn reject(&mut self, address: Address) {
        self.rejecting.insert(address);
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Total paid out through the rail.
    pub fn total_paid(&self) -> u128 {
        self.balances.values().sum()
    }
}

impl PaymentRail for Wallets {
    fn send(&mut self, to: &Address, amount: u128) -> Result<(), ShoalError> {
        if self.rejecting.contains(to) {
            return Err(ShoalError::Transfer(format!(
                "Recipient {} rejected a payment of {} wei",
                to.short(),
                amount
            )));
        }
        let balance = self.balance_of(to);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| ShoalError::Transfer("recipient balance overflow".to_string()))?;
        self.balances.insert(*to, updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_credits_recipient() {
        let mut wallets = Wallets::new();
        wallets.send(&Address([1; 32]), 5).unwrap();
        wallets.send(&Address([1; 32]), 6).unwrap();
        assert_eq!(wallets.balance_of(&Address([1; 32])), 11);
        assert_eq!(wallets.total_paid(), 11);
    }

    #[test]
    fn test_rejecting_recipient() {
        let mut wallets = Wallets::new();
        wallets.reject(Address([9; 32]));
        let result = wallets.send(&Address([9; 32]), 5);
        assert!(matches!(result, Err(ShoalError::Transfer(_))));
        assert_eq!(wallets.balance_of(&Address([9; 32])), 0);
    }
}
