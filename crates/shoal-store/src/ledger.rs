// crates/shoal-store/src/ledger.rs
//
// In-memory receipt token ledger.
//
// Balances, allowances, and permit nonces live in ordered maps so the JSON
// snapshot of a ledger is deterministic. An allowance of `u128::MAX` is
// treated as unlimited and never decremented.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shoal_core::error::ShoalError;
use shoal_core::permit::PreAuthorization;
use shoal_core::traits::{ReceiptLedger, TokenLedger};
use shoal_core::types::{Address, Timestamp};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryLedger {
    token: Address,
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
    allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
    nonces: BTreeMap<Address, u64>,
}

impl InMemoryLedger {
    /// Create an empty ledger for the token identified by `token`.
    pub fn new(token: Address) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    /// Next permit nonce expected from `owner`.
    pub fn nonce(&self, owner: &Address) -> u64 {
        self.nonces.get(owner).copied().unwrap_or(0)
    }

    /// Accounts with a nonzero balance, in address order.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter().filter(|(_, balance)| **balance > 0)
    }

    fn debit(&mut self, from: &Address, amount: u128) -> Result<(), ShoalError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(ShoalError::Transfer(format!(
                "Insufficient balance: {} holds {} but {} is required",
                from.short(),
                balance,
                amount
            )));
        }
        self.balances.insert(*from, balance - amount);
        Ok(())
    }

    fn credit(&mut self, to: &Address, amount: u128) -> Result<(), ShoalError> {
        let balance = self.balance_of(to);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| ShoalError::Transfer("balance overflow".to_string()))?;
        self.balances.insert(*to, updated);
        Ok(())
    }

    fn set_allowance(&mut self, owner: &Address, spender: &Address, amount: u128) {
        self.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
    }
}

impl TokenLedger for InMemoryLedger {
    fn token(&self) -> Address {
        self.token
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), ShoalError> {
        if to.is_zero() {
            return Err(ShoalError::Validation(
                "Cannot transfer to the zero address".to_string(),
            ));
        }
        self.debit(from, amount)?;
        self.credit(to, amount)
    }

    fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) -> Result<(), ShoalError> {
        if spender.is_zero() {
            return Err(ShoalError::Validation(
                "Cannot approve the zero address".to_string(),
            ));
        }
        self.set_allowance(owner, spender, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), ShoalError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(ShoalError::Transfer(format!(
                "Insufficient allowance: {} may spend {} of {}'s balance, {} requested",
                spender.short(),
                allowed,
                from.short(),
                amount
            )));
        }
        self.transfer(from, to, amount)?;
        if allowed != u128::MAX {
            self.set_allowance(from, spender, allowed - amount);
        }
        Ok(())
    }
}

impl ReceiptLedger for InMemoryLedger {
    fn total_supply(&self) -> u128 {
        self.total_supply
    }

    fn mint(&mut self, to: &Address, amount: u128) -> Result<(), ShoalError> {
        if to.is_zero() {
            return Err(ShoalError::Validation(
                "Cannot mint to the zero address".to_string(),
            ));
        }
        self.total_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| ShoalError::Validation("total supply overflow".to_string()))?;
        self.credit(to, amount)
    }

    fn verify_pre_authorization(
        &mut self,
        authorization: &PreAuthorization,
        now: Timestamp,
    ) -> Result<(), ShoalError> {
        if now > authorization.deadline {
            return Err(ShoalError::Validation(format!(
                "Pre-authorization expired at {}",
                authorization.deadline
            )));
        }
        let expected = self.nonce(&authorization.owner);
        if authorization.nonce != expected {
            return Err(ShoalError::Validation(format!(
                "Pre-authorization nonce {} does not match expected {}",
                authorization.nonce, expected
            )));
        }
        if !authorization.signature_is_valid()? {
            return Err(ShoalError::Crypto(
                "Pre-authorization signature does not match owner".to_string(),
            ));
        }

        self.nonces.insert(authorization.owner, expected + 1);
        self.set_allowance(&authorization.owner, &authorization.spender, authorization.amount);
        tracing::debug!(
            owner = %authorization.owner.short(),
            spender = %authorization.spender.short(),
            nonce = expected,
            "Pre-authorization accepted"
        );
        Ok(())
    }
}
