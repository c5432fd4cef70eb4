// crates/shoal-core/src/traits.rs
//
// Interfaces of the collaborators the engine consumes. The engine only ever
// talks to these traits; shoal-store provides in-process implementations.

use crate::error::ShoalError;
use crate::permit::PreAuthorization;
use crate::types::{Address, StakingSlot, Timestamp};

/// Balance bookkeeping for a fungible token.
pub trait TokenLedger {
    /// Address identifying the token itself.
    fn token(&self) -> Address;

    fn balance_of(&self, owner: &Address) -> u128;

    fn allowance(&self, owner: &Address, spender: &Address) -> u128;

    /// Move `amount` from `from` to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: u128) -> Result<(), ShoalError>;

    /// Set the allowance of `spender` over `owner`'s balance.
    fn approve(&mut self, owner: &Address, spender: &Address, amount: u128)
        -> Result<(), ShoalError>;

    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), ShoalError>;
}

/// The receipt token ledger. One receipt unit is minted per base-asset unit
/// submitted.
pub trait ReceiptLedger: TokenLedger {
    fn total_supply(&self) -> u128;

    fn mint(&mut self, to: &Address, amount: u128) -> Result<(), ShoalError>;

    /// Verify a signed pre-authorization and, on success, set the allowance
    /// it grants and consume its nonce.
    fn verify_pre_authorization(
        &mut self,
        authorization: &PreAuthorization,
        now: Timestamp,
    ) -> Result<(), ShoalError>;
}

/// Registry handing out unique staking slots.
pub trait SlotAllocator {
    /// Take the next free slot. Fails with `ShoalError::State` when none remain.
    fn next_slot(&mut self) -> Result<StakingSlot, ShoalError>;

    /// Number of slots still available.
    fn free_slots(&self) -> usize;
}

/// The external staking deposit contract.
///
/// Accepts exactly one fixed-size unit per call. It does not guard against
/// funding the same slot twice; that is the minter's job.
pub trait DepositSink {
    fn deposit(&mut self, slot: &StakingSlot, amount: u128) -> Result<(), ShoalError>;
}

/// Outbound base-asset transfers to arbitrary recipients.
pub trait PaymentRail {
    /// Fails with `ShoalError::Transfer` when the recipient rejects the payment.
    fn send(&mut self, to: &Address, amount: u128) -> Result<(), ShoalError>;
}

/// Governance capability check.
pub trait Authority: Send + Sync {
    /// Whether `caller` may invoke privileged operations.
    fn is_authorized(&self, caller: &Address) -> bool;

    /// Recipient of recovered funds.
    fn beneficiary(&self) -> Address;
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current unix time in seconds.
    fn now(&self) -> Timestamp;
}
