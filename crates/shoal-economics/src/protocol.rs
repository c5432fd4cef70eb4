// crates/shoal-economics/src/protocol.rs
//
// Transactional composition of the minter, the vault, and their
// collaborators.
//
// Every exposed operation runs through `Protocol::atomically`: the whole
// `ProtocolState` (minter, vault, ledger, allocator, sink, payments) is
// cloned into a working copy, the operation runs against the copy, and the
// copy replaces the live state only if the operation succeeds. A failed
// operation leaves no trace: no balance moved, no slot consumed, no event
// released.

use serde::{Deserialize, Serialize};

use shoal_core::error::ShoalError;
use shoal_core::events::EventRecord;
use shoal_core::permit::PreAuthorization;
use shoal_core::traits::{
    Authority, Clock, DepositSink, PaymentRail, ReceiptLedger, SlotAllocator, TokenLedger,
};
use shoal_core::types::{Address, SlotId, Timestamp};

use crate::minter::{MinterParams, ReceiptMinter, Submission, PRECISION};
use crate::vault::{RewardSync, StakeVault, VaultParams};

/// Everything an operation may touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolState<L, A, S, P> {
    pub minter: ReceiptMinter,
    pub vault: StakeVault,
    pub ledger: L,
    pub allocator: A,
    pub sink: S,
    pub payments: P,
}

impl<L, A, S, P> ProtocolState<L, A, S, P> {
    /// Fresh state: empty minter and vault on top of the given collaborators.
    pub fn new(
        minter: MinterParams,
        vault: VaultParams,
        now: Timestamp,
        ledger: L,
        allocator: A,
        sink: S,
        payments: P,
    ) -> Result<Self, ShoalError> {
        if minter.address == vault.address {
            return Err(ShoalError::Validation(
                "minter and vault must use distinct addresses".to_string(),
            ));
        }
        Ok(Self {
            minter: ReceiptMinter::new(minter)?,
            vault: StakeVault::new(vault, now)?,
            ledger,
            allocator,
            sink,
            payments,
        })
    }

    /// Check the invariants every committed state must satisfy.
    pub fn check_invariants(&self) -> Result<(), ShoalError>
    where
        L: TokenLedger,
    {
        if self.minter.withheld_reserve() > self.minter.balance() {
            return Err(ShoalError::State(format!(
                "Withheld reserve {} exceeds minter balance {}",
                self.minter.withheld_reserve(),
                self.minter.balance()
            )));
        }
        if self.minter.withhold_ratio() > PRECISION {
            return Err(ShoalError::State(format!(
                "Withhold ratio {} exceeds precision",
                self.minter.withhold_ratio()
            )));
        }
        let accounted = self.vault.last_sync_assets() + self.vault.pending_reward();
        let held = self.ledger.balance_of(&self.vault.address());
        if accounted > held {
            return Err(ShoalError::State(format!(
                "Vault accounts for {} but holds {}",
                accounted, held
            )));
        }
        Ok(())
    }
}

/// The engine: live state plus governance, clock, and the committed event log.
pub struct Protocol<L, A, S, P> {
    state: ProtocolState<L, A, S, P>,
    authority: Box<dyn Authority>,
    clock: Box<dyn Clock>,
    committed: Vec<EventRecord>,
}

impl<L, A, S, P> Protocol<L, A, S, P>
where
    L: ReceiptLedger + Clone,
    A: SlotAllocator + Clone,
    S: DepositSink + Clone,
    P: PaymentRail + Clone,
{
    pub fn new(
        state: ProtocolState<L, A, S, P>,
        authority: Box<dyn Authority>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            state,
            authority,
            clock,
            committed: Vec::new(),
        }
    }

    /// Run `f` against a working copy of the state and commit it only on
    /// success.
    fn atomically<T, F>(&mut self, operation: &str, f: F) -> Result<T, ShoalError>
    where
        F: FnOnce(&mut ProtocolState<L, A, S, P>, &dyn Authority, Timestamp) -> Result<T, ShoalError>,
    {
        let now = self.clock.now();
        let mut working = self.state.clone();

        let result = f(&mut working, self.authority.as_ref(), now)
            .and_then(|value| working.check_invariants().map(|_| value));

        match result {
            Ok(value) => {
                let records: Vec<EventRecord> = working
                    .minter
                    .drain_events()
                    .into_iter()
                    .chain(working.vault.drain_events())
                    .map(|event| EventRecord::new(operation, event))
                    .collect();
                tracing::info!(operation, events = records.len(), now, "Committed");
                self.state = working;
                self.committed.extend(records);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, now, "Rolled back");
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Minter operations
    // ---------------------------------------------------------------------

    pub fn submit(
        &mut self,
        caller: &Address,
        recipient: &Address,
        amount: u128,
    ) -> Result<Submission, ShoalError> {
        self.atomically("submit", |state, _, _| {
            state.minter.submit(&mut state.ledger, caller, recipient, amount)
        })
    }

    /// Submit with the caller as recipient.
    pub fn submit_for_self(&mut self, caller: &Address, amount: u128) -> Result<Submission, ShoalError> {
        self.atomically("submit_for_self", |state, _, _| {
            state.minter.submit(&mut state.ledger, caller, caller, amount)
        })
    }

    /// Submit on the minter's own account and stake the receipt tokens in
    /// the vault for `recipient`. Returns the shares minted.
    pub fn submit_and_stake(
        &mut self,
        caller: &Address,
        recipient: &Address,
        amount: u128,
    ) -> Result<u128, ShoalError> {
        self.atomically("submit_and_stake", |state, _, now| {
            let minter_address = state.minter.address();
            let vault_address = state.vault.address();
            state
                .minter
                .submit(&mut state.ledger, caller, &minter_address, amount)?;
            state.ledger.approve(&minter_address, &vault_address, amount)?;
            state
                .vault
                .deposit(&mut state.ledger, now, &minter_address, amount, recipient)
        })
    }

    /// Fund up to `max_units` staking slots (0 = all available).
    pub fn batch_deposit(&mut self, max_units: u32) -> Result<Vec<SlotId>, ShoalError> {
        self.atomically("batch_deposit", |state, _, _| {
            state
                .minter
                .batch_deposit(&mut state.allocator, &mut state.sink, max_units)
        })
    }

    pub fn set_withhold_ratio(&mut self, caller: &Address, ratio: u32) -> Result<(), ShoalError> {
        self.atomically("set_withhold_ratio", |state, authority, _| {
            state.minter.set_withhold_ratio(authority, caller, ratio)
        })
    }

    pub fn move_withheld_reserve(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), ShoalError> {
        self.atomically("move_withheld_reserve", |state, authority, _| {
            state
                .minter
                .move_withheld_reserve(authority, &mut state.payments, caller, to, amount)
        })
    }

    pub fn toggle_submit_pause(&mut self, caller: &Address) -> Result<bool, ShoalError> {
        self.atomically("toggle_submit_pause", |state, authority, _| {
            state.minter.toggle_submit_pause(authority, caller)
        })
    }

    pub fn toggle_batch_deposit_pause(&mut self, caller: &Address) -> Result<bool, ShoalError> {
        self.atomically("toggle_batch_deposit_pause", |state, authority, _| {
            state.minter.toggle_batch_deposit_pause(authority, caller)
        })
    }

    pub fn recover_base_asset(&mut self, caller: &Address, amount: u128) -> Result<(), ShoalError> {
        self.atomically("recover_base_asset", |state, authority, _| {
            state
                .minter
                .recover_base_asset(authority, &mut state.payments, caller, amount)
        })
    }

    /// Move a stray token held by the minter to the beneficiary.
    ///
    /// The foreign ledger takes part in the transaction: it is only updated
    /// when the operation commits.
    pub fn recover_token<T>(&mut self, caller: &Address, token: &mut T, amount: u128) -> Result<(), ShoalError>
    where
        T: TokenLedger + Clone,
    {
        let mut working_token = token.clone();
        self.atomically("recover_token", |state, authority, _| {
            state
                .minter
                .recover_token(authority, &mut working_token, caller, amount)
        })?;
        *token = working_token;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Receipt token
    // ---------------------------------------------------------------------

    pub fn transfer_receipt(&mut self, caller: &Address, to: &Address, amount: u128) -> Result<(), ShoalError> {
        self.atomically("transfer_receipt", |state, _, _| {
            state.ledger.transfer(caller, to, amount)
        })
    }

    pub fn approve_receipt(&mut self, caller: &Address, spender: &Address, amount: u128) -> Result<(), ShoalError> {
        self.atomically("approve_receipt", |state, _, _| {
            state.ledger.approve(caller, spender, amount)
        })
    }

    // ---------------------------------------------------------------------
    // Vault operations
    // ---------------------------------------------------------------------

    pub fn deposit(&mut self, caller: &Address, assets: u128, receiver: &Address) -> Result<u128, ShoalError> {
        self.atomically("deposit", |state, _, now| {
            state.vault.deposit(&mut state.ledger, now, caller, assets, receiver)
        })
    }

    pub fn mint(&mut self, caller: &Address, shares: u128, receiver: &Address) -> Result<u128, ShoalError> {
        self.atomically("mint", |state, _, now| {
            state.vault.mint(&mut state.ledger, now, caller, shares, receiver)
        })
    }

    pub fn withdraw(
        &mut self,
        caller: &Address,
        assets: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128, ShoalError> {
        self.atomically("withdraw", |state, _, now| {
            state
                .vault
                .withdraw(&mut state.ledger, now, caller, assets, receiver, owner)
        })
    }

    pub fn redeem(
        &mut self,
        caller: &Address,
        shares: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128, ShoalError> {
        self.atomically("redeem", |state, _, now| {
            state
                .vault
                .redeem(&mut state.ledger, now, caller, shares, receiver, owner)
        })
    }

    pub fn sync_rewards(&mut self) -> Result<RewardSync, ShoalError> {
        self.atomically("sync_rewards", |state, _, now| {
            state.vault.sync_rewards(&state.ledger, now)
        })
    }

    pub fn deposit_with_authorization(
        &mut self,
        caller: &Address,
        assets: u128,
        receiver: &Address,
        authorization: &PreAuthorization,
    ) -> Result<u128, ShoalError> {
        self.atomically("deposit_with_authorization", |state, _, now| {
            state.vault.deposit_with_authorization(
                &mut state.ledger,
                now,
                caller,
                assets,
                receiver,
                authorization,
            )
        })
    }

    pub fn mint_with_authorization(
        &mut self,
        caller: &Address,
        shares: u128,
        receiver: &Address,
        authorization: &PreAuthorization,
    ) -> Result<u128, ShoalError> {
        self.atomically("mint_with_authorization", |state, _, now| {
            state.vault.mint_with_authorization(
                &mut state.ledger,
                now,
                caller,
                shares,
                receiver,
                authorization,
            )
        })
    }

    pub fn transfer_shares(&mut self, caller: &Address, to: &Address, shares: u128) -> Result<(), ShoalError> {
        self.atomically("transfer_shares", |state, _, _| {
            state.vault.transfer_shares(caller, to, shares)
        })
    }

    pub fn approve_shares(&mut self, caller: &Address, spender: &Address, shares: u128) -> Result<(), ShoalError> {
        self.atomically("approve_shares", |state, _, _| {
            state.vault.approve_shares(caller, spender, shares);
            Ok(())
        })
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn price_per_share(&self) -> Result<u128, ShoalError> {
        self.state.vault.price_per_share(self.clock.now())
    }

    pub fn total_assets(&self) -> u128 {
        self.state.vault.total_assets(self.clock.now())
    }

    pub fn state(&self) -> &ProtocolState<L, A, S, P> {
        &self.state
    }

    pub fn minter(&self) -> &ReceiptMinter {
        &self.state.minter
    }

    pub fn vault(&self) -> &StakeVault {
        &self.state.vault
    }

    pub fn ledger(&self) -> &L {
        &self.state.ledger
    }

    pub fn allocator(&self) -> &A {
        &self.state.allocator
    }

    pub fn sink(&self) -> &S {
        &self.state.sink
    }

    pub fn payments(&self) -> &P {
        &self.state.payments
    }

    pub fn authority(&self) -> &dyn Authority {
        self.authority.as_ref()
    }

    /// Committed event records not yet taken.
    pub fn events(&self) -> &[EventRecord] {
        &self.committed
    }

    /// Take the committed event records, e.g. to persist them.
    pub fn take_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::events::Event;
    use shoal_store::{synthetic_slot, DepositLog, InMemoryLedger, ManualClock, RoleSet, SlotQueue, Wallets};

    type TestProtocol = Protocol<InMemoryLedger, SlotQueue, DepositLog, Wallets>;

    fn governor() -> Address {
        Address([0x60; 32])
    }

    fn alice() -> Address {
        Address([1u8; 32])
    }

    fn protocol(ratio: u32, slots: u32) -> (TestProtocol, ManualClock) {
        let clock = ManualClock::new(0);
        let state = ProtocolState::new(
            MinterParams {
                address: Address([0xaa; 32]),
                unit_size: 32,
                withhold_ratio: ratio,
            },
            VaultParams {
                address: Address([0x5a; 32]),
                cycle_length: 1_000,
            },
            0,
            InMemoryLedger::new(Address([0xee; 32])),
            SlotQueue::from_slots((0..slots).map(|i| synthetic_slot(i, [0x01; 32])).collect()),
            DepositLog::new(32),
            Wallets::new(),
        )
        .unwrap();
        let authority = RoleSet::new(vec![governor()], Address([0xbe; 32]));
        (
            Protocol::new(state, Box::new(authority), Box::new(clock.clone())),
            clock,
        )
    }

    #[test]
    fn test_shared_address_rejected() {
        let result = ProtocolState::new(
            MinterParams {
                address: Address([0xaa; 32]),
                unit_size: 32,
                withhold_ratio: 0,
            },
            VaultParams {
                address: Address([0xaa; 32]),
                cycle_length: 1_000,
            },
            0,
            InMemoryLedger::new(Address([0xee; 32])),
            SlotQueue::new(),
            DepositLog::new(32),
            Wallets::new(),
        );
        assert!(matches!(result, Err(ShoalError::Validation(_))));
    }

    #[test]
    fn test_commit_releases_event_records() {
        let (mut protocol, _) = protocol(0, 0);
        protocol.submit(&alice(), &alice(), 10).unwrap();

        let events = protocol.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, "submit");
        assert!(matches!(events[0].event, Event::Submitted { amount: 10, .. }));
    }

    #[test]
    fn test_failure_releases_nothing() {
        let (mut protocol, _) = protocol(0, 0);
        assert!(protocol.submit(&alice(), &alice(), 0).is_err());
        assert!(protocol.events().is_empty());
    }

    #[test]
    fn test_take_events_drains_log() {
        let (mut protocol, _) = protocol(0, 0);
        protocol.submit_for_self(&alice(), 10).unwrap();
        assert_eq!(protocol.take_events().len(), 1);
        assert!(protocol.events().is_empty());
    }

    #[test]
    fn test_submit_and_stake_gives_shares_to_recipient() {
        let (mut protocol, _) = protocol(0, 0);
        let bob = Address([2u8; 32]);
        let shares = protocol.submit_and_stake(&alice(), &bob, 50).unwrap();

        assert_eq!(shares, 50);
        assert_eq!(protocol.vault().share_balance(&bob), 50);
        assert_eq!(protocol.ledger().balance_of(&protocol.vault().address()), 50);
        assert_eq!(protocol.minter().balance(), 50);

        let names: Vec<&str> = protocol.events().iter().map(|r| r.event.name()).collect();
        assert_eq!(names, vec!["submitted", "vault_deposit"]);
    }

    #[test]
    fn test_submit_and_stake_rolls_back_on_zero_amount() {
        let (mut protocol, _) = protocol(0, 0);
        let result = protocol.submit_and_stake(&alice(), &alice(), 0);
        assert!(result.is_err());
        assert_eq!(protocol.ledger().total_supply(), 0);
        assert_eq!(protocol.vault().total_shares(), 0);
    }

    #[test]
    fn test_recover_token_only_updates_on_commit() {
        let (mut protocol, _) = protocol(0, 0);
        let mut stray = InMemoryLedger::new(Address([0x55; 32]));
        stray.mint(&Address([0xaa; 32]), 9).unwrap();

        let denied = protocol.recover_token(&alice(), &mut stray, 9);
        assert!(matches!(denied, Err(ShoalError::Unauthorized(_))));
        assert_eq!(stray.balance_of(&Address([0xaa; 32])), 9);

        protocol.recover_token(&governor(), &mut stray, 9).unwrap();
        assert_eq!(stray.balance_of(&Address([0xbe; 32])), 9);
    }

    #[test]
    fn test_invariants_catch_vault_shortfall() {
        let (mut protocol, _) = protocol(0, 0);
        protocol.submit_and_stake(&alice(), &alice(), 64).unwrap();
        let mut state = protocol.state().clone();
        assert!(state.check_invariants().is_ok());

        // move tokens out of the vault behind its back
        state.ledger.transfer(&Address([0x5a; 32]), &alice(), 1).unwrap();
        assert!(matches!(state.check_invariants(), Err(ShoalError::State(_))));
    }

    #[test]
    fn test_clock_drives_vesting() {
        let (mut protocol, clock) = protocol(0, 0);
        protocol.submit_and_stake(&alice(), &alice(), 100).unwrap();
        // reward lands directly in the vault
        protocol.submit(&alice(), &Address([0x5a; 32]), 100).unwrap();
        protocol.sync_rewards().unwrap();

        clock.set(500);
        assert_eq!(protocol.total_assets(), 150);
        clock.set(1_000);
        assert_eq!(protocol.price_per_share().unwrap(), 2 * crate::token::SHARE_UNIT);
    }
}
