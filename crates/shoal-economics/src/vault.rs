// crates/shoal-economics/src/vault.rs
//
// The stake vault: holds staked receipt tokens and issues shares at an
// exchange rate that rises as yield arrives.
//
// Yield is not credited the moment it lands. A sync picks up receipt tokens
// that arrived since the previous sync and vests them linearly across a
// fixed-length cycle. Cycle boundaries sit on a fixed grid: `cycle_end` only
// ever advances by whole multiples of `cycle_length` from its previous
// value, no matter when a sync happens to be called.
//
// Reward picked up by a mid-cycle sync is queued. It sits in
// `pending_reward` but not in `vesting_reward`, so it does not move the rate
// until the next cycle begins.
//
// Rounding always favours the vault (shares down on deposit/redeem, up on
// mint/withdraw), so the effective rate never decreases.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use shoal_core::error::ShoalError;
use shoal_core::events::Event;
use shoal_core::permit::PreAuthorization;
use shoal_core::traits::ReceiptLedger;
use shoal_core::types::{Address, Timestamp};

use crate::math::{mul_div_down, mul_div_up};
use crate::token::SHARE_UNIT;

/// Construction parameters for a `StakeVault`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParams {
    /// Ledger account holding the staked receipt tokens.
    pub address: Address,
    /// Length of one vesting cycle in seconds.
    pub cycle_length: u64,
}

/// Outcome of a `sync_rewards` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSync {
    /// Receipt tokens picked up by this sync.
    pub newly_arrived: u128,
    /// Whether the call crossed a cycle boundary.
    pub cycle_rolled: bool,
    pub cycle_end: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StakeVault {
    address: Address,
    cycle_length: u64,
    cycle_end: Timestamp,
    /// Assets fully credited to share holders as of the last accrual.
    last_sync_assets: u128,
    /// Reward known to the vault but not yet credited (vesting + queued).
    pending_reward: u128,
    /// The part of `pending_reward` vesting in the current cycle.
    vesting_reward: u128,
    /// Last time unlocked vesting was folded into `last_sync_assets`.
    last_accrual: Timestamp,
    total_shares: u128,
    shares: BTreeMap<Address, u128>,
    share_allowances: BTreeMap<Address, BTreeMap<Address, u128>>,
    #[serde(skip)]
    outbox: Vec<Event>,
}

impl StakeVault {
    /// Create an empty vault at time `now`.
    ///
    /// The first cycle boundary is the grid point at or before `now`, so the
    /// first sync can run immediately.
    pub fn new(params: VaultParams, now: Timestamp) -> Result<Self, ShoalError> {
        if params.cycle_length == 0 {
            return Err(ShoalError::Validation(
                "cycle length must be positive".to_string(),
            ));
        }
        let cycle_end = (now / params.cycle_length) * params.cycle_length;
        Ok(Self {
            address: params.address,
            cycle_length: params.cycle_length,
            cycle_end,
            last_sync_assets: 0,
            pending_reward: 0,
            vesting_reward: 0,
            last_accrual: cycle_end,
            total_shares: 0,
            shares: BTreeMap::new(),
            share_allowances: BTreeMap::new(),
            outbox: Vec::new(),
        })
    }

    // ---------------------------------------------------------------------
    // Rate
    // ---------------------------------------------------------------------

    fn cycle_start(&self) -> Timestamp {
        self.cycle_end.saturating_sub(self.cycle_length)
    }

    /// Portion of `vesting_reward` unlocked at `now`.
    fn unlocked_reward(&self, now: Timestamp) -> u128 {
        if now >= self.cycle_end {
            return self.vesting_reward;
        }
        let start = self.last_accrual.max(self.cycle_start());
        if now <= start || self.vesting_reward == 0 {
            return 0;
        }
        // cycle_end > now > start, so the window is non-empty
        let elapsed = (now - start) as u128;
        let window = (self.cycle_end - start) as u128;
        mul_div_down(self.vesting_reward, elapsed, window).unwrap_or(self.vesting_reward)
    }

    /// Effective assets backing all shares at `now`.
    pub fn total_assets(&self, now: Timestamp) -> u128 {
        self.last_sync_assets + self.unlocked_reward(now)
    }

    /// Fold reward unlocked so far into `last_sync_assets`.
    ///
    /// The remaining vesting amount then unlocks linearly over the remaining
    /// window, which keeps the schedule's slope.
    fn accrue(&mut self, now: Timestamp) {
        let unlocked = self.unlocked_reward(now);
        self.last_sync_assets += unlocked;
        self.vesting_reward -= unlocked;
        self.pending_reward -= unlocked;
        if now > self.last_accrual {
            self.last_accrual = now.min(self.cycle_end);
        }
    }

    pub fn convert_to_shares(&self, assets: u128, now: Timestamp) -> Result<u128, ShoalError> {
        if self.total_shares == 0 {
            return Ok(assets);
        }
        let total_assets = self.total_assets(now);
        if total_assets == 0 {
            return Err(ShoalError::State(
                "Vault has outstanding shares but no assets".to_string(),
            ));
        }
        mul_div_down(assets, self.total_shares, total_assets)
    }

    pub fn convert_to_assets(&self, shares: u128, now: Timestamp) -> Result<u128, ShoalError> {
        if self.total_shares == 0 {
            return Ok(shares);
        }
        mul_div_down(shares, self.total_assets(now), self.total_shares)
    }

    pub fn preview_deposit(&self, assets: u128, now: Timestamp) -> Result<u128, ShoalError> {
        self.convert_to_shares(assets, now)
    }

    pub fn preview_mint(&self, shares: u128, now: Timestamp) -> Result<u128, ShoalError> {
        if self.total_shares == 0 {
            return Ok(shares);
        }
        mul_div_up(shares, self.total_assets(now), self.total_shares)
    }

    pub fn preview_withdraw(&self, assets: u128, now: Timestamp) -> Result<u128, ShoalError> {
        if self.total_shares == 0 {
            return Ok(assets);
        }
        let total_assets = self.total_assets(now);
        if total_assets == 0 {
            return Err(ShoalError::State(
                "Vault has outstanding shares but no assets".to_string(),
            ));
        }
        mul_div_up(assets, self.total_shares, total_assets)
    }

    pub fn preview_redeem(&self, shares: u128, now: Timestamp) -> Result<u128, ShoalError> {
        self.convert_to_assets(shares, now)
    }

    /// Value of one whole share in receipt-token wei.
    pub fn price_per_share(&self, now: Timestamp) -> Result<u128, ShoalError> {
        self.convert_to_assets(SHARE_UNIT, now)
    }

    pub fn max_withdraw(&self, owner: &Address, now: Timestamp) -> Result<u128, ShoalError> {
        self.convert_to_assets(self.share_balance(owner), now)
    }

    pub fn max_redeem(&self, owner: &Address) -> u128 {
        self.share_balance(owner)
    }

    // ---------------------------------------------------------------------
    // Deposit / mint
    // ---------------------------------------------------------------------

    /// Pull `assets` receipt tokens from `caller` and mint shares to
    /// `receiver`. Returns the shares minted.
    pub fn deposit(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        now: Timestamp,
        caller: &Address,
        assets: u128,
        receiver: &Address,
    ) -> Result<u128, ShoalError> {
        self.accrue(now);
        let shares = self.preview_deposit(assets, now)?;
        if shares == 0 {
            return Err(ShoalError::Validation("Deposit yields zero shares".to_string()));
        }
        self.enter(ledger, caller, receiver, assets, shares)?;
        Ok(shares)
    }

    /// Mint exactly `shares` to `receiver`, pulling the required receipt
    /// tokens from `caller`. Returns the assets pulled.
    pub fn mint(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        now: Timestamp,
        caller: &Address,
        shares: u128,
        receiver: &Address,
    ) -> Result<u128, ShoalError> {
        self.accrue(now);
        let assets = self.preview_mint(shares, now)?;
        if assets == 0 || shares == 0 {
            return Err(ShoalError::Validation("Mint requires nonzero assets".to_string()));
        }
        self.enter(ledger, caller, receiver, assets, shares)?;
        Ok(assets)
    }

    /// Deposit after handing a signed pre-authorization to the ledger.
    pub fn deposit_with_authorization(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        now: Timestamp,
        caller: &Address,
        assets: u128,
        receiver: &Address,
        authorization: &PreAuthorization,
    ) -> Result<u128, ShoalError> {
        self.apply_authorization(ledger, now, caller, authorization)?;
        self.deposit(ledger, now, caller, assets, receiver)
    }

    /// Mint after handing a signed pre-authorization to the ledger.
    pub fn mint_with_authorization(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        now: Timestamp,
        caller: &Address,
        shares: u128,
        receiver: &Address,
        authorization: &PreAuthorization,
    ) -> Result<u128, ShoalError> {
        self.apply_authorization(ledger, now, caller, authorization)?;
        self.mint(ledger, now, caller, shares, receiver)
    }

    fn apply_authorization(
        &self,
        ledger: &mut dyn ReceiptLedger,
        now: Timestamp,
        caller: &Address,
        authorization: &PreAuthorization,
    ) -> Result<(), ShoalError> {
        if authorization.owner != *caller {
            return Err(ShoalError::Validation(
                "Pre-authorization must be signed by the caller".to_string(),
            ));
        }
        if authorization.spender != self.address {
            return Err(ShoalError::Validation(
                "Pre-authorization does not name the vault as spender".to_string(),
            ));
        }
        ledger.verify_pre_authorization(authorization, now)
    }

    fn enter(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        caller: &Address,
        receiver: &Address,
        assets: u128,
        shares: u128,
    ) -> Result<(), ShoalError> {
        if receiver.is_zero() {
            return Err(ShoalError::Validation(
                "Cannot mint shares to the zero address".to_string(),
            ));
        }
        let total_shares = self
            .total_shares
            .checked_add(shares)
            .ok_or_else(|| ShoalError::Validation("share supply overflow".to_string()))?;
        let last_sync_assets = self
            .last_sync_assets
            .checked_add(assets)
            .ok_or_else(|| ShoalError::Validation("vault asset overflow".to_string()))?;

        ledger.transfer_from(&self.address, caller, &self.address, assets)?;

        self.total_shares = total_shares;
        self.last_sync_assets = last_sync_assets;
        *self.shares.entry(*receiver).or_insert(0) += shares;

        self.outbox.push(Event::VaultDeposit {
            caller: *caller,
            owner: *receiver,
            assets,
            shares,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Withdraw / redeem
    // ---------------------------------------------------------------------

    /// Burn `owner`'s shares and send exactly `assets` receipt tokens to
    /// `receiver`. Returns the shares burned.
    ///
    /// Syncs first when the current cycle has ended, so a withdrawer never
    /// exits at a rate older than the just-completed cycle.
    pub fn withdraw(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        now: Timestamp,
        caller: &Address,
        assets: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128, ShoalError> {
        self.sync_if_cycle_ended(ledger, now)?;
        self.accrue(now);
        let shares = self.preview_withdraw(assets, now)?;
        if assets == 0 || shares == 0 {
            return Err(ShoalError::Validation("Cannot withdraw zero".to_string()));
        }
        self.exit(ledger, caller, receiver, owner, assets, shares)?;
        Ok(shares)
    }

    /// Burn exactly `shares` of `owner`'s shares and send the matching
    /// receipt tokens to `receiver`. Returns the assets sent.
    pub fn redeem(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        now: Timestamp,
        caller: &Address,
        shares: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128, ShoalError> {
        self.sync_if_cycle_ended(ledger, now)?;
        self.accrue(now);
        let assets = self.preview_redeem(shares, now)?;
        if assets == 0 {
            return Err(ShoalError::Validation("Redeem yields zero assets".to_string()));
        }
        self.exit(ledger, caller, receiver, owner, assets, shares)?;
        Ok(assets)
    }

    fn sync_if_cycle_ended(
        &mut self,
        ledger: &dyn ReceiptLedger,
        now: Timestamp,
    ) -> Result<(), ShoalError> {
        if now >= self.cycle_end {
            self.sync_rewards(ledger, now)?;
        }
        Ok(())
    }

    fn exit(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        caller: &Address,
        receiver: &Address,
        owner: &Address,
        assets: u128,
        shares: u128,
    ) -> Result<(), ShoalError> {
        if caller != owner {
            self.spend_share_allowance(owner, caller, shares)?;
        }
        let balance = self.share_balance(owner);
        if balance < shares {
            return Err(ShoalError::State(format!(
                "Insufficient shares: owner holds {} but {} are required",
                balance, shares
            )));
        }
        if assets > self.last_sync_assets {
            return Err(ShoalError::State(format!(
                "Vault holds {} accounted assets, cannot release {}",
                self.last_sync_assets, assets
            )));
        }

        self.shares.insert(*owner, balance - shares);
        self.total_shares -= shares;
        self.last_sync_assets -= assets;

        ledger.transfer(&self.address, receiver, assets)?;

        self.outbox.push(Event::VaultWithdraw {
            caller: *caller,
            receiver: *receiver,
            owner: *owner,
            assets,
            shares,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reward sync
    // ---------------------------------------------------------------------

    /// Pick up receipt tokens that arrived since the last sync.
    ///
    /// At or after `cycle_end`: credit the finished cycle's vesting reward,
    /// start vesting everything pending (queued + newly arrived) and move
    /// `cycle_end` forward along the grid. Before `cycle_end`: queue the
    /// newly arrived reward without touching the cycle.
    pub fn sync_rewards(
        &mut self,
        ledger: &dyn ReceiptLedger,
        now: Timestamp,
    ) -> Result<RewardSync, ShoalError> {
        let balance = ledger.balance_of(&self.address);
        let accounted = self.last_sync_assets + self.pending_reward;
        let newly_arrived = balance.checked_sub(accounted).ok_or_else(|| {
            ShoalError::State(format!(
                "Vault balance {} is below accounted assets {}",
                balance, accounted
            ))
        })?;

        let cycle_rolled = now >= self.cycle_end;
        if cycle_rolled {
            let queued = self.pending_reward - self.vesting_reward;
            self.last_sync_assets += self.vesting_reward;
            self.pending_reward = queued + newly_arrived;
            self.vesting_reward = self.pending_reward;

            let cycles = (now - self.cycle_end) / self.cycle_length + 1;
            self.cycle_end += cycles * self.cycle_length;
            self.last_accrual = now;

            tracing::info!(
                cycle_end = self.cycle_end,
                vesting = %self.vesting_reward,
                "Reward cycle rolled"
            );
        } else {
            self.pending_reward += newly_arrived;
            if newly_arrived > 0 {
                tracing::debug!(
                    queued = %newly_arrived,
                    cycle_end = self.cycle_end,
                    "Queued reward until next cycle"
                );
            }
        }

        self.outbox.push(Event::RewardsSynced {
            cycle_end: self.cycle_end,
            newly_arrived,
            pending_reward: self.pending_reward,
        });

        Ok(RewardSync {
            newly_arrived,
            cycle_rolled,
            cycle_end: self.cycle_end,
        })
    }

    // ---------------------------------------------------------------------
    // Share token
    // ---------------------------------------------------------------------

    pub fn share_balance(&self, owner: &Address) -> u128 {
        self.shares.get(owner).copied().unwrap_or(0)
    }

    pub fn share_allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.share_allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn approve_shares(&mut self, owner: &Address, spender: &Address, shares: u128) {
        self.share_allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, shares);
    }

    pub fn transfer_shares(
        &mut self,
        from: &Address,
        to: &Address,
        shares: u128,
    ) -> Result<(), ShoalError> {
        if to.is_zero() {
            return Err(ShoalError::Validation(
                "Cannot transfer shares to the zero address".to_string(),
            ));
        }
        let balance = self.share_balance(from);
        if balance < shares {
            return Err(ShoalError::State(format!(
                "Insufficient shares: {} held, {} requested",
                balance, shares
            )));
        }
        self.shares.insert(*from, balance - shares);
        *self.shares.entry(*to).or_insert(0) += shares;
        self.outbox.push(Event::SharesTransferred {
            from: *from,
            to: *to,
            shares,
        });
        Ok(())
    }

    fn spend_share_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        shares: u128,
    ) -> Result<(), ShoalError> {
        let allowed = self.share_allowance(owner, spender);
        if allowed == u128::MAX {
            return Ok(());
        }
        if allowed < shares {
            return Err(ShoalError::State(format!(
                "Share allowance {} is below the {} shares required",
                allowed, shares
            )));
        }
        self.approve_shares(owner, spender, allowed - shares);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn cycle_length(&self) -> u64 {
        self.cycle_length
    }

    pub fn cycle_end(&self) -> Timestamp {
        self.cycle_end
    }

    pub fn last_sync_assets(&self) -> u128 {
        self.last_sync_assets
    }

    pub fn pending_reward(&self) -> u128 {
        self.pending_reward
    }

    pub fn vesting_reward(&self) -> u128 {
        self.vesting_reward
    }

    /// Reward picked up mid-cycle that starts vesting at the next boundary.
    pub fn queued_reward(&self) -> u128 {
        self.pending_reward - self.vesting_reward
    }

    /// Take the events staged by operations since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::crypto::Keypair;
    use shoal_core::traits::TokenLedger;
    use shoal_store::InMemoryLedger;

    const CYCLE: u64 = 1_000;

    fn vault_addr() -> Address {
        Address([0x5a; 32])
    }

    fn alice() -> Address {
        Address([1u8; 32])
    }

    fn bob() -> Address {
        Address([2u8; 32])
    }

    fn setup(now: Timestamp) -> (StakeVault, InMemoryLedger) {
        let vault = StakeVault::new(
            VaultParams {
                address: vault_addr(),
                cycle_length: CYCLE,
            },
            now,
        )
        .unwrap();
        (vault, InMemoryLedger::new(Address([0xee; 32])))
    }

    /// Mint receipt tokens to `who` and approve the vault for all of them.
    fn fund(ledger: &mut InMemoryLedger, who: &Address, amount: u128) {
        ledger.mint(who, amount).unwrap();
        ledger.approve(who, &vault_addr(), u128::MAX).unwrap();
    }

    /// Rate as assets per share, scaled by 1e18, for monotonicity checks.
    fn rate(vault: &StakeVault, now: Timestamp) -> u128 {
        vault.price_per_share(now).unwrap()
    }

    #[test]
    fn test_new_aligns_cycle_end_to_grid() {
        let (vault, _) = setup(2_500);
        assert_eq!(vault.cycle_end(), 2_000);
        assert!(StakeVault::new(
            VaultParams {
                address: vault_addr(),
                cycle_length: 0
            },
            0
        )
        .is_err());
    }

    #[test]
    fn test_bootstrap_deposit_is_one_to_one() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 100);

        let shares = vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();

        assert_eq!(shares, 100);
        assert_eq!(vault.total_shares(), 100);
        assert_eq!(vault.total_assets(0), 100);
        assert_eq!(ledger.balance_of(&vault_addr()), 100);
        assert_eq!(ledger.balance_of(&alice()), 0);
    }

    #[test]
    fn test_deposit_zero_shares_rejected() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 100);
        let result = vault.deposit(&mut ledger, 0, &alice(), 0, &alice());
        assert!(matches!(result, Err(ShoalError::Validation(_))));
    }

    #[test]
    fn test_deposit_without_allowance_fails() {
        let (mut vault, mut ledger) = setup(0);
        ledger.mint(&alice(), 100).unwrap();
        assert!(vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).is_err());
        assert_eq!(vault.total_shares(), 0);
    }

    #[test]
    fn test_mint_pulls_rounded_up_assets() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 1_000);
        fund(&mut ledger, &bob(), 1_000);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();

        // 50 reward vests over the first cycle
        ledger.transfer(&alice(), &vault_addr(), 50).unwrap();
        vault.sync_rewards(&ledger, 0).unwrap();
        assert_eq!(vault.total_assets(CYCLE), 150);

        let assets = vault.mint(&mut ledger, CYCLE, &bob(), 3, &bob()).unwrap();
        // 3 shares * 150 / 100 = 4.5, rounded up
        assert_eq!(assets, 5);
        assert_eq!(vault.share_balance(&bob()), 3);
    }

    #[test]
    fn test_mid_cycle_reward_is_queued() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 1_000);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();
        vault.sync_rewards(&ledger, 0).unwrap();
        assert_eq!(vault.cycle_end(), CYCLE);

        ledger.transfer(&alice(), &vault_addr(), 10).unwrap();
        let sync = vault.sync_rewards(&ledger, 500).unwrap();

        assert_eq!(sync.newly_arrived, 10);
        assert!(!sync.cycle_rolled);
        assert_eq!(vault.pending_reward(), 10);
        assert_eq!(vault.queued_reward(), 10);
        assert_eq!(vault.cycle_end(), CYCLE);
        assert_eq!(vault.total_assets(500), 100);
        assert_eq!(vault.total_assets(999), 100);
        assert_eq!(vault.total_assets(CYCLE), 100);

        // the queued reward vests across the next cycle
        vault.sync_rewards(&ledger, CYCLE).unwrap();
        assert_eq!(vault.cycle_end(), 2 * CYCLE);
        assert_eq!(vault.vesting_reward(), 10);
        assert_eq!(vault.total_assets(CYCLE + 500), 105);
        assert_eq!(vault.total_assets(2 * CYCLE), 110);
    }

    #[test]
    fn test_reward_vests_linearly() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 2_000);
        vault.deposit(&mut ledger, 0, &alice(), 1_000, &alice()).unwrap();
        ledger.transfer(&alice(), &vault_addr(), 100).unwrap();
        vault.sync_rewards(&ledger, 0).unwrap();

        assert_eq!(vault.total_assets(0), 1_000);
        assert_eq!(vault.total_assets(250), 1_025);
        assert_eq!(vault.total_assets(500), 1_050);
        assert_eq!(vault.total_assets(CYCLE), 1_100);
        assert_eq!(vault.total_assets(5 * CYCLE), 1_100);
    }

    #[test]
    fn test_cycle_end_stays_on_grid() {
        let (mut vault, ledger) = setup(0);
        vault.sync_rewards(&ledger, 0).unwrap();
        assert_eq!(vault.cycle_end(), CYCLE);

        // a late sync advances by whole cycles from the previous end
        vault.sync_rewards(&ledger, 3_700).unwrap();
        assert_eq!(vault.cycle_end(), 4_000);

        // exactly on a boundary moves to the next one
        vault.sync_rewards(&ledger, 4_000).unwrap();
        assert_eq!(vault.cycle_end(), 5_000);
    }

    #[test]
    fn test_late_sync_vests_from_sync_time() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 2_000);
        fund(&mut ledger, &bob(), 1_000);
        vault.deposit(&mut ledger, 0, &alice(), 1_000, &alice()).unwrap();
        vault.sync_rewards(&ledger, 0).unwrap();
        ledger.transfer(&alice(), &vault_addr(), 1_000).unwrap();

        let before = rate(&vault, 1_990);
        vault.sync_rewards(&ledger, 1_990).unwrap();

        assert_eq!(vault.cycle_end(), 2_000);
        assert_eq!(rate(&vault, 1_990), before);
        assert_eq!(vault.total_assets(1_990), 1_000);
        assert_eq!(vault.total_assets(1_995), 1_500);
        assert_eq!(vault.total_assets(2_000), 2_000);

        // an in-and-out at the sync instant captures none of the reward
        let shares = vault.deposit(&mut ledger, 1_990, &bob(), 1_000, &bob()).unwrap();
        let out = vault.redeem(&mut ledger, 1_990, &bob(), shares, &bob(), &bob()).unwrap();
        assert!(out <= 1_000);
    }

    #[test]
    fn test_sync_twice_is_idempotent() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 1_000);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();
        ledger.transfer(&alice(), &vault_addr(), 40).unwrap();

        vault.sync_rewards(&ledger, 1_200).unwrap();
        let snapshot = serde_json::to_string(&vault).unwrap();
        let second = vault.sync_rewards(&ledger, 1_200).unwrap();

        assert_eq!(second.newly_arrived, 0);
        assert_eq!(serde_json::to_string(&vault).unwrap(), snapshot);
    }

    #[test]
    fn test_withdraw_syncs_after_cycle_end() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 1_000);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();
        vault.sync_rewards(&ledger, 0).unwrap();
        ledger.transfer(&alice(), &vault_addr(), 100).unwrap();
        vault.sync_rewards(&ledger, 10).unwrap();

        // cycle has ended: the withdraw rolls it, queued reward starts vesting
        let shares = vault
            .withdraw(&mut ledger, CYCLE, &alice(), 50, &alice(), &alice())
            .unwrap();
        assert_eq!(vault.cycle_end(), 2 * CYCLE);
        assert_eq!(vault.vesting_reward(), 100);
        assert_eq!(shares, 50);
    }

    #[test]
    fn test_redeem_everything_after_full_vesting() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 1_000);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();
        ledger.transfer(&alice(), &vault_addr(), 20).unwrap();
        vault.sync_rewards(&ledger, 0).unwrap();

        let before = ledger.balance_of(&alice());
        let assets = vault
            .redeem(&mut ledger, 1_500, &alice(), 100, &alice(), &alice())
            .unwrap();

        assert_eq!(assets, 120);
        assert_eq!(ledger.balance_of(&alice()), before + 120);
        assert_eq!(vault.total_shares(), 0);
        assert_eq!(ledger.balance_of(&vault_addr()), 0);
    }

    #[test]
    fn test_mid_cycle_withdraw_of_vested_yield() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 1_000);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();
        ledger.transfer(&alice(), &vault_addr(), 100).unwrap();
        vault.sync_rewards(&ledger, 0).unwrap();

        // half the reward has vested; redeeming all shares takes it
        let assets = vault
            .redeem(&mut ledger, 500, &alice(), 100, &alice(), &alice())
            .unwrap();
        assert_eq!(assets, 150);
        assert_eq!(vault.last_sync_assets(), 0);
        assert_eq!(vault.vesting_reward(), 50);
    }

    #[test]
    fn test_withdraw_requires_share_allowance() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 100);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();

        let denied = vault.withdraw(&mut ledger, 10, &bob(), 10, &bob(), &alice());
        assert!(matches!(denied, Err(ShoalError::State(_))));

        vault.approve_shares(&alice(), &bob(), 10);
        vault
            .withdraw(&mut ledger, 10, &bob(), 10, &bob(), &alice())
            .unwrap();
        assert_eq!(ledger.balance_of(&bob()), 10);
        assert_eq!(vault.share_allowance(&alice(), &bob()), 0);
    }

    #[test]
    fn test_withdraw_more_than_owned_fails() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 100);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();
        let result = vault.withdraw(&mut ledger, 10, &alice(), 101, &alice(), &alice());
        assert!(result.is_err());
        assert_eq!(vault.share_balance(&alice()), 100);
    }

    #[test]
    fn test_rate_never_decreases() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 10_000);
        fund(&mut ledger, &bob(), 10_000);
        vault.deposit(&mut ledger, 0, &alice(), 997, &alice()).unwrap();

        let mut last = rate(&vault, 0);
        let steps: [(Timestamp, u8); 8] = [
            (0, 0),
            (130, 1),
            (450, 2),
            (999, 3),
            (1_000, 0),
            (1_333, 2),
            (2_100, 1),
            (2_999, 3),
        ];
        for (now, action) in steps {
            match action {
                0 => {
                    ledger.transfer(&bob(), &vault_addr(), 37).unwrap();
                    vault.sync_rewards(&ledger, now).unwrap();
                }
                1 => {
                    vault.deposit(&mut ledger, now, &bob(), 333, &bob()).unwrap();
                }
                2 => {
                    vault
                        .withdraw(&mut ledger, now, &alice(), 101, &alice(), &alice())
                        .unwrap();
                }
                _ => {
                    vault
                        .redeem(&mut ledger, now, &bob(), 7, &bob(), &bob())
                        .unwrap_or_default();
                }
            }
            let current = rate(&vault, now);
            assert!(current >= last, "rate fell from {} to {} at {}", last, current, now);
            last = current;
        }
    }

    #[test]
    fn test_deposit_with_authorization() {
        let (mut vault, mut ledger) = setup(0);
        let owner = Keypair::generate();
        ledger.mint(&owner.address(), 100).unwrap();

        let permit = PreAuthorization::sign(&owner, vault_addr(), 100, 0, 50);
        let shares = vault
            .deposit_with_authorization(&mut ledger, 10, &owner.address(), 100, &bob(), &permit)
            .unwrap();

        assert_eq!(shares, 100);
        assert_eq!(vault.share_balance(&bob()), 100);
        assert_eq!(ledger.nonce(&owner.address()), 1);
    }

    #[test]
    fn test_authorization_must_come_from_caller() {
        let (mut vault, mut ledger) = setup(0);
        let owner = Keypair::generate();
        ledger.mint(&owner.address(), 100).unwrap();
        let permit = PreAuthorization::sign(&owner, vault_addr(), 100, 0, 50);

        let result =
            vault.deposit_with_authorization(&mut ledger, 10, &bob(), 100, &bob(), &permit);
        assert!(matches!(result, Err(ShoalError::Validation(_))));
    }

    #[test]
    fn test_mint_with_authorization_unlimited() {
        let (mut vault, mut ledger) = setup(0);
        let owner = Keypair::generate();
        ledger.mint(&owner.address(), 100).unwrap();
        let permit = PreAuthorization::sign(&owner, vault_addr(), u128::MAX, 0, 50);

        let assets = vault
            .mint_with_authorization(&mut ledger, 10, &owner.address(), 60, &owner.address(), &permit)
            .unwrap();
        assert_eq!(assets, 60);
        assert_eq!(ledger.allowance(&owner.address(), &vault_addr()), u128::MAX);
    }

    #[test]
    fn test_transfer_shares() {
        let (mut vault, mut ledger) = setup(0);
        fund(&mut ledger, &alice(), 100);
        vault.deposit(&mut ledger, 0, &alice(), 100, &alice()).unwrap();

        vault.transfer_shares(&alice(), &bob(), 40).unwrap();
        assert_eq!(vault.share_balance(&alice()), 60);
        assert_eq!(vault.share_balance(&bob()), 40);
        assert!(vault.transfer_shares(&alice(), &bob(), 61).is_err());
    }
}
