// crates/shoal-economics/src/minter.rs
//
// The receipt minter: accepts base-asset submissions, mints receipt tokens
// 1:1, keeps a withheld reserve, and batches the free balance into
// fixed-size units funded through the slot allocator and deposit sink.
//
// Ordering inside every operation is checks, then internal effects, then
// calls into collaborators. Atomicity across collaborators (allocator state,
// sink deposits, payments) comes from running the operation inside a
// `Protocol` transaction, which discards the whole working copy on error.

use serde::{Deserialize, Serialize};

use shoal_core::error::ShoalError;
use shoal_core::events::Event;
use shoal_core::traits::{
    Authority, DepositSink, PaymentRail, ReceiptLedger, SlotAllocator, TokenLedger,
};
use shoal_core::types::{Address, SlotId};

use crate::guard::{GuardedOp, ReentrancyLock};
use crate::math::mul_div_down;
use crate::reserve::WithheldReserve;
use crate::slots::ActiveSlotSet;

/// Denominator of the withhold ratio: 1,000,000 = 100%.
pub const PRECISION: u32 = 1_000_000;

/// Construction parameters for a `ReceiptMinter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinterParams {
    /// Ledger account of the minter itself.
    pub address: Address,
    /// Size of one staking commitment in wei.
    pub unit_size: u128,
    /// Initial withhold ratio (out of `PRECISION`).
    pub withhold_ratio: u32,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    /// Receipt tokens minted (always equal to the amount submitted).
    pub minted: u128,
    /// Portion added to the withheld reserve.
    pub withheld: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptMinter {
    address: Address,
    unit_size: u128,
    withhold_ratio: u32,
    /// Base asset held by the minter, in wei.
    balance: u128,
    reserve: WithheldReserve,
    active_slots: ActiveSlotSet,
    submit_paused: bool,
    batch_deposit_paused: bool,
    #[serde(skip)]
    lock: ReentrancyLock,
    #[serde(skip)]
    outbox: Vec<Event>,
}

fn require_authorized(authority: &dyn Authority, caller: &Address) -> Result<(), ShoalError> {
    if !authority.is_authorized(caller) {
        return Err(ShoalError::Unauthorized(format!(
            "{} is not a governor",
            caller.short()
        )));
    }
    Ok(())
}

impl ReceiptMinter {
    /// Create a minter with an empty balance and reserve.
    ///
    /// # Errors
    /// Returns `ShoalError::Validation` for a zero unit size or a ratio above
    /// `PRECISION`.
    pub fn new(params: MinterParams) -> Result<Self, ShoalError> {
        if params.unit_size == 0 {
            return Err(ShoalError::Validation("unit size must be positive".to_string()));
        }
        if params.withhold_ratio > PRECISION {
            return Err(ShoalError::Validation(format!(
                "withhold ratio {} exceeds precision {}",
                params.withhold_ratio, PRECISION
            )));
        }
        Ok(Self {
            address: params.address,
            unit_size: params.unit_size,
            withhold_ratio: params.withhold_ratio,
            balance: 0,
            reserve: WithheldReserve::new(),
            active_slots: ActiveSlotSet::new(),
            submit_paused: false,
            batch_deposit_paused: false,
            lock: ReentrancyLock::new(),
            outbox: Vec::new(),
        })
    }

    // ---------------------------------------------------------------------
    // Submissions
    // ---------------------------------------------------------------------

    /// Accept `amount` wei from `sender` and mint as many receipt tokens to
    /// `recipient`.
    ///
    /// `floor(amount * ratio / PRECISION)` of the submission is added to the
    /// withheld reserve; the mint itself is never reduced.
    pub fn submit(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        sender: &Address,
        recipient: &Address,
        amount: u128,
    ) -> Result<Submission, ShoalError> {
        self.lock.enter(GuardedOp::Submit)?;
        let result = self.submit_inner(ledger, sender, recipient, amount);
        self.lock.exit(GuardedOp::Submit);
        result
    }

    fn submit_inner(
        &mut self,
        ledger: &mut dyn ReceiptLedger,
        sender: &Address,
        recipient: &Address,
        amount: u128,
    ) -> Result<Submission, ShoalError> {
        if amount == 0 {
            return Err(ShoalError::Validation("Cannot submit zero".to_string()));
        }
        if recipient.is_zero() {
            return Err(ShoalError::Validation(
                "Cannot mint to the zero address".to_string(),
            ));
        }
        if self.submit_paused {
            return Err(ShoalError::State("Submit is paused".to_string()));
        }

        let withheld = mul_div_down(amount, self.withhold_ratio as u128, PRECISION as u128)?;
        let new_balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| ShoalError::Validation("minter balance overflow".to_string()))?;

        ledger.mint(recipient, amount)?;
        self.balance = new_balance;
        self.reserve.credit(withheld)?;

        self.outbox.push(Event::Submitted {
            sender: *sender,
            recipient: *recipient,
            amount,
            withheld,
        });
        tracing::debug!(
            sender = %sender.short(),
            recipient = %recipient.short(),
            amount,
            withheld,
            "Submission accepted"
        );

        Ok(Submission {
            minted: amount,
            withheld,
        })
    }

    // ---------------------------------------------------------------------
    // Batched slot funding
    // ---------------------------------------------------------------------

    /// Forward whole units of the free balance to the staking sink.
    ///
    /// Funds `min(available, max_units)` slots, where `max_units == 0` means
    /// every available unit. Returns the funded slot ids in funding order.
    ///
    /// # Errors
    /// - `ShoalError::State` if batch deposits are paused, no whole unit is
    ///   free, the allocator runs out of slots, or a slot is already active.
    /// - Any error from the sink.
    pub fn batch_deposit(
        &mut self,
        allocator: &mut dyn SlotAllocator,
        sink: &mut dyn DepositSink,
        max_units: u32,
    ) -> Result<Vec<SlotId>, ShoalError> {
        self.lock.enter(GuardedOp::BatchDeposit)?;
        let result = self.batch_deposit_inner(allocator, sink, max_units);
        self.lock.exit(GuardedOp::BatchDeposit);
        result
    }

    fn batch_deposit_inner(
        &mut self,
        allocator: &mut dyn SlotAllocator,
        sink: &mut dyn DepositSink,
        max_units: u32,
    ) -> Result<Vec<SlotId>, ShoalError> {
        if self.batch_deposit_paused {
            return Err(ShoalError::State("Batch deposits are paused".to_string()));
        }

        let available = self.available_units();
        if available == 0 {
            return Err(ShoalError::State(format!(
                "Not enough free balance for a {} wei unit: {} wei free",
                self.unit_size,
                self.free_balance()
            )));
        }
        let count = if max_units == 0 {
            available
        } else {
            available.min(max_units as u128)
        };

        let mut funded = Vec::new();
        for _ in 0..count {
            let slot = allocator.next_slot()?;
            if self.active_slots.contains(&slot.id) {
                return Err(ShoalError::State(format!(
                    "Slot {} is already active",
                    slot.id
                )));
            }

            self.active_slots.activate(slot.id.clone())?;
            self.balance -= self.unit_size;

            sink.deposit(&slot, self.unit_size)?;

            tracing::info!(slot = %slot.id, amount = self.unit_size, "Funded staking slot");
            self.outbox.push(Event::UnitDeposited {
                slot: slot.id.clone(),
                withdrawal_credential: slot.withdrawal_credential,
                amount: self.unit_size,
            });
            funded.push(slot.id);
        }

        Ok(funded)
    }

    // ---------------------------------------------------------------------
    // Governance
    // ---------------------------------------------------------------------

    /// Set the fraction of future submissions that is withheld.
    pub fn set_withhold_ratio(
        &mut self,
        authority: &dyn Authority,
        caller: &Address,
        ratio: u32,
    ) -> Result<(), ShoalError> {
        require_authorized(authority, caller)?;
        if ratio > PRECISION {
            return Err(ShoalError::Validation(format!(
                "Ratio {} cannot exceed {}",
                ratio, PRECISION
            )));
        }
        self.withhold_ratio = ratio;
        self.outbox.push(Event::WithholdRatioSet { ratio });
        Ok(())
    }

    /// Pay `amount` of the withheld reserve out to `to`.
    pub fn move_withheld_reserve(
        &mut self,
        authority: &dyn Authority,
        payments: &mut dyn PaymentRail,
        caller: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), ShoalError> {
        require_authorized(authority, caller)?;
        if to.is_zero() {
            return Err(ShoalError::Validation(
                "Cannot move reserve to the zero address".to_string(),
            ));
        }
        self.reserve.debit(amount)?;
        self.balance -= amount;

        payments.send(to, amount)?;

        self.outbox.push(Event::WithheldReserveMoved { to: *to, amount });
        Ok(())
    }

    /// Flip the submit pause. Returns the new paused state.
    pub fn toggle_submit_pause(
        &mut self,
        authority: &dyn Authority,
        caller: &Address,
    ) -> Result<bool, ShoalError> {
        require_authorized(authority, caller)?;
        self.submit_paused = !self.submit_paused;
        self.outbox.push(Event::SubmitPauseToggled {
            paused: self.submit_paused,
        });
        Ok(self.submit_paused)
    }

    /// Flip the batch-deposit pause. Returns the new paused state.
    pub fn toggle_batch_deposit_pause(
        &mut self,
        authority: &dyn Authority,
        caller: &Address,
    ) -> Result<bool, ShoalError> {
        require_authorized(authority, caller)?;
        self.batch_deposit_paused = !self.batch_deposit_paused;
        self.outbox.push(Event::BatchDepositPauseToggled {
            paused: self.batch_deposit_paused,
        });
        Ok(self.batch_deposit_paused)
    }

    /// Send `amount` of free (non-withheld) base asset to the beneficiary.
    pub fn recover_base_asset(
        &mut self,
        authority: &dyn Authority,
        payments: &mut dyn PaymentRail,
        caller: &Address,
        amount: u128,
    ) -> Result<(), ShoalError> {
        require_authorized(authority, caller)?;
        let free = self.free_balance();
        if amount > free {
            return Err(ShoalError::State(format!(
                "Cannot recover {} wei: only {} wei is outside the withheld reserve",
                amount, free
            )));
        }
        let to = authority.beneficiary();
        self.balance -= amount;

        payments.send(&to, amount)?;

        self.outbox.push(Event::BaseAssetRecovered { to, amount });
        Ok(())
    }

    /// Send `amount` of an unrelated token held by the minter to the
    /// beneficiary.
    pub fn recover_token(
        &mut self,
        authority: &dyn Authority,
        token: &mut dyn TokenLedger,
        caller: &Address,
        amount: u128,
    ) -> Result<(), ShoalError> {
        require_authorized(authority, caller)?;
        let to = authority.beneficiary();
        token.transfer(&self.address, &to, amount)?;
        self.outbox.push(Event::TokenRecovered {
            token: token.token(),
            to,
            amount,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Views
    // ---------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn unit_size(&self) -> u128 {
        self.unit_size
    }

    pub fn withhold_ratio(&self) -> u32 {
        self.withhold_ratio
    }

    /// Base asset held by the minter, in wei.
    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn withheld_reserve(&self) -> u128 {
        self.reserve.amount()
    }

    /// Balance not claimed by the withheld reserve.
    pub fn free_balance(&self) -> u128 {
        self.balance - self.reserve.amount()
    }

    /// Whole units the next batch deposit could fund.
    pub fn available_units(&self) -> u128 {
        self.free_balance() / self.unit_size
    }

    pub fn active_slots(&self) -> &ActiveSlotSet {
        &self.active_slots
    }

    pub fn is_submit_paused(&self) -> bool {
        self.submit_paused
    }

    pub fn is_batch_deposit_paused(&self) -> bool {
        self.batch_deposit_paused
    }

    /// Take the events staged by operations since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }
}
