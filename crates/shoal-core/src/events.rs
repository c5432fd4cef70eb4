// crates/shoal-core/src/events.rs
//
// Structured event records emitted by every successful operation.
//
// Components stage events in an outbox while an operation runs; the
// transaction wrapper releases them as `EventRecord`s only when the
// operation commits, so a rolled-back operation leaves no trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Address, SlotId, Timestamp};

/// A single protocol event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// Base asset was submitted and receipt tokens minted.
    Submitted {
        sender: Address,
        recipient: Address,
        amount: u128,
        withheld: u128,
    },
    /// One fixed-size unit was forwarded to the staking sink.
    UnitDeposited {
        slot: SlotId,
        #[serde(with = "hex::serde")]
        withdrawal_credential: [u8; 32],
        amount: u128,
    },
    WithholdRatioSet {
        ratio: u32,
    },
    WithheldReserveMoved {
        to: Address,
        amount: u128,
    },
    SubmitPauseToggled {
        paused: bool,
    },
    BatchDepositPauseToggled {
        paused: bool,
    },
    BaseAssetRecovered {
        to: Address,
        amount: u128,
    },
    TokenRecovered {
        token: Address,
        to: Address,
        amount: u128,
    },
    /// Receipt tokens entered the vault in exchange for shares.
    VaultDeposit {
        caller: Address,
        owner: Address,
        assets: u128,
        shares: u128,
    },
    /// Shares were burned and receipt tokens left the vault.
    VaultWithdraw {
        caller: Address,
        receiver: Address,
        owner: Address,
        assets: u128,
        shares: u128,
    },
    /// Vault shares moved between holders.
    SharesTransferred {
        from: Address,
        to: Address,
        shares: u128,
    },
    /// Newly arrived reward was picked up by a sync.
    RewardsSynced {
        cycle_end: Timestamp,
        newly_arrived: u128,
        pending_reward: u128,
    },
}

impl Event {
    /// Stable short name, used in logs and table output.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Submitted { .. } => "submitted",
            Event::UnitDeposited { .. } => "unit_deposited",
            Event::WithholdRatioSet { .. } => "withhold_ratio_set",
            Event::WithheldReserveMoved { .. } => "withheld_reserve_moved",
            Event::SubmitPauseToggled { .. } => "submit_pause_toggled",
            Event::BatchDepositPauseToggled { .. } => "batch_deposit_pause_toggled",
            Event::BaseAssetRecovered { .. } => "base_asset_recovered",
            Event::TokenRecovered { .. } => "token_recovered",
            Event::VaultDeposit { .. } => "vault_deposit",
            Event::VaultWithdraw { .. } => "vault_withdraw",
            Event::SharesTransferred { .. } => "shares_transferred",
            Event::RewardsSynced { .. } => "rewards_synced",
        }
    }
}

/// A committed event with its identity and commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Time-ordered identifier (UUIDv7).
    pub id: Uuid,
    /// Name of the operation whose commit released this event.
    pub operation: String,
    /// Wall-clock time of the commit.
    pub committed_at: DateTime<Utc>,
    pub event: Event,
}

impl EventRecord {
    pub fn new(operation: &str, event: Event) -> Self {
        Self {
            id: Uuid::now_v7(),
            operation: operation.to_string(),
            committed_at: Utc::now(),
            event,
        }
    }
}
