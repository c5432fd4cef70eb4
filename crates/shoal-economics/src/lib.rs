// crates/shoal-economics/src/lib.rs
//
// shoal-economics: the accounting engine of Shoal.
//
// The receipt minter turns submitted base asset into receipt tokens, keeps a
// withheld reserve, and batches the free balance into fixed-size staking
// units. The stake vault issues shares against staked receipt tokens at a
// cycle-vested exchange rate. `Protocol` composes both with their
// collaborators and runs every operation as one all-or-nothing transaction.
//
// All amounts are tracked in wei (10^18 wei = 1 ETH) as `u128`.

pub mod guard;
pub mod math;
pub mod minter;
pub mod protocol;
pub mod reserve;
pub mod slots;
pub mod token;
pub mod vault;

// Re-export key types for ergonomic access from downstream crates.
pub use guard::{GuardedOp, ReentrancyLock};
pub use math::{mul_div_down, mul_div_up};
pub use minter::{MinterParams, ReceiptMinter, Submission, PRECISION};
pub use protocol::{Protocol, ProtocolState};
pub use reserve::WithheldReserve;
pub use slots::ActiveSlotSet;
pub use token::{Ether, Wei, DEPOSIT_UNIT_WEI, SHARE_UNIT, WEI_PER_ETH};
pub use vault::{RewardSync, StakeVault, VaultParams};
