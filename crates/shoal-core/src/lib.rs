// crates/shoal-core/src/lib.rs
//
// shoal-core: Core types, traits, and crypto primitives for the Shoal
// liquid-staking engine.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines account and slot types, the error type, event records, signed
// pre-authorizations, and the interfaces of the external collaborators
// (receipt ledger, slot allocator, deposit sink, payment rail, governance,
// clock).

pub mod crypto;
pub mod error;
pub mod events;
pub mod permit;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use shoal_core::Address;`

pub use error::ShoalError;
pub use events::{Event, EventRecord};
pub use permit::PreAuthorization;
pub use traits::{
    Authority, Clock, DepositSink, PaymentRail, ReceiptLedger, SlotAllocator, TokenLedger,
};
pub use types::{Address, SlotId, StakingSlot, Timestamp};
