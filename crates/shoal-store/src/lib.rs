// crates/shoal-store/src/lib.rs
//
// shoal-store: In-process collaborators and persistence for Shoal.
//
// Provides reference implementations of every collaborator trait in
// shoal-core (receipt ledger with ed25519 permits, FIFO slot queue,
// recording deposit sink, payment wallets, role-set governance, system and
// manual clocks) and a RocksDB store for committed protocol snapshots and
// their event records.

pub mod allocator;
pub mod authority;
pub mod clock;
pub mod ledger;
pub mod payments;
pub mod rocks;
pub mod sink;

// Re-export key types for ergonomic access from downstream crates.
pub use allocator::{build_slot, synthetic_slot, SlotQueue, SLOT_ID_LEN, SLOT_SIGNATURE_LEN};
pub use authority::RoleSet;
pub use clock::{ManualClock, SystemClock};
pub use ledger::InMemoryLedger;
pub use payments::Wallets;
pub use rocks::RocksStateStore;
pub use sink::{DepositLog, SinkDeposit};
