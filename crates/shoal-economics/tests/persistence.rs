// crates/shoal-economics/tests/persistence.rs
//
// Round-trips committed protocol state through the RocksDB store, the way
// the CLI does between invocations: run an operation, commit the snapshot
// and its events, reopen, rebuild the protocol, and keep going.

use uuid::Uuid;

use shoal_core::traits::{SlotAllocator, TokenLedger};
use shoal_core::types::Address;
use shoal_economics::{MinterParams, Protocol, ProtocolState, VaultParams};
use shoal_store::{
    synthetic_slot, DepositLog, InMemoryLedger, ManualClock, RocksStateStore, RoleSet, SlotQueue,
    Wallets,
};

type LocalState = ProtocolState<InMemoryLedger, SlotQueue, DepositLog, Wallets>;

/// Create a temporary directory path using UUID to avoid conflicts.
fn temp_db_path(label: &str) -> String {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("shoal_test_{}_{}", label, Uuid::now_v7()));
    path.to_string_lossy().to_string()
}

fn governor() -> Address {
    Address([0x60; 32])
}

fn alice() -> Address {
    Address([1u8; 32])
}

fn open_protocol(
    state: LocalState,
    clock: &ManualClock,
) -> Protocol<InMemoryLedger, SlotQueue, DepositLog, Wallets> {
    let authority = RoleSet::new(vec![governor()], Address([0xbe; 32]));
    Protocol::new(state, Box::new(authority), Box::new(clock.clone()))
}

#[test]
fn test_state_survives_reopen() {
    let path = temp_db_path("protocol");
    let clock = ManualClock::new(0);
    let state = ProtocolState::new(
        MinterParams {
            address: Address([0xaa; 32]),
            unit_size: 32,
            withhold_ratio: 250_000,
        },
        VaultParams {
            address: Address([0x5a; 32]),
            cycle_length: 1_000,
        },
        0,
        InMemoryLedger::new(Address([0xee; 32])),
        SlotQueue::from_slots((0..4).map(|i| synthetic_slot(i, [0x01; 32])).collect()),
        DepositLog::new(32),
        Wallets::new(),
    )
    .unwrap();

    {
        let store = RocksStateStore::open(&path).unwrap();
        let mut protocol = open_protocol(state, &clock);
        protocol.submit_and_stake(&alice(), &alice(), 100).unwrap();
        protocol.batch_deposit(0).unwrap();
        let events = protocol.take_events();
        store.commit(protocol.state(), &events).unwrap();
    }

    let store = RocksStateStore::open(&path).unwrap();
    let restored: LocalState = store.load_state().unwrap().unwrap();
    let mut protocol = open_protocol(restored, &clock);

    assert_eq!(protocol.minter().balance(), 36);
    assert_eq!(protocol.minter().withheld_reserve(), 25);
    assert_eq!(protocol.minter().active_slots().len(), 2);
    assert_eq!(protocol.allocator().free_slots(), 2);
    assert_eq!(protocol.vault().share_balance(&alice()), 100);
    assert_eq!(protocol.ledger().balance_of(&Address([0x5a; 32])), 100);
    assert_eq!(store.list_events().unwrap().len(), 4);

    // the reloaded minter is not stuck behind a stale reentrancy flag
    protocol.submit(&alice(), &alice(), 7).unwrap();
    protocol.toggle_submit_pause(&governor()).unwrap();
    let events = protocol.take_events();
    store.commit(protocol.state(), &events).unwrap();
    assert_eq!(store.list_events().unwrap().len(), 6);

    drop(store);
    let _ = std::fs::remove_dir_all(&path);
}
