// crates/shoal-store/src/rocks.rs
//
// RocksDB-backed persistence for committed protocol state.
//
// Key format:
//   - `state:protocol`  -> JSON snapshot of the whole protocol state
//   - `event:{uuid}`    -> JSON-serialized EventRecord
//
// Event ids are UUIDv7, so iterating the `event:` prefix yields records in
// commit order. A commit writes the new snapshot and its events in one
// WriteBatch: either both land or neither does.

use rocksdb::{DBWithThreadMode, MultiThreaded, Options, WriteBatch};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use shoal_core::error::ShoalError;
use shoal_core::events::EventRecord;

const STATE_KEY: &[u8] = b"state:protocol";
const EVENT_PREFIX: &str = "event:";

/// RocksDB wrapper holding one protocol snapshot and its event log.
#[derive(Debug)]
pub struct RocksStateStore {
    db: DBWithThreadMode<MultiThreaded>,
}

impl RocksStateStore {
    /// Open a RocksDB database at the given filesystem path.
    ///
    /// Creates the database directory if it does not exist.
    pub fn open(path: &str) -> Result<Self, ShoalError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DBWithThreadMode::<MultiThreaded>::open(&opts, path)
            .map_err(|e| ShoalError::Storage(format!("Failed to open RocksDB at {}: {}", path, e)))?;

        Ok(Self { db })
    }

    /// Build the key for an event record: `event:{uuid}`.
    fn event_key(id: &Uuid) -> Vec<u8> {
        format!("{}{}", EVENT_PREFIX, id).into_bytes()
    }

    /// Get raw bytes from RocksDB, mapping errors to ShoalError::Storage.
    fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ShoalError> {
        self.db
            .get(key)
            .map_err(|e| ShoalError::Storage(format!("RocksDB get failed: {}", e)))
    }

    /// Whether a snapshot has been written yet.
    pub fn is_initialized(&self) -> Result<bool, ShoalError> {
        Ok(self.get_raw(STATE_KEY)?.is_some())
    }

    /// Load the last committed snapshot, if any.
    pub fn load_state<T: DeserializeOwned>(&self) -> Result<Option<T>, ShoalError> {
        match self.get_raw(STATE_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Atomically write a new snapshot together with the events its
    /// operation released.
    pub fn commit<T: Serialize>(&self, state: &T, events: &[EventRecord]) -> Result<(), ShoalError> {
        let mut batch = WriteBatch::default();
        batch.put(STATE_KEY, serde_json::to_vec(state)?);
        for record in events {
            batch.put(Self::event_key(&record.id), serde_json::to_vec(record)?);
        }
        self.db
            .write(batch)
            .map_err(|e| ShoalError::Storage(format!("RocksDB write failed: {}", e)))?;
        tracing::debug!(events = events.len(), "Committed snapshot");
        Ok(())
    }

    pub fn get_event(&self, id: &Uuid) -> Result<Option<EventRecord>, ShoalError> {
        match self.get_raw(&Self::event_key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All stored event records in commit order.
    pub fn list_events(&self) -> Result<Vec<EventRecord>, ShoalError> {
        let prefix = EVENT_PREFIX.as_bytes();
        let mut records = Vec::new();

        for item in self.db.prefix_iterator(prefix) {
            let (key, value) = item
                .map_err(|e| ShoalError::Storage(format!("RocksDB iteration error: {}", e)))?;

            // Stop when the prefix no longer matches.
            if !key.starts_with(prefix) {
                break;
            }
            records.push(serde_json::from_slice(&value)?);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;
    use shoal_core::events::Event;
    use shoal_core::traits::ReceiptLedger;
    use shoal_core::types::Address;

    /// Create a temporary directory path using UUID to avoid conflicts.
    fn temp_db_path(label: &str) -> String {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("shoal_test_{}_{}", label, Uuid::now_v7()));
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_fresh_store_has_no_state() {
        let path = temp_db_path("fresh");
        let store = RocksStateStore::open(&path).unwrap();
        assert!(!store.is_initialized().unwrap());
        let state: Option<InMemoryLedger> = store.load_state().unwrap();
        assert!(state.is_none());
        assert!(store.list_events().unwrap().is_empty());
        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_commit_and_reload() {
        let path = temp_db_path("commit");
        let mut ledger = InMemoryLedger::new(Address([0xee; 32]));
        ledger.mint(&Address([1; 32]), u128::MAX / 3).unwrap();
        let records = vec![
            EventRecord::new("submit", Event::WithholdRatioSet { ratio: 1 }),
            EventRecord::new("submit", Event::SubmitPauseToggled { paused: true }),
        ];

        {
            let store = RocksStateStore::open(&path).unwrap();
            store.commit(&ledger, &records).unwrap();
        }

        let store = RocksStateStore::open(&path).unwrap();
        let restored: InMemoryLedger = store.load_state().unwrap().unwrap();
        assert_eq!(restored, ledger);

        let events = store.list_events().unwrap();
        assert_eq!(events.len(), 2);
        assert!(records
            .iter()
            .all(|r| events.iter().any(|e| e.id == r.id && e.event == r.event)));
        assert!(store.get_event(&records[1].id).unwrap().is_some());
        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }

    #[test]
    fn test_later_commit_replaces_snapshot_and_appends_events() {
        let path = temp_db_path("append");
        let store = RocksStateStore::open(&path).unwrap();
        let first = InMemoryLedger::new(Address([0xee; 32]));
        let mut second = first.clone();
        second.mint(&Address([2; 32]), 7).unwrap();

        store
            .commit(&first, &[EventRecord::new("a", Event::WithholdRatioSet { ratio: 1 })])
            .unwrap();
        store
            .commit(&second, &[EventRecord::new("b", Event::WithholdRatioSet { ratio: 2 })])
            .unwrap();

        let restored: InMemoryLedger = store.load_state().unwrap().unwrap();
        assert_eq!(restored, second);
        let mut operations: Vec<String> = store
            .list_events()
            .unwrap()
            .into_iter()
            .map(|r| r.operation)
            .collect();
        operations.sort();
        assert_eq!(operations, vec!["a".to_string(), "b".to_string()]);
        drop(store);
        let _ = std::fs::remove_dir_all(&path);
    }
}
