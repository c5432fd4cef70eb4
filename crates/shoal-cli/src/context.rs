// crates/shoal-cli/src/context.rs
//
// A CLI session: the RocksDB store, the governance role set from the
// configuration, and the acting account. Every mutating command loads the
// last committed snapshot, runs one protocol operation, and commits the new
// snapshot together with the events it released.

use shoal_core::crypto::Keypair;
use shoal_core::error::ShoalError;
use shoal_core::events::EventRecord;
use shoal_core::traits::Clock;
use shoal_core::types::Address;
use shoal_economics::{MinterParams, Protocol, ProtocolState, VaultParams};
use shoal_store::{DepositLog, InMemoryLedger, RocksStateStore, RoleSet, SlotQueue, SystemClock, Wallets};

use crate::config::ShoalConfig;
use crate::keys;

pub type LocalState = ProtocolState<InMemoryLedger, SlotQueue, DepositLog, Wallets>;
pub type LocalProtocol = Protocol<InMemoryLedger, SlotQueue, DepositLog, Wallets>;

pub struct Session {
    pub config: ShoalConfig,
    store: RocksStateStore,
    key_name: String,
}

/// Build an empty protocol state from the configuration.
pub fn initial_state(config: &ShoalConfig, now: u64) -> Result<LocalState, ShoalError> {
    config.validate()?;
    let unit_size = config.unit_size_wei()?;
    ProtocolState::new(
        MinterParams {
            address: config.minter()?,
            unit_size,
            withhold_ratio: config.withhold_ratio,
        },
        VaultParams {
            address: config.vault()?,
            cycle_length: config.cycle_length,
        },
        now,
        InMemoryLedger::new(config.receipt_token_address()?),
        SlotQueue::new(),
        DepositLog::new(unit_size),
        Wallets::new(),
    )
}

impl Session {
    /// Open the store named by the configuration.
    pub fn open(config: &ShoalConfig, key_name: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let path = config.data_path();
        std::fs::create_dir_all(&path)?;
        let store = RocksStateStore::open(&path.to_string_lossy())?;
        Ok(Self {
            config: config.clone(),
            store,
            key_name: key_name.to_string(),
        })
    }

    pub fn store(&self) -> &RocksStateStore {
        &self.store
    }

    /// Keypair of the acting account.
    pub fn keypair(&self) -> Result<Keypair, Box<dyn std::error::Error>> {
        keys::load(&self.config, &self.key_name)
    }

    /// Address of the acting account.
    pub fn caller(&self) -> Result<Address, Box<dyn std::error::Error>> {
        Ok(self.keypair()?.address())
    }

    pub fn load_state(&self) -> Result<LocalState, Box<dyn std::error::Error>> {
        self.store
            .load_state()?
            .ok_or_else(|| "No protocol state found. Run `shoal init` first.".into())
    }

    /// Write a fresh state. Fails if one already exists.
    pub fn initialize(&self) -> Result<LocalState, Box<dyn std::error::Error>> {
        if self.store.is_initialized()? {
            return Err(format!(
                "Protocol state already exists in {}",
                self.config.data_path().display()
            )
            .into());
        }
        let state = initial_state(&self.config, SystemClock.now())?;
        self.store.commit(&state, &[])?;
        tracing::info!(data_dir = %self.config.data_path().display(), "Initialized protocol state");
        Ok(state)
    }

    /// Persist a state changed outside the protocol's operations, such as a
    /// newly registered slot. No events are recorded.
    pub fn save_state(&self, state: &LocalState) -> Result<(), Box<dyn std::error::Error>> {
        state.check_invariants()?;
        self.store.commit(state, &[])?;
        Ok(())
    }

    /// Load the committed state into a protocol driven by the wall clock.
    pub fn protocol(&self) -> Result<LocalProtocol, Box<dyn std::error::Error>> {
        let state = self.load_state()?;
        let authority = RoleSet::new(
            self.config.governor_addresses()?,
            self.config.beneficiary_address()?,
        );
        Ok(Protocol::new(state, Box::new(authority), Box::new(SystemClock)))
    }

    /// Commit the protocol's state and its pending events.
    pub fn commit(&self, protocol: &mut LocalProtocol) -> Result<Vec<EventRecord>, Box<dyn std::error::Error>> {
        let events = protocol.take_events();
        self.store.commit(protocol.state(), &events)?;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_core::traits::TokenLedger;
    use uuid::Uuid;

    fn temp_config(label: &str) -> ShoalConfig {
        let root = std::env::temp_dir().join(format!("shoal_cli_{}_{}", label, Uuid::now_v7()));
        ShoalConfig {
            data_dir: root.join("data").to_string_lossy().to_string(),
            keys_dir: root.join("keys").to_string_lossy().to_string(),
            unit_size: "1".to_string(),
            ..ShoalConfig::default()
        }
    }

    fn cleanup(config: &ShoalConfig) {
        if let Some(root) = config.data_path().parent() {
            let _ = std::fs::remove_dir_all(root);
        }
    }

    #[test]
    fn test_initialize_once() {
        let config = temp_config("init");
        let session = Session::open(&config, "default").unwrap();
        assert!(session.load_state().is_err());
        session.initialize().unwrap();
        assert!(session.load_state().is_ok());
        assert!(session.initialize().is_err());
        drop(session);
        cleanup(&config);
    }

    #[test]
    fn test_commit_persists_operation() {
        let mut config = temp_config("commit");
        let keypair = keys::generate(&config, "default", false).unwrap();
        config.governors = vec![keypair.address().to_string()];

        {
            let session = Session::open(&config, "default").unwrap();
            session.initialize().unwrap();
            let mut protocol = session.protocol().unwrap();
            let caller = session.caller().unwrap();
            protocol.submit_for_self(&caller, 5).unwrap();
            let events = session.commit(&mut protocol).unwrap();
            assert_eq!(events.len(), 1);
        }

        let session = Session::open(&config, "default").unwrap();
        let protocol = session.protocol().unwrap();
        assert_eq!(protocol.ledger().balance_of(&keypair.address()), 5);
        assert_eq!(session.store().list_events().unwrap().len(), 1);
        drop(session);
        cleanup(&config);
    }
}
