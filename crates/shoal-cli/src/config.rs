// crates/shoal-cli/src/config.rs
//
// Runtime configuration for the Shoal CLI.
// Loaded from a TOML file or populated with defaults. Amounts are written as
// decimal ETH strings because TOML integers stop at i64.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use shoal_core::crypto::hash_bytes;
use shoal_core::error::ShoalError;
use shoal_core::types::Address;
use shoal_economics::{Ether, PRECISION};

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoalConfig {
    /// Directory for the RocksDB state store.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding account key files written by `shoal keygen`.
    #[serde(default = "default_keys_dir")]
    pub keys_dir: String,

    /// Log level used when RUST_LOG is not set: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Size of one staking unit, in ETH.
    #[serde(default = "default_unit_size")]
    pub unit_size: String,

    /// Initial withhold ratio out of 1,000,000.
    #[serde(default)]
    pub withhold_ratio: u32,

    /// Vault reward cycle length in seconds.
    #[serde(default = "default_cycle_length")]
    pub cycle_length: u64,

    /// Ledger account of the minter.
    #[serde(default = "default_minter_address")]
    pub minter_address: String,

    /// Ledger account of the vault.
    #[serde(default = "default_vault_address")]
    pub vault_address: String,

    /// Identifier of the receipt token.
    #[serde(default = "default_receipt_token")]
    pub receipt_token: String,

    /// Addresses allowed to run governance commands.
    #[serde(default)]
    pub governors: Vec<String>,

    /// Recipient of recovered funds. Defaults to the first governor.
    #[serde(default)]
    pub beneficiary: Option<String>,

    /// Withdrawal credential bound to locally generated slots (hex, 32 bytes).
    #[serde(default = "default_withdrawal_credential")]
    pub withdrawal_credential: String,
}

fn default_data_dir() -> String {
    "~/.shoal/data".to_string()
}

fn default_keys_dir() -> String {
    "~/.shoal/keys".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_unit_size() -> String {
    "32".to_string()
}

fn default_cycle_length() -> u64 {
    // one week
    604_800
}

fn derived_address(label: &str) -> String {
    Address(hash_bytes(label.as_bytes())).to_string()
}

fn default_minter_address() -> String {
    derived_address("shoal:minter")
}

fn default_vault_address() -> String {
    derived_address("shoal:vault")
}

fn default_receipt_token() -> String {
    derived_address("shoal:receipt")
}

fn default_withdrawal_credential() -> String {
    let mut credential = [0u8; 32];
    credential[0] = 0x01;
    hex::encode(credential)
}

impl Default for ShoalConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            keys_dir: default_keys_dir(),
            log_level: default_log_level(),
            unit_size: default_unit_size(),
            withhold_ratio: 0,
            cycle_length: default_cycle_length(),
            minter_address: default_minter_address(),
            vault_address: default_vault_address(),
            receipt_token: default_receipt_token(),
            governors: Vec::new(),
            beneficiary: None,
            withdrawal_credential: default_withdrawal_credential(),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn resolve_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn parse_address(field: &str, value: &str) -> Result<Address, ShoalError> {
    value
        .parse()
        .map_err(|e| ShoalError::Config(format!("{} is not a valid address: {}", field, e)))
}

impl ShoalConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(resolve_path(path))?;
        let config: ShoalConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Write the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let path = resolve_path(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn data_path(&self) -> PathBuf {
        resolve_path(&self.data_dir)
    }

    pub fn keys_path(&self) -> PathBuf {
        resolve_path(&self.keys_dir)
    }

    pub fn unit_size_wei(&self) -> Result<u128, ShoalError> {
        let unit = Ether::parse_eth(&self.unit_size)
            .ok_or_else(|| ShoalError::Config(format!("unit_size {:?} is not an ETH amount", self.unit_size)))?;
        if unit.wei == 0 {
            return Err(ShoalError::Config("unit_size must be positive".to_string()));
        }
        Ok(unit.wei)
    }

    pub fn minter(&self) -> Result<Address, ShoalError> {
        parse_address("minter_address", &self.minter_address)
    }

    pub fn vault(&self) -> Result<Address, ShoalError> {
        parse_address("vault_address", &self.vault_address)
    }

    pub fn receipt_token_address(&self) -> Result<Address, ShoalError> {
        parse_address("receipt_token", &self.receipt_token)
    }

    pub fn governor_addresses(&self) -> Result<Vec<Address>, ShoalError> {
        self.governors
            .iter()
            .map(|g| parse_address("governors", g))
            .collect()
    }

    /// Configured beneficiary, falling back to the first governor.
    pub fn beneficiary_address(&self) -> Result<Address, ShoalError> {
        match &self.beneficiary {
            Some(b) => parse_address("beneficiary", b),
            None => self
                .governor_addresses()?
                .into_iter()
                .next()
                .ok_or_else(|| ShoalError::Config("no beneficiary and no governors configured".to_string())),
        }
    }

    pub fn credential(&self) -> Result<[u8; 32], ShoalError> {
        let bytes = hex::decode(self.withdrawal_credential.trim_start_matches("0x"))
            .map_err(|e| ShoalError::Config(format!("withdrawal_credential: {}", e)))?;
        bytes
            .try_into()
            .map_err(|_| ShoalError::Config("withdrawal_credential must be 32 bytes".to_string()))
    }

    /// Check the settings the engine would otherwise reject at init time.
    pub fn validate(&self) -> Result<(), ShoalError> {
        self.unit_size_wei()?;
        if self.withhold_ratio > PRECISION {
            return Err(ShoalError::Config(format!(
                "withhold_ratio {} exceeds {}",
                self.withhold_ratio, PRECISION
            )));
        }
        if self.cycle_length == 0 {
            return Err(ShoalError::Config("cycle_length must be positive".to_string()));
        }
        if self.minter()? == self.vault()? {
            return Err(ShoalError::Config(
                "minter_address and vault_address must differ".to_string(),
            ));
        }
        self.receipt_token_address()?;
        self.governor_addresses()?;
        self.credential()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_economics::WEI_PER_ETH;

    #[test]
    fn test_defaults_are_valid() {
        let config = ShoalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.unit_size_wei().unwrap(), 32 * WEI_PER_ETH);
        assert_eq!(config.cycle_length, 604_800);
        assert_ne!(config.minter().unwrap(), config.vault().unwrap());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ShoalConfig = toml::from_str(
            r#"
            withhold_ratio = 500000
            unit_size = "1.5"
            "#,
        )
        .unwrap();
        assert_eq!(config.withhold_ratio, 500_000);
        assert_eq!(config.unit_size_wei().unwrap(), 3 * WEI_PER_ETH / 2);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.data_dir, "~/.shoal/data");
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = ShoalConfig::default();
        config.governors = vec![Address([7; 32]).to_string()];
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ShoalConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.governor_addresses().unwrap(), vec![Address([7; 32])]);
        assert_eq!(parsed.beneficiary_address().unwrap(), Address([7; 32]));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut config = ShoalConfig::default();
        config.withhold_ratio = PRECISION + 1;
        assert!(matches!(config.validate(), Err(ShoalError::Config(_))));

        let mut config = ShoalConfig::default();
        config.vault_address = config.minter_address.clone();
        assert!(config.validate().is_err());

        let mut config = ShoalConfig::default();
        config.governors = vec!["not-an-address".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_path_plain() {
        assert_eq!(resolve_path("/tmp/shoal"), PathBuf::from("/tmp/shoal"));
    }
}
