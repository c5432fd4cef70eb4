// crates/shoal-core/src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ShoalError;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// An account on the Shoal ledgers.
///
/// Accounts are ed25519 public keys, which lets the receipt ledger verify
/// pre-authorizations signed by the account owner without a separate
/// key registry. Contract-like participants (the minter, the vault) use
/// fixed addresses from configuration.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(#[serde(with = "hex::serde")] pub [u8; 32]);

impl Address {
    /// The all-zero address. Never a valid recipient.
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Short form for logs: first four bytes in hex.
    pub fn short(&self) -> String {
        format!("0x{}", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.short())
    }
}

impl FromStr for Address {
    type Err = ShoalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches("0x");
        let bytes = hex::decode(trimmed)?;
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            ShoalError::Validation("address must be exactly 32 bytes".to_string())
        })?;
        Ok(Address(array))
    }
}

/// Identifier of a staking slot: the validator public key it will sign with.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(#[serde(with = "hex::serde")] pub Vec<u8>);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = &self.0[..self.0.len().min(6)];
        write!(f, "SlotId(0x{}..)", hex::encode(head))
    }
}

impl FromStr for SlotId {
    type Err = ShoalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim().trim_start_matches("0x"))?;
        if bytes.is_empty() {
            return Err(ShoalError::Validation("slot id must not be empty".to_string()));
        }
        Ok(SlotId(bytes))
    }
}

/// A staking slot handed out by the slot allocator, together with the
/// deposit data the external staking sink needs to fund it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingSlot {
    /// Validator public key identifying the slot.
    pub id: SlotId,
    /// Withdrawal credential the staked funds are bound to.
    #[serde(with = "hex::serde")]
    pub withdrawal_credential: [u8; 32],
    /// Deposit signature proving possession of the validator key.
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
    /// Root of the deposit data the sink checks the submission against.
    #[serde(with = "hex::serde")]
    pub deposit_data_root: [u8; 32],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip_display() {
        let addr = Address([0xab; 32]);
        let parsed: Address = addr.to_string().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_default_address_is_zero() {
        assert_eq!(Address::default(), Address::ZERO);
    }

    #[test]
    fn test_address_accepts_unprefixed_hex() {
        let parsed: Address = "01".repeat(32).parse().unwrap();
        assert_eq!(parsed, Address([1u8; 32]));
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        assert!("0xabcd".parse::<Address>().is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address([1u8; 32]).is_zero());
    }

    #[test]
    fn test_slot_id_rejects_empty() {
        assert!("0x".parse::<SlotId>().is_err());
        assert_eq!("0x0102".parse::<SlotId>().unwrap(), SlotId(vec![1, 2]));
    }

    #[test]
    fn test_address_as_json_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(Address([7u8; 32]), 5u64);
        let json = serde_json::to_string(&map).unwrap();
        let back: std::collections::BTreeMap<Address, u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
