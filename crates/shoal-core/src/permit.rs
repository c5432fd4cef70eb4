// crates/shoal-core/src/permit.rs
//
// Signed pre-authorizations ("permits") for the receipt ledger.
//
// A permit lets an account owner grant an allowance to a spender with a
// signature instead of a separate approve call. The engine never checks
// permits itself; it hands them to `ReceiptLedger::verify_pre_authorization`,
// which validates the signature, nonce, and deadline before setting the
// allowance.

use serde::{Deserialize, Serialize};

use crate::crypto::{hash_bytes, verify_signature, Keypair};
use crate::error::ShoalError;
use crate::types::{Address, Timestamp};

/// Domain tag mixed into every permit digest.
const PERMIT_DOMAIN: &[u8] = b"shoal-permit-v1";

/// A signed allowance grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreAuthorization {
    pub owner: Address,
    pub spender: Address,
    /// Allowance to set. `u128::MAX` grants an unlimited allowance.
    pub amount: u128,
    /// Must equal the owner's current permit nonce on the ledger.
    pub nonce: u64,
    /// Last second (inclusive) at which the permit may be used.
    pub deadline: Timestamp,
    #[serde(with = "hex::serde")]
    pub signature: Vec<u8>,
}

impl PreAuthorization {
    /// Digest the owner signs.
    pub fn digest(
        owner: &Address,
        spender: &Address,
        amount: u128,
        nonce: u64,
        deadline: Timestamp,
    ) -> [u8; 32] {
        let mut message = Vec::with_capacity(PERMIT_DOMAIN.len() + 32 + 32 + 16 + 8 + 8);
        message.extend_from_slice(PERMIT_DOMAIN);
        message.extend_from_slice(owner.as_bytes());
        message.extend_from_slice(spender.as_bytes());
        message.extend_from_slice(&amount.to_be_bytes());
        message.extend_from_slice(&nonce.to_be_bytes());
        message.extend_from_slice(&deadline.to_be_bytes());
        hash_bytes(&message)
    }

    /// Sign a permit with the owner's keypair.
    pub fn sign(
        owner: &Keypair,
        spender: Address,
        amount: u128,
        nonce: u64,
        deadline: Timestamp,
    ) -> Self {
        let owner_address = owner.address();
        let digest = Self::digest(&owner_address, &spender, amount, nonce, deadline);
        Self {
            owner: owner_address,
            spender,
            amount,
            nonce,
            deadline,
            signature: owner.sign(&digest),
        }
    }

    /// Check the signature against the owner's key. Nonce and deadline are
    /// the ledger's concern.
    pub fn signature_is_valid(&self) -> Result<bool, ShoalError> {
        let digest = Self::digest(
            &self.owner,
            &self.spender,
            self.amount,
            self.nonce,
            self.deadline,
        );
        verify_signature(&self.owner, &digest, &self.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_permit_verifies() {
        let owner = Keypair::generate();
        let permit = PreAuthorization::sign(&owner, Address([9u8; 32]), 100, 0, 1_000);
        assert!(permit.signature_is_valid().unwrap());
    }

    #[test]
    fn test_tampered_amount_fails() {
        let owner = Keypair::generate();
        let mut permit = PreAuthorization::sign(&owner, Address([9u8; 32]), 100, 0, 1_000);
        permit.amount = 1_000_000;
        assert!(!permit.signature_is_valid().unwrap());
    }

    #[test]
    fn test_foreign_owner_fails() {
        let owner = Keypair::generate();
        let other = Keypair::generate();
        let mut permit = PreAuthorization::sign(&owner, Address([9u8; 32]), 100, 0, 1_000);
        permit.owner = other.address();
        assert!(!permit.signature_is_valid().unwrap());
    }
}
