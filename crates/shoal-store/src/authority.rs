// crates/shoal-store/src/authority.rs
//
// Governance as a fixed set of governor addresses plus the beneficiary that
// receives recovered funds.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use shoal_core::traits::Authority;
use shoal_core::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    governors: BTreeSet<Address>,
    beneficiary: Address,
}

impl RoleSet {
    pub fn new(governors: Vec<Address>, beneficiary: Address) -> Self {
        Self {
            governors: governors.into_iter().collect(),
            beneficiary,
        }
    }

    pub fn governors(&self) -> impl Iterator<Item = &Address> {
        self.governors.iter()
    }
}

impl Authority for RoleSet {
    fn is_authorized(&self, caller: &Address) -> bool {
        self.governors.contains(caller)
    }

    fn beneficiary(&self) -> Address {
        self.beneficiary
    }
}
