//! # Ledger Model
//!
//! Expected share ledger, updated only from successful vault calls.

use std::collections::BTreeMap;

use lending_vault::{Address, VaultCore};

use crate::helpers::TestVault;

#[derive(Debug, Default, Clone)]
pub struct LedgerModel {
    balances: BTreeMap<Address, u128>,
    supply: u128,
}

impl LedgerModel {
    pub fn mint(&mut self, holder: &Address, shares: u128) {
        *self.balances.entry(*holder).or_default() += shares;
        self.supply += shares;
    }

    pub fn burn(&mut self, holder: &Address, shares: u128) {
        let balance = self.balances.entry(*holder).or_default();
        *balance = balance.saturating_sub(shares);
        self.supply = self.supply.saturating_sub(shares);
    }

    pub fn transfer(&mut self, from: &Address, to: &Address, shares: u128) {
        self.burn(from, shares);
        self.mint(to, shares);
    }

    pub fn supply(&self) -> u128 {
        self.supply
    }

    /// First disagreement between the model and the vault, if any.
    pub fn diff(&self, vault: &TestVault) -> Option<String> {
        if vault.total_supply() != self.supply {
            return Some(format!(
                "total_supply {} but model expects {}",
                vault.total_supply(),
                self.supply
            ));
        }
        for (holder, expected) in &self.balances {
            let actual = vault.balance_of(holder);
            if actual != *expected {
                return Some(format!("balance of {holder} is {actual}, model expects {expected}"));
            }
        }
        for (holder, actual) in vault.holders() {
            if *actual > 0 && !self.balances.contains_key(holder) {
                return Some(format!("{holder} holds {actual} shares the model never issued"));
            }
        }
        None
    }
}
