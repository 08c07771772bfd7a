//! # Token Ledger
//!
//! Fungible-token bookkeeping: balances, total supply and allowances. The
//! vault keeps its shares in one, and market simulations reuse it for the
//! underlying asset and for scaled receipt balances.
//!
//! Internal operations follow the usual naming: `internal_deposit` mints to an
//! account, `internal_withdraw` burns from it, `internal_transfer` moves
//! between two accounts. Each either applies completely or returns an error
//! without touching state.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::Address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance for {account}: have {balance}, need {needed}")]
    InsufficientBalance {
        account: Address,
        balance: u128,
        needed: u128,
    },

    #[error("insufficient allowance from {owner} to {spender}: have {allowance}, need {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: u128,
        needed: u128,
    },

    #[error("total supply overflow")]
    SupplyOverflow,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TokenLedger {
    accounts: BTreeMap<Address, u128>,
    allowances: BTreeMap<(Address, Address), u128>,
    total_supply: u128,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.accounts.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    /// Iterates accounts with a non-zero balance, in address order.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.accounts.iter()
    }

    /// Mints `amount` to `account`.
    pub fn internal_deposit(&mut self, account: &Address, amount: u128) -> Result<(), LedgerError> {
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow)?;
        // a balance never exceeds the supply, so this cannot overflow once the supply fits
        let balance = self.balance_of(account) + amount;
        self.set_balance(account, balance);
        self.total_supply = new_supply;
        Ok(())
    }

    /// Burns `amount` from `account`.
    pub fn internal_withdraw(
        &mut self,
        account: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let balance = self.balance_of(account);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: *account,
                balance,
                needed: amount,
            })?;
        self.set_balance(account, remaining);
        self.total_supply -= amount;
        Ok(())
    }

    pub fn internal_transfer(
        &mut self,
        sender: &Address,
        receiver: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        let balance = self.balance_of(sender);
        let remaining = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                account: *sender,
                balance,
                needed: amount,
            })?;
        if sender == receiver {
            return Ok(());
        }
        self.set_balance(sender, remaining);
        let credited = self.balance_of(receiver) + amount;
        self.set_balance(receiver, credited);
        Ok(())
    }

    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: u128) {
        if amount == 0 {
            self.allowances.remove(&(*owner, *spender));
        } else {
            self.allowances.insert((*owner, *spender), amount);
        }
    }

    /// Checks that `spender` may move `amount` on behalf of `owner`.
    ///
    /// Owners are always allowed to move their own balance.
    pub fn check_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        if owner == spender {
            return Ok(());
        }
        let allowance = self.allowance(owner, spender);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: *owner,
                spender: *spender,
                allowance,
                needed: amount,
            });
        }
        Ok(())
    }

    /// Consumes `amount` of allowance. An allowance of `u128::MAX` is infinite.
    pub fn spend_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<(), LedgerError> {
        self.check_allowance(owner, spender, amount)?;
        if owner == spender {
            return Ok(());
        }
        let allowance = self.allowance(owner, spender);
        if allowance != u128::MAX {
            self.approve(owner, spender, allowance - amount);
        }
        Ok(())
    }

    fn set_balance(&mut self, account: &Address, balance: u128) {
        if balance == 0 {
            self.accounts.remove(account);
        } else {
            self.accounts.insert(*account, balance);
        }
    }
}
