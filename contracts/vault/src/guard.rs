//! # Reentrancy Lock
//!
//! One flag per vault. [`ReentrancyLock::acquire`] sets it and hands back a
//! [`LockToken`]; dropping the token clears it, so every exit path of an entry
//! point releases the lock, including `?` early returns.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::VaultError;

#[derive(Clone, Debug, Default)]
pub struct ReentrancyLock {
    entered: Rc<Cell<bool>>,
}

impl ReentrancyLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the lock, or fails with [`VaultError::ReentrantCall`] if held.
    pub fn acquire(&self) -> Result<LockToken, VaultError> {
        if self.entered.replace(true) {
            return Err(VaultError::ReentrantCall);
        }
        Ok(LockToken {
            entered: Rc::clone(&self.entered),
        })
    }

    pub fn is_held(&self) -> bool {
        self.entered.get()
    }
}

/// Proof of holding the lock. Releases it on drop.
#[must_use = "the lock is released as soon as the token is dropped"]
#[derive(Debug)]
pub struct LockToken {
    entered: Rc<Cell<bool>>,
}

impl Drop for LockToken {
    fn drop(&mut self) {
        self.entered.set(false);
    }
}
