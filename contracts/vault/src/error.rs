use std::fmt;

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::market::MarketError;
use crate::Address;

/// Vault entry point a capacity failure refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    Mint,
    Withdraw,
    Redeem,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Deposit => "deposit",
            Operation::Mint => "mint",
            Operation::Withdraw => "withdraw",
            Operation::Redeem => "redeem",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("zero address where a live address is required")]
    NullAddress,

    #[error("market has no receipt token for the asset")]
    InvalidAsset,

    #[error("{operation} of {requested} exceeds max {max}")]
    CapacityExceeded {
        operation: Operation,
        requested: u128,
        max: u128,
    },

    #[error("vault is paused")]
    Paused,

    #[error("reentrant call")]
    ReentrantCall,

    #[error("market returned {returned} of {requested} requested")]
    MarketDivestFailure { requested: u128, returned: u128 },

    #[error("configured pool {configured} is not the market {market}")]
    PoolMismatch { configured: Address, market: Address },

    #[error("vault is not initialized")]
    NotInitialized,

    #[error("vault is already initialized")]
    AlreadyInitialized,

    #[error("caller is not authorized")]
    Unauthorized,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("share allowance {allowance} is below the {needed} shares required")]
    InsufficientAllowance { allowance: u128, needed: u128 },

    #[error("arithmetic overflow")]
    MathOverflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Market(#[from] MarketError),
}

impl VaultError {
    /// Failures a caller can recover from by waiting or re-querying capacity.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VaultError::CapacityExceeded { .. } | VaultError::Paused
        )
    }
}

pub type Result<T> = std::result::Result<T, VaultError>;
