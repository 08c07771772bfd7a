//! # External Market Adapter
//!
//! Typed view over an Aave-v3-style lending market: the collaborator traits the
//! vault talks to, the packed reserve configuration decoder, and
//! [`ExternalPosition`], the snapshot every valuation and capacity query is
//! computed from.
//!
//! Nothing here caches. A position is read, used for one computation and
//! dropped, because the market's income index can move between any two calls.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::vault_standards::mul_div::{checked_mul_div, saturating_mul_div, Rounding};
use crate::vault_standards::U256;
use crate::Address;

/// Fixed-point unit of the market's indexes (27 decimals).
pub const RAY: u128 = 1_000_000_000_000_000_000_000_000_000;

/// Largest supply cap representable in the configuration bitmap.
pub const MAX_SUPPLY_CAP: u128 = (1u128 << 36) - 1;

// ============================================================================
// Ray Math
// ============================================================================

/// `a * b / RAY` with explicit rounding, saturating at `u128::MAX`.
pub fn ray_mul(a: u128, b: u128, rounding: Rounding) -> u128 {
    saturating_mul_div(a, b, RAY, rounding)
}

/// `a * RAY / b` with explicit rounding. `None` on a zero index or overflow.
pub fn ray_div(a: u128, b: u128, rounding: Rounding) -> Option<u128> {
    checked_mul_div(a, RAY, b, rounding)
}

// ============================================================================
// Reserve Configuration
// ============================================================================

const DECIMALS_START_BIT: usize = 48;
const ACTIVE_BIT: usize = 56;
const FROZEN_BIT: usize = 57;
const PAUSED_BIT: usize = 60;
const SUPPLY_CAP_START_BIT: usize = 116;

/// The market's packed per-reserve configuration word.
///
/// Bit layout (subset read by the vault):
///
/// | Bits    | Field      |
/// |---------|------------|
/// | 48–55   | decimals   |
/// | 56      | active     |
/// | 57      | frozen     |
/// | 60      | paused     |
/// | 116–151 | supply cap (whole tokens, 0 = uncapped) |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReserveConfigurationMap(pub U256);

impl ReserveConfigurationMap {
    fn bit(&self, index: usize) -> bool {
        !((self.0 >> index) & U256::one()).is_zero()
    }

    fn field(&self, start: usize, width: usize) -> u128 {
        let mask = (U256::one() << width) - U256::one();
        ((self.0 >> start) & mask).low_u128()
    }

    pub fn decode(&self) -> ReserveConfig {
        ReserveConfig {
            active: self.bit(ACTIVE_BIT),
            frozen: self.bit(FROZEN_BIT),
            paused: self.bit(PAUSED_BIT),
            supply_cap_whole: self.field(SUPPLY_CAP_START_BIT, 36),
            decimals: self.field(DECIMALS_START_BIT, 8) as u8,
        }
    }
}

/// Decoded reserve flags the vault's capacity logic depends on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReserveConfig {
    pub active: bool,
    pub frozen: bool,
    pub paused: bool,
    /// Supply cap in whole tokens. Zero means uncapped.
    pub supply_cap_whole: u128,
    pub decimals: u8,
}

impl ReserveConfig {
    /// An active, unfrozen, unpaused, uncapped reserve.
    pub fn live(decimals: u8) -> Self {
        Self {
            active: true,
            frozen: false,
            paused: false,
            supply_cap_whole: 0,
            decimals,
        }
    }

    /// The supply cap expressed in base units, saturating.
    pub fn supply_cap_assets(&self) -> u128 {
        let unit = 10u128.checked_pow(self.decimals as u32).unwrap_or(u128::MAX);
        self.supply_cap_whole.saturating_mul(unit)
    }

    /// New supplies are accepted.
    pub fn accepts_deposits(&self) -> bool {
        self.active && !self.frozen && !self.paused
    }

    /// Withdrawals are served. Frozen reserves still pay out.
    pub fn allows_withdrawals(&self) -> bool {
        self.active && !self.paused
    }

    /// Packs this configuration into the market's bitmap layout.
    ///
    /// Supply caps beyond [`MAX_SUPPLY_CAP`] are clamped.
    pub fn encode(&self) -> ReserveConfigurationMap {
        let mut word = U256::from(self.decimals) << DECIMALS_START_BIT;
        if self.active {
            word = word | (U256::one() << ACTIVE_BIT);
        }
        if self.frozen {
            word = word | (U256::one() << FROZEN_BIT);
        }
        if self.paused {
            word = word | (U256::one() << PAUSED_BIT);
        }
        let cap = self.supply_cap_whole.min(MAX_SUPPLY_CAP);
        word = word | (U256::from(cap) << SUPPLY_CAP_START_BIT);
        ReserveConfigurationMap(word)
    }
}

/// Reserve state as reported by the market for one asset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserveData {
    pub configuration: ReserveConfigurationMap,
    pub liquidity_index: u128,
    /// Receipt token minted to suppliers of this asset.
    pub a_token_address: Address,
    /// Scaled amount owed to the market treasury, not yet minted.
    pub accrued_to_treasury: u128,
}

// ============================================================================
// Collaborator Interfaces
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("no reserve for asset {0}")]
    ReserveNotFound(Address),

    #[error("reserve is inactive")]
    ReserveInactive,

    #[error("reserve is frozen")]
    ReserveFrozen,

    #[error("reserve is paused")]
    ReservePaused,

    #[error("supply cap exceeded")]
    SupplyCapExceeded,

    #[error("insufficient liquidity: available {available}, requested {requested}")]
    InsufficientLiquidity { available: u128, requested: u128 },

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("unknown token {0}")]
    UnknownToken(Address),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Fungible-token collaborator holding the underlying asset.
pub trait AssetLedger {
    fn balance_of(&self, token: &Address, holder: &Address) -> u128;

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), MarketError>;
}

/// Lending-market collaborator.
///
/// `caller` is the account issuing the call; supplies pull the underlying
/// from it and withdrawals burn its receipt balance.
pub trait LendingPool: AssetLedger {
    /// The pool's own address, the one a vault config names.
    fn address(&self) -> Address;

    fn supply(
        &mut self,
        caller: &Address,
        asset: &Address,
        amount: u128,
        on_behalf_of: &Address,
    ) -> Result<(), MarketError>;

    /// Returns the amount actually transferred to `to`.
    fn withdraw(
        &mut self,
        caller: &Address,
        asset: &Address,
        amount: u128,
        to: &Address,
    ) -> Result<u128, MarketError>;

    fn get_reserve_data(&self, asset: &Address) -> Option<ReserveData>;

    fn get_reserve_normalized_income(&self, asset: &Address) -> u128;

    fn scaled_balance_of(&self, receipt_token: &Address, holder: &Address) -> u128;

    fn scaled_total_supply(&self, receipt_token: &Address) -> u128;
}

// ============================================================================
// External Position
// ============================================================================

/// Snapshot of a holder's rebasing position and the reserve around it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalPosition {
    pub receipt_token: Address,
    pub scaled_balance: u128,
    pub scaled_total_supply: u128,
    pub normalized_income: u128,
    pub liquidity_index: u128,
    pub accrued_to_treasury: u128,
    /// Underlying held by the receipt token, i.e. not lent out.
    pub available_liquidity: u128,
    pub config: ReserveConfig,
}

impl ExternalPosition {
    /// Reads the position of `holder` in the `asset` reserve.
    ///
    /// Returns `None` when the market has no reserve for the asset.
    pub fn read<M: LendingPool + ?Sized>(
        market: &M,
        asset: &Address,
        holder: &Address,
    ) -> Option<Self> {
        let reserve = market.get_reserve_data(asset)?;
        let receipt_token = reserve.a_token_address;
        Some(Self {
            receipt_token,
            scaled_balance: market.scaled_balance_of(&receipt_token, holder),
            scaled_total_supply: market.scaled_total_supply(&receipt_token),
            normalized_income: market.get_reserve_normalized_income(asset),
            liquidity_index: reserve.liquidity_index,
            accrued_to_treasury: reserve.accrued_to_treasury,
            available_liquidity: market.balance_of(asset, &receipt_token),
            config: reserve.configuration.decode(),
        })
    }

    /// Current real-value balance: `scaled * income / RAY`, rounded down.
    pub fn balance(&self) -> u128 {
        ray_mul(self.scaled_balance, self.normalized_income, Rounding::Down)
    }

    /// Capital counted against the supply cap.
    pub fn used_supply(&self) -> u128 {
        ray_mul(
            self.scaled_total_supply.saturating_add(self.accrued_to_treasury),
            self.liquidity_index,
            Rounding::Down,
        )
    }
}
