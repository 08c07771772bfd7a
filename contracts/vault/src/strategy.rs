//! # Strategy Adapters
//!
//! Where the vault's assets live between deposits and withdrawals.
//!
//! | Variant           | invest          | divest             | idle balance         |
//! |-------------------|-----------------|--------------------|----------------------|
//! | `PassthroughCash` | no-op           | no-op              | vault custody        |
//! | `LendingMarket`   | supply to pool  | withdraw from pool | raw custody (donations) |

use tracing::{debug, warn};

use crate::error::{Result, VaultError};
use crate::market::{ExternalPosition, LendingPool};
use crate::Address;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Assets stay in the vault's own custody.
    PassthroughCash,
    /// Assets are supplied to a lending pool in exchange for a rebasing
    /// receipt token.
    LendingMarket { pool: Address, receipt_token: Address },
}

impl Strategy {
    pub fn pool(&self) -> Option<Address> {
        match self {
            Strategy::PassthroughCash => None,
            Strategy::LendingMarket { pool, .. } => Some(*pool),
        }
    }

    pub fn receipt_token(&self) -> Option<Address> {
        match self {
            Strategy::PassthroughCash => None,
            Strategy::LendingMarket { receipt_token, .. } => Some(*receipt_token),
        }
    }

    /// Moves `assets` from vault custody into the strategy.
    pub fn invest<M: LendingPool>(
        &self,
        market: &mut M,
        vault: &Address,
        asset: &Address,
        assets: u128,
    ) -> Result<()> {
        match self {
            Strategy::PassthroughCash => Ok(()),
            Strategy::LendingMarket { pool, .. } => {
                if assets == 0 {
                    return Ok(());
                }
                debug!(%pool, assets, "strategy_invest");
                market.supply(vault, asset, assets, vault)?;
                Ok(())
            }
        }
    }

    /// Brings `assets` back into vault custody.
    ///
    /// Anything short of the full amount is a hard failure. Whatever did
    /// arrive stays in the vault's custody and is reported as `returned`, so
    /// the caller can keep counting it.
    pub fn divest<M: LendingPool>(
        &self,
        market: &mut M,
        vault: &Address,
        asset: &Address,
        assets: u128,
    ) -> Result<u128> {
        match self {
            Strategy::PassthroughCash => Ok(assets),
            Strategy::LendingMarket { pool, .. } => {
                if assets == 0 {
                    return Ok(0);
                }
                debug!(%pool, assets, "strategy_divest");
                let returned = market.withdraw(vault, asset, assets, vault)?;
                if returned < assets {
                    warn!(%pool, requested = assets, returned, "strategy_divest_short");
                    return Err(VaultError::MarketDivestFailure {
                        requested: assets,
                        returned,
                    });
                }
                Ok(returned)
            }
        }
    }

    /// Underlying sitting in the vault's own custody.
    pub fn idle_balance<M: LendingPool>(
        &self,
        market: &M,
        vault: &Address,
        asset: &Address,
    ) -> u128 {
        market.balance_of(asset, vault)
    }

    /// Value of everything the strategy holds for the vault.
    ///
    /// For the lending market this is the rebasing receipt balance only.
    /// Custody is excluded here; the vault adds back what it owes holders.
    pub fn total_assets<M: LendingPool>(
        &self,
        market: &M,
        vault: &Address,
        asset: &Address,
    ) -> u128 {
        match self {
            Strategy::PassthroughCash => market.balance_of(asset, vault),
            Strategy::LendingMarket { .. } => ExternalPosition::read(market, asset, vault)
                .map(|position| position.balance())
                .unwrap_or(0),
        }
    }

    /// Snapshot of the market position, if the strategy has one.
    pub fn position<M: LendingPool>(
        &self,
        market: &M,
        vault: &Address,
        asset: &Address,
    ) -> Option<ExternalPosition> {
        match self {
            Strategy::PassthroughCash => None,
            Strategy::LendingMarket { .. } => ExternalPosition::read(market, asset, vault),
        }
    }
}
