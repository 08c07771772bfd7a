//! # Capacity Limits
//!
//! Revert-free `max_*` figures. Each one is the lesser of a generic,
//! vault-level ceiling and the room the lending market currently leaves.
//!
//! | Figure         | Market term                          | Generic term                  |
//! |----------------|--------------------------------------|-------------------------------|
//! | `max_deposit`  | `cap_assets - used_supply`           | `deposit_cap - total_assets`  |
//! | `max_mint`     | `to_shares(max_deposit, Down)`       | `u128::MAX - total_supply`    |
//! | `max_withdraw` | available liquidity                  | `to_assets(balance, Down)`    |
//! | `max_redeem`   | `to_shares(liquidity, Down)`         | `balance`                     |
//!
//! An inactive or paused reserve blocks both directions. A frozen reserve
//! blocks deposits only. Pending custody left by a failed withdrawal can
//! always be paid out, so it extends the withdrawal terms.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::market::ExternalPosition;
use crate::vault_standards::conversion::{to_assets_saturating, to_shares_saturating};
use crate::vault_standards::Rounding;

/// Assets the market will still accept for `position`'s reserve.
pub fn deposit_room(position: &ExternalPosition) -> u128 {
    if !position.config.accepts_deposits() {
        return 0;
    }
    if position.config.supply_cap_whole == 0 {
        return u128::MAX;
    }
    position
        .config
        .supply_cap_assets()
        .saturating_sub(position.used_supply())
}

/// Assets the market can pay out right now.
pub fn withdraw_room(position: &ExternalPosition) -> u128 {
    if !position.config.allows_withdrawals() {
        return 0;
    }
    position.available_liquidity
}

/// Vault-level deposit ceiling. `None` means uncapped.
pub fn generic_max_deposit(deposit_cap: Option<u128>, total_assets: u128) -> u128 {
    match deposit_cap {
        Some(cap) => cap.saturating_sub(total_assets),
        None => u128::MAX,
    }
}

/// Market-aware figures for one holder, computed from a single snapshot.
///
/// `position` is `None` for strategies without a market.
pub struct Limits<'a> {
    pub position: Option<&'a ExternalPosition>,
    pub deposit_cap: Option<u128>,
    pub total_assets: u128,
    /// Part of `total_assets` held in vault custody rather than the market.
    pub custody: u128,
    pub total_supply: u128,
    pub balance: u128,
}

impl Limits<'_> {
    pub fn max_deposit(&self) -> u128 {
        let generic = generic_max_deposit(self.deposit_cap, self.total_assets);
        match self.position {
            Some(position) => deposit_room(position).min(generic),
            None => generic,
        }
    }

    pub fn max_mint(&self) -> u128 {
        let by_assets = to_shares_saturating(
            self.max_deposit(),
            self.total_assets,
            self.total_supply,
            Rounding::Down,
        );
        by_assets.min(u128::MAX - self.total_supply)
    }

    pub fn max_withdraw(&self) -> u128 {
        let owned = to_assets_saturating(
            self.balance,
            self.total_assets,
            self.total_supply,
            Rounding::Down,
        );
        match self.position {
            Some(position) => owned.min(self.liquid_assets(position)),
            None => owned,
        }
    }

    pub fn max_redeem(&self) -> u128 {
        match self.position {
            Some(position) => {
                let liquid_shares = to_shares_saturating(
                    self.liquid_assets(position),
                    self.total_assets,
                    self.total_supply,
                    Rounding::Down,
                );
                self.balance.min(liquid_shares)
            }
            None => self.balance,
        }
    }

    fn liquid_assets(&self, position: &ExternalPosition) -> u128 {
        withdraw_room(position).saturating_add(self.custody)
    }

    pub fn figures(&self) -> CapacityFigures {
        CapacityFigures {
            max_deposit: self.max_deposit(),
            max_mint: self.max_mint(),
            max_withdraw: self.max_withdraw(),
            max_redeem: self.max_redeem(),
        }
    }
}

/// All four limits for one holder. Recomputed per query, never stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CapacityFigures {
    #[schemars(with = "String")]
    #[serde(with = "crate::amount")]
    pub max_deposit: u128,
    #[schemars(with = "String")]
    #[serde(with = "crate::amount")]
    pub max_mint: u128,
    #[schemars(with = "String")]
    #[serde(with = "crate::amount")]
    pub max_withdraw: u128,
    #[schemars(with = "String")]
    #[serde(with = "crate::amount")]
    pub max_redeem: u128,
}

impl CapacityFigures {
    /// Every figure is zero.
    pub const CLOSED: CapacityFigures = CapacityFigures {
        max_deposit: 0,
        max_mint: 0,
        max_withdraw: 0,
        max_redeem: 0,
    };
}
