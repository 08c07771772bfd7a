//! # Share/Asset Conversion
//!
//! Pure conversion math between asset amounts and share amounts given the
//! current total assets and total share supply.
//!
//! Both sides carry a virtual offset of one unit:
//!
//! ```text
//! shares = assets * (total_shares + 1) / (total_assets + 1)
//! assets = shares * (total_assets + 1) / (total_shares + 1)
//! ```
//!
//! An empty vault therefore converts 1:1, the denominator is never zero, and a
//! donation to an empty vault cannot inflate the price of the first real
//! deposit.
//!
//! ## Rounding per call site
//!
//! | Operation | Input  | Output | Rounding |
//! |-----------|--------|--------|----------|
//! | deposit   | assets | shares | Down     |
//! | mint      | shares | assets | Up       |
//! | withdraw  | assets | shares | Up       |
//! | redeem    | shares | assets | Down     |

use super::mul_div::{checked_mul_div, saturating_mul_div, Rounding};

/// Virtual units added to both sides of the exchange rate.
pub const VIRTUAL_OFFSET: u128 = 1;

/// Converts `assets` to shares. Returns `None` if the result overflows.
pub fn to_shares(
    assets: u128,
    total_assets: u128,
    total_shares: u128,
    rounding: Rounding,
) -> Option<u128> {
    checked_mul_div(
        assets,
        total_shares.checked_add(VIRTUAL_OFFSET)?,
        total_assets.checked_add(VIRTUAL_OFFSET)?,
        rounding,
    )
}

/// Converts `shares` to assets. Returns `None` if the result overflows.
pub fn to_assets(
    shares: u128,
    total_assets: u128,
    total_shares: u128,
    rounding: Rounding,
) -> Option<u128> {
    checked_mul_div(
        shares,
        total_assets.checked_add(VIRTUAL_OFFSET)?,
        total_shares.checked_add(VIRTUAL_OFFSET)?,
        rounding,
    )
}

/// Saturating form of [`to_shares`] for revert-free capacity queries.
pub fn to_shares_saturating(
    assets: u128,
    total_assets: u128,
    total_shares: u128,
    rounding: Rounding,
) -> u128 {
    saturating_mul_div(
        assets,
        total_shares.saturating_add(VIRTUAL_OFFSET),
        total_assets.saturating_add(VIRTUAL_OFFSET),
        rounding,
    )
}

/// Saturating form of [`to_assets`] for revert-free capacity queries.
pub fn to_assets_saturating(
    shares: u128,
    total_assets: u128,
    total_shares: u128,
    rounding: Rounding,
) -> u128 {
    saturating_mul_div(
        shares,
        total_assets.saturating_add(VIRTUAL_OFFSET),
        total_shares.saturating_add(VIRTUAL_OFFSET),
        rounding,
    )
}
