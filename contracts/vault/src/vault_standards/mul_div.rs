//! # Safe Multiplication and Division
//!
//! Provides overflow-safe multiplication and division operations using
//! 256-bit intermediate arithmetic. This is essential for share/asset
//! conversions and ray math where a naive `u128` product could overflow.
//!
//! ## Rounding Modes
//!
//! - `Down`: Round towards zero (floor)
//! - `Up`: Round away from zero (ceiling)
//!
//! The rounding mode affects financial calculations:
//! - Use `Down` when calculating shares to mint or assets to pay out (favor vault)
//! - Use `Up` when calculating shares to burn or assets to pull in (favor vault)

use super::core::U256;

/// Rounding direction for division operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// Round towards zero (floor division).
    Down,
    /// Round away from zero (ceiling division).
    Up,
}

/// Performs `(x * y) / denominator` with configurable rounding in 256 bits.
///
/// Returns `None` when `denominator` is zero or the result does not fit in
/// a `u128`.
///
/// # Example
///
/// ```
/// use lending_vault::vault_standards::mul_div::{checked_mul_div, Rounding};
///
/// // shares = (assets * supply) / total_assets, rounded down
/// assert_eq!(checked_mul_div(100_000, 1_000_000, 500_000, Rounding::Down), Some(200_000));
/// assert_eq!(checked_mul_div(100, 1, 3, Rounding::Up), Some(34));
/// ```
pub fn checked_mul_div(x: u128, y: u128, denominator: u128, rounding: Rounding) -> Option<u128> {
    if denominator == 0 {
        return None;
    }

    let numerator = U256::from(x) * U256::from(y);
    let denominator = U256::from(denominator);
    let mut result = numerator / denominator;

    if rounding == Rounding::Up && !(numerator % denominator).is_zero() {
        result += U256::one();
    }

    if result > U256::from(u128::MAX) {
        return None;
    }
    Some(result.as_u128())
}

/// Like [`checked_mul_div`], but clamps an oversized result to `u128::MAX`.
///
/// A zero denominator yields zero. Used by capacity queries, which must
/// never fail.
pub fn saturating_mul_div(x: u128, y: u128, denominator: u128, rounding: Rounding) -> u128 {
    if denominator == 0 {
        return 0;
    }
    checked_mul_div(x, y, denominator, rounding).unwrap_or(u128::MAX)
}
