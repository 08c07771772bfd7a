use uint::construct_uint;

use super::conversion::{to_assets_saturating, to_shares_saturating};
use super::mul_div::Rounding;
use crate::Address;

construct_uint! {
    pub struct U256(4);
}

/// Tokenized vault surface: valuation, conversion, previews and capacity.
///
/// Implementors supply the four accounting reads; every other method has a
/// default built on the virtual-offset conversion. The capacity defaults are
/// the generic, market-unaware limits and are overridden where an external
/// market constrains deposits or withdrawals.
pub trait VaultCore {
    fn asset(&self) -> Address;
    fn total_assets(&self) -> u128;
    fn total_supply(&self) -> u128;
    fn balance_of(&self, owner: &Address) -> u128;

    fn convert_to_shares(&self, assets: u128) -> u128 {
        to_shares_saturating(
            assets,
            self.total_assets(),
            self.total_supply(),
            Rounding::Down,
        )
    }

    fn convert_to_assets(&self, shares: u128) -> u128 {
        to_assets_saturating(
            shares,
            self.total_assets(),
            self.total_supply(),
            Rounding::Down,
        )
    }

    fn max_deposit(&self, _receiver: &Address) -> u128 {
        u128::MAX
    }

    fn preview_deposit(&self, assets: u128) -> u128 {
        self.convert_to_shares(assets)
    }

    fn max_mint(&self, _receiver: &Address) -> u128 {
        u128::MAX - self.total_supply()
    }

    fn preview_mint(&self, shares: u128) -> u128 {
        to_assets_saturating(
            shares,
            self.total_assets(),
            self.total_supply(),
            Rounding::Up,
        )
    }

    fn max_withdraw(&self, owner: &Address) -> u128 {
        self.convert_to_assets(self.balance_of(owner))
    }

    fn preview_withdraw(&self, assets: u128) -> u128 {
        to_shares_saturating(
            assets,
            self.total_assets(),
            self.total_supply(),
            Rounding::Up,
        )
    }

    fn max_redeem(&self, owner: &Address) -> u128 {
        self.balance_of(owner)
    }

    fn preview_redeem(&self, shares: u128) -> u128 {
        self.convert_to_assets(shares)
    }
}
