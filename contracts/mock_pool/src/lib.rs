//! # Mock Lending Pool
//!
//! An in-process stand-in for an Aave-v3-style lending market, used to drive
//! the lending vault in tests.
//!
//! The pool owns the underlying token ledgers as well, so a single value
//! implements both [`AssetLedger`] and [`LendingPool`]. Each reserve keeps:
//!
//! - scaled receipt balances (`amount * RAY / index` at supply time)
//! - a liquidity index that doubles as the normalized income
//! - underlying custody held at the receipt token's address, which is the
//!   reserve's available liquidity
//! - configuration flags and a supply cap in whole tokens
//!
//! Test hooks move the index directly (profit, loss, APR accrual), move
//! liquidity out and back (borrow, repay) and inject short withdrawals.

use std::collections::BTreeMap;

use lending_vault::ledger::{LedgerError, TokenLedger};
use lending_vault::market::{
    ray_div, ray_mul, AssetLedger, LendingPool, MarketError, ReserveConfig, ReserveData, RAY,
};
use lending_vault::vault_standards::mul_div::{checked_mul_div, Rounding};
use lending_vault::Address;
use tracing::{debug, info};

const SECONDS_PER_YEAR: u128 = 365 * 24 * 60 * 60;
pub const ONE_WEEK: u128 = 7 * 24 * 60 * 60;

/// Basis-point denominator for APR inputs.
pub const BPS: u128 = 10_000;

#[derive(Clone, Debug)]
struct Reserve {
    a_token: Address,
    config: ReserveConfig,
    liquidity_index: u128,
    accrued_to_treasury: u128,
    scaled: TokenLedger,
    /// Underlying currently lent out by `borrow`.
    borrowed: u128,
    /// Amount shaved off every withdrawal payout.
    withdraw_shortfall: u128,
    /// Fail every supply regardless of configuration.
    reject_supplies: bool,
}

#[derive(Clone, Debug)]
pub struct MockPool {
    address: Address,
    underlying: BTreeMap<Address, TokenLedger>,
    reserves: BTreeMap<Address, Reserve>,
    receipt_to_asset: BTreeMap<Address, Address>,
}

impl MockPool {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            underlying: BTreeMap::new(),
            reserves: BTreeMap::new(),
            receipt_to_asset: BTreeMap::new(),
        }
    }

    /// Lists `asset` with `a_token` as its receipt token, index at 1.0.
    pub fn add_reserve(&mut self, asset: Address, a_token: Address, config: ReserveConfig) {
        self.reserves.insert(
            asset,
            Reserve {
                a_token,
                config,
                liquidity_index: RAY,
                accrued_to_treasury: 0,
                scaled: TokenLedger::new(),
                borrowed: 0,
                withdraw_shortfall: 0,
                reject_supplies: false,
            },
        );
        self.receipt_to_asset.insert(a_token, asset);
        self.underlying.entry(asset).or_default();
        info!(%asset, %a_token, "reserve_listed");
    }

    /// Builder form of [`MockPool::add_reserve`].
    pub fn with_reserve(mut self, asset: Address, a_token: Address, config: ReserveConfig) -> Self {
        self.add_reserve(asset, a_token, config);
        self
    }

    fn reserve(&self, asset: &Address) -> Result<&Reserve, MarketError> {
        self.reserves
            .get(asset)
            .ok_or(MarketError::ReserveNotFound(*asset))
    }

    fn reserve_mut(&mut self, asset: &Address) -> Result<&mut Reserve, MarketError> {
        self.reserves
            .get_mut(asset)
            .ok_or(MarketError::ReserveNotFound(*asset))
    }

    fn ledger_mut(&mut self, token: &Address) -> &mut TokenLedger {
        self.underlying.entry(*token).or_default()
    }

    // ------------------------------------------------------------------------
    // Underlying token hooks
    // ------------------------------------------------------------------------

    pub fn mint_underlying(
        &mut self,
        token: &Address,
        holder: &Address,
        amount: u128,
    ) -> Result<(), MarketError> {
        self.ledger_mut(token).internal_deposit(holder, amount)?;
        Ok(())
    }

    pub fn burn_underlying(
        &mut self,
        token: &Address,
        holder: &Address,
        amount: u128,
    ) -> Result<(), MarketError> {
        self.ledger_mut(token).internal_withdraw(holder, amount)?;
        Ok(())
    }

    pub fn underlying_total_supply(&self, token: &Address) -> u128 {
        self.underlying
            .get(token)
            .map(TokenLedger::total_supply)
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Reserve views
    // ------------------------------------------------------------------------

    pub fn receipt_token(&self, asset: &Address) -> Option<Address> {
        self.reserves.get(asset).map(|reserve| reserve.a_token)
    }

    pub fn config(&self, asset: &Address) -> Option<ReserveConfig> {
        self.reserves.get(asset).map(|reserve| reserve.config)
    }

    pub fn liquidity_index(&self, asset: &Address) -> u128 {
        self.reserves
            .get(asset)
            .map(|reserve| reserve.liquidity_index)
            .unwrap_or(0)
    }

    /// Underlying held by the receipt token.
    pub fn available_liquidity(&self, asset: &Address) -> u128 {
        self.reserves
            .get(asset)
            .map(|reserve| self.balance_of(asset, &reserve.a_token))
            .unwrap_or(0)
    }

    pub fn borrowed(&self, asset: &Address) -> u128 {
        self.reserves
            .get(asset)
            .map(|reserve| reserve.borrowed)
            .unwrap_or(0)
    }

    /// Rebased receipt balance of `holder`.
    pub fn supplied_balance(&self, asset: &Address, holder: &Address) -> u128 {
        self.reserves
            .get(asset)
            .map(|reserve| {
                ray_mul(
                    reserve.scaled.balance_of(holder),
                    reserve.liquidity_index,
                    Rounding::Down,
                )
            })
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Configuration hooks
    // ------------------------------------------------------------------------

    pub fn set_config(
        &mut self,
        asset: &Address,
        config: ReserveConfig,
    ) -> Result<(), MarketError> {
        self.reserve_mut(asset)?.config = config;
        debug!(%asset, ?config, "reserve_configured");
        Ok(())
    }

    pub fn set_active(&mut self, asset: &Address, active: bool) -> Result<(), MarketError> {
        self.reserve_mut(asset)?.config.active = active;
        Ok(())
    }

    pub fn set_frozen(&mut self, asset: &Address, frozen: bool) -> Result<(), MarketError> {
        self.reserve_mut(asset)?.config.frozen = frozen;
        Ok(())
    }

    pub fn set_paused(&mut self, asset: &Address, paused: bool) -> Result<(), MarketError> {
        self.reserve_mut(asset)?.config.paused = paused;
        Ok(())
    }

    /// Supply cap in whole tokens; zero removes the cap.
    pub fn set_supply_cap(&mut self, asset: &Address, cap_whole: u128) -> Result<(), MarketError> {
        self.reserve_mut(asset)?.config.supply_cap_whole = cap_whole;
        Ok(())
    }

    pub fn set_accrued_to_treasury(
        &mut self,
        asset: &Address,
        scaled: u128,
    ) -> Result<(), MarketError> {
        self.reserve_mut(asset)?.accrued_to_treasury = scaled;
        Ok(())
    }

    /// Every withdrawal pays out `shortfall` less than requested until reset
    /// to zero.
    pub fn set_withdraw_shortfall(
        &mut self,
        asset: &Address,
        shortfall: u128,
    ) -> Result<(), MarketError> {
        self.reserve_mut(asset)?.withdraw_shortfall = shortfall;
        Ok(())
    }

    /// Makes supplies fail with `SupplyCapExceeded` even though the reported
    /// configuration would accept them, as if the cap moved mid-call.
    pub fn set_reject_supplies(
        &mut self,
        asset: &Address,
        reject: bool,
    ) -> Result<(), MarketError> {
        self.reserve_mut(asset)?.reject_supplies = reject;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Index hooks
    // ------------------------------------------------------------------------

    /// Distributes `amount` of interest across all suppliers by raising the
    /// index, and funds the receipt token with the same amount.
    ///
    /// Returns the new index. A reserve without suppliers is left unchanged.
    pub fn recognize_profit(&mut self, asset: &Address, amount: u128) -> Result<u128, MarketError> {
        let reserve = self.reserve(asset)?;
        let scaled_total = reserve.scaled.total_supply();
        let a_token = reserve.a_token;
        if scaled_total == 0 || amount == 0 {
            return Ok(reserve.liquidity_index);
        }
        let delta = checked_mul_div(amount, RAY, scaled_total, Rounding::Down)
            .ok_or(MarketError::InvalidAmount)?;
        self.ledger_mut(asset).internal_deposit(&a_token, amount)?;
        let reserve = self.reserve_mut(asset)?;
        reserve.liquidity_index = reserve.liquidity_index.saturating_add(delta);
        info!(%asset, amount, index = reserve.liquidity_index, "profit_recognized");
        Ok(reserve.liquidity_index)
    }

    /// Writes `amount` off all suppliers by lowering the index, and burns up to
    /// the same amount of the receipt token's underlying.
    ///
    /// The index never drops below one wei of ray.
    pub fn recognize_loss(&mut self, asset: &Address, amount: u128) -> Result<u128, MarketError> {
        let reserve = self.reserve(asset)?;
        let scaled_total = reserve.scaled.total_supply();
        let a_token = reserve.a_token;
        if scaled_total == 0 || amount == 0 {
            return Ok(reserve.liquidity_index);
        }
        let delta = checked_mul_div(amount, RAY, scaled_total, Rounding::Up)
            .ok_or(MarketError::InvalidAmount)?;
        let custody = self.balance_of(asset, &a_token);
        self.ledger_mut(asset)
            .internal_withdraw(&a_token, amount.min(custody))?;
        let reserve = self.reserve_mut(asset)?;
        reserve.liquidity_index = reserve.liquidity_index.saturating_sub(delta).max(1);
        info!(%asset, amount, index = reserve.liquidity_index, "loss_recognized");
        Ok(reserve.liquidity_index)
    }

    /// Accrues simple interest at `apr_bps` over `seconds`, as a time-based
    /// index update would, and funds the receipt token with the interest.
    pub fn advance_index_by_apr(
        &mut self,
        asset: &Address,
        apr_bps: u128,
        seconds: u128,
    ) -> Result<u128, MarketError> {
        let reserve = self.reserve(asset)?;
        let before = ray_mul(
            reserve.scaled.total_supply(),
            reserve.liquidity_index,
            Rounding::Down,
        );
        let rate = checked_mul_div(
            apr_bps.saturating_mul(RAY),
            seconds,
            BPS * SECONDS_PER_YEAR,
            Rounding::Down,
        )
        .ok_or(MarketError::InvalidAmount)?;
        let growth = ray_mul(reserve.liquidity_index, rate, Rounding::Down);
        let new_index = reserve.liquidity_index.saturating_add(growth);
        let after = ray_mul(reserve.scaled.total_supply(), new_index, Rounding::Down);
        let a_token = reserve.a_token;

        self.ledger_mut(asset)
            .internal_deposit(&a_token, after.saturating_sub(before))?;
        self.reserve_mut(asset)?.liquidity_index = new_index;
        info!(%asset, apr_bps, seconds, index = new_index, "index_advanced");
        Ok(new_index)
    }

    // ------------------------------------------------------------------------
    // Liquidity hooks
    // ------------------------------------------------------------------------

    /// Moves `amount` of available liquidity out to `borrower`.
    pub fn borrow(
        &mut self,
        asset: &Address,
        borrower: &Address,
        amount: u128,
    ) -> Result<(), MarketError> {
        let reserve = self.reserve(asset)?;
        let a_token = reserve.a_token;
        let available = self.balance_of(asset, &a_token);
        if amount > available {
            return Err(MarketError::InsufficientLiquidity {
                available,
                requested: amount,
            });
        }
        self.ledger_mut(asset)
            .internal_transfer(&a_token, borrower, amount)?;
        self.reserve_mut(asset)?.borrowed += amount;
        debug!(%asset, %borrower, amount, "liquidity_borrowed");
        Ok(())
    }

    /// Returns up to the outstanding borrowed amount from `borrower`.
    pub fn repay(
        &mut self,
        asset: &Address,
        borrower: &Address,
        amount: u128,
    ) -> Result<u128, MarketError> {
        let reserve = self.reserve(asset)?;
        let a_token = reserve.a_token;
        let repaid = amount.min(reserve.borrowed);
        self.ledger_mut(asset)
            .internal_transfer(borrower, &a_token, repaid)?;
        self.reserve_mut(asset)?.borrowed -= repaid;
        debug!(%asset, %borrower, repaid, "liquidity_repaid");
        Ok(repaid)
    }
}

impl AssetLedger for MockPool {
    fn balance_of(&self, token: &Address, holder: &Address) -> u128 {
        self.underlying
            .get(token)
            .map(|ledger| ledger.balance_of(holder))
            .unwrap_or(0)
    }

    fn transfer(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> Result<(), MarketError> {
        let ledger = self
            .underlying
            .get_mut(token)
            .ok_or(MarketError::UnknownToken(*token))?;
        ledger.internal_transfer(from, to, amount)?;
        Ok(())
    }
}

impl LendingPool for MockPool {
    fn address(&self) -> Address {
        self.address
    }

    fn supply(
        &mut self,
        caller: &Address,
        asset: &Address,
        amount: u128,
        on_behalf_of: &Address,
    ) -> Result<(), MarketError> {
        let reserve = self.reserve(asset)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let config = reserve.config;
        if !config.active {
            return Err(MarketError::ReserveInactive);
        }
        if config.paused {
            return Err(MarketError::ReservePaused);
        }
        if config.frozen {
            return Err(MarketError::ReserveFrozen);
        }
        if reserve.reject_supplies {
            return Err(MarketError::SupplyCapExceeded);
        }
        if config.supply_cap_whole != 0 {
            let used = ray_mul(
                reserve
                    .scaled
                    .total_supply()
                    .saturating_add(reserve.accrued_to_treasury),
                reserve.liquidity_index,
                Rounding::Down,
            );
            if used.saturating_add(amount) > config.supply_cap_assets() {
                return Err(MarketError::SupplyCapExceeded);
            }
        }
        // Dust below one scaled unit is absorbed by the reserve.
        let scaled = ray_div(amount, reserve.liquidity_index, Rounding::Down)
            .ok_or(MarketError::InvalidAmount)?;
        let a_token = reserve.a_token;

        self.ledger_mut(asset).internal_transfer(caller, &a_token, amount)?;
        let minted = self.reserve_mut(asset)?.scaled.internal_deposit(on_behalf_of, scaled);
        if let Err(err) = minted {
            self.ledger_mut(asset).internal_transfer(&a_token, caller, amount)?;
            return Err(err.into());
        }
        debug!(%asset, %on_behalf_of, amount, scaled, "supplied");
        Ok(())
    }

    fn withdraw(
        &mut self,
        caller: &Address,
        asset: &Address,
        amount: u128,
        to: &Address,
    ) -> Result<u128, MarketError> {
        let reserve = self.reserve(asset)?;
        if amount == 0 {
            return Err(MarketError::InvalidAmount);
        }
        let config = reserve.config;
        if !config.active {
            return Err(MarketError::ReserveInactive);
        }
        if config.paused {
            return Err(MarketError::ReservePaused);
        }

        let index = reserve.liquidity_index;
        let scaled_balance = reserve.scaled.balance_of(caller);
        let balance = ray_mul(scaled_balance, index, Rounding::Down);
        let amount = if amount == u128::MAX { balance } else { amount };
        if amount > balance {
            return Err(LedgerError::InsufficientBalance {
                account: *caller,
                balance,
                needed: amount,
            }
            .into());
        }

        let a_token = reserve.a_token;
        let available = self.balance_of(asset, &a_token);
        if amount > available {
            return Err(MarketError::InsufficientLiquidity {
                available,
                requested: amount,
            });
        }

        let paid = amount.saturating_sub(reserve.withdraw_shortfall);
        let burned = ray_div(paid, index, Rounding::Up)
            .ok_or(MarketError::InvalidAmount)?
            .min(scaled_balance);

        self.reserve_mut(asset)?.scaled.internal_withdraw(caller, burned)?;
        self.ledger_mut(asset).internal_transfer(&a_token, to, paid)?;
        debug!(%asset, %to, requested = amount, paid, burned, "withdrawn");
        Ok(paid)
    }

    fn get_reserve_data(&self, asset: &Address) -> Option<ReserveData> {
        self.reserves.get(asset).map(|reserve| ReserveData {
            configuration: reserve.config.encode(),
            liquidity_index: reserve.liquidity_index,
            a_token_address: reserve.a_token,
            accrued_to_treasury: reserve.accrued_to_treasury,
        })
    }

    fn get_reserve_normalized_income(&self, asset: &Address) -> u128 {
        self.liquidity_index(asset)
    }

    fn scaled_balance_of(&self, receipt_token: &Address, holder: &Address) -> u128 {
        self.receipt_to_asset
            .get(receipt_token)
            .and_then(|asset| self.reserves.get(asset))
            .map(|reserve| reserve.scaled.balance_of(holder))
            .unwrap_or(0)
    }

    fn scaled_total_supply(&self, receipt_token: &Address) -> u128 {
        self.receipt_to_asset
            .get(receipt_token)
            .and_then(|asset| self.reserves.get(asset))
            .map(|reserve| reserve.scaled.total_supply())
            .unwrap_or(0)
    }
}
