use tracing::{debug, info, warn};

use crate::capacity::{CapacityFigures, Limits};
use crate::error::{Operation, Result, VaultError};
use crate::market::LendingPool;
use crate::strategy::Strategy;
use crate::vault_standards::conversion::{to_assets, to_shares};
use crate::vault_standards::events::{Skim, VaultDeposit, VaultWithdraw};
use crate::vault_standards::mul_div::Rounding;
use crate::vault_standards::VaultCore;
use crate::{Address, Vault};

impl<M: LendingPool> Vault<M> {
    /// Common entry-point checks, in error-precedence order after the lock.
    fn require_open(&self) -> Result<()> {
        self.require_initialized()?;
        self.require_not_paused()
    }

    fn require_within(operation: Operation, requested: u128, max: u128) -> Result<()> {
        if requested > max {
            return Err(VaultError::CapacityExceeded {
                operation,
                requested,
                max,
            });
        }
        Ok(())
    }

    /// Shares minted by the first deposit can never leave the vault.
    fn require_unlocked_owner(&self, owner: &Address) -> Result<()> {
        if *owner == self.address {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    /// Runs `f` over the market-aware limits for `holder`. Everything is zero
    /// while the vault is paused or uninitialized, or if the reserve is gone.
    fn with_limits<R: Default>(&self, holder: &Address, f: impl FnOnce(&Limits<'_>) -> R) -> R {
        if !self.is_initialized() || self.is_paused {
            return R::default();
        }
        let position = self.position();
        let total_assets = match (&self.strategy, &position) {
            (Strategy::PassthroughCash, _) => self.total_assets(),
            (Strategy::LendingMarket { .. }, Some(position)) => {
                position.balance().saturating_add(self.pending_reinvest())
            }
            (Strategy::LendingMarket { .. }, None) => return R::default(),
        };
        let limits = Limits {
            position: position.as_ref(),
            deposit_cap: self.deposit_cap,
            total_assets,
            custody: self.pending_reinvest(),
            total_supply: self.token.total_supply(),
            balance: self.token.balance_of(holder),
        };
        f(&limits)
    }

    /// All four capacity figures for `owner` from one market snapshot.
    pub fn capacity(&self, owner: &Address) -> CapacityFigures {
        self.with_limits(owner, |limits| limits.figures())
    }

    // ------------------------------------------------------------------------
    // Deposits
    // ------------------------------------------------------------------------

    /// Deposits `assets` from `caller` and mints shares to `receiver`.
    ///
    /// # Returns
    ///
    /// Shares minted, rounded down.
    pub fn deposit(&mut self, caller: &Address, assets: u128, receiver: &Address) -> Result<u128> {
        let _token = self.lock.acquire()?;
        self.require_open()?;
        Self::require_non_null(caller)?;
        Self::require_non_null(receiver)?;
        Self::require_within(Operation::Deposit, assets, self.max_deposit(receiver))?;

        let shares = to_shares(
            assets,
            self.total_assets(),
            self.token.total_supply(),
            Rounding::Down,
        )
        .ok_or(VaultError::MathOverflow)?;
        debug!(assets, shares, "deposit_converted");

        self.internal_deposit(caller, receiver, assets, shares)?;
        Ok(shares)
    }

    /// Mints exactly `shares` to `receiver`, pulling the required assets from
    /// `caller`.
    ///
    /// # Returns
    ///
    /// Assets pulled, rounded up.
    pub fn mint(&mut self, caller: &Address, shares: u128, receiver: &Address) -> Result<u128> {
        let _token = self.lock.acquire()?;
        self.require_open()?;
        Self::require_non_null(caller)?;
        Self::require_non_null(receiver)?;
        Self::require_within(Operation::Mint, shares, self.max_mint(receiver))?;

        let assets = to_assets(
            shares,
            self.total_assets(),
            self.token.total_supply(),
            Rounding::Up,
        )
        .ok_or(VaultError::MathOverflow)?;
        debug!(shares, assets, "mint_converted");

        self.internal_deposit(caller, receiver, assets, shares)?;
        Ok(assets)
    }

    /// Pull, mint, invest. A failed invest burns the shares and returns the
    /// assets before the error is surfaced.
    fn internal_deposit(
        &mut self,
        caller: &Address,
        receiver: &Address,
        assets: u128,
        shares: u128,
    ) -> Result<()> {
        let vault = self.address;
        let asset = self.asset;

        self.market.transfer(&asset, caller, &vault, assets)?;

        if let Err(err) = self.token.internal_deposit(receiver, shares) {
            self.refund(caller, assets);
            return Err(err.into());
        }

        if let Err(err) = self.strategy.invest(&mut self.market, &vault, &asset, assets) {
            warn!(
                %receiver,
                assets,
                shares,
                error = %err,
                "deposit_invest_failed, rolling back"
            );
            if let Err(burn) = self.token.internal_withdraw(receiver, shares) {
                warn!(error = %burn, "deposit_rollback_burn_failed");
            }
            self.refund(caller, assets);
            return Err(err);
        }

        VaultDeposit {
            sender: caller,
            owner: receiver,
            assets,
            shares,
        }
        .emit(&mut self.events);
        info!(sender = %caller, owner = %receiver, assets, shares, "vault_deposit");
        Ok(())
    }

    fn refund(&mut self, to: &Address, assets: u128) {
        let vault = self.address;
        let asset = self.asset;
        if let Err(err) = self.market.transfer(&asset, &vault, to, assets) {
            warn!(%to, assets, error = %err, "deposit_refund_failed");
        }
    }

    // ------------------------------------------------------------------------
    // Withdrawals
    // ------------------------------------------------------------------------

    /// Burns shares from `owner` and sends exactly `assets` to `receiver`.
    ///
    /// # Returns
    ///
    /// Shares burned, rounded up.
    pub fn withdraw(
        &mut self,
        caller: &Address,
        assets: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128> {
        let _token = self.lock.acquire()?;
        self.require_open()?;
        Self::require_non_null(caller)?;
        Self::require_non_null(receiver)?;
        Self::require_non_null(owner)?;
        self.require_unlocked_owner(owner)?;
        Self::require_within(Operation::Withdraw, assets, self.max_withdraw(owner))?;

        let shares = to_shares(
            assets,
            self.total_assets(),
            self.token.total_supply(),
            Rounding::Up,
        )
        .ok_or(VaultError::MathOverflow)?;
        debug!(assets, shares, "withdraw_converted");

        self.internal_withdraw(caller, receiver, owner, assets, shares)?;
        Ok(shares)
    }

    /// Burns exactly `shares` from `owner` and sends the assets to `receiver`.
    ///
    /// # Returns
    ///
    /// Assets paid out, rounded down.
    pub fn redeem(
        &mut self,
        caller: &Address,
        shares: u128,
        receiver: &Address,
        owner: &Address,
    ) -> Result<u128> {
        let _token = self.lock.acquire()?;
        self.require_open()?;
        Self::require_non_null(caller)?;
        Self::require_non_null(receiver)?;
        Self::require_non_null(owner)?;
        self.require_unlocked_owner(owner)?;
        Self::require_within(Operation::Redeem, shares, self.max_redeem(owner))?;

        let assets = to_assets(
            shares,
            self.total_assets(),
            self.token.total_supply(),
            Rounding::Down,
        )
        .ok_or(VaultError::MathOverflow)?;
        debug!(shares, assets, "redeem_converted");

        self.internal_withdraw(caller, receiver, owner, assets, shares)?;
        Ok(assets)
    }

    /// Divest, pay out, then spend allowance and burn. Every check that can
    /// fail on the share side runs before the market is touched.
    ///
    /// Pending custody pays out first; only the remainder is divested.
    fn internal_withdraw(
        &mut self,
        caller: &Address,
        receiver: &Address,
        owner: &Address,
        assets: u128,
        shares: u128,
    ) -> Result<()> {
        if caller != owner {
            let allowance = self.token.allowance(owner, caller);
            if allowance < shares {
                return Err(VaultError::InsufficientAllowance {
                    allowance,
                    needed: shares,
                });
            }
        }
        let balance = self.token.balance_of(owner);
        if balance < shares {
            return Err(crate::ledger::LedgerError::InsufficientBalance {
                account: *owner,
                balance,
                needed: shares,
            }
            .into());
        }

        let vault = self.address;
        let asset = self.asset;

        let from_custody = assets.min(self.pending_reinvest());
        let from_market = assets - from_custody;

        if let Err(err) = self
            .strategy
            .divest(&mut self.market, &vault, &asset, from_market)
        {
            if let VaultError::MarketDivestFailure { returned, .. } = err {
                self.strand(returned);
            }
            return Err(err);
        }

        if let Err(err) = self.market.transfer(&asset, &vault, receiver, assets) {
            warn!(%receiver, assets, error = %err, "withdraw_payout_failed");
            self.strand(from_market);
            return Err(err.into());
        }
        self.pending_reinvest = self.pending_reinvest.saturating_sub(from_custody);

        self.token.spend_allowance(owner, caller, shares)?;
        self.token.internal_withdraw(owner, shares)?;

        VaultWithdraw {
            sender: caller,
            receiver,
            owner,
            assets,
            shares,
        }
        .emit(&mut self.events);
        info!(
            sender = %caller,
            %receiver,
            %owner,
            assets,
            shares,
            "vault_withdraw"
        );
        Ok(())
    }

    /// Keeps underlying that left the market without being paid out in
    /// `total_assets`, so a failed withdrawal cannot move the share price.
    fn strand(&mut self, assets: u128) {
        if self.strategy.pool().is_none() || assets == 0 {
            return;
        }
        self.pending_reinvest = self.pending_reinvest.saturating_add(assets);
        warn!(assets, pending = self.pending_reinvest, "withdraw_assets_stranded");
    }

    // ------------------------------------------------------------------------
    // Skim
    // ------------------------------------------------------------------------

    /// Sweeps idle custody (pending re-investment first, then donations and
    /// dust) into the strategy, clamped to what the market will accept.
    /// Allowed while paused.
    ///
    /// # Returns
    ///
    /// Assets swept. Zero is a successful no-op.
    pub fn skim(&mut self, caller: &Address) -> Result<u128> {
        let _token = self.lock.acquire()?;
        self.require_initialized()?;

        let Some(position) = self.position() else {
            debug!(%caller, "skim_no_market_position");
            return Ok(0);
        };
        let idle = self.idle_assets();
        let swept = idle.min(crate::capacity::deposit_room(&position));
        if swept == 0 {
            debug!(%caller, idle, "skim_nothing_to_sweep");
            return Ok(0);
        }

        let vault = self.address;
        let asset = self.asset;
        self.strategy
            .invest(&mut self.market, &vault, &asset, swept)?;
        self.pending_reinvest = self.pending_reinvest.saturating_sub(swept);

        Skim {
            caller,
            assets: swept,
        }
        .emit(&mut self.events);
        info!(%caller, idle, swept, "vault_skim");
        Ok(swept)
    }

    // ------------------------------------------------------------------------
    // Share token
    // ------------------------------------------------------------------------

    /// Moves `shares` from `caller` to `receiver`.
    pub fn transfer(&mut self, caller: &Address, receiver: &Address, shares: u128) -> Result<()> {
        let _token = self.lock.acquire()?;
        self.require_initialized()?;
        Self::require_non_null(caller)?;
        Self::require_non_null(receiver)?;
        self.require_unlocked_owner(caller)?;
        self.token.internal_transfer(caller, receiver, shares)?;
        debug!(sender = %caller, %receiver, shares, "share_transfer");
        Ok(())
    }

    /// Lets `spender` withdraw or redeem up to `shares` of `caller`'s
    /// position. `u128::MAX` never decreases.
    pub fn approve(&mut self, caller: &Address, spender: &Address, shares: u128) -> Result<()> {
        let _token = self.lock.acquire()?;
        self.require_initialized()?;
        Self::require_non_null(caller)?;
        Self::require_non_null(spender)?;
        self.token.approve(caller, spender, shares);
        debug!(owner = %caller, %spender, shares, "share_approve");
        Ok(())
    }
}

impl<M: LendingPool> VaultCore for Vault<M> {
    fn asset(&self) -> Address {
        self.asset
    }

    /// LendingMarket: the rebasing receipt balance, rounded down, plus any
    /// pending re-investment.
    /// PassthroughCash: the vault's own asset balance.
    fn total_assets(&self) -> u128 {
        if !self.is_initialized() {
            return 0;
        }
        self.strategy
            .total_assets(&self.market, &self.address, &self.asset)
            .saturating_add(self.pending_reinvest())
    }

    fn total_supply(&self) -> u128 {
        self.token.total_supply()
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.token.balance_of(owner)
    }

    fn max_deposit(&self, receiver: &Address) -> u128 {
        self.with_limits(receiver, |limits| limits.max_deposit())
    }

    fn max_mint(&self, receiver: &Address) -> u128 {
        self.with_limits(receiver, |limits| limits.max_mint())
    }

    fn max_withdraw(&self, owner: &Address) -> u128 {
        self.with_limits(owner, |limits| limits.max_withdraw())
    }

    fn max_redeem(&self, owner: &Address) -> u128 {
        self.with_limits(owner, |limits| limits.max_redeem())
    }
}
