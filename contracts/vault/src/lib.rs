//! # Lending Vault
//!
//! A single-asset tokenized vault that issues proportional shares and deploys
//! deposits into an Aave-v3-style lending market.
//!
//! - **Conversion**: virtual-offset share/asset math with per-operation rounding
//! - **Valuation**: total assets read fresh from the rebasing market position
//! - **Capacity**: `max_*` limits that track reserve flags, supply caps and
//!   available liquidity
//! - **State machine**: one-time initialization with a locked first deposit,
//!   pause gating and a reentrancy lock around every mutating entry point
//!
//! ## Architecture
//!
//! - [`vault_standards`]: conversion math, the [`VaultCore`] trait and events
//! - [`capacity`]: revert-free limit computation
//! - [`strategy`]: where assets live (cash or lending market)
//! - [`market`]: collaborator traits and the reserve/position views
//! - [`ledger`]: fungible balances and allowances for the share token
//! - [`access`]: the injected authorizer for privileged calls
//! - [`config`]: serializable vault settings and initialization parameters
//!
//! Deposit, withdrawal and share-transfer entry points live in the `vault`
//! module as further `impl` blocks on [`Vault`].

use tracing::info;

pub mod access;
pub mod address;
mod amount;
pub mod capacity;
pub mod config;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod market;
pub mod strategy;
mod vault;
pub mod vault_standards;


pub use address::Address;
pub use capacity::CapacityFigures;
pub use config::{InitParams, ShareMetadata, StrategyConfig, VaultConfig};
pub use error::{Result, VaultError};
pub use vault_standards::VaultCore;

use access::{Action, Authorizer};
use guard::ReentrancyLock;
use ledger::TokenLedger;
use market::{ExternalPosition, LendingPool};
use strategy::Strategy;
use vault_standards::conversion::to_shares;
use vault_standards::events::{EventLog, PoolSet, ReceiptTokenSet, StatusChanged, VaultDeposit};
use vault_standards::Rounding;

/// Lifecycle of a vault. `initialize` is the only transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initialized,
}

/// Vault state bound to its lending-market collaborator.
///
/// The market also carries the underlying token ledger, so every asset
/// movement and every valuation goes through `M`.
pub struct Vault<M: LendingPool> {
    /// The vault's own identity on the asset ledger and in the market.
    address: Address,
    market: M,
    lifecycle: Lifecycle,
    /// Whether deposits and withdrawals are blocked.
    is_paused: bool,
    /// The underlying asset.
    asset: Address,
    metadata: ShareMetadata,
    /// The share token.
    token: TokenLedger,
    strategy: Strategy,
    authorizer: Option<Box<dyn Authorizer>>,
    /// Shares minted by the first deposit, held by the vault itself.
    first_deposit_floor: u128,
    /// Vault-level ceiling on total assets.
    deposit_cap: Option<u128>,
    /// Underlying that came back from the market on a failed withdrawal.
    /// Held in custody and counted in `total_assets` until skimmed back in.
    pending_reinvest: u128,
    lock: ReentrancyLock,
    events: EventLog,
}

impl<M: LendingPool> Vault<M> {
    /// Creates an uninitialized vault at `address`.
    pub fn new(address: Address, market: M) -> Self {
        Self {
            address,
            market,
            lifecycle: Lifecycle::Uninitialized,
            is_paused: false,
            asset: Address::ZERO,
            metadata: ShareMetadata::default(),
            token: TokenLedger::new(),
            strategy: Strategy::PassthroughCash,
            authorizer: None,
            first_deposit_floor: 0,
            deposit_cap: None,
            pending_reinvest: 0,
            lock: ReentrancyLock::new(),
            events: EventLog::default(),
        }
    }

    /// One-time setup: binds the asset and strategy, installs the authorizer
    /// and performs the mandatory first deposit.
    ///
    /// The first deposit is pulled from `params.funding_account` and its shares
    /// are minted to the vault's own address, where they stay.
    ///
    /// # Returns
    ///
    /// The number of shares minted by the first deposit.
    ///
    /// # Errors
    ///
    /// * `AlreadyInitialized` on a second call
    /// * `NullAddress` if the asset, pool or funding account is zero
    /// * `ZeroAmount` if the first deposit is zero
    /// * `PoolMismatch` if the configured pool is not the vault's market
    /// * `InvalidAsset` if the market has no receipt token for the asset
    /// * `CapacityExceeded` if the first deposit is above the deposit cap
    pub fn initialize(&mut self, caller: &Address, params: InitParams) -> Result<u128> {
        let _token = self.lock.acquire()?;
        if self.lifecycle == Lifecycle::Initialized {
            return Err(VaultError::AlreadyInitialized);
        }
        let asset = params.underlying_asset;
        Self::require_non_null(&asset)?;
        Self::require_non_null(&params.funding_account)?;
        if params.first_deposit_amount == 0 {
            return Err(VaultError::ZeroAmount);
        }

        let strategy = match params.strategy {
            StrategyConfig::PassthroughCash => Strategy::PassthroughCash,
            StrategyConfig::LendingMarket { pool } => {
                Self::require_non_null(&pool)?;
                let market = self.market.address();
                if pool != market {
                    return Err(VaultError::PoolMismatch {
                        configured: pool,
                        market,
                    });
                }
                let receipt_token = self
                    .market
                    .get_reserve_data(&asset)
                    .map(|reserve| reserve.a_token_address)
                    .filter(|token| !token.is_zero())
                    .ok_or(VaultError::InvalidAsset)?;
                Strategy::LendingMarket {
                    pool,
                    receipt_token,
                }
            }
        };

        let amount = params.first_deposit_amount;
        if let Some(cap) = params.deposit_cap {
            if amount > cap {
                return Err(VaultError::CapacityExceeded {
                    operation: error::Operation::Deposit,
                    requested: amount,
                    max: cap,
                });
            }
        }

        // Assets already sitting in custody count toward the opening rate.
        let opening_assets = strategy.total_assets(&self.market, &self.address, &asset);
        let shares =
            to_shares(amount, opening_assets, 0, Rounding::Down).ok_or(VaultError::MathOverflow)?;
        if shares == 0 {
            return Err(VaultError::ZeroAmount);
        }

        self.market
            .transfer(&asset, &params.funding_account, &self.address, amount)?;
        if let Err(err) = strategy.invest(&mut self.market, &self.address, &asset, amount) {
            tracing::warn!(error = %err, "initialize_invest_failed, returning first deposit");
            if let Err(refund) =
                self.market
                    .transfer(&asset, &self.address, &params.funding_account, amount)
            {
                tracing::warn!(error = %refund, "initialize_refund_failed");
            }
            return Err(err);
        }
        self.token.internal_deposit(&self.address, shares)?;

        self.lifecycle = Lifecycle::Initialized;
        self.asset = asset;
        self.metadata = params.metadata;
        self.strategy = strategy;
        self.authorizer = Some(params.authorizer);
        self.first_deposit_floor = shares;
        self.deposit_cap = params.deposit_cap;

        if let Strategy::LendingMarket {
            pool,
            receipt_token,
        } = &self.strategy
        {
            PoolSet { pool }.emit(&mut self.events);
            ReceiptTokenSet { receipt_token }.emit(&mut self.events);
        }
        VaultDeposit {
            sender: &params.funding_account,
            owner: &self.address,
            assets: amount,
            shares,
        }
        .emit(&mut self.events);

        info!(
            %caller,
            vault = %self.address,
            asset = %self.asset,
            first_deposit = amount,
            shares,
            "vault_initialized"
        );
        Ok(shares)
    }

    /// Fails with `NotInitialized` before `initialize` has succeeded.
    pub fn require_initialized(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Initialized => Ok(()),
            Lifecycle::Uninitialized => Err(VaultError::NotInitialized),
        }
    }

    /// Fails with `Paused` while the vault is paused.
    pub fn require_not_paused(&self) -> Result<()> {
        if self.is_paused {
            return Err(VaultError::Paused);
        }
        Ok(())
    }

    pub fn require_non_null(account: &Address) -> Result<()> {
        if account.is_zero() {
            return Err(VaultError::NullAddress);
        }
        Ok(())
    }

    fn require_authorized(&self, caller: &Address, action: Action) -> Result<()> {
        let allowed = self
            .authorizer
            .as_ref()
            .is_some_and(|authorizer| authorizer.is_authorized(caller, action));
        if !allowed {
            return Err(VaultError::Unauthorized);
        }
        Ok(())
    }

    /// Blocks deposits, mints, withdrawals and redemptions. Skims and views
    /// keep working.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless the authorizer grants [`Action::Pause`].
    pub fn pause(&mut self, caller: &Address) -> Result<()> {
        let _token = self.lock.acquire()?;
        self.require_initialized()?;
        self.require_authorized(caller, Action::Pause)?;
        self.is_paused = true;
        StatusChanged { caller }.emit_paused(&mut self.events);
        info!(%caller, "vault_paused");
        Ok(())
    }

    /// Lifts a pause.
    ///
    /// # Errors
    ///
    /// `Unauthorized` unless the authorizer grants [`Action::Unpause`].
    pub fn unpause(&mut self, caller: &Address) -> Result<()> {
        let _token = self.lock.acquire()?;
        self.require_initialized()?;
        self.require_authorized(caller, Action::Unpause)?;
        self.is_paused = false;
        StatusChanged { caller }.emit_unpaused(&mut self.events);
        info!(%caller, "vault_unpaused");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    /// Mutable access to the market collaborator, for driving market state
    /// between vault calls.
    pub fn market_mut(&mut self) -> &mut M {
        &mut self.market
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Initialized
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn metadata(&self) -> &ShareMetadata {
        &self.metadata
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn pool(&self) -> Option<Address> {
        self.strategy.pool()
    }

    pub fn receipt_token(&self) -> Option<Address> {
        self.strategy.receipt_token()
    }

    pub fn deposit_cap(&self) -> Option<u128> {
        self.deposit_cap
    }

    /// Shares locked in the vault by the first deposit.
    pub fn first_deposit_floor(&self) -> u128 {
        self.first_deposit_floor
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.token.allowance(owner, spender)
    }

    /// Share holders with a non-zero balance, in address order.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.token.holders()
    }

    /// Underlying in the vault's own custody, outside the strategy.
    pub fn idle_assets(&self) -> u128 {
        self.strategy
            .idle_balance(&self.market, &self.address, &self.asset)
    }

    /// Custody owed back to the market after a failed withdrawal. Never more
    /// than the idle balance.
    pub fn pending_reinvest(&self) -> u128 {
        self.pending_reinvest.min(self.idle_assets())
    }

    /// Fresh snapshot of the vault's market position, if it has one.
    pub fn position(&self) -> Option<ExternalPosition> {
        self.strategy
            .position(&self.market, &self.address, &self.asset)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Handle on the reentrancy lock, shared with the vault.
    pub fn lock(&self) -> &ReentrancyLock {
        &self.lock
    }
}
