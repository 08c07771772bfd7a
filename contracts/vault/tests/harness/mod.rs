//! # Invariant Harness
//!
//! Drives a vault through seeded random action sequences and checks the
//! accounting properties after every step.
//!
//! ## Properties
//!
//! - `total_supply` equals the sum of balances and the modelled supply
//! - `total_assets >= Σ convert_to_assets(balance)` over all holders
//! - Previews equal executed results
//! - Profit strictly raises `total_assets`, loss strictly lowers it, and
//!   neither touches `total_supply`
//! - A deposit-then-redeem round trip never returns more than it put in
//! - `max_deposit == 0` on an open vault means `deposit(1)` is rejected
//! - While paused every `max_*` is 0 and value-moving calls fail with `Paused`
//!
//! ## Configuration
//!
//! | Variable | Default |
//! |----------|---------|
//! | `VAULT_FUZZ_SEED` | `0x5eed` |
//! | `VAULT_FUZZ_RUNS` | `8` |
//! | `VAULT_FUZZ_STEPS` | `150` |
//! | `VAULT_FUZZ_HOLDERS` | `3` |

#![allow(dead_code)]

pub mod model;

use std::fmt;

use lending_vault::error::Operation;
use lending_vault::{Address, CapacityFigures, VaultCore, VaultError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

use crate::helpers::*;
use actions::{Action, Bounds, HolderBounds};
use model::LedgerModel;

const HOLDER_FUNDING: u128 = 1_000 * ONE_USDC;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    pub seed: u64,
    pub runs: u32,
    pub steps: u32,
    pub holders: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            runs: 8,
            steps: 150,
            holders: 3,
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by any `VAULT_FUZZ_*` variable that parses.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            seed: env_or("VAULT_FUZZ_SEED", defaults.seed),
            runs: env_or("VAULT_FUZZ_RUNS", defaults.runs),
            steps: env_or("VAULT_FUZZ_STEPS", defaults.steps),
            holders: env_or("VAULT_FUZZ_HOLDERS", defaults.holders).max(1),
        }
    }

    /// Seed of the `run`-th sequence.
    pub fn seed_for(&self, run: u32) -> u64 {
        self.seed.wrapping_add(u64::from(run))
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    LendingMarket,
    PassthroughCash,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone)]
pub struct Violation {
    pub seed: u64,
    pub step: u32,
    pub action: Option<Action>,
    pub message: String,
    pub trace: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "invariant violated (seed {:#x}, step {})", self.seed, self.step)?;
        writeln!(f, "  action:  {:?}", self.action)?;
        writeln!(f, "  message: {}", self.message)?;
        write!(f, "  trace:   {}", self.trace)
    }
}

impl std::error::Error for Violation {}

/// Outcome of one clean run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub seed: u64,
    pub mode: Mode,
    pub trace: Vec<Action>,
    pub total_assets: u128,
    pub total_supply: u128,
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    seed: u64,
    mode: Mode,
    vault: TestVault,
    holders: Vec<Address>,
    borrower: Address,
    model: LedgerModel,
    rng: StdRng,
    trace: Vec<Action>,
}

/// Runs `config.runs` sequences from consecutive seeds.
pub fn run_all(config: &HarnessConfig, mode: Mode) -> Result<Vec<Report>, Violation> {
    (0..config.runs)
        .map(|run| Harness::new(config.seed_for(run), config.holders, mode)?.run(config.steps))
        .collect()
}

impl Harness {
    pub fn new(seed: u64, holders: usize, mode: Mode) -> Result<Self, Violation> {
        let setup = |err: Box<dyn std::error::Error>| Violation {
            seed,
            step: 0,
            action: None,
            message: format!("setup failed: {err}"),
            trace: "[]".to_string(),
        };

        let mut vault = match mode {
            Mode::LendingMarket => deploy_lending_vault(lending_pool(), FIRST_DEPOSIT, None),
            Mode::PassthroughCash => deploy_passthrough_vault(FIRST_DEPOSIT),
        }
        .map_err(setup)?;

        let holders: Vec<Address> = (0..holders)
            .map(|i| account(&format!("holder-{i}")))
            .collect();
        for holder in &holders {
            fund(&mut vault, holder, HOLDER_FUNDING).map_err(setup)?;
        }

        let mut model = LedgerModel::default();
        model.mint(&vault_address(), FIRST_DEPOSIT);

        Ok(Self {
            seed,
            mode,
            vault,
            holders,
            borrower: account("borrower"),
            model,
            rng: StdRng::seed_from_u64(seed),
            trace: Vec::new(),
        })
    }

    pub fn run(mut self, steps: u32) -> Result<Report, Violation> {
        for step in 0..steps {
            let bounds = self.bounds();
            let action = Action::generate(&mut self.rng, &bounds);
            debug!(seed = self.seed, step, ?action, "harness_step");
            self.trace.push(action.clone());

            self.apply(&action)
                .and_then(|()| self.check())
                .map_err(|message| self.violation(step, Some(action), message))?;
        }
        Ok(Report {
            seed: self.seed,
            mode: self.mode,
            trace: self.trace,
            total_assets: self.vault.total_assets(),
            total_supply: self.vault.total_supply(),
        })
    }

    fn violation(&self, step: u32, action: Option<Action>, message: String) -> Violation {
        Violation {
            seed: self.seed,
            step,
            action,
            message,
            trace: serde_json::to_string(&self.trace).unwrap_or_default(),
        }
    }

    fn bounds(&self) -> Bounds {
        let holders = self
            .holders
            .iter()
            .map(|holder| {
                let usdc = usdc_balance(&self.vault, holder);
                HolderBounds {
                    usdc,
                    shares: self.vault.balance_of(holder),
                    max_deposit: self.vault.max_deposit(holder),
                    max_mint: self.vault.max_mint(holder),
                    max_withdraw: self.vault.max_withdraw(holder),
                    max_redeem: self.vault.max_redeem(holder),
                    affordable_shares: self.vault.preview_deposit(usdc),
                }
            })
            .collect();
        let pool = self.vault.market();
        Bounds {
            holders,
            total_assets: self.vault.total_assets(),
            available_liquidity: pool.available_liquidity(&usdc()),
            borrowed: pool.borrowed(&usdc()),
            supplied_whole: self.vault.total_assets() / ONE_USDC,
        }
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    fn apply(&mut self, action: &Action) -> Result<(), String> {
        let paused = self.vault.is_paused();
        match *action {
            Action::Deposit { holder, assets } => {
                let who = self.holders[holder];
                let preview = self.vault.preview_deposit(assets);
                let result = self.vault.deposit(&who, assets, &who);
                if let Some(shares) = expect_gated(paused, result)? {
                    same("deposit preview", preview, shares)?;
                    self.model.mint(&who, shares);
                }
            }
            Action::Mint { holder, shares } => {
                let who = self.holders[holder];
                let preview = self.vault.preview_mint(shares);
                let result = self.vault.mint(&who, shares, &who);
                if let Some(assets) = expect_gated(paused, result)? {
                    same("mint preview", preview, assets)?;
                    self.model.mint(&who, shares);
                }
            }
            Action::Withdraw { holder, assets } => {
                let who = self.holders[holder];
                let preview = self.vault.preview_withdraw(assets);
                let result = self.vault.withdraw(&who, assets, &who, &who);
                if let Some(shares) = expect_gated(paused, result)? {
                    same("withdraw preview", preview, shares)?;
                    self.model.burn(&who, shares);
                }
            }
            Action::Redeem { holder, shares } => {
                let who = self.holders[holder];
                let preview = self.vault.preview_redeem(shares);
                let result = self.vault.redeem(&who, shares, &who, &who);
                if let Some(assets) = expect_gated(paused, result)? {
                    same("redeem preview", preview, assets)?;
                    self.model.burn(&who, shares);
                }
            }
            Action::Skim => {
                let supply = self.vault.total_supply();
                let keeper = self.holders[0];
                self.vault
                    .skim(&keeper)
                    .map_err(|err| format!("skim failed: {err}"))?;
                same("supply after skim", supply, self.vault.total_supply())?;
            }
            Action::RecognizeProfit { amount } => self.recognize(amount, true)?,
            Action::RecognizeLoss { amount } => self.recognize(amount, false)?,
            Action::RoundTrip { holder, assets } => self.round_trip(holder, assets, paused)?,
            Action::Transfer { from, to, shares } => {
                let (sender, receiver) = (self.holders[from], self.holders[to]);
                self.vault
                    .transfer(&sender, &receiver, shares)
                    .map_err(|err| format!("transfer failed: {err}"))?;
                self.model.transfer(&sender, &receiver, shares);
            }
            Action::Donate { assets } => {
                let before = self.vault.total_assets();
                self.pool_call(|pool| pool.mint_underlying(&usdc(), &vault_address(), assets))?;
                if self.mode == Mode::LendingMarket {
                    same("total_assets after donation", before, self.vault.total_assets())?;
                }
            }
            Action::TogglePause => {
                let result = if paused {
                    self.vault.unpause(&owner())
                } else {
                    self.vault.pause(&owner())
                };
                result.map_err(|err| format!("pause toggle failed: {err}"))?;
            }
            Action::SetFrozen { frozen } => {
                self.pool_call(|pool| pool.set_frozen(&usdc(), frozen))?;
            }
            Action::SetSupplyCap { cap_whole } => {
                self.pool_call(|pool| pool.set_supply_cap(&usdc(), cap_whole))?;
            }
            Action::Borrow { amount } => {
                let borrower = self.borrower;
                self.pool_call(|pool| pool.borrow(&usdc(), &borrower, amount))?;
            }
            Action::Repay { amount } => {
                let borrower = self.borrower;
                self.pool_call(|pool| pool.repay(&usdc(), &borrower, amount).map(|_| ()))?;
            }
        }
        Ok(())
    }

    fn pool_call<E: fmt::Display>(
        &mut self,
        f: impl FnOnce(&mut mock_pool::MockPool) -> Result<(), E>,
    ) -> Result<(), String> {
        f(self.vault.market_mut()).map_err(|err| format!("pool hook failed: {err}"))
    }

    /// Moves value into or out of the strategy without touching shares.
    fn recognize(&mut self, amount: u128, profit: bool) -> Result<(), String> {
        let assets_before = self.vault.total_assets();
        let supply_before = self.vault.total_supply();

        match (self.mode, profit) {
            (Mode::LendingMarket, true) => {
                self.pool_call(|pool| pool.recognize_profit(&usdc(), amount).map(|_| ()))?
            }
            (Mode::LendingMarket, false) => {
                self.pool_call(|pool| pool.recognize_loss(&usdc(), amount).map(|_| ()))?
            }
            (Mode::PassthroughCash, true) => {
                self.pool_call(|pool| pool.mint_underlying(&usdc(), &vault_address(), amount))?
            }
            (Mode::PassthroughCash, false) => {
                let burned = amount.min(assets_before);
                self.pool_call(|pool| pool.burn_underlying(&usdc(), &vault_address(), burned))?
            }
        }

        let assets_after = self.vault.total_assets();
        same("supply after profit/loss", supply_before, self.vault.total_supply())?;
        if profit && assets_after <= assets_before {
            return Err(format!(
                "profit of {amount} moved total_assets {assets_before} -> {assets_after}"
            ));
        }
        if !profit && assets_before > 0 && assets_after >= assets_before {
            return Err(format!(
                "loss of {amount} moved total_assets {assets_before} -> {assets_after}"
            ));
        }
        Ok(())
    }

    fn round_trip(&mut self, holder: usize, assets: u128, paused: bool) -> Result<(), String> {
        let who = self.holders[holder];
        let usdc_before = usdc_balance(&self.vault, &who);

        let deposited = self.vault.deposit(&who, assets, &who);
        let Some(shares) = expect_gated(paused, deposited)? else {
            return Ok(());
        };
        self.model.mint(&who, shares);

        // Liquidity can leave a few shares unredeemable; they stay with the holder.
        let redeemable = shares.min(self.vault.max_redeem(&who));
        let back = self
            .vault
            .redeem(&who, redeemable, &who, &who)
            .map_err(|err| format!("round-trip redeem failed: {err}"))?;
        self.model.burn(&who, redeemable);

        if back > assets || usdc_balance(&self.vault, &who) > usdc_before {
            return Err(format!("round trip of {assets} returned {back}"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Checks
    // ------------------------------------------------------------------------

    fn check(&mut self) -> Result<(), String> {
        if let Some(diff) = self.model.diff(&self.vault) {
            return Err(diff);
        }

        let supply = self.vault.total_supply();
        let summed: u128 = self.vault.holders().map(|(_, balance)| *balance).sum();
        same("total_supply vs Σ balances", supply, summed)?;

        let claims: u128 = self
            .vault
            .holders()
            .map(|(_, balance)| self.vault.convert_to_assets(*balance))
            .sum();
        let total_assets = self.vault.total_assets();
        if claims > total_assets {
            return Err(format!("claims {claims} exceed total_assets {total_assets}"));
        }

        if self.vault.lock().is_held() {
            return Err("reentrancy lock still held after the call".to_string());
        }

        if self.vault.is_paused() {
            for holder in &self.holders {
                let figures = self.vault.capacity(holder);
                if figures != CapacityFigures::CLOSED {
                    return Err(format!("paused vault reports {figures:?} for {holder}"));
                }
            }
            return Ok(());
        }

        let probe = self.holders[0];
        if self.vault.max_deposit(&probe) == 0 {
            match self.vault.deposit(&probe, 1, &probe) {
                Err(VaultError::CapacityExceeded {
                    operation: Operation::Deposit,
                    ..
                }) => {}
                other => return Err(format!("deposit(1) at zero capacity gave {other:?}")),
            }
        }
        Ok(())
    }
}

/// Unwraps a value-moving call: `Paused` is expected exactly when the vault is
/// paused, and nothing else may fail.
fn expect_gated<T>(paused: bool, result: Result<T, VaultError>) -> Result<Option<T>, String> {
    match (paused, result) {
        (false, Ok(value)) => Ok(Some(value)),
        (true, Err(VaultError::Paused)) => Ok(None),
        (true, Ok(_)) => Err("call succeeded while paused".to_string()),
        (_, Err(err)) => Err(format!("unexpected error: {err}")),
    }
}

fn same(what: &str, expected: u128, actual: u128) -> Result<(), String> {
    if expected != actual {
        return Err(format!("{what}: expected {expected}, got {actual}"));
    }
    Ok(())
}
