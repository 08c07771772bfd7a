//! # Test Helpers Module
//!
//! Common infrastructure for the vault integration tests: well-known
//! identities, a lending pool listing the test asset, and deployment helpers
//! that fund the treasury and run `initialize`.
//!
//! ## Modules
//!
//! - [`test_builder`]: Builder pattern for constructing test scenarios
//!
//! ## Key Functions
//!
//! - [`lending_pool`]: A mock pool with a live 6-decimal USDC reserve
//! - [`deploy_lending_vault`]: Initializes a vault over the lending pool
//! - [`deploy_passthrough_vault`]: Initializes a cash-only vault
//! - [`fund`]: Mints test USDC to an account

#![allow(dead_code)]

use lending_vault::access::RoleRegistry;
use lending_vault::market::{AssetLedger, ReserveConfig};
use lending_vault::{Address, InitParams, ShareMetadata, StrategyConfig, Vault, VaultError};
use mock_pool::MockPool;


// ============================================================================
// Constants
// ============================================================================

pub const USDC_DECIMALS: u8 = 6;

/// One whole USDC in base units.
pub const ONE_USDC: u128 = 1_000_000;

/// Mandatory first deposit made at initialization (10 USDC).
pub const FIRST_DEPOSIT: u128 = 10 * ONE_USDC;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub type TestVault = Vault<MockPool>;

// ============================================================================
// Identities
// ============================================================================

pub fn usdc() -> Address {
    Address::from_label("usdc")
}

pub fn a_usdc() -> Address {
    Address::from_label("aUSDC")
}

pub fn pool_address() -> Address {
    Address::from_label("pool")
}

pub fn vault_address() -> Address {
    Address::from_label("vault")
}

pub fn owner() -> Address {
    Address::from_label("owner")
}

pub fn treasury() -> Address {
    Address::from_label("treasury")
}

pub fn account(name: &str) -> Address {
    Address::from_label(name)
}

// ============================================================================
// Setup
// ============================================================================

/// Installs a `tracing` subscriber honouring `RUST_LOG`. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A pool listing USDC as an active, unfrozen, uncapped reserve.
pub fn lending_pool() -> MockPool {
    MockPool::new(pool_address()).with_reserve(usdc(), a_usdc(), ReserveConfig::live(USDC_DECIMALS))
}

pub fn init_params(
    strategy: StrategyConfig,
    first_deposit: u128,
    deposit_cap: Option<u128>,
) -> InitParams {
    InitParams {
        authorizer: Box::new(RoleRegistry::new(owner())),
        underlying_asset: usdc(),
        metadata: ShareMetadata {
            name: "USDC Lending Vault".to_string(),
            symbol: "lvUSDC".to_string(),
            decimals: USDC_DECIMALS,
        },
        funding_account: treasury(),
        first_deposit_amount: first_deposit,
        strategy,
        deposit_cap,
    }
}

/// Funds the treasury and initializes a vault supplying into `pool`.
pub fn deploy_lending_vault(
    mut pool: MockPool,
    first_deposit: u128,
    deposit_cap: Option<u128>,
) -> Result<TestVault, Box<dyn std::error::Error>> {
    pool.mint_underlying(&usdc(), &treasury(), first_deposit)?;
    let mut vault = Vault::new(vault_address(), pool);
    let strategy = StrategyConfig::LendingMarket {
        pool: pool_address(),
    };
    vault.initialize(&owner(), init_params(strategy, first_deposit, deposit_cap))?;
    Ok(vault)
}

/// Funds the treasury and initializes a cash-only vault.
pub fn deploy_passthrough_vault(
    first_deposit: u128,
) -> Result<TestVault, Box<dyn std::error::Error>> {
    let mut pool = lending_pool();
    pool.mint_underlying(&usdc(), &treasury(), first_deposit)?;
    let mut vault = Vault::new(vault_address(), pool);
    vault.initialize(
        &owner(),
        init_params(StrategyConfig::PassthroughCash, first_deposit, None),
    )?;
    Ok(vault)
}

/// Mints `amount` of USDC to `who`.
pub fn fund(
    vault: &mut TestVault,
    who: &Address,
    amount: u128,
) -> Result<(), Box<dyn std::error::Error>> {
    vault.market_mut().mint_underlying(&usdc(), who, amount)?;
    Ok(())
}

pub fn usdc_balance(vault: &TestVault, who: &Address) -> u128 {
    vault.market().balance_of(&usdc(), who)
}

/// Asserts `result` failed with exactly `expected`.
pub fn assert_vault_error<T: std::fmt::Debug>(result: Result<T, VaultError>, expected: VaultError) {
    match result {
        Err(err) => assert_eq!(err, expected),
        Ok(value) => panic!("expected {expected:?}, got Ok({value:?})"),
    }
}
