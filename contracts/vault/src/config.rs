//! # Vault Configuration
//!
//! [`VaultConfig`] is the serializable description of a vault (share metadata,
//! first deposit, deposit cap, strategy). [`InitParams`] is what
//! [`Vault::initialize`](crate::Vault::initialize) consumes: the config plus
//! the live collaborators that cannot be serialized.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::access::Authorizer;
use crate::Address;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid vault config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid vault config: {0}")]
    Invalid(String),
}

/// Metadata for the vault share token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ShareMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for ShareMetadata {
    fn default() -> Self {
        Self {
            name: "Lending Vault Share".to_string(),
            symbol: "lvSHARE".to_string(),
            decimals: 6,
        }
    }
}

/// Where deposited assets are deployed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    PassthroughCash,
    LendingMarket { pool: Address },
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::PassthroughCash
    }
}

/// Serializable vault settings.
///
/// Amounts are decimal strings in JSON so they survive 128-bit values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct VaultConfig {
    pub metadata: ShareMetadata,
    #[schemars(with = "String")]
    #[serde(with = "crate::amount")]
    pub first_deposit_amount: u128,
    /// Vault-level ceiling on total assets. Absent means uncapped.
    #[schemars(with = "Option<String>")]
    #[serde(with = "crate::amount::option", skip_serializing_if = "Option::is_none")]
    pub deposit_cap: Option<u128>,
    pub strategy: StrategyConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            metadata: ShareMetadata::default(),
            first_deposit_amount: 1_000_000,
            deposit_cap: None,
            strategy: StrategyConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Parses and validates a JSON config. Missing fields take defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: VaultConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Static checks. Live checks (reserve lookup, funding balance) happen in
    /// `initialize`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata.name.trim().is_empty() {
            return Err(ConfigError::Invalid("metadata.name is empty".into()));
        }
        if self.metadata.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("metadata.symbol is empty".into()));
        }
        if self.first_deposit_amount == 0 {
            return Err(ConfigError::Invalid(
                "first_deposit_amount must be greater than zero".into(),
            ));
        }
        if let Some(cap) = self.deposit_cap {
            if cap < self.first_deposit_amount {
                return Err(ConfigError::Invalid(format!(
                    "deposit_cap {cap} is below first_deposit_amount {}",
                    self.first_deposit_amount
                )));
            }
        }
        if let StrategyConfig::LendingMarket { pool } = self.strategy {
            if pool.is_zero() {
                return Err(ConfigError::Invalid("strategy.pool is the zero address".into()));
            }
        }
        Ok(())
    }

    /// Binds the config to live collaborators.
    pub fn into_params(
        self,
        authorizer: Box<dyn Authorizer>,
        underlying_asset: Address,
        funding_account: Address,
    ) -> InitParams {
        InitParams {
            authorizer,
            underlying_asset,
            metadata: self.metadata,
            funding_account,
            first_deposit_amount: self.first_deposit_amount,
            strategy: self.strategy,
            deposit_cap: self.deposit_cap,
        }
    }
}

/// Everything `initialize` needs.
pub struct InitParams {
    pub authorizer: Box<dyn Authorizer>,
    pub underlying_asset: Address,
    pub metadata: ShareMetadata,
    /// Account the first deposit is pulled from.
    pub funding_account: Address,
    pub first_deposit_amount: u128,
    pub strategy: StrategyConfig,
    pub deposit_cap: Option<u128>,
}
