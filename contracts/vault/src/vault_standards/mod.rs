//! # Vault Standards Module
//!
//! ERC-4626-style tokenized vault building blocks.
//!
//! ## Module Organization
//!
//! - [`core`]: Trait definition and default implementations for vault views
//! - [`conversion`]: Virtual-offset share/asset conversion
//! - [`events`]: JSON event logging for deposits, withdrawals and configuration
//! - [`mul_div`]: Safe multiplication and division with configurable rounding

pub mod conversion;
pub mod core;
pub mod events;
pub mod mul_div;

pub use self::core::*;
pub use self::mul_div::Rounding;
