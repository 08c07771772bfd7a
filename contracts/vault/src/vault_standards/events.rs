//! # Vault Events
//!
//! Structured event logging for vault operations. Events are rendered as JSON
//! lines prefixed with `EVENT_JSON:`, appended to the vault's [`EventLog`] and
//! mirrored to `tracing` at `info` level for off-chain observers.
//!
//! ## Event Types
//!
//! - `VaultDeposit`: assets deposited, shares minted
//! - `VaultWithdraw`: shares burned, assets paid out
//! - `PoolSet`: lending pool bound at initialization
//! - `ReceiptTokenSet`: receipt token resolved for the underlying asset
//! - `Skim`: idle custody swept into the strategy
//! - `Paused` / `Unpaused`: vault status changes
//!
//! ## Format
//!
//! ```json
//! {
//!   "standard": "lending-vault",
//!   "version": "1.0.0",
//!   "event": "vault_deposit",
//!   "data": [{ ... }]
//! }
//! ```

use serde::Serialize;

use crate::Address;

const EVENT_STANDARD: &str = "lending-vault";
const EVENT_VERSION: &str = "1.0.0";

// ============================================================================
// Event Log
// ============================================================================

/// Append-only record of emitted events, in emission order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    entries: Vec<String>,
}

impl EventLog {
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts entries whose `event` field equals `name`.
    pub fn count(&self, name: &str) -> usize {
        let needle = format!("\"event\":\"{}\"", name);
        self.entries.iter().filter(|e| e.contains(&needle)).count()
    }

    fn push(&mut self, line: String) {
        tracing::info!(target: "lending_vault::events", "{}", line);
        self.entries.push(line);
    }
}

// ============================================================================
// Event Wrapper
// ============================================================================

/// Top-level event envelope.
#[derive(Serialize, Debug)]
#[must_use = "don't forget to `.emit()` this event"]
struct VaultEventEnvelope<'a> {
    standard: &'static str,
    version: &'static str,
    #[serde(flatten)]
    event_kind: VaultEventKind<'a>,
}

impl VaultEventEnvelope<'_> {
    /// Formats the event with the required EVENT_JSON prefix.
    ///
    /// Serializing plain structs of integers and strings cannot fail, so an
    /// error here only drops the payload, never the emission.
    fn to_json_event_string(&self) -> String {
        let body = serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"));
        format!("EVENT_JSON:{}", body)
    }

    fn emit(self, log: &mut EventLog) {
        log.push(self.to_json_event_string());
    }
}

/// Enum of supported vault event types.
#[derive(Serialize, Debug)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "snake_case")]
#[allow(clippy::enum_variant_names)]
enum VaultEventKind<'a> {
    VaultDeposit(&'a [VaultDeposit<'a>]),
    VaultWithdraw(&'a [VaultWithdraw<'a>]),
    PoolSet(&'a [PoolSet<'a>]),
    ReceiptTokenSet(&'a [ReceiptTokenSet<'a>]),
    Skim(&'a [Skim<'a>]),
    Paused(&'a [StatusChanged<'a>]),
    Unpaused(&'a [StatusChanged<'a>]),
}

fn envelope(event_kind: VaultEventKind<'_>) -> VaultEventEnvelope<'_> {
    VaultEventEnvelope {
        standard: EVENT_STANDARD,
        version: EVENT_VERSION,
        event_kind,
    }
}

// ============================================================================
// Vault Deposit Event
// ============================================================================

/// Emitted when assets are deposited into the vault and shares are minted.
#[must_use]
#[derive(Serialize, Debug, Clone)]
pub struct VaultDeposit<'a> {
    /// The account that sent the assets.
    pub sender: &'a Address,
    /// The account that received the shares.
    pub owner: &'a Address,
    pub assets: u128,
    pub shares: u128,
}

impl VaultDeposit<'_> {
    pub fn emit(self, log: &mut EventLog) {
        envelope(VaultEventKind::VaultDeposit(&[self])).emit(log)
    }
}

// ============================================================================
// Vault Withdraw Event
// ============================================================================

/// Emitted when shares are burned and assets are transferred out.
#[must_use]
#[derive(Serialize, Debug, Clone)]
pub struct VaultWithdraw<'a> {
    /// The account that initiated the call.
    pub sender: &'a Address,
    /// The account that received the assets.
    pub receiver: &'a Address,
    /// The account whose shares were burned.
    pub owner: &'a Address,
    pub assets: u128,
    pub shares: u128,
}

impl VaultWithdraw<'_> {
    pub fn emit(self, log: &mut EventLog) {
        envelope(VaultEventKind::VaultWithdraw(&[self])).emit(log)
    }
}

// ============================================================================
// Configuration Events
// ============================================================================

#[must_use]
#[derive(Serialize, Debug, Clone)]
pub struct PoolSet<'a> {
    pub pool: &'a Address,
}

impl PoolSet<'_> {
    pub fn emit(self, log: &mut EventLog) {
        envelope(VaultEventKind::PoolSet(&[self])).emit(log)
    }
}

#[must_use]
#[derive(Serialize, Debug, Clone)]
pub struct ReceiptTokenSet<'a> {
    pub receipt_token: &'a Address,
}

impl ReceiptTokenSet<'_> {
    pub fn emit(self, log: &mut EventLog) {
        envelope(VaultEventKind::ReceiptTokenSet(&[self])).emit(log)
    }
}

/// Emitted when idle custody is swept into the strategy.
#[must_use]
#[derive(Serialize, Debug, Clone)]
pub struct Skim<'a> {
    pub caller: &'a Address,
    pub assets: u128,
}

impl Skim<'_> {
    pub fn emit(self, log: &mut EventLog) {
        envelope(VaultEventKind::Skim(&[self])).emit(log)
    }
}

#[must_use]
#[derive(Serialize, Debug, Clone)]
pub struct StatusChanged<'a> {
    pub caller: &'a Address,
}

impl StatusChanged<'_> {
    pub fn emit_paused(self, log: &mut EventLog) {
        envelope(VaultEventKind::Paused(&[self])).emit(log)
    }

    pub fn emit_unpaused(self, log: &mut EventLog) {
        envelope(VaultEventKind::Unpaused(&[self])).emit(log)
    }
}
