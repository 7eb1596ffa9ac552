//! # DriftWatch Ledger
//!
//! Tamper-evident persistence: a genesis-anchored SHA-256 hash chain
//! ([`chain`]) wrapped in a durable append-only JSON-lines log ([`log`]).
//!
//! ## Threat Model
//!
//! The ledger defends against:
//!
//! - **Retroactive editing**: every entry hash binds the previous hash, the
//!   canonical payload, and the timestamp; changing any byte of history
//!   invalidates the chain from that point forward.
//!
//! - **Entry removal or reordering**: the `previous_hash` linkage makes a
//!   gap or swap detectable at the first affected index.
//!
//! - **Silent corruption**: a malformed line discovered on load marks the
//!   log quarantined; integrity reports false and further appends are
//!   refused until the operator repairs the file and reopens it.
//!
//! What it does *not* defend against: an attacker who can rewrite the whole
//! file can regenerate a consistent chain. Externalizing the head hash is
//! the operator's countermeasure and is out of scope here.

pub mod chain;
pub mod error;
pub mod log;

pub use chain::{genesis_hash, ChainVerification, HashChain, LogEntry};
pub use error::LedgerError;
pub use log::AuditLog;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
