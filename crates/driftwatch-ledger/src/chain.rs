//! # Hash Chain
//!
//! Genesis-anchored SHA-256 linkage between log entries:
//!
//! ```text
//! entry_hash = SHA-256(previous_hash || canonical_json(data) || timestamp)
//! ```
//!
//! The first entry links to the fixed genesis constant `SHA-256("genesis")`.
//! Verification walks the chain from genesis, recomputing every hash from
//! the stored fields; the first index where either the linkage or the
//! recomputation disagrees is reported.
//!
//! Canonical JSON (sorted keys, no insignificant whitespace) is what makes
//! the hash well-defined: the same payload always contributes the same
//! bytes regardless of how its map was built.

use driftwatch_tree::canonical_json::{canonicalize, sha256_hex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed anchor of every chain: `SHA-256("genesis")`.
pub fn genesis_hash() -> String {
    sha256_hex(b"genesis")
}

/// One link of the chain as persisted in the log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Hash of this entry.
    pub entry_hash: String,

    /// Hash of the predecessor (genesis constant for entry 0).
    pub previous_hash: String,

    /// Epoch seconds when the entry was appended.
    pub timestamp: f64,

    /// The recorded payload.
    pub data: Value,
}

/// Outcome of verifying a chain of entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    /// Whether every entry verified.
    pub is_valid: bool,

    /// Index of the first entry that failed, when any did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_invalid: Option<usize>,
}

impl ChainVerification {
    fn ok() -> Self {
        Self {
            is_valid: true,
            first_invalid: None,
        }
    }

    fn failed_at(index: usize) -> Self {
        Self {
            is_valid: false,
            first_invalid: Some(index),
        }
    }
}

/// Running state of a hash chain: the current head and length.
#[derive(Debug, Clone)]
pub struct HashChain {
    current: String,
    length: usize,
}

impl Default for HashChain {
    fn default() -> Self {
        Self::new()
    }
}

impl HashChain {
    /// Creates a chain at genesis.
    pub fn new() -> Self {
        Self {
            current: genesis_hash(),
            length: 0,
        }
    }

    /// The hash the next entry will link to.
    pub fn current_hash(&self) -> &str {
        &self.current
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.length
    }

    /// True when the chain is at genesis.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Appends a payload, advancing the head. Returns the new entry hash.
    pub fn add_entry(&mut self, data: &Value, timestamp: f64) -> String {
        let hash = Self::compute_entry_hash(&self.current, data, timestamp);
        self.current = hash.clone();
        self.length += 1;
        hash
    }

    /// Moves the head to a known hash without recomputation.
    ///
    /// Used while rebuilding in-memory state from a log file whose entries
    /// already carry their hashes; verification happens separately.
    pub fn advance_to(&mut self, entry_hash: &str) {
        self.current = entry_hash.to_string();
        self.length += 1;
    }

    /// Resets the chain to genesis.
    pub fn reset(&mut self) {
        self.current = genesis_hash();
        self.length = 0;
    }

    /// The hash an entry with these fields must carry.
    pub fn compute_entry_hash(previous_hash: &str, data: &Value, timestamp: f64) -> String {
        let material = format!("{}{}{}", previous_hash, canonicalize(data), timestamp);
        sha256_hex(material.as_bytes())
    }

    /// Recomputes a single entry's hash and compares.
    pub fn verify_entry(
        entry_hash: &str,
        data: &Value,
        timestamp: f64,
        previous_hash: &str,
    ) -> bool {
        Self::compute_entry_hash(previous_hash, data, timestamp) == entry_hash
    }

    /// Verifies a full chain of entries starting from genesis.
    ///
    /// Both conditions must hold at every index `i`:
    /// - `entries[i].previous_hash` equals the head so far (genesis for
    ///   `i == 0`, `entries[i-1].entry_hash` otherwise);
    /// - recomputing the hash from the stored fields reproduces
    ///   `entries[i].entry_hash`.
    pub fn verify_chain(entries: &[LogEntry]) -> ChainVerification {
        let mut previous = genesis_hash();

        for (index, entry) in entries.iter().enumerate() {
            if entry.previous_hash != previous {
                return ChainVerification::failed_at(index);
            }
            if !Self::verify_entry(
                &entry.entry_hash,
                &entry.data,
                entry.timestamp,
                &entry.previous_hash,
            ) {
                return ChainVerification::failed_at(index);
            }
            previous = entry.entry_hash.clone();
        }

        ChainVerification::ok()
    }
}
