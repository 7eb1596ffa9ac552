//! Error types for ledger operations.

use thiserror::Error;

/// Errors raised by the hash chain and audit log.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Reading or writing the log file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A payload could not be serialized to a log line.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The log loaded with errors and refuses appends until repaired.
    #[error("log is quarantined after a load error; repair the file and reopen")]
    Quarantined,
}
