//! Error types for the core pipeline.

use thiserror::Error;

/// Core error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Baseline loading or validation failed.
    #[error("baseline error: {0}")]
    Baseline(#[from] driftwatch_baseline::BaselineError),

    /// The audit log refused or failed an operation.
    #[error("ledger error: {0}")]
    Ledger(#[from] driftwatch_ledger::LedgerError),

    /// A filesystem operation outside the ledger failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
