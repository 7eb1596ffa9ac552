//! Error types for baseline operations.

use thiserror::Error;

/// Errors raised while loading or validating baseline templates.
#[derive(Debug, Error)]
pub enum BaselineError {
    /// Template file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Template file is not valid YAML.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Template failed structural validation.
    #[error("invalid template {path}: {}", errors.join("; "))]
    Invalid {
        /// Source file path.
        path: String,
        /// Per-field diagnostics.
        errors: Vec<String>,
    },

    /// Two loaded templates claim the same screen id.
    #[error("duplicate screen_id: {0}")]
    DuplicateScreenId(String),

    /// No template exists for the requested screen id.
    #[error("template not found: {0}")]
    NotFound(String),
}
