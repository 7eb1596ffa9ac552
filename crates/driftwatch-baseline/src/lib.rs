//! # DriftWatch Baseline
//!
//! Declarative baseline templates: the ground truth a captured screen is
//! judged against. A template names a screen, lists the nodes that must be
//! present, pins the expected structural signature, and declares which
//! screen transitions are legitimate.
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`template`] | Template model and metadata |
//! | [`validate`] | Structural validation with per-field diagnostics |
//! | [`store`] | YAML directory loader with atomic reload |
//! | [`state`] | Screen state machine |
//!
//! ## Ownership
//!
//! Templates are immutable once loaded. [`store::TemplateStore::reload`]
//! builds a complete new index and swaps it atomically; callers holding a
//! snapshot of the previous index continue on the old version until they
//! re-read.

pub mod error;
pub mod state;
pub mod store;
pub mod template;
pub mod validate;

pub use error::BaselineError;
pub use state::ScreenStateMachine;
pub use store::TemplateStore;
pub use template::{Template, TemplateMetadata};
pub use validate::{validate, validate_with_errors};

/// Result type for baseline operations.
pub type Result<T> = std::result::Result<T, BaselineError>;
