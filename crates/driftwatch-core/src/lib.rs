//! # DriftWatch Core
//!
//! Unified facade for the drift-detection pipeline.
//! Orchestrates normalization, signatures, matching, diffing, transition
//! checking, and the tamper-evident audit log.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       DRIFTWATCH CORE                            │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │                    ┌─────────────────┐                           │
//! │                    │  DriftPipeline  │  ← Unified Facade         │
//! │                    └────────┬────────┘                           │
//! │                             │                                    │
//! │      ┌──────────┬───────────┼───────────┬───────────┐            │
//! │      ▼          ▼           ▼           ▼           ▼            │
//! │ ┌─────────┐ ┌─────────┐ ┌────────┐ ┌──────────┐ ┌────────┐      │
//! │ │  Tree   │ │Baseline │ │ Drift  │ │Transition│ │ Ledger │      │
//! │ │  (C1-3) │ │  (C4)   │ │ (C5-6) │ │   (C7)   │ │ (C9-10)│      │
//! │ └─────────┘ └─────────┘ └────────┘ └──────────┘ └────────┘      │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One drift check flows capture → normalize → sign → template lookup →
//! best match → (below threshold) diff → event → append, where the append
//! extends the hash chain. Transition observations additionally pass
//! through the transition checker before event construction.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use driftwatch_core::{Config, DriftPipeline};
//!
//! let mut pipeline = DriftPipeline::new(Config::from_env())?;
//!
//! let outcome = pipeline.observe(&capture_json)?;
//! for event in &outcome.events {
//!     println!("{}", event.summary());
//! }
//! ```

pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod pipeline;

pub use config::Config;
pub use error::PipelineError;
pub use health::{HealthCheck, HealthChecker, HealthReport, HealthStatus};
pub use metrics::{HistogramSummary, MetricsCollector, MetricsSnapshot};
pub use pipeline::{ComparisonOutcome, DriftPipeline, Observation, TransitionOutcome};

// Re-export component types for convenience.
pub use driftwatch_baseline::{Template, TemplateStore};
pub use driftwatch_drift::{
    DiffEngine, DiffResult, DriftEvent, DriftType, Matcher, Severity, TransitionChecker,
};
pub use driftwatch_ledger::{AuditLog, HashChain, LogEntry};
pub use driftwatch_tree::{
    generate_signatures, normalize, CanonicalNode, CanonicalTree, SignatureTriple,
};

/// Core result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
