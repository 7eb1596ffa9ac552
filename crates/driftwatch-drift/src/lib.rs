//! # DriftWatch Drift
//!
//! The detection half of the pipeline: given a canonical tree and a set of
//! baseline templates, decide whether the observed UI has drifted, how
//! badly, and in what way.
//!
//! ## Detection layers
//!
//! | Layer | Module | Question answered |
//! |-------|--------|-------------------|
//! | Matching | [`matcher`] | Which baseline screen is this, if any? |
//! | Diffing | [`diff`] | What exactly changed against that baseline? |
//! | Transitions | [`transition`] | Was this screen change legitimate? |
//! | Events | [`event`] | How is the finding recorded? |
//!
//! ## Threat Model
//!
//! Drift detection defends against:
//!
//! - **Silent layout manipulation**: elements removed or inserted between
//!   releases (or mid-session) without disclosure.
//!
//! - **Content substitution**: amounts, labels, or terms quietly changed
//!   while the layout stays identical.
//!
//! - **Forced flows and loops**: navigation graphs engineered so the user
//!   has exactly one way forward, or is cycled through the same screens -
//!   the two manipulative patterns this crate will assert. Intent is never
//!   inferred from visual styling alone.

pub mod diff;
pub mod event;
pub mod matcher;
pub mod transition;

pub use diff::{DiffEngine, DiffEntry, DiffResult, ModifiedNode, NodeSummary};
pub use event::{ChangeType, DriftEvent, DriftType, Severity};
pub use matcher::Matcher;
pub use transition::{ForcedFlow, TransitionChecker, TransitionRecord, TransitionResult};
