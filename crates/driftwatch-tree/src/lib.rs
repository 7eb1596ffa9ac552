//! # DriftWatch Tree
//!
//! Canonical accessibility-tree model, normalizer, and signature engine.
//!
//! Raw accessibility snapshots arrive in whatever shape the capture driver
//! produced: platform-specific property names, transient identifiers, and
//! unordered children. Before anything can be compared, hashed, or logged,
//! a snapshot is reduced to a **canonical tree**: transient keys stripped,
//! alias keys folded into `name`, roles lowercased, children deterministically
//! ordered. Canonicalization is what makes drift detection byte-stable.
//!
//! ## Threat Model
//!
//! Canonical form defends against:
//!
//! - **Ordering noise**: two captures of the same screen can enumerate
//!   children in different orders; sorting by `(role, name, type)` makes
//!   equivalent screens bytewise identical.
//!
//! - **Transient churn**: timestamps, instance ids, and per-capture hashes
//!   change on every snapshot and would make every comparison a false drift.
//!
//! - **Property aliasing**: `label`, `title`, `text`, and `description` are
//!   the same concept on different platforms; folding them into `name`
//!   prevents an attacker (or a flaky driver) from hiding a content change
//!   behind a renamed property.
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`node`] | Typed canonical node/tree model |
//! | [`normalize`] | Raw JSON → canonical tree |
//! | [`canonical_json`] | Deterministic JSON serialization + SHA-256 |
//! | [`signature`] | Full / structural / content signature triple |
//! | [`classify`] | Semantic node categories |
//! | [`filter`] | Noise filters (spinners, scrollbars, invisible nodes) |

pub mod canonical_json;
pub mod classify;
pub mod filter;
pub mod node;
pub mod normalize;
pub mod signature;

pub use canonical_json::{canonicalize, hash_canonical, sha256_hex};
pub use classify::{classify, NodeCategory};
pub use filter::NoiseFilter;
pub use node::{Bounds, CanonicalNode, CanonicalTree};
pub use normalize::normalize;
pub use signature::{generate_signatures, SignatureTriple};
