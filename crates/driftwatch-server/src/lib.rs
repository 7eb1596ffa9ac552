//! # DriftWatch Server
//!
//! The authenticated HTTP surface wrapping the drift-detection pipeline:
//! API-key authentication with role gating, a per-client sliding-window
//! rate limiter, a request-size cap, and the endpoint set for captures,
//! templates, logs, auth, and dashboards.
//!
//! ## Middleware chain
//!
//! Outermost first: CORS → request-context logger (request id, metrics)
//! → trusted-host guard → rate limiter → request-size cap → handler.
//! The authenticator is a handler dependency rather than middleware, so
//! public endpoints never pay for (or depend on) the key store.
//!
//! ## Shared state
//!
//! The pipeline - and with it the append-only log - sits behind one
//! mutex; appends are serialized and never torn. The template index is
//! copy-on-write inside the store; the key store guards its YAML file
//! with its own lock and a 60-second metadata cache.

pub mod auth;
pub mod builder;
pub mod error;
pub mod export;
pub mod middleware;
pub mod rate_limit;
pub mod recorder;
pub mod routes;
pub mod state;

pub use auth::{ApiKeyStore, KeyRecord, Role};
pub use error::ApiError;
pub use rate_limit::{RateDecision, RateLimiter};
pub use routes::build_router;
pub use state::{AppState, SharedState};
