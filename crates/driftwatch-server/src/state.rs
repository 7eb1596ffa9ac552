//! Shared application state.
//!
//! One [`AppState`] lives for the whole process and is shared across
//! handlers behind an [`Arc`]. The pipeline (and with it the audit log)
//! sits behind a single mutex: log appends are serialized end to end -
//! chain-head read, hash compute, line write, cache append, fsync - so
//! readers never observe a torn entry.

use crate::auth::ApiKeyStore;
use crate::rate_limit::RateLimiter;
use driftwatch_core::{Config, DriftPipeline, HealthChecker, MetricsCollector, PipelineError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-wide service state.
pub struct AppState {
    /// Active configuration.
    pub config: Config,
    /// The drift pipeline (templates, matcher, transitions, audit log).
    pipeline: Mutex<DriftPipeline>,
    /// API-key store.
    pub keys: ApiKeyStore,
    /// Sliding-window rate limiter.
    pub limiter: RateLimiter,
    /// Metrics collector.
    pub metrics: MetricsCollector,
    /// Dependency health checks.
    pub health: HealthChecker,
}

/// Handle shared across handlers and middleware.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Builds the full service state from configuration.
    pub fn new(config: Config) -> Result<SharedState, PipelineError> {
        let pipeline = DriftPipeline::new(config.clone())?;
        let keys = ApiKeyStore::new(&config.api_keys_path);
        let limiter = RateLimiter::new(config.rate_limit_rpm, config.rate_limit_burst);
        let health = HealthChecker::with_defaults(&config);

        Ok(Arc::new(Self {
            pipeline: Mutex::new(pipeline),
            keys,
            limiter,
            metrics: MetricsCollector::new(),
            health,
            config,
        }))
    }

    /// Locks the pipeline. Critical sections must stay short and never
    /// hold the guard across an await point.
    pub fn pipeline(&self) -> MutexGuard<'_, DriftPipeline> {
        self.pipeline.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flushes and closes the audit log. In-flight appends have already
    /// completed by the time the lock is acquired.
    pub fn shutdown(&self) {
        if let Err(e) = self.pipeline().shutdown() {
            tracing::error!(error = %e, "error while closing the audit log");
        }
    }
}
