//! # Health Checks
//!
//! Registered predicates probing the service's dependencies (log
//! directory, template directory, API-key file). The aggregate status is
//! the worst of its parts, and a check that panics is caught and reported
//! as unhealthy rather than taking the endpoint down with it.

use crate::config::Config;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Status of one check, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Dependency fully available.
    Healthy,
    /// Usable but impaired (e.g. directory missing on a fresh install).
    Degraded,
    /// Dependency unavailable.
    Unhealthy,
}

/// Result of one health check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Check name.
    pub name: String,
    /// Check outcome.
    pub status: HealthStatus,
    /// Human-readable explanation.
    pub message: String,
    /// Structured details (paths, counts).
    pub details: Map<String, Value>,
    /// When the check ran, RFC 3339.
    pub timestamp: String,
}

impl HealthCheck {
    /// Builds a check result stamped with the current time.
    pub fn new(
        name: &str,
        status: HealthStatus,
        message: impl Into<String>,
        details: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Aggregate report over all registered checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Worst status across checks.
    pub status: HealthStatus,
    /// When the report was assembled, RFC 3339.
    pub timestamp: String,
    /// Individual check results.
    pub checks: Vec<HealthCheck>,
}

type CheckFn = Box<dyn Fn() -> HealthCheck + Send + Sync>;

/// Registry of health-check predicates.
#[derive(Default)]
pub struct HealthChecker {
    checks: Vec<CheckFn>,
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker")
            .field("check_count", &self.checks.len())
            .finish()
    }
}

impl HealthChecker {
    /// Creates a checker with no registered checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a checker with the standard dependency checks for `config`.
    pub fn with_defaults(config: &Config) -> Self {
        let mut checker = Self::new();

        let log_path = config.log_path.clone();
        checker.register(move || check_log_directory(&log_path));

        let templates_dir = config.templates_dir.clone();
        checker.register(move || check_template_directory(&templates_dir));

        let keys_path = config.api_keys_path.clone();
        checker.register(move || check_api_keys_file(&keys_path));

        checker
    }

    /// Registers a custom check.
    pub fn register(&mut self, check: impl Fn() -> HealthCheck + Send + Sync + 'static) {
        self.checks.push(Box::new(check));
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// True when no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Runs every check, translating panics into unhealthy results, and
    /// aggregates to the worst status observed.
    pub fn run_checks(&self) -> HealthReport {
        let mut results = Vec::with_capacity(self.checks.len());
        let mut overall = HealthStatus::Healthy;

        for check in &self.checks {
            let result = match catch_unwind(AssertUnwindSafe(check)) {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "check panicked".to_string());
                    HealthCheck::new(
                        "panicked_check",
                        HealthStatus::Unhealthy,
                        format!("check failed: {}", message),
                        Map::new(),
                    )
                }
            };

            overall = overall.max(result.status);
            results.push(result);
        }

        HealthReport {
            status: overall,
            timestamp: Utc::now().to_rfc3339(),
            checks: results,
        }
    }
}

/// Log directory must exist (or be creatable) and be writable.
fn check_log_directory(log_path: &Path) -> HealthCheck {
    let dir = log_path.parent().unwrap_or(Path::new("."));
    let mut details = Map::new();
    details.insert("path".to_string(), json!(dir.display().to_string()));

    let probe = || -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        let probe_path = dir.join(".health_check");
        std::fs::write(&probe_path, "probe")?;
        std::fs::remove_file(&probe_path)?;
        Ok(())
    };

    match probe() {
        Ok(()) => HealthCheck::new(
            "log_directory",
            HealthStatus::Healthy,
            "log directory is writable",
            details,
        ),
        Err(e) => HealthCheck::new(
            "log_directory",
            HealthStatus::Unhealthy,
            format!("cannot write to log directory: {}", e),
            details,
        ),
    }
}

/// Template directory should exist and be listable; missing is degraded
/// (legitimate on a fresh install), unreadable is unhealthy.
fn check_template_directory(dir: &Path) -> HealthCheck {
    let mut details = Map::new();
    details.insert("path".to_string(), json!(dir.display().to_string()));

    if !dir.exists() {
        return HealthCheck::new(
            "template_directory",
            HealthStatus::Degraded,
            "template directory does not exist",
            details,
        );
    }

    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let count = entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    matches!(
                        e.path().extension().and_then(|x| x.to_str()),
                        Some("yaml") | Some("yml")
                    )
                })
                .count();
            details.insert("template_count".to_string(), json!(count));
            HealthCheck::new(
                "template_directory",
                HealthStatus::Healthy,
                format!("template directory accessible with {} templates", count),
                details,
            )
        }
        Err(e) => HealthCheck::new(
            "template_directory",
            HealthStatus::Unhealthy,
            format!("cannot access template directory: {}", e),
            details,
        ),
    }
}

/// API-key file should parse as YAML when present; absent is degraded.
fn check_api_keys_file(path: &Path) -> HealthCheck {
    let mut details = Map::new();
    details.insert("path".to_string(), json!(path.display().to_string()));

    if !path.exists() {
        return HealthCheck::new(
            "api_keys_file",
            HealthStatus::Degraded,
            "API keys file does not exist (expected for fresh install)",
            details,
        );
    }

    let load = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_yaml::from_str::<Value>(&text).map_err(|e| e.to_string()));

    match load {
        Ok(document) => {
            let key_count = document
                .get("keys")
                .and_then(Value::as_object)
                .map(|keys| keys.len())
                .unwrap_or(0);
            details.insert("key_count".to_string(), json!(key_count));
            HealthCheck::new(
                "api_keys_file",
                HealthStatus::Healthy,
                format!("API keys file loaded with {} keys", key_count),
                details,
            )
        }
        Err(e) => HealthCheck::new(
            "api_keys_file",
            HealthStatus::Unhealthy,
            format!("cannot load API keys file: {}", e),
            details,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_status_ordering() {
        assert!(HealthStatus::Healthy < HealthStatus::Degraded);
        assert!(HealthStatus::Degraded < HealthStatus::Unhealthy);
    }

    #[test]
    fn test_empty_checker_is_healthy() {
        let report = HealthChecker::new().run_checks();
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.checks.is_empty());
    }

    #[test]
    fn test_worst_status_wins() {
        let mut checker = HealthChecker::new();
        checker.register(|| {
            HealthCheck::new("ok", HealthStatus::Healthy, "fine", Map::new())
        });
        checker.register(|| {
            HealthCheck::new("meh", HealthStatus::Degraded, "hmm", Map::new())
        });

        assert_eq!(checker.run_checks().status, HealthStatus::Degraded);
    }

    #[test]
    fn test_panicking_check_is_unhealthy() {
        let mut checker = HealthChecker::new();
        checker.register(|| panic!("boom"));

        let report = checker.run_checks();
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.checks[0].message.contains("boom"));
    }

    #[test]
    fn test_default_checks_on_fresh_dirs() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            log_path: dir.path().join("logs/audit.log"),
            templates_dir: dir.path().join("missing_templates"),
            api_keys_path: dir.path().join("missing_keys.yaml"),
            ..Default::default()
        };

        let report = HealthChecker::with_defaults(&config).run_checks();
        assert_eq!(report.checks.len(), 3);
        // Writable log dir, missing templates dir, missing keys file.
        assert_eq!(report.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_keys_file_parse_failure_is_unhealthy() {
        let dir = TempDir::new().unwrap();
        let keys_path = dir.path().join("keys.yaml");
        std::fs::write(&keys_path, "keys: [broken").unwrap();

        let result = check_api_keys_file(&keys_path);
        assert_eq!(result.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_template_directory_counts_yaml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yaml"), "screen_id: a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "ignored").unwrap();

        let result = check_template_directory(dir.path());
        assert_eq!(result.status, HealthStatus::Healthy);
        assert_eq!(result.details["template_count"], json!(1));
    }
}
