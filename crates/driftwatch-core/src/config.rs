//! Configuration for the DriftWatch service.
//!
//! Built-in defaults overridden by `DW_*` environment variables. Invalid
//! values fall back to the default for that option rather than failing
//! startup: a typo in a rate limit should not take the auditor offline.

use std::path::PathBuf;

/// Service configuration snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Minimum severity emitted by the logger (`trace`..`error`).
    pub log_level: String,

    /// Structured JSON log lines instead of the human format.
    pub json_logs: bool,

    /// Path to the append-only audit log.
    pub log_path: PathBuf,

    /// Directory holding baseline template YAML files.
    pub templates_dir: PathBuf,

    /// Directory where captures are persisted.
    pub captures_dir: PathBuf,

    /// Gate for the `/health` endpoint (404 when disabled).
    pub enable_health: bool,

    /// Gate for the `/metrics` endpoint (404 when disabled).
    pub enable_metrics: bool,

    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,

    /// Sustained request limit per client per minute.
    pub rate_limit_rpm: u32,

    /// Burst request limit per client per 5 seconds.
    pub rate_limit_burst: u32,

    /// Request body cap in megabytes.
    pub max_request_size_mb: usize,

    /// Master switch for rate limiting.
    pub enable_rate_limiting: bool,

    /// Host allow list; empty allows all.
    pub trusted_hosts: Vec<String>,

    /// Path to the API-key YAML store.
    pub api_keys_path: PathBuf,

    /// Matcher acceptance threshold.
    pub match_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            log_path: PathBuf::from("logs/driftwatch.log"),
            templates_dir: PathBuf::from("templates"),
            captures_dir: PathBuf::from("captures"),
            enable_health: true,
            enable_metrics: true,
            cors_origins: vec![
                "http://localhost".to_string(),
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
                "http://127.0.0.1".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
            rate_limit_rpm: 100,
            rate_limit_burst: 20,
            max_request_size_mb: 10,
            enable_rate_limiting: true,
            trusted_hosts: Vec::new(),
            api_keys_path: PathBuf::from("config/api_keys.yaml"),
            match_threshold: 0.8,
        }
    }
}

impl Config {
    /// Builds a configuration from defaults plus `DW_*` environment
    /// overrides.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(level) = env_var("DW_LOG_LEVEL") {
            let level = level.to_lowercase();
            if ["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
                cfg.log_level = level;
            }
        }
        cfg.json_logs = env_bool("DW_JSON_LOGS", cfg.json_logs);

        if let Some(path) = env_var("DW_LOG_PATH") {
            cfg.log_path = PathBuf::from(path);
        }
        if let Some(dir) = env_var("DW_TEMPLATES_DIR") {
            cfg.templates_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_var("DW_CAPTURES_DIR") {
            cfg.captures_dir = PathBuf::from(dir);
        }
        if let Some(path) = env_var("DW_API_KEYS_PATH") {
            cfg.api_keys_path = PathBuf::from(path);
        }

        cfg.enable_health = env_bool("DW_ENABLE_HEALTH", cfg.enable_health);
        cfg.enable_metrics = env_bool("DW_ENABLE_METRICS", cfg.enable_metrics);
        cfg.enable_rate_limiting = env_bool("DW_ENABLE_RATE_LIMITING", cfg.enable_rate_limiting);

        if let Some(origins) = env_var("DW_CORS_ORIGINS") {
            cfg.cors_origins = split_csv(&origins);
        }
        if let Some(hosts) = env_var("DW_TRUSTED_HOSTS") {
            cfg.trusted_hosts = split_csv(&hosts);
        }

        cfg.rate_limit_rpm = env_parse("DW_RATE_LIMIT_RPM", cfg.rate_limit_rpm);
        cfg.rate_limit_burst = env_parse("DW_RATE_LIMIT_BURST", cfg.rate_limit_burst);
        cfg.max_request_size_mb = env_parse("DW_MAX_REQUEST_SIZE_MB", cfg.max_request_size_mb);
        cfg.match_threshold = env_parse("DW_MATCH_THRESHOLD", cfg.match_threshold);

        cfg
    }

    /// Request body cap in bytes.
    pub fn max_request_size_bytes(&self) -> usize {
        self.max_request_size_mb * 1024 * 1024
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    match env_var(name) {
        None => default,
        Some(v) => matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
    }
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    env_var(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.rate_limit_rpm, 100);
        assert_eq!(cfg.rate_limit_burst, 20);
        assert_eq!(cfg.max_request_size_mb, 10);
        assert!(cfg.enable_rate_limiting);
        assert_eq!(cfg.match_threshold, 0.8);
    }

    #[test]
    fn test_size_cap_in_bytes() {
        let cfg = Config::default();
        assert_eq!(cfg.max_request_size_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_csv_splitting() {
        assert_eq!(
            split_csv("http://a.example, http://b.example ,,"),
            vec!["http://a.example", "http://b.example"]
        );
        assert!(split_csv("").is_empty());
    }
}
