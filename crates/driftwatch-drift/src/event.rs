//! # Drift Events
//!
//! Typed records of detected drift. Every finding the pipeline produces -
//! a layout change, a content change, an illegal transition, a manipulative
//! pattern - becomes a [`DriftEvent`] before it reaches the audit log.
//!
//! Event ids are content-derived: the first 16 hex characters of
//! `SHA-256(drift_type:severity:timestamp)`. Two events of the same kind at
//! the same instant are the same finding.
//!
//! Timestamps are epoch seconds from a monotonic-guarded wall clock:
//! successive events never share or reverse a timestamp even if the system
//! clock steps backwards.

use driftwatch_tree::sha256_hex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Category of detected drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftType {
    /// Structural changes to the UI.
    Layout,
    /// Text or data changes.
    Content,
    /// Unexpected state transitions.
    Sequence,
    /// Dark patterns (forced flows, loops).
    Manipulative,
}

impl fmt::Display for DriftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Layout => "layout",
            Self::Content => "content",
            Self::Sequence => "sequence",
            Self::Manipulative => "manipulative",
        };
        f.write_str(s)
    }
}

/// How serious a finding is. Ordered: `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor expected variation.
    Info,
    /// Noteworthy change.
    Warning,
    /// Significant drift or manipulation.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// The kind of change an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Node present in the observation but not the baseline.
    Added,
    /// Node present in the baseline but not the observation.
    Removed,
    /// Node present on both sides with property changes.
    Modified,
    /// Required node absent.
    Missing,
    /// Transition not in the allowed set.
    InvalidTransition,
    /// Navigation path with no alternatives.
    ForcedFlow,
}

/// A single detected deviation from baseline expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftEvent {
    /// Content-derived identifier (16 hex chars).
    pub event_id: String,

    /// Drift category.
    pub drift_type: DriftType,

    /// Finding severity.
    pub severity: Severity,

    /// Free-form payload describing the finding.
    pub details: Map<String, Value>,

    /// Epoch seconds when the event was constructed.
    pub timestamp: f64,

    /// Path expression locating the change in the tree, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Kind of change, when one applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<ChangeType>,
}

impl DriftEvent {
    /// Constructs an event, stamping the clock and deriving the id.
    pub fn new(drift_type: DriftType, severity: Severity, details: Map<String, Value>) -> Self {
        let timestamp = now_seconds();
        Self {
            event_id: event_id(drift_type, severity, timestamp),
            drift_type,
            severity,
            details,
            timestamp,
            location: None,
            change_type: None,
        }
    }

    /// Sets the tree location of the finding.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the change type of the finding.
    #[must_use]
    pub fn with_change_type(mut self, change_type: ChangeType) -> Self {
        self.change_type = Some(change_type);
        self
    }

    /// Layout drift: structural changes against the matched baseline.
    ///
    /// Severity escalates with dissimilarity: `critical` below 0.7,
    /// `warning` below 0.9, `info` otherwise.
    pub fn layout_drift(screen_id: &str, similarity: f64, diff_summary: &str) -> Self {
        let severity = if similarity < 0.7 {
            Severity::Critical
        } else if similarity < 0.9 {
            Severity::Warning
        } else {
            Severity::Info
        };

        let mut details = Map::new();
        details.insert("screen_id".to_string(), json!(screen_id));
        details.insert("similarity".to_string(), json!(similarity));
        details.insert("diff_summary".to_string(), json!(diff_summary));

        Self::new(DriftType::Layout, severity, details)
    }

    /// Content drift: text or value changes with the structure intact.
    pub fn content_drift(screen_id: &str, changes: Map<String, Value>) -> Self {
        let mut details = Map::new();
        details.insert("screen_id".to_string(), json!(screen_id));
        details.insert("changes".to_string(), Value::Object(changes));

        Self::new(DriftType::Content, Severity::Info, details)
    }

    /// Sequence drift: a transition outside the allowed set.
    pub fn sequence_drift(invalid_transition: &str, expected: &[String]) -> Self {
        let mut details = Map::new();
        details.insert("invalid_transition".to_string(), json!(invalid_transition));
        details.insert("expected_transitions".to_string(), json!(expected));

        Self::new(DriftType::Sequence, Severity::Warning, details)
            .with_change_type(ChangeType::InvalidTransition)
    }

    /// Manipulative drift: a detected dark pattern.
    pub fn manipulative_drift(pattern_type: &str, description: &str, flow: &[String]) -> Self {
        let mut details = Map::new();
        details.insert("pattern_type".to_string(), json!(pattern_type));
        details.insert("description".to_string(), json!(description));
        details.insert("flow".to_string(), json!(flow));

        Self::new(DriftType::Manipulative, Severity::Critical, details)
            .with_change_type(ChangeType::ForcedFlow)
    }

    /// True for critical findings.
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("[{}]", self.severity.to_string().to_uppercase()),
            format!("Drift Type: {}", self.drift_type),
        ];

        if let Some(screen) = self.details.get("screen_id").and_then(Value::as_str) {
            parts.push(format!("Screen: {}", screen));
        }
        if let Some(similarity) = self.details.get("similarity").and_then(Value::as_f64) {
            parts.push(format!("Similarity: {:.1}%", similarity * 100.0));
        }

        parts.join(" | ")
    }

    /// Serializes the event to a JSON object for logging.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn event_id(drift_type: DriftType, severity: Severity, timestamp: f64) -> String {
    let material = format!("{}:{}:{}", drift_type, severity, timestamp);
    sha256_hex(material.as_bytes())[..16].to_string()
}

/// Wall clock in epoch seconds, guarded to never repeat or run backwards
/// within this process.
pub fn now_seconds() -> f64 {
    static LAST: Mutex<f64> = Mutex::new(0.0);

    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let mut last = match LAST.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let stamped = if wall > *last { wall } else { *last + 1e-6 };
    *last = stamped;
    stamped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_shape() {
        let event = DriftEvent::new(DriftType::Layout, Severity::Info, Map::new());
        assert_eq!(event.event_id.len(), 16);
        assert!(event.event_id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_layout_severity_thresholds() {
        assert_eq!(
            DriftEvent::layout_drift("s", 0.5, "").severity,
            Severity::Critical
        );
        assert_eq!(
            DriftEvent::layout_drift("s", 0.8, "").severity,
            Severity::Warning
        );
        assert_eq!(
            DriftEvent::layout_drift("s", 0.95, "").severity,
            Severity::Info
        );
    }

    #[test]
    fn test_content_drift_is_info() {
        let event = DriftEvent::content_drift("s", Map::new());
        assert_eq!(event.severity, Severity::Info);
        assert_eq!(event.drift_type, DriftType::Content);
    }

    #[test]
    fn test_sequence_drift_fields() {
        let event = DriftEvent::sequence_drift("a -> b", &["a -> c".to_string()]);
        assert_eq!(event.severity, Severity::Warning);
        assert_eq!(event.change_type, Some(ChangeType::InvalidTransition));
        assert_eq!(
            event.details.get("invalid_transition"),
            Some(&json!("a -> b"))
        );
    }

    #[test]
    fn test_manipulative_drift_is_critical() {
        let flow = vec!["a".to_string(), "b".to_string()];
        let event = DriftEvent::manipulative_drift("forced_flow", "no alternatives", &flow);
        assert!(event.is_critical());
        assert_eq!(event.change_type, Some(ChangeType::ForcedFlow));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn test_serialization_keys() {
        let event = DriftEvent::layout_drift("login", 0.6, "2 removed");
        let value = event.to_value();

        for key in ["event_id", "drift_type", "severity", "details", "timestamp"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        assert_eq!(value.get("drift_type"), Some(&json!("layout")));
        // Unset optional fields are omitted entirely.
        assert!(value.get("location").is_none());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let a = now_seconds();
        let b = now_seconds();
        let c = now_seconds();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_summary_mentions_screen() {
        let event = DriftEvent::layout_drift("checkout", 0.65, "");
        let summary = event.summary();
        assert!(summary.contains("[CRITICAL]"));
        assert!(summary.contains("checkout"));
    }
}
