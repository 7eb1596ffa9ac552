//! # Template Validation
//!
//! Structural validation of template documents *before* they are
//! deserialized into [`crate::Template`]. Working on the raw JSON value
//! keeps the diagnostics specific ("required_nodes must be a list") instead
//! of surfacing a generic deserialization error, and guarantees a malformed
//! template is rejected synchronously and never reaches the store.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// 64 lowercase hex characters - the shape of a SHA-256 digest.
fn signature_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("^[0-9a-f]{64}$").expect("static pattern compiles"))
}

/// Validates a template document.
///
/// Equivalent to [`validate_with_errors`] returning no diagnostics.
pub fn validate(template: &Value) -> bool {
    validate_with_errors(template).is_empty()
}

/// Validates a template document and returns every diagnostic found.
///
/// Checks:
/// - the document is a non-empty mapping;
/// - `screen_id` is present and a non-empty string;
/// - `required_nodes`, if present, is a list of strings;
/// - `structure_signature`, if present, is a string, and when non-empty a
///   64-character lowercase hex digest;
/// - `valid_transitions`, if present, is a list of strings, each either
///   empty or containing `" -> "`;
/// - `metadata`, if present, is a mapping.
///
/// # Example
///
/// ```rust
/// use driftwatch_baseline::validate_with_errors;
/// use serde_json::json;
///
/// let errors = validate_with_errors(&json!({"required_nodes": "oops"}));
/// assert!(errors.iter().any(|e| e.contains("screen_id")));
/// assert!(errors.iter().any(|e| e.contains("required_nodes")));
/// ```
pub fn validate_with_errors(template: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let obj = match template.as_object() {
        Some(obj) if !obj.is_empty() => obj,
        _ => {
            errors.push("template must be a non-empty mapping".to_string());
            return errors;
        }
    };

    match obj.get("screen_id") {
        None => errors.push("missing required field: screen_id".to_string()),
        Some(Value::String(s)) if !s.is_empty() => {}
        Some(_) => errors.push("screen_id must be a non-empty string".to_string()),
    }

    if let Some(nodes) = obj.get("required_nodes") {
        match nodes.as_array() {
            None => errors.push("required_nodes must be a list".to_string()),
            Some(items) => {
                if !items.iter().all(Value::is_string) {
                    errors.push("all required_nodes must be strings".to_string());
                }
            }
        }
    }

    if let Some(sig) = obj.get("structure_signature") {
        match sig.as_str() {
            None => errors.push("structure_signature must be a string".to_string()),
            Some(s) if !s.is_empty() && !signature_pattern().is_match(s) => {
                errors.push("structure_signature must be a 64-character hex digest".to_string());
            }
            Some(_) => {}
        }
    }

    if let Some(transitions) = obj.get("valid_transitions") {
        match transitions.as_array() {
            None => errors.push("valid_transitions must be a list".to_string()),
            Some(items) => {
                for (i, transition) in items.iter().enumerate() {
                    match transition.as_str() {
                        None => errors.push(format!("transition {} must be a string", i)),
                        Some(s) if !s.is_empty() && !s.contains(" -> ") => {
                            errors.push(format!("invalid transition format: {}", s));
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }

    if let Some(metadata) = obj.get("metadata") {
        if !metadata.is_object() {
            errors.push("metadata must be a mapping".to_string());
        }
    }

    errors
}
