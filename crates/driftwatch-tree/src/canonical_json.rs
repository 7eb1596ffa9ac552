//! # Canonical JSON Serialization
//!
//! Deterministic JSON rendering used by the signature engine and the hash
//! chain. Semantically identical JSON documents must produce identical byte
//! sequences, otherwise every hash in the system is unstable.
//!
//! ## Rules
//!
//! 1. **Object keys**: sorted lexicographically.
//! 2. **Whitespace**: none outside string literals.
//! 3. **Strings**: minimal escaping (quote, backslash, control characters).
//! 4. **Numbers**: shortest representation; whole floats render as integers.
//! 5. **Arrays**: element order preserved.
//!
//! ## Threat Model
//!
//! Canonicalization defends against:
//!
//! - **Key reordering**: JSON objects have no inherent key order; without
//!   sorting, the same drift event could hash two different ways and a
//!   forged log entry could masquerade as the original.
//!
//! - **Whitespace manipulation**: insignificant whitespace must not change
//!   a digest.
//!
//! # Example
//!
//! ```rust
//! use driftwatch_tree::canonical_json::canonicalize;
//! use serde_json::json;
//!
//! let a = canonicalize(&json!({"b": 1, "a": 2}));
//! let b = canonicalize(&json!({"a": 2, "b": 1}));
//! assert_eq!(a, b);
//! assert_eq!(a, r#"{"a":2,"b":1}"#);
//! ```

use sha2::{Digest, Sha256};

/// Renders a JSON value in canonical form.
///
/// The output is deterministic: semantically identical inputs always
/// produce bytewise identical outputs.
pub fn canonicalize(value: &serde_json::Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// SHA-256 of the canonical rendering of a JSON value, as 64 lowercase
/// hex characters.
///
/// This is the primary digest function: signatures and hash-chain links
/// are all built on it.
///
/// # Example
///
/// ```rust
/// use driftwatch_tree::canonical_json::hash_canonical;
/// use serde_json::json;
///
/// let h1 = hash_canonical(&json!({"b": 1, "a": 2}));
/// let h2 = hash_canonical(&json!({"a": 2, "b": 1}));
/// assert_eq!(h1, h2);
/// assert_eq!(h1.len(), 64);
/// ```
pub fn hash_canonical(value: &serde_json::Value) -> String {
    sha256_hex(canonicalize(value).as_bytes())
}

/// SHA-256 of raw bytes as 64 lowercase hex characters.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn write_value(out: &mut String, value: &serde_json::Value) {
    match value {
        serde_json::Value::Null => out.push_str("null"),
        serde_json::Value::Bool(true) => out.push_str("true"),
        serde_json::Value::Bool(false) => out.push_str("false"),
        serde_json::Value::Number(n) => write_number(out, n),
        serde_json::Value::String(s) => write_string(out, s),
        serde_json::Value::Array(arr) => {
            out.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        serde_json::Value::Object(obj) => {
            // Sort keys for a deterministic rendering regardless of how the
            // map was built.
            let mut entries: Vec<(&String, &serde_json::Value)> = obj.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, val);
            }
            out.push('}');
        }
    }
}

/// Writes a number in its shortest form. Whole floats render without a
/// fractional part so that `1.0` and `1` hash identically.
fn write_number(out: &mut String, n: &serde_json::Number) {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
    } else if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
    } else if let Some(f) = n.as_f64() {
        if f.fract() == 0.0 && f.abs() < (i64::MAX as f64) {
            out.push_str(&(f as i64).to_string());
        } else {
            out.push_str(&f.to_string());
        }
    } else {
        out.push_str(&n.to_string());
    }
}

/// Writes a string literal with minimal escaping: only the quote, the
/// backslash, and control characters below 0x20 are escaped.
fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
