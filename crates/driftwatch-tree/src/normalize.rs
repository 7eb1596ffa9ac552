//! # Tree Normalizer
//!
//! Reduces a raw accessibility snapshot to canonical form. The normalizer
//! is pure and total: the same input always yields the same output and no
//! input can make it fail - unusable input simply collapses to the empty
//! tree.
//!
//! Steps, in order, at every depth:
//!
//! 1. Drop transient keys (`timestamp`, `id`, `instance_id`, `hash`).
//! 2. Fold alias keys (`label`, `title`, `text`, `description`) into
//!    `name`; an explicit `name` always wins, otherwise the first alias
//!    present (in that order) does.
//! 3. Lowercase `role`.
//! 4. Recurse into children, omit nulls, sort ascending by
//!    `(role, name, type)` with a stable sort.
//!
//! Normalizing a canonical tree is the identity: the model cannot hold
//! transients or aliases, roles are already lowercase, and sorting a
//! sorted sequence is a no-op.

use crate::node::{Bounds, CanonicalNode, CanonicalTree};
use serde_json::Value;

/// Alias keys folded into `name`, in precedence order.
const NAME_ALIASES: [&str; 4] = ["label", "title", "text", "description"];

/// Normalizes a raw snapshot into a canonical tree.
///
/// Accepts either an envelope (`{"root": {...}}`) or a bare node object.
/// Anything else - `null`, scalars, arrays, an empty object - produces the
/// empty canonical tree.
///
/// # Example
///
/// ```rust
/// use driftwatch_tree::normalize;
/// use serde_json::json;
///
/// let raw = json!({
///     "timestamp": 1722000000,
///     "root": {
///         "role": "Window",
///         "label": "Login",
///         "children": [
///             {"role": "textbox", "name": "email_input", "id": 42},
///             {"role": "button", "name": "login_button"},
///         ]
///     }
/// });
///
/// let tree = normalize(&raw);
/// let root = tree.root.unwrap();
/// assert_eq!(root.role, "window");
/// assert_eq!(root.name, "Login");
/// assert_eq!(root.children[0].role, "button");
/// ```
pub fn normalize(raw: &Value) -> CanonicalTree {
    let obj = match raw.as_object() {
        Some(obj) if !obj.is_empty() => obj,
        _ => return CanonicalTree::empty(),
    };

    let root = if let Some(root_value) = obj.get("root") {
        normalize_node(root_value)
    } else {
        normalize_node(raw)
    };

    CanonicalTree { root }
}

/// Normalizes a single raw node. Non-object input yields no node.
fn normalize_node(value: &Value) -> Option<CanonicalNode> {
    let obj = value.as_object()?;

    let role = string_field(obj.get("role")).to_lowercase();
    let kind = string_field(obj.get("type"));

    // name wins over any alias; otherwise the first alias present does.
    let mut name = string_field(obj.get("name"));
    if name.is_empty() {
        for alias in NAME_ALIASES {
            let folded = string_field(obj.get(alias));
            if !folded.is_empty() {
                name = folded;
                break;
            }
        }
    }

    let mut children: Vec<CanonicalNode> = obj
        .get("children")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(normalize_node).collect())
        .unwrap_or_default();
    children.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    Some(CanonicalNode {
        role,
        name,
        kind,
        visible: obj.get("visible").and_then(Value::as_bool),
        enabled: obj.get("enabled").and_then(Value::as_bool),
        focused: obj.get("focused").and_then(Value::as_bool),
        secure: obj.get("secure").and_then(Value::as_bool),
        value: obj.get("value").filter(|v| !v.is_null()).cloned(),
        bounds: obj.get("bounds").and_then(parse_bounds),
        children,
    })
}

/// Coerces a scalar JSON value to a string field. Objects, arrays, and
/// nulls coerce to empty.
fn string_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn parse_bounds(value: &Value) -> Option<Bounds> {
    let obj = value.as_object()?;
    Some(Bounds {
        x: obj.get("x").and_then(Value::as_i64).unwrap_or(0),
        y: obj.get("y").and_then(Value::as_i64).unwrap_or(0),
        width: obj.get("width").and_then(Value::as_i64).unwrap_or(0),
        height: obj.get("height").and_then(Value::as_i64).unwrap_or(0),
    })
}
