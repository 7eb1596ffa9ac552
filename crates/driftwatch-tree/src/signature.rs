//! # Signature Engine
//!
//! Derives the `{full, structural, content}` signature triple from a
//! canonical tree. Each signature is a 64-char lowercase hex SHA-256 and
//! each answers a different question:
//!
//! | Signature | Question | Sensitive to |
//! |-----------|----------|--------------|
//! | `full` | Is anything different? | every tracked attribute, structure, text |
//! | `structural` | Is the layout different? | `(role, type, shape)` only |
//! | `content` | Is the text different? | the multiset of node names |
//!
//! The split is what lets the pipeline tell a price change (content moved,
//! structure intact) from a removed button (structure moved) without
//! diffing first.
//!
//! ## Guarantees
//!
//! - Equivalent trees yield equal triples.
//! - Any non-equivalent change alters `full`.
//! - A structural rearrangement alters `structural` even when all names
//!   are unchanged; a pure content change never does.

use crate::canonical_json::{hash_canonical, sha256_hex};
use crate::node::{CanonicalNode, CanonicalTree};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Keys removed before computing the `full` signature.
///
/// Canonicalization already strips transients; the ignore set is enforced
/// here a second time so a signature computed over an externally supplied
/// JSON document obeys the same rules. `focused` is additionally excluded:
/// focus placement changes on every interaction and is not drift.
const FULL_IGNORE_KEYS: [&str; 4] = ["timestamp", "id", "instance_id", "focused"];

/// The three digests derived from one canonical tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureTriple {
    /// Hash of the whole canonical tree minus the ignore set.
    pub full: String,

    /// Hash of the `(role, type, children)` projection.
    pub structural: String,

    /// Hash of the sorted, `|`-joined non-empty names.
    pub content: String,
}

/// Computes the signature triple for a canonical tree.
///
/// # Example
///
/// ```rust
/// use driftwatch_tree::{generate_signatures, normalize};
/// use serde_json::json;
///
/// let tree = normalize(&json!({"role": "window", "name": "main"}));
/// let sigs = generate_signatures(&tree);
/// assert_eq!(sigs.full.len(), 64);
/// assert_eq!(generate_signatures(&tree), sigs); // deterministic
/// ```
pub fn generate_signatures(tree: &CanonicalTree) -> SignatureTriple {
    SignatureTriple {
        full: full_signature(tree),
        structural: structural_signature(tree),
        content: content_signature(tree),
    }
}

/// Hash of the canonical JSON of the tree with the ignore set removed.
pub fn full_signature(tree: &CanonicalTree) -> String {
    let mut value = tree.to_value();
    strip_ignored(&mut value);
    hash_canonical(&value)
}

/// Hash of the recursive `{role, type, children}` projection.
pub fn structural_signature(tree: &CanonicalTree) -> String {
    let projected = match &tree.root {
        Some(root) => json!({ "root": project_structure(root) }),
        None => json!({}),
    };
    hash_canonical(&projected)
}

/// Hash of the `|`-joined, lexicographically sorted non-empty names.
pub fn content_signature(tree: &CanonicalTree) -> String {
    let mut names = tree.names();
    names.sort_unstable();
    sha256_hex(names.join("|").as_bytes())
}

fn project_structure(node: &CanonicalNode) -> Value {
    json!({
        "role": node.role,
        "type": node.kind,
        "children": node
            .children
            .iter()
            .map(project_structure)
            .collect::<Vec<Value>>(),
    })
}

fn strip_ignored(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            for key in FULL_IGNORE_KEYS {
                obj.remove(key);
            }
            for (_, v) in obj.iter_mut() {
                strip_ignored(v);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                strip_ignored(v);
            }
        }
        _ => {}
    }
}
