//! # Canonical Tree Model
//!
//! Typed representation of a normalized UI tree. The model is deliberately
//! closed: only the recognised properties `{visible, enabled, focused,
//! value, secure}`, optional `bounds`, and an ordered child sequence exist.
//! Transient keys (`timestamp`, `id`, `instance_id`, `hash`) cannot be
//! represented at all, which makes "canonical form contains no transients"
//! a property of the type rather than a runtime promise.

use serde::{Deserialize, Serialize};

/// Pixel rectangle of a node on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width in pixels.
    pub width: i64,
    /// Height in pixels.
    pub height: i64,
}

/// A single node of a canonical UI tree.
///
/// Invariants maintained by [`crate::normalize`]:
///
/// - `role` is lowercase.
/// - `name` has alias keys (`label`, `title`, `text`, `description`)
///   already folded in; an explicit `name` wins over any alias.
/// - `children` is sorted ascending by `(role, name, type)`, stable for
///   equal triples.
///
/// # Example
///
/// ```rust
/// use driftwatch_tree::CanonicalNode;
///
/// let button = CanonicalNode {
///     role: "button".to_string(),
///     name: "login_button".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(button.sort_key(), ("button", "login_button", ""));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalNode {
    /// Accessibility role, lowercase (e.g. `button`, `textbox`).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role: String,

    /// Accessible name; empty when the node is unnamed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Platform widget type; empty when unknown.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Whether the node is currently visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,

    /// Whether the node accepts interaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Whether the node holds input focus. Excluded from the `full`
    /// signature: focus moves constantly and is not drift.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,

    /// Whether the node masks its content (password fields).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure: Option<bool>,

    /// Displayed value (text content, amounts, toggle state).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    /// On-screen rectangle, when the driver reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,

    /// Ordered child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CanonicalNode>,
}

impl CanonicalNode {
    /// The deterministic ordering key for child sorting.
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (&self.role, &self.name, &self.kind)
    }

    /// Total number of nodes in the subtree rooted here (including self).
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(CanonicalNode::count).sum::<usize>()
    }

    /// Depth of the subtree rooted here. A leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Collects every non-empty `name` in the subtree, depth-first.
    pub fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        if !self.name.is_empty() {
            out.push(&self.name);
        }
        for child in &self.children {
            child.collect_names(out);
        }
    }

    /// Collects every non-empty `role` in the subtree.
    pub fn collect_roles<'a>(&'a self, out: &mut std::collections::BTreeSet<&'a str>) {
        if !self.role.is_empty() {
            out.insert(&self.role);
        }
        for child in &self.children {
            child.collect_roles(out);
        }
    }
}

/// Envelope around the root node of a canonical tree.
///
/// A tree with `root: None` is the *empty* canonical tree, produced when
/// normalization receives no usable input. All top-level fields other than
/// `root` are transient by definition and do not survive normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalTree {
    /// The root node, absent for the empty tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<CanonicalNode>,
}

impl CanonicalTree {
    /// Returns the empty canonical tree.
    pub fn empty() -> Self {
        Self { root: None }
    }

    /// True when the tree has no root node.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Total node count, 0 for the empty tree.
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map(CanonicalNode::count).unwrap_or(0)
    }

    /// Tree depth, 0 for the empty tree and for a childless root.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map(CanonicalNode::depth).unwrap_or(0)
    }

    /// All non-empty node names, depth-first order.
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.collect_names(&mut out);
        }
        out
    }

    /// The set of distinct roles present in the tree.
    pub fn roles(&self) -> std::collections::BTreeSet<&str> {
        let mut out = std::collections::BTreeSet::new();
        if let Some(root) = &self.root {
            root.collect_roles(&mut out);
        }
        out
    }

    /// Serializes the tree to a JSON value.
    ///
    /// Serialization of a canonical tree cannot fail: the model contains
    /// only JSON-representable data.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(role: &str, name: &str) -> CanonicalNode {
        CanonicalNode {
            role: role.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_tree() {
        let tree = CanonicalTree::empty();
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.depth(), 0);
        assert!(tree.names().is_empty());
    }

    #[test]
    fn test_count_and_depth() {
        let tree = CanonicalTree {
            root: Some(CanonicalNode {
                role: "window".to_string(),
                children: vec![
                    leaf("button", "ok"),
                    CanonicalNode {
                        role: "pane".to_string(),
                        children: vec![leaf("text", "hello")],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
        };

        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_names_skip_empty() {
        let tree = CanonicalTree {
            root: Some(CanonicalNode {
                role: "window".to_string(),
                children: vec![leaf("button", "ok"), leaf("pane", "")],
                ..Default::default()
            }),
        };

        assert_eq!(tree.names(), vec!["ok"]);
    }

    #[test]
    fn test_roles_are_deduplicated() {
        let tree = CanonicalTree {
            root: Some(CanonicalNode {
                role: "window".to_string(),
                children: vec![leaf("button", "a"), leaf("button", "b")],
                ..Default::default()
            }),
        };

        let roles: Vec<&str> = tree.roles().into_iter().collect();
        assert_eq!(roles, vec!["button", "window"]);
    }

    #[test]
    fn test_serialization_is_sparse() {
        let tree = CanonicalTree {
            root: Some(leaf("button", "ok")),
        };

        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(json, r#"{"root":{"role":"button","name":"ok"}}"#);
    }

    #[test]
    fn test_roundtrip() {
        let tree = CanonicalTree {
            root: Some(CanonicalNode {
                role: "textbox".to_string(),
                name: "email".to_string(),
                value: Some(serde_json::json!("a@b.c")),
                visible: Some(true),
                bounds: Some(Bounds {
                    x: 0,
                    y: 10,
                    width: 200,
                    height: 30,
                }),
                ..Default::default()
            }),
        };

        let json = serde_json::to_string(&tree).unwrap();
        let parsed: CanonicalTree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, parsed);
    }
}
