//! # Diff Engine
//!
//! Recursive structural comparison of two canonical trees, producing the
//! added / removed / modified node sets and an overall similarity metric.
//!
//! ## Rules
//!
//! - Two nodes are **comparable** iff they share a role or a type.
//!   Incomparable pairs yield one `removed` (baseline side) and one
//!   `added` (observed side) and recursion stops there.
//! - Comparable nodes land in `modified` when any tracked property -
//!   `role`, `name`, `type`, `visible`, `enabled`, `value` - differs;
//!   only the changed keys are recorded, as `(old, new)` pairs.
//! - Children pair by index; a missing slot on either side yields a
//!   single-sided entry.
//! - `similarity = (total − Δ) / total` where `Δ` counts added + removed +
//!   modified and `total` additionally counts unchanged nodes (1 when the
//!   diff saw nothing at all). Empty vs empty is 1; one side empty is 0.
//!
//! Paths are slash-separated from `root` with child indices in brackets:
//! `root/children[2]`.

use driftwatch_tree::{CanonicalNode, CanonicalTree};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Tracked properties recorded in modification entries.
const TRACKED_PROPERTIES: [&str; 6] = ["role", "name", "type", "visible", "enabled", "value"];

/// Identity slice of a node, enough to recognise it in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSummary {
    /// Node role.
    pub role: String,
    /// Node name.
    pub name: String,
    /// Node widget type.
    #[serde(rename = "type")]
    pub kind: String,
}

impl NodeSummary {
    fn of(node: &CanonicalNode) -> Self {
        Self {
            role: node.role.clone(),
            name: node.name.clone(),
            kind: node.kind.clone(),
        }
    }
}

/// A node present on only one side of the diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Tree path of the slot.
    pub path: String,
    /// The node occupying (or vacating) it.
    pub node: NodeSummary,
}

/// A node present on both sides with property changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifiedNode {
    /// Tree path of the node.
    pub path: String,
    /// Identity of the observed node.
    pub node: NodeSummary,
    /// Changed properties as `name → (old, new)`.
    pub changes: BTreeMap<String, (Value, Value)>,
}

/// Outcome of diffing two canonical trees.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiffResult {
    /// Nodes only in the observed tree.
    pub added: Vec<DiffEntry>,
    /// Nodes only in the baseline tree.
    pub removed: Vec<DiffEntry>,
    /// Nodes with property changes.
    pub modified: Vec<ModifiedNode>,
    /// Count of fully-equal compared nodes.
    pub unchanged_count: usize,
    /// Overall similarity in `[0, 1]`.
    pub similarity: f64,
}

impl DiffResult {
    /// Total number of change entries.
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// True when the trees were identical.
    pub fn is_identical(&self) -> bool {
        self.change_count() == 0
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Similarity: {:.1}%\nAdded: {} nodes\nRemoved: {} nodes\nModified: {} nodes\nUnchanged: {} nodes",
            self.similarity * 100.0,
            self.added.len(),
            self.removed.len(),
            self.modified.len(),
            self.unchanged_count,
        )
    }
}

/// Stateless recursive diff over canonical trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Creates a diff engine.
    pub fn new() -> Self {
        Self
    }

    /// Diffs baseline `a` against observation `b`.
    pub fn diff(&self, a: &CanonicalTree, b: &CanonicalTree) -> DiffResult {
        match (&a.root, &b.root) {
            (None, None) => DiffResult {
                similarity: 1.0,
                ..Default::default()
            },
            (None, Some(root_b)) => DiffResult {
                added: vec![DiffEntry {
                    path: "root".to_string(),
                    node: NodeSummary::of(root_b),
                }],
                similarity: 0.0,
                ..Default::default()
            },
            (Some(root_a), None) => DiffResult {
                removed: vec![DiffEntry {
                    path: "root".to_string(),
                    node: NodeSummary::of(root_a),
                }],
                similarity: 0.0,
                ..Default::default()
            },
            (Some(root_a), Some(root_b)) => {
                let mut result = DiffResult::default();
                diff_nodes(root_a, root_b, "root", &mut result);

                let delta = result.change_count();
                let total = delta + result.unchanged_count;
                result.similarity = if total == 0 {
                    1.0
                } else {
                    (total - delta) as f64 / total as f64
                };
                result
            }
        }
    }

    /// Whether the diff crosses the significance threshold (default 0.9:
    /// anything below is significant).
    pub fn has_significant_changes(&self, result: &DiffResult, threshold: f64) -> bool {
        result.similarity < threshold
    }
}

fn diff_nodes(a: &CanonicalNode, b: &CanonicalNode, path: &str, out: &mut DiffResult) {
    if !nodes_comparable(a, b) {
        out.removed.push(DiffEntry {
            path: path.to_string(),
            node: NodeSummary::of(a),
        });
        out.added.push(DiffEntry {
            path: path.to_string(),
            node: NodeSummary::of(b),
        });
        return;
    }

    let changes = property_changes(a, b);
    if changes.is_empty() {
        out.unchanged_count += 1;
    } else {
        out.modified.push(ModifiedNode {
            path: path.to_string(),
            node: NodeSummary::of(b),
            changes,
        });
    }

    let max_len = a.children.len().max(b.children.len());
    for i in 0..max_len {
        let child_path = format!("{}/children[{}]", path, i);
        match (a.children.get(i), b.children.get(i)) {
            (Some(child_a), Some(child_b)) => diff_nodes(child_a, child_b, &child_path, out),
            (Some(child_a), None) => out.removed.push(DiffEntry {
                path: child_path,
                node: NodeSummary::of(child_a),
            }),
            (None, Some(child_b)) => out.added.push(DiffEntry {
                path: child_path,
                node: NodeSummary::of(child_b),
            }),
            (None, None) => unreachable!("index bounded by max_len"),
        }
    }
}

/// Comparable iff the nodes share a role or a type.
fn nodes_comparable(a: &CanonicalNode, b: &CanonicalNode) -> bool {
    a.role == b.role || a.kind == b.kind
}

fn property_changes(a: &CanonicalNode, b: &CanonicalNode) -> BTreeMap<String, (Value, Value)> {
    let mut changes = BTreeMap::new();

    for property in TRACKED_PROPERTIES {
        let (old, new) = match property {
            "role" => (string_prop(&a.role), string_prop(&b.role)),
            "name" => (string_prop(&a.name), string_prop(&b.name)),
            "type" => (string_prop(&a.kind), string_prop(&b.kind)),
            "visible" => (bool_prop(a.visible), bool_prop(b.visible)),
            "enabled" => (bool_prop(a.enabled), bool_prop(b.enabled)),
            "value" => (
                a.value.clone().unwrap_or(Value::Null),
                b.value.clone().unwrap_or(Value::Null),
            ),
            _ => unreachable!("property list is fixed"),
        };

        if old != new {
            changes.insert(property.to_string(), (old, new));
        }
    }

    changes
}

fn string_prop(s: &str) -> Value {
    if s.is_empty() {
        Value::Null
    } else {
        Value::String(s.to_string())
    }
}

fn bool_prop(b: Option<bool>) -> Value {
    b.map(Value::Bool).unwrap_or(Value::Null)
}
