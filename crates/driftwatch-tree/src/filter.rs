//! Noise filters for canonical trees.
//!
//! Some UI furniture exists in every capture but carries no baseline
//! meaning: scrollbars, separators, loading spinners, elements that are
//! invisible or have zero size. Left in, they generate false drift signals
//! every time a spinner appears or a scrollbar materialises. The filter
//! removes them before matching.

use crate::node::{CanonicalNode, CanonicalTree};

const NOISE_ROLES: [&str; 5] = [
    "scrollbar",
    "separator",
    "statusbar",
    "progressbar",
    "spinner",
];

const NOISE_NAMES: [&str; 4] = ["loading", "spinner", "dots", "ellipsis"];

/// Configurable noise filter. All rules default to enabled.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    /// Remove nodes with `visible: false`.
    pub filter_invisible: bool,
    /// Remove nodes whose bounds have zero width or height.
    pub filter_zero_size: bool,
    /// Remove decorative roles and transient indicator names.
    pub filter_decorative: bool,
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self {
            filter_invisible: true,
            filter_zero_size: true,
            filter_decorative: true,
        }
    }
}

impl NoiseFilter {
    /// Returns a copy of the tree with noise nodes (and their subtrees)
    /// removed. The root itself is never removed.
    pub fn filter(&self, tree: &CanonicalTree) -> CanonicalTree {
        CanonicalTree {
            root: tree.root.as_ref().map(|root| self.filter_children(root)),
        }
    }

    fn filter_children(&self, node: &CanonicalNode) -> CanonicalNode {
        let mut filtered = node.clone();
        filtered.children = node
            .children
            .iter()
            .filter(|child| !self.is_noise(child))
            .map(|child| self.filter_children(child))
            .collect();
        filtered
    }

    fn is_noise(&self, node: &CanonicalNode) -> bool {
        if self.filter_decorative {
            if NOISE_ROLES.contains(&node.role.as_str()) {
                return true;
            }
            if NOISE_NAMES.contains(&node.name.to_lowercase().as_str()) {
                return true;
            }
        }

        if self.filter_invisible && node.visible == Some(false) {
            return true;
        }

        if self.filter_zero_size {
            if let Some(bounds) = node.bounds {
                if bounds.width == 0 || bounds.height == 0 {
                    return true;
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;

    #[test]
    fn test_decorative_roles_removed() {
        let tree = normalize(&json!({
            "role": "window",
            "children": [
                {"role": "button", "name": "ok"},
                {"role": "scrollbar"},
                {"role": "spinner"},
            ]
        }));

        let filtered = NoiseFilter::default().filter(&tree);
        let root = filtered.root.unwrap();
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].role, "button");
    }

    #[test]
    fn test_invisible_removed() {
        let tree = normalize(&json!({
            "role": "window",
            "children": [{"role": "button", "name": "hidden", "visible": false}]
        }));

        let filtered = NoiseFilter::default().filter(&tree);
        assert!(filtered.root.unwrap().children.is_empty());
    }

    #[test]
    fn test_zero_size_removed() {
        let tree = normalize(&json!({
            "role": "window",
            "children": [
                {"role": "image", "bounds": {"x": 0, "y": 0, "width": 0, "height": 24}}
            ]
        }));

        let filtered = NoiseFilter::default().filter(&tree);
        assert!(filtered.root.unwrap().children.is_empty());
    }

    #[test]
    fn test_disabled_rules_keep_nodes() {
        let tree = normalize(&json!({
            "role": "window",
            "children": [{"role": "scrollbar"}]
        }));

        let filter = NoiseFilter {
            filter_decorative: false,
            ..Default::default()
        };
        assert_eq!(filter.filter(&tree).root.unwrap().children.len(), 1);
    }

    #[test]
    fn test_root_never_removed() {
        let tree = normalize(&json!({"role": "spinner"}));
        let filtered = NoiseFilter::default().filter(&tree);
        assert!(!filtered.is_empty());
    }
}
