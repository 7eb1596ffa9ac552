//! # Template Matcher
//!
//! Scores a canonical tree against baseline templates and picks the best
//! match. The score is a weighted blend of three independent signals:
//!
//! ```text
//! score = 0.4 · R  +  0.4 · S  +  0.2 · O
//! ```
//!
//! - **R - required-node coverage**: fraction of the template's
//!   `required_nodes` whose name appears anywhere in the tree. A template
//!   without required nodes scores R = 1.
//! - **S - structural proximity**: mean of depth similarity and node-count
//!   similarity, each `1 − |Δ| / max`. A template that pins neither value
//!   scores S = 1.
//! - **O - role-set overlap**: Jaccard index of the role sets. A template
//!   without expected roles scores O = 1; a tree with no roles against a
//!   template that has them scores O = 0.
//!
//! Scoring is pure: the same tree and template always produce the same
//! score, and ties in best-match selection resolve to the first template
//! encountered.

use driftwatch_baseline::Template;
use driftwatch_tree::CanonicalTree;
use std::collections::BTreeSet;

/// Default acceptance threshold for a match.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Scores canonical trees against baseline templates.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    threshold: f64,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Matcher {
    /// Creates a matcher with a custom acceptance threshold.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The configured acceptance threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether `tree` matches `template` within the threshold.
    pub fn matches(&self, tree: &CanonicalTree, template: &Template) -> bool {
        self.score(tree, template) >= self.threshold
    }

    /// Similarity score in `[0, 1]` between a tree and a template.
    ///
    /// An empty tree matches nothing and scores 0.
    pub fn score(&self, tree: &CanonicalTree, template: &Template) -> f64 {
        if tree.is_empty() {
            return 0.0;
        }

        let required = required_node_coverage(tree, template);
        let structure = structural_proximity(tree, template);
        let roles = role_overlap(tree, template);

        0.4 * required + 0.4 * structure + 0.2 * roles
    }

    /// Picks the highest-scoring template that meets the threshold.
    ///
    /// Ties resolve to the first template encountered, so iteration order
    /// determines tie-breaking; callers pass templates in index order.
    pub fn find_best_match<'a, I>(
        &self,
        tree: &CanonicalTree,
        templates: I,
    ) -> Option<(&'a Template, f64)>
    where
        I: IntoIterator<Item = &'a Template>,
    {
        let mut best: Option<(&'a Template, f64)> = None;

        for template in templates {
            let score = self.score(tree, template);
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((template, score));
            }
        }

        best.filter(|(_, score)| *score >= self.threshold)
    }
}

/// R: fraction of required nodes whose name appears in the tree.
fn required_node_coverage(tree: &CanonicalTree, template: &Template) -> f64 {
    if template.required_nodes.is_empty() {
        return 1.0;
    }

    let names: BTreeSet<&str> = tree.names().into_iter().collect();
    let found = template
        .required_nodes
        .iter()
        .filter(|n| names.contains(n.as_str()))
        .count();

    found as f64 / template.required_nodes.len() as f64
}

/// S: mean of depth similarity and node-count similarity.
fn structural_proximity(tree: &CanonicalTree, template: &Template) -> f64 {
    let tree_depth = tree.depth();
    let template_depth = template.expected_depth.unwrap_or(tree_depth);
    let depth_similarity = magnitude_similarity(tree_depth, template_depth);

    let tree_count = tree.node_count();
    let template_count = template.expected_node_count.unwrap_or(tree_count);
    let count_similarity = magnitude_similarity(tree_count, template_count);

    (depth_similarity + count_similarity) / 2.0
}

/// `1 − |a − b| / max(a, b)`, treating two zeros as identical.
fn magnitude_similarity(a: usize, b: usize) -> f64 {
    if a == 0 && b == 0 {
        return 1.0;
    }
    1.0 - (a.abs_diff(b) as f64) / (a.max(b) as f64)
}

/// O: Jaccard overlap of role sets.
fn role_overlap(tree: &CanonicalTree, template: &Template) -> f64 {
    let expected: BTreeSet<&str> = match &template.expected_roles {
        Some(roles) if !roles.is_empty() => roles.iter().map(String::as_str).collect(),
        _ => return 1.0,
    };

    let observed = tree.roles();
    if observed.is_empty() {
        return 0.0;
    }

    let intersection = observed.intersection(&expected).count();
    let union = observed.union(&expected).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftwatch_tree::normalize;
    use serde_json::json;

    fn login_tree() -> CanonicalTree {
        normalize(&json!({
            "role": "window",
            "name": "login",
            "children": [
                {"role": "textbox", "name": "email_input"},
                {"role": "textbox", "name": "password_input"},
                {"role": "button", "name": "login_button"},
            ]
        }))
    }

    fn login_template() -> Template {
        Template {
            screen_id: "login".to_string(),
            required_nodes: vec![
                "email_input".to_string(),
                "password_input".to_string(),
                "login_button".to_string(),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_match_scores_high() {
        let matcher = Matcher::default();
        let score = matcher.score(&login_tree(), &login_template());
        assert!(score >= 0.9, "expected >= 0.9, got {}", score);
        assert!(matcher.matches(&login_tree(), &login_template()));
    }

    #[test]
    fn test_score_is_deterministic() {
        let matcher = Matcher::default();
        let tree = login_tree();
        let template = login_template();
        assert_eq!(matcher.score(&tree, &template), matcher.score(&tree, &template));
    }

    #[test]
    fn test_empty_tree_scores_zero() {
        let matcher = Matcher::default();
        assert_eq!(matcher.score(&CanonicalTree::empty(), &login_template()), 0.0);
    }

    #[test]
    fn test_missing_required_nodes_lower_score() {
        let matcher = Matcher::default();
        let partial = normalize(&json!({
            "role": "window",
            "children": [{"role": "textbox", "name": "email_input"}]
        }));

        let full_score = matcher.score(&login_tree(), &login_template());
        let partial_score = matcher.score(&partial, &login_template());
        assert!(partial_score < full_score);
    }

    #[test]
    fn test_unconstrained_template_gives_full_structure_and_roles() {
        // No required nodes, no pinned depth/count/roles: everything
        // collapses to 1.
        let matcher = Matcher::default();
        let template = Template {
            screen_id: "any".to_string(),
            ..Default::default()
        };
        assert_eq!(matcher.score(&login_tree(), &template), 1.0);
    }

    #[test]
    fn test_expected_roles_overlap() {
        let matcher = Matcher::default();
        let mut template = login_template();
        template.expected_roles = Some(vec![
            "window".to_string(),
            "textbox".to_string(),
            "button".to_string(),
        ]);

        // Perfect overlap keeps the score at 1 × 0.2 for the O term.
        assert!(matcher.score(&login_tree(), &template) >= 0.9);

        template.expected_roles = Some(vec!["table".to_string(), "grid".to_string()]);
        let score = matcher.score(&login_tree(), &template);
        assert!(score < 0.9, "disjoint roles should cost the O term: {}", score);
    }

    #[test]
    fn test_pinned_structure_penalizes_mismatch() {
        let matcher = Matcher::default();
        let mut template = login_template();
        template.expected_node_count = Some(40);
        template.expected_depth = Some(6);

        let score = matcher.score(&login_tree(), &template);
        assert!(score < 0.8, "structure mismatch should fail: {}", score);
    }

    #[test]
    fn test_find_best_match_picks_maximum() {
        let matcher = Matcher::default();
        let login = login_template();
        let other = Template {
            screen_id: "settings".to_string(),
            required_nodes: vec!["theme_picker".to_string(), "save_button".to_string()],
            ..Default::default()
        };

        let templates = vec![other, login];
        let (best, score) = matcher
            .find_best_match(&login_tree(), templates.iter())
            .unwrap();
        assert_eq!(best.screen_id, "login");
        assert!(score >= 0.8);
    }

    #[test]
    fn test_find_best_match_respects_threshold() {
        let matcher = Matcher::new(0.99);
        let template = Template {
            screen_id: "login".to_string(),
            required_nodes: vec!["email_input".to_string(), "absent_node".to_string()],
            ..Default::default()
        };

        assert!(matcher
            .find_best_match(&login_tree(), std::iter::once(&template))
            .is_none());
    }

    #[test]
    fn test_tie_resolves_to_first() {
        let matcher = Matcher::default();
        let a = Template {
            screen_id: "first".to_string(),
            ..Default::default()
        };
        let b = Template {
            screen_id: "second".to_string(),
            ..Default::default()
        };

        let templates = vec![a, b];
        let (best, _) = matcher
            .find_best_match(&login_tree(), templates.iter())
            .unwrap();
        assert_eq!(best.screen_id, "first");
    }
}
