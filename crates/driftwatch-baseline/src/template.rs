//! # Template Model
//!
//! A template is a declarative description of an expected screen: which
//! named nodes must exist, what the structural signature should be, and
//! which transitions out of the screen are legitimate.
//!
//! Transitions are stored as plain strings (bare target ids or
//! `"from -> to"` edges), never as references to other templates. The
//! transition graph is therefore rebuilt implicitly on every reload and
//! a reload can never leave dangling pointers - only dangling *names*,
//! which graph validation reports.

use serde::{Deserialize, Serialize};

/// Provenance metadata carried by a template.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateMetadata {
    /// Application the screen belongs to.
    #[serde(default)]
    pub app: String,

    /// Template schema version.
    #[serde(default)]
    pub version: String,

    /// Where the template came from (capture path, author, etc.).
    #[serde(default)]
    pub source: String,
}

/// A baseline template for one screen.
///
/// # Example
///
/// ```rust
/// use driftwatch_baseline::Template;
///
/// let yaml = r#"
/// screen_id: login
/// required_nodes: [email_input, password_input, login_button]
/// valid_transitions: ["login -> home"]
/// "#;
///
/// let template: Template = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(template.screen_id, "login");
/// assert_eq!(template.required_nodes.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier among loaded templates.
    pub screen_id: String,

    /// Names that must appear somewhere in a matching tree, any order.
    #[serde(default)]
    pub required_nodes: Vec<String>,

    /// Expected structural signature (64-char hex SHA-256).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub structure_signature: String,

    /// Allowed outgoing transitions: bare target ids or `"from -> to"`.
    /// Empty means the screen imposes no restriction.
    #[serde(default)]
    pub valid_transitions: Vec<String>,

    /// Expected tree depth for structural scoring; omitted pins nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_depth: Option<usize>,

    /// Expected node count for structural scoring; omitted pins nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_node_count: Option<usize>,

    /// Expected role set for overlap scoring; omitted pins nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_roles: Option<Vec<String>>,

    /// Provenance metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TemplateMetadata>,
}

impl Template {
    /// Target screen ids reachable from this template.
    ///
    /// Each transition contributes one target: the right-hand side of a
    /// `"from -> to"` edge, or the whole string for a bare id. Empty
    /// entries contribute nothing.
    pub fn transition_targets(&self) -> Vec<&str> {
        self.valid_transitions
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| match t.split_once(" -> ") {
                Some((_, to)) => to,
                None => t.as_str(),
            })
            .collect()
    }

    /// Whether a transition to `to_id` is allowed by this template.
    ///
    /// An empty transition list means no restriction. A target matches
    /// either as a bare id or as the destination of a
    /// `"<screen_id> -> <to_id>"` edge.
    pub fn allows_transition(&self, to_id: &str) -> bool {
        if self.valid_transitions.is_empty() {
            return true;
        }
        let edge = format!("{} -> {}", self.screen_id, to_id);
        self.valid_transitions
            .iter()
            .any(|t| t == to_id || *t == edge)
    }
}
