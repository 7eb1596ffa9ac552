//! Semantic classification of canonical nodes.
//!
//! Used by the template builder to decide which named nodes are structural
//! enough to become `required_nodes`, and available to callers that want to
//! reason about a tree in semantic terms rather than raw roles.

use crate::node::CanonicalNode;
use serde::{Deserialize, Serialize};

/// Semantic category of a UI node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    /// Buttons, links, toggles - things the user activates.
    Interactive,
    /// Text, labels, images - things that display information.
    Content,
    /// Windows, panes, groups - things that hold other things.
    Container,
    /// Menus, tab lists, toolbars.
    Navigation,
    /// Text fields and other value-accepting widgets.
    Input,
    /// Scrollbars, separators, and other purely visual furniture.
    Decorative,
    /// Nothing recognisable.
    Unknown,
}

const INTERACTIVE_ROLES: [&str; 11] = [
    "button", "link", "menuitem", "tab", "checkbox", "radio", "switch", "slider", "textbox",
    "spinbutton", "combobox",
];

const CONTENT_ROLES: [&str; 7] = [
    "text", "label", "heading", "paragraph", "image", "icon", "statictext",
];

const CONTAINER_ROLES: [&str; 10] = [
    "window", "pane", "panel", "group", "container", "frame", "dialog", "form", "list", "grid",
];

const NAVIGATION_ROLES: [&str; 6] = ["menu", "menubar", "toolbar", "tablist", "navigation", "tree"];

const INPUT_ROLES: [&str; 4] = ["text_field", "textarea", "searchbox", "passwordfield"];

const DECORATIVE_ROLES: [&str; 5] = [
    "scrollbar",
    "separator",
    "statusbar",
    "progressbar",
    "spinner",
];

/// Classifies a canonical node into a semantic category.
///
/// Role wins; when the role is unrecognised the widget type and name are
/// consulted as weaker hints.
pub fn classify(node: &CanonicalNode) -> NodeCategory {
    let role = node.role.as_str();

    if INTERACTIVE_ROLES.contains(&role) {
        return NodeCategory::Interactive;
    }
    if INPUT_ROLES.contains(&role) {
        return NodeCategory::Input;
    }
    if CONTENT_ROLES.contains(&role) {
        return NodeCategory::Content;
    }
    if NAVIGATION_ROLES.contains(&role) {
        return NodeCategory::Navigation;
    }
    if CONTAINER_ROLES.contains(&role) {
        return NodeCategory::Container;
    }
    if DECORATIVE_ROLES.contains(&role) {
        return NodeCategory::Decorative;
    }

    // Fallback hints from the widget type and name.
    let kind = node.kind.to_lowercase();
    let name = node.name.to_lowercase();
    if kind.contains("button") || name.contains("button") {
        return NodeCategory::Interactive;
    }
    if kind.contains("text") || kind.contains("label") {
        return NodeCategory::Content;
    }
    if kind.contains("container") || kind.contains("pane") {
        return NodeCategory::Container;
    }

    NodeCategory::Unknown
}

impl NodeCategory {
    /// True for categories that anchor a screen's identity: the elements a
    /// baseline template should list as required.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            NodeCategory::Interactive
                | NodeCategory::Input
                | NodeCategory::Container
                | NodeCategory::Navigation
        )
    }
}
