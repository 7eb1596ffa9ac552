//! Template builder.
//!
//! Turns a recorded capture into a baseline template: named nodes in
//! structural categories become `required_nodes`, the capture's structural
//! signature is pinned, and provenance lands in the metadata block. The
//! result is validated before it is returned or written.

use crate::error::ApiError;
use driftwatch_baseline::{validate_with_errors, Template, TemplateMetadata};
use driftwatch_tree::signature::structural_signature;
use driftwatch_tree::{classify, CanonicalNode, CanonicalTree};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Builds YAML baseline templates from capture files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateBuilder;

impl TemplateBuilder {
    /// Creates a builder.
    pub fn new() -> Self {
        Self
    }

    /// Loads a capture file and derives a template from it.
    ///
    /// # Errors
    ///
    /// 500-mapped errors for unreadable or unparsable capture files;
    /// 422-mapped errors when the derived template fails validation.
    pub fn build_from_capture(
        &self,
        capture_path: &Path,
        screen_id: &str,
        app: &str,
    ) -> Result<Template, ApiError> {
        let text = std::fs::read_to_string(capture_path)?;
        let document: Value =
            serde_json::from_str(&text).map_err(|e| ApiError::internal(e.to_string()))?;

        let normalized = document.get("normalized").cloned().unwrap_or(Value::Null);
        let tree: CanonicalTree = serde_json::from_value(normalized)
            .map_err(|e| ApiError::internal(format!("capture has no usable tree: {}", e)))?;

        let mut required_nodes = Vec::new();
        if let Some(root) = &tree.root {
            collect_required(root, &mut required_nodes);
        }
        required_nodes.sort_unstable();
        required_nodes.dedup();

        // Prefer the signature recorded at capture time; recompute when the
        // capture predates signatures.
        let structure_signature = document
            .get("signatures")
            .and_then(|s| s.get("structural"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| structural_signature(&tree));

        let template = Template {
            screen_id: screen_id.to_string(),
            required_nodes,
            structure_signature,
            valid_transitions: Vec::new(),
            metadata: Some(TemplateMetadata {
                app: app.to_string(),
                version: "1.0".to_string(),
                source: capture_path.display().to_string(),
            }),
            ..Default::default()
        };

        let as_value =
            serde_json::to_value(&template).map_err(|e| ApiError::internal(e.to_string()))?;
        let errors = validate_with_errors(&as_value);
        if !errors.is_empty() {
            return Err(ApiError::unprocessable(format!(
                "template validation failed: {}",
                errors.join("; ")
            )));
        }

        Ok(template)
    }

    /// Writes a template as YAML, creating parent directories.
    pub fn save_yaml(&self, template: &Template, output_path: &Path) -> Result<PathBuf, ApiError> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let rendered =
            serde_yaml::to_string(template).map_err(|e| ApiError::internal(e.to_string()))?;
        std::fs::write(output_path, rendered)?;
        Ok(output_path.to_path_buf())
    }
}

/// Named nodes in structural categories anchor the screen's identity.
fn collect_required(node: &CanonicalNode, out: &mut Vec<String>) {
    if !node.name.is_empty() && classify(node).is_structural() {
        out.push(node.name.clone());
    }
    for child in &node.children {
        collect_required(child, out);
    }
}
