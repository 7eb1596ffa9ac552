//! Capture recorder.
//!
//! Persists a normalized snapshot of a supplied raw tree: the capture
//! document carries the raw input, its canonical form, and the signature
//! triple, so a capture can later seed a template or serve as a diff
//! baseline without re-normalizing.

use crate::error::ApiError;
use driftwatch_tree::{generate_signatures, normalize, SignatureTriple};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// A persisted capture document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    /// When the capture was recorded, RFC 3339.
    pub captured_at: String,
    /// The raw tree as supplied.
    pub raw: Value,
    /// The canonical form.
    pub normalized: Value,
    /// Signatures of the canonical form.
    pub signatures: SignatureTriple,
}

/// A capture together with where it was written.
#[derive(Debug, Clone)]
pub struct RecordedCapture {
    /// Path of the capture JSON file.
    pub path: PathBuf,
    /// The document that was written.
    pub capture: Capture,
}

/// Normalizes and persists captures into a directory.
#[derive(Debug, Clone)]
pub struct Recorder {
    captures_dir: PathBuf,
}

impl Recorder {
    /// Creates a recorder writing into `captures_dir`.
    pub fn new(captures_dir: impl Into<PathBuf>) -> Self {
        Self {
            captures_dir: captures_dir.into(),
        }
    }

    /// The directory captures are written to.
    pub fn captures_dir(&self) -> &Path {
        &self.captures_dir
    }

    /// Normalizes `raw`, generates signatures, and writes the capture
    /// document to a timestamped file.
    pub fn record(&self, raw: &Value) -> Result<RecordedCapture, ApiError> {
        let tree = normalize(raw);
        let capture = Capture {
            captured_at: chrono::Utc::now().to_rfc3339(),
            raw: raw.clone(),
            normalized: tree.to_value(),
            signatures: generate_signatures(&tree),
        };

        std::fs::create_dir_all(&self.captures_dir)?;

        let filename = format!(
            "capture_{}.json",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%3f")
        );
        let path = self.captures_dir.join(filename);

        let rendered = serde_json::to_string_pretty(&capture)
            .map_err(|e| ApiError::internal(e.to_string()))?;
        std::fs::write(&path, rendered)?;

        Ok(RecordedCapture { path, capture })
    }
}
