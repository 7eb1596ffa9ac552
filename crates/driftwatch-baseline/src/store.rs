//! # Template Store
//!
//! Loads baseline templates from a YAML directory and indexes them by
//! `screen_id`.
//!
//! ## Concurrency
//!
//! The index is copy-on-write: [`TemplateStore::reload`] parses and
//! validates every file into a fresh map, then swaps it in atomically.
//! Readers take an [`Arc`] snapshot and are never exposed to a half-built
//! index; a failed reload leaves the previous index untouched.
//!
//! ## Failure policy
//!
//! A template that fails validation is logged and skipped - one bad file
//! must not take down every baseline. A duplicate `screen_id` fails the
//! whole reload instead: two templates claiming the same screen is an
//! operator error that silent last-wins behavior would hide.

use crate::error::BaselineError;
use crate::template::Template;
use crate::validate::validate_with_errors;
use crate::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Indexed collection of baseline templates.
#[derive(Debug)]
pub struct TemplateStore {
    /// Directory scanned for `*.yaml` / `*.yml` files.
    dir: PathBuf,

    /// Copy-on-write index keyed by `screen_id`.
    index: RwLock<Arc<BTreeMap<String, Template>>>,
}

impl TemplateStore {
    /// Creates an empty store rooted at `dir` without loading anything.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            index: RwLock::new(Arc::new(BTreeMap::new())),
        }
    }

    /// Creates a store and performs the initial load.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(dir);
        store.reload()?;
        Ok(store)
    }

    /// The directory this store scans.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads and validates a single template file.
    ///
    /// # Errors
    ///
    /// - [`BaselineError::Io`] when the file cannot be read.
    /// - [`BaselineError::Yaml`] when the file is not YAML.
    /// - [`BaselineError::Invalid`] with per-field diagnostics when the
    ///   document fails validation.
    pub fn load_file(path: &Path) -> Result<Template> {
        let text = std::fs::read_to_string(path)?;
        let document: serde_json::Value = serde_yaml::from_str(&text)?;

        let errors = validate_with_errors(&document);
        if !errors.is_empty() {
            return Err(BaselineError::Invalid {
                path: path.display().to_string(),
                errors,
            });
        }

        let template: Template = serde_json::from_value(document)
            .map_err(|e| BaselineError::Invalid {
                path: path.display().to_string(),
                errors: vec![e.to_string()],
            })?;
        Ok(template)
    }

    /// Rebuilds the index from disk and swaps it in atomically.
    ///
    /// Returns the number of templates loaded. A missing directory yields
    /// an empty index. Invalid files are skipped with a warning; duplicate
    /// screen ids abort the reload and leave the old index in place.
    pub fn reload(&self) -> Result<usize> {
        let mut fresh: BTreeMap<String, Template> = BTreeMap::new();

        if self.dir.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("yaml") | Some("yml")
                    )
                })
                .collect();
            paths.sort();

            for path in paths {
                match Self::load_file(&path) {
                    Ok(template) => {
                        if fresh.contains_key(&template.screen_id) {
                            return Err(BaselineError::DuplicateScreenId(template.screen_id));
                        }
                        debug!(screen_id = %template.screen_id, path = %path.display(), "loaded template");
                        fresh.insert(template.screen_id.clone(), template);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping template");
                    }
                }
            }
        }

        let count = fresh.len();
        let mut guard = self
            .index
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(fresh);
        Ok(count)
    }

    /// Looks up a template by screen id.
    pub fn get(&self, screen_id: &str) -> Option<Template> {
        self.snapshot().get(screen_id).cloned()
    }

    /// All loaded screen ids, in lexicographic order.
    pub fn list(&self) -> Vec<String> {
        self.snapshot().keys().cloned().collect()
    }

    /// A consistent point-in-time view of the index. Cheap to take; a
    /// concurrent reload does not disturb holders of older snapshots.
    pub fn snapshot(&self) -> Arc<BTreeMap<String, Template>> {
        Arc::clone(&self.index.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of loaded templates.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// True when no templates are loaded.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_template(dir: &Path, file: &str, content: &str) {
        let mut f = std::fs::File::create(dir.join(file)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let store = TemplateStore::new("/nonexistent/templates");
        assert_eq!(store.reload().unwrap(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_and_get() {
        let dir = TempDir::new().unwrap();
        write_template(
            dir.path(),
            "login.yaml",
            "screen_id: login\nrequired_nodes: [email_input, login_button]\n",
        );

        let store = TemplateStore::open(dir.path()).unwrap();
        assert_eq!(store.len(), 1);

        let template = store.get("login").unwrap();
        assert_eq!(template.required_nodes.len(), 2);
        assert!(store.get("unknown").is_none());
    }

    #[test]
    fn test_invalid_template_skipped() {
        let dir = TempDir::new().unwrap();
        write_template(dir.path(), "good.yaml", "screen_id: good\n");
        write_template(dir.path(), "bad.yaml", "required_nodes: nope\n");

        let store = TemplateStore::open(dir.path()).unwrap();
        assert_eq!(store.list(), vec!["good"]);
    }

    #[test]
    fn test_duplicate_screen_id_fails_reload() {
        let dir = TempDir::new().unwrap();
        write_template(dir.path(), "a.yaml", "screen_id: same\n");
        write_template(dir.path(), "b.yaml", "screen_id: same\n");

        let store = TemplateStore::new(dir.path());
        assert!(matches!(
            store.reload(),
            Err(BaselineError::DuplicateScreenId(_))
        ));
        // Failed reload leaves the (empty) previous index in place.
        assert!(store.is_empty());
    }

    #[test]
    fn test_reload_swaps_index() {
        let dir = TempDir::new().unwrap();
        write_template(dir.path(), "one.yaml", "screen_id: one\n");

        let store = TemplateStore::open(dir.path()).unwrap();
        let before = store.snapshot();

        write_template(dir.path(), "two.yaml", "screen_id: two\n");
        store.reload().unwrap();

        // The old snapshot is unchanged; the store sees the new index.
        assert_eq!(before.len(), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.list(), vec!["one", "two"]);
    }

    #[test]
    fn test_non_yaml_files_ignored() {
        let dir = TempDir::new().unwrap();
        write_template(dir.path(), "readme.txt", "screen_id: nope\n");
        write_template(dir.path(), "real.yml", "screen_id: real\n");

        let store = TemplateStore::open(dir.path()).unwrap();
        assert_eq!(store.list(), vec!["real"]);
    }
}
