//! The unified drift-detection facade.
//!
//! [`DriftPipeline`] owns the template store, the matcher, the diff
//! engine, the transition checker, and the audit log, and exposes the
//! three operations the service performs: observing a capture, comparing
//! a capture against a baseline capture, and observing a screen
//! transition. Every finding becomes a drift event and is appended to the
//! hash-chained log before the operation returns.

use crate::config::Config;
use crate::Result;
use driftwatch_baseline::{ScreenStateMachine, Template, TemplateStore};
use driftwatch_drift::transition::DEFAULT_LOOP_WINDOW;
use driftwatch_drift::{
    DiffEngine, DiffResult, DriftEvent, Matcher, TransitionChecker, TransitionResult,
};
use driftwatch_ledger::AuditLog;
use driftwatch_tree::{generate_signatures, normalize, CanonicalTree, NoiseFilter, SignatureTriple};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Diff similarity below which a layout event is raised.
const SIGNIFICANCE_THRESHOLD: f64 = 0.9;

/// Outcome of observing one capture.
#[derive(Debug)]
pub struct Observation {
    /// The canonical form of the capture.
    pub tree: CanonicalTree,
    /// Its signature triple.
    pub signatures: SignatureTriple,
    /// Screen id of the accepted match, when one met the threshold.
    pub matched_screen: Option<String>,
    /// Best similarity score seen (0 when no templates are loaded).
    pub score: f64,
    /// Drift events raised and appended.
    pub events: Vec<DriftEvent>,
}

/// Outcome of comparing an observation against a baseline capture.
#[derive(Debug)]
pub struct ComparisonOutcome {
    /// The structural diff.
    pub diff: DiffResult,
    /// Drift events raised and appended.
    pub events: Vec<DriftEvent>,
}

/// Outcome of observing a screen transition.
#[derive(Debug)]
pub struct TransitionOutcome {
    /// Validity of the transition against the baseline graph.
    pub result: TransitionResult,
    /// Drift events raised and appended.
    pub events: Vec<DriftEvent>,
}

/// The unified DriftWatch pipeline facade.
///
/// # Example
///
/// ```rust,ignore
/// let mut pipeline = DriftPipeline::new(Config::from_env())?;
///
/// let outcome = pipeline.observe(&capture)?;
/// if outcome.matched_screen.is_none() {
///     eprintln!("unrecognised screen, {} events logged", outcome.events.len());
/// }
/// ```
pub struct DriftPipeline {
    config: Config,
    templates: TemplateStore,
    matcher: Matcher,
    diff_engine: DiffEngine,
    noise_filter: NoiseFilter,
    transitions: TransitionChecker,
    screens: ScreenStateMachine,
    log: AuditLog,
}

impl DriftPipeline {
    /// Builds a pipeline from configuration: loads the template directory
    /// and opens (or creates) the audit log.
    ///
    /// # Errors
    ///
    /// Returns an error when the template directory fails to load or the
    /// log file cannot be opened.
    pub fn new(config: Config) -> Result<Self> {
        let templates = TemplateStore::open(&config.templates_dir)?;
        let log = AuditLog::open(&config.log_path)?;

        info!(
            templates = templates.len(),
            log_entries = log.len(),
            "drift pipeline initialized"
        );

        Ok(Self {
            matcher: Matcher::new(config.match_threshold),
            diff_engine: DiffEngine::new(),
            noise_filter: NoiseFilter::default(),
            transitions: TransitionChecker::new(),
            screens: ScreenStateMachine::new(),
            templates,
            log,
            config,
        })
    }

    /// Observes a raw capture: normalize → sign → best-match → events.
    ///
    /// A capture whose best score falls below the threshold raises a
    /// layout event against the nearest screen; an accepted match whose
    /// structural signature disagrees with the template's pinned one
    /// raises a layout event as well.
    pub fn observe(&mut self, raw: &Value) -> Result<Observation> {
        let tree = normalize(raw);
        let signatures = generate_signatures(&tree);
        let snapshot = self.templates.snapshot();

        // Matching works on the noise-filtered view; signatures always
        // cover the unfiltered canonical tree.
        let filtered = self.noise_filter.filter(&tree);

        let mut events = Vec::new();
        let mut matched_screen = None;
        let mut best_score = 0.0;

        if let Some((template, score)) = self.best_candidate(&filtered, snapshot.values()) {
            best_score = score;

            if score < self.matcher.threshold() {
                debug!(screen_id = %template.screen_id, score, "best match below threshold");
                events.push(DriftEvent::layout_drift(
                    &template.screen_id,
                    score,
                    &below_threshold_summary(&tree, template),
                ));
            } else {
                matched_screen = Some(template.screen_id.clone());

                if !template.structure_signature.is_empty()
                    && template.structure_signature != signatures.structural
                {
                    warn!(screen_id = %template.screen_id, "structural signature mismatch");
                    events.push(DriftEvent::layout_drift(
                        &template.screen_id,
                        score,
                        "structural signature mismatch against baseline",
                    ));
                }
            }
        }

        self.append_events(&events)?;

        Ok(Observation {
            tree,
            signatures,
            matched_screen,
            score: best_score,
            events,
        })
    }

    /// Diffs an observed capture against a baseline capture of the same
    /// screen and raises layout / content events per the diff shape.
    ///
    /// Structural entries (added or removed nodes) raise a layout event
    /// when the similarity crosses the significance threshold; pure
    /// property modifications raise a content event.
    pub fn compare(
        &mut self,
        baseline_raw: &Value,
        observed_raw: &Value,
        screen_id: &str,
    ) -> Result<ComparisonOutcome> {
        let baseline = normalize(baseline_raw);
        let observed = normalize(observed_raw);
        let diff = self.diff_engine.diff(&baseline, &observed);

        let mut events = Vec::new();

        let structural_change = !diff.added.is_empty() || !diff.removed.is_empty();
        if structural_change
            && self
                .diff_engine
                .has_significant_changes(&diff, SIGNIFICANCE_THRESHOLD)
        {
            events.push(DriftEvent::layout_drift(
                screen_id,
                diff.similarity,
                &diff.summary(),
            ));
        }

        if !diff.modified.is_empty() {
            let mut changes = Map::new();
            for modified in &diff.modified {
                changes.insert(
                    modified.path.clone(),
                    serde_json::to_value(&modified.changes).unwrap_or(Value::Null),
                );
            }
            events.push(DriftEvent::content_drift(screen_id, changes));
        }

        self.append_events(&events)?;

        Ok(ComparisonOutcome { diff, events })
    }

    /// Observes a screen transition: validates it against the baseline
    /// graph, records it, and runs the loop and forced-flow detectors.
    pub fn observe_transition(&mut self, from_id: &str, to_id: &str) -> Result<TransitionOutcome> {
        let snapshot = self.templates.snapshot();
        let result = self.transitions.check_by_id(from_id, to_id, &snapshot);
        self.transitions.record_transition(from_id, to_id);
        self.screens.transition(from_id, to_id);

        let mut events = Vec::new();

        if !result.is_valid {
            warn!(from = from_id, to = to_id, "invalid transition");
            events.push(DriftEvent::sequence_drift(
                &format!("{} -> {}", from_id, to_id),
                result.expected.as_deref().unwrap_or(&[]),
            ));
        }

        if let Some(flow) = self.transitions.detect_forced_flow(&snapshot) {
            warn!(length = flow.length, "forced flow detected");
            events.push(DriftEvent::manipulative_drift(
                "forced_flow",
                &flow.description,
                &flow.flow,
            ));
        }

        let loops = self.transitions.detect_loops(DEFAULT_LOOP_WINDOW);
        if let Some(first_loop) = loops.first() {
            warn!(loop_len = first_loop.len(), "navigation loop detected");
            events.push(DriftEvent::manipulative_drift(
                "navigation_loop",
                "repeated navigation sequence detected",
                first_loop,
            ));
        }

        self.append_events(&events)?;

        Ok(TransitionOutcome { result, events })
    }

    /// Appends an arbitrary payload to the audit log.
    pub fn append_payload(&mut self, payload: Value) -> Result<String> {
        Ok(self.log.append(payload)?)
    }

    /// Verifies the audit log's hash chain.
    pub fn verify_integrity(&self) -> bool {
        self.log.verify_integrity()
    }

    /// Reloads the template directory, swapping the index atomically.
    pub fn reload_templates(&mut self) -> Result<usize> {
        Ok(self.templates.reload()?)
    }

    /// The template store.
    pub fn templates(&self) -> &TemplateStore {
        &self.templates
    }

    /// The audit log.
    pub fn log(&self) -> &AuditLog {
        &self.log
    }

    /// The configured matcher.
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// The screen the monitored application was last observed on.
    pub fn current_screen(&self) -> Option<&str> {
        self.screens.current()
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Flushes and closes the audit log. Called on graceful shutdown.
    pub fn shutdown(&mut self) -> Result<()> {
        info!("drift pipeline shutting down");
        self.log.close()?;
        Ok(())
    }

    /// Highest-scoring template regardless of threshold, first wins ties.
    fn best_candidate<'a, I>(&self, tree: &CanonicalTree, templates: I) -> Option<(&'a Template, f64)>
    where
        I: IntoIterator<Item = &'a Template>,
    {
        let mut best: Option<(&'a Template, f64)> = None;
        for template in templates {
            let score = self.matcher.score(tree, template);
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((template, score));
            }
        }
        best
    }

    fn append_events(&mut self, events: &[DriftEvent]) -> Result<()> {
        for event in events {
            let hash = self.log.append(event.to_value())?;
            debug!(event_id = %event.event_id, entry_hash = %hash, "drift event logged");
        }
        Ok(())
    }
}

/// Explains why a capture fell below the match threshold.
fn below_threshold_summary(tree: &CanonicalTree, template: &Template) -> String {
    let names: std::collections::BTreeSet<&str> = tree.names().into_iter().collect();
    let missing: Vec<&str> = template
        .required_nodes
        .iter()
        .filter(|n| !names.contains(n.as_str()))
        .map(String::as_str)
        .collect();

    if missing.is_empty() {
        format!("best match {} below threshold", template.screen_id)
    } else {
        format!("missing required nodes: {}", missing.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            log_path: dir.path().join("logs/audit.log"),
            templates_dir: dir.path().join("templates"),
            captures_dir: dir.path().join("captures"),
            api_keys_path: dir.path().join("api_keys.yaml"),
            ..Default::default()
        }
    }

    fn write_template(dir: &TempDir, file: &str, content: &str) {
        let templates = dir.path().join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::write(templates.join(file), content).unwrap();
    }

    fn login_capture() -> Value {
        json!({
            "root": {
                "role": "window",
                "name": "login",
                "children": [
                    {"role": "textbox", "name": "email_input"},
                    {"role": "textbox", "name": "password_input"},
                    {"role": "button", "name": "login_button"},
                ]
            }
        })
    }

    #[test]
    fn test_pipeline_creation() {
        let dir = TempDir::new().unwrap();
        assert!(DriftPipeline::new(test_config(&dir)).is_ok());
    }

    #[test]
    fn test_observe_with_matching_template() {
        let dir = TempDir::new().unwrap();
        write_template(
            &dir,
            "login.yaml",
            "screen_id: login\nrequired_nodes: [email_input, password_input, login_button]\n",
        );

        let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();
        let outcome = pipeline.observe(&login_capture()).unwrap();

        assert_eq!(outcome.matched_screen.as_deref(), Some("login"));
        assert!(outcome.score >= 0.9);
        assert!(outcome.events.is_empty());
        assert_eq!(pipeline.log().len(), 0);
    }

    #[test]
    fn test_observe_below_threshold_logs_layout_event() {
        let dir = TempDir::new().unwrap();
        write_template(
            &dir,
            "login.yaml",
            "screen_id: login\nrequired_nodes: [email_input, password_input, login_button, captcha]\nexpected_node_count: 40\nexpected_depth: 6\n",
        );

        let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();
        let outcome = pipeline
            .observe(&json!({"root": {"role": "window", "name": "something_else"}}))
            .unwrap();

        assert!(outcome.matched_screen.is_none());
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.events[0].drift_type, driftwatch_drift::DriftType::Layout);
        assert_eq!(pipeline.log().len(), 1);
        assert!(pipeline.verify_integrity());
    }

    #[test]
    fn test_compare_logs_content_event() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();

        let baseline = json!({"root": {
            "role": "window",
            "children": [{"role": "text", "name": "payout", "value": "$12.50"}]
        }});
        let observed = json!({"root": {
            "role": "window",
            "children": [{"role": "text", "name": "payout", "value": "$8.00"}]
        }});

        let outcome = pipeline.compare(&baseline, &observed, "earnings").unwrap();
        assert_eq!(outcome.diff.modified.len(), 1);
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(
            outcome.events[0].drift_type,
            driftwatch_drift::DriftType::Content
        );
    }

    #[test]
    fn test_invalid_transition_logs_sequence_event() {
        let dir = TempDir::new().unwrap();
        write_template(
            &dir,
            "login.yaml",
            "screen_id: login\nvalid_transitions: [\"login -> home\"]\n",
        );

        let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();
        let outcome = pipeline.observe_transition("login", "billing").unwrap();

        assert!(!outcome.result.is_valid);
        assert!(outcome
            .events
            .iter()
            .any(|e| e.drift_type == driftwatch_drift::DriftType::Sequence));
    }

    #[test]
    fn test_shutdown_closes_log() {
        let dir = TempDir::new().unwrap();
        let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();
        pipeline.shutdown().unwrap();
        assert!(pipeline.append_payload(json!({"n": 1})).is_err());
    }
}
