//! # Transition Checker
//!
//! Validates observed screen transitions against the baseline transition
//! graph and watches the recent history for the two manipulative patterns
//! this system asserts: navigation **loops** and **forced flows**.
//!
//! A forced flow is an observed path in which every traversed screen had
//! exactly one allowed outgoing transition - the user never had a choice.
//! A loop is a subsequence of screens the user was cycled through at least
//! twice within the recent window.
//!
//! History is a bounded ring (capacity 100): detection only ever reasons
//! about the recent past, and a long-running session cannot grow memory.

use crate::event::now_seconds;
use driftwatch_baseline::Template;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Maximum retained transitions.
const MAX_HISTORY: usize = 100;

/// Default number of recent transitions examined for loops.
pub const DEFAULT_LOOP_WINDOW: usize = 5;

/// Outcome of validating a single transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionResult {
    /// Whether the transition is allowed.
    pub is_valid: bool,

    /// Explanation when validity was decided without a listed edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// The allowed transitions of the source screen, when restricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Vec<String>>,

    /// The target that was attempted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl TransitionResult {
    fn valid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            reason: Some(reason.into()),
            expected: None,
            actual: None,
        }
    }
}

/// One observed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Source screen id.
    pub from: String,
    /// Target screen id.
    pub to: String,
    /// When the transition was observed, epoch seconds.
    pub timestamp: f64,
}

/// A detected forced navigation flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcedFlow {
    /// The screens traversed, in order, including the final target.
    pub flow: Vec<String>,
    /// Number of screens in the flow.
    pub length: usize,
    /// Human description of the finding.
    pub description: String,
}

/// Validates transitions and detects manipulative navigation patterns.
#[derive(Debug, Default)]
pub struct TransitionChecker {
    history: VecDeque<TransitionRecord>,
}

impl TransitionChecker {
    /// Creates a checker with empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks a transition against a source template.
    ///
    /// No source template, or a template without transition restrictions,
    /// imposes nothing. Otherwise the target must be listed, either as a
    /// bare screen id or as a `"<from> -> <to>"` edge.
    pub fn check_transition(
        &self,
        from_template: Option<&Template>,
        to_id: &str,
    ) -> TransitionResult {
        let template = match from_template {
            None => return TransitionResult::valid("no source template (initial state)"),
            Some(t) => t,
        };

        if template.valid_transitions.is_empty() {
            return TransitionResult::valid("no transition restrictions");
        }

        if template.allows_transition(to_id) {
            return TransitionResult {
                is_valid: true,
                reason: None,
                expected: Some(template.valid_transitions.clone()),
                actual: Some(to_id.to_string()),
            };
        }

        TransitionResult {
            is_valid: false,
            reason: Some(format!(
                "unexpected transition: {} -> {}",
                template.screen_id, to_id
            )),
            expected: Some(template.valid_transitions.clone()),
            actual: Some(to_id.to_string()),
        }
    }

    /// Checks a transition by screen ids against a template index.
    ///
    /// An unknown source screen imposes no restriction: the baseline has
    /// nothing to say about a screen it has never described.
    pub fn check_by_id(
        &self,
        from_id: &str,
        to_id: &str,
        templates: &BTreeMap<String, Template>,
    ) -> TransitionResult {
        match templates.get(from_id) {
            None => TransitionResult::valid("source template not found"),
            Some(template) => self.check_transition(Some(template), to_id),
        }
    }

    /// Records an observed transition, stamping the clock.
    pub fn record_transition(&mut self, from: &str, to: &str) {
        self.record_transition_at(from, to, now_seconds());
    }

    /// Records an observed transition with an explicit timestamp.
    pub fn record_transition_at(&mut self, from: &str, to: &str, timestamp: f64) {
        self.history.push_back(TransitionRecord {
            from: from.to_string(),
            to: to.to_string(),
            timestamp,
        });
        if self.history.len() > MAX_HISTORY {
            self.history.pop_front();
        }
    }

    /// The most recent `count` transitions, oldest first.
    pub fn history(&self, count: usize) -> Vec<&TransitionRecord> {
        let start = self.history.len().saturating_sub(count);
        self.history.iter().skip(start).collect()
    }

    /// Total recorded transitions (bounded by the ring capacity).
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Detects repeated navigation subsequences in the recent window.
    ///
    /// Any subsequence of length ≥ 2 that occurs at least twice within the
    /// last `window` transitions is reported. Requires at least three
    /// recorded transitions to say anything.
    pub fn detect_loops(&self, window: usize) -> Vec<Vec<String>> {
        if self.history.len() < 3 {
            return Vec::new();
        }

        let recent = self.history(window);
        let screens: Vec<&str> = recent.iter().map(|r| r.from.as_str()).collect();
        let mut loops = Vec::new();

        for i in 0..screens.len().saturating_sub(2) {
            for j in (i + 2)..screens.len() {
                let sequence = &screens[i..j];
                if occurrence_count(sequence, &screens[i..]) >= 2 {
                    loops.push(sequence.iter().map(|s| s.to_string()).collect());
                }
            }
        }

        loops
    }

    /// Detects a forced flow over the recent history.
    ///
    /// Reported when the history holds at least three transitions and
    /// every non-terminal screen in the observed flow (that has a
    /// template) allowed exactly one outgoing transition.
    pub fn detect_forced_flow(
        &self,
        templates: &BTreeMap<String, Template>,
    ) -> Option<ForcedFlow> {
        if self.history.len() < 3 {
            return None;
        }

        let recent = self.history(5);
        let mut flow: Vec<String> = recent.iter().map(|r| r.from.clone()).collect();
        if let Some(last) = recent.last() {
            flow.push(last.to.clone());
        }

        let forced = flow[..flow.len() - 1].iter().all(|screen| {
            templates
                .get(screen)
                .map(|t| t.valid_transitions.len() == 1)
                .unwrap_or(true)
        });

        if forced && flow.len() >= 3 {
            let length = flow.len();
            Some(ForcedFlow {
                flow,
                length,
                description: "user appears to be in a forced navigation flow".to_string(),
            })
        } else {
            None
        }
    }

    /// Validates every transition string across a template set.
    ///
    /// Returns per-screen diagnostics for syntactically malformed entries
    /// and for targets (bare or edge form) that do not resolve to a loaded
    /// screen id. Templates with no findings are absent from the map.
    pub fn validate_transition_graph(
        templates: &BTreeMap<String, Template>,
    ) -> BTreeMap<String, Vec<String>> {
        let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (screen_id, template) in templates {
            let mut screen_errors = Vec::new();

            for transition in &template.valid_transitions {
                if transition.is_empty() {
                    continue;
                }

                let target = if transition.contains(" -> ") {
                    let parts: Vec<&str> = transition.split(" -> ").collect();
                    if parts.len() != 2 {
                        screen_errors.push(format!("invalid transition format: {}", transition));
                        continue;
                    }
                    parts[1]
                } else {
                    transition.as_str()
                };

                if !templates.contains_key(target) {
                    screen_errors.push(format!(
                        "transition references unknown screen: {}",
                        target
                    ));
                }
            }

            if !screen_errors.is_empty() {
                errors.insert(screen_id.clone(), screen_errors);
            }
        }

        errors
    }
}

/// Counts (possibly overlapping) occurrences of `needle` within `haystack`.
fn occurrence_count(needle: &[&str], haystack: &[&str]) -> usize {
    if needle.len() < 2 || haystack.len() < needle.len() {
        return 0;
    }
    haystack
        .windows(needle.len())
        .filter(|window| *window == needle)
        .count()
}
