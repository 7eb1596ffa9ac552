//! Screen state machine.
//!
//! Tracks which screen the monitored application is on and records the
//! transitions it takes. Validation against a template is a thin check
//! here; the richer loop and forced-flow analysis lives in the drift
//! crate's transition checker.

use crate::template::Template;

/// Bounded record of observed screen transitions.
#[derive(Debug, Default)]
pub struct ScreenStateMachine {
    current: Option<String>,
    history: Vec<(String, String)>,
}

impl ScreenStateMachine {
    /// Creates a machine with no current screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// The screen the machine currently believes it is on.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Records a transition and moves the current screen to `to_id`.
    pub fn transition(&mut self, from_id: &str, to_id: &str) {
        self.history.push((from_id.to_string(), to_id.to_string()));
        self.current = Some(to_id.to_string());
    }

    /// Whether a transition to `to_id` is valid under `template`.
    ///
    /// No template, or a template without transition restrictions, allows
    /// everything.
    pub fn is_valid_transition(&self, template: Option<&Template>, to_id: &str) -> bool {
        match template {
            None => true,
            Some(t) => t.allows_transition(to_id),
        }
    }

    /// The most recent `count` transitions, oldest first.
    pub fn history(&self, count: usize) -> &[(String, String)] {
        let start = self.history.len().saturating_sub(count);
        &self.history[start..]
    }

    /// Total transitions recorded.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// True when no transitions have been recorded.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Forgets everything and returns to the initial state.
    pub fn reset(&mut self) {
        self.current = None;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let machine = ScreenStateMachine::new();
        assert!(machine.current().is_none());
        assert!(machine.is_empty());
    }

    #[test]
    fn test_transition_updates_current() {
        let mut machine = ScreenStateMachine::new();
        machine.transition("login", "home");
        machine.transition("home", "settings");

        assert_eq!(machine.current(), Some("settings"));
        assert_eq!(machine.len(), 2);
    }

    #[test]
    fn test_history_window() {
        let mut machine = ScreenStateMachine::new();
        for i in 0..5 {
            machine.transition(&format!("s{}", i), &format!("s{}", i + 1));
        }

        let recent = machine.history(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].1, "s5");
    }

    #[test]
    fn test_validation_without_template() {
        let machine = ScreenStateMachine::new();
        assert!(machine.is_valid_transition(None, "anywhere"));
    }

    #[test]
    fn test_validation_with_template() {
        let machine = ScreenStateMachine::new();
        let template = Template {
            screen_id: "login".to_string(),
            valid_transitions: vec!["login -> home".to_string()],
            ..Default::default()
        };

        assert!(machine.is_valid_transition(Some(&template), "home"));
        assert!(!machine.is_valid_transition(Some(&template), "billing"));
    }

    #[test]
    fn test_reset() {
        let mut machine = ScreenStateMachine::new();
        machine.transition("a", "b");
        machine.reset();

        assert!(machine.current().is_none());
        assert!(machine.is_empty());
    }
}
