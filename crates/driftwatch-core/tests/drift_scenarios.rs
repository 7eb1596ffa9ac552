//! Drift scenarios exercised end to end: exact matches, removed nodes,
//! content-only changes, forced flows, and log tampering.

use driftwatch_core::{
    generate_signatures, normalize, Config, DriftPipeline, DriftType, Matcher, Severity,
};
use driftwatch_drift::DiffEngine;
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

/// Exact match: a login capture with exactly the required nodes scores
/// high and best-match selects the login template.
#[test]
fn scenario_exact_match() {
    let dir = TempDir::new().unwrap();
    write_template(
        &dir,
        "login.yaml",
        "screen_id: login\nrequired_nodes: [email_input, password_input, login_button]\n",
    );

    let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();
    let capture = json!({"root": {
        "role": "window",
        "name": "login",
        "children": [
            {"role": "textbox", "name": "email_input"},
            {"role": "textbox", "name": "password_input"},
            {"role": "button", "name": "login_button"},
        ]
    }});

    let outcome = pipeline.observe(&capture).unwrap();
    assert_eq!(outcome.matched_screen.as_deref(), Some("login"));
    assert!(outcome.score >= 0.9, "score {}", outcome.score);

    // The same selection holds through the matcher directly.
    let tree = normalize(&capture);
    let snapshot = pipeline.templates().snapshot();
    let (best, _) = Matcher::default()
        .find_best_match(&tree, snapshot.values())
        .unwrap();
    assert_eq!(best.screen_id, "login");
}

/// Missing critical node: removing the send button from a chat input area
/// yields exactly one removed entry at the right path and a layout event.
#[test]
fn scenario_missing_send_button() {
    let baseline = json!({"root": {
        "role": "window",
        "name": "channel_view",
        "children": [
            {"role": "list", "name": "message_list"},
            {"role": "group", "name": "input_area", "children": [
                {"role": "button", "name": "attach_button"},
                {"role": "button", "name": "send_button"},
            ]},
        ]
    }});
    let modified = json!({"root": {
        "role": "window",
        "name": "channel_view",
        "children": [
            {"role": "list", "name": "message_list"},
            {"role": "group", "name": "input_area", "children": [
                {"role": "button", "name": "attach_button"},
            ]},
        ]
    }});

    let diff = DiffEngine::new().diff(&normalize(&baseline), &normalize(&modified));

    let removed_buttons: Vec<_> = diff
        .removed
        .iter()
        .filter(|e| e.node.name == "send_button")
        .collect();
    assert_eq!(removed_buttons.len(), 1);
    assert!(removed_buttons[0].path.contains("/children["));
    assert!(diff.similarity < 1.0);

    // The pipeline turns it into a layout event of at least warning.
    let dir = TempDir::new().unwrap();
    let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();
    let outcome = pipeline.compare(&baseline, &modified, "channel_view").unwrap();

    let layout: Vec<_> = outcome
        .events
        .iter()
        .filter(|e| e.drift_type == DriftType::Layout)
        .collect();
    assert_eq!(layout.len(), 1);
    assert!(layout[0].severity >= Severity::Warning);
}

/// Content-only change: a payout amount changes while the layout stays
/// identical. Structural signatures agree, content and full differ, the
/// diff pins the value change, and the event is informational.
#[test]
fn scenario_payout_content_change() {
    let baseline = json!({"root": {
        "role": "window",
        "name": "earnings",
        "children": [
            {"role": "text", "name": "payout", "value": "$12.50"},
            {"role": "button", "name": "cash_out_button"},
        ]
    }});
    let observed = json!({"root": {
        "role": "window",
        "name": "earnings",
        "children": [
            {"role": "text", "name": "payout", "value": "$8.00"},
            {"role": "button", "name": "cash_out_button"},
        ]
    }});

    let sig_a = generate_signatures(&normalize(&baseline));
    let sig_b = generate_signatures(&normalize(&observed));
    assert_eq!(sig_a.structural, sig_b.structural);
    assert_ne!(sig_a.full, sig_b.full);

    let dir = TempDir::new().unwrap();
    let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();
    let outcome = pipeline.compare(&baseline, &observed, "earnings").unwrap();

    assert_eq!(outcome.diff.modified.len(), 1);
    let modified = &outcome.diff.modified[0];
    assert!(modified.path.ends_with("/children[1]") || modified.path.contains("children"));
    assert_eq!(
        modified.changes.get("value"),
        Some(&(json!("$12.50"), json!("$8.00")))
    );

    let content: Vec<_> = outcome
        .events
        .iter()
        .filter(|e| e.drift_type == DriftType::Content)
        .collect();
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].severity, Severity::Info);
}

/// Forced flow: three screens each with exactly one allowed transition.
/// Walking A → B → C → end raises a manipulative event with the full flow.
#[test]
fn scenario_forced_flow() {
    let dir = TempDir::new().unwrap();
    write_template(&dir, "a.yaml", "screen_id: a\nvalid_transitions: [\"a -> b\"]\n");
    write_template(&dir, "b.yaml", "screen_id: b\nvalid_transitions: [\"b -> c\"]\n");
    write_template(&dir, "c.yaml", "screen_id: c\nvalid_transitions: [\"c -> end\"]\n");

    let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();

    pipeline.observe_transition("a", "b").unwrap();
    pipeline.observe_transition("b", "c").unwrap();
    let outcome = pipeline.observe_transition("c", "end").unwrap();

    assert!(outcome.result.is_valid);

    let forced: Vec<_> = outcome
        .events
        .iter()
        .filter(|e| e.drift_type == DriftType::Manipulative)
        .collect();
    assert_eq!(forced.len(), 1);
    assert!(forced[0].is_critical());

    let flow = forced[0]
        .details
        .get("flow")
        .and_then(|v| v.as_array())
        .unwrap();
    let flow: Vec<&str> = flow.iter().filter_map(|v| v.as_str()).collect();
    assert_eq!(flow, vec!["a", "b", "c", "end"]);
    assert_eq!(pipeline.current_screen(), Some("end"));
}

/// Tamper detection: externally rewriting an entry's payload is caught on
/// reopen, at the tampered index.
#[test]
fn scenario_log_tampering() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let mut pipeline = DriftPipeline::new(config.clone()).unwrap();
        pipeline.append_payload(json!({"value": "alpha"})).unwrap();
        pipeline.append_payload(json!({"value": "beta"})).unwrap();
        pipeline.append_payload(json!({"value": "gamma"})).unwrap();
        pipeline.shutdown().unwrap();
        assert!(pipeline.verify_integrity());
    }

    let log_path = config.log_path.clone();
    let tampered = std::fs::read_to_string(&log_path)
        .unwrap()
        .replace("beta", "TAMPERED");
    std::fs::write(&log_path, tampered).unwrap();

    let pipeline = DriftPipeline::new(config).unwrap();
    assert!(!pipeline.verify_integrity());
    assert_eq!(pipeline.log().verification().first_invalid, Some(1));
}
