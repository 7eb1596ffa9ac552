//! End-to-end pipeline tests: capture → normalize → match → diff →
//! event → hash-chained log.

use driftwatch_core::{Config, DriftPipeline, DriftType, Severity};
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

#[test]
fn full_flow_observe_drift_and_verify_log() {
    let dir = TempDir::new().unwrap();
    write_template(
        &dir,
        "inbox.yaml",
        "screen_id: inbox\nrequired_nodes: [compose_button, message_list, search_box]\nexpected_node_count: 20\n",
    );

    let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();

    // A capture that looks nothing like the baseline.
    let stranger = json!({"root": {
        "role": "window",
        "name": "upsell_modal",
        "children": [{"role": "button", "name": "subscribe_now"}]
    }});

    let outcome = pipeline.observe(&stranger).unwrap();
    assert!(outcome.matched_screen.is_none());
    assert_eq!(outcome.events.len(), 1);

    let event = &outcome.events[0];
    assert_eq!(event.drift_type, DriftType::Layout);
    assert!(event.severity >= Severity::Warning);

    // The finding is in the log, chained and verifiable.
    assert_eq!(pipeline.log().len(), 1);
    assert!(pipeline.verify_integrity());

    let entry = &pipeline.log().get_entries(0, None)[0];
    assert_eq!(
        entry.data.get("drift_type").and_then(|v| v.as_str()),
        Some("layout")
    );
}

#[test]
fn observation_survives_template_reload() {
    let dir = TempDir::new().unwrap();
    write_template(&dir, "one.yaml", "screen_id: one\nrequired_nodes: [alpha]\n");

    let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();
    assert_eq!(pipeline.templates().list(), vec!["one"]);

    write_template(&dir, "two.yaml", "screen_id: two\nrequired_nodes: [beta]\n");
    assert_eq!(pipeline.reload_templates().unwrap(), 2);

    let capture = json!({"root": {
        "role": "window",
        "children": [{"role": "text", "name": "beta"}]
    }});
    let outcome = pipeline.observe(&capture).unwrap();
    assert_eq!(outcome.matched_screen.as_deref(), Some("two"));
}

#[test]
fn events_accumulate_across_operations() {
    let dir = TempDir::new().unwrap();
    write_template(
        &dir,
        "login.yaml",
        "screen_id: login\nvalid_transitions: [\"login -> home\"]\n",
    );

    let mut pipeline = DriftPipeline::new(test_config(&dir)).unwrap();

    pipeline.observe_transition("login", "billing").unwrap();
    pipeline
        .compare(
            &json!({"root": {"role": "window", "children": [
                {"role": "text", "name": "price", "value": "$1"}
            ]}}),
            &json!({"root": {"role": "window", "children": [
                {"role": "text", "name": "price", "value": "$99"}
            ]}}),
            "checkout",
        )
        .unwrap();

    assert!(pipeline.log().len() >= 2);
    assert!(pipeline.verify_integrity());

    // Entries link in append order.
    let entries = pipeline.log().get_entries(0, None);
    for pair in entries.windows(2) {
        assert_eq!(pair[1].previous_hash, pair[0].entry_hash);
    }
}

#[test]
fn log_reopens_with_intact_chain() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    {
        let mut pipeline = DriftPipeline::new(config.clone()).unwrap();
        pipeline.append_payload(json!({"kind": "session_start"})).unwrap();
        pipeline.append_payload(json!({"kind": "session_end"})).unwrap();
        pipeline.shutdown().unwrap();
    }

    let pipeline = DriftPipeline::new(config).unwrap();
    assert_eq!(pipeline.log().len(), 2);
    assert!(pipeline.verify_integrity());
}
