#![allow(missing_docs)]

use adp_agent::{HandlerMatcher, MatchMethod, MatchOutcome};
use adp_types::CapabilityManifest;
use serde_json::{Value, json};

fn manifest(raw: Value) -> CapabilityManifest {
    CapabilityManifest::from_value(raw).expect("valid manifest")
}

fn calculator() -> CapabilityManifest {
    let operands = json!([
        {"name": "A", "required": true, "type": "number"},
        {"name": "B", "required": true, "type": "number"}
    ]);
    manifest(json!({
        "protocolVersion": "1.0",
        "handlers": [
            {"action": "Add", "description": "Add two numbers", "parameters": operands},
            {"action": "Subtract", "description": "Subtract B from A", "parameters": operands},
            {"action": "Multiply", "description": "Multiply two numbers", "parameters": operands},
            {"action": "Divide", "description": "Divide A by B", "parameters": operands}
        ]
    }))
}

fn twins() -> CapabilityManifest {
    manifest(json!({
        "protocolVersion": "1.0",
        "handlers": [
            {"action": "Ping", "description": "Report the node health"},
            {"action": "Probe", "description": "Report the node health"}
        ]
    }))
}

#[test]
fn operator_selects_matching_arithmetic_handler() {
    let matcher = HandlerMatcher::default();

    let matched = matcher
        .match_handler(&calculator(), "what is 5 + 3")
        .matched()
        .expect("matched");

    assert_eq!(matched.handler.action, "Add");
    assert_eq!(matched.method, MatchMethod::DomainPattern);
    assert_eq!(matched.extracted_parameters.get("A"), Some(&json!(5)));
    assert_eq!(matched.extracted_parameters.get("B"), Some(&json!(3)));
}

#[test]
fn spelled_operator_routes_to_its_family() {
    let matcher = HandlerMatcher::default();

    let matched = matcher
        .match_handler(&calculator(), "10 divided by 2")
        .matched()
        .expect("matched");

    assert_eq!(matched.handler.action, "Divide");
    assert_eq!(matched.extracted_parameters.get("A"), Some(&json!(10)));
    assert_eq!(matched.extracted_parameters.get("B"), Some(&json!(2)));
}

#[test]
fn named_action_outranks_shape() {
    let matcher = HandlerMatcher::default();

    let matched = matcher
        .match_handler(&calculator(), "multiply 4 and 6")
        .matched()
        .expect("matched");

    assert_eq!(matched.handler.action, "Multiply");
    assert_eq!(matched.method, MatchMethod::ExactAction);
    assert!((matched.confidence - 0.95).abs() < f64::EPSILON);
}

#[test]
fn equal_scores_always_pick_first_declared_handler() {
    let matcher = HandlerMatcher::default();
    let manifest = twins();

    for _ in 0..25 {
        let matched = matcher
            .match_handler(&manifest, "report node health please")
            .matched()
            .expect("matched");
        assert_eq!(matched.handler_index, 0);
        assert_eq!(matched.handler.action, "Ping");
        assert_eq!(matched.method, MatchMethod::LexicalOverlap);
    }
}

#[test]
fn unrelated_text_lists_handlers_in_declaration_order() {
    let matcher = HandlerMatcher::default();

    let outcome = matcher.match_handler(&calculator(), "order a pizza");

    assert_eq!(
        outcome,
        MatchOutcome::NoMatch {
            available_handlers: vec![
                "Add".to_string(),
                "Subtract".to_string(),
                "Multiply".to_string(),
                "Divide".to_string(),
            ],
        }
    );
}

#[test]
fn raised_floor_rejects_lexical_guesses() {
    let strict = HandlerMatcher::new(0.9);

    let outcome = strict.match_handler(&twins(), "report node health please");

    assert!(matches!(outcome, MatchOutcome::NoMatch { .. }));
    assert!(!strict.candidates(&twins(), "report node health please").is_empty());
}

#[test]
fn empty_manifest_never_matches() {
    let empty = manifest(json!({"protocolVersion": "1.0", "handlers": []}));

    let outcome = HandlerMatcher::default().match_handler(&empty, "transfer 5 to bob");

    assert_eq!(
        outcome,
        MatchOutcome::NoMatch {
            available_handlers: Vec::new(),
        }
    );
}

#[test]
fn match_result_serializes_camel_case() {
    let matched = HandlerMatcher::default()
        .match_handler(&calculator(), "add 1 and 2")
        .matched()
        .expect("matched");

    let rendered = serde_json::to_value(&matched).expect("serialize");

    assert_eq!(rendered["handlerIndex"], json!(0));
    assert_eq!(rendered["method"], json!("exact_action"));
    assert_eq!(rendered["extractedParameters"], json!({"A": 1, "B": 2}));
}
