#![allow(missing_docs)]

use adp_agent::{ValidationError, extract_parameters, validate_parameters};
use adp_types::{CapabilityManifest, HandlerDescriptor};
use serde_json::{Map, Value, json};

fn order_handler() -> HandlerDescriptor {
    let manifest = CapabilityManifest::from_value(json!({
        "protocolVersion": "1.0",
        "handlers": [{
            "action": "PlaceOrder",
            "description": "Place a limit order",
            "parameters": [
                {"name": "Side", "required": true, "type": "string",
                 "validation": {"enum": ["buy", "sell"]}},
                {"name": "Amount", "required": true, "type": "number",
                 "validation": {"min": 1, "max": 100}},
                {"name": "Memo", "required": false, "type": "string",
                 "validation": {"pattern": "^[a-z]+$"}},
                {"name": "PostOnly", "required": false, "type": "boolean"},
                {"name": "Owner", "required": false, "type": "address"},
                {"name": "Payload", "required": false, "type": "json"}
            ]
        }]
    }))
    .expect("valid manifest");
    manifest.handlers[0].clone()
}

fn values(raw: Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[test]
fn every_missing_required_parameter_is_reported() {
    let report = validate_parameters(&order_handler(), &Map::new());

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.missing(), vec!["Side".to_string(), "Amount".to_string()]);
}

#[test]
fn empty_and_null_values_count_as_missing() {
    let report = validate_parameters(
        &order_handler(),
        &values(json!({"Side": "  ", "Amount": null})),
    );

    assert_eq!(report.missing(), vec!["Side".to_string(), "Amount".to_string()]);
}

#[test]
fn constraint_violations_are_collected_together() {
    let report = validate_parameters(
        &order_handler(),
        &values(json!({
            "Side": "hold",
            "Amount": "250",
            "Memo": "Not Lowercase",
            "PostOnly": "maybe",
            "Payload": "{broken"
        })),
    );

    assert!(!report.valid);
    assert!(matches!(
        &report.errors[0],
        ValidationError::NotInEnum { name, value, .. } if name == "Side" && value == "hold"
    ));
    assert!(matches!(
        &report.errors[1],
        ValidationError::AboveMaximum { name, .. } if name == "Amount"
    ));
    assert!(matches!(
        &report.errors[2],
        ValidationError::PatternMismatch { name, .. } if name == "Memo"
    ));
    assert!(matches!(
        &report.errors[3],
        ValidationError::NotABoolean { name, .. } if name == "PostOnly"
    ));
    assert!(matches!(
        &report.errors[4],
        ValidationError::InvalidJson { name, .. } if name == "Payload"
    ));
    assert_eq!(report.errors.len(), 5);
    assert_eq!(
        report.messages()[0],
        "parameter 'Side' must be one of [buy, sell], got 'hold'"
    );
}

#[test]
fn numbers_are_coerced_and_bounds_checked() {
    let low = validate_parameters(&order_handler(), &values(json!({"Side": "buy", "Amount": 0})));
    assert!(matches!(
        &low.errors[..],
        [ValidationError::BelowMinimum { name, .. }] if name == "Amount"
    ));

    let text = validate_parameters(
        &order_handler(),
        &values(json!({"Side": "buy", "Amount": "ten"})),
    );
    assert!(matches!(
        &text.errors[..],
        [ValidationError::NotANumber { name, value }] if name == "Amount" && value == "ten"
    ));

    let ok = validate_parameters(
        &order_handler(),
        &values(json!({"Side": "sell", "Amount": "1,000", "PostOnly": "yes"})),
    );
    assert!(matches!(&ok.errors[..], [ValidationError::AboveMaximum { .. }]));
}

#[test]
fn valid_request_yields_typed_values() {
    let report = validate_parameters(
        &order_handler(),
        &values(json!({
            "side": "buy",
            "Amount": "12.5",
            "Memo": "gm",
            "PostOnly": "true",
            "Payload": "{\"tif\":\"gtc\"}",
            "Unknown": "ignored"
        })),
    );

    assert!(report.valid, "{:?}", report.errors);
    assert_eq!(
        Value::Object(report.parameters),
        json!({
            "Side": "buy",
            "Amount": 12.5,
            "Memo": "gm",
            "PostOnly": true,
            "Payload": {"tif": "gtc"}
        })
    );
}

#[test]
fn extraction_feeds_validation() {
    let handler = order_handler();

    let extracted = extract_parameters(&handler, "place order Side=sell Amount=40");
    let report = validate_parameters(&handler, &extracted);

    assert!(report.valid, "{:?}", report.errors);
    assert_eq!(report.parameters.get("Side"), Some(&json!("sell")));
    assert_eq!(report.parameters.get("Amount"), Some(&json!(40)));
}
