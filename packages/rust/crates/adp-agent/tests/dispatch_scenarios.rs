#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use adp_agent::{
    DispatchApproach, DispatchRequest, Dispatcher, DispatcherConfig, MatchMethod,
};
use adp_client::test_support::{CallKind, ScriptedReply, ScriptedTransport};
use adp_types::{CapabilityManifest, OperationKind, Tag};
use serde_json::{Map, Value, json};

fn token_manifest() -> Value {
    json!({
        "protocolVersion": "1.0",
        "lastUpdated": "2025-01-15T10:30:00Z",
        "capabilities": {
            "supportsExamples": true,
            "supportsHandlerRegistry": true,
            "supportsParameterValidation": true
        },
        "handlers": [
            {
                "action": "Balance",
                "category": "core",
                "description": "Get the token balance of an account",
                "examples": ["check balance for alice"],
                "parameters": [
                    {"name": "Target", "required": false, "type": "address"}
                ]
            },
            {
                "action": "Transfer",
                "category": "core",
                "description": "Transfer tokens to a recipient",
                "examples": ["transfer 100 tokens to bob"],
                "parameters": [
                    {"name": "Target", "required": true, "type": "address"},
                    {"name": "Quantity", "required": true, "type": "number",
                     "validation": {"min": 1}}
                ]
            }
        ]
    })
}

fn dispatcher(transport: &Arc<ScriptedTransport>) -> Dispatcher<ScriptedTransport> {
    let config = DispatcherConfig {
        operation_timeout_ms: 200,
        ..DispatcherConfig::default()
    };
    Dispatcher::new(Arc::clone(transport), config)
}

fn object(raw: Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn identity() -> String {
    "wallet-1".to_string()
}

#[tokio::test]
async fn scenario_a_balance_is_dispatched_as_read() {
    let transport = Arc::new(ScriptedTransport::new().with_manifest("token", &token_manifest()));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .execute("token", "check balance for alice", &identity())
        .await;

    assert!(result.success, "{result:?}");
    assert_eq!(result.approach, DispatchApproach::Adp);
    assert_eq!(result.handler_used.as_deref(), Some("Balance"));
    assert!(result.confidence.expect("confidence") >= 0.3);
    assert_eq!(result.operation, Some(OperationKind::Read));
    assert_eq!(result.parameters_used, Some(object(json!({"Target": "alice"}))));
    assert_eq!(result.data, Some(json!({"Messages": [{"Data": "ok"}]})));

    let calls = transport.calls();
    let last = calls.last().expect("dispatch call");
    assert_eq!(last.kind, CallKind::Read);
    assert_eq!(
        last.tags,
        vec![Tag::new("Action", "Balance"), Tag::new("Target", "alice")]
    );
}

#[tokio::test]
async fn scenario_b_transfer_is_dispatched_as_write() {
    let transport = Arc::new(ScriptedTransport::new().with_manifest("token", &token_manifest()));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .execute("token", "transfer 100 tokens to alice", &identity())
        .await;

    assert!(result.success, "{result:?}");
    assert_eq!(result.handler_used.as_deref(), Some("Transfer"));
    assert_eq!(result.operation, Some(OperationKind::Write));
    assert_eq!(
        result.parameters_used,
        Some(object(json!({"Target": "alice", "Quantity": 100})))
    );
    assert_eq!(result.data, Some(json!({"id": "message-1"})));

    let calls = transport.calls();
    let last = calls.last().expect("dispatch call");
    assert_eq!(last.kind, CallKind::Send);
    assert_eq!(last.identity.as_deref(), Some("wallet-1"));
    assert_eq!(
        last.tags,
        vec![
            Tag::new("Action", "Transfer"),
            Tag::new("Target", "alice"),
            Tag::new("Quantity", "100"),
        ]
    );
}

#[tokio::test]
async fn scenario_c_unrelated_text_lists_available_handlers() {
    let transport = Arc::new(ScriptedTransport::new().with_manifest("token", &token_manifest()));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .execute("token", "do something unrelated", &identity())
        .await;

    assert!(!result.success);
    assert!(
        result
            .error
            .as_deref()
            .is_some_and(|error| error.contains("no handler matched"))
    );
    assert_eq!(
        result.available_handlers,
        Some(vec!["Balance".to_string(), "Transfer".to_string()])
    );
    assert!(
        transport
            .calls()
            .iter()
            .all(|call| call.kind != CallKind::Send)
    );
}

#[tokio::test]
async fn legacy_process_is_reported_unsupported() {
    let transport = Arc::new(ScriptedTransport::new());
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .execute("legacy", "transfer 5 to bob", &identity())
        .await;

    assert!(!result.success);
    assert_eq!(result.approach, DispatchApproach::Legacy);
    assert!(
        result
            .error
            .as_deref()
            .is_some_and(|error| {
                error.starts_with("process does not support the capability protocol: legacy")
            })
    );
    assert_eq!(transport.calls().iter().filter(|c| c.kind == CallKind::Send).count(), 0);
}

#[tokio::test]
async fn missing_parameters_are_listed_and_nothing_is_sent() {
    let transport = Arc::new(ScriptedTransport::new().with_manifest("token", &token_manifest()));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher.execute("token", "transfer to alice", &identity()).await;

    assert!(!result.success);
    assert_eq!(result.handler_used.as_deref(), Some("Transfer"));
    assert_eq!(result.missing_parameters, Some(vec!["Quantity".to_string()]));
    assert_eq!(
        result.validation_errors,
        Some(vec!["missing required parameter 'Quantity'".to_string()])
    );
    assert!(
        transport
            .calls()
            .iter()
            .all(|call| call.kind != CallKind::Send)
    );
}

#[tokio::test]
async fn range_violation_rejects_the_request() {
    let transport = Arc::new(ScriptedTransport::new().with_manifest("token", &token_manifest()));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .execute("token", "transfer 0 tokens to alice", &identity())
        .await;

    assert!(!result.success);
    let errors = result.validation_errors.expect("validation errors");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("at least 1"));
}

#[tokio::test]
async fn caller_parameters_fill_and_override_extraction() {
    let transport = Arc::new(ScriptedTransport::new().with_manifest("token", &token_manifest()));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .execute_with_parameters(
            "token",
            "transfer to alice",
            &identity(),
            &object(json!({"quantity": "25", "Target": "carol"})),
        )
        .await;

    assert!(result.success, "{result:?}");
    assert_eq!(
        result.parameters_used,
        Some(object(json!({"Target": "carol", "Quantity": 25})))
    );
}

#[tokio::test]
async fn transport_errors_are_wrapped() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_manifest("token", &token_manifest())
            .with_send_reply(ScriptedReply::Fail("insufficient balance".to_string())),
    );
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .execute("token", "transfer 100 tokens to alice", &identity())
        .await;

    assert!(!result.success);
    assert_eq!(result.operation, Some(OperationKind::Write));
    let error = result.error.expect("error");
    assert!(error.contains("write operation Transfer failed"), "{error}");
    assert!(error.contains("insufficient balance"), "{error}");
}

#[tokio::test]
async fn hanging_operation_times_out() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_manifest("token", &token_manifest())
            .with_read_reply(ScriptedReply::Hang),
    );
    let dispatcher = dispatcher(&transport);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        dispatcher.execute("token", "check balance for alice", &identity()),
    )
    .await
    .expect("dispatcher enforces its own timeout");

    assert!(!result.success);
    assert_eq!(result.operation, Some(OperationKind::Read));
    assert!(
        result
            .error
            .as_deref()
            .is_some_and(|error| error.contains("timed out after 200ms"))
    );
}

#[tokio::test]
async fn declared_operation_overrides_verb_heuristic() {
    let manifest = json!({
        "protocolVersion": "1.0",
        "handlers": [
            {"action": "Transfer", "operation": "read", "description": "Simulate a transfer",
             "parameters": [{"name": "Quantity", "required": true, "type": "number"}]}
        ]
    });
    let transport = Arc::new(ScriptedTransport::new().with_manifest("sim", &manifest));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher.execute("sim", "transfer 3", &identity()).await;

    assert!(result.success, "{result:?}");
    assert_eq!(result.operation, Some(OperationKind::Read));
    assert_eq!(transport.calls().last().map(|c| c.kind), Some(CallKind::Read));
}

#[tokio::test]
async fn repeated_dispatch_reuses_cached_manifest() {
    let transport = Arc::new(ScriptedTransport::new().with_manifest("token", &token_manifest()));
    let dispatcher = dispatcher(&transport);

    for _ in 0..3 {
        let result = dispatcher
            .execute("token", "check balance for alice", &identity())
            .await;
        assert!(result.success);
    }
    assert_eq!(transport.info_reads(), 1);
    assert_eq!(dispatcher.cache().keys().await, vec!["token".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn batch_results_follow_request_order() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_manifest("token", &token_manifest())
            .with_info_delay(Duration::from_millis(30)),
    );
    let dispatcher = Arc::new(dispatcher(&transport));

    let results = dispatcher
        .execute_batch(
            vec![
                DispatchRequest::new("token", "check balance for alice"),
                DispatchRequest::new("legacy", "transfer 1 to bob"),
                DispatchRequest::new("token", "transfer 5 to carol"),
                DispatchRequest::new("token", "transfer to dave")
                    .with_parameters(object(json!({"Quantity": 2}))),
            ],
            Arc::new(identity()),
        )
        .await;

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].handler_used.as_deref(), Some("Balance"));
    assert!(results[0].success);
    assert_eq!(results[1].approach, DispatchApproach::Legacy);
    assert!(!results[1].success);
    assert_eq!(results[2].handler_used.as_deref(), Some("Transfer"));
    assert_eq!(
        results[2].parameters_used,
        Some(object(json!({"Target": "carol", "Quantity": 5})))
    );
    assert!(results[3].success, "{:?}", results[3]);
    assert_eq!(results[3].handler_used.as_deref(), Some("Transfer"));

    // One discovery per distinct process, shared by concurrent requests.
    assert_eq!(transport.info_reads(), 2);
}

#[test]
fn plan_is_a_pure_dry_run() {
    let transport = Arc::new(ScriptedTransport::new());
    let dispatcher = dispatcher(&transport);
    let manifest = CapabilityManifest::from_value(token_manifest()).expect("manifest");

    let plan = dispatcher
        .plan(&manifest, "transfer 100 tokens to alice", &Map::new())
        .expect("plan");

    assert_eq!(plan.handler, "Transfer");
    assert_eq!(plan.method, MatchMethod::ExactAction);
    assert_eq!(plan.operation, OperationKind::Write);
    assert_eq!(plan.message.tags[0], Tag::new("Action", "Transfer"));
    assert!(plan.message.body.is_none());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn result_envelope_serializes_camel_case_without_empty_fields() {
    let transport = Arc::new(ScriptedTransport::new().with_manifest("token", &token_manifest()));
    let dispatcher = dispatcher(&transport);

    let result = dispatcher
        .execute("token", "do something unrelated", &identity())
        .await;
    let rendered = serde_json::to_value(&result).expect("serialize");

    assert_eq!(rendered["success"], json!(false));
    assert_eq!(rendered["approach"], json!("adp"));
    assert_eq!(rendered["availableHandlers"], json!(["Balance", "Transfer"]));
    assert!(rendered.get("handlerUsed").is_none());
    assert!(rendered.get("data").is_none());
}
