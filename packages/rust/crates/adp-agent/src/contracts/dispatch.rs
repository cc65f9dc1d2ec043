use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use adp_types::{OperationKind, Tag};

use super::MatchMethod;

/// How the request was (or would have been) routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchApproach {
    /// Routed through the process's capability manifest.
    Adp,
    /// The process publishes no manifest; callers should fall back to plain messaging.
    Legacy,
}

/// Ordered tags plus optional body for one outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Tags in wire order: `pattern` first, then remaining parameters.
    pub tags: Vec<Tag>,
    /// Message body (`Data` parameter), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Fully resolved request, ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPlan {
    /// Selected handler action.
    pub handler: String,
    /// Match confidence.
    pub confidence: f64,
    /// Strategy that selected the handler.
    pub method: MatchMethod,
    /// Read query or write transaction.
    pub operation: OperationKind,
    /// Validated, coerced parameter values.
    pub parameters: Map<String, Value>,
    /// Outgoing message.
    pub message: WireMessage,
}

/// Uniform outward envelope. Every dispatch entry point returns exactly this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    /// Whether the transport call succeeded.
    pub success: bool,
    /// Routing approach.
    pub approach: DispatchApproach,
    /// Action of the handler that was selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_used: Option<String>,
    /// Match confidence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Parameters sent (or rejected).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_used: Option<Map<String, Value>>,
    /// Read or write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    /// Raw transport response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Typed failure description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Declared actions, attached when no handler matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_handlers: Option<Vec<String>>,
    /// Required parameters that could not be bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_parameters: Option<Vec<String>>,
    /// Full list of parameter violations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<String>>,
}

impl DispatchResult {
    /// Successful transport call described by `plan`.
    #[must_use]
    pub fn completed(plan: DispatchPlan, data: Value) -> Self {
        Self {
            success: true,
            approach: DispatchApproach::Adp,
            handler_used: Some(plan.handler),
            confidence: Some(plan.confidence),
            parameters_used: Some(plan.parameters),
            operation: Some(plan.operation),
            data: Some(data),
            error: None,
            available_handlers: None,
            missing_parameters: None,
            validation_errors: None,
        }
    }

    /// Bare failure envelope; callers fill in the diagnostics they have.
    #[must_use]
    pub fn failed(approach: DispatchApproach, error: impl Into<String>) -> Self {
        Self {
            success: false,
            approach,
            handler_used: None,
            confidence: None,
            parameters_used: None,
            operation: None,
            data: None,
            error: Some(error.into()),
            available_handlers: None,
            missing_parameters: None,
            validation_errors: None,
        }
    }
}
