use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use adp_types::OperationKind;

use crate::contracts::{DispatchApproach, DispatchResult};

/// Context of the handler a failed dispatch had already selected.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedHandler {
    /// Handler action.
    pub action: String,
    /// Match confidence.
    pub confidence: f64,
    /// Parameters at the point of failure.
    pub parameters: Map<String, Value>,
}

/// Every way a dispatch can fail. Converted into a [`DispatchResult`] at the boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// No usable manifest for the process.
    #[error("process does not support the capability protocol: {process_id} ({reason})")]
    Unsupported {
        /// Target process.
        process_id: String,
        /// Discovery outcome explanation.
        reason: String,
    },
    /// No handler cleared the acceptance floor.
    #[error("no handler matched the request; available handlers: {}", .available_handlers.join(", "))]
    NoHandlerMatched {
        /// Declared actions.
        available_handlers: Vec<String>,
    },
    /// Parameters failed validation.
    #[error("invalid parameters for {}: {}", .handler.action, .errors.join("; "))]
    InvalidParameters {
        /// Selected handler.
        handler: SelectedHandler,
        /// Every violation.
        errors: Vec<String>,
        /// Required parameters that were absent.
        missing: Vec<String>,
    },
    /// The transport primitive returned an error.
    #[error("{operation} operation {} failed: {message}", .handler.action)]
    OperationFailed {
        /// Selected handler.
        handler: SelectedHandler,
        /// Read or write.
        operation: OperationKind,
        /// Transport error text.
        message: String,
    },
    /// The transport primitive did not answer in time.
    #[error("{operation} operation {} timed out after {timeout_ms}ms", .handler.action)]
    OperationTimedOut {
        /// Selected handler.
        handler: SelectedHandler,
        /// Read or write.
        operation: OperationKind,
        /// Configured timeout.
        timeout_ms: u64,
    },
    /// A batch task panicked or was cancelled.
    #[error("dispatch task failed: {0}")]
    TaskFailed(String),
}

impl DispatchError {
    /// Stable label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unsupported { .. } => "unsupported",
            Self::NoHandlerMatched { .. } => "no_match",
            Self::InvalidParameters { .. } => "invalid_parameters",
            Self::OperationFailed { .. } => "operation_failed",
            Self::OperationTimedOut { .. } => "operation_timeout",
            Self::TaskFailed(_) => "task_failed",
        }
    }
}

impl From<DispatchError> for DispatchResult {
    fn from(error: DispatchError) -> Self {
        let approach = match error {
            DispatchError::Unsupported { .. } => DispatchApproach::Legacy,
            _ => DispatchApproach::Adp,
        };
        let mut result = Self::failed(approach, error.to_string());
        match error {
            DispatchError::Unsupported { .. } | DispatchError::TaskFailed(_) => {}
            DispatchError::NoHandlerMatched { available_handlers } => {
                result.available_handlers = Some(available_handlers);
            }
            DispatchError::InvalidParameters {
                handler,
                errors,
                missing,
            } => {
                apply_handler(&mut result, handler);
                result.validation_errors = Some(errors);
                if !missing.is_empty() {
                    result.missing_parameters = Some(missing);
                }
            }
            DispatchError::OperationFailed {
                handler, operation, ..
            }
            | DispatchError::OperationTimedOut {
                handler, operation, ..
            } => {
                apply_handler(&mut result, handler);
                result.operation = Some(operation);
            }
        }
        result
    }
}

fn apply_handler(result: &mut DispatchResult, handler: SelectedHandler) {
    result.handler_used = Some(handler.action);
    result.confidence = Some(handler.confidence);
    result.parameters_used = Some(handler.parameters);
}
