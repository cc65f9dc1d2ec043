//! Local half of a dispatch: match, extract, validate, build. No I/O.

use serde_json::{Map, Value};

use adp_types::CapabilityManifest;

use super::error::{DispatchError, SelectedHandler};
use super::message::build_message;
use super::operation::classify_operation;
use crate::contracts::{DispatchPlan, MatchOutcome};
use crate::matcher::HandlerMatcher;
use crate::params::validate_parameters;

/// Resolve `text` against `manifest` into a ready-to-send plan.
///
/// `overrides` are caller-supplied values merged over the extracted ones
/// before validation.
///
/// # Errors
/// [`DispatchError::NoHandlerMatched`] or [`DispatchError::InvalidParameters`].
pub fn plan_dispatch(
    matcher: &HandlerMatcher,
    manifest: &CapabilityManifest,
    text: &str,
    overrides: &Map<String, Value>,
) -> Result<DispatchPlan, DispatchError> {
    let matched = match matcher.match_handler(manifest, text) {
        MatchOutcome::Matched(matched) => matched,
        MatchOutcome::NoMatch { available_handlers } => {
            return Err(DispatchError::NoHandlerMatched { available_handlers });
        }
    };

    let mut supplied = matched.extracted_parameters;
    for (name, value) in overrides {
        let key = matched
            .handler
            .parameter_ignore_case(name)
            .map_or_else(|| name.clone(), |param| param.name.clone());
        supplied.insert(key, value.clone());
    }

    let report = validate_parameters(&matched.handler, &supplied);
    if !report.valid {
        return Err(DispatchError::InvalidParameters {
            handler: SelectedHandler {
                action: matched.handler.action.clone(),
                confidence: matched.confidence,
                parameters: supplied,
            },
            missing: report.missing(),
            errors: report.messages(),
        });
    }

    let message = build_message(&matched.handler, &report.parameters).map_err(|errors| {
        DispatchError::InvalidParameters {
            handler: SelectedHandler {
                action: matched.handler.action.clone(),
                confidence: matched.confidence,
                parameters: report.parameters.clone(),
            },
            missing: errors
                .iter()
                .map(|error| error.parameter().to_string())
                .collect(),
            errors: errors.iter().map(ToString::to_string).collect(),
        }
    })?;

    Ok(DispatchPlan {
        operation: classify_operation(&matched.handler),
        handler: matched.handler.action,
        confidence: matched.confidence,
        method: matched.method,
        parameters: report.parameters,
        message,
    })
}
