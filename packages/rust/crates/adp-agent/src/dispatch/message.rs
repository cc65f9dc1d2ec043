//! Wire message construction.

use serde_json::{Map, Value};

use adp_types::{ACTION_TAG, HandlerDescriptor, Tag};

use crate::contracts::WireMessage;
use crate::params::{ValidationError, value_as_text};

/// Parameter whose value travels as the message body instead of a tag.
pub const BODY_PARAMETER: &str = "Data";

/// Build the ordered message for `handler` from validated `parameters`.
///
/// Tags follow `pattern` (`Action` carries the action, other names take the
/// same-named parameter), then every remaining declared parameter in
/// declared order. A `Data` parameter becomes the body.
///
/// # Errors
/// Returns one [`ValidationError::UnfilledPatternTag`] per pattern tag with no value.
pub fn build_message(
    handler: &HandlerDescriptor,
    parameters: &Map<String, Value>,
) -> Result<WireMessage, Vec<ValidationError>> {
    let mut tags = Vec::with_capacity(handler.pattern.len() + handler.parameters.len());
    let mut unfilled = Vec::new();

    for name in &handler.pattern {
        if name == ACTION_TAG {
            tags.push(Tag::new(ACTION_TAG, handler.action.clone()));
        } else if let Some(value) = parameters.get(name) {
            tags.push(Tag::new(name.clone(), value_as_text(value)));
        } else {
            unfilled.push(ValidationError::UnfilledPatternTag { tag: name.clone() });
        }
    }
    if !unfilled.is_empty() {
        return Err(unfilled);
    }

    let mut body = None;
    for param in &handler.parameters {
        let Some(value) = parameters.get(&param.name) else {
            continue;
        };
        if param.name == BODY_PARAMETER {
            body = Some(value_as_text(value));
        } else if !handler.pattern.contains(&param.name) {
            tags.push(Tag::new(param.name.clone(), value_as_text(value)));
        }
    }

    Ok(WireMessage { tags, body })
}
