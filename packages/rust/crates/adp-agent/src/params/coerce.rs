//! Type coercion for extracted or caller-supplied values.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Number, Value};

use adp_types::{ParameterDescriptor, ParameterType};

use super::error::ValidationError;
use crate::matcher::text::{compile_regex, parse_number};

/// Opaque process/wallet id: the 43-character url-safe base64 shape.
static OPAQUE_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"^[A-Za-z0-9_-]{43}$"));
/// Anything id-like: handles, names, ids. No whitespace.
static ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"^[A-Za-z0-9_\-.:@]{1,128}$"));

/// Whether `token` has the fixed-length opaque identifier shape.
pub(crate) fn is_opaque_id(token: &str) -> bool {
    OPAQUE_ID_REGEX.is_match(token)
}

/// Whether `token` could be an address (handle, name or id without whitespace).
pub(crate) fn is_address_like(token: &str) -> bool {
    ADDRESS_REGEX.is_match(token)
}

/// Coerce `value` to the declared type of `param`.
pub(crate) fn coerce(param: &ParameterDescriptor, value: &Value) -> Result<Value, ValidationError> {
    let name = || param.name.clone();
    match param.kind {
        ParameterType::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(raw) => parse_number(raw).map(number_value).ok_or_else(|| {
                ValidationError::NotANumber {
                    name: name(),
                    value: raw.clone(),
                }
            }),
            other => Err(ValidationError::NotANumber {
                name: name(),
                value: other.to_string(),
            }),
        },
        ParameterType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(raw) => {
                parse_bool(raw)
                    .map(Value::Bool)
                    .ok_or_else(|| ValidationError::NotABoolean {
                        name: name(),
                        value: raw.clone(),
                    })
            }
            other => Err(ValidationError::NotABoolean {
                name: name(),
                value: other.to_string(),
            }),
        },
        ParameterType::Address => match value {
            Value::String(raw) if is_address_like(raw.trim()) => {
                Ok(Value::String(raw.trim().to_string()))
            }
            other => Err(ValidationError::InvalidAddress {
                name: name(),
                value: value_as_text(other),
            }),
        },
        ParameterType::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(number) => Ok(Value::String(number.to_string())),
            Value::Bool(flag) => Ok(Value::String(flag.to_string())),
            _ => Err(ValidationError::NotAString { name: name() }),
        },
        ParameterType::Json => match value {
            Value::String(raw) => {
                serde_json::from_str::<Value>(raw).map_err(|error| ValidationError::InvalidJson {
                    name: name(),
                    reason: error.to_string(),
                })
            }
            other => Ok(other.clone()),
        },
    }
}

/// Boolean keywords accepted in free text and caller input.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" | "enable" | "enabled" => Some(true),
        "false" | "no" | "off" | "0" | "disable" | "disabled" => Some(false),
        _ => None,
    }
}

/// Integral values stay integers on the wire (`100`, not `100.0`).
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
pub(crate) fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Tag/text form of a value: strings verbatim, everything else as compact JSON.
pub(crate) fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn param(kind: ParameterType) -> ParameterDescriptor {
        ParameterDescriptor::new("P", kind, true)
    }

    #[test]
    fn numbers_coerce_from_text_and_stay_integral() {
        let p = param(ParameterType::Number);
        assert_eq!(coerce(&p, &json!("100")).unwrap(), json!(100));
        assert_eq!(coerce(&p, &json!("1,250.5")).unwrap(), json!(1250.5));
        assert!(matches!(
            coerce(&p, &json!("lots")),
            Err(ValidationError::NotANumber { .. })
        ));
    }

    #[test]
    fn booleans_accept_keywords() {
        let p = param(ParameterType::Boolean);
        assert_eq!(coerce(&p, &json!("Yes")).unwrap(), json!(true));
        assert_eq!(coerce(&p, &json!("off")).unwrap(), json!(false));
        assert!(coerce(&p, &json!("maybe")).is_err());
    }

    #[test]
    fn addresses_reject_whitespace_and_structures() {
        let p = param(ParameterType::Address);
        assert_eq!(coerce(&p, &json!(" alice ")).unwrap(), json!("alice"));
        assert!(coerce(&p, &json!("two words")).is_err());
        assert!(coerce(&p, &json!({"a": 1})).is_err());
    }

    #[test]
    fn json_parses_strings() {
        let p = param(ParameterType::Json);
        assert_eq!(coerce(&p, &json!("{\"a\":1}")).unwrap(), json!({"a": 1}));
        assert!(matches!(
            coerce(&p, &json!("{oops")),
            Err(ValidationError::InvalidJson { .. })
        ));
    }

    #[test]
    fn opaque_id_shape_is_fixed_length() {
        assert!(is_opaque_id("xU9zFkq3X2ZQ6olwNVvr1vUWIjc3kXTWr7xKQD6dh10"));
        assert!(!is_opaque_id("alice"));
    }
}
