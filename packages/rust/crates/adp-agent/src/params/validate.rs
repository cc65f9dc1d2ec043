//! All-or-nothing parameter validation.

use regex::Regex;
use serde_json::{Map, Value};

use adp_types::{HandlerDescriptor, ParameterDescriptor, ParameterType};

use super::coerce::{coerce, value_as_text};
use super::error::ValidationError;

/// Outcome of validating one request against a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// `errors.is_empty()`.
    pub valid: bool,
    /// Every violation found, in declared parameter order.
    pub errors: Vec<ValidationError>,
    /// Coerced values of the declared parameters that were supplied.
    pub parameters: Map<String, Value>,
}

impl ValidationReport {
    /// Rendered error strings.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Names of required parameters that were absent.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter_map(|error| match error {
                ValidationError::MissingRequired { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Check `values` against every declared parameter of `handler`.
///
/// Never stops at the first violation. Keys that match no declared parameter
/// are ignored; lookups fall back to a case-insensitive name match.
#[must_use]
pub fn validate_parameters(handler: &HandlerDescriptor, values: &Map<String, Value>) -> ValidationReport {
    let mut errors = Vec::new();
    let mut parameters = Map::new();

    for param in &handler.parameters {
        let supplied = lookup(values, &param.name).filter(|value| is_present(value));
        let Some(raw) = supplied else {
            if param.required {
                errors.push(ValidationError::MissingRequired {
                    name: param.name.clone(),
                });
            }
            continue;
        };
        let value = match coerce(param, raw) {
            Ok(value) => value,
            Err(error) => {
                errors.push(error);
                continue;
            }
        };
        let before = errors.len();
        check_constraints(param, &value, &mut errors);
        if errors.len() == before {
            parameters.insert(param.name.clone(), value);
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        parameters,
    }
}

fn lookup<'a>(values: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    values.get(name).or_else(|| {
        values
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(text) => !text.trim().is_empty(),
        _ => true,
    }
}

fn check_constraints(param: &ParameterDescriptor, value: &Value, errors: &mut Vec<ValidationError>) {
    let Some(rules) = &param.validation else {
        return;
    };
    match param.kind {
        ParameterType::String | ParameterType::Address => {
            let text = value_as_text(value);
            if let Some(pattern) = &rules.pattern {
                match Regex::new(pattern) {
                    Ok(regex) if !regex.is_match(&text) => {
                        errors.push(ValidationError::PatternMismatch {
                            name: param.name.clone(),
                            pattern: pattern.clone(),
                        });
                    }
                    Ok(_) => {}
                    Err(_) => errors.push(ValidationError::InvalidPattern {
                        name: param.name.clone(),
                        pattern: pattern.clone(),
                    }),
                }
            }
            if param.kind == ParameterType::String
                && let Some(allowed) = &rules.allowed
                && !allowed.contains(&text)
            {
                errors.push(ValidationError::NotInEnum {
                    name: param.name.clone(),
                    allowed: allowed.clone(),
                    value: text,
                });
            }
        }
        ParameterType::Number => {
            let Some(number) = value.as_f64() else {
                return;
            };
            if let Some(min) = rules.min
                && number < min
            {
                errors.push(ValidationError::BelowMinimum {
                    name: param.name.clone(),
                    min,
                    value: number,
                });
            }
            if let Some(max) = rules.max
                && number > max
            {
                errors.push(ValidationError::AboveMaximum {
                    name: param.name.clone(),
                    max,
                    value: number,
                });
            }
        }
        ParameterType::Boolean | ParameterType::Json => {}
    }
}
