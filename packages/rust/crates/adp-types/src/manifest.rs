//! Capability manifest: the self-description a process publishes.
//!
//! Decoding is strict about shape but forgiving about evolution: unknown fields
//! are ignored, an unknown `category` becomes [`HandlerCategory::Custom`], and an
//! absent `pattern` becomes `["Action"]`.

use std::collections::HashSet;

use chrono::{DateTime, FixedOffset};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ManifestError, ManifestResult};
use crate::tag::{ACTION_TAG, OperationKind};

/// The only protocol version this client understands.
pub const ADP_PROTOCOL_VERSION: &str = "1.0";

/// Tag pattern used when a handler does not declare one.
#[must_use]
pub fn default_handler_pattern() -> Vec<String> {
    vec![ACTION_TAG.to_string()]
}

/// Decode a raw self-description payload.
///
/// Returns `None` for anything that is not a supported manifest; this is the
/// documented "legacy, non-describing process" outcome, not an error.
#[must_use]
pub fn parse_manifest(raw: &str) -> Option<CapabilityManifest> {
    CapabilityManifest::from_json(raw).ok()
}

/// Feature flags advertised by a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManifestCapabilities {
    /// Handlers carry usage examples.
    #[serde(default)]
    pub supports_examples: bool,
    /// The process keeps a handler registry that matches this manifest.
    #[serde(default)]
    pub supports_handler_registry: bool,
    /// The process validates parameters against the declared contracts.
    #[serde(default)]
    pub supports_parameter_validation: bool,
}

/// Published description of a process's callable handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityManifest {
    /// Always [`ADP_PROTOCOL_VERSION`] once decoded.
    pub protocol_version: String,
    /// Timestamp string as published (ISO-8601 expected, not enforced).
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "String")]
    pub last_updated: String,
    /// Advertised feature flags.
    #[serde(default, deserialize_with = "null_as_default")]
    #[schemars(with = "ManifestCapabilities")]
    pub capabilities: ManifestCapabilities,
    /// Handlers in declaration order; order breaks matcher ties.
    pub handlers: Vec<HandlerDescriptor>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display ticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Display description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Owner identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Logo reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl CapabilityManifest {
    /// Decode and validate a manifest from a JSON string.
    ///
    /// A JSON string whose content is itself a JSON document (a double-encoded
    /// `Data` field) is unwrapped once.
    ///
    /// # Errors
    /// Returns [`ManifestError`] when the payload is malformed, carries an
    /// unsupported `protocolVersion`, or violates a manifest invariant.
    pub fn from_json(raw: &str) -> ManifestResult<Self> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|error| ManifestError::Malformed(error.to_string()))?;
        match value {
            Value::String(inner) => {
                let inner_value: Value = serde_json::from_str(inner.trim())
                    .map_err(|error| ManifestError::Malformed(error.to_string()))?;
                Self::from_value(inner_value)
            }
            other => Self::from_value(other),
        }
    }

    /// Decode and validate a manifest from an already-parsed JSON value.
    ///
    /// # Errors
    /// Same conditions as [`CapabilityManifest::from_json`].
    pub fn from_value(value: Value) -> ManifestResult<Self> {
        let Some(object) = value.as_object() else {
            return Err(ManifestError::Malformed(
                "manifest must be a JSON object".to_string(),
            ));
        };
        let version = object
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if version != ADP_PROTOCOL_VERSION {
            return Err(ManifestError::UnsupportedVersion {
                found: version.to_string(),
            });
        }
        let manifest: Self = serde_json::from_value(value)
            .map_err(|error| ManifestError::Malformed(error.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Check cross-field invariants serde cannot express.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> ManifestResult<()> {
        let mut seen_actions = HashSet::with_capacity(self.handlers.len());
        for (index, handler) in self.handlers.iter().enumerate() {
            if handler.action.trim().is_empty() {
                return Err(ManifestError::EmptyAction { index });
            }
            if !seen_actions.insert(handler.action.as_str()) {
                return Err(ManifestError::DuplicateAction(handler.action.clone()));
            }
            let mut seen_params = HashSet::with_capacity(handler.parameters.len());
            for parameter in &handler.parameters {
                if parameter.name.trim().is_empty() {
                    return Err(ManifestError::EmptyParameterName {
                        action: handler.action.clone(),
                    });
                }
                if !seen_params.insert(parameter.name.as_str()) {
                    return Err(ManifestError::DuplicateParameter {
                        action: handler.action.clone(),
                        name: parameter.name.clone(),
                    });
                }
                if let Some(validation) = &parameter.validation
                    && let (Some(min), Some(max)) = (validation.min, validation.max)
                    && min > max
                {
                    return Err(ManifestError::InvalidRange {
                        action: handler.action.clone(),
                        name: parameter.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Serialize back to the wire format.
    ///
    /// # Errors
    /// Returns an error only if serialization itself fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Look up a handler by exact (case-sensitive) action.
    #[must_use]
    pub fn handler(&self, action: &str) -> Option<&HandlerDescriptor> {
        self.handlers.iter().find(|handler| handler.action == action)
    }

    /// Declared actions in manifest order.
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.handlers
            .iter()
            .map(|handler| handler.action.clone())
            .collect()
    }

    /// `lastUpdated` parsed as RFC 3339, when it is one.
    #[must_use]
    pub fn last_updated_at(&self) -> Option<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(self.last_updated.trim()).ok()
    }
}

/// Coarse grouping of handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum HandlerCategory {
    /// Protocol-level operations (balance, transfer, info).
    Core,
    /// Helper operations.
    Utility,
    /// Process-specific operations; also the fallback for unknown input.
    #[default]
    Custom,
}

impl HandlerCategory {
    /// Map a wire string, coercing anything unknown to `Custom`.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "core" => Self::Core,
            "utility" => Self::Utility,
            _ => Self::Custom,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Utility => "utility",
            Self::Custom => "custom",
        }
    }
}

impl<'de> Deserialize<'de> for HandlerCategory {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(Value::as_str)
            .map_or(Self::Custom, Self::from_wire))
    }
}

/// One callable operation of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HandlerDescriptor {
    /// Unique, case-sensitive action identifier.
    pub action: String,
    /// Ordered tag names the wire message must carry.
    #[serde(
        default = "default_handler_pattern",
        deserialize_with = "deserialize_pattern"
    )]
    #[schemars(with = "Vec<String>")]
    pub pattern: Vec<String>,
    /// Handler category.
    #[serde(default)]
    pub category: HandlerCategory,
    /// Human-readable description.
    #[serde(
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    #[schemars(with = "String")]
    pub description: String,
    /// Example instructions.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    #[schemars(with = "Vec<String>")]
    pub examples: Vec<String>,
    /// Declared parameters in order.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    #[schemars(with = "Vec<ParameterDescriptor>")]
    pub parameters: Vec<ParameterDescriptor>,
    /// Explicit read/write declaration; overrides the verb heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
}

impl HandlerDescriptor {
    /// Build a handler with defaults (`pattern = ["Action"]`, category custom).
    #[must_use]
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            pattern: default_handler_pattern(),
            category: HandlerCategory::Custom,
            description: String::new(),
            examples: Vec::new(),
            parameters: Vec::new(),
            operation: None,
        }
    }

    /// Look up a parameter by exact name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|param| param.name == name)
    }

    /// Look up a parameter ignoring ASCII case.
    #[must_use]
    pub fn parameter_ignore_case(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|param| param.name.eq_ignore_ascii_case(name))
    }

    /// Declared parameters of one type, in order.
    pub fn parameters_of_type(
        &self,
        kind: ParameterType,
    ) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters
            .iter()
            .filter(move |param| param.kind == kind)
    }
}

/// Value type of a parameter; drives both extraction grammar and coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Free text.
    String,
    /// Integer or decimal.
    Number,
    /// `true` / `false`.
    Boolean,
    /// Opaque process or wallet identifier.
    Address,
    /// Arbitrary JSON document.
    Json,
}

impl ParameterType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Address => "address",
            Self::Json => "json",
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    /// Parameter (and tag) name.
    pub name: String,
    /// Whether the parameter must be present.
    #[serde(default)]
    pub required: bool,
    /// Declared value type.
    #[serde(rename = "type")]
    pub kind: ParameterType,
    /// Human-readable description.
    #[serde(
        default,
        skip_serializing_if = "String::is_empty",
        deserialize_with = "null_as_default"
    )]
    #[schemars(with = "String")]
    pub description: String,
    /// Example values.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_default"
    )]
    #[schemars(with = "Vec<String>")]
    pub examples: Vec<String>,
    /// Constraints, meaningful only for the declared type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ParameterValidation>,
}

impl ParameterDescriptor {
    /// Build a parameter without description or constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ParameterType, required: bool) -> Self {
        Self {
            name: name.into(),
            required,
            kind,
            description: String::new(),
            examples: Vec::new(),
            validation: None,
        }
    }
}

/// Declared constraints on a parameter value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParameterValidation {
    /// Regex the (string form of the) value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Inclusive numeric lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Inclusive numeric upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Allowed string values.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_pattern<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let pattern = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    if pattern.is_empty() {
        Ok(default_handler_pattern())
    } else {
        Ok(pattern)
    }
}
