//! JSON Schema export.
//!
//! The Rust types are the single source of truth for the manifest shape; process
//! authors can validate their `Info` payload against this schema.

use crate::manifest::CapabilityManifest;

/// JSON Schema of [`CapabilityManifest`] as a JSON value.
#[must_use]
pub fn manifest_json_schema() -> serde_json::Value {
    let schema = schemars::schema_for!(CapabilityManifest);
    serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
}
