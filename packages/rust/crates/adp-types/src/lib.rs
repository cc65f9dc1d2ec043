//! adp-types - Capability manifest wire format for self-describing processes.
//!
//! A process that wants to be addressable by free-text instructions publishes a
//! [`CapabilityManifest`] as the payload of the reserved `Info` query. This crate
//! owns that wire format and its validator.
//!
//! # Graceful degradation
//! [`parse_manifest`] never fails loudly: malformed JSON, schema violations and
//! unsupported protocol versions all yield `None`, which callers treat as a
//! legacy process that simply does not describe itself.
//!
//! # Architecture
//!
//! ```text
//! adp-types/src/
//! ├── lib.rs      # Re-exports (this file)
//! ├── error.rs    # ManifestError
//! ├── manifest.rs # CapabilityManifest, HandlerDescriptor, ParameterDescriptor
//! ├── schema.rs   # JSON Schema export (schemars)
//! └── tag.rs      # Tag, OperationKind
//! ```

#![allow(clippy::doc_markdown)]

// ============================================================================
// Module Declarations
// ============================================================================

mod error;
mod manifest;
mod schema;
mod tag;

// ============================================================================
// Public Re-exports
// ============================================================================

pub use error::{ManifestError, ManifestResult};
pub use manifest::{
    ADP_PROTOCOL_VERSION, CapabilityManifest, HandlerCategory, HandlerDescriptor,
    ManifestCapabilities, ParameterDescriptor, ParameterType, ParameterValidation,
    default_handler_pattern, parse_manifest,
};
pub use schema::manifest_json_schema;
pub use tag::{ACTION_TAG, INFO_ACTION, OperationKind, Tag, info_query_tags};
