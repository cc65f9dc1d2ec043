//! Error types for manifest decoding.
//!
//! Library crates use `thiserror` for explicit error enums. A `ManifestError`
//! never leaves the discovery layer: it is logged and collapsed into "no manifest".

use thiserror::Error;

/// Result alias for manifest decoding.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Reasons a raw payload is not an acceptable capability manifest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// Payload is not JSON or does not have the manifest shape.
    #[error("malformed manifest: {0}")]
    Malformed(String),

    /// `protocolVersion` is missing or not the supported literal.
    #[error("unsupported protocol version: {found}")]
    UnsupportedVersion {
        /// Version string found in the payload.
        found: String,
    },

    /// A handler has an empty `action`.
    #[error("handler #{index} has an empty action")]
    EmptyAction {
        /// Position of the offending handler.
        index: usize,
    },

    /// Two handlers share the same `action`.
    #[error("duplicate handler action: {0}")]
    DuplicateAction(String),

    /// A parameter has an empty `name`.
    #[error("handler {action} declares a parameter with an empty name")]
    EmptyParameterName {
        /// Owning handler.
        action: String,
    },

    /// Two parameters of one handler share the same `name`.
    #[error("handler {action} declares parameter {name} twice")]
    DuplicateParameter {
        /// Owning handler.
        action: String,
        /// Repeated parameter name.
        name: String,
    },

    /// `validation.min` is greater than `validation.max`.
    #[error("handler {action} parameter {name} has min greater than max")]
    InvalidRange {
        /// Owning handler.
        action: String,
        /// Offending parameter name.
        name: String,
    },
}
