use thiserror::Error;

/// One named parameter violation. Rendered into the `errors` list of a rejected request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Required parameter absent or empty.
    #[error("missing required parameter '{name}'")]
    MissingRequired {
        /// Parameter name.
        name: String,
    },
    /// Value cannot be coerced to a number.
    #[error("parameter '{name}' must be a number, got '{value}'")]
    NotANumber {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: String,
    },
    /// Value cannot be coerced to a boolean.
    #[error("parameter '{name}' must be a boolean, got '{value}'")]
    NotABoolean {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: String,
    },
    /// Value is not an address-shaped identifier.
    #[error("parameter '{name}' must be a valid address, got '{value}'")]
    InvalidAddress {
        /// Parameter name.
        name: String,
        /// Offending value.
        value: String,
    },
    /// Value is not valid JSON.
    #[error("parameter '{name}' must be valid JSON: {reason}")]
    InvalidJson {
        /// Parameter name.
        name: String,
        /// Parser message.
        reason: String,
    },
    /// Value is a structure where text was expected.
    #[error("parameter '{name}' must be a string")]
    NotAString {
        /// Parameter name.
        name: String,
    },
    /// Value does not match the declared regex.
    #[error("parameter '{name}' does not match pattern '{pattern}'")]
    PatternMismatch {
        /// Parameter name.
        name: String,
        /// Declared pattern.
        pattern: String,
    },
    /// The declared regex itself does not compile.
    #[error("parameter '{name}' declares an invalid pattern '{pattern}'")]
    InvalidPattern {
        /// Parameter name.
        name: String,
        /// Declared pattern.
        pattern: String,
    },
    /// Numeric value below the declared minimum.
    #[error("parameter '{name}' must be at least {min}, got {value}")]
    BelowMinimum {
        /// Parameter name.
        name: String,
        /// Declared minimum.
        min: f64,
        /// Offending value.
        value: f64,
    },
    /// Numeric value above the declared maximum.
    #[error("parameter '{name}' must be at most {max}, got {value}")]
    AboveMaximum {
        /// Parameter name.
        name: String,
        /// Declared maximum.
        max: f64,
        /// Offending value.
        value: f64,
    },
    /// String value outside the declared enum.
    #[error("parameter '{name}' must be one of [{}], got '{value}'", .allowed.join(", "))]
    NotInEnum {
        /// Parameter name.
        name: String,
        /// Allowed values.
        allowed: Vec<String>,
        /// Offending value.
        value: String,
    },
    /// A `pattern` tag other than `Action` has no parameter value to fill it.
    #[error("pattern tag '{tag}' has no value")]
    UnfilledPatternTag {
        /// Tag name.
        tag: String,
    },
}

impl ValidationError {
    /// Name of the offending parameter or tag.
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::MissingRequired { name }
            | Self::NotANumber { name, .. }
            | Self::NotABoolean { name, .. }
            | Self::InvalidAddress { name, .. }
            | Self::InvalidJson { name, .. }
            | Self::NotAString { name }
            | Self::PatternMismatch { name, .. }
            | Self::InvalidPattern { name, .. }
            | Self::BelowMinimum { name, .. }
            | Self::AboveMaximum { name, .. }
            | Self::NotInEnum { name, .. } => name,
            Self::UnfilledPatternTag { tag } => tag,
        }
    }
}
