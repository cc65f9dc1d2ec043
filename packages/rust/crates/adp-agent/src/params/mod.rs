//! Parameter extraction and validation.

mod coerce;
mod error;
mod extract;
mod validate;

pub use error::ValidationError;
pub use extract::extract_parameters;
pub use validate::{ValidationReport, validate_parameters};

pub(crate) use coerce::value_as_text;
