//! Error types for sensor payload parsing in nam-types.

use thiserror::Error;

/// Errors that can occur when parsing Nettigo Air Monitor sensor data.
///
/// This error type is transport-agnostic and does not include HTTP
/// errors (those belong in nam-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A required field is missing from the payload.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// A sensor value could not be parsed as a number.
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue {
        /// The raw sensor key.
        key: String,
        /// The textual value as delivered by the device.
        value: String,
    },

    /// The payload has an unexpected shape.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ParseError {
    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result type alias using nam-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
