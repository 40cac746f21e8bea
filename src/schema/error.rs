//! Mapping errors
//!
//! Raised while walking a wire or configuration tree. Flatten reports them
//! and treats the field as unset; Expand propagates them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapError {
    /// The value at `field` does not have the shape its declaration requires
    #[error("field {field}: expected {expected}, found {found}")]
    UnexpectedShape {
        field: String,
        expected: &'static str,
        found: String,
    },

    /// No version rule covers the reported API version
    #[error("field {field}: API version {version} is not supported")]
    UnsupportedVersion { field: String, version: String },

    /// The value has the right shape but cannot be converted
    #[error("field {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// A resource identifier of the wrong JSON type
    #[error("identifier has unexpected type {found}")]
    IdType { found: String },
}

impl MapError {
    pub fn shape(field: &str, expected: &'static str, found: &serde_json::Value) -> Self {
        Self::UnexpectedShape {
            field: field.to_string(),
            expected,
            found: json_kind(found).to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Short type name of a wire value
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
