//! Filter compilation errors
//!
//! All errors are raised synchronously while compiling. The query executor is
//! expected to translate client errors into 4xx responses using `code()`.

use thiserror::Error;

/// Error raised while parsing or compiling a filter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// Condition field (or extended key target) is absent from the schema
    #[error("Attribute not found: {field}")]
    AttributeNotFound { field: String },

    /// Lookup target schema is not registered in the schema store
    #[error("Schema not found: {name}")]
    SchemaNotFound { name: String },

    /// Operator received a value it cannot work with
    #[error("Invalid value for operator '{operator}': {reason}")]
    InvalidOperatorValue { operator: String, reason: String },

    /// Operator cannot be applied to the attribute type
    #[error("Operator '{operator}' cannot be applied to {attribute_type} attribute '{field}'")]
    InvalidAttributeType {
        operator: String,
        field: String,
        attribute_type: &'static str,
    },

    /// Timezone is not a known IANA name
    #[error("Invalid timezone: {timezone}")]
    InvalidTimezone { timezone: String },

    /// Schema metadata is inconsistent
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Filter document is malformed or exceeds limits
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

impl FilterError {
    pub fn attribute_not_found(field: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            field: field.into(),
        }
    }

    pub fn invalid_value(operator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOperatorValue {
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_type(
        operator: impl Into<String>,
        field: impl Into<String>,
        attribute_type: &'static str,
    ) -> Self {
        Self::InvalidAttributeType {
            operator: operator.into(),
            field: field.into(),
            attribute_type,
        }
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::AttributeNotFound { .. } => "ATTRIBUTE_NOT_FOUND",
            Self::SchemaNotFound { .. } => "SCHEMA_NOT_FOUND",
            Self::InvalidOperatorValue { .. } => "INVALID_OPERATOR_VALUE",
            Self::InvalidAttributeType { .. } => "INVALID_ATTRIBUTE_TYPE",
            Self::InvalidTimezone { .. } => "INVALID_TIMEZONE",
            Self::InvalidSchema(_) => "INVALID_SCHEMA",
            Self::InvalidFilter(_) => "INVALID_FILTER",
        }
    }

    /// Whether the error was caused by the request rather than by server-side metadata
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::SchemaNotFound { .. } | Self::InvalidSchema(_))
    }
}
