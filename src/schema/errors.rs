//! Schema error types
//!
//! Error codes:
//! - ST_SCHEMA_UNSUPPORTED (configuration)
//! - ST_SCHEMA_INVALID (configuration)
//! - ST_SCHEMA_MALFORMED (configuration)
//! - ST_SCHEMA_VALIDATION_FAILED (write rejected)

use std::fmt;

use thiserror::Error;

/// A single validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDetails {
    /// Field path (e.g., "address.city", "tags[2]")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl ValidationDetails {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn extra_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "extra field present")
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }
}

impl fmt::Display for ValidationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

/// Aggregated validation failure list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport(pub Vec<ValidationDetails>);

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, details: ValidationDetails) {
        self.0.push(details);
    }

    pub fn details(&self) -> &[ValidationDetails] {
        &self.0
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

/// Schema errors
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    /// Node kind has no storage shape
    #[error("Unsupported schema: '{kind}' node at '{path}' has no storage representation")]
    Unsupported { path: String, kind: String },

    /// Schema is structurally unusable for an entity
    #[error("Invalid schema: {0}")]
    Invalid(String),

    /// Schema file could not be read or parsed
    #[error("Malformed schema file '{path}': {reason}")]
    Malformed { path: String, reason: String },

    /// Document rejected by the schema
    #[error("Validation failed ({} error(s)): {report}", .report.0.len())]
    Validation { report: ValidationReport },
}

impl SchemaError {
    pub fn unsupported(path: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.into(),
            kind: kind.into(),
        }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(report: ValidationReport) -> Self {
        Self::Validation { report }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaError::Unsupported { .. } => "ST_SCHEMA_UNSUPPORTED",
            SchemaError::Invalid(_) => "ST_SCHEMA_INVALID",
            SchemaError::Malformed { .. } => "ST_SCHEMA_MALFORMED",
            SchemaError::Validation { .. } => "ST_SCHEMA_VALIDATION_FAILED",
        }
    }

    /// True for errors raised while configuring a model rather than writing.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, SchemaError::Validation { .. })
    }

    /// Validation details, if this is a validation failure
    pub fn details(&self) -> &[ValidationDetails] {
        match self {
            SchemaError::Validation { report } => report.details(),
            _ => &[],
        }
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;
