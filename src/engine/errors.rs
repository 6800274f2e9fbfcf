//! Engine errors

use thiserror::Error;

use crate::index::IndexError;
use crate::schema::{SchemaError, ValidationDetails};
use crate::store::StoreError;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Missing or inconsistent model configuration. Raised when the engine is
    /// built, never deferred to the first call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A derived write record failed schema validation
    #[error(transparent)]
    Validation(SchemaError),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Cannot convert '{path}': {reason}")]
    Codec { path: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        EngineError::Configuration(reason.into())
    }

    pub fn codec(path: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::Codec {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "ST_ENGINE_CONFIGURATION",
            EngineError::Validation(e) => e.code(),
            EngineError::InvalidCursor(_) => "ST_ENGINE_INVALID_CURSOR",
            EngineError::Codec { .. } => "ST_ENGINE_CODEC",
            EngineError::Store(e) => e.code(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        match self {
            EngineError::Configuration(_) => true,
            EngineError::Store(e) => e.is_configuration(),
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    /// Per-field validation failures, if this is a validation error.
    pub fn details(&self) -> &[ValidationDetails] {
        match self {
            EngineError::Validation(e) => e.details(),
            _ => &[],
        }
    }
}

impl From<SchemaError> for EngineError {
    fn from(e: SchemaError) -> Self {
        if e.is_configuration() {
            EngineError::Configuration(e.to_string())
        } else {
            EngineError::Validation(e)
        }
    }
}

impl From<IndexError> for EngineError {
    fn from(e: IndexError) -> Self {
        EngineError::Configuration(e.to_string())
    }
}
