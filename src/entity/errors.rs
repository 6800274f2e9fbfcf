//! Entity errors
//!
//! Configuration and validation errors are fatal. `NotFound`,
//! `AlreadyExists` and `MissingId` are ordinary outcomes callers are
//! expected to handle.

use thiserror::Error;

use crate::engine::EngineError;
use crate::schema::{SchemaError, ValidationDetails};

/// Result type for entity operations
pub type EntityResult<T> = Result<T, EntityError>;

#[derive(Debug, Clone, Error)]
pub enum EntityError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Validation(SchemaError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record with id '{0}' already exists")]
    AlreadyExists(String),

    #[error("No id is defined for this item")]
    MissingId,

    #[error("Entity has been deleted")]
    Deleted,

    #[error("Cannot map record: {0}")]
    Decode(String),

    #[error(transparent)]
    Engine(EngineError),
}

impl EntityError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            EntityError::Configuration(_) => "ST_ENTITY_CONFIGURATION",
            EntityError::Validation(e) => e.code(),
            EntityError::NotFound(_) => "ST_ENTITY_NOT_FOUND",
            EntityError::AlreadyExists(_) => "ST_ENTITY_ALREADY_EXISTS",
            EntityError::MissingId => "ST_ENTITY_MISSING_ID",
            EntityError::Deleted => "ST_ENTITY_DELETED",
            EntityError::Decode(_) => "ST_ENTITY_DECODE",
            EntityError::Engine(e) => e.code(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        match self {
            EntityError::Configuration(_) => true,
            EntityError::Engine(e) => e.is_configuration(),
            _ => false,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, EntityError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EntityError::NotFound(_))
    }

    pub fn details(&self) -> &[ValidationDetails] {
        match self {
            EntityError::Validation(e) => e.details(),
            _ => &[],
        }
    }
}

impl From<EngineError> for EntityError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Configuration(reason) => EntityError::Configuration(reason),
            EngineError::Validation(e) => EntityError::Validation(e),
            other => EntityError::Engine(other),
        }
    }
}

impl From<SchemaError> for EntityError {
    fn from(e: SchemaError) -> Self {
        EngineError::from(e).into()
    }
}

impl From<serde_json::Error> for EntityError {
    fn from(e: serde_json::Error) -> Self {
        EntityError::Decode(e.to_string())
    }
}
