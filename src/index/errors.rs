//! Index definition errors
//!
//! All of these are configuration errors: they surface when a model is
//! built, never during reads or writes.

use thiserror::Error;

/// Result type for index planning
pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("At least one index (the primary) must be declared")]
    NoIndexes,

    #[error("{count} indexes declared; the primary plus at most {max} secondary are supported")]
    TooManyIndexes { count: usize, max: usize },

    #[error("Index {0} declares no partition fields")]
    EmptyPartition(usize),

    #[error("Index {index} uses field '{field}' which the schema does not declare")]
    UnknownField { index: usize, field: String },

    #[error("Index {index} lists field '{field}' more than once")]
    DuplicateField { index: usize, field: String },

    #[error("Invalid entity name '{0}': must be non-empty and must not contain '#'")]
    InvalidEntityName(String),
}

impl IndexError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::NoIndexes => "ST_INDEX_NONE",
            IndexError::TooManyIndexes { .. } => "ST_INDEX_TOO_MANY",
            IndexError::EmptyPartition(_) => "ST_INDEX_EMPTY_PARTITION",
            IndexError::UnknownField { .. } => "ST_INDEX_UNKNOWN_FIELD",
            IndexError::DuplicateField { .. } => "ST_INDEX_DUPLICATE_FIELD",
            IndexError::InvalidEntityName(_) => "ST_INDEX_INVALID_ENTITY",
        }
    }
}
