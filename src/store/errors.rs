//! Store errors

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Physical store errors. None of these are retried by the layers above.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Item is missing key attribute '{0}'")]
    MissingKey(String),

    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    #[error("Invalid continuation key: {0}")]
    InvalidContinuation(String),

    #[error("Unsupported endpoint: {0}")]
    UnsupportedEndpoint(String),

    #[error("Invalid connection: {0}")]
    Configuration(String),

    #[error("Store I/O error: {0}")]
    Io(String),

    #[error("Store serialization error: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::MissingKey(_) => "ST_STORE_MISSING_KEY",
            StoreError::UnknownIndex(_) => "ST_STORE_UNKNOWN_INDEX",
            StoreError::InvalidContinuation(_) => "ST_STORE_INVALID_CONTINUATION",
            StoreError::UnsupportedEndpoint(_) => "ST_STORE_UNSUPPORTED_ENDPOINT",
            StoreError::Configuration(_) => "ST_STORE_CONFIGURATION",
            StoreError::Io(_) => "ST_STORE_IO",
            StoreError::Serialization(_) => "ST_STORE_SERIALIZATION",
            StoreError::Unavailable(_) => "ST_STORE_UNAVAILABLE",
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StoreError::UnsupportedEndpoint(_) | StoreError::Configuration(_)
        )
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(StoreError::UnsupportedEndpoint("https://x".into()).is_configuration());
        assert!(!StoreError::Unavailable("down".into()).is_configuration());
    }

    #[test]
    fn test_io_conversion() {
        let err: StoreError = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(err.code(), "ST_STORE_IO");
    }
}
