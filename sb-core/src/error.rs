//! Global error types for the simbook phonebook layer.
//!
//! All error categories across the workspace are unified into a single
//! `SbError` enum. Hard failures (permission, dispatch-context misuse) are
//! returned to the caller; card-side failures are carried through completion
//! tokens and degraded to default results at the manager boundary.

use thiserror::Error;

/// Convenience type alias for Results using SbError.
pub type SbResult<T> = Result<T, SbError>;

/// Unified error type covering all error categories in simbook.
#[derive(Error, Debug)]
pub enum SbError {
    // -- Hard caller failures --
    /// The environment's capability check rejected the operation.
    #[error("permission denied: {0}")]
    Permission(String),

    /// A blocking operation was invoked from the completion-dispatch
    /// context, which would deadlock the bridge.
    #[error("called from the completion-dispatch context: {0}")]
    DispatchContext(String),

    /// A request was malformed (wrong auth code shape, bad index).
    #[error("invalid argument: {0}")]
    Argument(String),

    // -- Card-side failures --
    /// The card store reported a failure for an issued request.
    #[error("card store error: {0}")]
    Store(String),

    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for SbError {
    fn from(e: serde_json::Error) -> Self {
        SbError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SbError {
    fn from(e: toml::de::Error) -> Self {
        SbError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sb_error_display() {
        let err = SbError::Permission("write denied".to_string());
        assert_eq!(err.to_string(), "permission denied: write denied");
    }

    #[test]
    fn test_store_error_display() {
        let err = SbError::Store("record not found".to_string());
        assert_eq!(err.to_string(), "card store error: record not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SbError = io.into();
        assert!(matches!(err, SbError::Io(_)));
    }
}
