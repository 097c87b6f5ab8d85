use thiserror::Error;

/// Result type for Metis operations
pub type Result<T> = std::result::Result<T, MetisError>;

/// Main error type for the Metis library
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetisError {
    /// Invalid dimensions between layers, samples or truth
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// A factory did not recognise the requested name
    #[error("Unknown {kind} '{name}'")]
    UnknownName {
        kind: &'static str,
        name: String,
    },

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Training error
    #[error("Training error: {0}")]
    Training(String),
}

impl From<std::io::Error> for MetisError {
    fn from(err: std::io::Error) -> Self {
        MetisError::Io(err.to_string())
    }
}

impl From<bincode::Error> for MetisError {
    fn from(err: bincode::Error) -> Self {
        MetisError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for MetisError {
    fn from(err: serde_json::Error) -> Self {
        MetisError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl MetisError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        MetisError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        MetisError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_name<S: Into<String>>(kind: &'static str, name: S) -> Self {
        MetisError::UnknownName {
            kind,
            name: name.into(),
        }
    }
}
