//! Error types for the analytics engine

use thiserror::Error;

/// Main error type for the analytics engine
#[derive(Error, Debug)]
pub enum Error {
    /// Client supplied missing or malformed input
    #[error("{0}")]
    Parameter(#[from] ParameterError),

    /// Dimension or view is not served
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document store failure
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error was caused by the request rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Parameter(_) | Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Request parameter errors
///
/// Raised while parsing query parameters, before any store access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// Required parameter is missing
    #[error("Missing required parameter: {0}")]
    MissingField(String),

    /// Parameter is present but cannot be parsed
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat {
        /// Parameter name
        field: String,
        /// Description of the format error
        message: String,
    },

    /// Parameter parsed but names something this endpoint does not support
    #[error("Unsupported value for {field}: {value}")]
    Unsupported {
        /// Parameter name
        field: String,
        /// The rejected value
        value: String,
    },
}

impl ParameterError {
    /// Create an invalid format error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ParameterError::InvalidFormat {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an unsupported value error
    pub fn unsupported(field: impl Into<String>, value: impl Into<String>) -> Self {
        ParameterError::Unsupported {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Document store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Query evaluation failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Stored document has an unexpected shape
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Store is unreachable
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
