use thiserror::Error;

/// Top-level error type for the Attune system.
///
/// Variants are grouped by how the caller is expected to react: validation
/// and permanent errors surface immediately, transient errors are eligible
/// for retry, and storage errors are recoverable at the store boundary
/// (the in-memory view keeps working for the session).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttuneError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transient service error: {message}")]
    Transient { message: String, status: Option<u16> },

    #[error("Permanent service error (HTTP {status}): {message}")]
    Permanent { message: String, status: u16 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AttuneError {
    /// Whether the retry policy may resubmit the failed request.
    ///
    /// Only transient failures (network errors and 5xx responses) qualify.
    /// Validation and 4xx-class errors indicate a non-transient client
    /// mistake and are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttuneError::Transient { .. })
    }

    /// Build a transient error from a network-level failure (no HTTP status).
    pub fn network(message: impl Into<String>) -> Self {
        AttuneError::Transient {
            message: message.into(),
            status: None,
        }
    }
}

impl From<serde_json::Error> for AttuneError {
    fn from(err: serde_json::Error) -> Self {
        AttuneError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for AttuneError {
    fn from(err: toml::de::Error) -> Self {
        AttuneError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AttuneError {
    fn from(err: toml::ser::Error) -> Self {
        AttuneError::Config(err.to_string())
    }
}

/// A specialized `Result` type for Attune operations.
pub type Result<T> = std::result::Result<T, AttuneError>;
