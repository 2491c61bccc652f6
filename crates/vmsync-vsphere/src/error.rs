//! Source system error types.

use vmsync_core::SyncError;

/// Errors raised while talking to the source system.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The endpoint could not be reached or the request timed out.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Credentials were rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The endpoint answered with an unexpected status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The requested entity does not exist.
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// The response body could not be decoded.
    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    /// The operation is not available through this source.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// A snapshot file could not be read or written.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl SourceError {
    #[must_use]
    pub fn connection(message: impl ToString) -> Self {
        Self::Connection {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn authentication(message: impl ToString) -> Self {
        Self::Authentication {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    #[must_use]
    pub fn decode(message: impl ToString) -> Self {
        Self::Decode {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn io(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Io {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Transport and authentication failures.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Authentication { .. })
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound { what } => SyncError::object_absent(what),
            SourceError::Unsupported { .. } | SourceError::Io { .. } => {
                SyncError::configuration(err.to_string())
            }
            other => SyncError::connectivity(other.to_string()),
        }
    }
}
