//! Host store error types.

use vmsync_core::SyncError;

/// Errors that can occur during host store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested host was not found.
    #[error("Host not found: {hostname}")]
    NotFound {
        /// Name of the host that was not found.
        hostname: String,
    },

    /// The backing file could not be read or written.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path of the backing file.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// Stored data could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// The host record is invalid.
    #[error("Invalid host: {message}")]
    InvalidHost {
        /// Description of why the host is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(hostname: impl Into<String>) -> Self {
        Self::NotFound {
            hostname: hostname.into(),
        }
    }

    /// Creates a new `Io` error.
    #[must_use]
    pub fn io(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Io {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization {
            message: message.to_string(),
        }
    }

    /// Creates a new `InvalidHost` error.
    #[must_use]
    pub fn invalid_host(message: impl Into<String>) -> Self {
        Self::InvalidHost {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { hostname } => SyncError::object_absent(hostname),
            other => SyncError::store(other.to_string()),
        }
    }
}
