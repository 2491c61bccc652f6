//! Error taxonomy shared by every stage of the sync pipeline.

use std::fmt;

/// Errors raised while collecting, evaluating or writing back attributes.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Authentication or transport failure reaching the source or the remote store.
    #[error("Connectivity error: {message}")]
    Connectivity {
        /// Description of the failure.
        message: String,
    },

    /// A sub-collection of one object could not be read.
    #[error("Partial data for {object}: {section} unavailable: {message}")]
    PartialData {
        /// Object whose data is incomplete.
        object: String,
        /// Section that could not be read (guest, config, tags, ...).
        section: String,
        /// Description of the failure.
        message: String,
    },

    /// An object referenced by computed attributes has no remote counterpart.
    #[error("Object not found: {object}")]
    ObjectAbsent {
        /// Name of the missing object.
        object: String,
    },

    /// A rule predicate or transform failed for one object.
    #[error("Rule evaluation failed for {object}: {message}")]
    RuleEvaluation {
        /// Object being evaluated.
        object: String,
        /// Description of the failure.
        message: String,
    },

    /// A remote write call failed.
    #[error("Write failed for {object} ({key}): {message}")]
    WriteFailure {
        /// Object being written.
        object: String,
        /// Attribute key whose write failed.
        key: String,
        /// Description of the failure.
        message: String,
    },

    /// The host store rejected an operation.
    #[error("Store error: {message}")]
    Store {
        /// Description of the failure.
        message: String,
    },

    /// Invalid or missing configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },
}

impl SyncError {
    #[must_use]
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn partial_data(
        object: impl Into<String>,
        section: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PartialData {
            object: object.into(),
            section: section.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn object_absent(object: impl Into<String>) -> Self {
        Self::ObjectAbsent {
            object: object.into(),
        }
    }

    #[must_use]
    pub fn rule_evaluation(object: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::RuleEvaluation {
            object: object.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn write_failure(
        object: impl Into<String>,
        key: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::WriteFailure {
            object: object.into(),
            key: key.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an object-absent error.
    #[must_use]
    pub fn is_object_absent(&self) -> bool {
        matches!(self, Self::ObjectAbsent { .. })
    }

    /// Returns `true` if this is a connectivity error.
    #[must_use]
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Returns the error category for logging.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connectivity { .. } => ErrorCategory::Connectivity,
            Self::PartialData { .. } => ErrorCategory::PartialData,
            Self::ObjectAbsent { .. } => ErrorCategory::ObjectAbsent,
            Self::RuleEvaluation { .. } => ErrorCategory::RuleEvaluation,
            Self::WriteFailure { .. } => ErrorCategory::WriteFailure,
            Self::Store { .. } => ErrorCategory::Store,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Categories of sync errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Connectivity,
    PartialData,
    ObjectAbsent,
    RuleEvaluation,
    WriteFailure,
    Store,
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connectivity => write!(f, "connectivity"),
            Self::PartialData => write!(f, "partial_data"),
            Self::ObjectAbsent => write!(f, "object_absent"),
            Self::RuleEvaluation => write!(f, "rule_evaluation"),
            Self::WriteFailure => write!(f, "write_failure"),
            Self::Store => write!(f, "store"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
