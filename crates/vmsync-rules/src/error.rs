//! Rule loading and evaluation errors.

use vmsync_core::SyncError;

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A condition or transform references a pattern that does not compile.
    #[error("Invalid pattern in rule '{rule}': {pattern}: {message}")]
    InvalidPattern {
        rule: String,
        pattern: String,
        message: String,
    },

    /// The rules document could not be parsed.
    #[error("Failed to parse rules: {0}")]
    Parse(String),

    /// The rules file could not be read.
    #[error("Failed to read rules file {path}: {message}")]
    Io { path: String, message: String },
}

impl RuleError {
    #[must_use]
    pub fn invalid_pattern(
        rule: impl Into<String>,
        pattern: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPattern {
            rule: rule.into(),
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_invalid_pattern(&self) -> bool {
        matches!(self, Self::InvalidPattern { .. })
    }

    /// Converts into the pipeline error for `object`.
    pub fn for_object(self, object: &str) -> SyncError {
        match self {
            Self::InvalidPattern { .. } => SyncError::rule_evaluation(object, self),
            Self::Parse(_) | Self::Io { .. } => SyncError::configuration(self.to_string()),
        }
    }
}
