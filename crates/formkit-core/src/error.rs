//! Error types for form construction and synchronization.

use thiserror::Error;

use formkit_rules::RuleError;

/// Errors raised by forms, fields and their registries.
///
/// Validation failures are never errors; they are recorded on the field.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FormError {
    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// Invalid validation rule spec.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// Two live fields claim the same name past a settle point.
    #[error("Field name '{name}' is already registered")]
    DuplicateRegistration {
        /// The contested field name.
        name: String,
    },

    /// Operation on a name with no registered field.
    #[error("No field registered as '{name}'")]
    NotRegistered {
        /// The missing field name.
        name: String,
    },

    /// An install function failed.
    #[error("Plugin '{plugin}' failed to install: {message}")]
    Install {
        /// Plugin name.
        plugin: String,
        /// Failure description.
        message: String,
    },

    // =========================================================================
    // CAPABILITY ERRORS
    // =========================================================================
    /// An upload was rejected by the uploader.
    #[error("Upload of '{file}' failed: {message}")]
    Upload {
        /// File name.
        file: String,
        /// Failure description.
        message: String,
    },

    /// The host's submit handler failed.
    #[error("Submit handler failed: {0}")]
    SubmitHandler(#[source] anyhow::Error),
}

/// Result type alias for form operations.
pub type Result<T> = std::result::Result<T, FormError>;

impl FormError {
    /// Create an upload error for a file.
    pub fn upload(file: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Upload {
            file: file.into(),
            message: message.to_string(),
        }
    }

    /// Check if this error is recoverable (user can fix and retry).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotRegistered { .. } | Self::Upload { .. } | Self::SubmitHandler(_)
        )
    }

    /// Get a user-friendly suggestion for fixing this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Rule(RuleError::UnknownRule { .. }) => {
                Some("Check the rule name, or add the rule to the rule library.")
            }
            Self::Rule(_) => Some("Rules are written as `name:arg,arg` joined with `|`."),
            Self::DuplicateRegistration { .. } => {
                Some("Give each field a unique name, or remove the old field first.")
            }
            Self::NotRegistered { .. } => Some("Register the field before addressing it."),
            Self::Upload { .. } => Some("Check the file and try the upload again."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_error_is_fatal() {
        let err = FormError::from(RuleError::UnknownRule {
            token: "nope".to_string(),
        });
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "Unknown validation rule 'nope'");
        assert!(err.suggestion().is_some());
    }

    #[test]
    fn test_upload_error_is_recoverable() {
        let err = FormError::upload("a.png", "timeout");
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "Upload of 'a.png' failed: timeout");
    }
}
