//! Error types for rule parsing.

use thiserror::Error;

/// Configuration errors raised while parsing a rule specification.
///
/// These are fatal: a spec that fails to parse must never be treated as
/// "no rules", since that would silently pass every value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuleError {
    /// Rule name not present in the rule library.
    #[error("Unknown validation rule '{token}'")]
    UnknownRule {
        /// The offending token as declared.
        token: String,
    },

    /// Rule entry that cannot be interpreted.
    #[error("Malformed validation rule: {message}")]
    MalformedRule {
        /// Description of the problem.
        message: String,
    },
}

/// Result type alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

impl RuleError {
    pub(crate) fn unknown(token: impl Into<String>) -> Self {
        Self::UnknownRule {
            token: token.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRule {
            message: message.into(),
        }
    }
}
