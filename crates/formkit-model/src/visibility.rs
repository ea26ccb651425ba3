//! Error visibility policy.

use serde::{Deserialize, Serialize};

/// When rule-engine errors become visible to the rendering layer.
///
/// Explicit (injected) errors are always visible regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorVisibility {
    /// Show validation errors as soon as they exist.
    Live,
    /// Show validation errors after the field loses focus (or on submit).
    #[default]
    Blur,
}

impl ErrorVisibility {
    /// Parse a policy name, falling back to the default.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "live" => Self::Live,
            _ => Self::Blur,
        }
    }
}
