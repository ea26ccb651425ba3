//! Input type classification.
//!
//! Every input `type` string maps to a coarse [`Classification`] plus the
//! renderer key the presentation layer uses to pick a widget. The table is
//! closed: unknown types classify as [`Classification::Unknown`].

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Coarse grouping of input types sharing rendering and behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Text,
    Box,
    Select,
    Textarea,
    Button,
    Group,
    File,
    Slider,
    #[default]
    Unknown,
}

impl Classification {
    /// Get all known classifications.
    pub const fn all() -> &'static [Self] {
        &[
            Self::Text,
            Self::Box,
            Self::Select,
            Self::Textarea,
            Self::Button,
            Self::Group,
            Self::File,
            Self::Slider,
        ]
    }

    /// Parse a classification name.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "text" => Self::Text,
            "box" => Self::Box,
            "select" => Self::Select,
            "textarea" => Self::Textarea,
            "button" => Self::Button,
            "group" => Self::Group,
            "file" => Self::File,
            "slider" => Self::Slider,
            _ => Self::Unknown,
        }
    }

    /// Lowercase name, as exposed in context snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Box => "box",
            Self::Select => "select",
            Self::Textarea => "textarea",
            Self::Button => "button",
            Self::Group => "group",
            Self::File => "file",
            Self::Slider => "slider",
            Self::Unknown => "unknown",
        }
    }

    /// Default renderer key for this classification.
    pub fn renderer(&self) -> &'static str {
        match self {
            Self::Text => "input-text",
            Self::Box => "input-box",
            Self::Select => "input-select",
            Self::Textarea => "input-textarea",
            Self::Button => "input-button",
            Self::Group => "input-group",
            Self::File => "input-file",
            Self::Slider => "input-slider",
            Self::Unknown => "input-unknown",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved binding of an input type: classification plus renderer key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeBinding {
    pub classification: Classification,
    pub renderer: Cow<'static, str>,
}

impl TypeBinding {
    /// Binding with the classification's default renderer.
    pub fn of(classification: Classification) -> Self {
        Self {
            classification,
            renderer: Cow::Borrowed(classification.renderer()),
        }
    }
}

/// Built-in type → classification table.
const TYPE_TABLE: &[(&str, Classification)] = &[
    // text
    ("color", Classification::Text),
    ("date", Classification::Text),
    ("datetime-local", Classification::Text),
    ("email", Classification::Text),
    ("hidden", Classification::Text),
    ("month", Classification::Text),
    ("number", Classification::Text),
    ("password", Classification::Text),
    ("search", Classification::Text),
    ("tel", Classification::Text),
    ("text", Classification::Text),
    ("time", Classification::Text),
    ("url", Classification::Text),
    ("week", Classification::Text),
    // box
    ("checkbox", Classification::Box),
    ("radio", Classification::Box),
    // other
    ("range", Classification::Slider),
    ("select", Classification::Select),
    ("textarea", Classification::Textarea),
    ("button", Classification::Button),
    ("submit", Classification::Button),
    ("file", Classification::File),
    ("image", Classification::File),
    ("group", Classification::Group),
];

/// Resolve an input type against the built-in table.
pub fn classify(input_type: &str) -> TypeBinding {
    let key = input_type.trim().to_lowercase();
    let classification = TYPE_TABLE
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, classification)| *classification)
        .unwrap_or(Classification::Unknown);
    TypeBinding::of(classification)
}

/// All built-in input type names.
pub fn known_types() -> impl Iterator<Item = &'static str> {
    TYPE_TABLE.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_types() {
        assert_eq!(classify("email").classification, Classification::Text);
        assert_eq!(classify("checkbox").classification, Classification::Box);
        assert_eq!(classify("range").classification, Classification::Slider);
        assert_eq!(classify("submit").classification, Classification::Button);
        assert_eq!(classify("image").classification, Classification::File);
        assert_eq!(classify("Select").classification, Classification::Select);
    }

    #[test]
    fn test_classify_unknown_type() {
        let binding = classify("signature-pad");
        assert_eq!(binding.classification, Classification::Unknown);
        assert_eq!(binding.renderer, "input-unknown");
    }

    #[test]
    fn test_parse_roundtrip() {
        for classification in Classification::all() {
            assert_eq!(Classification::parse(classification.as_str()), *classification);
        }
    }
}
