//! Declarative field descriptions.
//!
//! A [`FieldDeclaration`] is what a schema author writes: type, name, rules,
//! options. It deserializes from JSON or TOML schemas and can be built in code.

use serde::{Deserialize, Deserializer};

use formkit_model::{ErrorVisibility, OptionsSpec, Value, ValueMap};
use formkit_rules::RuleSpec;

/// How a field is named within its aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NameSpec {
    /// Generate a name from the type and a generated id.
    #[default]
    Auto,
    /// Keep the field out of the aggregate value object.
    Excluded,
    Named(String),
}

impl<'de> Deserialize<'de> for NameSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Self::Auto,
            Raw::Flag(false) => Self::Excluded,
            Raw::Name(name) if name.is_empty() => Self::Auto,
            Raw::Name(name) => Self::Named(name),
        })
    }
}

impl From<&str> for NameSpec {
    fn from(value: &str) -> Self {
        Self::Named(value.to_string())
    }
}

/// Keep an explicit `null` distinct from an absent key.
fn explicit<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

fn default_type() -> String {
    "text".to_string()
}

/// A field as declared.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldDeclaration {
    #[serde(rename = "type")]
    pub input_type: String,
    pub name: NameSpec,
    pub id: Option<String>,
    pub label: Option<String>,
    /// Explicit initial value. `Some(Null)` is an explicit null.
    #[serde(deserialize_with = "explicit")]
    pub value: Option<Value>,
    pub validation: RuleSpec,
    /// Label used in validation messages.
    #[serde(alias = "validationName")]
    pub validation_name: Option<String>,
    #[serde(alias = "errorBehavior")]
    pub error_behavior: Option<ErrorVisibility>,
    /// Errors injected by the host, always visible.
    pub errors: Vec<String>,
    pub options: Option<OptionsSpec>,
    pub attributes: ValueMap,
    /// Keep this field's value in the aggregate after it is removed.
    #[serde(alias = "keepModelData")]
    pub keep_model_data: bool,
    /// Item schema of a `group` field.
    pub children: Vec<FieldDeclaration>,
    /// Minimum number of items of a `group` field.
    pub minimum: Option<usize>,
}

impl Default for FieldDeclaration {
    fn default() -> Self {
        Self {
            input_type: default_type(),
            name: NameSpec::Auto,
            id: None,
            label: None,
            value: None,
            validation: RuleSpec::none(),
            validation_name: None,
            error_behavior: None,
            errors: Vec::new(),
            options: None,
            attributes: ValueMap::new(),
            keep_model_data: false,
            children: Vec::new(),
            minimum: None,
        }
    }
}

impl FieldDeclaration {
    /// Declaration of the given input type.
    pub fn new(input_type: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = NameSpec::Named(name.into());
        self
    }

    /// Keep the field out of the aggregate.
    #[must_use]
    pub fn excluded(mut self) -> Self {
        self.name = NameSpec::Excluded;
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: impl Into<RuleSpec>) -> Self {
        self.validation = validation.into();
        self
    }

    #[must_use]
    pub fn with_validation_name(mut self, name: impl Into<String>) -> Self {
        self.validation_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_error_behavior(mut self, behavior: ErrorVisibility) -> Self {
        self.error_behavior = Some(behavior);
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: OptionsSpec) -> Self {
        self.options = Some(options);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn keep_model_data(mut self) -> Self {
        self.keep_model_data = true;
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<FieldDeclaration>) -> Self {
        self.children = children;
        self
    }

    #[must_use]
    pub fn with_minimum(mut self, minimum: usize) -> Self {
        self.minimum = Some(minimum);
        self
    }
}
