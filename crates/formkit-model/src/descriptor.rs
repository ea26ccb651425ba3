//! Rule arguments and validation error descriptors.

use std::borrow::Cow;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::value::{Value, display_text, parse_number};

/// A rule argument.
///
/// Arguments parsed from the colon form (`between:3,10`) are always
/// [`RuleArg::Text`]; native values and patterns come from the tuple form.
#[derive(Debug, Clone)]
pub enum RuleArg {
    Text(String),
    Pattern(Regex),
    Value(Value),
}

impl RuleArg {
    /// Textual view of the argument, if it has one.
    ///
    /// Native strings, numbers and booleans have a text form; patterns,
    /// null, arrays and objects do not.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Text(s) => Some(Cow::Borrowed(s)),
            Self::Value(Value::String(s)) => Some(Cow::Borrowed(s)),
            Self::Value(v @ (Value::Number(_) | Value::Bool(_))) => {
                Some(Cow::Owned(display_text(v)))
            }
            _ => None,
        }
    }

    /// Numeric view of the argument.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Value(Value::Number(n)) => n.as_f64(),
            Self::Pattern(_) => None,
            _ => self.as_text().and_then(|text| parse_number(&text)),
        }
    }

    /// Value view of the argument, used for equality checks against field values.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Pattern(re) => Value::String(format!("/{}/", re.as_str())),
            Self::Value(v) => v.clone(),
        }
    }

    /// Interpret the argument as a boolean flag (`false`/`"false"`/`"no"` are false).
    pub fn is_falsy_flag(&self) -> bool {
        match self {
            Self::Value(Value::Bool(b)) => !b,
            Self::Value(Value::Null) => true,
            Self::Value(Value::Number(n)) => n.as_f64() == Some(0.0),
            Self::Text(s) | Self::Value(Value::String(s)) => {
                s.is_empty() || s == "false" || s == "no"
            }
            _ => false,
        }
    }
}

impl PartialEq for RuleArg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            (Self::Value(a), Self::Value(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for RuleArg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RuleArg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Regex> for RuleArg {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

impl From<Value> for RuleArg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl Serialize for RuleArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Why a rule reported a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// The predicate resolved `false`.
    Rejected,
    /// The predicate itself failed (custom async rule error).
    Faulted { message: String },
}

/// A failing rule, ready for message generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDescriptor {
    pub rule_name: String,
    pub field_value: Value,
    pub args: Vec<RuleArg>,
    pub field_label: String,
    pub failure: Failure,
}

impl ErrorDescriptor {
    /// Descriptor for a predicate that resolved `false`.
    pub fn rejected(
        rule_name: impl Into<String>,
        field_value: Value,
        args: Vec<RuleArg>,
        field_label: impl Into<String>,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            field_value,
            args,
            field_label: field_label.into(),
            failure: Failure::Rejected,
        }
    }

    /// Check if the predicate faulted rather than rejected.
    pub fn is_fault(&self) -> bool {
        matches!(self.failure, Failure::Faulted { .. })
    }
}
