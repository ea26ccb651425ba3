//! Field value helpers.
//!
//! Field values are JSON values. The helpers here give them the loose
//! semantics form inputs need: what counts as "empty", when two values are
//! the same for change detection, and how a string like `"12"` becomes a
//! number for numeric rules.

pub use serde_json::Value;

/// Flat name → value mapping used for aggregate value objects.
pub type ValueMap = serde_json::Map<String, Value>;

/// Check whether a value counts as empty.
///
/// Empty strings, empty arrays, empty objects and null are empty. Numbers
/// (including `0`) and booleans (including `false`) are present.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Number(_) | Value::Bool(_) => false,
    }
}

/// Check whether a value is falsy (`null`, `""`, `0` or `false`).
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Shallow equality used for change detection.
///
/// Two objects are equal when they have the same keys and each key maps to
/// an equal value. Everything else compares by value.
pub fn shallow_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, value)| right.get(key).is_some_and(|other| other == value))
        }
        _ => a == b,
    }
}

/// Shallow equality over optional values (a missing key is `None`).
pub fn shallow_equal_opt(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => shallow_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Coerce a value to a number the way form inputs read numbers.
///
/// Returns `None` when the value is not numeric. Blank strings and null read
/// as `0`, booleans as `0`/`1`. Arrays and objects are never numeric.
pub fn js_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse a numeric string (surrounding whitespace allowed, blank is `0`).
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    // Rust accepts "inf"/"nan" spellings that inputs never produce.
    if trimmed
        .chars()
        .any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Render a value as the text an input would display.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
