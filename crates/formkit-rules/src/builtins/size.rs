//! Size rules: min, max, between, number.
//!
//! Numeric values compare by value, strings and arrays by length. A trailing
//! `force` argument (`"value"` or `"length"`) overrides the detection.

use formkit_model::{RuleArg, Value, js_number};

use crate::context::RuleContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Force {
    Auto,
    Value,
    Length,
}

fn force_arg(arg: Option<&RuleArg>) -> Force {
    match arg.and_then(RuleArg::as_text).as_deref() {
        Some("value") => Force::Value,
        Some("length") => Force::Length,
        _ => Force::Auto,
    }
}

/// Length of a value as an input reports it.
fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(items) => Some(items.len()),
        Value::Number(n) => Some(n.to_string().chars().count()),
        _ => None,
    }
}

/// Shared comparison for `min` and `max`.
fn bound_check(
    value: &Value,
    bound: f64,
    force: Force,
    cmp: fn(f64, f64) -> bool,
) -> bool {
    if let Value::Array(items) = value {
        return cmp(items.len() as f64, bound);
    }
    let numeric = js_number(value);
    if (numeric.is_some() && force != Force::Length) || force == Force::Value {
        return numeric.is_some_and(|n| cmp(n, bound));
    }
    if matches!(value, Value::String(_)) || force == Force::Length {
        return length_of(value).is_some_and(|len| cmp(len as f64, bound));
    }
    false
}

fn bound_arg(args: &[RuleArg], default: f64) -> Option<f64> {
    match args.first() {
        None => Some(default),
        Some(arg) => arg.as_number(),
    }
}

/// `min(value, minimum = 1, force?)`.
pub fn min(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    let Some(minimum) = bound_arg(args, 1.0) else {
        return false;
    };
    bound_check(&ctx.value, minimum, force_arg(args.get(1)), |a, b| a >= b)
}

/// `max(value, maximum = 10, force?)`.
pub fn max(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    let Some(maximum) = bound_arg(args, 10.0) else {
        return false;
    };
    bound_check(&ctx.value, maximum, force_arg(args.get(1)), |a, b| a <= b)
}

/// `between(value, from = 0, to = 10, force?)`: exclusive bounds.
pub fn between(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    let from = match args.first() {
        None => Some(0.0),
        Some(arg) => arg.as_number(),
    };
    let to = match args.get(1) {
        None => Some(10.0),
        Some(arg) => arg.as_number(),
    };
    let (Some(from), Some(to)) = (from, to) else {
        return false;
    };
    let force = force_arg(args.get(2));
    let numeric = js_number(&ctx.value);
    if (numeric.is_some() && force != Force::Length) || force == Force::Value {
        return numeric.is_some_and(|n| n > from && n < to);
    }
    if matches!(ctx.value, Value::String(_)) || force == Force::Length {
        return length_of(&ctx.value).is_some_and(|len| {
            let len = len as f64;
            len > from && len < to
        });
    }
    false
}

/// `number(value)`: non-empty and numeric.
pub fn number(ctx: &RuleContext, _args: &[RuleArg]) -> bool {
    match &ctx.value {
        Value::Null => false,
        Value::String(s) if s.trim().is_empty() => false,
        value => js_number(value).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(check: fn(&RuleContext, &[RuleArg]) -> bool, value: Value, args: &[&str]) -> bool {
        let args: Vec<RuleArg> = args.iter().map(|s| RuleArg::from(*s)).collect();
        check(&RuleContext::detached(value), &args)
    }

    #[test]
    fn test_min_numeric_and_length() {
        assert!(run(min, json!(5), &["3"]));
        assert!(!run(min, json!("2"), &["3"]));
        assert!(run(min, json!("abcd"), &["3"]));
        assert!(!run(min, json!("ab"), &["3"]));
        assert!(run(min, json!(["a", "b"]), &["2"]));
    }

    #[test]
    fn test_min_force_length() {
        // "10" is numeric, but forced to compare by length
        assert!(!run(min, json!("10"), &["3", "length"]));
        assert!(run(min, json!("10"), &["2", "length"]));
    }

    #[test]
    fn test_max_defaults_and_force_value() {
        assert!(run(max, json!("short"), &[]));
        assert!(!run(max, json!("a string that is long"), &[]));
        assert!(!run(max, json!("abc"), &["5", "value"]));
        assert!(run(max, json!("4"), &["5", "value"]));
    }

    #[test]
    fn test_between_exclusive() {
        assert!(run(between, json!(5), &["3", "10"]));
        assert!(!run(between, json!(3), &["3", "10"]));
        assert!(!run(between, json!(10), &["3", "10"]));
        assert!(run(between, json!("abcd"), &["3", "10"]));
        assert!(!run(between, json!("abc"), &["3", "10"]));
        assert!(!run(between, json!(5), &["x", "10"]));
    }

    #[test]
    fn test_number() {
        assert!(run(number, json!("12.5"), &[]));
        assert!(run(number, json!(0), &[]));
        assert!(!run(number, json!(""), &[]));
        assert!(!run(number, json!("12a"), &[]));
        assert!(!run(number, Value::Null, &[]));
    }
}
