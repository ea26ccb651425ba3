//! Membership and pattern-list rules.

use regex::Regex;

use formkit_model::{RuleArg, Value, is_falsy, shallow_equal};

use crate::context::RuleContext;

/// Compare a stack member against the value: objects shallowly, everything
/// else strictly (no type coercion, `"1" != 1`).
fn member_matches(item: &RuleArg, value: &Value) -> bool {
    match item {
        RuleArg::Value(item @ Value::Object(_)) => shallow_equal(item, value),
        RuleArg::Value(item) => item == value,
        RuleArg::Text(text) => matches!(value, Value::String(s) if s == text),
        RuleArg::Pattern(_) => false,
    }
}

/// `in(value, ...stack)`.
pub fn is_in(ctx: &RuleContext, stack: &[RuleArg]) -> bool {
    stack.iter().any(|item| member_matches(item, &ctx.value))
}

/// `not(value, ...stack)`: negation of [`is_in`].
pub fn not_in(ctx: &RuleContext, stack: &[RuleArg]) -> bool {
    !is_in(ctx, stack)
}

/// Turn `/pattern/` text into a regex; anything else stays literal.
fn slash_pattern(text: &str) -> Option<Regex> {
    let inner = text.strip_prefix('/')?.strip_suffix('/')?;
    Regex::new(inner).ok()
}

/// `matches(value, ...stack)`: any regex matches, or any string equals.
pub fn matches(ctx: &RuleContext, stack: &[RuleArg]) -> bool {
    let text = match &ctx.value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => formkit_model::display_text(other),
    };
    stack.iter().any(|pattern| match pattern {
        RuleArg::Pattern(re) => re.is_match(&text),
        RuleArg::Text(literal) | RuleArg::Value(Value::String(literal)) => {
            match slash_pattern(literal) {
                Some(re) => re.is_match(&text),
                None => matches!(&ctx.value, Value::String(s) if s == literal),
            }
        }
        RuleArg::Value(other) => other == &ctx.value,
    })
}

fn affix_check(ctx: &RuleContext, stack: &[RuleArg], check: fn(&str, &str) -> bool) -> bool {
    if is_falsy(&ctx.value) {
        return true;
    }
    let Value::String(value) = &ctx.value else {
        return false;
    };
    stack.is_empty()
        || stack
            .iter()
            .filter_map(RuleArg::as_text)
            .any(|affix| check(value, &affix))
}

/// `startsWith(value, ...stack)`.
pub fn starts_with(ctx: &RuleContext, stack: &[RuleArg]) -> bool {
    affix_check(ctx, stack, |value, affix| value.starts_with(affix))
}

/// `endsWith(value, ...stack)`.
pub fn ends_with(ctx: &RuleContext, stack: &[RuleArg]) -> bool {
    affix_check(ctx, stack, |value, affix| value.ends_with(affix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: Value) -> RuleContext {
        RuleContext::detached(value)
    }

    fn texts(items: &[&str]) -> Vec<RuleArg> {
        items.iter().map(|s| RuleArg::from(*s)).collect()
    }

    #[test]
    fn test_in_strict_equality() {
        assert!(is_in(&ctx(json!("a")), &texts(&["a", "b"])));
        assert!(!is_in(&ctx(json!("")), &texts(&["a", "b"])));
        assert!(!is_in(&ctx(json!(1)), &texts(&["1"])));
        assert!(is_in(&ctx(json!(1)), &[RuleArg::Value(json!(1))]));
    }

    #[test]
    fn test_in_object_shallow() {
        let stack = [RuleArg::Value(json!({"id": 1, "name": "x"}))];
        assert!(is_in(&ctx(json!({"name": "x", "id": 1})), &stack));
        assert!(!is_in(&ctx(json!({"id": 1})), &stack));
    }

    #[test]
    fn test_not() {
        assert!(not_in(&ctx(json!("c")), &texts(&["a", "b"])));
        assert!(!not_in(&ctx(json!("a")), &texts(&["a", "b"])));
    }

    #[test]
    fn test_matches() {
        let re = RuleArg::Pattern(Regex::new(r"^\d{3}$").unwrap());
        assert!(matches(&ctx(json!("123")), std::slice::from_ref(&re)));
        assert!(!matches(&ctx(json!("12a")), &[re]));
        assert!(matches(&ctx(json!("abc")), &texts(&["xyz", "abc"])));
        assert!(matches(&ctx(json!("abc")), &texts(&["/^a/"])));
        assert!(!matches(&ctx(json!("abc")), &texts(&["/^b/"])));
    }

    #[test]
    fn test_starts_and_ends_with() {
        assert!(starts_with(&ctx(json!("")), &texts(&["x"])));
        assert!(starts_with(&ctx(json!("hello")), &texts(&["he", "x"])));
        assert!(!starts_with(&ctx(json!("hello")), &texts(&["x"])));
        assert!(ends_with(&ctx(json!("hello")), &texts(&["lo"])));
        assert!(!ends_with(&ctx(json!(12)), &texts(&["2"])));
        assert!(ends_with(&ctx(json!("hello")), &[]));
    }
}
