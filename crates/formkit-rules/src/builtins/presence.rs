//! Presence rules.

use formkit_model::{RuleArg, Value, is_empty};

use crate::context::RuleContext;

/// `required(value, flag = true)`.
///
/// Empty strings, arrays, objects and null fail. `0` and `false` are present.
/// A falsy flag (`false`, `"false"`, `"no"`) turns the rule off.
pub fn required(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    if args.first().is_some_and(RuleArg::is_falsy_flag) {
        return true;
    }
    !is_empty(&ctx.value)
}

/// `accepted(value)`: checkbox-style agreement.
pub fn accepted(ctx: &RuleContext, _args: &[RuleArg]) -> bool {
    match &ctx.value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(s.as_str(), "yes" | "on" | "1" | "true"),
        _ => false,
    }
}

/// Pseudo-rules (`bail`, `optional`) always pass; the runner interprets them.
pub fn always(_ctx: &RuleContext, _args: &[RuleArg]) -> bool {
    true
}
