//! File rules.

use formkit_model::{RuleArg, Value};

use crate::context::RuleContext;

/// Declared MIME type of each file, or `None` when the value is not a file
/// collection.
fn file_types(value: &Value) -> Option<Vec<&str>> {
    let Value::Array(files) = value else {
        return None;
    };
    files
        .iter()
        .map(|file| match file {
            Value::Object(entry) => Some(entry.get("type").and_then(Value::as_str).unwrap_or("")),
            _ => None,
        })
        .collect()
}

/// `mime(value, ...types)`: every file's declared type is in the list.
///
/// Values that are not file collections pass.
pub fn mime(ctx: &RuleContext, types: &[RuleArg]) -> bool {
    let Some(declared) = file_types(&ctx.value) else {
        return true;
    };
    let allowed: Vec<_> = types.iter().filter_map(RuleArg::as_text).collect();
    declared
        .iter()
        .all(|kind| allowed.iter().any(|allowed| allowed == kind))
}
