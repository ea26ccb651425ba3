//! Rules that read sibling fields.

use formkit_model::RuleArg;

use crate::context::RuleContext;

const CONFIRM_SUFFIX: &str = "_confirm";

/// Name of the field a `confirm` rule compares against.
fn partner_name(name: &str, args: &[RuleArg]) -> Option<String> {
    if let Some(field) = args.first().and_then(RuleArg::as_text)
        && !field.is_empty()
    {
        return Some(field.into_owned());
    }
    if name.is_empty() {
        return None;
    }
    match name.strip_suffix(CONFIRM_SUFFIX) {
        Some(base) => Some(base.to_string()),
        None => Some(format!("{name}{CONFIRM_SUFFIX}")),
    }
}

/// `confirm(value, field?)`: value equals the partner field's value.
///
/// The partner defaults to `<name>_confirm`, or to `<name>` with the
/// `_confirm` suffix removed. The read registers a dependency, so this field
/// is re-validated whenever the partner changes.
pub fn confirm(ctx: &RuleContext, args: &[RuleArg]) -> bool {
    let Some(partner) = partner_name(&ctx.name, args) else {
        return false;
    };
    ctx.read_field(&partner).as_ref() == Some(&ctx.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use formkit_model::{Value, ValueMap};
    use serde_json::json;

    use crate::context::DependencyReader;

    struct MapReader {
        values: ValueMap,
        reads: RefCell<Vec<String>>,
    }

    impl DependencyReader for MapReader {
        fn read(&self, target: &str) -> Option<Value> {
            self.reads.borrow_mut().push(target.to_string());
            self.values.get(target).cloned()
        }

        fn values(&self) -> ValueMap {
            self.values.clone()
        }
    }

    fn reader(values: Value) -> Rc<MapReader> {
        let Value::Object(values) = values else {
            panic!("expected object");
        };
        Rc::new(MapReader {
            values,
            reads: RefCell::new(Vec::new()),
        })
    }

    #[test]
    fn test_confirm_default_partner() {
        let values = reader(json!({"password": "abc", "password_confirm": "abc"}));
        let ctx = RuleContext::new(json!("abc"), "password", "Password", values.clone());
        assert!(confirm(&ctx, &[]));
        assert_eq!(values.reads.borrow()[0], "password_confirm");
    }

    #[test]
    fn test_confirm_strips_suffix() {
        let values = reader(json!({"password": "abc"}));
        let ctx = RuleContext::new(json!("abd"), "password_confirm", "Confirm", values.clone());
        assert!(!confirm(&ctx, &[]));
        assert_eq!(values.reads.borrow()[0], "password");
    }

    #[test]
    fn test_confirm_explicit_partner() {
        let values = reader(json!({"secret": 7}));
        let ctx = RuleContext::new(json!(7), "pin", "Pin", values);
        assert!(confirm(&ctx, &[RuleArg::from("secret")]));
    }

    #[test]
    fn test_confirm_detached_fails() {
        assert!(!confirm(&RuleContext::detached(json!("x")), &[]));
    }
}
