//! Tests for the validation runner.

use std::cell::RefCell;
use std::rc::Rc;

use formkit_model::Value;
use futures::FutureExt;
use futures::channel::oneshot;
use formkit_rules::{
    Predicate, RuleContext, RuleEntry, RuleLibrary, RuleSpec, parse, run, validate_value,
};
use serde_json::json;

/// Predicate that resolves with whatever is sent through `rx`.
fn gated(rx: oneshot::Receiver<bool>) -> Predicate {
    let slot = Rc::new(RefCell::new(Some(rx)));
    Predicate::new(move |_, _| {
        let rx = slot.borrow_mut().take();
        async move {
            match rx {
                Some(rx) => Ok(rx.await.unwrap_or(false)),
                None => Ok(false),
            }
        }
        .boxed_local()
    })
}

fn rule_names(errors: &[formkit_model::ErrorDescriptor]) -> Vec<&str> {
    errors.iter().map(|e| e.rule_name.as_str()).collect()
}

#[tokio::test]
async fn required_and_in_fail_in_order_on_empty_string() {
    let rules = parse(&RuleSpec::from("required|in:a,b"), &RuleLibrary::builtin()).unwrap();
    let errors = validate_value(&rules, json!("")).await;
    assert_eq!(rule_names(&errors), ["required", "in"]);
    assert_eq!(errors[1].field_value, json!(""));
    assert_eq!(errors[1].args.len(), 2);
}

#[tokio::test]
async fn failures_keep_declaration_order_when_resolved_in_reverse() {
    let (tx_a, rx_a) = oneshot::channel();
    let (tx_b, rx_b) = oneshot::channel();
    let (tx_c, rx_c) = oneshot::channel();
    let spec = RuleSpec::List(vec![
        RuleEntry::named("a", gated(rx_a)),
        RuleEntry::named("b", gated(rx_b)),
        RuleEntry::named("c", gated(rx_c)),
    ]);
    let rules = parse(&spec, &RuleLibrary::builtin()).unwrap();
    let pending = run(&rules, &RuleContext::detached(json!("x")));

    let driver = async move {
        tx_c.send(false).unwrap();
        tokio::task::yield_now().await;
        tx_b.send(false).unwrap();
        tokio::task::yield_now().await;
        tx_a.send(true).unwrap();
    };
    let (errors, ()) = futures::join!(pending, driver);
    assert_eq!(rule_names(&errors), ["b", "c"]);
}

#[tokio::test]
async fn rerun_is_idempotent() {
    let rules = parse(
        &RuleSpec::from("required|min:5|alpha"),
        &RuleLibrary::builtin(),
    )
    .unwrap();
    let first = validate_value(&rules, json!("ab1")).await;
    let second = validate_value(&rules, json!("ab1")).await;
    assert_eq!(first, second);
    assert_eq!(rule_names(&first), ["min", "alpha"]);
}

#[tokio::test]
async fn optional_skips_rules_for_empty_value() {
    let rules = parse(&RuleSpec::from("optional|email|min:5"), &RuleLibrary::builtin()).unwrap();
    assert!(validate_value(&rules, json!("")).await.is_empty());
    assert_eq!(rule_names(&validate_value(&rules, json!("x")).await), ["email", "min"]);
}

#[tokio::test]
async fn bail_suppresses_later_failures() {
    let rules = parse(&RuleSpec::from("bail|required|email"), &RuleLibrary::builtin()).unwrap();
    assert_eq!(rule_names(&validate_value(&rules, Value::Null).await), ["required"]);
}

#[tokio::test]
async fn predicates_start_before_any_is_awaited() {
    let started = Rc::new(RefCell::new(Vec::new()));
    let tracker = |name: &'static str| {
        let started = Rc::clone(&started);
        Predicate::new(move |_, _| {
            started.borrow_mut().push(name);
            async { Ok(true) }.boxed_local()
        })
    };
    let spec = RuleSpec::List(vec![
        RuleEntry::named("a", tracker("a")),
        RuleEntry::named("b", tracker("b")),
    ]);
    let rules = parse(&spec, &RuleLibrary::builtin()).unwrap();
    let pending = run(&rules, &RuleContext::detached(json!(1)));
    assert_eq!(*started.borrow(), ["a", "b"]);
    assert!(pending.await.is_empty());
}
