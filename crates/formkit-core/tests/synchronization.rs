//! Value synchronization between the aggregate and its fields.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use formkit_core::{FieldDeclaration, Form, FormConfig};
use formkit_model::{Value, ValueMap};
use serde_json::json;

fn values(value: Value) -> ValueMap {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected an object"),
    }
}

fn form_with(initial: Value) -> Form {
    Form::with_values(Rc::new(FormConfig::default()), values(initial))
}

#[tokio::test]
async fn set_field_value_reaches_snapshot_and_field() {
    let form = form_with(json!({}));
    let x = form.add_field(FieldDeclaration::new("text").named("x")).unwrap();

    form.set_field_value("x", Some(json!("v")));
    form.settle().await.unwrap();

    assert_eq!(form.values()["x"], json!("v"));
    assert_eq!(x.value(), json!("v"));
}

#[tokio::test]
async fn set_field_value_without_field_only_touches_aggregate() {
    let form = form_with(json!({}));
    form.set_field_value("orphan", Some(json!(3)));
    form.settle().await.unwrap();
    assert_eq!(form.values()["orphan"], json!(3));

    form.set_field_value("orphan", None);
    assert!(!form.values().contains_key("orphan"));
}

#[test]
fn every_set_field_value_emits_a_copy() {
    let form = form_with(json!({"a": 1}));
    let emitted = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&emitted);
    form.subscribe(move |values| sink.borrow_mut().push(values.clone()));

    form.set_field_value("a", Some(json!(1)));
    form.set_field_value("b", Some(json!(2)));

    let emitted = emitted.borrow();
    assert_eq!(emitted.len(), 2);
    assert_eq!(emitted[1], values(json!({"a": 1, "b": 2})));
}

#[test]
fn snapshots_do_not_alias_internal_state() {
    let form = form_with(json!({"a": 1}));
    let mut snapshot = form.values();
    snapshot.insert("b".to_string(), json!(2));
    snapshot.remove("a");
    assert_eq!(form.values(), values(json!({"a": 1})));
}

#[test]
fn set_values_reconciles_both_key_sets() {
    let form = form_with(json!({}));
    let a = form.add_field(FieldDeclaration::new("text").named("a")).unwrap();
    let b = form
        .add_field(FieldDeclaration::new("text").named("b").with_value(json!("keep?")))
        .unwrap();
    let emissions = Rc::new(Cell::new(0));
    let counter = Rc::clone(&emissions);
    form.subscribe(move |_| counter.set(counter.get() + 1));

    form.set_values(values(json!({"a": "new", "c": 3})));

    assert_eq!(form.values(), values(json!({"a": "new", "c": 3})));
    assert_eq!(a.value(), json!("new"));
    assert_eq!(b.value(), Value::Null);
    assert_eq!(emissions.get(), 1);
}

#[test]
fn set_values_with_no_difference_is_silent() {
    let form = form_with(json!({}));
    form.add_field(FieldDeclaration::new("text").named("a").with_value(json!("x")))
        .unwrap();
    let emissions = Rc::new(Cell::new(0));
    let counter = Rc::clone(&emissions);
    form.subscribe(move |_| counter.set(counter.get() + 1));

    form.set_values(values(json!({"a": "x"})));
    assert_eq!(emissions.get(), 0);
}

#[test]
fn field_edits_flow_up_to_the_aggregate() {
    let form = form_with(json!({}));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    form.subscribe(move |values| sink.borrow_mut().push(values.get("city").cloned()));
    let city = form.add_field(FieldDeclaration::new("text").named("city")).unwrap();

    city.edit(json!("Oslo"));

    assert_eq!(form.values()["city"], json!("Oslo"));
    assert_eq!(seen.borrow().last(), Some(&Some(json!("Oslo"))));
}

#[test]
fn watchers_see_external_assignments() {
    let form = form_with(json!({}));
    let city = form.add_field(FieldDeclaration::new("text").named("city")).unwrap();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    city.watch(move |value| sink.borrow_mut().push(value.clone()));

    form.set_values(values(json!({"city": "Bergen"})));
    assert_eq!(*seen.borrow(), [json!("Bergen")]);
}

#[test]
fn group_values_round_trip_through_the_form() {
    let form = form_with(json!({"people": [{"name": "Ada"}]}));
    let people = form
        .add_field(
            FieldDeclaration::new("group")
                .named("people")
                .with_children(vec![FieldDeclaration::new("text").named("name")]),
        )
        .unwrap();
    assert_eq!(form.values()["people"], json!([{"name": "Ada"}]));

    let item = people.group().unwrap().add_item().unwrap();
    item.field("name").unwrap().edit(json!("Alan"));
    assert_eq!(
        form.values()["people"],
        json!([{"name": "Ada"}, {"name": "Alan"}])
    );

    form.set_field_value("people", Some(json!([{"name": "Grace"}])));
    assert_eq!(people.group().unwrap().len(), 1);
    assert_eq!(form.values()["people"], json!([{"name": "Grace"}]));
}

#[test]
fn reset_clears_values_and_errors() {
    let form = form_with(json!({"note": "draft"}));
    let note = form
        .add_field(FieldDeclaration::new("textarea").named("note").with_validation("required"))
        .unwrap();
    form.set_form_errors(vec!["Server unavailable".to_string()]);
    note.blur();

    form.reset();

    assert_eq!(form.values()["note"], json!(""));
    assert!(form.form_errors().is_empty());
    assert!(note.visible_errors().is_empty());
    assert!(note.has_validation_errors());
}
