//! Field context snapshots handed to the rendering layer.

use std::rc::Rc;

use formkit_core::{FieldDeclaration, Form, FormConfig};
use formkit_model::{Classification, OptionsSpec};
use serde_json::json;

fn signup_config() -> Rc<FormConfig> {
    let mut config = FormConfig::default();
    config.id_prefix = "signup".to_string();
    Rc::new(config)
}

#[test]
fn text_field_context_snapshot() {
    let form = Form::new(signup_config());
    let email = form
        .add_field(
            FieldDeclaration::new("email")
                .named("email")
                .with_label("Email")
                .with_validation("required|email")
                .with_attribute("placeholder", json!("you@example.com")),
        )
        .unwrap();
    email.blur();

    let context = email.context();
    insta::assert_json_snapshot!(context.as_ref(), @r#"
    {
      "id": "signup-1",
      "name": "email",
      "type": "email",
      "classification": "text",
      "renderer": "input-text",
      "label": "Email",
      "value": "",
      "attributes": {
        "placeholder": "you@example.com"
      },
      "errors": {
        "explicit": [],
        "validation": [
          "Email is required."
        ],
        "visible": [
          "Email is required."
        ]
      },
      "has_errors": true,
      "validating": false
    }
    "#);
}

#[test]
fn select_context_carries_normalized_options() {
    let form = Form::new(signup_config());
    let plan = form
        .add_field(
            FieldDeclaration::new("select")
                .named("plan")
                .with_id("plan")
                .with_options(OptionsSpec::Map(
                    json!({"free": "Free", "pro": "Pro"})
                        .as_object()
                        .cloned()
                        .unwrap_or_default(),
                )),
        )
        .unwrap();

    let context = plan.context();
    assert_eq!(context.classification, Classification::Select);
    assert_eq!(context.renderer, "input-select");
    let options = context.options.as_ref().unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0].id, "plan_1");
    assert_eq!(options[0].label, "Free");
    assert_eq!(options[1].value, json!("pro"));
}

#[test]
fn context_reflects_explicit_errors_regardless_of_policy() {
    let form = Form::new(signup_config());
    let handle = form
        .add_field(FieldDeclaration::new("text").named("handle"))
        .unwrap();
    let before = handle.context();
    assert!(!before.has_errors);

    handle.set_explicit_errors(vec!["Handle is taken.".to_string()]);
    let after = handle.context();
    assert!(!Rc::ptr_eq(&before, &after));
    assert_eq!(after.errors.visible, ["Handle is taken."]);
    assert!(after.errors.validation.is_empty());
    assert!(!handle.is_valid());
}

#[test]
fn slider_and_textarea_defaults_in_attributes() {
    let form = Form::new(signup_config());
    let volume = form
        .add_field(FieldDeclaration::new("range").named("volume").with_attribute("max", json!(11)))
        .unwrap();
    let bio = form.add_field(FieldDeclaration::new("textarea").named("bio")).unwrap();

    assert_eq!(volume.context().attributes["max"], json!(11));
    assert_eq!(volume.context().attributes["step"], json!(1));
    assert_eq!(bio.context().attributes["rows"], json!(4));
}
