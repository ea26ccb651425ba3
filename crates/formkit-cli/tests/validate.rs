//! Integration tests for the validate pipeline.

use std::path::{Path, PathBuf};

use formkit_cli::pipeline::{ValidateInput, ValidationReport, validate};
use serde_json::json;
use tokio::task::LocalSet;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

async fn run(schema: &str, values: Option<&str>, settings: Option<&str>) -> ValidationReport {
    let values = values.map(fixture);
    let settings = settings.map(fixture);
    let input =
        ValidateInput::load(&fixture(schema), values.as_deref(), settings.as_deref()).unwrap();
    LocalSet::new().run_until(validate(input)).await.unwrap()
}

#[tokio::test]
async fn test_invalid_values_suppress_submission() {
    let report = run("signup.json", Some("invalid.json"), None).await;

    assert!(!report.submitted);
    assert_eq!(report.error_count(), 3);
    insta::assert_json_snapshot!(report.fields, @r#"
    [
      {
        "name": "username",
        "type": "text",
        "classification": "text",
        "errors": [
          "Username is required."
        ]
      },
      {
        "name": "email",
        "type": "email",
        "classification": "text",
        "errors": []
      },
      {
        "name": "password",
        "type": "password",
        "classification": "text",
        "errors": []
      },
      {
        "name": "password_confirm",
        "type": "password",
        "classification": "text",
        "errors": [
          "Confirmation does not match."
        ]
      },
      {
        "name": "terms",
        "type": "checkbox",
        "classification": "box",
        "errors": [
          "Please accept the terms."
        ]
      }
    ]
    "#);
}

#[tokio::test]
async fn test_toml_schema_and_values_submit() {
    let report = run("signup.toml", Some("valid.toml"), None).await;

    assert!(report.submitted);
    assert_eq!(report.error_count(), 0);
    assert_eq!(
        serde_json::Value::Object(report.values),
        json!({"username": "ada", "email": "ada@example.com", "plan": "pro"})
    );
}

#[tokio::test]
async fn test_settings_replace_messages() {
    let report = run("signup.toml", None, Some("settings.toml")).await;

    assert!(!report.submitted);
    let username = report
        .fields
        .iter()
        .find(|field| field.name == "username")
        .unwrap();
    assert_eq!(username.errors, ["Please fill in Username."]);
}

#[test]
fn test_missing_schema_names_the_file() {
    let err = ValidateInput::load(&fixture("missing.json"), None, None).unwrap_err();
    assert!(format!("{err:#}").contains("missing.json"));
}
