//! Schema loading and the validate pipeline.
//!
//! A run has three stages: load (schema, values, settings), build (mount
//! every declaration into a [`Form`]) and submit (settle pending validation
//! and gate on errors).

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug, info, info_span};

use formkit_core::{
    FieldDeclaration, Form, FormConfig, FormSettings, SubmitOutcome, TokioLocalSpawner,
};
use formkit_model::{Classification, ValueMap, display_text};

use crate::logging::redact_value;

/// File formats accepted for schemas, values and settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Toml,
}

impl SourceFormat {
    /// Pick the format from a file extension. Anything but `.toml` is JSON.
    pub fn of(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Schema file layout: a bare list (JSON only) or a `fields` table.
#[derive(Deserialize)]
#[serde(untagged)]
enum SchemaFile {
    List(Vec<FieldDeclaration>),
    Table { fields: Vec<FieldDeclaration> },
}

impl SchemaFile {
    fn into_fields(self) -> Vec<FieldDeclaration> {
        match self {
            Self::List(fields) | Self::Table { fields } => fields,
        }
    }
}

/// Parse schema text.
pub fn parse_schema(content: &str, format: SourceFormat) -> Result<Vec<FieldDeclaration>> {
    let schema: SchemaFile = match format {
        SourceFormat::Json => serde_json::from_str(content).context("parse JSON schema")?,
        SourceFormat::Toml => toml::from_str(content).context("parse TOML schema")?,
    };
    Ok(schema.into_fields())
}

/// Parse a value set. The top level must be an object.
pub fn parse_values(content: &str, format: SourceFormat) -> Result<ValueMap> {
    let value: serde_json::Value = match format {
        SourceFormat::Json => serde_json::from_str(content).context("parse JSON values")?,
        SourceFormat::Toml => toml::from_str(content).context("parse TOML values")?,
    };
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("values must be an object, found {}", kind_of(&other)),
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

pub fn load_schema(path: &Path) -> Result<Vec<FieldDeclaration>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read schema {}", path.display()))?;
    parse_schema(&content, SourceFormat::of(path))
        .with_context(|| format!("load schema {}", path.display()))
}

pub fn load_values(path: &Path) -> Result<ValueMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read values {}", path.display()))?;
    parse_values(&content, SourceFormat::of(path))
        .with_context(|| format!("load values {}", path.display()))
}

pub fn load_settings(path: &Path) -> Result<FormSettings> {
    FormSettings::load_from(path).with_context(|| format!("load settings {}", path.display()))
}

/// One field's line in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    pub classification: Classification,
    pub errors: Vec<String>,
}

impl FieldSummary {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of one validate run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub schema: PathBuf,
    pub submitted: bool,
    pub fields: Vec<FieldSummary>,
    pub form_errors: Vec<String>,
    pub values: ValueMap,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.fields.iter().map(|field| field.errors.len()).sum::<usize>() + self.form_errors.len()
    }
}

/// Inputs of a validate run.
#[derive(Debug, Clone, Default)]
pub struct ValidateInput {
    pub schema_path: PathBuf,
    pub schema: Vec<FieldDeclaration>,
    pub values: ValueMap,
    pub settings: FormSettings,
}

impl ValidateInput {
    /// Load every input from disk.
    pub fn load(schema: &Path, values: Option<&Path>, settings: Option<&Path>) -> Result<Self> {
        Ok(Self {
            schema_path: schema.to_path_buf(),
            schema: load_schema(schema)?,
            values: values.map(load_values).transpose()?.unwrap_or_default(),
            settings: settings.map(load_settings).transpose()?.unwrap_or_default(),
        })
    }
}

/// Build the form, submit it and collect the report.
///
/// Must run inside a `tokio::task::LocalSet`: validation runs are spawned
/// with [`TokioLocalSpawner`].
pub async fn validate(input: ValidateInput) -> Result<ValidationReport> {
    let span = info_span!("validate", schema = %input.schema_path.display());
    run(input).instrument(span).await
}

async fn run(input: ValidateInput) -> Result<ValidationReport> {
    let start = Instant::now();

    let config = FormConfig::from_settings(input.settings)
        .context("apply settings")?
        .with_spawner(Rc::new(TokioLocalSpawner));
    let form = Form::from_schema(Rc::new(config), input.schema, input.values)
        .context("build form")?;
    for field in form.fields() {
        let value = display_text(&field.value());
        debug!(
            field = field.name().unwrap_or_default(),
            value = redact_value(&value),
            "initial value"
        );
    }

    let outcome = form.submit().await.context("submit form")?;
    let fields: Vec<FieldSummary> = form
        .fields()
        .iter()
        .filter_map(|field| {
            let mut errors = field.explicit_errors();
            errors.extend(field.validation_messages());
            Some(FieldSummary {
                name: field.name()?.to_string(),
                input_type: field.input_type().to_string(),
                classification: field.classification(),
                errors,
            })
        })
        .collect();
    let report = ValidationReport {
        schema: input.schema_path,
        submitted: outcome.is_submitted(),
        form_errors: form.form_errors(),
        values: match outcome {
            SubmitOutcome::Submitted(values) => values,
            SubmitOutcome::Invalid => form.values(),
        },
        fields,
    };
    info!(
        fields = report.fields.len(),
        errors = report.error_count(),
        submitted = report.submitted,
        duration_ms = start.elapsed().as_millis(),
        "validation complete"
    );
    Ok(report)
}
