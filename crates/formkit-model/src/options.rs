//! Option lists for box and select inputs.

use serde::{Deserialize, Serialize};

use crate::value::{Value, display_text};

/// Options as declared: a list of values/objects, or a `value → label` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionsSpec {
    List(Vec<Value>),
    Map(serde_json::Map<String, Value>),
}

/// A normalized option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub value: Value,
    pub label: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

/// Normalize declared options into `{id, value, label}` entries.
///
/// `id_prefix` is the owning field's id; option ids are `<prefix>_<index>`
/// unless the option object carries its own `id`.
pub fn normalize_options(spec: &OptionsSpec, id_prefix: &str) -> Vec<FieldOption> {
    let option_id = |index: usize| format!("{id_prefix}_{}", index + 1);
    match spec {
        OptionsSpec::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => {
                    let value = map.get("value").cloned().unwrap_or(Value::Null);
                    let label = map
                        .get("label")
                        .map(display_text)
                        .unwrap_or_else(|| display_text(&value));
                    let id = map
                        .get("id")
                        .map(display_text)
                        .unwrap_or_else(|| option_id(index));
                    let disabled = map
                        .get("disabled")
                        .and_then(Value::as_bool)
                        .unwrap_or(false);
                    FieldOption {
                        id,
                        value,
                        label,
                        disabled,
                    }
                }
                other => FieldOption {
                    id: option_id(index),
                    value: other.clone(),
                    label: display_text(other),
                    disabled: false,
                },
            })
            .collect(),
        OptionsSpec::Map(map) => map
            .iter()
            .enumerate()
            .map(|(index, (value, label))| FieldOption {
                id: option_id(index),
                value: Value::String(value.clone()),
                label: display_text(label),
                disabled: false,
            })
            .collect(),
    }
}
