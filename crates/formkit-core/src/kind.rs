//! Per-classification field behavior.
//!
//! Every classification gets a [`FieldKind`]: the small capability set a
//! field delegates to for its empty value and presentation defaults.

use serde_json::json;

use formkit_model::{Classification, Value, ValueMap};

use crate::declaration::FieldDeclaration;

/// Behavior that varies by classification.
pub trait FieldKind {
    fn classification(&self) -> Classification;

    /// Value of a field that was given none.
    fn empty_value(&self, _decl: &FieldDeclaration) -> Value {
        Value::String(String::new())
    }

    /// Attributes applied before the declared ones.
    fn default_attributes(&self, _decl: &FieldDeclaration) -> ValueMap {
        ValueMap::new()
    }

    /// Check if the field holds a list of values.
    fn is_multi_value(&self, _decl: &FieldDeclaration) -> bool {
        false
    }

    /// Check if the field takes part in validation at all.
    fn validates(&self) -> bool {
        true
    }
}

fn has_options(decl: &FieldDeclaration) -> bool {
    decl.options.is_some()
}

fn flag(decl: &FieldDeclaration, key: &str) -> bool {
    decl.attributes.get(key).is_some_and(|value| match value {
        Value::Bool(b) => *b,
        Value::String(s) => s != "false",
        Value::Null => false,
        _ => true,
    })
}

struct TextKind;

impl FieldKind for TextKind {
    fn classification(&self) -> Classification {
        Classification::Text
    }
}

struct TextareaKind;

impl FieldKind for TextareaKind {
    fn classification(&self) -> Classification {
        Classification::Textarea
    }

    fn default_attributes(&self, _decl: &FieldDeclaration) -> ValueMap {
        let mut attributes = ValueMap::new();
        attributes.insert("rows".to_string(), json!(4));
        attributes
    }
}

struct BoxKind;

impl FieldKind for BoxKind {
    fn classification(&self) -> Classification {
        Classification::Box
    }

    fn empty_value(&self, decl: &FieldDeclaration) -> Value {
        if self.is_multi_value(decl) {
            Value::Array(Vec::new())
        } else if decl.input_type == "checkbox" {
            Value::Bool(false)
        } else {
            Value::String(String::new())
        }
    }

    fn is_multi_value(&self, decl: &FieldDeclaration) -> bool {
        decl.input_type == "checkbox" && has_options(decl)
    }
}

struct SelectKind;

impl FieldKind for SelectKind {
    fn classification(&self) -> Classification {
        Classification::Select
    }

    fn empty_value(&self, decl: &FieldDeclaration) -> Value {
        if self.is_multi_value(decl) {
            Value::Array(Vec::new())
        } else {
            Value::String(String::new())
        }
    }

    fn is_multi_value(&self, decl: &FieldDeclaration) -> bool {
        flag(decl, "multiple")
    }
}

struct ButtonKind;

impl FieldKind for ButtonKind {
    fn classification(&self) -> Classification {
        Classification::Button
    }

    fn validates(&self) -> bool {
        false
    }
}

struct GroupKind;

impl FieldKind for GroupKind {
    fn classification(&self) -> Classification {
        Classification::Group
    }

    fn empty_value(&self, _decl: &FieldDeclaration) -> Value {
        Value::Array(Vec::new())
    }

    fn is_multi_value(&self, _decl: &FieldDeclaration) -> bool {
        true
    }
}

struct FileKind;

impl FieldKind for FileKind {
    fn classification(&self) -> Classification {
        Classification::File
    }

    fn empty_value(&self, _decl: &FieldDeclaration) -> Value {
        Value::Null
    }

    fn is_multi_value(&self, decl: &FieldDeclaration) -> bool {
        flag(decl, "multiple")
    }
}

struct SliderKind;

impl FieldKind for SliderKind {
    fn classification(&self) -> Classification {
        Classification::Slider
    }

    fn default_attributes(&self, _decl: &FieldDeclaration) -> ValueMap {
        let mut attributes = ValueMap::new();
        attributes.insert("min".to_string(), json!(0));
        attributes.insert("max".to_string(), json!(100));
        attributes.insert("step".to_string(), json!(1));
        attributes
    }
}

struct UnknownKind;

impl FieldKind for UnknownKind {
    fn classification(&self) -> Classification {
        Classification::Unknown
    }
}

/// The kind implementation for a classification.
pub fn kind_for(classification: Classification) -> &'static dyn FieldKind {
    match classification {
        Classification::Text => &TextKind,
        Classification::Box => &BoxKind,
        Classification::Select => &SelectKind,
        Classification::Textarea => &TextareaKind,
        Classification::Button => &ButtonKind,
        Classification::Group => &GroupKind,
        Classification::File => &FileKind,
        Classification::Slider => &SliderKind,
        Classification::Unknown => &UnknownKind,
    }
}

/// Attributes for a declaration: kind defaults overlaid with declared ones.
pub fn resolve_attributes(kind: &dyn FieldKind, decl: &FieldDeclaration) -> ValueMap {
    let mut attributes = kind.default_attributes(decl);
    for (key, value) in &decl.attributes {
        attributes.insert(key.clone(), value.clone());
    }
    attributes
}
