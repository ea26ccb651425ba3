//! Per-call context handed to rule predicates.

use std::rc::Rc;

use formkit_model::{Value, ValueMap};

/// Read access to sibling field values.
///
/// Implemented by the registry that owns the field. Every read is recorded
/// as a dependency so the reader is re-validated when the target changes.
pub trait DependencyReader {
    /// Current value of another field, recording the read.
    fn read(&self, target: &str) -> Option<Value>;

    /// Snapshot of every value in the owning aggregate.
    fn values(&self) -> ValueMap;
}

/// Reader for fields that are not attached to an aggregate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Detached;

impl DependencyReader for Detached {
    fn read(&self, _target: &str) -> Option<Value> {
        None
    }

    fn values(&self) -> ValueMap {
        ValueMap::new()
    }
}

/// Context for a single validation run of a single field.
#[derive(Clone)]
pub struct RuleContext {
    /// Value under validation.
    pub value: Value,
    /// Field name (empty when the field has none).
    pub name: String,
    /// Label used in error descriptors.
    pub label: String,
    reader: Rc<dyn DependencyReader>,
}

impl RuleContext {
    /// Create a context backed by a dependency reader.
    pub fn new(
        value: Value,
        name: impl Into<String>,
        label: impl Into<String>,
        reader: Rc<dyn DependencyReader>,
    ) -> Self {
        Self {
            value,
            name: name.into(),
            label: label.into(),
            reader,
        }
    }

    /// Context with no sibling fields, for validating a bare value.
    pub fn detached(value: Value) -> Self {
        Self::new(value, "", "", Rc::new(Detached))
    }

    /// Read another field's current value (recorded as a dependency).
    pub fn read_field(&self, target: &str) -> Option<Value> {
        self.reader.read(target)
    }

    /// Snapshot of all values in the owning aggregate.
    pub fn form_values(&self) -> ValueMap {
        self.reader.values()
    }
}

impl std::fmt::Debug for RuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleContext")
            .field("name", &self.name)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
