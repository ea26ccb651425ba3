//! Aggregates: the flat value object plus the registry of fields mirroring it.
//!
//! An [`Aggregate`] backs a form and every item of a repeatable group. It is
//! the only writer of its value object. Fields send their edits up through
//! it; it pushes external assignments down into registered fields and emits
//! a fresh copy of the value object to subscribers after every change.
//!
//! Registration of a name that is still occupied is deferred. It completes
//! as soon as the old field is deregistered. A name still occupied at the end
//! of the current task (with a spawner) or at the next settle point fails
//! with [`FormError::DuplicateRegistration`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, join_all};
use tracing::{debug, trace, warn};

use formkit_model::{Value, ValueMap, shallow_equal_opt};

use crate::cell::ListenerId;
use crate::config::FormConfig;
use crate::error::{FormError, Result};
use crate::field::Field;
use crate::registry::Registry;

type ValuesListener = Rc<dyn Fn(&ValueMap)>;

pub(crate) struct AggregateInner {
    config: Rc<FormConfig>,
    values: RefCell<ValueMap>,
    registry: RefCell<Registry<Field>>,
    deferred: RefCell<Vec<Field>>,
    flush_scheduled: Cell<bool>,
    /// Conflict found by a scheduled flush, reported at the next settle point.
    conflict: RefCell<Option<FormError>>,
    listeners: RefCell<Vec<(ListenerId, ValuesListener)>>,
    next_listener: Cell<u64>,
}

impl AggregateInner {
    /// Store `value` under `name`, or delete the key for `None`.
    ///
    /// Returns whether the stored value changed.
    fn write(&self, name: &str, value: Option<Value>) -> bool {
        let mut values = self.values.borrow_mut();
        if shallow_equal_opt(values.get(name), value.as_ref()) {
            return false;
        }
        match value {
            Some(value) => values.insert(name.to_string(), value),
            None => values.remove(name),
        };
        true
    }

    /// Send a copy of the value object to every subscriber.
    fn emit(&self) {
        let snapshot = self.snapshot();
        let listeners: Vec<ValuesListener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&snapshot);
        }
    }

    pub(crate) fn snapshot(&self) -> ValueMap {
        self.values.borrow().clone()
    }

    fn field(&self, name: &str) -> Option<Field> {
        self.registry.borrow().get(name).cloned()
    }

    /// A registered field changed its own value.
    pub(crate) fn field_edited(&self, name: &str, value: Value) {
        if self.write(name, Some(value)) {
            self.emit();
        }
        self.notify_changed(name);
    }

    /// Value of `target` for a rule running on `reader`, recording the read.
    pub(crate) fn read_dependency(&self, reader: &str, target: &str) -> Option<Value> {
        self.registry.borrow_mut().record_read(reader, target);
        match self.field(target) {
            Some(field) => Some(field.value()),
            None => self.values.borrow().get(target).cloned(),
        }
    }

    fn notify_changed(&self, name: &str) {
        let dependents = self.registry.borrow().dependents_of(name);
        self.revalidate(&dependents);
    }

    fn revalidate(&self, names: &[String]) {
        for name in names {
            if let Some(field) = self.field(name) {
                trace!(field = %name, "re-validating dependent");
                field.validate();
            }
        }
    }
}

/// Handle to an aggregate. Clones share the same value object and registry.
#[derive(Clone)]
pub struct Aggregate(pub(crate) Rc<AggregateInner>);

impl Aggregate {
    pub fn new(config: Rc<FormConfig>) -> Self {
        Self::with_values(config, ValueMap::new())
    }

    /// Aggregate seeded with host-supplied values.
    pub fn with_values(config: Rc<FormConfig>, values: ValueMap) -> Self {
        Self(Rc::new(AggregateInner {
            config,
            values: RefCell::new(values),
            registry: RefCell::new(Registry::new()),
            deferred: RefCell::new(Vec::new()),
            flush_scheduled: Cell::new(false),
            conflict: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(0),
        }))
    }

    pub fn config(&self) -> &Rc<FormConfig> {
        &self.0.config
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    /// Register a field under its name.
    ///
    /// The field's initial value is, in order of precedence, its declared
    /// value, the value already held under its name, or its empty value.
    /// Excluded fields are ignored. A name that is still occupied defers the
    /// registration until the occupant is deregistered.
    ///
    /// # Errors
    ///
    /// Name conflicts are reported by [`Aggregate::flush_deferred`], not here.
    pub fn register(&self, field: &Field) -> Result<()> {
        let Some(name) = field.name() else {
            debug!(id = field.id(), "field excluded from aggregate");
            return Ok(());
        };
        let occupant = self.0.field(name);
        match occupant {
            Some(existing) if existing.ptr_eq(field) => Ok(()),
            Some(_) => {
                debug!(field = name, "name occupied, deferring registration");
                self.0.deferred.borrow_mut().push(field.clone());
                self.schedule_flush();
                Ok(())
            }
            None => self.insert(name, field),
        }
    }

    fn insert(&self, name: &str, field: &Field) -> Result<()> {
        self.0.registry.borrow_mut().insert(name, field.clone())?;
        field.attach(&self.0);

        let held = self.0.values.borrow().get(name).cloned();
        let initial = if field.has_explicit_value() {
            field.value()
        } else if let Some(held) = held {
            held
        } else {
            field.empty_value().clone()
        };
        let initial = field.assign_initial(initial);
        if self.0.write(name, Some(initial)) {
            self.0.emit();
        }
        debug!(field = name, "registered field");

        field.validate();
        self.0.notify_changed(name);
        Ok(())
    }

    /// Remove the field registered under `name`.
    ///
    /// Its key leaves the value object unless the field keeps its model data,
    /// and fields that read it are re-validated. A registration deferred on
    /// `name` completes right away.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::NotRegistered`] for an unknown name.
    pub fn deregister(&self, name: &str) -> Result<Field> {
        let dependents = self.0.registry.borrow().dependents_of(name);
        let removed = self.0.registry.borrow_mut().remove(name);
        let field = removed.ok_or_else(|| FormError::NotRegistered {
            name: name.to_string(),
        })?;
        field.detach();
        if !field.keeps_model_data() && self.0.write(name, None) {
            self.0.emit();
        }
        debug!(field = name, dependents = dependents.len(), "deregistered field");

        let waiting = {
            let mut deferred = self.0.deferred.borrow_mut();
            deferred
                .iter()
                .position(|queued| queued.name() == Some(name))
                .map(|index| deferred.remove(index))
        };
        match waiting {
            Some(replacement) => {
                debug!(field = name, "completing deferred registration");
                self.insert(name, &replacement)?;
            }
            None => self.0.revalidate(&dependents),
        }
        Ok(field)
    }

    /// Complete deferred registrations at the end of the current task.
    ///
    /// Only with a configured spawner; otherwise they wait for the next
    /// settle point.
    fn schedule_flush(&self) {
        let Some(spawner) = &self.0.config.spawner else {
            return;
        };
        if self.0.flush_scheduled.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.0);
        spawner.spawn(
            async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.flush_scheduled.set(false);
                let aggregate = Aggregate(inner);
                if let Err(err) = aggregate.complete_deferred() {
                    warn!(error = %err, "deferred registration failed");
                    aggregate.0.conflict.borrow_mut().get_or_insert(err);
                }
            }
            .boxed_local(),
        );
    }

    /// Complete deferred registrations.
    ///
    /// # Errors
    ///
    /// Returns the first [`FormError::DuplicateRegistration`] for a name that
    /// is still occupied by another field, including one already found by a
    /// scheduled flush. Other queued fields still register.
    pub fn flush_deferred(&self) -> Result<()> {
        let flushed = self.complete_deferred();
        let earlier = self.0.conflict.borrow_mut().take();
        match earlier {
            Some(err) => Err(err),
            None => flushed,
        }
    }

    fn complete_deferred(&self) -> Result<()> {
        let queued = std::mem::take(&mut *self.0.deferred.borrow_mut());
        let mut first_error = None;
        for field in queued {
            let Some(name) = field.name() else {
                continue;
            };
            let occupant = self.0.field(name);
            match occupant {
                Some(existing) if existing.ptr_eq(&field) => {}
                Some(_) => {
                    warn!(field = name, "deferred registration still conflicts");
                    first_error.get_or_insert(FormError::DuplicateRegistration {
                        name: name.to_string(),
                    });
                }
                None => {
                    debug!(field = name, "completing deferred registration");
                    if let Err(err) = self.insert(name, &field) {
                        first_error.get_or_insert(err);
                    }
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    pub fn pending_registrations(&self) -> usize {
        self.0.deferred.borrow().len()
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        self.0.field(name)
    }

    /// Registered fields in registration order.
    pub fn fields(&self) -> Vec<Field> {
        self.0.registry.borrow().handles()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.registry.borrow().names()
    }

    /// Fields whose rules read `name`.
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.0.registry.borrow().dependents_of(name)
    }

    // =========================================================================
    // VALUES
    // =========================================================================

    /// Copy of the value object.
    pub fn values(&self) -> ValueMap {
        self.0.snapshot()
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.0.values.borrow().get(name).cloned()
    }

    /// Set one key of the value object; `None` deletes it.
    ///
    /// Always emits. A field registered under `name` takes the new value
    /// (`null` when the key was deleted).
    pub fn set_field_value(&self, name: &str, value: Option<Value>) {
        let changed = self.0.write(name, value.clone());
        self.0.emit();
        if let Some(field) = self.0.field(name) {
            field.assign(value.unwrap_or(Value::Null));
        }
        if changed {
            self.0.notify_changed(name);
        }
    }

    /// Reconcile the whole value object against `values`.
    ///
    /// Every key present on either side that differs is written (or deleted),
    /// registered fields take their new values, then dependents re-validate.
    /// Emits once when anything changed.
    pub fn set_values(&self, mut values: ValueMap) {
        let keys: BTreeSet<String> = self
            .0
            .values
            .borrow()
            .keys()
            .chain(values.keys())
            .cloned()
            .collect();
        let mut changed = Vec::new();
        for key in keys {
            let incoming = values.remove(&key);
            if self.0.write(&key, incoming.clone()) {
                changed.push((key, incoming));
            }
        }
        if changed.is_empty() {
            return;
        }
        debug!(changed = changed.len(), "synchronized aggregate values");
        self.0.emit();
        for (key, incoming) in &changed {
            if let Some(field) = self.0.field(key) {
                field.assign(incoming.clone().unwrap_or(Value::Null));
            }
        }
        for (key, _) in &changed {
            self.0.notify_changed(key);
        }
    }

    /// Re-validate the fields that read `name`.
    pub fn notify_changed(&self, name: &str) {
        self.0.notify_changed(name);
    }

    /// Listen for value object changes.
    pub fn subscribe(&self, listener: impl Fn(&ValueMap) + 'static) -> ListenerId {
        let id = ListenerId::next(&self.0.next_listener);
        self.0.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.0.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Resolve `true` when any registered field (or group item) fails validation.
    ///
    /// Completes deferred registrations first, then starts a run on every
    /// field without a pending one and waits for all of them.
    pub fn has_validation_errors(&self) -> LocalBoxFuture<'static, bool> {
        if let Err(err) = self.flush_deferred() {
            warn!(error = %err, "deferred registration failed");
        }
        let barriers: Vec<_> = self
            .fields()
            .iter()
            .map(Field::validation_barrier)
            .collect();
        async move { join_all(barriers).await.into_iter().any(|failing| failing) }.boxed_local()
    }

    /// Drive deferred registrations and pending validation runs to completion.
    ///
    /// # Errors
    ///
    /// Returns the deferred registration conflict, if any; pending runs are
    /// still awaited.
    pub fn settle(&self) -> LocalBoxFuture<'static, Result<()>> {
        let flushed = self.flush_deferred();
        let fields = self.fields();
        async move {
            join_all(fields.iter().map(Field::settle)).await;
            flushed
        }
        .boxed_local()
    }

    /// Make validation errors visible on every field.
    pub fn show_errors(&self) {
        for field in self.fields() {
            field.show_errors();
        }
    }

    /// Reset every field to its empty value and clear errors.
    pub fn reset(&self) {
        let fields = self.fields();
        let mut values = ValueMap::new();
        for field in &fields {
            field.reset_errors();
            if let Some(name) = field.name() {
                values.insert(name.to_string(), field.empty_value().clone());
            }
        }
        debug!(fields = fields.len(), "resetting aggregate");
        self.set_values(values);
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("fields", &self.names())
            .field("deferred", &self.pending_registrations())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::FieldDeclaration;
    use serde_json::json;

    fn setup() -> (Rc<FormConfig>, Aggregate) {
        let config = Rc::new(FormConfig::default());
        let aggregate = Aggregate::new(Rc::clone(&config));
        (config, aggregate)
    }

    fn field(config: &Rc<FormConfig>, decl: FieldDeclaration) -> Field {
        Field::new(decl, Rc::clone(config)).unwrap()
    }

    #[test]
    fn test_register_writes_empty_value() {
        let (config, aggregate) = setup();
        let multi = FieldDeclaration::new("checkbox")
            .named("tags")
            .with_options(formkit_model::OptionsSpec::List(vec![json!("a")]));
        aggregate.register(&field(&config, multi)).unwrap();
        assert_eq!(aggregate.value("tags"), Some(json!([])));
    }

    #[test]
    fn test_excluded_field_stays_out() {
        let (config, aggregate) = setup();
        let decl = FieldDeclaration::new("text").excluded().with_value(json!("x"));
        aggregate.register(&field(&config, decl)).unwrap();
        assert!(aggregate.values().is_empty());
        assert!(aggregate.fields().is_empty());
    }

    #[test]
    fn test_edit_flows_up_and_emits_copy() {
        let (config, aggregate) = setup();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        aggregate.subscribe(move |values| sink.borrow_mut().push(values.clone()));
        let name = field(&config, FieldDeclaration::new("text").named("name"));
        aggregate.register(&name).unwrap();
        name.edit(json!("Ada"));
        let seen = seen.borrow();
        assert_eq!(seen.last().unwrap()["name"], json!("Ada"));
        assert_eq!(aggregate.value("name"), Some(json!("Ada")));
    }

    #[test]
    fn test_set_field_value_none_deletes_key() {
        let (config, aggregate) = setup();
        let name = field(&config, FieldDeclaration::new("text").named("name"));
        aggregate.register(&name).unwrap();
        aggregate.set_field_value("name", None);
        assert!(!aggregate.values().contains_key("name"));
        assert_eq!(name.value(), Value::Null);
    }

    #[test]
    fn test_deregister_unknown_name() {
        let (_, aggregate) = setup();
        let err = aggregate.deregister("ghost").unwrap_err();
        assert!(matches!(err, FormError::NotRegistered { .. }));
    }

    #[test]
    fn test_keep_model_data_survives_deregistration() {
        let (config, aggregate) = setup();
        let decl = FieldDeclaration::new("text")
            .named("note")
            .with_value(json!("keep me"))
            .keep_model_data();
        aggregate.register(&field(&config, decl)).unwrap();
        aggregate.deregister("note").unwrap();
        assert_eq!(aggregate.value("note"), Some(json!("keep me")));
    }

    #[test]
    fn test_reset_restores_empty_values() {
        let (config, aggregate) = setup();
        let decl = FieldDeclaration::new("text")
            .named("city")
            .with_value(json!("Oslo"))
            .with_errors(vec!["taken".to_string()]);
        let city = field(&config, decl);
        aggregate.register(&city).unwrap();
        aggregate.reset();
        assert_eq!(aggregate.value("city"), Some(json!("")));
        assert_eq!(city.value(), json!(""));
        assert!(city.explicit_errors().is_empty());
    }
}
