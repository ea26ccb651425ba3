//! Forms: the top-level aggregate with submission.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info};

use formkit_model::{Value, ValueMap};

use crate::aggregate::Aggregate;
use crate::cell::ListenerId;
use crate::config::FormConfig;
use crate::declaration::FieldDeclaration;
use crate::error::{FormError, Result};
use crate::field::Field;

/// Outcome of [`Form::submit`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Validation passed; the payload is the value object.
    Submitted(ValueMap),
    /// Validation failed; every field's errors are now visible.
    Invalid,
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }
}

/// Per-field error report produced by [`Form::errors`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Form-level errors injected by the host.
    pub form: Vec<String>,
    /// Field name → every error on that field, explicit first.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ErrorReport {
    pub fn is_empty(&self) -> bool {
        self.form.is_empty() && self.fields.is_empty()
    }
}

/// A form: an aggregate plus submission and form-level errors.
pub struct Form {
    aggregate: Aggregate,
    config: Rc<FormConfig>,
    /// Fields mounted through this form, including excluded ones.
    mounted: RefCell<Vec<Field>>,
    form_errors: RefCell<Vec<String>>,
    loading: Cell<bool>,
}

impl Form {
    pub fn new(config: Rc<FormConfig>) -> Self {
        Self::with_values(config, ValueMap::new())
    }

    /// Form bound to host-supplied values.
    pub fn with_values(config: Rc<FormConfig>, values: ValueMap) -> Self {
        Self {
            aggregate: Aggregate::with_values(Rc::clone(&config), values),
            config,
            mounted: RefCell::new(Vec::new()),
            form_errors: RefCell::new(Vec::new()),
            loading: Cell::new(false),
        }
    }

    /// Build a form and mount every declaration in order.
    ///
    /// # Errors
    ///
    /// Fails on the first declaration with an invalid validation spec.
    pub fn from_schema(
        config: Rc<FormConfig>,
        schema: Vec<FieldDeclaration>,
        values: ValueMap,
    ) -> Result<Self> {
        let form = Self::with_values(config, values);
        for decl in schema {
            form.add_field(decl)?;
        }
        debug!(fields = form.aggregate.fields().len(), "built form from schema");
        Ok(form)
    }

    pub fn config(&self) -> &Rc<FormConfig> {
        &self.config
    }

    pub fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }

    // =========================================================================
    // FIELDS
    // =========================================================================

    /// Mount a declaration and register the resulting field.
    ///
    /// # Errors
    ///
    /// Fails when the declaration's validation spec is invalid.
    pub fn add_field(&self, decl: FieldDeclaration) -> Result<Field> {
        let field = Field::new(decl, Rc::clone(&self.config))?;
        self.register(&field)?;
        Ok(field)
    }

    /// Register a field mounted elsewhere.
    ///
    /// # Errors
    ///
    /// See [`Aggregate::register`].
    pub fn register(&self, field: &Field) -> Result<()> {
        self.aggregate.register(field)?;
        let mut mounted = self.mounted.borrow_mut();
        if !mounted.iter().any(|existing| existing.ptr_eq(field)) {
            mounted.push(field.clone());
        }
        Ok(())
    }

    /// Remove a field by name.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::NotRegistered`] for an unknown name.
    pub fn deregister(&self, name: &str) -> Result<Field> {
        let field = self.aggregate.deregister(name)?;
        self.mounted
            .borrow_mut()
            .retain(|existing| !existing.ptr_eq(&field));
        Ok(field)
    }

    pub fn field(&self, name: &str) -> Option<Field> {
        self.aggregate.field(name)
    }

    /// Registered fields in registration order.
    pub fn fields(&self) -> Vec<Field> {
        self.aggregate.fields()
    }

    // =========================================================================
    // VALUES
    // =========================================================================

    /// Copy of the form's value object.
    pub fn values(&self) -> ValueMap {
        self.aggregate.values()
    }

    pub fn set_values(&self, values: ValueMap) {
        self.aggregate.set_values(values);
    }

    pub fn set_field_value(&self, name: &str, value: Option<Value>) {
        self.aggregate.set_field_value(name, value);
    }

    /// Listen for value object changes.
    pub fn subscribe(&self, listener: impl Fn(&ValueMap) + 'static) -> ListenerId {
        self.aggregate.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.aggregate.unsubscribe(id)
    }

    // =========================================================================
    // VALIDATION & SUBMISSION
    // =========================================================================

    /// Resolve `true` when any registered field fails validation.
    pub async fn has_validation_errors(&self) -> bool {
        self.aggregate.has_validation_errors().await
    }

    /// Drive deferred registrations and validation runs to the next settle point.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::DuplicateRegistration`] when a deferred
    /// registration still conflicts.
    pub async fn settle(&self) -> Result<()> {
        let flushed = self.aggregate.settle();
        let excluded: Vec<_> = self
            .mounted
            .borrow()
            .iter()
            .filter(|field| field.name().is_none())
            .map(Field::settle)
            .collect();
        join_all(excluded).await;
        flushed.await
    }

    /// Validate everything and hand back the payload when it is valid.
    ///
    /// When validation fails, errors on every field become visible.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::DuplicateRegistration`] when a deferred
    /// registration still conflicts.
    pub async fn submit(&self) -> Result<SubmitOutcome> {
        self.aggregate.flush_deferred()?;
        if self.aggregate.has_validation_errors().await {
            self.show_errors();
            info!("submission suppressed by validation errors");
            return Ok(SubmitOutcome::Invalid);
        }
        debug!("form submitted");
        Ok(SubmitOutcome::Submitted(self.values()))
    }

    /// Submit, then pass the payload to `handler`.
    ///
    /// [`Form::is_loading`] is `true` while the handler runs.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::SubmitHandler`] when the handler fails.
    pub async fn submit_with<F, Fut>(&self, handler: F) -> Result<SubmitOutcome>
    where
        F: FnOnce(ValueMap) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let outcome = self.submit().await?;
        let SubmitOutcome::Submitted(values) = &outcome else {
            return Ok(outcome);
        };
        self.loading.set(true);
        let result = handler(values.clone()).await;
        self.loading.set(false);
        result.map_err(FormError::SubmitHandler)?;
        Ok(outcome)
    }

    /// Check if a submit handler is running.
    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    /// Replace explicit errors on every registered field.
    ///
    /// Fields missing from `errors` are cleared. Names with no field are ignored.
    pub fn set_input_errors(&self, mut errors: BTreeMap<String, Vec<String>>) {
        for field in self.fields() {
            let messages = field
                .name()
                .and_then(|name| errors.remove(name))
                .unwrap_or_default();
            field.set_explicit_errors(messages);
        }
        if !errors.is_empty() {
            debug!(unknown = ?errors.keys().collect::<Vec<_>>(), "input errors for unknown fields");
        }
    }

    pub fn set_form_errors(&self, errors: Vec<String>) {
        *self.form_errors.borrow_mut() = errors;
    }

    pub fn form_errors(&self) -> Vec<String> {
        self.form_errors.borrow().clone()
    }

    /// Make validation errors visible on every field.
    pub fn show_errors(&self) {
        self.aggregate.show_errors();
    }

    /// Every current error, visible or not, keyed by field name.
    pub fn errors(&self) -> ErrorReport {
        let mut fields = BTreeMap::new();
        for field in self.fields() {
            let Some(name) = field.name() else {
                continue;
            };
            let mut messages = field.explicit_errors();
            messages.extend(field.validation_messages());
            if !messages.is_empty() {
                fields.insert(name.to_string(), messages);
            }
        }
        ErrorReport {
            form: self.form_errors(),
            fields,
        }
    }

    /// Reset values and errors.
    pub fn reset(&self) {
        self.form_errors.borrow_mut().clear();
        self.aggregate.reset();
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("aggregate", &self.aggregate)
            .field("loading", &self.loading.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form() -> Form {
        Form::new(Rc::new(FormConfig::default()))
    }

    #[tokio::test]
    async fn test_submit_with_runs_handler() {
        let form = form();
        form.add_field(FieldDeclaration::new("text").named("name").with_value(json!("Ada")))
            .unwrap();
        let received = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&received);
        let outcome = form
            .submit_with(|values| async move {
                *sink.borrow_mut() = Some(values);
                Ok(())
            })
            .await
            .unwrap();
        assert!(outcome.is_submitted());
        assert_eq!(received.borrow().as_ref().unwrap()["name"], json!("Ada"));
        assert!(!form.is_loading());
    }

    #[tokio::test]
    async fn test_handler_failure_is_submit_error() {
        let form = form();
        let err = form
            .submit_with(|_| async { Err(anyhow::anyhow!("backend down")) })
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::SubmitHandler(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_input_errors_replace_and_clear() {
        let form = form();
        let email = form.add_field(FieldDeclaration::new("email").named("email")).unwrap();
        let mut errors = BTreeMap::new();
        errors.insert("email".to_string(), vec!["Already taken".to_string()]);
        errors.insert("ghost".to_string(), vec!["ignored".to_string()]);
        form.set_input_errors(errors);
        assert_eq!(email.visible_errors(), ["Already taken"]);
        form.set_input_errors(BTreeMap::new());
        assert!(email.explicit_errors().is_empty());
    }

    #[test]
    fn test_error_report_includes_hidden_errors() {
        let form = form();
        form.add_field(FieldDeclaration::new("text").named("city").with_validation("required"))
            .unwrap();
        form.set_form_errors(vec!["Try again later".to_string()]);
        let report = form.errors();
        assert_eq!(report.form, ["Try again later"]);
        assert_eq!(report.fields["city"].len(), 1);
        form.reset();
        assert!(form.form_errors().is_empty());
    }
}
