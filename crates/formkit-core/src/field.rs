//! Field contexts.
//!
//! A [`Field`] is a cheap, clonable handle to one mounted field: its value
//! cell, parsed rules, validation and explicit errors, and the visibility
//! policy that decides which errors the rendering layer sees.
//!
//! A field never writes its aggregate's value object directly. Edits go up
//! through the aggregate (which owns the value object), and the aggregate
//! pushes external assignments down with [`Field::assign`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::task::Context;

use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};
use serde::Serialize;
use tracing::trace;

use formkit_model::{
    Classification, ErrorDescriptor, ErrorVisibility, FieldOption, TypeBinding, Value, ValueMap,
    normalize_options, shallow_equal,
};
use formkit_rules::{DependencyReader, Detached, ParsedRule, RuleContext, RuleSpec, parse};

use crate::aggregate::AggregateInner;
use crate::cell::{ListenerId, ValueCell};
use crate::config::FormConfig;
use crate::declaration::{FieldDeclaration, NameSpec};
use crate::error::{FormError, Result};
use crate::group::Group;
use crate::kind::{FieldKind, kind_for, resolve_attributes};
use crate::upload::{FileUpload, UploadFile};

/// Handle to a field's latest validation run.
///
/// Resolves once the run's result has been applied (or discarded as stale).
pub type ValidationRun = Shared<LocalBoxFuture<'static, ()>>;

pub(crate) struct FieldInner {
    id: String,
    name: Option<String>,
    input_type: String,
    binding: TypeBinding,
    kind: &'static dyn FieldKind,
    label: Option<String>,
    validation_name: Option<String>,
    attributes: ValueMap,
    options: Option<Vec<FieldOption>>,
    keep_model_data: bool,
    /// Declared value, or an edit made while detached.
    explicit_value: Cell<bool>,
    empty_value: Value,
    config: Rc<FormConfig>,

    value: ValueCell,
    rules: RefCell<Vec<ParsedRule>>,
    validation_errors: RefCell<Vec<ErrorDescriptor>>,
    explicit_errors: RefCell<Vec<String>>,
    /// Explicit errors written by the latest upload.
    upload_errors: RefCell<Vec<String>>,
    error_behavior: Cell<ErrorVisibility>,
    show_validation: Cell<bool>,

    /// Token of the most recently started validation run.
    sequence: Cell<u64>,
    pending: RefCell<Option<ValidationRun>>,
    /// Bumped on every change visible in the context snapshot.
    revision: Cell<u64>,
    snapshot: RefCell<Option<(u64, Rc<FieldSnapshot>)>>,

    aggregate: RefCell<Weak<AggregateInner>>,
    group: Option<Group>,
    upload: RefCell<Option<FileUpload>>,
}

/// A mounted field.
#[derive(Clone)]
pub struct Field {
    pub(crate) inner: Rc<FieldInner>,
}

impl Field {
    /// Mount a field from its declaration.
    ///
    /// # Errors
    ///
    /// Fails when the validation spec names an unknown rule or is malformed.
    pub fn new(decl: FieldDeclaration, config: Rc<FormConfig>) -> Result<Self> {
        let binding = config.classify(&decl.input_type);
        let kind = kind_for(binding.classification);
        let sequence = config.next_id();
        let id = decl
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{sequence}", config.id_prefix));
        let name = match &decl.name {
            NameSpec::Auto => Some(format!("{}_{sequence}", decl.input_type)),
            NameSpec::Excluded => None,
            NameSpec::Named(name) => Some(name.clone()),
        };
        let rules = if kind.validates() {
            parse(&decl.validation, &config.rules)?
        } else {
            Vec::new()
        };
        let empty_value = kind.empty_value(&decl);
        let initial = decl.value.clone().unwrap_or_else(|| empty_value.clone());
        let upload = match binding.classification {
            Classification::File => FileUpload::from_value(&initial),
            _ => None,
        };
        let is_group = binding.classification == Classification::Group;
        let minimum = decl.minimum.unwrap_or(1);

        let inner = Rc::new_cyclic(|weak: &Weak<FieldInner>| FieldInner {
            attributes: resolve_attributes(kind, &decl),
            options: decl
                .options
                .as_ref()
                .map(|spec| normalize_options(spec, &id)),
            group: is_group.then(|| {
                Group::new(
                    weak.clone(),
                    Rc::clone(&config),
                    decl.children.clone(),
                    minimum,
                )
            }),
            error_behavior: Cell::new(decl.error_behavior.unwrap_or(config.error_behavior)),
            explicit_value: Cell::new(decl.value.is_some()),
            id,
            name,
            input_type: decl.input_type,
            binding,
            kind,
            label: decl.label,
            validation_name: decl.validation_name,
            keep_model_data: decl.keep_model_data,
            empty_value,
            config,
            value: ValueCell::new(initial.clone()),
            rules: RefCell::new(rules),
            validation_errors: RefCell::new(Vec::new()),
            explicit_errors: RefCell::new(decl.errors),
            upload_errors: RefCell::new(Vec::new()),
            show_validation: Cell::new(false),
            sequence: Cell::new(0),
            pending: RefCell::new(None),
            revision: Cell::new(0),
            snapshot: RefCell::new(None),
            aggregate: RefCell::new(Weak::new()),
            upload: RefCell::new(upload),
        });
        let field = Self { inner };
        if let Some(group) = field.group() {
            group.initialize(&initial)?;
            field.inner.value.replace_quiet(group.snapshot());
        }
        trace!(field = field.log_name(), kind = %field.classification(), "mounted field");
        Ok(field)
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Name in the aggregate, `None` when the field is excluded.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn input_type(&self) -> &str {
        &self.inner.input_type
    }

    pub fn binding(&self) -> &TypeBinding {
        &self.inner.binding
    }

    pub fn classification(&self) -> Classification {
        self.inner.binding.classification
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Label handed to message generation: validation name, label, then name.
    pub fn validation_label(&self) -> String {
        self.inner
            .validation_name
            .as_deref()
            .or(self.inner.label.as_deref())
            .or(self.inner.name.as_deref())
            .unwrap_or_default()
            .to_string()
    }

    pub fn attributes(&self) -> &ValueMap {
        &self.inner.attributes
    }

    pub fn options(&self) -> Option<&[FieldOption]> {
        self.inner.options.as_deref()
    }

    /// Check if the field's value survives deregistration.
    pub fn keeps_model_data(&self) -> bool {
        self.inner.keep_model_data
    }

    /// Check if the field carries its own value: declared, or edited while
    /// it was not registered. Such a value wins over the aggregate's at
    /// registration.
    pub fn has_explicit_value(&self) -> bool {
        self.inner.explicit_value.get()
    }

    /// The classification's empty value for this field.
    pub fn empty_value(&self) -> &Value {
        &self.inner.empty_value
    }

    pub fn group(&self) -> Option<&Group> {
        self.inner.group.as_ref()
    }

    /// Check if two handles point at the same field.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn log_name(&self) -> &str {
        self.inner.name.as_deref().unwrap_or(&self.inner.id)
    }

    // =========================================================================
    // VALUE
    // =========================================================================

    pub fn value(&self) -> Value {
        self.inner.value.get()
    }

    /// Listen for local value changes.
    pub fn watch(&self, listener: impl Fn(&Value) + 'static) -> ListenerId {
        self.inner.value.subscribe(listener)
    }

    pub fn unwatch(&self, id: ListenerId) -> bool {
        self.inner.value.unsubscribe(id)
    }

    /// Apply an edit coming from the rendering layer.
    ///
    /// The value is stored locally, sent up to the aggregate (which notifies
    /// dependents) and re-validated.
    pub fn edit(&self, value: Value) {
        if !self.is_attached() {
            self.inner.explicit_value.set(true);
        }
        if !self.inner.value.set(value.clone()) {
            return;
        }
        self.touch();
        let value = self.follow(value);
        self.propagate(value);
        self.validate();
    }

    /// Apply a value pushed down by the aggregate.
    ///
    /// Nothing is sent back up unless the field normalized the value.
    pub fn assign(&self, value: Value) {
        if !self.inner.value.set(value.clone()) {
            return;
        }
        self.touch();
        let effective = self.follow(value.clone());
        if !shallow_equal(&effective, &value) {
            self.propagate(effective);
        }
        self.validate();
    }

    /// Set the value chosen at registration. Returns the value actually held.
    pub(crate) fn assign_initial(&self, value: Value) -> Value {
        if self.inner.value.set(value.clone()) {
            self.touch();
        }
        self.follow(value)
    }

    /// Store a value produced by the field itself (group items, uploads).
    pub(crate) fn commit(&self, value: Value) {
        if !self.inner.value.set(value.clone()) {
            return;
        }
        self.touch();
        self.propagate(value);
        self.validate();
    }

    /// Bring group items and upload state in line with a new value.
    fn follow(&self, value: Value) -> Value {
        if let Some(group) = self.group() {
            group.sync_down(&value);
            let synced = group.snapshot();
            self.inner.value.replace_quiet(synced.clone());
            return synced;
        }
        if self.classification() == Classification::File {
            let current = self.inner.upload.borrow().as_ref().map(FileUpload::to_value);
            if current.as_ref() != Some(&value) {
                *self.inner.upload.borrow_mut() = FileUpload::from_value(&value);
            }
        }
        value
    }

    fn propagate(&self, value: Value) {
        let Some(name) = self.name() else {
            return;
        };
        let aggregate = self.inner.aggregate.borrow().upgrade();
        if let Some(aggregate) = aggregate {
            aggregate.field_edited(name, value);
        }
    }

    pub(crate) fn attach(&self, aggregate: &Rc<AggregateInner>) {
        *self.inner.aggregate.borrow_mut() = Rc::downgrade(aggregate);
    }

    pub(crate) fn detach(&self) {
        *self.inner.aggregate.borrow_mut() = Weak::new();
    }

    /// Check if the field is registered in a live aggregate.
    pub fn is_attached(&self) -> bool {
        self.inner.aggregate.borrow().strong_count() > 0
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Replace the field's rules and re-validate.
    ///
    /// # Errors
    ///
    /// Fails when the spec names an unknown rule; the old rules stay active.
    pub fn set_validation(&self, spec: &RuleSpec) -> Result<()> {
        let rules = if self.inner.kind.validates() {
            parse(spec, &self.inner.config.rules)?
        } else {
            Vec::new()
        };
        *self.inner.rules.borrow_mut() = rules;
        self.validate();
        Ok(())
    }

    /// Start a validation run against the current value.
    ///
    /// Rules that resolve immediately are applied before this returns. Runs
    /// that suspend finish when [`Field::current_run`] or [`Field::settle`]
    /// is awaited, or on the configured spawner. A run's result is applied
    /// only if no newer run was started in the meantime.
    pub fn validate(&self) {
        let token = self.inner.sequence.get() + 1;
        self.inner.sequence.set(token);
        let rules = self.inner.rules.borrow().clone();
        let context = self.rule_context();
        trace!(field = self.log_name(), token, rules = rules.len(), "validation run started");

        let run = formkit_rules::run(&rules, &context);
        let weak = Rc::downgrade(&self.inner);
        let shared = async move {
            let errors = run.await;
            if let Some(inner) = weak.upgrade() {
                Field { inner }.apply(token, errors);
            }
        }
        .boxed_local()
        .shared();

        *self.inner.pending.borrow_mut() = Some(shared.clone());
        self.touch();

        let mut probe = shared.clone();
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        let _ = probe.poll_unpin(&mut cx);

        if shared.peek().is_none()
            && let Some(spawner) = &self.inner.config.spawner
        {
            spawner.spawn(shared.boxed_local());
        }
    }

    fn apply(&self, token: u64, errors: Vec<ErrorDescriptor>) {
        if self.inner.sequence.get() != token {
            trace!(field = self.log_name(), token, "discarding stale validation result");
            return;
        }
        self.inner.pending.borrow_mut().take();
        *self.inner.validation_errors.borrow_mut() = errors;
        self.touch();
        trace!(field = self.log_name(), token, "validation result applied");
    }

    fn rule_context(&self) -> RuleContext {
        let name = self.inner.name.clone().unwrap_or_default();
        let aggregate = self.inner.aggregate.borrow().clone();
        let reader: Rc<dyn DependencyReader> = if aggregate.strong_count() > 0 {
            Rc::new(FieldReader {
                reader: name.clone(),
                aggregate,
            })
        } else {
            Rc::new(Detached)
        };
        RuleContext::new(self.value(), name, self.validation_label(), reader)
    }

    /// The latest run, if it has not finished yet.
    pub fn current_run(&self) -> Option<ValidationRun> {
        self.inner.pending.borrow().clone()
    }

    pub fn is_validating(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }

    /// Wait until no validation run is pending on this field or its group items.
    pub fn settle(&self) -> LocalBoxFuture<'static, ()> {
        let field = self.clone();
        async move {
            while let Some(run) = field.current_run() {
                run.await;
            }
            if let Some(group) = field.group() {
                group.settle().await;
            }
        }
        .boxed_local()
    }

    /// Run validation unless a run is pending, then report failure.
    ///
    /// Group fields also wait for every item.
    pub(crate) fn validation_barrier(&self) -> LocalBoxFuture<'static, bool> {
        if !self.is_validating() {
            self.validate();
        }
        let items = self.group().map(Group::validation_barrier);
        let field = self.clone();
        async move {
            while let Some(run) = field.current_run() {
                run.await;
            }
            let items_failing = match items {
                Some(barrier) => barrier.await,
                None => false,
            };
            field.has_validation_errors() || items_failing
        }
        .boxed_local()
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    pub fn validation_errors(&self) -> Vec<ErrorDescriptor> {
        self.inner.validation_errors.borrow().clone()
    }

    /// Validation errors rendered through the configured message generator.
    pub fn validation_messages(&self) -> Vec<String> {
        self.inner
            .validation_errors
            .borrow()
            .iter()
            .map(|descriptor| self.inner.config.describe(descriptor))
            .collect()
    }

    pub fn explicit_errors(&self) -> Vec<String> {
        self.inner.explicit_errors.borrow().clone()
    }

    /// Replace the host-injected errors.
    pub fn set_explicit_errors(&self, errors: Vec<String>) {
        let changed = *self.inner.explicit_errors.borrow() != errors;
        if changed {
            *self.inner.explicit_errors.borrow_mut() = errors;
            self.touch();
        }
    }

    pub fn has_validation_errors(&self) -> bool {
        !self.inner.validation_errors.borrow().is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.inner.explicit_errors.borrow().is_empty() || self.has_validation_errors()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    pub fn error_behavior(&self) -> ErrorVisibility {
        self.inner.error_behavior.get()
    }

    pub fn set_error_behavior(&self, behavior: ErrorVisibility) {
        if self.inner.error_behavior.replace(behavior) != behavior {
            self.touch();
        }
    }

    /// Check if validation errors are currently visible.
    pub fn shows_validation(&self) -> bool {
        self.inner.error_behavior.get() == ErrorVisibility::Live || self.inner.show_validation.get()
    }

    /// The field lost focus: `blur` policy errors become visible.
    pub fn blur(&self) {
        self.reveal();
    }

    /// Force validation errors visible regardless of policy.
    pub fn show_errors(&self) {
        self.reveal();
        if let Some(group) = self.group() {
            group.show_errors();
        }
    }

    fn reveal(&self) {
        if !self.inner.show_validation.replace(true) {
            self.touch();
        }
    }

    /// Hide validation errors again and drop explicit errors.
    pub(crate) fn reset_errors(&self) {
        if self.inner.show_validation.replace(false) {
            self.touch();
        }
        self.inner.upload_errors.borrow_mut().clear();
        self.set_explicit_errors(Vec::new());
    }

    /// Errors the rendering layer should display.
    ///
    /// Explicit errors always; validation errors once visible.
    pub fn visible_errors(&self) -> Vec<String> {
        let mut errors = self.explicit_errors();
        if self.shows_validation() {
            errors.extend(self.validation_messages());
        }
        errors
    }

    // =========================================================================
    // CONTEXT
    // =========================================================================

    fn touch(&self) {
        self.inner.revision.set(self.inner.revision.get() + 1);
    }

    /// Read-only snapshot for the rendering layer.
    ///
    /// The same `Rc` is returned until something in the snapshot changes.
    pub fn context(&self) -> Rc<FieldSnapshot> {
        let revision = self.inner.revision.get();
        if let Some((cached, snapshot)) = &*self.inner.snapshot.borrow()
            && *cached == revision
        {
            return Rc::clone(snapshot);
        }
        let snapshot = Rc::new(self.build_snapshot());
        *self.inner.snapshot.borrow_mut() = Some((revision, Rc::clone(&snapshot)));
        snapshot
    }

    fn build_snapshot(&self) -> FieldSnapshot {
        let explicit = self.explicit_errors();
        let validation = self.validation_messages();
        let visible = self.visible_errors();
        FieldSnapshot {
            id: self.inner.id.clone(),
            name: self.inner.name.clone(),
            input_type: self.inner.input_type.clone(),
            classification: self.classification(),
            renderer: self.inner.binding.renderer.to_string(),
            label: self.inner.label.clone(),
            value: self.value(),
            attributes: self.inner.attributes.clone(),
            has_errors: !explicit.is_empty() || !validation.is_empty(),
            errors: ErrorsView {
                explicit,
                validation,
                visible,
            },
            options: self.inner.options.clone(),
            validating: self.is_validating(),
        }
    }

    // =========================================================================
    // UPLOADS
    // =========================================================================

    /// The file collection handle of a `file` field.
    pub fn upload(&self) -> Option<FileUpload> {
        self.inner.upload.borrow().clone()
    }

    /// Select files on a `file` field.
    pub fn attach_files(&self, files: impl IntoIterator<Item = UploadFile>) {
        let upload = FileUpload::new(files);
        let value = upload.to_value();
        *self.inner.upload.borrow_mut() = Some(upload);
        self.edit(value);
    }

    /// Upload every pending file with the configured uploader.
    ///
    /// Failures become explicit errors on the field, replacing those of the
    /// previous upload; the returned list holds one error per rejected file.
    pub async fn upload_files(&self) -> Vec<FormError> {
        let Some(upload) = self.upload() else {
            return Vec::new();
        };
        let config = Rc::clone(&self.inner.config);
        let failures = upload
            .upload(Rc::clone(&config.uploader), config.upload_options.clone())
            .await;
        self.commit(upload.to_value());
        let messages: Vec<String> = failures.iter().map(ToString::to_string).collect();
        let previous = self.inner.upload_errors.replace(messages.clone());
        let mut errors = self.explicit_errors();
        errors.retain(|error| !previous.contains(error));
        errors.extend(messages);
        self.set_explicit_errors(errors);
        failures
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("type", &self.inner.input_type)
            .field("classification", &self.classification())
            .finish_non_exhaustive()
    }
}

/// Dependency reader handed to a field's rules.
struct FieldReader {
    reader: String,
    aggregate: Weak<AggregateInner>,
}

impl DependencyReader for FieldReader {
    fn read(&self, target: &str) -> Option<Value> {
        self.aggregate
            .upgrade()?
            .read_dependency(&self.reader, target)
    }

    fn values(&self) -> ValueMap {
        self.aggregate
            .upgrade()
            .map(|aggregate| aggregate.snapshot())
            .unwrap_or_default()
    }
}

/// Errors as the rendering layer sees them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorsView {
    pub explicit: Vec<String>,
    pub validation: Vec<String>,
    pub visible: Vec<String>,
}

/// Read-only field snapshot handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSnapshot {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub input_type: String,
    pub classification: Classification,
    pub renderer: String,
    pub label: Option<String>,
    pub value: Value,
    pub attributes: ValueMap,
    pub errors: ErrorsView,
    pub has_errors: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    pub validating: bool,
}
