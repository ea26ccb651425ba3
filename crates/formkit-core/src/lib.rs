//! Form construction and value synchronization for formkit.
//!
//! This crate owns the stateful side of a form:
//!
//! - **Fields** ([`Field`]): value cell, parsed rules, validation and
//!   explicit errors, visibility policy, context snapshot
//! - **Aggregates** ([`Aggregate`]): the flat value object, the field
//!   registry with its dependency graph, and value synchronization
//! - **Forms** ([`Form`]): submission gated on validation, form-level errors
//! - **Groups** ([`Group`]): repeatable items, each its own aggregate
//! - **Uploads** ([`FileUpload`], [`Uploader`]): file collections with
//!   per-file progress
//! - **Configuration** ([`FormConfig`]): rules, type bindings, locales and
//!   plugins, shared by every component of a form
//!
//! Everything here is single-threaded (`Rc`/`RefCell`). Validation runs are
//! futures; without a [`TaskSpawner`] they progress when the host awaits
//! [`Form::settle`], [`Form::submit`] or a field's [`Field::settle`].
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use formkit_core::{FieldDeclaration, Form, FormConfig, SubmitOutcome};
//!
//! let form = Form::new(Rc::new(FormConfig::default()));
//! form.add_field(FieldDeclaration::new("email").named("email").with_validation("required|email"))?;
//! assert_eq!(form.submit().await?, SubmitOutcome::Invalid);
//! ```

pub mod aggregate;
pub mod cell;
pub mod config;
pub mod declaration;
pub mod error;
pub mod field;
pub mod form;
pub mod group;
pub mod kind;
pub mod registry;
pub mod upload;

pub use aggregate::Aggregate;
pub use cell::{ListenerId, ValueCell};
pub use config::{
    DEFAULT_ID_PREFIX, Extension, FormConfig, FormSettings, MergeStrategy, Plugin, TaskSpawner,
    TokioLocalSpawner, merge_values,
};
pub use declaration::{FieldDeclaration, NameSpec};
pub use error::{FormError, Result};
pub use field::{ErrorsView, Field, FieldSnapshot, ValidationRun};
pub use form::{ErrorReport, Form, SubmitOutcome};
pub use group::Group;
pub use kind::{FieldKind, kind_for};
pub use registry::Registry;
pub use upload::{
    FakeUploader, FileState, FileUpload, Progress, UploadDescriptor, UploadEntry, UploadError,
    UploadFile, Uploader,
};
