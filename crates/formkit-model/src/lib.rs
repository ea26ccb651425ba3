//! Data model shared by the formkit crates.
//!
//! This crate holds the plain data the validation and synchronization layers
//! pass around:
//!
//! - **Values** (`value`): JSON field values, emptiness, shallow equality and
//!   number coercion
//! - **Classification** (`classification`): the closed input type table
//! - **Options** (`options`): normalization of option lists for box/select inputs
//! - **Descriptors** (`descriptor`): rule arguments and validation error descriptors
//! - **Visibility** (`visibility`): when validation errors are shown
//!
//! Nothing here owns state or runs async code.

pub mod classification;
pub mod descriptor;
pub mod options;
pub mod value;
pub mod visibility;

pub use classification::{Classification, TypeBinding, classify};
pub use descriptor::{ErrorDescriptor, Failure, RuleArg};
pub use options::{FieldOption, OptionsSpec, normalize_options};
pub use value::{
    Value, ValueMap, display_text, is_empty, is_falsy, js_number, shallow_equal, shallow_equal_opt,
};
pub use visibility::ErrorVisibility;
