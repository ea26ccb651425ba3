//! Validation rules for formkit.
//!
//! This crate turns declarative rule specs into asynchronous checks:
//!
//! - **Library** ([`RuleLibrary`]): rule name to async predicate, with every
//!   built-in rule preloaded
//! - **Parser** ([`parse`]): pipe strings and list specs into [`ParsedRule`]s
//! - **Runner** ([`run`]): starts all predicates at once and gathers failures
//!   in declaration order
//! - **Messages** ([`LocaleRegistry`]): failing descriptors to user-facing text
//!
//! # Error Handling
//!
//! Only configuration problems are errors ([`RuleError`]). A rule that fails
//! is data: an [`ErrorDescriptor`](formkit_model::ErrorDescriptor).
//!
//! # Example
//!
//! ```ignore
//! use formkit_rules::{RuleLibrary, RuleSpec, parse, validate_value};
//!
//! let library = RuleLibrary::builtin();
//! let rules = parse(&RuleSpec::from("required|in:a,b"), &library)?;
//! let errors = validate_value(&rules, serde_json::json!("")).await;
//! assert_eq!(errors.len(), 2);
//! ```

pub mod builtins;
pub mod context;
pub mod error;
pub mod library;
pub mod messages;
pub mod parser;
pub mod runner;

pub use builtins::{BAIL_RULE, OPTIONAL_RULE};
pub use context::{Detached, DependencyReader, RuleContext};
pub use error::{Result, RuleError};
pub use library::{Predicate, RuleFuture, RuleLibrary, canonical_rule_name};
pub use messages::{
    DEFAULT_LOCALE, Locale, LocaleRegistry, Message, MessageArgs, MessageGenerator,
};
pub use parser::{ANONYMOUS_RULE, ParsedRule, RuleEntry, RuleSpec, parse};
pub use runner::{run, validate_value};
