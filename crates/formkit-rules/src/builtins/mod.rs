//! Built-in rules.
//!
//! Each module holds a family of related predicates. All built-ins are
//! synchronous checks wrapped as immediately resolving futures; they never
//! fault and never mutate their input.

mod dependent;
mod files;
mod membership;
mod patterns;
mod presence;
mod size;

pub mod dates;

pub use dates::{parse_date, regex_for_format};

use crate::library::{Predicate, RuleLibrary};

/// Rule name that skips every rule when the value is empty.
pub const OPTIONAL_RULE: &str = "optional";

/// Rule name that makes every later rule stop reporting after a failure.
pub const BAIL_RULE: &str = "bail";

/// Register every built-in rule into a library.
pub fn register_all(library: &mut RuleLibrary) {
    let rules: &[(&str, fn(&crate::RuleContext, &[formkit_model::RuleArg]) -> bool)] = &[
        ("accepted", presence::accepted),
        ("after", dates::after),
        ("alpha", patterns::alpha),
        ("alphanumeric", patterns::alphanumeric),
        (BAIL_RULE, presence::always),
        ("before", dates::before),
        ("between", size::between),
        ("confirm", dependent::confirm),
        ("date", dates::date),
        ("email", patterns::email),
        ("endsWith", membership::ends_with),
        ("in", membership::is_in),
        ("matches", membership::matches),
        ("max", size::max),
        ("mime", files::mime),
        ("min", size::min),
        ("not", membership::not_in),
        ("number", size::number),
        (OPTIONAL_RULE, presence::always),
        ("required", presence::required),
        ("startsWith", membership::starts_with),
        ("url", patterns::url),
    ];
    for (name, check) in rules {
        library.insert(name, Predicate::from_fn(*check));
    }
}
