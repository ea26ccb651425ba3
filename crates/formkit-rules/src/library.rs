//! Rule library: rule name → async predicate.

use std::collections::BTreeMap;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};

use formkit_model::RuleArg;

use crate::builtins;
use crate::context::RuleContext;
use crate::error::{Result, RuleError};

/// Future returned by every predicate.
///
/// `Ok(true)` is valid, `Ok(false)` is a validation failure, and `Err` is a
/// predicate fault (recorded, never propagated).
pub type RuleFuture = LocalBoxFuture<'static, anyhow::Result<bool>>;

type PredicateFn = dyn Fn(RuleContext, Vec<RuleArg>) -> RuleFuture;

/// An async validation predicate.
#[derive(Clone)]
pub struct Predicate(Rc<PredicateFn>);

impl Predicate {
    /// Wrap an async predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(RuleContext, Vec<RuleArg>) -> RuleFuture + 'static,
    {
        Self(Rc::new(f))
    }

    /// Wrap a synchronous check as an immediately resolving predicate.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&RuleContext, &[RuleArg]) -> bool + 'static,
    {
        Self::new(move |ctx, args| future::ready(Ok(f(&ctx, &args))).boxed_local())
    }

    /// Start the predicate.
    pub fn call(&self, ctx: RuleContext, args: Vec<RuleArg>) -> RuleFuture {
        (self.0)(ctx, args)
    }

    /// Check whether two handles point at the same predicate.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// Normalize a rule name to its canonical camelCase key.
///
/// `starts_with`, `starts-with` and `startsWith` all resolve to `startsWith`.
pub fn canonical_rule_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.trim().chars() {
        if ch == '_' || ch == '-' {
            upper_next = !out.is_empty();
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Open mapping from rule name to predicate.
///
/// Keys are stored in canonical form. Hosts may add or override entries;
/// the parser only ever consults the mapping.
#[derive(Debug, Clone)]
pub struct RuleLibrary {
    rules: BTreeMap<String, Predicate>,
}

impl Default for RuleLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Create a library holding every built-in rule.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        builtins::register_all(&mut library);
        library
    }

    /// Insert or replace a rule.
    pub fn insert(&mut self, name: &str, predicate: Predicate) {
        self.rules.insert(canonical_rule_name(name), predicate);
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with_rule(mut self, name: &str, predicate: Predicate) -> Self {
        self.insert(name, predicate);
        self
    }

    /// Merge another library into this one; entries in `other` win.
    pub fn extend(&mut self, other: &RuleLibrary) {
        for (name, predicate) in &other.rules {
            self.rules.insert(name.clone(), predicate.clone());
        }
    }

    /// Get a rule by (any spelling of) its name.
    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.rules.get(&canonical_rule_name(name))
    }

    /// Get a rule, failing with [`RuleError::UnknownRule`] when absent.
    pub fn require(&self, name: &str) -> Result<&Predicate> {
        self.get(name).ok_or_else(|| RuleError::unknown(name))
    }

    /// Check if a rule exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Remove a rule.
    pub fn remove(&mut self, name: &str) -> Option<Predicate> {
        self.rules.remove(&canonical_rule_name(name))
    }

    /// Number of rules in the library.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the library is empty.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over rule names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_rule_name() {
        assert_eq!(canonical_rule_name("starts_with"), "startsWith");
        assert_eq!(canonical_rule_name("starts-with"), "startsWith");
        assert_eq!(canonical_rule_name("startsWith"), "startsWith");
        assert_eq!(canonical_rule_name("required"), "required");
        assert_eq!(canonical_rule_name("_private"), "private");
    }

    #[test]
    fn test_lookup_any_spelling() {
        let library = RuleLibrary::builtin();
        assert!(library.contains("ends_with"));
        assert!(library.contains("ends-with"));
        assert!(library.contains("endsWith"));
        assert!(!library.contains("nope"));
    }

    #[test]
    fn test_override_entry() {
        let mut library = RuleLibrary::builtin();
        let before = library.len();
        let always = Predicate::from_fn(|_, _| true);
        library.insert("required", always.clone());
        assert_eq!(library.len(), before);
        assert!(library.get("required").unwrap().ptr_eq(&always));
    }

    #[test]
    fn test_require_unknown() {
        let library = RuleLibrary::new();
        let err = library.require("required").unwrap_err();
        assert_eq!(
            err,
            RuleError::UnknownRule {
                token: "required".to_string()
            }
        );
    }
}
