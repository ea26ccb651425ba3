//! Rule specification parsing.
//!
//! A rule spec arrives either as a pipe-delimited string
//! (`"required|between:3,10"`) or as a list mixing strings, `[name, ...args]`
//! tuples and anonymous callables. Parsing resolves every name against a
//! [`RuleLibrary`] up front and fails on the first unknown token.

use serde::Deserialize;
use serde_json::Value;

use formkit_model::RuleArg;

use crate::builtins::BAIL_RULE;
use crate::error::{Result, RuleError};
use crate::library::{Predicate, RuleLibrary, canonical_rule_name};

/// Name given to callables declared without one.
pub const ANONYMOUS_RULE: &str = "custom";

/// Modifier prefix that makes a single rule bail (`^required`).
const BAIL_MODIFIER: char = '^';

/// A declared rule specification.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawRuleSpec")]
pub enum RuleSpec {
    /// Pipe-delimited string.
    Text(String),
    /// Ordered list of entries.
    List(Vec<RuleEntry>),
}

/// One entry of a list-form rule spec.
#[derive(Debug, Clone)]
pub enum RuleEntry {
    /// A single `name:arg,arg` rule.
    Text(String),
    /// A rule name with native arguments.
    Tuple(String, Vec<RuleArg>),
    /// An inline predicate.
    Callable {
        name: Option<String>,
        predicate: Predicate,
    },
}

impl RuleSpec {
    /// Spec with no rules.
    pub fn none() -> Self {
        Self::List(Vec::new())
    }

    /// Check if the spec declares nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::List(entries) => entries.is_empty(),
        }
    }
}

impl Default for RuleSpec {
    fn default() -> Self {
        Self::none()
    }
}

impl From<&str> for RuleSpec {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RuleSpec {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<RuleEntry>> for RuleSpec {
    fn from(value: Vec<RuleEntry>) -> Self {
        Self::List(value)
    }
}

impl RuleEntry {
    /// Tuple entry from a name and native arguments.
    pub fn tuple<I, A>(name: &str, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<RuleArg>,
    {
        Self::Tuple(name.to_string(), args.into_iter().map(Into::into).collect())
    }

    /// Anonymous callable entry.
    pub fn callable(predicate: Predicate) -> Self {
        Self::Callable {
            name: None,
            predicate,
        }
    }

    /// Named callable entry.
    pub fn named(name: &str, predicate: Predicate) -> Self {
        Self::Callable {
            name: Some(name.to_string()),
            predicate,
        }
    }
}

impl From<&str> for RuleEntry {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Wire shape of a rule spec (strings and `[name, ...args]` arrays).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRuleSpec {
    Text(String),
    List(Vec<Value>),
}

impl TryFrom<RawRuleSpec> for RuleSpec {
    type Error = RuleError;

    fn try_from(raw: RawRuleSpec) -> Result<Self> {
        match raw {
            RawRuleSpec::Text(text) => Ok(Self::Text(text)),
            RawRuleSpec::List(items) => items
                .into_iter()
                .map(entry_from_value)
                .collect::<Result<Vec<_>>>()
                .map(Self::List),
        }
    }
}

fn entry_from_value(item: Value) -> Result<RuleEntry> {
    match item {
        Value::String(text) => Ok(RuleEntry::Text(text)),
        Value::Array(mut parts) => {
            if parts.is_empty() {
                return Err(RuleError::malformed("empty rule tuple"));
            }
            let Value::String(name) = parts.remove(0) else {
                return Err(RuleError::malformed("rule tuple must start with a name"));
            };
            Ok(RuleEntry::Tuple(
                name,
                parts.into_iter().map(RuleArg::Value).collect(),
            ))
        }
        other => Err(RuleError::malformed(format!(
            "unsupported rule entry {other}"
        ))),
    }
}

/// A rule bound to its predicate and arguments.
#[derive(Debug, Clone)]
pub struct ParsedRule {
    /// Canonical rule name.
    pub name: String,
    pub predicate: Predicate,
    pub args: Vec<RuleArg>,
    /// A failure of this rule suppresses every later failure.
    pub bail: bool,
}

impl ParsedRule {
    /// Check if this is the `optional` pseudo-rule.
    pub fn is_optional(&self) -> bool {
        self.name == crate::builtins::OPTIONAL_RULE
    }
}

/// Split a `name:arg,arg` token into its name, arguments and bail modifier.
fn split_token(token: &str) -> (bool, String, Vec<RuleArg>) {
    let token = token.trim();
    let (bail, token) = match token.strip_prefix(BAIL_MODIFIER) {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    match token.split_once(':') {
        Some((name, rest)) => (
            bail,
            name.trim().to_string(),
            rest.split(',').map(RuleArg::from).collect(),
        ),
        None => (bail, token.to_string(), Vec::new()),
    }
}

/// Collects parsed rules and tracks the `bail` pseudo-rule.
struct Builder<'a> {
    library: &'a RuleLibrary,
    rules: Vec<ParsedRule>,
    bail_rest: bool,
}

impl<'a> Builder<'a> {
    fn new(library: &'a RuleLibrary) -> Self {
        Self {
            library,
            rules: Vec::new(),
            bail_rest: false,
        }
    }

    fn push_named(
        &mut self,
        token: &str,
        bail: bool,
        name: &str,
        args: Vec<RuleArg>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(RuleError::malformed(format!("rule '{token}' has no name")));
        }
        let predicate = self
            .library
            .get(name)
            .ok_or_else(|| RuleError::unknown(name))?
            .clone();
        let name = canonical_rule_name(name);
        if name == BAIL_RULE {
            self.bail_rest = true;
            return Ok(());
        }
        self.rules.push(ParsedRule {
            name,
            predicate,
            args,
            bail: bail || self.bail_rest,
        });
        Ok(())
    }

    fn push_text(&mut self, token: &str) -> Result<()> {
        let (bail, name, args) = split_token(token);
        self.push_named(token, bail, &name, args)
    }

    fn push_entry(&mut self, entry: &RuleEntry) -> Result<()> {
        match entry {
            RuleEntry::Text(token) => self.push_text(token),
            RuleEntry::Tuple(raw, args) => {
                let (bail, name) = match raw.trim().strip_prefix(BAIL_MODIFIER) {
                    Some(rest) => (true, rest.trim()),
                    None => (false, raw.trim()),
                };
                self.push_named(raw, bail, name, args.clone())
            }
            RuleEntry::Callable { name, predicate } => {
                self.rules.push(ParsedRule {
                    name: name.clone().unwrap_or_else(|| ANONYMOUS_RULE.to_string()),
                    predicate: predicate.clone(),
                    args: Vec::new(),
                    bail: self.bail_rest,
                });
                Ok(())
            }
        }
    }
}

/// Parse a rule spec into bound rules, in declaration order.
///
/// # Errors
///
/// Returns [`RuleError::UnknownRule`] for the first name the library does not
/// know and [`RuleError::MalformedRule`] for nameless tokens. Nothing is
/// returned on error; a partially valid spec never yields a partial rule set.
pub fn parse(spec: &RuleSpec, library: &RuleLibrary) -> Result<Vec<ParsedRule>> {
    let mut builder = Builder::new(library);
    match spec {
        RuleSpec::Text(text) => {
            for token in text.split('|').filter(|token| !token.trim().is_empty()) {
                builder.push_text(token)?;
            }
        }
        RuleSpec::List(entries) => {
            for entry in entries {
                builder.push_entry(entry)?;
            }
        }
    }
    tracing::trace!(rules = builder.rules.len(), "parsed rule spec");
    Ok(builder.rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_token() {
        let (bail, name, args) = split_token("between:3,10");
        assert!(!bail);
        assert_eq!(name, "between");
        assert_eq!(args, vec![RuleArg::from("3"), RuleArg::from("10")]);

        let (bail, name, args) = split_token("^required");
        assert!(bail);
        assert_eq!(name, "required");
        assert!(args.is_empty());
    }

    #[test]
    fn test_split_token_keeps_later_colons() {
        let (_, name, args) = split_token("matches:a:b,c");
        assert_eq!(name, "matches");
        assert_eq!(args, vec![RuleArg::from("a:b"), RuleArg::from("c")]);
    }

    #[test]
    fn test_deserialize_list_form() {
        let spec: RuleSpec = serde_json::from_str(r#"["required", ["min", 3, "length"]]"#).unwrap();
        let RuleSpec::List(entries) = spec else {
            panic!("expected list form");
        };
        assert!(matches!(&entries[0], RuleEntry::Text(t) if t == "required"));
        let RuleEntry::Tuple(name, args) = &entries[1] else {
            panic!("expected tuple");
        };
        assert_eq!(name, "min");
        assert_eq!(args[0], RuleArg::Value(serde_json::json!(3)));
    }

    #[test]
    fn test_deserialize_rejects_bad_entry() {
        assert!(serde_json::from_str::<RuleSpec>("[42]").is_err());
        assert!(serde_json::from_str::<RuleSpec>("[[]]").is_err());
    }
}
