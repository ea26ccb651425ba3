//! Message generation.
//!
//! The engine never builds strings itself: a failing rule's descriptor is
//! handed to a [`MessageGenerator`]. [`LocaleRegistry`] is the stock
//! generator, a per-locale table of rule name to message function with a
//! `default` entry as fallback.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use formkit_model::{ErrorDescriptor, Failure, RuleArg, Value, display_text};

/// Key of the fallback entry inside a locale, and of the fallback locale.
pub const DEFAULT_KEY: &str = "default";

/// Locale used when nothing else is configured.
pub const DEFAULT_LOCALE: &str = "en";

/// Input to a message function.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageArgs {
    /// Field label as shown to the user.
    pub name: String,
    pub value: Value,
    pub args: Vec<RuleArg>,
}

impl MessageArgs {
    /// Arguments for a failing descriptor.
    pub fn from_descriptor(descriptor: &ErrorDescriptor) -> Self {
        Self {
            name: descriptor.field_label.clone(),
            value: descriptor.field_value.clone(),
            args: descriptor.args.clone(),
        }
    }

    /// Argument `index` as display text (empty when missing).
    pub fn arg(&self, index: usize) -> String {
        self.args
            .get(index)
            .map(|arg| display_text(&arg.to_value()))
            .unwrap_or_default()
    }

    /// All arguments joined with `", "`.
    pub fn joined_args(&self) -> String {
        self.args
            .iter()
            .map(|arg| display_text(&arg.to_value()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Turns a failing rule into a user-facing message.
pub trait MessageGenerator {
    /// Message for `rule` failing with `args`.
    fn message(&self, rule: &str, args: &MessageArgs) -> String;

    /// Message for a descriptor. Faulted rules report their fault.
    fn describe(&self, descriptor: &ErrorDescriptor) -> String {
        match &descriptor.failure {
            Failure::Rejected => self.message(
                &descriptor.rule_name,
                &MessageArgs::from_descriptor(descriptor),
            ),
            Failure::Faulted { message } => message.clone(),
        }
    }
}

type MessageFn = dyn Fn(&MessageArgs) -> String;

/// A message function.
#[derive(Clone)]
pub struct Message(Rc<MessageFn>);

impl Message {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&MessageArgs) -> String + 'static,
    {
        Self(Rc::new(f))
    }

    /// Message from a template.
    ///
    /// `{name}`, `{value}` and `{args}` are replaced, as are positional
    /// `{0}`, `{1}`, ... arguments.
    pub fn template(template: impl Into<String>) -> Self {
        let template = template.into();
        Self::new(move |args| render_template(&template, args))
    }

    pub fn render(&self, args: &MessageArgs) -> String {
        (self.0)(args)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Message(..)")
    }
}

fn render_template(template: &str, args: &MessageArgs) -> String {
    let mut out = template
        .replace("{name}", &args.name)
        .replace("{value}", &display_text(&args.value))
        .replace("{args}", &args.joined_args());
    for index in 0..args.args.len() {
        out = out.replace(&format!("{{{index}}}"), &args.arg(index));
    }
    out
}

/// Rule name to message table for one language.
#[derive(Debug, Clone, Default)]
pub struct Locale {
    messages: BTreeMap<String, Message>,
}

impl Locale {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the message for `rule`.
    pub fn insert(&mut self, rule: &str, message: Message) {
        self.messages
            .insert(crate::library::canonical_rule_name(rule), message);
    }

    #[must_use]
    pub fn with(mut self, rule: &str, message: Message) -> Self {
        self.insert(rule, message);
        self
    }

    /// Build a locale from `rule -> template` pairs.
    pub fn from_templates<I, K, V>(templates: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut locale = Self::new();
        for (rule, template) in templates {
            locale.insert(rule.as_ref(), Message::template(template));
        }
        locale
    }

    pub fn get(&self, rule: &str) -> Option<&Message> {
        self.messages.get(rule)
    }

    /// Entries in `other` replace entries with the same rule name.
    pub fn merge(&mut self, other: &Locale) {
        for (rule, message) in &other.messages {
            self.messages.insert(rule.clone(), message.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Stock English messages for the built-in rules.
    pub fn english() -> Self {
        let mut locale = Self::from_templates([
            ("accepted", "Please accept the {name}."),
            ("alpha", "{name} can only contain alphabetical characters."),
            ("alphanumeric", "{name} can only contain letters and numbers."),
            ("between", "{name} must be between {0} and {1}."),
            ("confirm", "{name} does not match."),
            ("email", "Please enter a valid email address."),
            ("endsWith", "{name} doesn’t end with a valid value."),
            ("in", "{name} is not an allowed value."),
            ("matches", "{name} is not an allowed value."),
            ("mime", "{name} must be of the type: {args}"),
            ("not", "“{value}” is not an allowed {name}."),
            ("number", "{name} must be a number."),
            ("required", "{name} is required."),
            ("startsWith", "{name} doesn’t start with a valid value."),
            ("url", "Please include a valid url."),
            (DEFAULT_KEY, "This field isn’t valid."),
        ]);
        locale.insert("date", Message::new(date_message));
        locale.insert("before", Message::new(|args| comparison("before", args)));
        locale.insert("after", Message::new(|args| comparison("after", args)));
        locale.insert("min", Message::new(|args| bound_message("at least", 1, args)));
        locale.insert("max", Message::new(|args| bound_message("no more than", 10, args)));
        locale
    }
}

fn date_message(args: &MessageArgs) -> String {
    match args.args.first() {
        Some(_) => format!(
            "{} is not a valid date, please use the format {}",
            args.name,
            args.arg(0)
        ),
        None => format!("{} is not a valid date.", args.name),
    }
}

fn comparison(direction: &str, args: &MessageArgs) -> String {
    match args.args.first() {
        Some(_) => format!("{} must be {direction} {}.", args.name, args.arg(0)),
        None => format!("{} must be {direction} today’s date.", args.name),
    }
}

fn bound_message(phrase: &str, default: u32, args: &MessageArgs) -> String {
    let bound = match args.args.first() {
        Some(_) => args.arg(0),
        None => default.to_string(),
    };
    let by_value = args.arg(1) == "value"
        || (args.arg(1) != "length" && formkit_model::js_number(&args.value).is_some());
    match &args.value {
        Value::Array(_) => format!("You must select {phrase} {bound} {}.", args.name),
        _ if by_value => format!("{} must be {phrase} {bound}.", args.name),
        _ => format!("{} must be {phrase} {bound} characters long.", args.name),
    }
}

/// Locale tables keyed by locale code, with an active locale.
///
/// Lookup order: active locale's rule entry, active locale's `default`,
/// then the same two in the `en` fallback.
#[derive(Debug, Clone)]
pub struct LocaleRegistry {
    locales: BTreeMap<String, Locale>,
    active: String,
}

impl Default for LocaleRegistry {
    fn default() -> Self {
        let mut locales = BTreeMap::new();
        locales.insert(DEFAULT_LOCALE.to_string(), Locale::english());
        Self {
            locales,
            active: DEFAULT_LOCALE.to_string(),
        }
    }
}

impl LocaleRegistry {
    /// Registry with no locales at all.
    pub fn empty() -> Self {
        Self {
            locales: BTreeMap::new(),
            active: DEFAULT_LOCALE.to_string(),
        }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    /// Switch the active locale. Unknown codes fall back at lookup time.
    pub fn set_active(&mut self, code: impl Into<String>) {
        self.active = code.into();
    }

    /// Merge `locale` into the table for `code`, creating it if needed.
    pub fn extend(&mut self, code: &str, locale: &Locale) {
        self.locales.entry(code.to_string()).or_default().merge(locale);
    }

    /// Replace the table for `code`.
    pub fn replace(&mut self, code: &str, locale: Locale) {
        self.locales.insert(code.to_string(), locale);
    }

    pub fn get(&self, code: &str) -> Option<&Locale> {
        self.locales.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.locales.keys().map(String::as_str)
    }

    fn lookup(&self, rule: &str) -> Option<&Message> {
        let chain = [self.active.as_str(), DEFAULT_LOCALE];
        chain
            .iter()
            .filter_map(|code| self.locales.get(*code))
            .find_map(|locale| locale.get(rule).or_else(|| locale.get(DEFAULT_KEY)))
    }
}

impl MessageGenerator for LocaleRegistry {
    fn message(&self, rule: &str, args: &MessageArgs) -> String {
        match self.lookup(rule) {
            Some(message) => message.render(args),
            None => format!("{} is invalid.", args.name),
        }
    }
}
