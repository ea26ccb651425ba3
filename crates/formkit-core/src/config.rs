//! Form configuration.
//!
//! One [`FormConfig`] is built per host and shared by `Rc` with every form,
//! field and registry created from it. Extensions (rules, type bindings,
//! locales, uploader, plugins) are merged in through [`FormConfig::install`].

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;

use formkit_model::{ErrorDescriptor, ErrorVisibility, TypeBinding, Value, classify};
use formkit_rules::{Locale, LocaleRegistry, MessageGenerator, Predicate, RuleLibrary};

use crate::error::{FormError, Result};
use crate::upload::{FakeUploader, Uploader};

/// Default prefix for generated field ids.
pub const DEFAULT_ID_PREFIX: &str = "formkit";

// =============================================================================
// TASK SPAWNING
// =============================================================================

/// Drives background work (validation runs) to completion.
///
/// Without a spawner nothing runs on its own: pending runs make progress
/// when the host awaits `Form::settle` or the validation barrier.
pub trait TaskSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Spawner backed by `tokio::task::spawn_local`.
///
/// Must be used from inside a `tokio::task::LocalSet`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioLocalSpawner;

impl TaskSpawner for TokioLocalSpawner {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(task);
    }
}

// =============================================================================
// MERGING
// =============================================================================

/// How extension values combine with existing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Objects merge recursively, arrays concatenate.
    #[default]
    Deep,
    /// Incoming values replace existing ones.
    Replace,
}

/// Merge `incoming` into `base`.
///
/// With [`MergeStrategy::Deep`], objects merge key by key (recursively) and
/// arrays concatenate; any other pair is replaced by `incoming`.
pub fn merge_values(base: &mut Value, incoming: Value, strategy: MergeStrategy) {
    if strategy == MergeStrategy::Replace {
        *base = incoming;
        return;
    }
    match (base, incoming) {
        (Value::Object(base), Value::Object(incoming)) => {
            for (key, value) in incoming {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value, strategy),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(incoming)) => base.extend(incoming),
        (base, incoming) => *base = incoming,
    }
}

// =============================================================================
// EXTENSIONS
// =============================================================================

type InstallFn = dyn FnOnce(&mut FormConfig) -> anyhow::Result<()>;

/// A named install function.
pub struct Plugin {
    name: String,
    install: Box<InstallFn>,
}

impl Plugin {
    pub fn new<F>(name: impl Into<String>, install: F) -> Self
    where
        F: FnOnce(&mut FormConfig) -> anyhow::Result<()> + 'static,
    {
        Self {
            name: name.into(),
            install: Box::new(install),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name).finish()
    }
}

/// A bundle of configuration merged by [`FormConfig::install`].
#[derive(Default)]
pub struct Extension {
    pub rules: BTreeMap<String, Predicate>,
    /// Input type → binding overrides.
    pub library: BTreeMap<String, TypeBinding>,
    pub locales: BTreeMap<String, Locale>,
    pub uploader: Option<Rc<dyn Uploader>>,
    pub upload_options: Option<Value>,
    pub plugins: Vec<Plugin>,
    pub strategy: MergeStrategy,
}

impl Extension {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn rule(mut self, name: &str, predicate: Predicate) -> Self {
        self.rules.insert(name.to_string(), predicate);
        self
    }

    #[must_use]
    pub fn input_type(mut self, input_type: &str, binding: TypeBinding) -> Self {
        self.library.insert(input_type.to_string(), binding);
        self
    }

    #[must_use]
    pub fn locale(mut self, code: &str, locale: Locale) -> Self {
        self.locales.insert(code.to_string(), locale);
        self
    }

    #[must_use]
    pub fn uploader(mut self, uploader: Rc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    #[must_use]
    pub fn upload_options(mut self, options: Value) -> Self {
        self.upload_options = Some(options);
        self
    }

    #[must_use]
    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Serializable subset of the configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormSettings {
    pub id_prefix: String,
    pub locale: String,
    pub error_behavior: ErrorVisibility,
    /// Passed to the uploader on every upload.
    pub upload_options: BTreeMap<String, Value>,
    /// Locale code → rule name → message template.
    pub messages: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            locale: formkit_rules::DEFAULT_LOCALE.to_string(),
            error_behavior: ErrorVisibility::default(),
            upload_options: BTreeMap::new(),
            messages: BTreeMap::new(),
        }
    }
}

impl FormSettings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load settings from a TOML file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read settings {}", path.display()))?;
        let settings = Self::from_toml_str(&content)
            .with_context(|| format!("parse settings {}", path.display()))?;
        debug!(path = %path.display(), "loaded form settings");
        Ok(settings)
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Explicit configuration shared by every component of a form.
pub struct FormConfig {
    pub rules: RuleLibrary,
    pub library: BTreeMap<String, TypeBinding>,
    pub locales: LocaleRegistry,
    /// Replaces the locale registry for message generation when set.
    pub messages: Option<Rc<dyn MessageGenerator>>,
    pub uploader: Rc<dyn Uploader>,
    pub upload_options: Value,
    pub id_prefix: String,
    pub error_behavior: ErrorVisibility,
    pub spawner: Option<Rc<dyn TaskSpawner>>,
    next_id: Cell<u64>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            rules: RuleLibrary::builtin(),
            library: BTreeMap::new(),
            locales: LocaleRegistry::default(),
            messages: None,
            uploader: Rc::new(FakeUploader::default()),
            upload_options: Value::Object(serde_json::Map::new()),
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            error_behavior: ErrorVisibility::default(),
            spawner: None,
            next_id: Cell::new(0),
        }
    }
}

impl fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormConfig")
            .field("rules", &self.rules.len())
            .field("library", &self.library)
            .field("locale", &self.locales.active())
            .field("id_prefix", &self.id_prefix)
            .field("error_behavior", &self.error_behavior)
            .finish_non_exhaustive()
    }
}

impl FormConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration built from serializable settings.
    pub fn from_settings(settings: FormSettings) -> Result<Self> {
        let mut config = Self::default();
        config.apply_settings(settings)?;
        Ok(config)
    }

    /// Apply serializable settings on top of the current configuration.
    pub fn apply_settings(&mut self, settings: FormSettings) -> Result<()> {
        self.id_prefix = settings.id_prefix;
        self.error_behavior = settings.error_behavior;
        self.locales.set_active(settings.locale);
        let mut extension = Extension::new();
        if !settings.upload_options.is_empty() {
            let options = settings.upload_options.into_iter().collect();
            extension = extension.upload_options(Value::Object(options));
        }
        for (code, templates) in settings.messages {
            extension = extension.locale(&code, Locale::from_templates(templates));
        }
        self.install(extension)
    }

    /// Builder-style spawner setup.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Rc<dyn TaskSpawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Builder-style uploader setup.
    #[must_use]
    pub fn with_uploader(mut self, uploader: Rc<dyn Uploader>) -> Self {
        self.uploader = uploader;
        self
    }

    /// Merge an extension into this configuration.
    ///
    /// Rules and type bindings are added or overridden by name. Locales and
    /// upload options merge per [`Extension::strategy`]. Plugins run last, in
    /// order; the first failing plugin aborts the install.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::Install`] when a plugin fails.
    pub fn install(&mut self, extension: Extension) -> Result<()> {
        let Extension {
            rules,
            library,
            locales,
            uploader,
            upload_options,
            plugins,
            strategy,
        } = extension;

        for (name, predicate) in rules {
            self.rules.insert(&name, predicate);
        }
        self.library.extend(library);
        for (code, locale) in locales {
            match strategy {
                MergeStrategy::Deep => self.locales.extend(&code, &locale),
                MergeStrategy::Replace => self.locales.replace(&code, locale),
            }
        }
        if let Some(uploader) = uploader {
            self.uploader = uploader;
        }
        if let Some(options) = upload_options {
            merge_values(&mut self.upload_options, options, strategy);
        }
        for plugin in plugins {
            let Plugin { name, install } = plugin;
            install(self).map_err(|err| FormError::Install {
                plugin: name.clone(),
                message: format!("{err:#}"),
            })?;
            debug!(plugin = %name, "installed plugin");
        }
        Ok(())
    }

    /// Resolve an input type, honoring configured overrides.
    pub fn classify(&self, input_type: &str) -> TypeBinding {
        self.library
            .get(input_type)
            .cloned()
            .unwrap_or_else(|| classify(input_type))
    }

    /// User-facing message for a failing rule.
    pub fn describe(&self, descriptor: &ErrorDescriptor) -> String {
        match &self.messages {
            Some(generator) => generator.describe(descriptor),
            None => self.locales.describe(descriptor),
        }
    }

    /// Next generated id number.
    pub fn next_id(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formkit_model::Classification;
    use serde_json::json;

    #[test]
    fn test_deep_merge_objects_and_arrays() {
        let mut base = json!({"a": {"x": 1, "list": [1]}, "b": 2});
        merge_values(
            &mut base,
            json!({"a": {"y": 2, "list": [2]}, "b": 3}),
            MergeStrategy::Deep,
        );
        assert_eq!(base, json!({"a": {"x": 1, "y": 2, "list": [1, 2]}, "b": 3}));
    }

    #[test]
    fn test_replace_strategy() {
        let mut base = json!({"list": [1]});
        merge_values(&mut base, json!({"other": true}), MergeStrategy::Replace);
        assert_eq!(base, json!({"other": true}));
    }

    #[test]
    fn test_install_rules_and_types() {
        let mut config = FormConfig::default();
        let is_even = Predicate::from_fn(|ctx, _| ctx.value.as_i64().is_some_and(|n| n % 2 == 0));
        let extension = Extension::new()
            .rule("is_even", is_even)
            .input_type("signature", TypeBinding::of(Classification::File));
        config.install(extension).unwrap();
        assert!(config.rules.contains("isEven"));
        assert_eq!(config.classify("signature").classification, Classification::File);
        assert_eq!(config.classify("email").classification, Classification::Text);
    }

    #[test]
    fn test_install_upload_options_concatenate() {
        let mut config = FormConfig::default();
        config
            .install(Extension::new().upload_options(json!({"headers": ["a"]})))
            .unwrap();
        config
            .install(Extension::new().upload_options(json!({"headers": ["b"], "retries": 2})))
            .unwrap();
        assert_eq!(
            config.upload_options,
            json!({"headers": ["a", "b"], "retries": 2})
        );
    }

    #[test]
    fn test_plugins_run_in_order_and_fail_loud() {
        let mut config = FormConfig::default();
        let extension = Extension::new()
            .plugin(Plugin::new("prefix", |config| {
                config.id_prefix = "custom".to_string();
                Ok(())
            }))
            .plugin(Plugin::new("broken", |_| Err(anyhow::anyhow!("missing dependency"))));
        let err = config.install(extension).unwrap_err();
        assert_eq!(config.id_prefix, "custom");
        assert!(matches!(err, FormError::Install { ref plugin, .. } if plugin == "broken"));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = FormSettings::from_toml_str(
            r#"
            id_prefix = "signup"
            locale = "de"
            error_behavior = "live"

            [messages.de]
            required = "{name} ist erforderlich."
            "#,
        )
        .unwrap();
        let config = FormConfig::from_settings(settings).unwrap();
        assert_eq!(config.id_prefix, "signup");
        assert_eq!(config.error_behavior, ErrorVisibility::Live);
        assert_eq!(config.locales.active(), "de");
        assert!(config.locales.get("de").is_some());
    }

    #[test]
    fn test_next_id_increments() {
        let config = FormConfig::default();
        assert_eq!(config.next_id(), 1);
        assert_eq!(config.next_id(), 2);
    }

    #[test]
    fn test_load_from_missing_file_names_path() {
        let path = std::env::temp_dir().join("formkit-no-such-settings.toml");
        let err = FormSettings::load_from(&path).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.starts_with("read settings"));
        assert!(message.contains("formkit-no-such-settings.toml"));
    }
}
