//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use crate::listener::{self, ListenerDef};
use herald_log::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure.
///
/// This is the unified configuration after merging all layers.
///
/// # Example
///
/// ```
/// use herald_cli::config::HeraldConfig;
///
/// let config = HeraldConfig::from_toml(r#"
///     [logging]
///     storage = "/var/log/herald"
///
///     [[listeners]]
///     event = "save"
///     kind = "echo"
/// "#).unwrap();
/// assert_eq!(config.listeners.len(), 1);
/// assert!(!config.debug);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeraldConfig {
    /// Enable debug logging.
    pub debug: bool,

    /// Diagnostics log files.
    pub logging: LogConfig,

    /// Declarative listeners attached at startup.
    pub listeners: Vec<ListenerDef>,
}

impl HeraldConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges another config into this one.
    ///
    /// Scalar values from `other` override values in `self` only if they
    /// differ from the default. Listeners accumulate.
    pub fn merge(&mut self, other: &Self) {
        if other.debug {
            self.debug = true;
        }
        self.logging.merge(&other.logging);
        listener::merge(&mut self.listeners, &other.listeners);
    }

    /// Makes a relative storage directory relative to `root`.
    pub fn resolve_storage(&mut self, root: &Path) {
        if self.logging.storage.is_relative() {
            self.logging.storage = root.join(&self.logging.storage);
        }
    }

    /// Validates the logging section and every listener.
    ///
    /// # Errors
    ///
    /// Returns the logging error, or every listener error at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        let errors = listener::validate_all(&self.listeners);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Listeners(errors))
        }
    }

    /// Enabled listeners, in definition order.
    pub fn enabled_listeners(&self) -> impl Iterator<Item = &ListenerDef> {
        self.listeners.iter().filter(|l| l.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::ListenerKind;
    use std::path::PathBuf;

    #[test]
    fn default_config() {
        let config = HeraldConfig::default();
        assert!(!config.debug);
        assert_eq!(config.logging, LogConfig::default());
        assert!(config.listeners.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_roundtrip() {
        let mut config = HeraldConfig::new();
        config.debug = true;
        config.logging.max_size = 1000;
        config.listeners.push(ListenerDef {
            template: Some("saved {file}".into()),
            priority: 5,
            ..ListenerDef::new("save", ListenerKind::Template)
        });

        let text = config.to_toml().expect("serialize");
        assert_eq!(HeraldConfig::from_toml(&text).expect("parse"), config);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(HeraldConfig::from_toml("").expect("parse"), HeraldConfig::default());
    }

    #[test]
    fn merge_layers() {
        let mut base = HeraldConfig::from_toml(
            r#"
            [logging]
            storage = "/base"
            max_size = 10

            [[listeners]]
            event = "save"
            kind = "echo"
            "#,
        )
        .expect("parse base");
        let overlay = HeraldConfig::from_toml(
            r#"
            debug = true

            [logging]
            max_size = 20

            [[listeners]]
            event = "save"
            kind = "echo"
            priority = 9

            [[listeners]]
            event = "load"
            kind = "keys"
            "#,
        )
        .expect("parse overlay");

        base.merge(&overlay);

        assert!(base.debug);
        assert_eq!(base.logging.storage, PathBuf::from("/base"));
        assert_eq!(base.logging.max_size, 20);
        assert_eq!(base.listeners.len(), 2);
        assert_eq!(base.listeners[0].priority, 9);
    }

    #[test]
    fn resolve_storage_only_touches_relative_paths() {
        let mut config = HeraldConfig::default();
        config.resolve_storage(Path::new("/project"));
        assert_eq!(config.logging.storage, PathBuf::from("/project/data"));

        config.logging.storage = PathBuf::from("/abs");
        config.resolve_storage(Path::new("/project"));
        assert_eq!(config.logging.storage, PathBuf::from("/abs"));
    }

    #[test]
    fn validate_reports_listener_errors() {
        let mut config = HeraldConfig::default();
        config.listeners.push(ListenerDef::new("", ListenerKind::Echo));
        config.listeners.push(ListenerDef::new("save", ListenerKind::Template));
        match config.validate() {
            Err(ConfigError::Listeners(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected listener errors, got {other:?}"),
        }
    }

    #[test]
    fn validate_reports_logging_errors() {
        let mut config = HeraldConfig::default();
        config.logging.max_size = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Logging(_))));
    }

    #[test]
    fn disabled_listeners_are_skipped() {
        let mut config = HeraldConfig::default();
        config.listeners.push(ListenerDef::new("a", ListenerKind::Echo));
        config.listeners.push(ListenerDef {
            enabled: false,
            ..ListenerDef::new("b", ListenerKind::Echo)
        });
        let events: Vec<_> = config.enabled_listeners().map(|l| l.event.as_str()).collect();
        assert_eq!(events, vec!["a"]);
    }
}
