//! Log file configuration.

use crate::error::LogError;
use herald_core::MessageKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default rotation threshold in bytes.
pub const DEFAULT_MAX_SIZE: u64 = 5_000_000;

/// Where diagnostics are written and when files rotate.
///
/// # Example
///
/// ```
/// use herald_core::MessageKind;
/// use herald_log::LogConfig;
///
/// let config = LogConfig::default();
/// assert_eq!(config.file_name(MessageKind::Visitor), "visitor_errors.log");
/// assert_eq!(config.max_size, 5_000_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Directory holding the log files. Created on first write.
    pub storage: PathBuf,

    /// File receiving application errors.
    pub error_file: String,

    /// File receiving errors caused by visitors.
    pub visitor_file: String,

    /// File receiving notices.
    pub notice_file: String,

    /// Size in bytes above which a file is moved aside before writing.
    pub max_size: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            storage: PathBuf::from("data"),
            error_file: "errors.log".into(),
            visitor_file: "visitor_errors.log".into(),
            notice_file: "notices.log".into(),
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

impl LogConfig {
    /// Default file names rooted at `storage`.
    #[must_use]
    pub fn in_dir(storage: impl Into<PathBuf>) -> Self {
        Self {
            storage: storage.into(),
            ..Self::default()
        }
    }

    /// File name for `kind`.
    pub fn file_name(&self, kind: MessageKind) -> &str {
        match kind {
            MessageKind::Error => &self.error_file,
            MessageKind::Visitor => &self.visitor_file,
            MessageKind::Notice => &self.notice_file,
        }
    }

    /// Full path for `kind`.
    pub fn path_for(&self, kind: MessageKind) -> PathBuf {
        self.storage.join(self.file_name(kind))
    }

    /// Checks that file names are bare names and the size limit is usable.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), LogError> {
        if self.max_size == 0 {
            return Err(LogError::InvalidConfig("max_size must be positive".into()));
        }
        for kind in MessageKind::ALL {
            let name = self.file_name(kind);
            if name.trim().is_empty() {
                return Err(LogError::InvalidConfig(format!("{kind} file name is empty")));
            }
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(LogError::InvalidConfig(format!(
                    "{kind} file name '{name}' must not contain a path"
                )));
            }
        }
        Ok(())
    }

    /// Merges another config into this one.
    ///
    /// Values from `other` override values in `self` only if they differ
    /// from the default.
    pub fn merge(&mut self, other: &Self) {
        let default = Self::default();
        if other.storage != default.storage {
            self.storage = other.storage.clone();
        }
        if other.error_file != default.error_file {
            self.error_file = other.error_file.clone();
        }
        if other.visitor_file != default.visitor_file {
            self.visitor_file = other.visitor_file.clone();
        }
        if other.notice_file != default.notice_file {
            self.notice_file = other.notice_file.clone();
        }
        if other.max_size != default.max_size {
            self.max_size = other.max_size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = LogConfig::default();
        assert_eq!(config.storage, PathBuf::from("data"));
        assert_eq!(config.file_name(MessageKind::Error), "errors.log");
        assert_eq!(config.file_name(MessageKind::Notice), "notices.log");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn path_for_joins_storage() {
        let config = LogConfig::in_dir("/var/herald");
        assert_eq!(
            config.path_for(MessageKind::Error),
            PathBuf::from("/var/herald/errors.log")
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: LogConfig = toml::from_str("max_size = 1024\nnotice_file = \"info.log\"")
            .expect("valid toml");
        assert_eq!(config.max_size, 1024);
        assert_eq!(config.notice_file, "info.log");
        assert_eq!(config.error_file, "errors.log");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = LogConfig {
            max_size: 0,
            ..LogConfig::default()
        };
        assert!(config.validate().is_err());

        config.max_size = 10;
        config.error_file = "../escape.log".into();
        let err = config.validate().expect_err("path in name");
        assert!(err.to_string().contains("error file name"));

        config.error_file = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn merge_overrides_non_defaults_only() {
        let mut base = LogConfig::in_dir("/srv/logs");
        base.max_size = 42;

        let overlay = LogConfig {
            notice_file: "n.log".into(),
            ..LogConfig::default()
        };
        base.merge(&overlay);

        assert_eq!(base.storage, PathBuf::from("/srv/logs"));
        assert_eq!(base.max_size, 42);
        assert_eq!(base.notice_file, "n.log");
    }
}
