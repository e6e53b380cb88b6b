//! Configuration errors.

use crate::listener::ListenerValidationError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid environment variable value.
    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },

    /// Invalid logging section.
    #[error("invalid logging config: {0}")]
    Logging(#[from] herald_log::LogError),

    /// One or more listener definitions are invalid.
    #[error("{} invalid listener(s): {}", .0.len(), join(.0))]
    Listeners(Vec<ListenerValidationError>),
}

fn join(errors: &[ListenerValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    /// Creates a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse TOML error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid env var error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ConfigError::invalid_env_var("HERALD_DEBUG", "expected bool");
        assert!(err.to_string().contains("HERALD_DEBUG"));
        assert!(err.to_string().contains("expected bool"));
    }

    #[test]
    fn listeners_error_lists_all() {
        let err = ConfigError::Listeners(vec![
            ListenerValidationError::EmptyEvent { label: "/echo".into() },
            ListenerValidationError::MissingTemplate { label: "save/template".into() },
        ]);
        let text = err.to_string();
        assert!(text.starts_with("2 invalid listener(s): "));
        assert!(text.contains("'/echo'"));
        assert!(text.contains("'save/template'"));
    }
}
