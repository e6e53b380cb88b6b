//! Log sink errors.

use std::path::PathBuf;
use thiserror::Error;

/// Error while writing or rotating a log file.
#[derive(Debug, Error)]
pub enum LogError {
    /// Failed to create the storage directory.
    #[error("failed to create log directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to append to a log file.
    #[error("failed to write log file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move a full log file aside.
    #[error("failed to rotate log file '{from}' to '{to}': {source}")]
    Rotate {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration cannot be used.
    #[error("invalid log config: {0}")]
    InvalidConfig(String),
}

impl LogError {
    /// Creates a create dir error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a write error.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a rotate error.
    pub fn rotate(from: impl Into<PathBuf>, to: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Rotate {
            from: from.into(),
            to: to.into(),
            source,
        }
    }
}
