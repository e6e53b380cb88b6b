//! Error types for the dispatch engine.
//!
//! None of these escape `listen`, `run`, `notify` or `add_param`. They are
//! captured where they happen and rendered into diagnostics buffers.

use std::error::Error as StdError;
use thiserror::Error;

/// Failure reported by a handler while processing an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The handler could not complete its work.
    #[error("handler '{handler}' failed: {message}")]
    Failed {
        /// Name of the failing handler.
        handler: String,
        /// Error message.
        message: String,
    },

    /// A parameter the handler relies on is missing or malformed.
    #[error("handler '{handler}' rejected parameter '{param}': {message}")]
    InvalidParam {
        /// Name of the rejecting handler.
        handler: String,
        /// Offending parameter key.
        param: String,
        /// Error message.
        message: String,
    },

    /// `update` panicked. Produced by the event, never by handlers.
    #[error("handler '{handler}' panicked: {message}")]
    Panicked {
        /// Name of the panicking handler.
        handler: String,
        /// Panic payload rendered as text.
        message: String,
    },
}

impl HandlerError {
    /// Creates a [`HandlerError::Failed`].
    pub fn failed(handler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            handler: handler.into(),
            message: message.into(),
        }
    }

    /// Creates a [`HandlerError::InvalidParam`].
    pub fn invalid_param(
        handler: impl Into<String>,
        param: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParam {
            handler: handler.into(),
            param: param.into(),
            message: message.into(),
        }
    }
}

/// Failure while resolving a shared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// The constructor returned an error.
    #[error("failed to construct '{key}': {message}")]
    Construction {
        /// Dependency key.
        key: String,
        /// Error message.
        message: String,
    },

    /// The constructor panicked.
    #[error("constructor for '{key}' panicked: {message}")]
    Panicked {
        /// Dependency key.
        key: String,
        /// Panic payload rendered as text.
        message: String,
    },

    /// The key was requested again while its own constructor was running.
    #[error("circular dependency on '{0}'")]
    Circular(String),
}

impl FactoryError {
    /// Creates a [`FactoryError::Construction`].
    pub fn construction(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            key: key.into(),
            message: message.into(),
        }
    }
}

/// A panic that reached the process panic hook while capture was on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("panicked at {location}: {message}")]
pub struct UncaughtPanic {
    /// `file:line:column`, or `unknown location`.
    pub location: String,
    /// Panic payload text.
    pub message: String,
}

/// Unknown message kind string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown message kind: {0}")]
pub struct UnknownMessageKind(pub String);

/// Renders an error and its `source()` chain on a single line.
///
/// ```
/// use herald_core::describe_error;
///
/// let err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
/// assert_eq!(describe_error(&err), "Error: no such file");
/// ```
pub fn describe_error(err: &(dyn StdError + 'static)) -> String {
    let mut out = format!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": caused by ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Renders a `catch_unwind` payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_failed() {
        let err = HandlerError::failed("audit", "disk full");
        assert_eq!(err.to_string(), "handler 'audit' failed: disk full");
    }

    #[test]
    fn display_invalid_param() {
        let err = HandlerError::invalid_param("save", "file", "missing");
        assert_eq!(
            err.to_string(),
            "handler 'save' rejected parameter 'file': missing"
        );
    }

    #[test]
    fn display_panicked() {
        let err = HandlerError::Panicked {
            handler: "h1".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "handler 'h1' panicked: boom");
    }

    #[test]
    fn display_factory_errors() {
        assert_eq!(
            FactoryError::construction("Mailer", "no smtp host").to_string(),
            "failed to construct 'Mailer': no smtp host"
        );
        assert_eq!(
            FactoryError::Circular("Cache".into()).to_string(),
            "circular dependency on 'Cache'"
        );
    }

    #[test]
    fn display_uncaught_panic() {
        let err = UncaughtPanic {
            location: "src/main.rs:3:5".into(),
            message: "boom".into(),
        };
        assert_eq!(describe_error(&err), "Error: panicked at src/main.rs:3:5: boom");
    }

    #[test]
    fn describe_error_walks_sources() {
        #[derive(Debug, Error)]
        #[error("outer")]
        struct Outer(#[source] std::io::Error);

        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "inner"));
        assert_eq!(describe_error(&err), "Error: outer: caused by inner");
    }

    #[test]
    fn panic_message_variants() {
        let s: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(s.as_ref()), "static");
        let s: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(s.as_ref()), "owned");
        let s: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(s.as_ref()), "non-string panic payload");
    }
}
