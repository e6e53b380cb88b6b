//! Listener configuration — declarative handler definitions.
//!
//! Listeners attach builtin handlers to events at startup.
//!
//! # Example TOML
//!
//! ```toml
//! [[listeners]]
//! event = "save"
//! kind = "template"
//! name = "announce"
//! template = "saved {file}"
//! priority = 10
//!
//! [[listeners]]
//! event = "save"
//! kind = "keys"
//! fixed_priority = true
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Builtin handler kinds a listener can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerKind {
    /// Records the params as one output value.
    Echo,
    /// Records `template` with `{key}` placeholders filled from params.
    Template,
    /// Records the sorted param keys.
    Keys,
    /// Fails with `message`.
    Fail,
}

impl ListenerKind {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::Template => "template",
            Self::Keys => "keys",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single declarative listener definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListenerDef {
    /// Event the handler attaches to.
    pub event: String,

    /// Builtin handler kind.
    pub kind: ListenerKind,

    /// Handler name. Defaults to the kind.
    pub name: Option<String>,

    /// Priority (higher = earlier). Default: 0.
    #[serde(default)]
    pub priority: i32,

    /// Whether the handler's priority is locked.
    #[serde(default)]
    pub fixed_priority: bool,

    /// Template text, for `template` listeners.
    pub template: Option<String>,

    /// Failure message, for `fail` listeners.
    pub message: Option<String>,

    /// Whether the listener is attached. Default: true.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Errors from validating a `ListenerDef`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListenerValidationError {
    /// `event` is empty or blank.
    #[error("listener '{label}': 'event' is empty")]
    EmptyEvent { label: String },

    /// `name` is set but blank.
    #[error("listener '{label}': 'name' is blank")]
    BlankName { label: String },

    /// A `template` listener without `template`.
    #[error("listener '{label}': kind 'template' requires 'template'")]
    MissingTemplate { label: String },

    /// A field that the listener's kind does not use.
    #[error("listener '{label}': '{field}' is not used by kind '{kind}'")]
    UnusedField {
        label: String,
        field: &'static str,
        kind: ListenerKind,
    },
}

impl ListenerDef {
    /// Creates an enabled listener with defaults for everything else.
    pub fn new(event: impl Into<String>, kind: ListenerKind) -> Self {
        Self {
            event: event.into(),
            kind,
            name: None,
            priority: 0,
            fixed_priority: false,
            template: None,
            message: None,
            enabled: true,
        }
    }

    /// Name of the handler this listener creates.
    pub fn handler_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.as_str())
    }

    /// `event/name`, used in error messages.
    pub fn label(&self) -> String {
        format!("{}/{}", self.event, self.handler_name())
    }

    /// Validates this listener definition.
    ///
    /// Checks:
    /// - `event` is not blank
    /// - `name`, when given, is not blank
    /// - `template` is present exactly for `template` listeners
    /// - `message` is only given to `fail` listeners
    pub fn validate(&self) -> Result<(), ListenerValidationError> {
        let label = self.label();

        if self.event.trim().is_empty() {
            return Err(ListenerValidationError::EmptyEvent { label });
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ListenerValidationError::BlankName { label });
        }

        match (self.kind, &self.template) {
            (ListenerKind::Template, None) => {
                return Err(ListenerValidationError::MissingTemplate { label });
            }
            (kind, Some(_)) if kind != ListenerKind::Template => {
                return Err(ListenerValidationError::UnusedField {
                    label,
                    field: "template",
                    kind,
                });
            }
            _ => {}
        }

        if self.message.is_some() && self.kind != ListenerKind::Fail {
            return Err(ListenerValidationError::UnusedField {
                label,
                field: "message",
                kind: self.kind,
            });
        }

        Ok(())
    }
}

/// Validates every definition, returning all errors (not just the first).
pub fn validate_all(defs: &[ListenerDef]) -> Vec<ListenerValidationError> {
    defs.iter().filter_map(|d| d.validate().err()).collect()
}

/// Merges listener layers.
///
/// Definitions accumulate; one in `other` with the same event and handler
/// name as an existing one replaces it.
pub fn merge(base: &mut Vec<ListenerDef>, other: &[ListenerDef]) {
    for def in other {
        base.retain(|d| !(d.event == def.event && d.handler_name() == def.handler_name()));
        base.push(def.clone());
    }
}
