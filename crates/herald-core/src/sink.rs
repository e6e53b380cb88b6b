//! Message sinks — where finalized diagnostics go.
//!
//! A sink receives `(kind, text)` pairs. It must never block the caller
//! for long and must never fail observably. Durable storage (files,
//! rotation) is the concern of `herald-log`.

use crate::error::UnknownMessageKind;
use parking_lot::Mutex;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Category of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Application error.
    Error,
    /// Informational notice.
    Notice,
    /// Error caused by a visitor's request rather than the application.
    Visitor,
}

impl MessageKind {
    /// All kinds, in flush order.
    pub const ALL: [MessageKind; 3] = [Self::Error, Self::Visitor, Self::Notice];

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Notice => "notice",
            Self::Visitor => "visitor",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = UnknownMessageKind;

    /// Accepts singular and plural spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" | "errors" => Ok(Self::Error),
            "notice" | "notices" => Ok(Self::Notice),
            "visitor" | "visitors" => Ok(Self::Visitor),
            _ => Err(UnknownMessageKind(s.to_string())),
        }
    }
}

/// Destination for diagnostics.
pub trait MessageSink: Send + Sync {
    /// Accepts one message. Must not fail observably.
    fn message(&self, kind: MessageKind, text: &str);

    /// Pushes buffered messages to durable storage, if any.
    fn flush(&self) {}
}

impl<S: MessageSink + ?Sized> MessageSink for Arc<S> {
    fn message(&self, kind: MessageKind, text: &str) {
        (**self).message(kind, text);
    }

    fn flush(&self) {
        (**self).flush();
    }
}

/// Keeps every message in memory.
///
/// Useful for embedding (read diagnostics back after a run) and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(MessageKind, String)>>,
    flushes: AtomicUsize,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages received so far, in arrival order.
    pub fn messages(&self) -> Vec<(MessageKind, String)> {
        self.messages.lock().clone()
    }

    /// Texts of the messages of one kind.
    pub fn of_kind(&self, kind: MessageKind) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Number of messages received.
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Returns `true` if nothing was received.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `flush()` calls.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }

    /// Drops all stored messages.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl MessageSink for MemorySink {
    fn message(&self, kind: MessageKind, text: &str) {
        self.messages.lock().push((kind, text.to_string()));
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Forwards messages to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn message(&self, kind: MessageKind, text: &str) {
        match kind {
            MessageKind::Error => tracing::error!(target: "herald::diagnostics", "{text}"),
            MessageKind::Visitor => tracing::warn!(target: "herald::diagnostics", "{text}"),
            MessageKind::Notice => tracing::info!(target: "herald::diagnostics", "{text}"),
        }
    }
}
