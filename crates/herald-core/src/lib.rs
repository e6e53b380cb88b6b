//! In-process event dispatch for Herald.
//!
//! This crate provides the dispatch engine that the `herald` binary and
//! embedding applications build on.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Core Layer                  ◄── HERE   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  herald-core : Controller, Event, Handler, registry, JSON   │
//! └─────────────────────────────────────────────────────────────┘
//!           ↕ MessageSink
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Output Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  herald-log  : FileSink, rotation, sanitization             │
//! │  herald-cli  : config, declarative listeners, binary        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Core Concepts
//!
//! ## Controllable
//!
//! [`Controllable`] is the capability shared by every participant: a
//! write-once id, an immutable name, JSON settings, buffered errors and
//! notices, and an optional [`ControllerHandle`] back to the owner.
//! Buffered diagnostics reach a [`MessageSink`] exactly once, on
//! [`Controllable::finalize`].
//!
//! ## Handlers and Events
//!
//! A [`Handler`] is a named observer with a priority. An [`Event`] holds at
//! most one handler per name and, on [`Event::notify`], runs them from the
//! highest priority down (equal priorities in attach order). Handler output
//! is merged into the event's output; an `Err` or a panic from a handler is
//! recorded on the event and dispatch carries on.
//!
//! ## Controller
//!
//! [`Controller`] owns the events and a memoized dependency registry.
//! Dependencies are built by named [`Factory`] constructors the first time
//! they are requested with [`Controller::add_param`], then shared.
//!
//! # Failure model
//!
//! `listen`, `run`, `notify` and `add_param` never return errors. Failures
//! become diagnostics and reach the sink when the owner is finalized or the
//! controller closes.
//!
//! # Example
//!
//! ```
//! use herald_core::{handler_ref, Controller, FnHandler, MemorySink, MessageKind, HandlerError};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let mut ctrl = Controller::new(sink.clone());
//!
//! ctrl.listen("save", handler_ref(
//!     FnHandler::new("index", |_, _| Ok(vec![json!("indexed")])).with_priority(5),
//! ));
//! ctrl.listen("save", handler_ref(
//!     FnHandler::new("audit", |_, _| Ok(vec![json!("audited")])).with_priority(10),
//! ));
//! ctrl.listen("save", handler_ref(
//!     FnHandler::new("mirror", |_, _| Err(HandlerError::failed("mirror", "offline"))),
//! ));
//!
//! assert!(ctrl.run("save", None));
//! assert_eq!(
//!     ctrl.event("save").unwrap().output("save"),
//!     &[json!("audited"), json!("indexed")],
//! );
//!
//! ctrl.close();
//! assert_eq!(
//!     sink.of_kind(MessageKind::Error),
//!     vec!["Event handler 'mirror' failed: offline"],
//! );
//! ```

mod controllable;
mod controller;
mod error;
mod event;
mod handler;
pub mod json;
mod panic;
pub mod registry;
mod sink;

pub use controllable::{short_type_name, Controllable, Core};
pub use controller::Controller;
pub use error::{describe_error, FactoryError, HandlerError, UncaughtPanic, UnknownMessageKind};
pub use event::Event;
pub use handler::{handler_ref, EventContext, FnHandler, Handler, HandlerRef, HandlerState};
pub use json::{decode, encode, format_settings, Params, ParamsInput};
pub use registry::{ControllerHandle, Factory, ParamKey, SharedParam};
pub use sink::{MemorySink, MessageKind, MessageSink, TracingSink};

// Re-export testing utilities
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Test utilities for handlers and sinks.
    //!
    //! Provides [`RecordingHandler`] and re-exports [`MemorySink`].
    pub use crate::handler::testing::{Behavior, RecordingHandler};
    pub use crate::sink::MemorySink;
}
