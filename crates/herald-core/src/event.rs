//! Event — a named subject dispatching to prioritized handlers.
//!
//! Handlers are kept one per name. On [`Event::notify`] they run in
//! descending priority order; equal priorities run in attach order.

use crate::controllable::{Controllable, Core};
use crate::error::{panic_message, HandlerError};
use crate::handler::{EventContext, HandlerRef};
use crate::json::Params;
use crate::panic;
use crate::sink::MessageSink;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// An attached handler with its event-local priority.
struct Attached {
    name: String,
    priority: i32,
    /// Attach order, used as the tie-break between equal priorities.
    seq: u64,
    handler: HandlerRef,
}

/// A named subject holding prioritized handlers.
///
/// # Output
///
/// Each notify appends the handlers' outputs under the event's own name.
/// Output accumulates across notifications until [`Event::clear_output`]
/// is called.
pub struct Event {
    core: Core,
    handlers: Vec<Attached>,
    next_seq: u64,
    output: HashMap<String, Vec<Value>>,
}

impl Event {
    /// Creates an event with no controller link.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_core(Core::new(name))
    }

    /// Creates an event around an existing core.
    #[must_use]
    pub fn with_core(core: Core) -> Self {
        Self {
            core,
            handlers: Vec::new(),
            next_seq: 0,
            output: HashMap::new(),
        }
    }

    /// Returns `true` if a handler with the same name is attached.
    pub fn has_handler(&self, handler: &HandlerRef) -> bool {
        let name = handler.lock().name().to_string();
        self.position(&name).is_some()
    }

    /// Returns `true` if a handler named `name` is attached.
    pub fn has_handler_named(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Attaches a handler.
    ///
    /// Does nothing if a handler with the same name is already attached.
    /// Without an explicit `priority` the handler's own priority is copied;
    /// later changes to the handler's priority are not seen by this event.
    ///
    /// Returns `true` if the handler was attached.
    pub fn attach(&mut self, handler: HandlerRef, priority: Option<i32>) -> bool {
        let (name, priority) = {
            let guard = handler.lock();
            (
                guard.name().to_string(),
                priority.unwrap_or_else(|| guard.priority()),
            )
        };

        if self.position(&name).is_some() {
            debug!(event = %self.core.name(), handler = %name, "handler already attached");
            return false;
        }

        debug!(event = %self.core.name(), handler = %name, priority, "handler attached");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.handlers.push(Attached {
            name,
            priority,
            seq,
            handler,
        });
        true
    }

    /// Detaches the handler with the same name, if attached.
    pub fn detach(&mut self, handler: &HandlerRef) -> bool {
        let name = handler.lock().name().to_string();
        self.detach_by_name(&name)
    }

    /// Detaches the handler named `name`, if attached.
    pub fn detach_by_name(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(pos) => {
                self.handlers.remove(pos);
                debug!(event = %self.core.name(), handler = %name, "handler detached");
                true
            }
            None => false,
        }
    }

    /// Changes the stored priority of an attached handler and re-sorts.
    ///
    /// Does nothing if the handler is not attached.
    pub fn priority(&mut self, handler: &HandlerRef, priority: i32) -> bool {
        let name = handler.lock().name().to_string();
        match self.position(&name) {
            Some(pos) => {
                self.handlers[pos].priority = priority;
                self.sort_handlers();
                true
            }
            None => false,
        }
    }

    /// Sorts handlers by descending priority, then attach order.
    pub fn sort_handlers(&mut self) {
        self.handlers
            .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
    }

    /// Returns the stored priority and reference of a handler.
    pub fn handler(&self, name: &str) -> Option<(i32, HandlerRef)> {
        self.position(name).map(|pos| {
            let a = &self.handlers[pos];
            (a.priority, Arc::clone(&a.handler))
        })
    }

    /// Attached handler names with their priorities, in current order.
    pub fn handlers(&self) -> impl Iterator<Item = (&str, i32)> {
        self.handlers.iter().map(|a| (a.name.as_str(), a.priority))
    }

    /// Number of attached handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers are attached.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs every attached handler.
    ///
    /// `Some(params)` replaces the stored params; `None` reuses the last
    /// ones. Handlers run in sorted order against a snapshot taken before
    /// the first one starts. Each handler's output for this event is reset
    /// before its `update`, then appended to the event's output.
    ///
    /// A handler returning `Err` or panicking is recorded as one error on
    /// this event; the remaining handlers still run.
    ///
    /// Returns the number of handlers that ran.
    pub fn notify(&mut self, params: Option<Params>) -> usize {
        if let Some(params) = params {
            self.core.set_params(params);
        }

        self.sort_handlers();
        let snapshot: Vec<(String, HandlerRef)> = self
            .handlers
            .iter()
            .map(|a| (a.name.clone(), Arc::clone(&a.handler)))
            .collect();

        let name = self.core.name().to_string();
        let params = self.core.params().clone();
        let controller = self.core.controller().cloned();
        let ctx = EventContext::new(&name, self.core.id(), &params, controller.as_ref());

        debug!(event = %name, handlers = snapshot.len(), "notify");

        let mut merged = Vec::new();
        let mut failures = Vec::new();
        for (handler_name, handler) in &snapshot {
            let mut guard = handler.lock();
            guard.state_mut().reset(&name);

            let outcome = panic::catch(|| guard.update(&ctx, &params));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(payload) => Some(HandlerError::Panicked {
                    handler: handler_name.clone(),
                    message: panic_message(payload.as_ref()),
                }),
            };
            if let Some(e) = failure {
                warn!(event = %name, handler = %handler_name, error = %e, "handler failed");
                failures.push(e.to_string());
            }

            merged.extend(guard.output(&name).iter().cloned());
        }

        self.output.entry(name).or_default().extend(merged);
        for failure in failures {
            self.core.error(failure);
        }

        snapshot.len()
    }

    /// Accumulated output for `name` (normally the event's own name).
    pub fn output(&self, name: &str) -> &[Value] {
        self.output.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All accumulated output, keyed by event name.
    pub fn outputs(&self) -> &HashMap<String, Vec<Value>> {
        &self.output
    }

    /// Forgets accumulated output.
    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.handlers.iter().position(|a| a.name == name)
    }
}

impl Controllable for Event {
    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }

    /// Flushes this event's diagnostics, then those of its handlers.
    fn finalize(&mut self, sink: &dyn MessageSink) -> usize {
        let type_name = self.type_name();
        let mut flushed = self.core.flush(type_name, sink);
        for attached in &self.handlers {
            flushed += attached.handler.lock().finalize(sink);
        }
        flushed
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("core", &self.core)
            .field("handlers", &self.handlers().collect::<Vec<_>>())
            .finish()
    }
}
