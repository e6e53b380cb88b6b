//! Handler trait and testing utilities.

use crate::controllable::{Controllable, Core};
use crate::error::HandlerError;
use crate::json::Params;
use crate::registry::ControllerHandle;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared reference to a handler.
///
/// One handler may be attached to several events, so events hold it by
/// reference and lock it for the duration of `update`.
pub type HandlerRef = Arc<Mutex<dyn Handler>>;

/// Wraps a handler into a [`HandlerRef`].
pub fn handler_ref<H: Handler + 'static>(handler: H) -> HandlerRef {
    Arc::new(Mutex::new(handler))
}

/// Priority and per-event output of a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerState {
    priority: Option<i32>,
    fixed_priority: bool,
    output: HashMap<String, Vec<Value>>,
}

impl HandlerState {
    /// State with no priority set (reported as 0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the starting priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Locks the priority: later `set_priority` calls fail.
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.fixed_priority = true;
        self
    }

    /// Current priority, 0 if never set.
    pub fn priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }

    /// Changes the priority unless it is fixed.
    pub fn set_priority(&mut self, priority: i32) -> bool {
        if self.fixed_priority {
            return false;
        }
        self.priority = Some(priority);
        true
    }

    /// Returns `true` if the priority cannot change.
    pub fn is_fixed(&self) -> bool {
        self.fixed_priority
    }

    /// Output recorded for `event`, empty if none.
    pub fn output(&self, event: &str) -> &[Value] {
        self.output.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends one value to the output for `event`.
    pub fn record(&mut self, event: &str, value: Value) {
        self.output.entry(event.to_string()).or_default().push(value);
    }

    /// Forgets the output for `event`.
    pub fn reset(&mut self, event: &str) {
        self.output.remove(event);
    }

    /// Forgets all output.
    pub fn clear(&mut self) {
        self.output.clear();
    }
}

/// Read-only view of the notifying event, handed to [`Handler::update`].
#[derive(Debug, Clone, Copy)]
pub struct EventContext<'a> {
    name: &'a str,
    id: u64,
    params: &'a Params,
    controller: Option<&'a ControllerHandle>,
}

impl<'a> EventContext<'a> {
    /// Builds a context. Events do this on every notify; tests may call it
    /// directly to drive a handler without an event.
    #[must_use]
    pub fn new(
        name: &'a str,
        id: u64,
        params: &'a Params,
        controller: Option<&'a ControllerHandle>,
    ) -> Self {
        Self {
            name,
            id,
            params,
            controller,
        }
    }

    /// Event name. Output must be recorded under this key.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Event id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Params stored on the event for this run.
    pub fn params(&self) -> &'a Params {
        self.params
    }

    /// Controller the event belongs to.
    pub fn controller(&self) -> Option<&'a ControllerHandle> {
        self.controller
    }
}

/// A named, prioritized observer attached to events.
///
/// Implementors provide `state()`/`state_mut()` and `update()`.
///
/// # Failures
///
/// `update` should record expected problems with `add_error` or return
/// `Err`. Either way the event carries on with its remaining handlers; a
/// returned error or a panic is also recorded on the event itself.
pub trait Handler: Controllable + Send {
    /// Priority and output state.
    fn state(&self) -> &HandlerState;

    /// Priority and output state, mutable.
    fn state_mut(&mut self) -> &mut HandlerState;

    /// Does the handler's work for one notification.
    fn update(&mut self, event: &EventContext<'_>, params: &Params) -> Result<(), HandlerError>;

    /// Execution rank. Higher runs first. Default: 0.
    fn priority(&self) -> i32 {
        self.state().priority()
    }

    /// Changes the priority. Returns `false` if the priority is fixed.
    ///
    /// Events copy the priority on attach; use
    /// [`Event::priority`](crate::Event::priority) to change an attached copy.
    fn set_priority(&mut self, priority: i32) -> bool {
        self.state_mut().set_priority(priority)
    }

    /// Output of the most recent run for `event`.
    fn output(&self, event: &str) -> &[Value] {
        self.state().output(event)
    }

    /// Appends to the output for `event`.
    fn record_output(&mut self, event: &str, value: Value) {
        self.state_mut().record(event, value);
    }

    /// Forgets all output.
    fn clear_output(&mut self) {
        self.state_mut().clear();
    }
}

type UpdateFn =
    dyn FnMut(&EventContext<'_>, &Params) -> Result<Vec<Value>, HandlerError> + Send;

/// Handler backed by a closure.
///
/// The closure's returned values are recorded as output.
///
/// ```
/// use herald_core::{handler_ref, Controller, FnHandler, MemorySink};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let mut ctrl = Controller::new(Arc::new(MemorySink::new()));
/// ctrl.listen("greet", handler_ref(FnHandler::new("hello", |_, params| {
///     Ok(vec![json!(format!("hello {}", params["who"].as_str().unwrap_or("?")))])
/// })));
///
/// let mut params = serde_json::Map::new();
/// params.insert("who".into(), json!("world"));
/// ctrl.run("greet", Some(params));
/// assert_eq!(ctrl.event("greet").unwrap().output("greet"), &[json!("hello world")]);
/// ```
pub struct FnHandler {
    core: Core,
    state: HandlerState,
    func: Box<UpdateFn>,
}

impl FnHandler {
    /// Creates a handler with priority 0.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnMut(&EventContext<'_>, &Params) -> Result<Vec<Value>, HandlerError> + Send + 'static,
    {
        Self {
            core: Core::new(name),
            state: HandlerState::new(),
            func: Box::new(func),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.state = self.state.with_priority(priority);
        self
    }

    /// Locks the priority.
    #[must_use]
    pub fn fixed(mut self) -> Self {
        self.state = self.state.fixed();
        self
    }
}

impl Controllable for FnHandler {
    fn core(&self) -> &Core {
        &self.core
    }

    fn core_mut(&mut self) -> &mut Core {
        &mut self.core
    }
}

impl Handler for FnHandler {
    fn state(&self) -> &HandlerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut HandlerState {
        &mut self.state
    }

    fn update(&mut self, event: &EventContext<'_>, params: &Params) -> Result<(), HandlerError> {
        let values = (self.func)(event, params)?;
        for value in values {
            self.state.record(event.name(), value);
        }
        Ok(())
    }
}

/// Test utilities for handlers.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// What a [`RecordingHandler`] does when updated.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Behavior {
        /// Record output and succeed.
        Record,
        /// Return `HandlerError::Failed` with this message.
        Fail(String),
        /// Panic with this message.
        Panic(String),
        /// Buffer this error on itself and succeed.
        RecordError(String),
    }

    /// A scripted handler for tests.
    ///
    /// Records the params it receives, counts calls, optionally appends its
    /// name to a shared journal (to check ordering across handlers) and
    /// produces either scripted output values or, by default, a copy of the
    /// params.
    pub struct RecordingHandler {
        core: Core,
        state: HandlerState,
        behavior: Behavior,
        scripted: Vec<Value>,
        seen: Vec<Params>,
        /// Number of times `update()` has been called.
        pub call_count: Arc<AtomicUsize>,
        journal: Option<Arc<Mutex<Vec<String>>>>,
    }

    impl RecordingHandler {
        /// Creates a handler that records a copy of its params.
        pub fn new(name: &str) -> Self {
            Self {
                core: Core::new(name),
                state: HandlerState::new(),
                behavior: Behavior::Record,
                scripted: Vec::new(),
                seen: Vec::new(),
                call_count: Arc::new(AtomicUsize::new(0)),
                journal: None,
            }
        }

        /// Creates a handler whose `update` returns an error.
        pub fn failing(name: &str, message: &str) -> Self {
            Self::new(name).with_behavior(Behavior::Fail(message.to_string()))
        }

        /// Creates a handler whose `update` panics.
        pub fn panicking(name: &str, message: &str) -> Self {
            Self::new(name).with_behavior(Behavior::Panic(message.to_string()))
        }

        /// Sets the behavior.
        #[must_use]
        pub fn with_behavior(mut self, behavior: Behavior) -> Self {
            self.behavior = behavior;
            self
        }

        /// Sets the priority.
        #[must_use]
        pub fn with_priority(mut self, priority: i32) -> Self {
            self.state = self.state.with_priority(priority);
            self
        }

        /// Locks the priority.
        #[must_use]
        pub fn fixed(mut self) -> Self {
            self.state = self.state.fixed();
            self
        }

        /// Records these values instead of the params on every run.
        #[must_use]
        pub fn with_output(mut self, values: Vec<Value>) -> Self {
            self.scripted = values;
            self
        }

        /// Appends the handler name to `journal` on every run.
        #[must_use]
        pub fn with_journal(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
            self.journal = Some(journal);
            self
        }

        /// Number of times this handler has been updated.
        pub fn calls(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Params received, one entry per run.
        pub fn seen_params(&self) -> &[Params] {
            &self.seen
        }
    }

    impl Controllable for RecordingHandler {
        fn core(&self) -> &Core {
            &self.core
        }

        fn core_mut(&mut self) -> &mut Core {
            &mut self.core
        }
    }

    impl Handler for RecordingHandler {
        fn state(&self) -> &HandlerState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut HandlerState {
            &mut self.state
        }

        fn update(
            &mut self,
            event: &EventContext<'_>,
            params: &Params,
        ) -> Result<(), HandlerError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.seen.push(params.clone());
            if let Some(journal) = &self.journal {
                journal.lock().push(self.core.name().to_string());
            }

            match &self.behavior {
                Behavior::Record => {}
                Behavior::Fail(message) => {
                    return Err(HandlerError::failed(self.core.name(), message.clone()));
                }
                Behavior::Panic(message) => panic!("{message}"),
                Behavior::RecordError(message) => {
                    self.core.error(message.clone());
                    return Ok(());
                }
            }

            if self.scripted.is_empty() {
                self.state.record(event.name(), Value::Object(params.clone()));
            } else {
                for value in self.scripted.clone() {
                    self.state.record(event.name(), value);
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Behavior, RecordingHandler};
    use super::*;
    use serde_json::json;

    fn params() -> Params {
        let mut p = Params::new();
        p.insert("file".into(), json!("x"));
        p
    }

    // ── Priority ────────────────────────────────────────────

    #[test]
    fn default_priority_is_zero() {
        let h = RecordingHandler::new("h");
        assert_eq!(h.priority(), 0);
    }

    #[test]
    fn set_priority_when_not_fixed() {
        let mut h = RecordingHandler::new("h").with_priority(3);
        assert_eq!(h.priority(), 3);
        assert!(h.set_priority(8));
        assert_eq!(h.priority(), 8);
    }

    #[test]
    fn fixed_priority_rejects_changes() {
        let mut h = RecordingHandler::new("h").with_priority(3).fixed();
        assert!(!h.set_priority(8));
        assert_eq!(h.priority(), 3);
    }

    // ── Output ──────────────────────────────────────────────

    #[test]
    fn output_is_empty_for_unknown_event() {
        let h = RecordingHandler::new("h");
        assert!(h.output("save").is_empty());
    }

    #[test]
    fn update_records_params_under_event_name() {
        let mut h = RecordingHandler::new("h");
        let p = params();
        let ctx = EventContext::new("save", 1, &p, None);
        h.update(&ctx, &p).unwrap();

        assert_eq!(h.output("save"), &[json!({"file": "x"})]);
        assert_eq!(h.calls(), 1);
        assert_eq!(h.seen_params(), &[p]);

        h.clear_output();
        assert!(h.output("save").is_empty());
    }

    #[test]
    fn scripted_output_replaces_params_copy() {
        let mut h = RecordingHandler::new("h").with_output(vec![json!(1), json!(2)]);
        let p = params();
        h.update(&EventContext::new("save", 0, &p, None), &p).unwrap();
        assert_eq!(h.output("save"), &[json!(1), json!(2)]);
    }

    #[test]
    fn failing_handler_returns_error() {
        let mut h = RecordingHandler::failing("h", "nope");
        let p = Params::new();
        let err = h.update(&EventContext::new("save", 0, &p, None), &p).unwrap_err();
        assert_eq!(err, HandlerError::failed("h", "nope"));
        assert!(h.output("save").is_empty());
    }

    #[test]
    fn record_error_behavior_buffers_on_self() {
        let mut h = RecordingHandler::new("h").with_behavior(Behavior::RecordError("bad".into()));
        let p = Params::new();
        h.update(&EventContext::new("save", 0, &p, None), &p).unwrap();
        assert_eq!(h.errors(), &["bad".to_string()]);
    }

    // ── FnHandler ───────────────────────────────────────────

    #[test]
    fn fn_handler_records_returned_values() {
        let mut h = FnHandler::new("upper", |ctx, params| {
            let file = params["file"].as_str().unwrap_or_default();
            Ok(vec![json!(format!("{}:{}", ctx.name(), file.to_uppercase()))])
        })
        .with_priority(4);

        let p = params();
        h.update(&EventContext::new("save", 0, &p, None), &p).unwrap();
        assert_eq!(h.output("save"), &[json!("save:X")]);
        assert_eq!(h.priority(), 4);
        assert_eq!(h.name(), "upper");
        assert_eq!(h.type_name(), "FnHandler");
    }

    #[test]
    fn handler_ref_coerces_to_trait_object() {
        let h = handler_ref(RecordingHandler::new("shared").with_priority(2));
        let guard = h.lock();
        assert_eq!(guard.name(), "shared");
        assert_eq!(guard.priority(), 2);
    }
}
