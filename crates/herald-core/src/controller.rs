//! Controller — owner of events and shared dependencies.

use crate::controllable::{Controllable, Core};
use crate::error::{describe_error, FactoryError};
use crate::event::Event;
use crate::handler::HandlerRef;
use crate::json::Params;
use crate::panic::PanicCapture;
use crate::registry::{ControllerHandle, Factory, ParamKey, Shared, SharedParam};
use crate::sink::{MessageKind, MessageSink, TracingSink};
use std::any::Any;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::sync::Arc;
use tracing::{debug, info};

/// Event registry plus memoized dependency registry.
///
/// Events are created on first use and live until [`Controller::unregister`]
/// or [`Controller::close`]. Dependencies are resolved once and shared by
/// every participant through its [`ControllerHandle`].
///
/// # Example
///
/// ```
/// use herald_core::{handler_ref, Controller, FnHandler, MemorySink};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let mut ctrl = Controller::new(sink.clone());
/// ctrl.listen("save", handler_ref(FnHandler::new("audit", |_, _| Ok(vec![json!("audited")]))));
///
/// assert!(ctrl.run("save", None));
/// assert!(!ctrl.run("missing", None));
/// assert_eq!(ctrl.event("save").unwrap().output("save"), &[json!("audited")]);
/// ```
pub struct Controller {
    shared: Arc<Shared>,
    events: HashMap<String, Event>,
    next_event_id: u64,
    panic_capture: Option<PanicCapture>,
    closed: bool,
}

impl Controller {
    /// Creates a controller that finalizes diagnostics into `sink`.
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            shared: Arc::new(Shared::new(sink)),
            events: HashMap::new(),
            next_event_id: 1,
            panic_capture: None,
            closed: false,
        }
    }

    /// Handle for participants created outside the controller.
    pub fn handle(&self) -> ControllerHandle {
        ControllerHandle::new(&self.shared)
    }

    /// The diagnostics sink.
    pub fn sink(&self) -> &Arc<dyn MessageSink> {
        self.shared.sink()
    }

    // ── Events ──────────────────────────────────────────────

    /// Returns the event named `name`, creating it if needed.
    pub fn add_event(&mut self, name: &str) -> &mut Event {
        let shared = &self.shared;
        let next_id = &mut self.next_event_id;
        self.events.entry(name.to_string()).or_insert_with(|| {
            let mut core = Core::new(name).with_controller(ControllerHandle::new(shared));
            core.set_id(*next_id);
            *next_id += 1;
            debug!(event = %name, id = core.id(), "event created");
            Event::with_core(core)
        })
    }

    /// Attaches `handler` to `name` with the handler's own priority.
    ///
    /// Returns `true` if the handler was newly attached.
    pub fn listen(&mut self, name: &str, handler: HandlerRef) -> bool {
        self.add_event(name).attach(handler, None)
    }

    /// Attaches `handler` to `name` with an explicit priority.
    pub fn listen_with_priority(&mut self, name: &str, handler: HandlerRef, priority: i32) -> bool {
        self.add_event(name).attach(handler, Some(priority))
    }

    /// Detaches `handler` from `name`. Returns whether the event exists.
    pub fn dismiss(&mut self, name: &str, handler: &HandlerRef) -> bool {
        match self.events.get_mut(name) {
            Some(event) => {
                event.detach(handler);
                true
            }
            None => false,
        }
    }

    /// Removes the event `name` and finalizes it. Returns whether it existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.remove_event(name).is_some()
    }

    /// Removes the event `name`, finalizes it and hands it back.
    pub fn remove_event(&mut self, name: &str) -> Option<Event> {
        let mut event = self.events.remove(name)?;
        event.finalize(self.shared.sink().as_ref());
        debug!(event = %name, "event removed");
        Some(event)
    }

    /// Notifies the event `name`.
    ///
    /// Returns `false` and does nothing if no such event exists.
    pub fn run(&mut self, name: &str, params: Option<Params>) -> bool {
        match self.events.get_mut(name) {
            Some(event) => {
                event.notify(params);
                true
            }
            None => {
                debug!(event = %name, "run on unknown event");
                false
            }
        }
    }

    /// Looks up an event.
    pub fn event(&self, name: &str) -> Option<&Event> {
        self.events.get(name)
    }

    /// Looks up an event mutably.
    pub fn event_mut(&mut self, name: &str) -> Option<&mut Event> {
        self.events.get_mut(name)
    }

    /// Registered event names, sorted.
    pub fn event_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.events.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    // ── Dependencies ────────────────────────────────────────

    /// Registers a named constructor.
    pub fn register_factory(&self, name: &str, factory: Factory) {
        self.shared.register_factory(name, factory);
    }

    /// Registers a plain constructor.
    pub fn register<T, F>(&self, name: &str, ctor: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> Result<T, FactoryError> + Send + Sync + 'static,
    {
        self.register_factory(name, Factory::plain(ctor));
    }

    /// Registers a constructor for a participant that needs the controller.
    ///
    /// The instance is finalized when the controller closes.
    pub fn register_controllable<T, F>(&self, name: &str, ctor: F)
    where
        T: Controllable + Send + 'static,
        F: Fn(&ControllerHandle) -> Result<T, FactoryError> + Send + Sync + 'static,
    {
        self.register_factory(name, Factory::controllable(ctor));
    }

    /// Returns `true` if a constructor is registered for `name`.
    pub fn has_factory(&self, name: &str) -> bool {
        self.shared.has_factory(name)
    }

    /// Resolves dependencies and caches them.
    ///
    /// Already-resolved keys are skipped. A failing constructor is reported
    /// to the sink and the remaining keys are still resolved. Returns how
    /// many new entries were stored.
    pub fn add_param(&self, keys: impl IntoIterator<Item = ParamKey>) -> usize {
        self.shared.add_params(keys)
    }

    /// Returns a resolved dependency, `None` if unresolved.
    pub fn get_param(&self, key: &str) -> Option<SharedParam> {
        self.shared.get_param(key)
    }

    /// Returns a resolved dependency downcast to `T`.
    pub fn get_param_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get_param(key)?.downcast::<T>().ok()
    }

    /// Resolves `key` if needed, then returns it.
    pub fn param(&self, key: &str) -> Option<SharedParam> {
        self.add_param([ParamKey::from(key)]);
        self.get_param(key)
    }

    /// Number of resolved dependencies.
    pub fn param_count(&self) -> usize {
        self.shared.param_count()
    }

    // ── Diagnostics ─────────────────────────────────────────

    /// Reports an error, with its source chain, straight to the sink.
    pub fn error(&self, err: &(dyn StdError + 'static)) {
        self.message(MessageKind::Error, &format!("Controller {}", describe_error(err)));
    }

    /// Reports a notice straight to the sink.
    pub fn notice(&self, message: &str) {
        self.message(MessageKind::Notice, &format!("Controller {message}"));
    }

    /// Sends a message of any kind straight to the sink.
    pub fn message(&self, kind: MessageKind, text: &str) {
        self.shared.sink().message(kind, text);
    }

    /// Reports panics that escape handlers and constructors to the sink.
    ///
    /// Installs a process panic hook that chains to the current one; panics
    /// already recovered by dispatch or construction are skipped. The
    /// previous hook is restored on [`Controller::close`]. Returns `false`
    /// if capture is already on.
    pub fn capture_panics(&mut self) -> bool {
        if self.panic_capture.is_some() {
            return false;
        }
        self.panic_capture = Some(PanicCapture::install(Arc::downgrade(&self.shared)));
        true
    }

    /// Returns `true` while [`Controller::capture_panics`] is in effect.
    pub fn is_capturing_panics(&self) -> bool {
        self.panic_capture.is_some()
    }

    /// Removes and finalizes every event, finalizes dependencies, then
    /// flushes the sink and restores the panic hook.
    ///
    /// The controller stays usable. Events created afterwards are
    /// finalized by the next `close` or the drop; a `close` with nothing
    /// new to report does not flush again.
    pub fn close(&mut self) {
        if let Some(capture) = self.panic_capture.take() {
            capture.restore();
        }

        let sink = Arc::clone(self.shared.sink());
        let mut events: Vec<(String, Event)> = std::mem::take(&mut self.events).into_iter().collect();
        events.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let count = events.len();
        let mut flushed = 0;
        for (_, mut event) in events {
            flushed += event.finalize(sink.as_ref());
        }
        flushed += self.shared.drain_params();

        if self.closed && flushed == 0 {
            return;
        }
        sink.flush();

        if self.closed {
            debug!(events = count, messages = flushed, "late diagnostics flushed");
        } else {
            info!(events = count, messages = flushed, "controller closed");
        }
        self.closed = true;
    }
}

impl Default for Controller {
    /// A controller reporting to `tracing`.
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("events", &self.event_names())
            .field("params", &self.param_count())
            .field("closed", &self.closed)
            .finish()
    }
}
