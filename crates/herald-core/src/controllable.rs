//! Shared base behavior of events and handlers.
//!
//! Every participant owned by a [`Controller`](crate::Controller) carries a
//! [`Core`]: identity, settings, a diagnostics buffer and an optional link
//! back to the controller. The [`Controllable`] trait exposes that state
//! through default methods, so implementors only provide `core()` and
//! `core_mut()`.

use crate::json::{format_settings, Params, ParamsInput};
use crate::registry::{ControllerHandle, ParamKey, SharedParam};
use crate::sink::{MessageKind, MessageSink};
use std::fmt;

/// Identity, settings and diagnostics of one participant.
pub struct Core {
    id: Option<u64>,
    name: String,
    params: Params,
    errors: Vec<String>,
    notices: Vec<String>,
    controller: Option<ControllerHandle>,
}

impl Core {
    /// Creates a core with an explicit name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            params: Params::new(),
            errors: Vec::new(),
            notices: Vec::new(),
            controller: None,
        }
    }

    /// Creates a core named after `T`.
    ///
    /// ```
    /// use herald_core::Core;
    ///
    /// struct AuditTrail;
    /// assert_eq!(Core::of::<AuditTrail>().name(), "AuditTrail");
    /// ```
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self::new(short_type_name::<T>())
    }

    /// Links the core to a controller.
    #[must_use]
    pub fn with_controller(mut self, controller: ControllerHandle) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Immutable identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Numeric id, 0 while unset.
    pub fn id(&self) -> u64 {
        self.id.unwrap_or(0)
    }

    /// Sets the id once. Returns `false` (and changes nothing) if already set.
    pub fn set_id(&mut self, id: u64) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id);
        true
    }

    /// Current settings.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replaces settings using the parse-on-assign rule.
    pub fn set_params(&mut self, input: impl Into<ParamsInput>) {
        self.params = format_settings(input);
    }

    /// Buffered errors.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Buffered notices.
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Buffers an error for the next flush.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Buffers a notice for the next flush.
    pub fn notice(&mut self, message: impl Into<String>) {
        self.notices.push(message.into());
    }

    /// Controller link, if any.
    pub fn controller(&self) -> Option<&ControllerHandle> {
        self.controller.as_ref()
    }

    /// Sends buffered diagnostics to `sink` as `"{type_name} {message}"` and
    /// empties the buffers. Returns the number of messages sent.
    pub fn flush(&mut self, type_name: &str, sink: &dyn MessageSink) -> usize {
        let errors = std::mem::take(&mut self.errors);
        let notices = std::mem::take(&mut self.notices);

        for message in &errors {
            sink.message(MessageKind::Error, &format!("{type_name} {message}"));
        }
        for message in &notices {
            sink.message(MessageKind::Notice, &format!("{type_name} {message}"));
        }

        errors.len() + notices.len()
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("params", &self.params)
            .field("errors", &self.errors.len())
            .field("notices", &self.notices.len())
            .field("linked", &self.controller.is_some())
            .finish()
    }
}

/// Capability shared by every controller-owned participant.
///
/// Implementors embed a [`Core`] and return it from `core()`/`core_mut()`;
/// everything else has a default.
pub trait Controllable {
    /// Shared state.
    fn core(&self) -> &Core;

    /// Shared state, mutable.
    fn core_mut(&mut self) -> &mut Core;

    /// Short name of the concrete type, used to prefix flushed diagnostics.
    fn type_name(&self) -> &'static str {
        short_type_name::<Self>()
    }

    /// Immutable identity.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Numeric id, 0 while unset.
    fn id(&self) -> u64 {
        self.core().id()
    }

    /// Write-once id setter.
    fn set_id(&mut self, id: u64) -> bool {
        self.core_mut().set_id(id)
    }

    /// Current settings.
    fn params(&self) -> &Params {
        self.core().params()
    }

    /// Replaces settings. Strings are parsed only if they hold a JSON object.
    fn set_params(&mut self, input: ParamsInput) {
        self.core_mut().set_params(input);
    }

    /// Buffered errors.
    fn errors(&self) -> &[String] {
        self.core().errors()
    }

    /// Buffered notices.
    fn notices(&self) -> &[String] {
        self.core().notices()
    }

    /// Buffers an error.
    fn add_error(&mut self, message: &str) {
        self.core_mut().error(message);
    }

    /// Buffers a notice.
    fn add_notice(&mut self, message: &str) {
        self.core_mut().notice(message);
    }

    /// Controller link, if any.
    fn controller(&self) -> Option<&ControllerHandle> {
        self.core().controller()
    }

    /// Resolves `key` through the controller, then returns it.
    ///
    /// `None` without a controller link, when the controller is gone, or
    /// when resolution failed.
    fn controller_param(&self, key: &str) -> Option<SharedParam> {
        let controller = self.controller()?;
        controller.add_param([ParamKey::from(key)]);
        controller.get_param(key)
    }

    /// Flushes buffered diagnostics to `sink`, exactly once per message.
    fn finalize(&mut self, sink: &dyn MessageSink) -> usize {
        let type_name = self.type_name();
        self.core_mut().flush(type_name, sink)
    }
}

/// Last path segment of `T`'s type name, without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
