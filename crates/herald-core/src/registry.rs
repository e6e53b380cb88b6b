//! Dependency registry — lazily resolved, memoized shared params.
//!
//! Dependencies are requested by key. An already constructed instance is
//! stored under an identity key; a name is looked up in the factory table
//! and constructed once, then cached for the controller's lifetime.
//!
//! Participants reach the registry through a [`ControllerHandle`], a weak
//! link that never keeps the controller's state alive on its own.

use crate::controllable::Controllable;
use crate::error::{describe_error, panic_message, FactoryError};
use crate::panic;
use crate::sink::{MessageKind, MessageSink};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// A resolved shared dependency.
pub type SharedParam = Arc<dyn Any + Send + Sync>;

/// A resolved dependency that also carries diagnostics.
pub type ControllableRef = Arc<Mutex<dyn Controllable + Send>>;

/// Key passed to `add_param`.
#[derive(Clone)]
pub enum ParamKey {
    /// Already constructed instance, registered under its identity.
    Instance(SharedParam),
    /// Name resolved through the factory table.
    Type(String),
}

impl ParamKey {
    /// Wraps a value as an instance key.
    pub fn instance<T: Any + Send + Sync>(value: T) -> Self {
        Self::Instance(Arc::new(value))
    }

    /// Key under which this entry is stored.
    #[must_use]
    pub fn lookup_key(&self) -> String {
        match self {
            Self::Instance(value) => instance_key(value),
            Self::Type(name) => type_key(name),
        }
    }
}

impl From<&str> for ParamKey {
    fn from(name: &str) -> Self {
        Self::Type(name.to_string())
    }
}

impl From<String> for ParamKey {
    fn from(name: String) -> Self {
        Self::Type(name)
    }
}

impl From<SharedParam> for ParamKey {
    fn from(value: SharedParam) -> Self {
        Self::Instance(value)
    }
}

impl fmt::Debug for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Instance(value) => f.debug_tuple("Instance").field(&instance_key(value)).finish(),
            Self::Type(name) => f.debug_tuple("Type").field(name).finish(),
        }
    }
}

/// Identity key of an instance: its address.
#[must_use]
pub fn instance_key(value: &SharedParam) -> String {
    format!("instance:{:p}", Arc::as_ptr(value))
}

/// Lookup key of a name: whitespace and trailing path separators removed.
///
/// ```
/// use herald_core::registry::type_key;
///
/// assert_eq!(type_key(" app::Mailer:: "), "app::Mailer");
/// assert_eq!(type_key("Cache\\"), "Cache");
/// ```
#[must_use]
pub fn type_key(name: &str) -> String {
    name.trim()
        .trim_end_matches(|c| c == '\\' || c == ':')
        .to_string()
}

type PlainCtor = dyn Fn() -> Result<SharedParam, FactoryError> + Send + Sync;
type ControllableCtor = dyn Fn(&ControllerHandle) -> Result<Resolved, FactoryError> + Send + Sync;

/// Named constructor for a dependency.
///
/// The variant is the capability marker: controllable constructors
/// receive the controller handle, plain ones receive nothing.
#[derive(Clone)]
pub enum Factory {
    /// Built with no arguments.
    Plain(Arc<PlainCtor>),
    /// Built with a handle to the owning controller.
    Controllable(Arc<ControllableCtor>),
}

impl Factory {
    /// Plain constructor.
    pub fn plain<T, F>(ctor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> Result<T, FactoryError> + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(move || {
            ctor().map(|value| Arc::new(value) as SharedParam)
        }))
    }

    /// Controllable constructor.
    ///
    /// The instance is stored as `Arc<Mutex<T>>`; fetch it with
    /// `get_param_as::<Mutex<T>>()`.
    pub fn controllable<T, F>(ctor: F) -> Self
    where
        T: Controllable + Send + 'static,
        F: Fn(&ControllerHandle) -> Result<T, FactoryError> + Send + Sync + 'static,
    {
        Self::Controllable(Arc::new(move |handle: &ControllerHandle| {
            let shared = Arc::new(Mutex::new(ctor(handle)?));
            let value: SharedParam = shared.clone();
            let controllable: ControllableRef = shared;
            Ok(Resolved {
                value,
                controllable: Some(controllable),
            })
        }))
    }

    /// Returns `true` for controllable constructors.
    #[must_use]
    pub fn is_controllable(&self) -> bool {
        matches!(self, Self::Controllable(_))
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Factory::Plain"),
            Self::Controllable(_) => f.write_str("Factory::Controllable"),
        }
    }
}

/// Entry of the params table.
#[derive(Clone)]
pub struct Resolved {
    value: SharedParam,
    controllable: Option<ControllableRef>,
}

impl Resolved {
    fn plain(value: SharedParam) -> Self {
        Self {
            value,
            controllable: None,
        }
    }
}

#[derive(Default)]
struct ParamTable {
    entries: HashMap<String, Resolved>,
    order: Vec<String>,
}

/// State shared between a controller and the handles it gives out.
pub(crate) struct Shared {
    params: Mutex<ParamTable>,
    resolving: Mutex<HashSet<String>>,
    factories: RwLock<HashMap<String, Factory>>,
    sink: Arc<dyn MessageSink>,
}

impl Shared {
    pub(crate) fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            params: Mutex::new(ParamTable::default()),
            resolving: Mutex::new(HashSet::new()),
            factories: RwLock::new(HashMap::new()),
            sink,
        }
    }

    pub(crate) fn sink(&self) -> &Arc<dyn MessageSink> {
        &self.sink
    }

    pub(crate) fn register_factory(&self, name: &str, factory: Factory) {
        let key = type_key(name);
        debug!(key = %key, controllable = factory.is_controllable(), "factory registered");
        self.factories.write().insert(key, factory);
    }

    pub(crate) fn has_factory(&self, name: &str) -> bool {
        self.factories.read().contains_key(&type_key(name))
    }

    pub(crate) fn get_param(&self, key: &str) -> Option<SharedParam> {
        let params = self.params.lock();
        params
            .entries
            .get(key)
            .or_else(|| params.entries.get(&type_key(key)))
            .map(|r| Arc::clone(&r.value))
    }

    pub(crate) fn param_count(&self) -> usize {
        self.params.lock().entries.len()
    }

    /// Resolves each key; returns how many new entries were stored.
    pub(crate) fn add_params(
        self: &Arc<Self>,
        keys: impl IntoIterator<Item = ParamKey>,
    ) -> usize {
        let mut added = 0;
        for key in keys {
            if self.resolve(key) {
                added += 1;
            }
        }
        added
    }

    fn resolve(self: &Arc<Self>, key: ParamKey) -> bool {
        match key {
            ParamKey::Instance(value) => {
                let k = instance_key(&value);
                self.insert(k, Resolved::plain(value))
            }
            ParamKey::Type(name) => {
                let k = type_key(&name);
                if k.is_empty() || self.params.lock().entries.contains_key(&k) {
                    return false;
                }

                let factory = self.factories.read().get(&k).cloned();
                let resolved = match factory {
                    Some(factory) => match self.construct(&k, &factory) {
                        Ok(resolved) => resolved,
                        Err(e) => {
                            warn!(key = %k, error = %e, "dependency construction failed");
                            self.sink
                                .message(MessageKind::Error, &format!("Controller {}", describe_error(&e)));
                            return false;
                        }
                    },
                    None => Resolved::plain(Arc::new(k.clone())),
                };
                self.insert(k, resolved)
            }
        }
    }

    fn construct(self: &Arc<Self>, key: &str, factory: &Factory) -> Result<Resolved, FactoryError> {
        if !self.resolving.lock().insert(key.to_string()) {
            return Err(FactoryError::Circular(key.to_string()));
        }

        let handle = ControllerHandle::new(self);
        let outcome = panic::catch(|| match factory {
            Factory::Plain(ctor) => ctor().map(Resolved::plain),
            Factory::Controllable(ctor) => ctor(&handle),
        });
        self.resolving.lock().remove(key);

        match outcome {
            Ok(result) => result,
            Err(payload) => Err(FactoryError::Panicked {
                key: key.to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// First insert wins; a losing controllable is finalized right away.
    fn insert(&self, key: String, resolved: Resolved) -> bool {
        let loser = {
            let mut params = self.params.lock();
            if params.entries.contains_key(&key) {
                Some(resolved)
            } else {
                debug!(key = %key, "dependency resolved");
                params.order.push(key.clone());
                params.entries.insert(key, resolved);
                None
            }
        };

        match loser {
            Some(Resolved {
                controllable: Some(c),
                ..
            }) => {
                c.lock().finalize(self.sink.as_ref());
                false
            }
            Some(_) => false,
            None => true,
        }
    }

    /// Removes every entry, finalizing controllable ones in resolution order.
    pub(crate) fn drain_params(&self) -> usize {
        let table = std::mem::take(&mut *self.params.lock());
        let mut entries = table.entries;
        let mut flushed = 0;
        for key in table.order {
            if let Some(Resolved {
                controllable: Some(c),
                ..
            }) = entries.remove(&key)
            {
                flushed += c.lock().finalize(self.sink.as_ref());
            }
        }
        flushed
    }
}

/// Non-owning link from a participant back to its controller.
///
/// Every operation is a no-op (or returns `None`) once the controller has
/// been dropped.
#[derive(Clone)]
pub struct ControllerHandle {
    shared: Weak<Shared>,
}

impl ControllerHandle {
    pub(crate) fn new(shared: &Arc<Shared>) -> Self {
        Self {
            shared: Arc::downgrade(shared),
        }
    }

    /// A handle not linked to any controller.
    #[must_use]
    pub fn detached() -> Self {
        Self { shared: Weak::new() }
    }

    /// Returns `true` while the controller is alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Resolves dependencies. See [`Controller::add_param`](crate::Controller::add_param).
    pub fn add_param(&self, keys: impl IntoIterator<Item = ParamKey>) -> usize {
        match self.shared.upgrade() {
            Some(shared) => shared.add_params(keys),
            None => 0,
        }
    }

    /// Returns a resolved dependency.
    #[must_use]
    pub fn get_param(&self, key: &str) -> Option<SharedParam> {
        self.shared.upgrade()?.get_param(key)
    }

    /// Returns a resolved dependency downcast to `T`.
    #[must_use]
    pub fn get_param_as<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.get_param(key)?.downcast::<T>().ok()
    }

    /// Resolves `key` if needed, then returns it.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<SharedParam> {
        let shared = self.shared.upgrade()?;
        shared.add_params([ParamKey::from(key)]);
        shared.get_param(key)
    }

    /// Sends a message straight to the controller's sink.
    pub fn message(&self, kind: MessageKind, text: &str) {
        if let Some(shared) = self.shared.upgrade() {
            shared.sink().message(kind, text);
        }
    }
}

impl fmt::Debug for ControllerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
