//! Panic capture.
//!
//! Dispatch and construction run under [`catch`], which marks the current
//! thread so an installed [`PanicCapture`] hook skips panics that are about
//! to be recovered and reported as handler or factory errors.

use crate::error::{describe_error, panic_message, UncaughtPanic};
use crate::registry::Shared;
use crate::sink::{MessageKind, MessageSink};
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::{Arc, Weak};
use tracing::debug;

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

thread_local! {
    static CATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Runs `f`, turning a panic into `Err(payload)`.
pub(crate) fn catch<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    CATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    CATCH_DEPTH.with(|depth| depth.set(depth.get() - 1));
    outcome
}

fn is_catching() -> bool {
    CATCH_DEPTH
        .try_with(|depth| depth.get() > 0)
        .unwrap_or(false)
}

/// Renders hook info as an [`UncaughtPanic`].
fn uncaught(info: &PanicHookInfo<'_>) -> UncaughtPanic {
    UncaughtPanic {
        location: info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()))
            .unwrap_or_else(|| "unknown location".to_string()),
        message: panic_message(info.payload()),
    }
}

/// An installed process panic hook reporting to a controller's sink.
///
/// The hook chains to the one it replaced. [`PanicCapture::restore`] puts
/// the replaced hook back.
pub(crate) struct PanicCapture {
    previous: Arc<PanicHook>,
}

impl PanicCapture {
    /// Installs the hook. Panics from any thread are reported while the
    /// controller state is alive, except those recovered by [`catch`].
    pub(crate) fn install(shared: Weak<Shared>) -> Self {
        let previous: Arc<PanicHook> = Arc::new(panic::take_hook());
        let chained = Arc::clone(&previous);

        panic::set_hook(Box::new(move |info| {
            if !is_catching() {
                if let Some(shared) = shared.upgrade() {
                    let text = format!("Controller {}", describe_error(&uncaught(info)));
                    shared.sink().message(MessageKind::Error, &text);
                }
            }
            chained(info);
        }));
        debug!("panic capture installed");

        Self { previous }
    }

    /// Puts back the replaced hook.
    ///
    /// Skipped while the current thread is unwinding, where the hook
    /// cannot be changed.
    pub(crate) fn restore(self) {
        if std::thread::panicking() {
            return;
        }
        let previous = self.previous;
        panic::set_hook(Box::new(move |info| previous(info)));
        debug!("panic capture restored");
    }
}
