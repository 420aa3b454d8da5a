//! Once-only continuation handed to every plugin.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Context, Error};

/// Plugin handler function: receives the context and the continuation to call.
pub type HandlerFn = Arc<dyn Fn(Context, Handler) + Send + Sync>;

type Downstream = Box<dyn FnOnce(Context) + Send>;

/// Continuation of a middleware chain.
///
/// Exactly one of [`next`](Self::next), [`stop`](Self::stop) or
/// [`error`](Self::error) resumes the chain; any later call on this handler or
/// one of its clones is a no-op. A handler is `Send` and cheap to clone, so a
/// plugin may move it into a spawned task and resume from there.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use gallant_core::{Context, Handler};
///
/// let calls = Arc::new(Mutex::new(0));
/// let counter = Arc::clone(&calls);
/// let handler = Handler::new(move |_ctx| *counter.lock().unwrap() += 1);
///
/// handler.next(Context::new());
/// handler.stop(Context::new());
///
/// assert_eq!(*calls.lock().unwrap(), 1);
/// assert!(handler.is_done());
/// ```
#[derive(Clone)]
pub struct Handler {
    inner: Arc<Inner>,
}

struct Inner {
    fired: AtomicBool,
    downstream: Mutex<Option<Downstream>>,
}

impl Handler {
    /// Wrap a downstream function.
    pub fn new(downstream: impl FnOnce(Context) + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                fired: AtomicBool::new(false),
                downstream: Mutex::new(Some(Box::new(downstream))),
            }),
        }
    }

    /// Resume the chain with the given context.
    pub fn next(&self, ctx: Context) {
        self.fire(ctx);
    }

    /// Mark the context as stopped and resume the chain.
    pub fn stop(&self, mut ctx: Context) {
        ctx.set_stopped(true);
        self.fire(ctx);
    }

    /// Record the error in the context and resume the chain.
    pub fn error(&self, mut ctx: Context, error: impl Into<Error>) {
        ctx.set_error(error);
        self.fire(ctx);
    }

    /// Returns `true` once the downstream function was called.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    fn fire(&self, ctx: Context) {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        let downstream = self
            .inner
            .downstream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(downstream) = downstream {
            downstream(ctx);
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}
