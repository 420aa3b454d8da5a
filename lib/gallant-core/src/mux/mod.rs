//! Predicate-gated sub-pipelines.
//!
//! A [`Mux`] is a [`Plugin`] wrapping its own [`Middleware`] layer behind a list
//! of matchers. When every matcher accepts the context, the inner layer runs
//! for the current phase; otherwise the mux is a pass-through.
//!
//! ```
//! use gallant_core::mux::{self, matchers};
//! use gallant_core::Method;
//!
//! let only_get = mux::all([matchers::method(Method::Get)]);
//! only_get.use_request(|mut ctx, h| {
//!     ctx.request_mut().set_header("X-Cached", "maybe").ok();
//!     h.next(ctx);
//! });
//!
//! let reads_or_errors = mux::any([
//!     matchers::methods([Method::Get, Method::Head]),
//!     matchers::error(),
//! ]);
//! # drop(reads_or_errors);
//! ```

pub mod matchers;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Context, Handler, Middleware, Phase, Plugin, PluginFlags, Stack};

/// Predicate over the context, evaluated once per phase the mux takes part in.
pub type Matcher = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Mux accepting the context when every matcher accepts it.
pub fn all(matchers: impl IntoIterator<Item = Matcher>) -> Mux {
    let mux = Mux::new();
    for matcher in matchers {
        mux.add_matcher(matcher);
    }
    mux
}

/// Mux accepting the context when at least one matcher accepts it.
pub fn any(matchers: impl IntoIterator<Item = Matcher>) -> Mux {
    let matchers: Vec<Matcher> = matchers.into_iter().collect();
    let mux = Mux::new();
    mux.add_matcher(Arc::new(move |ctx: &Context| {
        matchers.iter().any(|matcher| matcher(ctx))
    }));
    mux
}

/// Plugin running an inner layer when its matchers accept the context.
///
/// Clones share the same matchers, inner layer and flags: a clone is a handle
/// on the mux registered in a middleware.
#[derive(Clone, Default)]
pub struct Mux {
    flags: Arc<PluginFlags>,
    matchers: Arc<RwLock<Vec<Matcher>>>,
    layer: Arc<Middleware>,
}

impl Mux {
    /// Create a mux without matchers: it accepts every context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a matcher.
    pub fn add_matcher(&self, matcher: Matcher) -> &Self {
        self.matchers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(matcher);
        self
    }

    /// Returns `true` if every matcher accepts the context.
    #[must_use]
    pub fn matches(&self, ctx: &Context) -> bool {
        self.matchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .all(|matcher| matcher(ctx))
    }

    /// Use this mux as a matcher of another one.
    #[must_use]
    pub fn into_matcher(self) -> Matcher {
        Arc::new(move |ctx: &Context| self.matches(ctx))
    }

    /// Inner layer.
    #[must_use]
    pub fn layer(&self) -> &Arc<Middleware> {
        &self.layer
    }

    /// Register a plugin in the inner layer.
    pub fn use_plugin(&self, plugin: impl Plugin + 'static) -> &Self {
        self.layer.use_plugin(plugin);
        self
    }

    /// Register a shared plugin in the inner layer.
    pub fn use_arc(&self, plugin: Arc<dyn Plugin>) -> &Self {
        self.layer.use_arc(plugin);
        self
    }

    /// Register a phase handler in the inner layer.
    pub fn use_handler<F>(&self, phase: impl Into<Phase>, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.layer.use_handler(phase, handler);
        self
    }

    /// Register a `request` phase handler in the inner layer.
    pub fn use_request<F>(&self, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.layer.use_request(handler);
        self
    }

    /// Register a `response` phase handler in the inner layer.
    pub fn use_response<F>(&self, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.layer.use_response(handler);
        self
    }

    /// Register an `error` phase handler in the inner layer.
    pub fn use_error<F>(&self, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.layer.use_error(handler);
        self
    }

    /// Attach a parent to the inner layer.
    pub fn use_parent(&self, parent: Arc<Middleware>) -> &Self {
        self.layer.use_parent(parent);
        self
    }

    /// Remove every plugin of the inner layer.
    pub fn flush(&self) {
        self.layer.flush();
    }

    /// Replace the inner stack.
    pub fn set_stack(&self, stack: Stack) {
        self.layer.set_stack(stack);
    }

    /// Snapshot of the inner stack.
    #[must_use]
    pub fn stack(&self) -> Stack {
        self.layer.stack()
    }
}

impl Plugin for Mux {
    fn flags(&self) -> &PluginFlags {
        &self.flags
    }

    fn handle(&self, phase: &Phase, ctx: Context, handler: Handler) {
        if !self.matches(&ctx) {
            handler.next(ctx);
            return;
        }

        let phase = ctx.phase().unwrap_or_else(|| phase.clone());
        self.layer.trigger(
            &phase,
            ctx,
            Handler::new(move |mut ctx| match ctx.take_error() {
                Some(error) => handler.error(ctx, error),
                None if ctx.is_stopped() => handler.stop(ctx),
                None => handler.next(ctx),
            }),
        );
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let matchers = self
            .matchers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("Mux")
            .field("matchers", &matchers)
            .field("layer", &self.layer)
            .field("flags", &self.flags)
            .finish()
    }
}
