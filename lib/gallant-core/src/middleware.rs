//! Middleware layer: the phase execution engine.
//!
//! A [`Middleware`] holds an ordered plugin stack and an optional parent layer.
//! Running a phase runs the parent first, then the local plugins in
//! registration order, each one resuming the next through its [`Handler`].
//!
//! Between two plugins the chain fast-forwards to its end when:
//! - the phase is `error` and the context carries no error;
//! - any other phase, the context carries an error;
//! - any phase but `stop`, the context is stopped.
//!
//! # Example
//!
//! ```
//! use gallant_core::{Context, Middleware, Phase};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> gallant_core::Result<()> {
//! let middleware = Middleware::new();
//! middleware.use_request(|mut ctx, h| {
//!     ctx.request_mut().set_header("X-Trace", "1").ok();
//!     h.next(ctx);
//! });
//!
//! let ctx = middleware.run(Phase::REQUEST, Context::new()).await?;
//! assert_eq!(ctx.request().header("x-trace"), Some("1"));
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::oneshot;

use crate::context::PHASE_KEY;
use crate::{Context, Error, Handler, Phase, PhasePlugin, Plugin, Result};

/// Plugin stack of a layer.
pub type Stack = Vec<Arc<dyn Plugin>>;

/// Ordered, inheritable plugin collection executed per phase.
///
/// Every operation takes `&self`: registration is synchronised and safe to call
/// while phases are running, which only ever see a snapshot of the stack.
#[derive(Default)]
pub struct Middleware {
    parent: RwLock<Option<Arc<Middleware>>>,
    stack: Arc<RwLock<Stack>>,
}

impl Middleware {
    /// Create an empty layer without parent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty layer inheriting from `parent`.
    #[must_use]
    pub fn with_parent(parent: Arc<Self>) -> Self {
        let middleware = Self::new();
        middleware.use_parent(parent);
        middleware
    }

    /// Register a plugin.
    pub fn use_plugin(&self, plugin: impl Plugin + 'static) -> &Self {
        self.use_arc(Arc::new(plugin))
    }

    /// Register a shared plugin, keeping a handle on it for the caller.
    pub fn use_arc(&self, plugin: Arc<dyn Plugin>) -> &Self {
        self.stack
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(plugin);
        self
    }

    /// Register a handler for a specific phase.
    pub fn use_handler<F>(&self, phase: impl Into<Phase>, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_plugin(PhasePlugin::for_phase(phase, handler))
    }

    /// Register a `request` phase handler.
    pub fn use_request<F>(&self, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_plugin(PhasePlugin::request(handler))
    }

    /// Register a `response` phase handler.
    pub fn use_response<F>(&self, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_plugin(PhasePlugin::response(handler))
    }

    /// Register an `error` phase handler.
    pub fn use_error<F>(&self, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_plugin(PhasePlugin::error(handler))
    }

    /// Attach a parent layer, run before this one.
    pub fn use_parent(&self, parent: Arc<Self>) -> &Self {
        *self.parent.write().unwrap_or_else(PoisonError::into_inner) = Some(parent);
        self
    }

    /// Parent layer, if any.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Self>> {
        self.parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove every local plugin.
    pub fn flush(&self) {
        self.stack
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Replace the local stack.
    pub fn set_stack(&self, stack: Stack) {
        *self.stack.write().unwrap_or_else(PoisonError::into_inner) = stack;
    }

    /// Snapshot of the local stack.
    #[must_use]
    pub fn stack(&self) -> Stack {
        self.stack
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of local plugins, removed ones included until the next run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` without local plugins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `phase` and wait for the chain to complete.
    ///
    /// Plugins may resume their continuation from another task: this future
    /// completes when the terminal continuation fires. A plugin that keeps its
    /// continuation forever without calling it blocks the future forever.
    ///
    /// The parent layer runs first. Its error or stop skips this layer, except
    /// in the `error` phase and, for a stop, in the `stop` phase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Abandoned`] if every copy of a continuation in the chain
    /// was dropped without being called.
    pub async fn run(&self, phase: impl Into<Phase>, ctx: Context) -> Result<Context> {
        let phase = phase.into();
        let (tx, rx) = oneshot::channel();
        self.trigger(
            &phase,
            ctx,
            Handler::new(move |ctx| {
                let _ = tx.send(ctx);
            }),
        );
        rx.await.map_err(|_| Error::Abandoned { phase })
    }

    /// Run `phase` in continuation-passing style: `done` receives the final
    /// context.
    pub fn trigger(&self, phase: &Phase, ctx: Context, done: Handler) {
        let stack = Arc::clone(&self.stack);
        let Some(parent) = self.parent() else {
            run_stack(&stack, phase, ctx, done);
            return;
        };

        let local_phase = phase.clone();
        parent.trigger(
            phase,
            ctx,
            Handler::new(move |ctx| {
                if parent_short_circuits(&local_phase, &ctx) {
                    done.next(ctx);
                    return;
                }
                run_stack(&stack, &local_phase, ctx, done);
            }),
        );
    }
}

impl Clone for Middleware {
    /// Independent layer with a copy of the stack and the same parent.
    fn clone(&self) -> Self {
        Self {
            parent: RwLock::new(self.parent()),
            stack: Arc::new(RwLock::new(self.stack())),
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("plugins", &self.len())
            .field("parent", &self.parent())
            .finish()
    }
}

/// Drop removed plugins and snapshot what is left.
fn compact(stack: &RwLock<Stack>) -> Stack {
    let mut stack = stack.write().unwrap_or_else(PoisonError::into_inner);
    stack.retain(|plugin| !plugin.is_removed());
    stack.clone()
}

fn run_stack(stack: &RwLock<Stack>, phase: &Phase, mut ctx: Context, done: Handler) {
    let stack = compact(stack);
    ctx.set(PHASE_KEY, phase.to_string());

    let mut head = done.clone();
    for plugin in stack.into_iter().rev() {
        let following = head;
        let done = done.clone();
        let phase = phase.clone();
        head = Handler::new(move |ctx| {
            let skip_phase = phase.clone();
            let proceed = Handler::new(move |ctx| {
                if should_skip(&skip_phase, &ctx) {
                    done.next(ctx);
                } else {
                    following.next(ctx);
                }
            });
            plugin.exec(&phase, ctx, proceed);
        });
    }
    head.next(ctx);
}

/// The local stack is not run after the parent left an error outside the
/// `error` phase, or a stop outside the `stop` phase.
fn parent_short_circuits(phase: &Phase, ctx: &Context) -> bool {
    if phase.is_error() {
        return false;
    }
    ctx.has_error() || (ctx.is_stopped() && !phase.is_stop())
}

fn should_skip(phase: &Phase, ctx: &Context) -> bool {
    if phase.is_error() {
        return !ctx.has_error();
    }
    ctx.has_error() || (ctx.is_stopped() && !phase.is_stop())
}
