//! Plugins: phase-keyed handler bundles.
//!
//! Every plugin carries [`PluginFlags`]. A disabled or removed plugin is a
//! pass-through: [`Plugin::exec`] resumes the chain without calling
//! [`Plugin::handle`].
//!
//! # Example
//!
//! ```
//! use gallant_core::{Phase, PhasePlugin, Plugin};
//!
//! let plugin = PhasePlugin::new()
//!     .on(Phase::REQUEST, |mut ctx, h| {
//!         ctx.set("seen", true);
//!         h.next(ctx);
//!     })
//!     .on("audit", |ctx, h| h.next(ctx));
//!
//! plugin.disable();
//! assert!(plugin.is_disabled());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Context, Handler, HandlerFn, Phase};

/// Enable/remove state shared by every plugin.
#[derive(Debug, Default)]
pub struct PluginFlags {
    disabled: AtomicBool,
    removed: AtomicBool,
}

impl PluginFlags {
    /// Flags of an enabled plugin.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            disabled: AtomicBool::new(false),
            removed: AtomicBool::new(false),
        }
    }

    /// Returns `true` if the plugin is disabled.
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Returns `true` if the plugin was removed.
    pub fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Set the disabled flag.
    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::Release);
    }

    /// Mark as removed, permanently.
    pub fn remove(&self) {
        self.removed.store(true, Ordering::Release);
    }
}

/// A unit of behavior bound to one or more phases.
///
/// Implementors provide [`flags`](Self::flags) and [`handle`](Self::handle);
/// the flag operations and [`exec`](Self::exec) are derived from them. The
/// handler must eventually call exactly one operation of its [`Handler`].
pub trait Plugin: Send + Sync {
    /// Plugin state flags.
    fn flags(&self) -> &PluginFlags;

    /// Run the plugin for `phase`.
    fn handle(&self, phase: &Phase, ctx: Context, handler: Handler);

    /// Enable the plugin.
    fn enable(&self) {
        self.flags().set_disabled(false);
    }

    /// Disable the plugin; it becomes a pass-through.
    fn disable(&self) {
        self.flags().set_disabled(true);
    }

    /// Returns `true` if the plugin is disabled.
    fn is_disabled(&self) -> bool {
        self.flags().is_disabled()
    }

    /// Remove the plugin from every layer it is registered in.
    ///
    /// Removal cannot be undone.
    fn remove(&self) {
        self.flags().remove();
    }

    /// Returns `true` if the plugin was removed.
    fn is_removed(&self) -> bool {
        self.flags().is_removed()
    }

    /// Entry point called by the middleware.
    fn exec(&self, phase: &Phase, ctx: Context, handler: Handler) {
        if self.is_removed() || self.is_disabled() {
            handler.next(ctx);
            return;
        }
        self.handle(phase, ctx, handler);
    }
}

/// Plugin built from a phase → handler map and an optional fallback.
#[derive(Default)]
pub struct PhasePlugin {
    flags: PluginFlags,
    handlers: HashMap<Phase, HandlerFn>,
    fallback: Option<HandlerFn>,
}

impl PhasePlugin {
    /// Create a plugin without handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plugin with a single phase handler.
    #[must_use]
    pub fn for_phase<F>(phase: impl Into<Phase>, handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        Self::new().on(phase, handler)
    }

    /// Create a `request` phase plugin.
    #[must_use]
    pub fn request<F>(handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        Self::for_phase(Phase::REQUEST, handler)
    }

    /// Create a `response` phase plugin.
    #[must_use]
    pub fn response<F>(handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        Self::for_phase(Phase::RESPONSE, handler)
    }

    /// Create an `error` phase plugin.
    #[must_use]
    pub fn error<F>(handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        Self::for_phase(Phase::ERROR, handler)
    }

    /// Register the handler of a phase, replacing any previous one.
    #[must_use]
    pub fn on<F>(mut self, phase: impl Into<Phase>, handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.handlers.insert(phase.into(), Arc::new(handler));
        self
    }

    /// Register the handler used for phases without a dedicated one.
    #[must_use]
    pub fn fallback<F>(mut self, handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Returns `true` if a handler (dedicated or fallback) exists for `phase`.
    #[must_use]
    pub fn handles(&self, phase: &Phase) -> bool {
        self.fallback.is_some() || self.handlers.contains_key(phase)
    }
}

impl Plugin for PhasePlugin {
    fn flags(&self) -> &PluginFlags {
        &self.flags
    }

    fn handle(&self, phase: &Phase, ctx: Context, handler: Handler) {
        match self.handlers.get(phase).or(self.fallback.as_ref()) {
            Some(run) => run(ctx, handler),
            None => handler.next(ctx),
        }
    }
}

impl fmt::Debug for PhasePlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut phases: Vec<_> = self.handlers.keys().map(Phase::as_str).collect();
        phases.sort_unstable();
        f.debug_struct("PhasePlugin")
            .field("phases", &phases)
            .field("fallback", &self.fallback.is_some())
            .field("flags", &self.flags)
            .finish()
    }
}
