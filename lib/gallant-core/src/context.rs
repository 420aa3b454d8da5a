//! Per-transaction context with inheritable key-value storage.
//!
//! A [`Context`] carries the in-flight [`HttpRequest`] and [`HttpResponse`],
//! the error slot, the stop flag, the client configuration, the transport and a
//! scoped store. It is moved by value through the middleware chain: every
//! plugin receives it, mutates it, and hands it to its [`Handler`](crate::Handler).
//!
//! # Scoped store
//!
//! Values are looked up in the local store first, then in the parent context.
//! Writes ([`Context::set`], [`Context::delete`], [`Context::clear`]) only ever
//! touch the local store.
//!
//! ```
//! use gallant_core::Context;
//!
//! let client = Context::new().into_shared();
//! client.write().unwrap().set("token", "secret".to_string());
//!
//! let mut request = Context::new();
//! request.use_parent(client);
//! request.set("page", 2_i64);
//!
//! assert_eq!(request.get_string("token"), "secret");
//! assert_eq!(request.get_int("page"), 2);
//! assert_eq!(request.get_all().len(), 2);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;

use crate::{ClientConfig, Error, HttpRequest, HttpResponse, Phase, Transport};

/// Store key holding the name of the phase being run.
pub const PHASE_KEY: &str = "$phase";

/// Opaque value held in a context store.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Key-value store of a single context level.
pub type Store = HashMap<String, Value>;

/// Context shared between a client and the requests it creates.
pub type SharedContext = Arc<RwLock<Context>>;

/// Domain-specific state of one HTTP transaction.
#[derive(Debug, Clone)]
pub struct Context {
    error: Option<Error>,
    stopped: bool,
    parent: Option<SharedContext>,
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    request: HttpRequest,
    response: HttpResponse,
    store: Store,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates an empty context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Creates an empty context with the given configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            error: None,
            stopped: false,
            parent: None,
            config,
            transport: None,
            request: HttpRequest::new(),
            response: HttpResponse::default(),
            store: Store::new(),
        }
    }

    /// Wrap this context so it can be used as a parent.
    #[must_use]
    pub fn into_shared(self) -> SharedContext {
        Arc::new(RwLock::new(self))
    }

    // ------------------------------------------------------------------------
    // Flow state
    // ------------------------------------------------------------------------

    /// Last error of the transaction.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Returns `true` if an error is set.
    #[must_use]
    pub const fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Record an error.
    pub fn set_error(&mut self, error: impl Into<Error>) {
        self.error = Some(error.into());
    }

    /// Remove and return the error, resuming normal flow.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Returns `true` if a plugin stopped the transaction.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Set or reset the stop flag.
    pub fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    /// Phase currently run by the middleware, as stamped in the store.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        let name = self.get_string(PHASE_KEY);
        (!name.is_empty()).then(|| Phase::from(name))
    }

    // ------------------------------------------------------------------------
    // HTTP entities
    // ------------------------------------------------------------------------

    /// Client configuration of this transaction.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Mutable access to the client configuration.
    pub fn config_mut(&mut self) -> &mut ClientConfig {
        &mut self.config
    }

    /// Transport used by the dial step.
    #[must_use]
    pub const fn transport(&self) -> Option<&Arc<dyn Transport>> {
        self.transport.as_ref()
    }

    /// Replace the transport.
    pub fn set_transport(&mut self, transport: Arc<dyn Transport>) {
        self.transport = Some(transport);
    }

    /// In-flight request.
    #[must_use]
    pub const fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Mutable access to the in-flight request.
    pub fn request_mut(&mut self) -> &mut HttpRequest {
        &mut self.request
    }

    /// Replace the in-flight request.
    pub fn set_request(&mut self, request: HttpRequest) {
        self.request = request;
    }

    /// Current response (status `0` until produced).
    #[must_use]
    pub const fn response(&self) -> &HttpResponse {
        &self.response
    }

    /// Mutable access to the response.
    pub fn response_mut(&mut self) -> &mut HttpResponse {
        &mut self.response
    }

    /// Replace the response.
    pub fn set_response(&mut self, response: HttpResponse) {
        self.response = response;
    }

    // ------------------------------------------------------------------------
    // Inheritance
    // ------------------------------------------------------------------------

    /// Parent context, if any.
    #[must_use]
    pub const fn parent(&self) -> Option<&SharedContext> {
        self.parent.as_ref()
    }

    /// Use a new parent context for inherited lookups.
    pub fn use_parent(&mut self, parent: SharedContext) {
        self.parent = Some(parent);
    }

    /// Returns `true` if this context has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Topmost ancestor.
    ///
    /// `None` means `self` is the root: a context cannot hold a shared
    /// handle to itself.
    #[must_use]
    pub fn root(&self) -> Option<SharedContext> {
        let mut current = Arc::clone(self.parent.as_ref()?);
        loop {
            let next = read(&current).parent.clone();
            match next {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Store
    // ------------------------------------------------------------------------

    /// Set a value in the local store.
    pub fn set<V>(&mut self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        self.store.insert(key.into(), Arc::new(value));
    }

    /// Set an already shared value in the local store.
    pub fn set_value(&mut self, key: impl Into<String>, value: Value) {
        self.store.insert(key.into(), value);
    }

    /// Value by key in the current or parent contexts.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.store.get(key) {
            return Some(Arc::clone(value));
        }
        self.parent.as_ref().and_then(|parent| read(parent).get(key))
    }

    /// Returns `true` if the key is present in the current or parent contexts.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.store.contains_key(key)
            || self
                .parent
                .as_ref()
                .is_some_and(|parent| read(parent).contains(key))
    }

    /// Typed value by key.
    ///
    /// The parent is only consulted when the current level has no entry at all:
    /// an entry of another type yields `None`.
    #[must_use]
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: Any + Clone,
    {
        match self.store.get(key) {
            Some(value) => value.downcast_ref::<T>().cloned(),
            None => self
                .parent
                .as_ref()
                .and_then(|parent| read(parent).get_as(key)),
        }
    }

    /// String value by key, or an empty string.
    #[must_use]
    pub fn get_string(&self, key: &str) -> String {
        match self.store.get(key) {
            Some(value) => value
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| value.downcast_ref::<&'static str>().map(ToString::to_string))
                .unwrap_or_default(),
            None => self
                .parent
                .as_ref()
                .map(|parent| read(parent).get_string(key))
                .unwrap_or_default(),
        }
    }

    /// Integer value by key, or `0`.
    #[must_use]
    pub fn get_int(&self, key: &str) -> i64 {
        match self.store.get(key) {
            Some(value) => value
                .downcast_ref::<i64>()
                .copied()
                .or_else(|| value.downcast_ref::<i32>().map(|int| i64::from(*int)))
                .unwrap_or_default(),
            None => self
                .parent
                .as_ref()
                .map(|parent| read(parent).get_int(key))
                .unwrap_or_default(),
        }
    }

    /// Every visible value, parent entries overridden by local ones.
    #[must_use]
    pub fn get_all(&self) -> Store {
        let mut all = self
            .parent
            .as_ref()
            .map(|parent| read(parent).get_all())
            .unwrap_or_default();
        all.extend(
            self.store
                .iter()
                .map(|(key, value)| (key.clone(), Arc::clone(value))),
        );
        all
    }

    /// Remove a value from the local store.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.store.remove(key)
    }

    /// Remove every value from the local store; the parent is left untouched.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Clone this context with a fresh copy of the request and response bodies.
    ///
    /// [`Clone`] aliases the body bytes.
    #[must_use]
    pub fn clone_with_body(&self) -> Self {
        let mut ctx = self.clone();
        if let Some(body) = self.request.body() {
            ctx.request.set_body(Bytes::copy_from_slice(body));
        }
        ctx.response
            .set_body(Bytes::copy_from_slice(self.response.body()));
        ctx
    }
}

fn read(ctx: &SharedContext) -> std::sync::RwLockReadGuard<'_, Context> {
    ctx.read().unwrap_or_else(PoisonError::into_inner)
}
