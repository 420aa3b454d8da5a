//! Reusable client: a parent context and a parent middleware layer shared by
//! every request it creates.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::plugins::{headers, url};
use crate::{
    ClientConfig, Context, Handler, HyperTransport, Method, Middleware, Phase, PhasePlugin, Plugin,
    Request, SharedContext, Transport, Value, default_transport,
};

pub(crate) fn read(ctx: &SharedContext) -> RwLockReadGuard<'_, Context> {
    ctx.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(ctx: &SharedContext) -> RwLockWriteGuard<'_, Context> {
    ctx.write().unwrap_or_else(PoisonError::into_inner)
}

/// HTTP client holding defaults shared by its requests.
///
/// Plugins registered on the client run before the plugins of each request,
/// for every phase. Values stored on the client are visible from every
/// request context.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> gallant::Result<()> {
/// use gallant::Client;
/// use gallant::plugins::auth;
///
/// let client = Client::new();
/// client
///     .base_url("https://api.example.com")
///     .use_plugin(auth::bearer("token"));
///
/// let response = client.get().path("/users").send().await?;
/// println!("{}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    context: SharedContext,
    middleware: Arc<Middleware>,
}

impl Client {
    /// Create a client dialing through the shared default transport.
    #[must_use]
    pub fn new() -> Self {
        Self::with_transport(ClientConfig::default(), default_transport())
    }

    /// Create a client with its own connection pool built from `config`.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let transport = Arc::new(HyperTransport::with_config(config.clone()));
        Self::with_transport(config, transport)
    }

    /// Create a client dialing through `transport`.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let mut context = Context::with_config(config);
        context.set_transport(transport);
        Self {
            context: Arc::new(RwLock::new(context)),
            middleware: Arc::new(Middleware::new()),
        }
    }

    /// Shared client context.
    #[must_use]
    pub fn context(&self) -> SharedContext {
        Arc::clone(&self.context)
    }

    /// Shared client middleware layer.
    #[must_use]
    pub fn middleware(&self) -> Arc<Middleware> {
        Arc::clone(&self.middleware)
    }

    /// Inherit the context store and middleware of `parent`.
    pub fn use_parent(&self, parent: &Self) -> &Self {
        write(&self.context).use_parent(parent.context());
        self.middleware.use_parent(parent.middleware());
        self
    }

    /// Store a value in the client context.
    pub fn set<V>(&self, key: impl Into<String>, value: V) -> &Self
    where
        V: std::any::Any + Send + Sync,
    {
        write(&self.context).set(key, value);
        self
    }

    /// Value from the client context or its ancestors.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<Value> {
        read(&self.context).get(key)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Create a request attached to this client.
    #[must_use]
    pub fn request(&self) -> Request {
        Request::new().with_client(self)
    }

    /// `GET` request.
    #[must_use]
    pub fn get(&self) -> Request {
        self.request().method(Method::Get)
    }

    /// `POST` request.
    #[must_use]
    pub fn post(&self) -> Request {
        self.request().method(Method::Post)
    }

    /// `PUT` request.
    #[must_use]
    pub fn put(&self) -> Request {
        self.request().method(Method::Put)
    }

    /// `DELETE` request.
    #[must_use]
    pub fn delete(&self) -> Request {
        self.request().method(Method::Delete)
    }

    /// `PATCH` request.
    #[must_use]
    pub fn patch(&self) -> Request {
        self.request().method(Method::Patch)
    }

    /// `HEAD` request.
    #[must_use]
    pub fn head(&self) -> Request {
        self.request().method(Method::Head)
    }

    // ========================================================================
    // Defaults
    // ========================================================================

    /// Default method of the client requests.
    pub fn method(&self, method: Method) -> &Self {
        self.use_request(move |mut ctx, h| {
            ctx.request_mut().set_method(method);
            h.next(ctx);
        })
    }

    /// Default URL.
    pub fn url(&self, uri: impl Into<String>) -> &Self {
        self.use_plugin(url::url(uri))
    }

    /// Default scheme, host and port.
    pub fn base_url(&self, uri: impl Into<String>) -> &Self {
        self.use_plugin(url::base_url(uri))
    }

    /// Default URL path.
    pub fn path(&self, path: impl Into<String>) -> &Self {
        self.use_plugin(url::path(path))
    }

    /// Default path parameter.
    pub fn param(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        self.use_plugin(url::param(key, value))
    }

    /// Default header.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) -> &Self {
        self.use_plugin(headers::set(name, value))
    }

    // ========================================================================
    // Middleware
    // ========================================================================

    /// Register a plugin.
    pub fn use_plugin(&self, plugin: impl Plugin + 'static) -> &Self {
        self.middleware.use_plugin(plugin);
        self
    }

    /// Register a handler for `phase`.
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
        self.use_handler(Phase::REQUEST, handler)
    }

    /// Register a `response` phase handler.
    pub fn use_response<F>(&self, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_handler(Phase::RESPONSE, handler)
    }

    /// Register an `error` phase handler.
    pub fn use_error<F>(&self, handler: F) -> &Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_handler(Phase::ERROR, handler)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
