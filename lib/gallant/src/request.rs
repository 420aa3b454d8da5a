//! Single-use HTTP request builder.
//!
//! Builder methods register request-phase plugins: they are applied, in
//! order, when the request is dispatched, after every plugin inherited from
//! the client. Invalid input therefore surfaces as the transaction error.
//!
//! ```no_run
//! # async fn run() -> gallant::Result<()> {
//! use gallant::{Method, Request};
//!
//! let response = Request::new()
//!     .method(Method::Post)
//!     .url("https://api.example.com/users/:id")
//!     .param("id", "42")
//!     .set_header("Accept", "application/json")
//!     .body(r#"{"name":"gallant"}"#)
//!     .send()
//!     .await?;
//!
//! assert!(response.ok());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use http::header::USER_AGENT;
use tracing::debug;

use crate::plugins::{headers, query, url};
use crate::{
    Client, ClientConfig, Context, Dispatcher, Error, Handler, Method, Middleware, Mux, Phase,
    PhasePlugin, Plugin, Response, Result, default_transport,
};

/// An HTTP request with its own context and middleware layer.
///
/// A request is dispatched at most once; [`Clone`] gives a fresh copy that
/// can be sent again.
#[derive(Debug)]
pub struct Request {
    context: Context,
    middleware: Middleware,
    dispatched: AtomicBool,
}

impl Request {
    /// Create a request with the default configuration and the shared default transport.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a request with the given configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let mut context = Context::with_config(config);
        context.set_transport(default_transport());
        let mut request = Self {
            context,
            middleware: Middleware::new(),
            dispatched: AtomicBool::new(false),
        };
        request.apply_user_agent();
        request
    }

    /// Attach the request to a client: the client context becomes the parent
    /// context and the client middleware runs before the request middleware.
    ///
    /// The client transport and configuration replace the request ones.
    pub fn set_client(&mut self, client: &Client) {
        let parent = client.context();
        {
            let client_ctx = crate::client::read(&parent);
            self.context.config_mut().clone_from(client_ctx.config());
            if let Some(transport) = client_ctx.transport() {
                self.context.set_transport(Arc::clone(transport));
            }
        }
        self.context.use_parent(parent);
        self.middleware.use_parent(client.middleware());
        self.apply_user_agent();
    }

    /// [`set_client`](Self::set_client) in builder form.
    #[must_use]
    pub fn with_client(mut self, client: &Client) -> Self {
        self.set_client(client);
        self
    }

    fn apply_user_agent(&mut self) {
        let agent = self.context.config().user_agent.clone();
        if let Err(err) = self
            .context
            .request_mut()
            .set_header(USER_AGENT.as_str(), &agent)
        {
            debug!(%err, "ignoring invalid user agent");
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    /// Set the HTTP method.
    #[must_use]
    pub fn method(self, method: Method) -> Self {
        self.use_request(move |mut ctx, h| {
            ctx.request_mut().set_method(method);
            h.next(ctx);
        })
    }

    /// Set the request URL.
    #[must_use]
    pub fn url(self, uri: impl Into<String>) -> Self {
        self.use_plugin(url::url(uri))
    }

    /// Set the scheme, host and port, keeping the current path.
    #[must_use]
    pub fn base_url(self, uri: impl Into<String>) -> Self {
        self.use_plugin(url::base_url(uri))
    }

    /// Replace the URL path.
    #[must_use]
    pub fn path(self, path: impl Into<String>) -> Self {
        self.use_plugin(url::path(path))
    }

    /// Append to the URL path.
    #[must_use]
    pub fn add_path(self, path: impl Into<String>) -> Self {
        self.use_plugin(url::add_path(path))
    }

    /// Replace the `:key` path placeholder.
    #[must_use]
    pub fn param(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.use_plugin(url::param(key, value))
    }

    /// Set a query parameter.
    #[must_use]
    pub fn query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.use_plugin(query::set(key, value))
    }

    /// Set a header.
    #[must_use]
    pub fn set_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.use_plugin(headers::set(name, value))
    }

    /// Set the request body.
    #[must_use]
    pub fn body(self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.use_request(move |mut ctx, h| {
            ctx.request_mut().set_body(body.clone());
            h.next(ctx);
        })
    }

    // ========================================================================
    // Middleware
    // ========================================================================

    /// Register a plugin.
    #[must_use]
    pub fn use_plugin(self, plugin: impl Plugin + 'static) -> Self {
        self.middleware.use_plugin(plugin);
        self
    }

    /// Register a handler for `phase`.
    #[must_use]
    pub fn use_handler<F>(self, phase: impl Into<Phase>, handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_plugin(PhasePlugin::for_phase(phase, handler))
    }

    /// Register a `request` phase handler.
    #[must_use]
    pub fn use_request<F>(self, handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_handler(Phase::REQUEST, handler)
    }

    /// Register a `response` phase handler.
    #[must_use]
    pub fn use_response<F>(self, handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_handler(Phase::RESPONSE, handler)
    }

    /// Register an `error` phase handler.
    #[must_use]
    pub fn use_error<F>(self, handler: F) -> Self
    where
        F: Fn(Context, Handler) + Send + Sync + 'static,
    {
        self.use_handler(Phase::ERROR, handler)
    }

    /// Attach a new [`Mux`] to the request and return it.
    ///
    /// The returned handle shares its layer and matchers with the attached copy.
    #[must_use]
    pub fn mux(&self) -> Mux {
        let mux = Mux::new();
        self.middleware.use_plugin(mux.clone());
        mux
    }

    /// Request middleware layer.
    #[must_use]
    pub const fn middleware(&self) -> &Middleware {
        &self.middleware
    }

    // ========================================================================
    // Context
    // ========================================================================

    /// Request context, as it will be handed to the first plugin.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Mutable access to the request context.
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Returns `true` once the request was dispatched.
    #[must_use]
    pub fn is_dispatched(&self) -> bool {
        self.dispatched.load(Ordering::Acquire)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Run the transaction and return its final context, error included.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyDispatched`] on a second call, without any
    /// network activity, and [`Error::Abandoned`] when a plugin dropped its
    /// continuation.
    pub async fn dispatch(&self) -> Result<Context> {
        if self.dispatched.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyDispatched);
        }
        Dispatcher::new(&self.middleware)
            .dispatch(self.context.clone())
            .await
    }

    /// Dispatch the request.
    ///
    /// A stopped transaction without error is returned as a [`Response`].
    ///
    /// # Errors
    ///
    /// Returns the transaction error left after the `error` phase, or any
    /// error of [`dispatch`](Self::dispatch).
    pub async fn send(&self) -> Result<Response> {
        let mut ctx = self.dispatch().await?;
        match ctx.take_error() {
            Some(err) => Err(err),
            None => Ok(Response::new(ctx)),
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Request {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            middleware: self.middleware.clone(),
            dispatched: AtomicBool::new(false),
        }
    }
}
