//! Plugin-driven HTTP client for Rust.
//!
//! Every request runs through a fixed sequence of phases (`request`,
//! `before dial`, `after dial`, `response`, plus `error`, `stop` and
//! `intercept`). Plugins registered on a [`Client`] or on a [`Request`] hook
//! into those phases, read and write the per-transaction [`Context`] and hand
//! it on through a once-only [`Handler`].
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> gallant::Result<()> {
//! use gallant::prelude::*;
//! use gallant::plugins::{auth, headers};
//!
//! let client = Client::new();
//! client
//!     .base_url("https://api.example.com")
//!     .use_plugin(auth::bearer("token"))
//!     .use_plugin(headers::set("Accept", "application/json"));
//!
//! let response = client.get().path("/users/:id").param("id", "42").send().await?;
//! println!("{} {}", response.status(), response.text());
//! # Ok(())
//! # }
//! ```

mod client;
mod connector;
mod dispatcher;
pub mod plugins;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use client::Client;
pub use connector::https_connector;
pub use dispatcher::Dispatcher;
pub use request::Request;
pub use response::Response;
pub use transport::{
    DialService, HyperTransport, HyperTransportBuilder, ServiceFuture, default_transport,
};

// Re-export tower for transport layers
pub use tower;

// Re-export core types
pub use gallant_core::{
    ClientConfig, ClientConfigBuilder, Context, DEFAULT_MAX_REDIRECTS, Error, Handler, HandlerFn,
    HttpRequest, HttpResponse, Matcher, Method, Middleware, Mux, PHASE_KEY, Phase, PhasePlugin,
    Plugin, PluginFlags, RedirectPolicy, Result, RoundTrip, SharedContext, Stack, Store,
    Transport, TransportFuture, USER_AGENT, Value, mux,
};

// Re-export http types for status codes and headers
pub use gallant_core::{StatusCode, header};

pub use url;
