//! Core engine of the gallant HTTP client.
//!
//! This crate holds the transport-agnostic dispatch machinery:
//! - [`Context`] - per-transaction state with an inheritable key-value store
//! - [`Handler`] - once-only continuation handed to plugins
//! - [`Plugin`] and [`PhasePlugin`] - phase-keyed handler bundles
//! - [`Middleware`] - ordered, inheritable plugin layer running phases
//! - [`mux`] - predicate-gated sub-pipelines and their matchers
//! - [`Phase`] - phase names
//! - [`HttpRequest`], [`HttpResponse`] and [`Method`] - HTTP entities
//! - [`ClientConfig`] - client configuration
//! - [`Transport`] - the seam used by the dial step
//! - [`Error`] and [`Result`] - error handling

mod config;
mod context;
mod error;
mod handler;
mod method;
mod middleware;
pub mod mux;
mod phase;
mod plugin;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_MAX_REDIRECTS, RedirectPolicy, USER_AGENT,
};
pub use context::{Context, PHASE_KEY, SharedContext, Store, Value};
pub use error::{Error, Result};
pub use handler::{Handler, HandlerFn};
pub use method::Method;
pub use middleware::{Middleware, Stack};
pub use mux::{Matcher, Mux};
pub use phase::Phase;
pub use plugin::{PhasePlugin, Plugin, PluginFlags};
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use transport::{RoundTrip, Transport, TransportFuture};

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
