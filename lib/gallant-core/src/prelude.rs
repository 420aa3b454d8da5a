//! Prelude module for convenient imports.
//!
//! ```
//! use gallant_core::prelude::*;
//! ```

pub use crate::{
    ClientConfig, Context, Error, Handler, HttpRequest, HttpResponse, Method, Middleware, Mux,
    Phase, PhasePlugin, Plugin, Result, SharedContext, Transport, mux::matchers,
};
