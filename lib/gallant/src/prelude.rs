//! Prelude module for convenient imports.
//!
//! ```
//! use gallant::prelude::*;
//! ```

pub use crate::{
    Client, ClientConfig, Context, Error, Handler, Method, Middleware, Mux, Phase, PhasePlugin,
    Plugin, Request, Response, Result, StatusCode, header, mux::matchers,
};
