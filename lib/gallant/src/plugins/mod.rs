//! Collaborating plugins.
//!
//! Each constructor returns a [`PhasePlugin`](crate::PhasePlugin) ready to be
//! registered on a request, a client or a mux:
//!
//! | Module        | Phase     | Effect                                   |
//! |---------------|-----------|------------------------------------------|
//! | [`url`]       | request   | URL, base URL, path and path parameters  |
//! | [`headers`]   | request   | Request headers                          |
//! | [`query`]     | request   | Query string                             |
//! | [`auth`]      | request   | `Authorization` header                   |
//! | [`timeout`]   | request   | Transaction deadline                     |
//! | [`redirect`]  | request   | Redirect policy                          |
//! | [`transport`] | request   | Transport used by the dial step          |
//! | [`logging`]   | several   | `tracing` events per transaction         |

#[cfg(feature = "plugin-auth")]
pub mod auth;
pub mod headers;
pub mod logging;
pub mod query;
pub mod redirect;
pub mod timeout;
pub mod transport;
pub mod url;
