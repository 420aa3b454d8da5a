//! Outcome of a dispatched request.

use bytes::Bytes;
use http::HeaderMap;

use crate::Context;

/// Final context of a transaction that did not end in error.
///
/// A stopped transaction is a normal result: its status is whatever the
/// plugins set, `0` when nothing produced a response.
#[derive(Debug, Clone)]
pub struct Response {
    context: Context,
}

impl Response {
    pub(crate) const fn new(context: Context) -> Self {
        Self { context }
    }

    /// HTTP status code, `0` without response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.context.response().status()
    }

    /// Returns `true` for a `2xx` status.
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.context.response().is_success()
    }

    /// Returns `true` for a `4xx` status.
    #[must_use]
    pub const fn client_error(&self) -> bool {
        self.context.response().is_client_error()
    }

    /// Returns `true` for a `5xx` status.
    #[must_use]
    pub const fn server_error(&self) -> bool {
        self.context.response().is_server_error()
    }

    /// Returns `true` if a plugin stopped the transaction.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.context.is_stopped()
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        self.context.response().headers()
    }

    /// Single header value by name, when it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.context.response().header(name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        self.context.response().body()
    }

    /// Response body as text, lossily decoded.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.body()).into_owned()
    }

    /// Final transaction context.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Consume into the final transaction context.
    #[must_use]
    pub fn into_context(self) -> Context {
        self.context
    }
}
