//! HTTP response carried by a [`Context`](crate::Context).
//!
//! A fresh context holds a response with status `0`: nothing was produced yet.
//! A plugin that sets a status during the request phase intercepts the
//! transaction, and the transport is never dialed.

use bytes::Bytes;
use http::header::HeaderMap;

use crate::Result;
use crate::request::parse_header;

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code (`0` until a response is produced).
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Replace the status code.
    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Returns `true` once a status was set, by the transport or by a plugin.
    #[must_use]
    pub const fn is_produced(&self) -> bool {
        self.status != 0
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Single header value by name, when it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Sets a header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`](crate::Error::InvalidRequest) if the
    /// name or the value is not a valid header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Replace the response body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 3xx.
    #[must_use]
    pub const fn is_redirection(&self) -> bool {
        self.status >= 300 && self.status < 400
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_response_is_not_produced() {
        let response = HttpResponse::default();
        assert_eq!(response.status(), 0);
        assert!(!response.is_produced());
        assert!(response.body().is_empty());
    }

    #[test]
    fn response_status_checks() {
        let mut response = HttpResponse::default();

        response.set_status(204);
        assert!(response.is_produced());
        assert!(response.is_success());

        response.set_status(301);
        assert!(response.is_redirection());

        response.set_status(404);
        assert!(response.is_client_error());

        response.set_status(503);
        assert!(response.is_server_error());
    }

    #[test]
    fn response_headers() {
        let mut response = HttpResponse::new(200, HeaderMap::new(), Bytes::from("ok"));
        response
            .set_header("Content-Type", "text/plain")
            .expect("valid header");

        assert_eq!(response.header("content-type"), Some("text/plain"));
        let (status, headers, body) = response.into_parts();
        assert_eq!(status, 200);
        assert_eq!(headers.len(), 1);
        assert_eq!(body, Bytes::from("ok"));
    }
}
