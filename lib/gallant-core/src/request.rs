//! In-flight HTTP request carried by a [`Context`](crate::Context).
//!
//! Plugins mutate the request through [`Context::request_mut`](crate::Context::request_mut)
//! until the dispatcher hands it to the transport.
//!
//! # Example
//!
//! ```
//! use gallant_core::{HttpRequest, Method};
//!
//! let mut request = HttpRequest::new();
//! request.set_method(Method::Post);
//! request.set_url("https://api.example.com/users".parse().unwrap());
//! request.set_header("Accept", "application/json").unwrap();
//! request.set_body("{}");
//!
//! assert_eq!(request.content_length(), 2);
//! ```

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::{Error, Method, Result};

/// An HTTP request with method, URL, headers, and optional body.
///
/// A fresh request is a `GET` without URL; the URL is usually set by a plugin
/// or by the request builder before dialing.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl HttpRequest {
    /// Creates an empty `GET` request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a request for the given method and URL.
    #[must_use]
    pub fn with_url(method: Method, url: Url) -> Self {
        Self {
            method,
            url: Some(url),
            ..Self::default()
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Replace the HTTP method.
    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    /// Request URL, if one was set.
    #[must_use]
    pub const fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Mutable access to the request URL.
    pub fn url_mut(&mut self) -> Option<&mut Url> {
        self.url.as_mut()
    }

    /// Replace the request URL.
    pub fn set_url(&mut self, url: Url) {
        self.url = Some(url);
    }

    /// Request headers.
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
    /// Returns [`Error::InvalidRequest`] if the name or the value is not a valid header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Appends a header value, keeping the previous ones.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the name or the value is not a valid header.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Replace the request body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
    }

    /// Remove and return the request body.
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Body length in bytes (`0` without body).
    #[must_use]
    pub fn content_length(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }

    /// Consume into (method, URL, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, Option<Url>, HeaderMap, Option<Bytes>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Parse a header pair from strings.
pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|err| Error::invalid_request(format!("header name '{name}': {err}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|err| Error::invalid_request(format!("header value for '{name}': {err}")))?;
    Ok((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_request_is_a_get_without_url() {
        let request = HttpRequest::new();
        assert_eq!(request.method(), Method::Get);
        assert!(request.url().is_none());
        assert!(request.headers().is_empty());
        assert_eq!(request.content_length(), 0);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let mut request = HttpRequest::new();
        request
            .set_header("Content-Type", "application/json")
            .expect("valid header");

        assert_eq!(request.header("content-type"), Some("application/json"));
    }

    #[test]
    fn append_header_keeps_values() {
        let mut request = HttpRequest::new();
        request.append_header("Accept", "text/html").expect("header");
        request.append_header("Accept", "text/plain").expect("header");

        assert_eq!(request.headers().get_all("accept").iter().count(), 2);
    }

    #[test]
    fn invalid_header_is_rejected() {
        let mut request = HttpRequest::new();
        let err = request
            .set_header("bad header", "value")
            .expect_err("space in name");
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn body_and_content_length() {
        let url = Url::parse("https://api.example.com/users").expect("valid URL");
        let mut request = HttpRequest::with_url(Method::Post, url);
        request.set_body(r#"{"name":"test"}"#);

        assert_eq!(request.content_length(), 15);
        assert_eq!(request.take_body(), Some(Bytes::from(r#"{"name":"test"}"#)));
        assert!(request.body().is_none());
    }
}
