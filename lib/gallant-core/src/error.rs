//! Error types for gallant.

use std::sync::Arc;

use derive_more::{Display, Error, From};

use crate::Phase;

/// Main error type for gallant operations.
///
/// Errors travel inside a [`Context`](crate::Context) through the middleware
/// pipeline, so the type is cheap to clone.
#[derive(Debug, Clone, Display, Error, From)]
pub enum Error {
    /// Network/connection errors raised while dialing.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Too many redirects.
    #[display("too many redirects ({count} exceeded max of {max})")]
    #[from(skip)]
    TooManyRedirects {
        /// Number of redirects followed.
        count: usize,
        /// Maximum allowed redirects.
        max: usize,
    },

    /// Invalid redirect response.
    #[display("invalid redirect: {_0}")]
    #[from(skip)]
    InvalidRedirect(#[error(not(source))] String),

    /// Error reported by a plugin through [`Handler::error`](crate::Handler::error).
    #[display("{_0}")]
    #[from(skip)]
    Plugin(#[error(not(source))] Arc<dyn std::error::Error + Send + Sync>),

    /// Ad-hoc error message reported by a plugin.
    #[display("{_0}")]
    #[from(skip)]
    Message(#[error(not(source))] String),

    /// The request object was already dispatched.
    #[display("request was already dispatched")]
    #[from(skip)]
    AlreadyDispatched,

    /// Every continuation of a phase chain was dropped without being called.
    #[display("middleware chain for phase '{phase}' was abandoned")]
    #[from(skip)]
    Abandoned {
        /// Phase whose chain never completed.
        #[error(not(source))]
        phase: Phase,
    },

    /// No transport is configured on the context.
    #[display("no transport configured")]
    #[from(skip)]
    MissingTransport,
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an ad-hoc error from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Wrap any error raised by plugin code.
    #[must_use]
    pub fn plugin(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Plugin(Arc::new(error))
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the redirect limit was exceeded.
    #[must_use]
    pub const fn is_redirect_limit(&self) -> bool {
        matches!(self, Self::TooManyRedirects { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Display, Error)]
    #[display("quota exhausted")]
    struct QuotaError;

    #[test]
    fn error_display() {
        let err = Error::Timeout;
        assert_eq!(err.to_string(), "request timeout");

        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "connection error: failed to connect");

        let err = Error::TooManyRedirects { count: 11, max: 10 };
        assert_eq!(
            err.to_string(),
            "too many redirects (11 exceeded max of 10)"
        );

        let err = Error::Abandoned {
            phase: Phase::REQUEST,
        };
        assert_eq!(
            err.to_string(),
            "middleware chain for phase 'request' was abandoned"
        );
    }

    #[test]
    fn plugin_errors_keep_their_message() {
        assert_eq!(Error::plugin(QuotaError).to_string(), "quota exhausted");
        assert_eq!(Error::msg("stop").to_string(), "stop");
    }

    #[test]
    fn error_predicates() {
        assert!(Error::Timeout.is_timeout());
        assert!(!Error::Timeout.is_connection());
        assert!(Error::connection("refused").is_connection());
        assert!(Error::TooManyRedirects { count: 3, max: 2 }.is_redirect_limit());
        assert!(!Error::AlreadyDispatched.is_redirect_limit());
    }

    #[test]
    fn error_from_url_parse() {
        let err: Error = url::Url::parse("not a url").expect_err("invalid").into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
