//! Transport trait used by the dial step.
//!
//! The engine never opens sockets itself: the dispatcher hands the prepared
//! request to the [`Transport`] stored on the context and records what came
//! back. Implementations live outside this crate (`gallant::HyperTransport`)
//! or in tests.

use std::future::Future;
use std::pin::Pin;

use crate::{ClientConfig, Error, HttpRequest, HttpResponse};

/// Future returned by [`Transport::round_trip`].
pub type TransportFuture = Pin<Box<dyn Future<Output = RoundTrip> + Send + 'static>>;

/// Outcome of a dial.
///
/// A transport may fail and still produce a response: when the redirect limit
/// is exceeded the last `3xx` response is returned along with
/// [`Error::TooManyRedirects`].
#[derive(Debug, Default)]
pub struct RoundTrip {
    /// Response produced by the server, if any.
    pub response: Option<HttpResponse>,
    /// Transport failure, if any.
    pub error: Option<Error>,
}

impl RoundTrip {
    /// Successful round trip.
    #[must_use]
    pub fn ok(response: HttpResponse) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    /// Failed round trip without response.
    #[must_use]
    pub fn failed(error: Error) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }

    /// Failed round trip that still produced a response.
    #[must_use]
    pub fn partial(response: HttpResponse, error: Error) -> Self {
        Self {
            response: Some(response),
            error: Some(error),
        }
    }
}

/// Executes one HTTP transaction on behalf of the dispatcher.
pub trait Transport: Send + Sync {
    /// Send the request and wait for the response.
    ///
    /// `config` is the configuration of the transaction's context, so plugins
    /// can tune timeouts or the redirect policy per request.
    fn round_trip(&self, request: HttpRequest, config: &ClientConfig) -> TransportFuture;
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}
