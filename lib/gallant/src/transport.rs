//! HTTP transport using hyper-util.
//!
//! [`HyperTransport`] implements the dial step: one pooled hyper client behind
//! a type-erased tower service, wrapped by the redirect loop and the request
//! deadline of the transaction configuration.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http::header::LOCATION;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use tower::limit::ConcurrencyLimitLayer;
use tower::util::BoxCloneService;
use tower::{Layer, ServiceExt};
use tower_service::Service;
use tracing::debug;
use url::Url;

use crate::{
    ClientConfig, ClientConfigBuilder, Error, HttpRequest, HttpResponse, Method, RedirectPolicy,
    Result, RoundTrip, Transport, TransportFuture, connector::https_connector,
};

// ============================================================================
// Type-Erased Service for Layer Composition
// ============================================================================

/// Type-erased single-hop service used by the dial step.
pub type DialService = BoxCloneService<HttpRequest, HttpResponse, Error>;

/// Future type for the tower service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'static>>;

/// Thread-safe wrapper for [`DialService`].
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<DialService>>,
}

impl SyncService {
    fn new(service: DialService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: HttpRequest) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Box::pin(service.oneshot(request))
    }
}

// ============================================================================
// Raw Client
// ============================================================================

/// One HTTP exchange over the pooled hyper client.
#[derive(Clone)]
struct RawHyper {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl RawHyper {
    fn new(config: &ClientConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(config));

        Self { inner }
    }

    fn build_hyper_request(request: HttpRequest) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();
        let url = url.ok_or_else(|| Error::invalid_request("request URL is not set"))?;

        let body = body.map_or_else(Full::default, Full::new);
        let mut http_request = http::Request::builder()
            .method(http::Method::from(method))
            .uri(url.as_str())
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *http_request.headers_mut() = headers;

        Ok(http_request)
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let hyper_request = Self::build_hyper_request(request)?;

        let response = self
            .inner
            .request(hyper_request)
            .await
            .map_err(Self::map_hyper_error)?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        Ok(HttpResponse::new(parts.status.as_u16(), parts.headers, body))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Service<HttpRequest> for RawHyper {
    type Response = HttpResponse;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: HttpRequest) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.execute(request).await })
    }
}

// ============================================================================
// Redirects
// ============================================================================

/// Check if a status code is a redirect.
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Determine the method for the redirected request.
///
/// - 301, 302, 303: Always use GET
/// - 307, 308: Preserve original method
fn redirect_method(status: u16, original: Method) -> Method {
    match status {
        307 | 308 => original,
        _ => Method::Get,
    }
}

/// Resolve a redirect Location URL relative to the original request URL.
fn resolve_redirect_url(base_url: &Url, location: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(location) {
        return Ok(url);
    }

    base_url.join(location).map_err(Error::InvalidUrl)
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Build the request for the next hop.
fn redirect_request(
    request: HttpRequest,
    response: &HttpResponse,
    policy: &RedirectPolicy,
) -> Result<HttpRequest> {
    let location = response
        .header(LOCATION.as_str())
        .ok_or_else(|| Error::InvalidRedirect("redirect response missing Location header".into()))?;

    let (method, url, mut headers, body) = request.into_parts();
    let current_url = url.ok_or_else(|| Error::invalid_request("request URL is not set"))?;
    let new_url = resolve_redirect_url(&current_url, location)?;
    let new_method = redirect_method(response.status(), method);

    if !policy.trusted && !same_origin(&current_url, &new_url) {
        for name in &policy.sensitive_headers {
            headers.remove(name);
        }
    }

    let mut next = HttpRequest::with_url(new_method, new_url);
    if new_method.is_bodiless() {
        headers.remove(http::header::CONTENT_LENGTH);
        headers.remove(http::header::CONTENT_TYPE);
    } else if let Some(body) = body {
        next.set_body(body);
    }
    *next.headers_mut() = headers;

    Ok(next)
}

async fn follow(service: SyncService, request: HttpRequest, policy: RedirectPolicy) -> RoundTrip {
    let mut current = request;
    let mut redirects = 0;

    loop {
        let response = match service.call(current.clone()).await {
            Ok(response) => response,
            Err(err) => return RoundTrip::failed(err),
        };

        if !policy.follow || !is_redirect(response.status()) {
            return RoundTrip::ok(response);
        }

        if redirects >= policy.limit {
            return RoundTrip::partial(
                response,
                Error::TooManyRedirects {
                    count: redirects,
                    max: policy.limit,
                },
            );
        }

        current = match redirect_request(current, &response, &policy) {
            Ok(next) => next,
            Err(err) => return RoundTrip::partial(response, err),
        };
        redirects += 1;
        debug!(
            status = response.status(),
            url = ?current.url().map(Url::as_str),
            redirects,
            "following redirect"
        );
    }
}

// ============================================================================
// Public Transport
// ============================================================================

/// Transport using hyper-util with connection pooling, TLS, and tower layers.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use gallant::HyperTransport;
///
/// let transport = HyperTransport::builder()
///     .connect_timeout(Duration::from_secs(5))
///     .with_concurrency_limit(16)
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    service: SyncService,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new transport with custom configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let raw = RawHyper::new(&config);
        Self {
            service: SyncService::new(BoxCloneService::new(raw)),
            config,
        }
    }

    /// Create a new transport builder.
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Configuration the connection pool was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn round_trip(&self, request: HttpRequest, config: &ClientConfig) -> TransportFuture {
        let service = self.service.clone();
        let timeout = config.timeout;
        let policy = config.redirect.clone();

        Box::pin(async move {
            tokio::time::timeout(timeout, follow(service, request, policy))
                .await
                .unwrap_or_else(|_| RoundTrip::failed(Error::Timeout))
        })
    }
}

/// Shared transport used by requests created without one.
///
/// The pool is built once, with the default configuration.
#[must_use]
pub fn default_transport() -> Arc<dyn Transport> {
    static DEFAULT: OnceLock<Arc<HyperTransport>> = OnceLock::new();
    let transport = DEFAULT.get_or_init(|| Arc::new(HyperTransport::new()));
    Arc::clone(transport) as Arc<dyn Transport>
}

/// Builder for [`HyperTransport`].
///
/// Layers wrap every single hop, redirects included.
#[derive(Default)]
pub struct HyperTransportBuilder {
    config: ClientConfigBuilder,
    layers: Vec<Arc<dyn Fn(DialService) -> DialService + Send + Sync>>,
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperTransportBuilder {
    // ========================================================================
    // Connection Configuration
    // ========================================================================

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the TCP keep-alive interval.
    #[must_use]
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.config = self.config.keep_alive(interval);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    // ========================================================================
    // Tower Layers
    // ========================================================================

    /// Add a tower layer around each hop.
    ///
    /// Layers are applied in order: last added = outermost.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<DialService> + Send + Sync + 'static,
        L::Service: Service<HttpRequest, Response = HttpResponse, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<HttpRequest>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Limit the number of in-flight hops.
    #[must_use]
    pub fn with_concurrency_limit(self, max: usize) -> Self {
        self.layer(ConcurrencyLimitLayer::new(max))
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the transport.
    #[must_use]
    pub fn build(self) -> HyperTransport {
        let config = self.config.build();
        let mut service: DialService = BoxCloneService::new(RawHyper::new(&config));

        for layer_fn in self.layers {
            service = layer_fn(service);
        }

        HyperTransport {
            service: SyncService::new(service),
            config,
        }
    }
}
