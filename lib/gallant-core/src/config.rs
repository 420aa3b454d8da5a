//! Client configuration types.
//!
//! A [`ClientConfig`] is created once, threaded into
//! [`Context::with_config`](crate::Context::with_config) and the transport
//! constructor, and then owned by each context: plugins adjust the copy of the
//! transaction they run in, never a process-wide default.

use std::time::Duration;

use http::header::{AUTHORIZATION, HeaderName, PROXY_AUTHORIZATION, WWW_AUTHENTICATE};

/// Default `User-Agent` header value.
pub const USER_AGENT: &str = concat!("gallant/", env!("CARGO_PKG_VERSION"));

/// Default maximum number of redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline for the whole dial, redirects included.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// TCP keep-alive interval.
    pub keep_alive: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// `User-Agent` header set on new requests.
    pub user_agent: String,
    /// Redirect handling during dial.
    pub redirect: RedirectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
            keep_alive: Duration::from_secs(30),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: USER_AGENT.to_string(),
            redirect: RedirectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// How the transport follows `3xx` responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPolicy {
    /// Whether redirects are followed at all.
    pub follow: bool,
    /// Maximum number of redirects before failing with
    /// [`Error::TooManyRedirects`](crate::Error::TooManyRedirects).
    pub limit: usize,
    /// Forward every header to the redirect target, even across hosts.
    pub trusted: bool,
    /// Headers dropped when an untrusted redirect changes host.
    pub sensitive_headers: Vec<HeaderName>,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            follow: true,
            limit: DEFAULT_MAX_REDIRECTS,
            trusted: false,
            sensitive_headers: vec![WWW_AUTHENTICATE, AUTHORIZATION, PROXY_AUTHORIZATION],
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    keep_alive: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    user_agent: Option<String>,
    redirect: Option<RedirectPolicy>,
}

impl ClientConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the TCP keep-alive interval.
    #[must_use]
    pub const fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the `User-Agent` header value.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the redirect policy.
    #[must_use]
    pub fn redirect(mut self, policy: RedirectPolicy) -> Self {
        self.redirect = Some(policy);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            keep_alive: self.keep_alive.unwrap_or(defaults.keep_alive),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            redirect: self.redirect.unwrap_or(defaults.redirect),
        }
    }
}
