//! Phase state machine of one transaction.
//!
//! ```text
//! request ─┬─> before dial ─> dial ─> after dial ─> response
//!          └─> intercept ─> response              (status already set)
//! ```
//!
//! Any step may divert to `error`; an error still set after the `error` phase
//! ends the transaction. A stopped context runs `stop` and ends the transaction
//! unless a stop handler resumed it.

use tracing::{debug, warn};

use crate::{Context, Error, Middleware, Phase, Result, RoundTrip};

/// Outcome of a dispatch step.
enum Flow {
    /// Carry on with the next step.
    Next(Context),
    /// The transaction is over.
    Done(Context),
}

impl Flow {
    fn into_context(self) -> Context {
        match self {
            Self::Next(ctx) | Self::Done(ctx) => ctx,
        }
    }
}

/// Return the final context from the enclosing `dispatch` step on [`Flow::Done`].
macro_rules! proceed {
    ($flow:expr) => {
        match $flow? {
            Flow::Next(ctx) => ctx,
            Flow::Done(ctx) => return Ok(ctx),
        }
    };
}

/// Runs the fixed phase sequence of a transaction against a middleware layer.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    middleware: &'a Middleware,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher over the request middleware.
    #[must_use]
    pub const fn new(middleware: &'a Middleware) -> Self {
        Self { middleware }
    }

    /// Run the whole transaction and return the final context.
    ///
    /// The context is returned whatever the outcome: callers inspect its error,
    /// stop flag and response status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Abandoned`] when a plugin dropped its continuation,
    /// which loses the context.
    pub async fn dispatch(&self, ctx: Context) -> Result<Context> {
        let ctx = self.run(&Phase::REQUEST, ctx).await?;
        let ctx = proceed!(self.recover(ctx).await);
        if ctx.response().is_produced() {
            return self.intercepted(ctx).await;
        }
        let ctx = proceed!(self.settle_stop(ctx).await);

        let ctx = self.run(&Phase::BEFORE_DIAL, ctx).await?;
        let ctx = proceed!(self.recover(ctx).await);
        let ctx = proceed!(self.settle_stop(ctx).await);

        let ctx = self.dial(ctx).await;
        let ctx = proceed!(self.recover(ctx).await);

        let ctx = self.run(&Phase::AFTER_DIAL, ctx).await?;
        let ctx = proceed!(self.recover(ctx).await);
        let ctx = proceed!(self.settle_stop(ctx).await);

        let ctx = self.run(&Phase::RESPONSE, ctx).await?;
        Ok(self.recover(ctx).await?.into_context())
    }

    async fn intercepted(&self, ctx: Context) -> Result<Context> {
        debug!(status = ctx.response().status(), "request intercepted");
        let ctx = self.run(&Phase::INTERCEPT, ctx).await?;
        let ctx = proceed!(self.recover(ctx).await);

        let ctx = self.run(&Phase::RESPONSE, ctx).await?;
        Ok(self.recover(ctx).await?.into_context())
    }

    async fn run(&self, phase: &Phase, ctx: Context) -> Result<Context> {
        debug!(%phase, plugins = self.middleware.len(), "running phase");
        self.middleware.run(phase, ctx).await
    }

    /// Run the `error` phase when the context carries an error.
    async fn recover(&self, ctx: Context) -> Result<Flow> {
        if !ctx.has_error() {
            return Ok(Flow::Next(ctx));
        }
        let ctx = self.run(&Phase::ERROR, ctx).await?;
        Ok(if ctx.has_error() {
            Flow::Done(ctx)
        } else {
            Flow::Next(ctx)
        })
    }

    /// Run the `stop` phase when the context is stopped.
    async fn settle_stop(&self, ctx: Context) -> Result<Flow> {
        if !ctx.is_stopped() {
            return Ok(Flow::Next(ctx));
        }
        let mut ctx = self.run(&Phase::STOP, ctx).await?;
        if ctx.has_error() {
            ctx = self.run(&Phase::ERROR, ctx).await?;
        }
        Ok(if ctx.has_error() || ctx.is_stopped() {
            Flow::Done(ctx)
        } else {
            Flow::Next(ctx)
        })
    }

    async fn dial(&self, mut ctx: Context) -> Context {
        let Some(transport) = ctx.transport().cloned() else {
            ctx.set_error(Error::MissingTransport);
            return ctx;
        };

        debug!(
            method = %ctx.request().method(),
            url = ?ctx.request().url().map(url::Url::as_str),
            "dialing"
        );
        let RoundTrip { response, error } = transport
            .round_trip(ctx.request().clone(), ctx.config())
            .await;

        if let Some(response) = response {
            ctx.set_response(response);
        }
        if let Some(error) = error {
            warn!(%error, "transport failed");
            ctx.set_error(error);
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::HeaderMap;

    use super::*;
    use crate::{ClientConfig, HttpRequest, HttpResponse, Transport, TransportFuture};

    /// Transport answering with a fixed status and counting dials.
    #[derive(Default)]
    struct StaticTransport {
        status: u16,
        fail: bool,
        dials: AtomicUsize,
    }

    impl Transport for StaticTransport {
        fn round_trip(&self, _request: HttpRequest, _config: &ClientConfig) -> TransportFuture {
            self.dials.fetch_add(1, Ordering::SeqCst);
            let round_trip = if self.fail {
                RoundTrip::failed(Error::connection("refused"))
            } else {
                RoundTrip::ok(HttpResponse::new(self.status, HeaderMap::new(), Bytes::new()))
            };
            Box::pin(async move { round_trip })
        }
    }

    fn context_with(transport: &Arc<StaticTransport>) -> Context {
        let mut ctx = Context::new();
        ctx.set_transport(Arc::clone(transport) as Arc<dyn Transport>);
        ctx
    }

    fn record(phase: &'static str) -> impl Fn(Context, crate::Handler) + Send + Sync + 'static {
        move |mut ctx, h| {
            let trail = ctx.get_string("trail") + phase + ";";
            ctx.set("trail", trail);
            h.next(ctx);
        }
    }

    #[tokio::test]
    async fn runs_every_phase_in_order() {
        let transport = Arc::new(StaticTransport {
            status: 200,
            ..StaticTransport::default()
        });
        let middleware = Middleware::new();
        for phase in ["request", "before dial", "after dial", "response", "error", "stop"] {
            middleware.use_handler(phase, record(phase));
        }

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert_eq!(ctx.get_string("trail"), "request;before dial;after dial;response;");
        assert_eq!(ctx.response().status(), 200);
        assert_eq!(transport.dials.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stopped_interception_skips_the_dial() {
        let transport = Arc::new(StaticTransport::default());
        let middleware = Middleware::new();
        middleware.use_request(|mut ctx, h| {
            ctx.response_mut().set_status(201);
            h.stop(ctx);
        });

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert_eq!(transport.dials.load(Ordering::SeqCst), 0);
        assert!(ctx.is_stopped());
        assert!(!ctx.has_error());
        assert_eq!(ctx.response().status(), 201);
    }

    #[tokio::test]
    async fn interception_runs_intercept_then_response() {
        let transport = Arc::new(StaticTransport::default());
        let middleware = Middleware::new();
        middleware
            .use_request(|mut ctx, h| {
                ctx.response_mut().set_status(200);
                h.next(ctx);
            })
            .use_handler(Phase::INTERCEPT, record("intercept"))
            .use_response(|mut ctx, h| {
                ctx.response_mut().set_status(204);
                h.next(ctx);
            });

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert_eq!(transport.dials.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.get_string("trail"), "intercept;");
        assert_eq!(ctx.response().status(), 204);
    }

    #[tokio::test]
    async fn stop_phase_error_is_kept() {
        let transport = Arc::new(StaticTransport::default());
        let middleware = Middleware::new();
        middleware
            .use_request(|mut ctx, h| {
                ctx.set("foo", "bar".to_string());
                h.stop(ctx);
            })
            .use_handler(Phase::STOP, |ctx, h| h.error(ctx, Error::msg("stop")));

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert!(ctx.is_stopped());
        assert_eq!(ctx.error().map(ToString::to_string), Some("stop".to_string()));
        assert_eq!(ctx.get_string("foo"), "bar");
        assert_eq!(transport.dials.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn recovered_stop_phase_error_resumes_the_dial() {
        let transport = Arc::new(StaticTransport {
            status: 200,
            ..StaticTransport::default()
        });
        let middleware = Middleware::new();
        middleware
            .use_request(|ctx, h| h.stop(ctx))
            .use_handler(Phase::STOP, |mut ctx, h| {
                ctx.set_stopped(false);
                h.error(ctx, Error::msg("stop"));
            })
            .use_error(|mut ctx, h| {
                ctx.take_error();
                h.next(ctx);
            });

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert!(!ctx.is_stopped());
        assert!(!ctx.has_error());
        assert_eq!(transport.dials.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.response().status(), 200);
    }

    #[tokio::test]
    async fn stop_without_response_ends_before_dial() {
        let transport = Arc::new(StaticTransport::default());
        let middleware = Middleware::new();
        middleware
            .use_request(|ctx, h| h.stop(ctx))
            .use_handler(Phase::STOP, record("stop"))
            .use_handler(Phase::BEFORE_DIAL, record("before dial"));

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert_eq!(transport.dials.load(Ordering::SeqCst), 0);
        assert!(ctx.is_stopped());
        assert_eq!(ctx.get_string("trail"), "stop;");
    }

    #[tokio::test]
    async fn stop_handler_may_resume() {
        let transport = Arc::new(StaticTransport {
            status: 204,
            ..StaticTransport::default()
        });
        let middleware = Middleware::new();
        middleware
            .use_request(|ctx, h| h.stop(ctx))
            .use_handler(Phase::STOP, |mut ctx, h| {
                ctx.set_stopped(false);
                h.next(ctx);
            });

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert_eq!(transport.dials.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.response().status(), 204);
    }

    #[tokio::test]
    async fn unrecovered_request_error_ends_the_transaction() {
        let transport = Arc::new(StaticTransport::default());
        let middleware = Middleware::new();
        middleware
            .use_request(|ctx, h| h.error(ctx, Error::msg("bad input")))
            .use_error(record("error"))
            .use_response(record("response"));

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert_eq!(transport.dials.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.get_string("trail"), "error;");
        assert!(ctx.has_error());
    }

    #[tokio::test]
    async fn recovered_transport_error_reaches_the_response_phase() {
        let transport = Arc::new(StaticTransport {
            fail: true,
            ..StaticTransport::default()
        });
        let middleware = Middleware::new();
        middleware
            .use_error(|mut ctx, h| {
                if ctx.error().is_some_and(Error::is_connection) {
                    ctx.take_error();
                    ctx.response_mut().set_status(503);
                }
                h.next(ctx);
            })
            .use_response(record("response"));

        let ctx = Dispatcher::new(&middleware)
            .dispatch(context_with(&transport))
            .await
            .expect("dispatch");

        assert!(!ctx.has_error());
        assert_eq!(ctx.response().status(), 503);
        assert_eq!(ctx.get_string("trail"), "response;");
    }

    #[tokio::test]
    async fn missing_transport_is_reported() {
        let middleware = Middleware::new();
        let ctx = Dispatcher::new(&middleware)
            .dispatch(Context::new())
            .await
            .expect("dispatch");

        assert!(matches!(ctx.error(), Some(Error::MissingTransport)));
    }
}
