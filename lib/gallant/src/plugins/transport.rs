//! Transport selection plugin.

use std::sync::Arc;

use crate::{PhasePlugin, Transport};

/// Dial through `transport` instead of the one inherited from the client.
#[must_use]
pub fn set(transport: Arc<dyn Transport>) -> PhasePlugin {
    PhasePlugin::request(move |mut ctx, h| {
        ctx.set_transport(Arc::clone(&transport));
        h.next(ctx);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClientConfig, Context, HttpRequest, Middleware, Phase, RoundTrip, TransportFuture};

    struct Offline;

    impl Transport for Offline {
        fn round_trip(&self, _request: HttpRequest, _config: &ClientConfig) -> TransportFuture {
            Box::pin(async { RoundTrip::failed(crate::Error::connection("offline")) })
        }
    }

    #[tokio::test]
    async fn replaces_the_context_transport() {
        let offline: Arc<dyn Transport> = Arc::new(Offline);
        let middleware = Middleware::new();
        middleware.use_plugin(set(Arc::clone(&offline)));

        let ctx = middleware
            .run(Phase::REQUEST, Context::new())
            .await
            .expect("run");
        let selected = ctx.transport().expect("transport");
        assert!(Arc::ptr_eq(selected, &offline));
    }
}
