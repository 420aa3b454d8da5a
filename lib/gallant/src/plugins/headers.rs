//! Request header plugins.

use crate::{Context, Handler, PhasePlugin};

fn with_headers<F>(update: F) -> PhasePlugin
where
    F: Fn(&mut Context) -> crate::Result<()> + Send + Sync + 'static,
{
    PhasePlugin::request(move |mut ctx, h: Handler| match update(&mut ctx) {
        Ok(()) => h.next(ctx),
        Err(err) => h.error(ctx, err),
    })
}

/// Set a header, replacing previous values.
#[must_use]
pub fn set(name: impl Into<String>, value: impl Into<String>) -> PhasePlugin {
    let (name, value) = (name.into(), value.into());
    with_headers(move |ctx| ctx.request_mut().set_header(&name, &value))
}

/// Append a header value.
#[must_use]
pub fn add(name: impl Into<String>, value: impl Into<String>) -> PhasePlugin {
    let (name, value) = (name.into(), value.into());
    with_headers(move |ctx| ctx.request_mut().append_header(&name, &value))
}

/// Set several headers at once.
#[must_use]
pub fn set_all<I, K, V>(headers: I) -> PhasePlugin
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let headers: Vec<(String, String)> = headers
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect();
    with_headers(move |ctx| {
        headers
            .iter()
            .try_for_each(|(name, value)| ctx.request_mut().set_header(name, value))
    })
}

/// Remove every value of a header.
#[must_use]
pub fn del(name: impl Into<String>) -> PhasePlugin {
    let name = name.into();
    with_headers(move |ctx| {
        ctx.request_mut().headers_mut().remove(name.as_str());
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Middleware, Phase};

    async fn run(middleware: &Middleware) -> Context {
        middleware
            .run(Phase::REQUEST, Context::new())
            .await
            .expect("run")
    }

    #[tokio::test]
    async fn set_add_and_del() {
        let middleware = Middleware::new();
        middleware
            .use_plugin(set("Accept", "text/html"))
            .use_plugin(add("Accept", "application/json"))
            .use_plugin(set_all([("X-One", "1"), ("X-Two", "2")]))
            .use_plugin(del("X-Two"));

        let ctx = run(&middleware).await;
        let request = ctx.request();
        assert_eq!(request.headers().get_all("accept").iter().count(), 2);
        assert_eq!(request.header("x-one"), Some("1"));
        assert!(request.header("x-two").is_none());
    }

    #[tokio::test]
    async fn invalid_header_fails_the_phase() {
        let middleware = Middleware::new();
        middleware.use_plugin(set("bad header", "value"));

        let ctx = run(&middleware).await;
        assert!(matches!(ctx.error(), Some(Error::InvalidRequest(_))));
    }
}
