//! URL plugins.
//!
//! A URL without scheme is read as `http://`. Path parameters are `:name`
//! placeholders in the request path:
//!
//! ```
//! use gallant::plugins::url;
//!
//! let plugins = [
//!     url::base_url("https://api.example.com"),
//!     url::path("/users/:id"),
//!     url::param("id", "42"),
//! ];
//! # drop(plugins);
//! ```

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use ::url::Url;

use crate::{Context, Error, PhasePlugin, Result};

/// Path segment encode set: every character but unreserved and sub-delimiters.
const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'%');

fn with_url<F>(update: F) -> PhasePlugin
where
    F: Fn(&mut Context) -> Result<()> + Send + Sync + 'static,
{
    PhasePlugin::request(move |mut ctx, h| match update(&mut ctx) {
        Ok(()) => h.next(ctx),
        Err(err) => h.error(ctx, err),
    })
}

fn current_url(ctx: &mut Context) -> Result<&mut Url> {
    ctx.request_mut()
        .url_mut()
        .ok_or_else(|| Error::invalid_request("request URL is not set"))
}

fn parse(uri: &str) -> Result<Url> {
    let has_scheme = uri.starts_with("http://") || uri.starts_with("https://");
    if has_scheme {
        Ok(Url::parse(uri)?)
    } else {
        Ok(Url::parse(&format!("http://{uri}"))?)
    }
}

/// The root path is treated as empty when joining paths.
fn normalize_path(path: &str) -> &str {
    if path == "/" { "" } else { path }
}

/// Set the request URL.
#[must_use]
pub fn url(uri: impl Into<String>) -> PhasePlugin {
    let uri = uri.into();
    with_url(move |ctx| {
        let url = parse(&uri)?;
        ctx.request_mut().set_url(url);
        Ok(())
    })
}

/// Set the scheme, host and port, keeping the current path and query.
#[must_use]
pub fn base_url(uri: impl Into<String>) -> PhasePlugin {
    let uri = uri.into();
    with_url(move |ctx| {
        let mut base = parse(&uri)?;
        if let Some(current) = ctx.request().url() {
            base.set_path(current.path());
            base.set_query(current.query());
            base.set_fragment(current.fragment());
        }
        ctx.request_mut().set_url(base);
        Ok(())
    })
}

/// Replace the URL path.
#[must_use]
pub fn path(path: impl Into<String>) -> PhasePlugin {
    let path = path.into();
    with_url(move |ctx| {
        current_url(ctx)?.set_path(normalize_path(&path));
        Ok(())
    })
}

/// Append to the URL path.
#[must_use]
pub fn add_path(path: impl Into<String>) -> PhasePlugin {
    let path = path.into();
    with_url(move |ctx| {
        let url = current_url(ctx)?;
        let joined = format!("{}{}", normalize_path(url.path()), normalize_path(&path));
        url.set_path(&joined);
        Ok(())
    })
}

/// Prepend to the URL path.
#[must_use]
pub fn path_prefix(prefix: impl Into<String>) -> PhasePlugin {
    let prefix = prefix.into();
    with_url(move |ctx| {
        let url = current_url(ctx)?;
        let joined = format!("{}{}", normalize_path(&prefix), url.path());
        url.set_path(&joined);
        Ok(())
    })
}

/// Replace the `:key` placeholder of the path with the encoded `value`.
#[must_use]
pub fn param(key: impl Into<String>, value: impl Into<String>) -> PhasePlugin {
    params([(key.into(), value.into())])
}

/// Replace several path placeholders.
#[must_use]
pub fn params<I, K, V>(params: I) -> PhasePlugin
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let params: Vec<(String, String)> = params
        .into_iter()
        .map(|(key, value)| {
            let value: String = value.into();
            (
                format!(":{}", key.into()),
                utf8_percent_encode(&value, PATH_SEGMENT_ENCODE_SET).to_string(),
            )
        })
        .collect();
    with_url(move |ctx| {
        let url = current_url(ctx)?;
        let path = params
            .iter()
            .fold(url.path().to_string(), |path, (placeholder, value)| {
                path.replace(placeholder.as_str(), value)
            });
        url.set_path(&path);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Middleware, Phase};

    async fn url_after(plugins: Vec<PhasePlugin>) -> Context {
        let middleware = Middleware::new();
        for plugin in plugins {
            middleware.use_plugin(plugin);
        }
        middleware
            .run(Phase::REQUEST, Context::new())
            .await
            .expect("run")
    }

    fn url_of(ctx: &Context) -> String {
        ctx.request().url().map(ToString::to_string).unwrap_or_default()
    }

    #[tokio::test]
    async fn url_without_scheme_defaults_to_http() {
        let ctx = url_after(vec![url("example.com/users")]).await;
        assert_eq!(url_of(&ctx), "http://example.com/users");
    }

    #[tokio::test]
    async fn base_url_keeps_path_and_query() {
        let ctx = url_after(vec![
            url("http://localhost/users?page=2"),
            base_url("https://api.example.com:8443"),
        ])
        .await;
        assert_eq!(url_of(&ctx), "https://api.example.com:8443/users?page=2");
    }

    #[tokio::test]
    async fn path_composition() {
        let ctx = url_after(vec![
            base_url("https://api.example.com"),
            path("/users"),
            add_path("/:id"),
            path_prefix("/v1"),
            param("id", "a b/c"),
        ])
        .await;
        assert_eq!(url_of(&ctx), "https://api.example.com/v1/users/a%20b%2Fc");
    }

    #[tokio::test]
    async fn add_path_on_root() {
        let ctx = url_after(vec![url("https://api.example.com/"), add_path("/health")]).await;
        assert_eq!(url_of(&ctx), "https://api.example.com/health");
    }

    #[tokio::test]
    async fn path_without_url_is_an_error() {
        let ctx = url_after(vec![path("/users")]).await;
        assert!(matches!(ctx.error(), Some(Error::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn invalid_url_is_an_error() {
        let ctx = url_after(vec![url("http://[::1")]).await;
        assert!(matches!(ctx.error(), Some(Error::InvalidUrl(_))));
    }
}
