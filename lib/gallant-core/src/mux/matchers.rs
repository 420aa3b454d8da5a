//! Built-in matchers.
//!
//! Each matcher only accepts the context in the phase it applies to: request
//! matchers during `request`, response matchers during `response`, and
//! [`error`] during `error`. Pattern arguments are regular expressions matched
//! anywhere in the inspected value; an invalid pattern never matches. A missing
//! header or query parameter is matched as an empty string.

use std::sync::Arc;

use regex::Regex;

use super::Matcher;
use crate::{Context, Method, Phase};

fn in_phase(ctx: &Context, phase: &Phase) -> bool {
    ctx.phase().as_ref() == Some(phase)
}

fn pattern_matcher<F>(phase: Phase, pattern: &str, value: F) -> Matcher
where
    F: Fn(&Context) -> Option<String> + Send + Sync + 'static,
{
    let Ok(regex) = Regex::new(pattern) else {
        tracing::debug!(pattern, "invalid matcher pattern");
        return Arc::new(|_: &Context| false);
    };
    Arc::new(move |ctx: &Context| {
        in_phase(ctx, &phase) && value(ctx).is_some_and(|value| regex.is_match(&value))
    })
}

/// Request method equals `method`.
#[must_use]
pub fn method(method: Method) -> Matcher {
    Arc::new(move |ctx: &Context| {
        in_phase(ctx, &Phase::REQUEST) && ctx.request().method() == method
    })
}

/// Request method is one of `methods`.
#[must_use]
pub fn methods(methods: impl IntoIterator<Item = Method>) -> Matcher {
    let methods: Vec<Method> = methods.into_iter().collect();
    Arc::new(move |ctx: &Context| {
        in_phase(ctx, &Phase::REQUEST) && methods.contains(&ctx.request().method())
    })
}

/// Request URL path matches `pattern`.
#[must_use]
pub fn path(pattern: &str) -> Matcher {
    pattern_matcher(Phase::REQUEST, pattern, |ctx| {
        ctx.request().url().map(|url| url.path().to_string())
    })
}

/// Full request URL matches `pattern`.
#[must_use]
pub fn url(pattern: &str) -> Matcher {
    pattern_matcher(Phase::REQUEST, pattern, |ctx| {
        ctx.request().url().map(ToString::to_string)
    })
}

/// Request host matches `pattern`.
#[must_use]
pub fn host(pattern: &str) -> Matcher {
    pattern_matcher(Phase::REQUEST, pattern, |ctx| {
        ctx.request()
            .url()
            .map(|url| url.host_str().unwrap_or_default().to_string())
    })
}

/// First value of query parameter `key` matches `pattern`.
#[must_use]
pub fn query(key: &str, pattern: &str) -> Matcher {
    let key = key.to_string();
    pattern_matcher(Phase::REQUEST, pattern, move |ctx| {
        ctx.request().url().map(|url| {
            url.query_pairs()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default()
        })
    })
}

/// Request header `key` matches `pattern`.
#[must_use]
pub fn request_header(key: &str, pattern: &str) -> Matcher {
    let key = key.to_string();
    pattern_matcher(Phase::REQUEST, pattern, move |ctx| {
        Some(ctx.request().header(&key).unwrap_or_default().to_string())
    })
}

/// Response header `key` matches `pattern`.
#[must_use]
pub fn response_header(key: &str, pattern: &str) -> Matcher {
    let key = key.to_string();
    pattern_matcher(Phase::RESPONSE, pattern, move |ctx| {
        Some(ctx.response().header(&key).unwrap_or_default().to_string())
    })
}

/// Response status equals `code`.
#[must_use]
pub fn status(code: u16) -> Matcher {
    Arc::new(move |ctx: &Context| {
        in_phase(ctx, &Phase::RESPONSE) && ctx.response().status() == code
    })
}

/// Response status is within `start..=end`.
#[must_use]
pub fn status_range(start: u16, end: u16) -> Matcher {
    Arc::new(move |ctx: &Context| {
        in_phase(ctx, &Phase::RESPONSE) && (start..=end).contains(&ctx.response().status())
    })
}

/// Response status is a `5xx`.
#[must_use]
pub fn server_error() -> Matcher {
    Arc::new(|ctx: &Context| in_phase(ctx, &Phase::RESPONSE) && ctx.response().is_server_error())
}

/// The context carries an error.
#[must_use]
pub fn error() -> Matcher {
    Arc::new(|ctx: &Context| in_phase(ctx, &Phase::ERROR) && ctx.has_error())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::context::PHASE_KEY;

    fn in_request(url: &str) -> Context {
        let mut ctx = Context::new();
        ctx.set(PHASE_KEY, Phase::REQUEST.to_string());
        ctx.request_mut().set_url(url.parse().expect("valid URL"));
        ctx
    }

    fn in_response(status: u16) -> Context {
        let mut ctx = Context::new();
        ctx.set(PHASE_KEY, Phase::RESPONSE.to_string());
        ctx.response_mut().set_status(status);
        ctx
    }

    #[test]
    fn request_matchers_only_match_in_request_phase() {
        let mut ctx = in_request("https://api.example.com/users?page=2");
        assert!(method(Method::Get)(&ctx));
        assert!(path("^/users$")(&ctx));

        ctx.set(PHASE_KEY, Phase::RESPONSE.to_string());
        assert!(!method(Method::Get)(&ctx));
        assert!(!path("^/users$")(&ctx));
    }

    #[test]
    fn url_parts() {
        let ctx = in_request("https://api.example.com/users/42?page=2&sort=name");

        assert!(url(r"example\.com/users/\d+")(&ctx));
        assert!(host(r"^api\.")(&ctx));
        assert!(!host("^www")(&ctx));
        assert!(query("page", "^2$")(&ctx));
        assert!(!query("sort", "^date$")(&ctx));
        assert!(query("missing", "^$")(&ctx));
        assert!(methods([Method::Post, Method::Get])(&ctx));
        assert!(!methods([Method::Post])(&ctx));
    }

    #[test]
    fn invalid_pattern_never_matches() {
        let ctx = in_request("https://api.example.com/");
        assert!(!path("(unclosed")(&ctx));
    }

    #[test]
    fn headers() {
        let mut ctx = in_request("https://api.example.com/");
        ctx.request_mut()
            .set_header("Accept", "application/json")
            .expect("header");
        assert!(request_header("accept", "json$")(&ctx));
        assert!(!response_header("accept", "json$")(&ctx));

        let mut ctx = in_response(200);
        ctx.response_mut()
            .set_header("Content-Type", "text/html")
            .expect("header");
        assert!(response_header("Content-Type", "^text/")(&ctx));
    }

    #[test]
    fn response_status() {
        let ctx = in_response(503);
        assert!(status(503)(&ctx));
        assert!(status_range(500, 599)(&ctx));
        assert!(!status_range(200, 299)(&ctx));
        assert!(server_error()(&ctx));
        assert!(!server_error()(&in_response(404)));
    }

    #[test]
    fn error_matcher() {
        let mut ctx = Context::new();
        ctx.set(PHASE_KEY, Phase::ERROR.to_string());
        assert!(!error()(&ctx));

        ctx.set_error(Error::Timeout);
        assert!(error()(&ctx));
    }
}
