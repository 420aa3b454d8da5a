//! `Authorization` header plugins.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::header::AUTHORIZATION;

use crate::PhasePlugin;

use super::headers;

/// Bearer token authentication.
#[must_use]
pub fn bearer(token: impl AsRef<str>) -> PhasePlugin {
    custom(format!("Bearer {}", token.as_ref()))
}

/// HTTP basic authentication.
#[must_use]
pub fn basic(username: impl AsRef<str>, password: impl AsRef<str>) -> PhasePlugin {
    let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
    custom(format!("Basic {}", STANDARD.encode(credentials)))
}

/// Raw `Authorization` header value.
#[must_use]
pub fn custom(value: impl Into<String>) -> PhasePlugin {
    headers::set(AUTHORIZATION.as_str(), value)
}
