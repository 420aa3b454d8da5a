//! Transaction logging with `tracing`.
//!
//! The plugin records the dial start in the context store and emits one event
//! when the request leaves, one when the response phase runs and one when the
//! transaction reaches the `error` phase.

use std::time::Instant;

use tracing::{Level, debug, info, span, warn};

use crate::{Context, Handler, Phase, PhasePlugin};

/// Store key of the dial start instant.
pub const START_KEY: &str = "$logging.start";

/// Log level for the "sending request" event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level, request headers included.
    Debug,
    /// Log at info level, summary only.
    #[default]
    Info,
}

/// Logging plugin at info level.
#[must_use]
pub fn info() -> PhasePlugin {
    with_level(LogLevel::Info)
}

/// Logging plugin at debug level.
#[must_use]
pub fn debug() -> PhasePlugin {
    with_level(LogLevel::Debug)
}

/// Logging plugin at the given level.
#[must_use]
pub fn with_level(level: LogLevel) -> PhasePlugin {
    PhasePlugin::new()
        .on(Phase::BEFORE_DIAL, move |ctx, h| sending(level, ctx, h))
        .on(Phase::RESPONSE, completed)
        .on(Phase::ERROR, failed)
}

fn url_of(ctx: &Context) -> String {
    ctx.request()
        .url()
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn elapsed_ms(ctx: &Context) -> u64 {
    ctx.get_as::<Instant>(START_KEY).map_or(0, |start| {
        // Saturating conversion to u64 (truncates after ~584 million years)
        u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
    })
}

fn sending(level: LogLevel, mut ctx: Context, h: Handler) {
    let method = ctx.request().method();
    let url = url_of(&ctx);
    let span = span!(Level::INFO, "http_request", %method, %url);
    span.in_scope(|| match level {
        LogLevel::Debug => {
            debug!(
                method = %method,
                url = %url,
                headers = ?ctx.request().headers(),
                "sending request"
            );
        }
        LogLevel::Info => {
            info!(method = %method, url = %url, "sending request");
        }
    });

    ctx.set(START_KEY, Instant::now());
    h.next(ctx);
}

fn completed(ctx: Context, h: Handler) {
    let status = ctx.response().status();
    let elapsed_ms = elapsed_ms(&ctx);
    if ctx.response().is_success() {
        info!(status, elapsed_ms, "request completed");
    } else {
        warn!(status, elapsed_ms, "request failed with HTTP error");
    }
    h.next(ctx);
}

fn failed(ctx: Context, h: Handler) {
    if let Some(error) = ctx.error() {
        warn!(%error, elapsed_ms = elapsed_ms(&ctx), url = %url_of(&ctx), "request failed");
    }
    h.next(ctx);
}
