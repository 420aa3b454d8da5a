//! Transaction deadline plugin.

use std::time::Duration;

use crate::PhasePlugin;

/// Bound the whole dial, redirects included.
///
/// An expired deadline reaches the `error` phase as [`Error::Timeout`](crate::Error::Timeout).
#[must_use]
pub fn request(timeout: Duration) -> PhasePlugin {
    PhasePlugin::request(move |mut ctx, h| {
        ctx.config_mut().timeout = timeout;
        h.next(ctx);
    })
}
