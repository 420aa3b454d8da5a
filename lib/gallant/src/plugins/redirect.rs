//! Redirect policy plugins.
//!
//! The policy is read by the transport while dialing, so these plugins only
//! adjust the configuration of the current transaction.

use crate::{Context, PhasePlugin, RedirectPolicy};

fn with_policy<F>(update: F) -> PhasePlugin
where
    F: Fn(&mut RedirectPolicy) + Send + Sync + 'static,
{
    PhasePlugin::request(move |mut ctx: Context, h| {
        update(&mut ctx.config_mut().redirect);
        h.next(ctx);
    })
}

/// Follow at most `limit` redirects.
#[must_use]
pub fn limit(limit: usize) -> PhasePlugin {
    with_policy(move |policy| {
        policy.follow = true;
        policy.limit = limit;
    })
}

/// Forward sensitive headers even when a redirect changes host.
#[must_use]
pub fn trusted(trusted: bool) -> PhasePlugin {
    with_policy(move |policy| policy.trusted = trusted)
}

/// Return `3xx` responses instead of following them.
#[must_use]
pub fn disable() -> PhasePlugin {
    with_policy(|policy| policy.follow = false)
}

/// Replace the whole policy.
#[must_use]
pub fn config(policy: RedirectPolicy) -> PhasePlugin {
    with_policy(move |current| current.clone_from(&policy))
}
