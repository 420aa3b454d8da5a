//! Integration tests for the phase execution engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use assert2::check;
use gallant_core::mux::{self, matchers};
use gallant_core::{Context, Error, Method, Middleware, Phase, PhasePlugin, Plugin};

fn suffix(value: &'static str) -> impl Fn(Context, gallant_core::Handler) + Send + Sync + 'static {
    move |mut ctx, h| {
        let trail = ctx.get_string("trail") + value;
        ctx.set("trail", trail);
        h.next(ctx);
    }
}

/// N request plugins appending a suffix run in registration order.
#[tokio::test]
async fn test_suffix_chain_in_registration_order() {
    for n in [1_usize, 2, 5, 16] {
        let middleware = Middleware::new();
        for _ in 0..n {
            middleware.use_request(suffix("x"));
        }

        let ctx = middleware
            .run(Phase::REQUEST, Context::new())
            .await
            .expect("run");

        check!(ctx.get_string("trail") == "x".repeat(n));
    }
}

/// An error set mid-chain prevents every later plugin of the phase.
#[tokio::test]
async fn test_error_mid_chain_stops_later_plugins() {
    let later = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&later);

    let middleware = Middleware::new();
    middleware
        .use_request(suffix("a"))
        .use_request(|ctx, h| h.error(ctx, Error::msg("rejected")))
        .use_request(move |ctx, h| {
            counter.fetch_add(1, Ordering::SeqCst);
            h.next(ctx);
        })
        .use_request(suffix("never"));

    let ctx = middleware
        .run(Phase::REQUEST, Context::new())
        .await
        .expect("run");

    check!(ctx.get_string("trail") == "a");
    check!(ctx.error().map(ToString::to_string) == Some("rejected".to_string()));
    check!(later.load(Ordering::SeqCst) == 0);
}

/// A plugin may resume its continuation from a spawned task.
#[tokio::test]
async fn test_asynchronous_continuation() {
    let middleware = Middleware::new();
    middleware
        .use_request(|mut ctx, h| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                ctx.set("trail", "async".to_string());
                h.next(ctx);
            });
        })
        .use_request(suffix(",sync"));

    let ctx = middleware
        .run(Phase::REQUEST, Context::new())
        .await
        .expect("run");

    check!(ctx.get_string("trail") == "async,sync");
}

/// A plugin calling every continuation operation only advances once.
#[tokio::test]
async fn test_repeated_continuation_calls_advance_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&runs);

    let middleware = Middleware::new();
    middleware
        .use_request(|ctx, h| {
            h.next(ctx.clone());
            h.stop(ctx.clone());
            h.error(ctx, Error::msg("late"));
        })
        .use_request(move |ctx, h| {
            counter.fetch_add(1, Ordering::SeqCst);
            h.next(ctx);
        });

    let ctx = middleware
        .run(Phase::REQUEST, Context::new())
        .await
        .expect("run");

    check!(runs.load(Ordering::SeqCst) == 1);
    check!(!ctx.is_stopped());
    check!(!ctx.has_error());
}

/// Removing or disabling a plugin while the layer is shared.
#[tokio::test]
async fn test_disable_then_remove() {
    let plugin: Arc<dyn Plugin> = Arc::new(PhasePlugin::request(suffix("p")));
    let middleware = Arc::new(Middleware::new());
    middleware.use_arc(Arc::clone(&plugin)).use_request(suffix("q"));

    plugin.disable();
    let ctx = middleware
        .run(Phase::REQUEST, Context::new())
        .await
        .expect("run");
    check!(ctx.get_string("trail") == "q");

    plugin.enable();
    let ctx = middleware
        .run(Phase::REQUEST, Context::new())
        .await
        .expect("run");
    check!(ctx.get_string("trail") == "pq");

    plugin.remove();
    let ctx = middleware
        .run(Phase::REQUEST, Context::new())
        .await
        .expect("run");
    check!(ctx.get_string("trail") == "q");
    check!(middleware.len() == 1);
}

/// Concurrent runs share a parent layer while it is being extended.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_on_shared_parent() {
    let parent = Arc::new(Middleware::new());
    parent.use_request(suffix("p"));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let parent = Arc::clone(&parent);
            tokio::spawn(async move {
                if i % 4 == 0 {
                    parent.use_response(suffix("r"));
                }
                let child = Middleware::with_parent(parent);
                child.use_request(suffix("c"));
                child.run(Phase::REQUEST, Context::new()).await
            })
        })
        .collect();

    for task in tasks {
        let ctx = task.await.expect("join").expect("run");
        check!(ctx.get_string("trail") == "pc");
    }
    check!(parent.len() == 5);
}

/// Request context inherits the client context store.
#[tokio::test]
async fn test_plugins_read_inherited_values() {
    let client = Context::new().into_shared();
    client
        .write()
        .expect("lock")
        .set("api_key", "k-123".to_string());

    let middleware = Middleware::new();
    middleware.use_request(|mut ctx, h| {
        let key = ctx.get_string("api_key");
        if let Err(err) = ctx.request_mut().set_header("X-Api-Key", &key) {
            h.error(ctx, err);
            return;
        }
        h.next(ctx);
    });

    let mut ctx = Context::new();
    ctx.use_parent(client);
    let ctx = middleware.run(Phase::REQUEST, ctx).await.expect("run");

    check!(ctx.request().header("x-api-key") == Some("k-123"));
}

/// Mux gating a header plugin on the request method.
#[tokio::test]
async fn test_mux_gates_on_method() {
    let gate = mux::all([matchers::method(Method::Get)]);
    gate.use_request(|mut ctx, h| {
        ctx.request_mut().set_header("X-Get", "1").ok();
        h.next(ctx);
    });
    let middleware = Middleware::new();
    middleware.use_plugin(gate);

    let mut post = Context::new();
    post.request_mut().set_method(Method::Post);
    let post = middleware.run(Phase::REQUEST, post).await.expect("run");
    check!(post.request().header("x-get").is_none());

    let get = middleware
        .run(Phase::REQUEST, Context::new())
        .await
        .expect("run");
    check!(get.request().header("x-get") == Some("1"));
}

/// Mux in the error phase recovers matching errors.
#[tokio::test]
async fn test_mux_recovers_errors() {
    let recover = mux::all([matchers::error()]);
    recover.use_error(|mut ctx, h| {
        if ctx.error().is_some_and(Error::is_timeout) {
            ctx.take_error();
            ctx.response_mut().set_status(504);
        }
        h.next(ctx);
    });
    let middleware = Middleware::new();
    middleware.use_plugin(recover);

    let mut ctx = Context::new();
    ctx.set_error(Error::Timeout);
    let ctx = middleware.run(Phase::ERROR, ctx).await.expect("run");

    check!(!ctx.has_error());
    check!(ctx.response().status() == 504);
}
