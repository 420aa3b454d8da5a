//! httpbin example
//!
//! Demonstrates client-level plugins, request builders and a mux recovering
//! server errors.

// Example-specific lint allowances
#![allow(missing_docs)]
#![allow(clippy::print_stdout)]

use std::time::Duration;

use gallant::plugins::{headers, logging, timeout};
use gallant::prelude::*;

/// Client with the defaults shared by every call of the demo.
fn httpbin(base_url: &str) -> Client {
    let client = Client::new();
    client
        .base_url(base_url)
        .use_plugin(headers::set("Accept", "application/json"))
        .use_plugin(timeout::request(Duration::from_secs(10)))
        .use_plugin(logging::info());

    // Turn 5xx into a marker the caller can inspect
    let server_errors = gallant::mux::all([matchers::server_error()]);
    server_errors.use_response(|mut ctx, h| {
        ctx.set("degraded", true);
        h.next(ctx);
    });
    client.use_plugin(server_errors);

    client
}

async fn status_of(client: &Client, code: u16) -> Result<(u16, bool)> {
    let response = client
        .get()
        .path("/status/:code")
        .param("code", code.to_string())
        .send()
        .await?;
    let degraded = response.context().get_as::<bool>("degraded").unwrap_or(false);
    Ok((response.status(), degraded))
}

#[tokio::main]
async fn main() -> Result<()> {
    let client = httpbin("https://httpbin.org");

    let response = client
        .get()
        .path("/get")
        .query("source", "gallant")
        .send()
        .await?;
    println!("GET /get -> {}", response.status());
    println!("{}", response.text());

    let (status, degraded) = status_of(&client, 503).await?;
    println!("GET /status/503 -> {status} (degraded: {degraded})");

    Ok(())
}
