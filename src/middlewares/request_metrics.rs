// Start of file: /src/middlewares/request_metrics.rs

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use axum::{
    body::Body,
    http::Request,
    middleware::Next,
};
use metrics::{counter, gauge};

static TOTAL_REQUESTS: AtomicU64 = AtomicU64::new(0);
static TOTAL_LATENCY_MICROS: AtomicU64 = AtomicU64::new(0);

/// Counts every request and publishes the running average latency in seconds
pub async fn request_metrics_middleware(
    mut req: Request<Body>,
    next: Next,
) -> Result<axum::response::Response, Infallible> {
    let start: Instant = Instant::now();
    req.extensions_mut().insert(start);

    // Pass the request down the chain
    let response: axum::response::Response = next.run(req).await;

    let elapsed: u64 = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
    let count: u64 = TOTAL_REQUESTS.fetch_add(1, Ordering::Relaxed) + 1;
    let total: u64 = TOTAL_LATENCY_MICROS
        .fetch_add(elapsed, Ordering::Relaxed)
        .saturating_add(elapsed);

    counter!("requests_count").increment(1);
    gauge!("requests_latency").set(total as f64 / count as f64 / 1_000_000.0);

    Ok(response)
}

// End of file: /src/middlewares/request_metrics.rs
