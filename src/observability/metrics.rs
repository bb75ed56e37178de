//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (request rates, latency, payment outcomes)
//! - Expose Prometheus-compatible metrics endpoint
//! - Record per-route HTTP timings
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency by route
//! - `webhook_events_total` (counter): webhook deliveries by type and outcome
//! - `checkout_sessions_total` (counter): checkout sessions created, by plan
//! - `boosts_expired_total` (counter): boost windows cleared by the sweep
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Route label uses the matched pattern, not the raw path, to bound cardinality
//! - Histogram buckets tuned for typical web latencies

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use thiserror::Error;

use crate::config::schema::ObservabilityConfig;

const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("failed to install metrics exporter: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}

/// Install the Prometheus exporter on its own listener and register
/// metric descriptions. Does nothing when metrics are disabled.
pub fn init(config: &ObservabilityConfig) -> Result<(), MetricsError> {
    if !config.metrics_enabled {
        return Ok(());
    }

    let address: SocketAddr = config.metrics_address.parse()?;
    PrometheusBuilder::new()
        .with_http_listener(address)
        .set_buckets(DURATION_BUCKETS)?
        .install()?;

    describe_counter!(
        "http_requests_total",
        "Requests served, labelled by method, route and status."
    );
    describe_histogram!(
        "http_request_duration_seconds",
        "Request latency in seconds, labelled by route."
    );
    describe_counter!(
        "webhook_events_total",
        "Payment webhook deliveries, labelled by event type and outcome."
    );
    describe_counter!(
        "checkout_sessions_total",
        "Checkout sessions created, labelled by plan."
    );
    describe_counter!(
        "boosts_expired_total",
        "Boost windows cleared by the expiry sweep."
    );

    Ok(())
}

/// Axum middleware recording a counter and latency histogram per request.
pub async fn track_http(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!(
        "http_requests_total",
        "method" => method,
        "route" => route.clone(),
        "status" => status
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());

    response
}
