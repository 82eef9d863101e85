//! Prometheus metrics helpers for the Navyfeed service.
//!
//! Centralized metrics initialization and the metric names used across the
//! ingest and serve crates.
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component name (`ingest_`, `backfill_`, `feed_`)
//! - Suffix: unit or type (`_total`, `_seconds`)

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once at startup before any metrics are recorded.
/// Returns a handle for [`start_metrics_server`].
///
/// # Panics
///
/// Panics if called more than once (the recorder can only be installed once).
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    register_common_metrics();

    handle
}

/// Like [`init_metrics`] but returns `None` if the recorder is already
/// installed, instead of panicking. Useful for tests.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    PrometheusBuilder::new().install_recorder().ok()
}

/// Start the Prometheus metrics HTTP server.
///
/// Serves the `/metrics` endpoint on the specified port. Spawns a background
/// task and returns immediately.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("metrics server exited: {}", e);
        }
    });

    Ok(())
}

/// Register descriptions for the metrics recorded across Navyfeed.
///
/// Called automatically by [`init_metrics`].
fn register_common_metrics() {
    // =========================================================================
    // Stream Ingestion Metrics
    // =========================================================================

    describe_counter!("ingest_events_total", "Total decoded events received");
    describe_counter!(
        "ingest_posts_matched_total",
        "Posts that passed the membership and retention checks"
    );
    describe_counter!(
        "ingest_posts_deleted_total",
        "Post references removed on delete operations"
    );
    describe_counter!(
        "ingest_batch_errors_total",
        "Commit batches aborted by a store error"
    );

    // =========================================================================
    // Backfill Metrics
    // =========================================================================

    describe_counter!(
        "backfill_posts_total",
        "Post references written by the startup backfill"
    );
    describe_gauge!(
        "backfill_running",
        "Whether the startup backfill is currently running (1=yes, 0=no)"
    );

    // =========================================================================
    // Serving Metrics
    // =========================================================================

    describe_counter!("feed_requests_total", "Feed skeleton requests received");
    describe_counter!(
        "feed_rate_limited_total",
        "Requests rejected by the rate limiter"
    );
    describe_gauge!(
        "rate_limiter_keys",
        "Rate counters currently tracked in memory"
    );
}
