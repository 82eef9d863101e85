//! Navyfeed service daemon.
//!
//! Startup sequencing matters here: the store opens first, the one-shot
//! backfill runs to completion (or fails soft) next, and only then do the
//! stream ingest task and the HTTP listener start. The serving surface never
//! observes a half-finished backfill.
//!
//! # Usage
//!
//! ```bash
//! # Decoded events piped in from the transport adapter
//! transport-adapter | navyfeed
//!
//! # Or replayed from a capture file
//! navyfeed --events ./events.jsonl
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Request;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use navyfeed_core::{
    metrics::{init_metrics, start_metrics_server},
    Config, MembershipFilter, RetentionWindow,
};
use navyfeed_ingest::{
    BackfillReconciler, HttpSearchClient, JsonlSource, PostStore, StreamIngestor,
};
use navyfeed_serve::{
    router, AlgorithmRegistry, AppState, BearerIdentity, FixedWindowLimiter, RateLimiterConfig,
    ReverseChronological,
};

/// How many decoded events may queue between the source and the ingestor.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// How often the rate limiter sweeps idle counters.
const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Navyfeed feed generator daemon.
#[derive(Parser, Debug)]
#[command(name = "navyfeed")]
#[command(about = "Curated feed generator for the NavyFragen community", long_about = None)]
#[command(version)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,

    /// Decoded event stream as JSONL: a file path, or "-" for stdin.
    #[arg(long, default_value = "-")]
    events: String,

    /// Skip the startup backfill.
    #[arg(long)]
    no_backfill: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    if config.metrics_port > 0 {
        let handle = init_metrics();
        start_metrics_server(config.metrics_port, handle).await?;
    }

    let store = PostStore::open(&config.db_path)?;
    let filter = MembershipFilter::new(&config.primary_token, &config.secondary_token);
    let retention = RetentionWindow::days(config.retention_days);

    // One-time historical reconciliation, strictly before serving starts.
    // Failures are logged inside run() and never abort startup.
    if args.no_backfill {
        tracing::info!("backfill disabled, skipping");
    } else {
        let reconciler = BackfillReconciler::new(
            HttpSearchClient::new(&config.search_url),
            store.clone(),
            filter.clone(),
            retention,
        );
        reconciler
            .run(&config.primary_token, &config.secondary_token)
            .await;
    }

    // Stream ingestion: single consumer, one event at a time. The bounded
    // channel pushes back on the source when the ingestor falls behind.
    let (events_tx, events_rx) = tokio::sync::mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let ingestor = StreamIngestor::new(store.clone(), filter, retention);
    tokio::spawn(ingestor.run(events_rx));

    let source = match args.events.as_str() {
        "-" => JsonlSource::from_stdin(),
        path => JsonlSource::from_file(PathBuf::from(path)),
    };
    tokio::spawn(async move {
        if let Err(e) = source.run(events_tx).await {
            tracing::error!(error = %e, "event source failed");
        }
    });

    // Rate limiter: the only shared mutable process-wide state on the
    // serving path. In-memory only; counters do not survive restarts.
    let limiter = Arc::new(FixedWindowLimiter::new(RateLimiterConfig {
        window: config.rate_window,
        max_authenticated: config.rate_max_authenticated,
        max_anonymous: config.rate_max_anonymous,
        idle_timeout: config.rate_idle_timeout,
    }));
    FixedWindowLimiter::spawn_sweeper(Arc::clone(&limiter), SWEEP_INTERVAL);

    let mut algos = AlgorithmRegistry::new();
    algos.register(&config.feed_rkey, Arc::new(ReverseChronological));

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(store, limiter, algos, Arc::new(BearerIdentity), config);

    let app = router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
