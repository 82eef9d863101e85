//! API route definitions.

mod feed;
mod health;
mod well_known;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
///
/// # Route Structure
///
/// - `GET /health` - Health check
/// - `GET /.well-known/did.json` - did:web document for the service identity
/// - `GET /xrpc/app.bsky.feed.getFeedSkeleton` - Rate-limited feed skeleton
/// - `GET /xrpc/app.bsky.feed.describeFeedGenerator` - Published feeds
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/.well-known/did.json", get(well_known::did_document))
        .route(
            "/xrpc/app.bsky.feed.getFeedSkeleton",
            get(feed::get_feed_skeleton),
        )
        .route(
            "/xrpc/app.bsky.feed.describeFeedGenerator",
            get(feed::describe_feed_generator),
        )
        .with_state(state)
}
