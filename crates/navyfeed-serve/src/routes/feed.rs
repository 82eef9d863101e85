//! Feed skeleton and generator description endpoints.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use metrics::counter;
use serde::Deserialize;
use serde_json::{json, Value};

use navyfeed_core::{AtUri, FEED_GENERATOR_COLLECTION};

use crate::algos::FeedSkeleton;
use crate::error::ApiError;
use crate::ratelimit::{CallerClass, Decision};
use crate::state::AppState;

/// Rate-limit key when no identity and no remote address are available.
const UNKNOWN_CALLER: &str = "unknown";

#[derive(Debug, Deserialize)]
pub struct FeedSkeletonParams {
    feed: String,
    limit: Option<u32>,
    cursor: Option<String>,
}

/// Remote address of the caller, when the listener provides one.
///
/// Unlike `ConnectInfo` this never rejects: tests and exotic listeners
/// simply yield `None`, which maps to the sentinel rate-limit key.
pub(crate) struct ClientAddr(pub(crate) Option<SocketAddr>);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

/// `GET /xrpc/app.bsky.feed.getFeedSkeleton`
///
/// Validates the requested feed, resolves the caller (anonymous when no
/// credentials are supplied), applies the rate limit before any further
/// work, and delegates to the registered algorithm.
pub async fn get_feed_skeleton(
    State(state): State<AppState>,
    ClientAddr(remote_addr): ClientAddr,
    headers: HeaderMap,
    Query(params): Query<FeedSkeletonParams>,
) -> Result<Json<FeedSkeleton>, ApiError> {
    counter!("feed_requests_total").increment(1);

    let feed_uri = AtUri::parse(&params.feed)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    if feed_uri.authority != state.config.publisher_did
        || feed_uri.collection != FEED_GENERATOR_COLLECTION
    {
        return Err(ApiError::UnsupportedAlgorithm);
    }
    let Some(algo) = state.algos.get(&feed_uri.rkey) else {
        return Err(ApiError::UnsupportedAlgorithm);
    };

    let caller = state.authenticator.authenticate(&headers)?;

    let (key, class) = match &caller {
        Some(identity) => (identity.clone(), CallerClass::Authenticated),
        None => (
            remote_addr
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| UNKNOWN_CALLER.to_string()),
            CallerClass::Anonymous,
        ),
    };

    if state.limiter.check(&key, class) == Decision::Limit {
        counter!("feed_rate_limited_total").increment(1);
        tracing::debug!(key = %key, "rate limit exceeded");
        return Err(ApiError::RateLimitExceeded);
    }

    let skeleton = algo.feed_skeleton(&state.store, params.limit, params.cursor.as_deref())?;
    Ok(Json(skeleton))
}

/// `GET /xrpc/app.bsky.feed.describeFeedGenerator`
pub async fn describe_feed_generator(State(state): State<AppState>) -> Json<Value> {
    let feeds: Vec<Value> = state
        .algos
        .rkeys()
        .map(|rkey| {
            json!({
                "uri": format!(
                    "at://{}/{}/{}",
                    state.config.publisher_did, FEED_GENERATOR_COLLECTION, rkey
                )
            })
        })
        .collect();

    Json(json!({
        "did": state.config.service_did,
        "feeds": feeds,
    }))
}
