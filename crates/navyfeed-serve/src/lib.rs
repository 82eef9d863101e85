//! Read side of the Navyfeed feed generator.
//!
//! Serves feed skeletons over XRPC-shaped HTTP endpoints, gated by a keyed
//! fixed-window rate limiter. Ranking itself is pluggable: handlers validate
//! the requested feed, authenticate (optionally), apply the rate limit, and
//! delegate to whatever [`FeedAlgorithm`] is registered for the feed's
//! record key.
//!
//! # Architecture
//!
//! - **AppState**: shared state (post store, limiter, algorithm registry)
//! - **Auth**: optional bearer identity; absent credentials mean anonymous
//! - **RateLimit**: per-caller fixed-window counters with idle eviction
//! - **Routes**: feed skeleton, generator description, did:web document,
//!   health

mod algos;
mod auth;
mod error;
mod ratelimit;
mod routes;
mod state;

pub use self::algos::{AlgorithmRegistry, FeedAlgorithm, FeedSkeleton, ReverseChronological, SkeletonItem};
pub use self::auth::{Authenticator, BearerIdentity};
pub use self::error::ApiError;
pub use self::ratelimit::{CallerClass, Decision, FixedWindowLimiter, RateLimiterConfig};
pub use self::routes::router;
pub use self::state::AppState;
