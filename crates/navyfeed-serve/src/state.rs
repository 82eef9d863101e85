//! Shared application state.

use std::sync::Arc;

use navyfeed_core::Config;
use navyfeed_ingest::PostStore;

use crate::algos::AlgorithmRegistry;
use crate::auth::Authenticator;
use crate::ratelimit::FixedWindowLimiter;

/// Shared state available to all request handlers.
///
/// The rate limiter is the only shared mutable process-wide state on the
/// serving path; it is created once here at startup and holds nothing
/// across restarts.
#[derive(Clone)]
pub struct AppState {
    /// Post reference store (read-only on this side).
    pub store: PostStore,

    /// Per-caller request counters.
    pub limiter: Arc<FixedWindowLimiter>,

    /// Ranking algorithms published by this service.
    pub algos: Arc<AlgorithmRegistry>,

    /// Optional-credential authenticator.
    pub authenticator: Arc<dyn Authenticator>,

    /// Application configuration.
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: PostStore,
        limiter: Arc<FixedWindowLimiter>,
        algos: AlgorithmRegistry,
        authenticator: Arc<dyn Authenticator>,
        config: Config,
    ) -> Self {
        Self {
            store,
            limiter,
            algos: Arc::new(algos),
            authenticator,
            config: Arc::new(config),
        }
    }
}
