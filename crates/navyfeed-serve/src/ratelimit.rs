//! Keyed fixed-window rate limiting.
//!
//! One counter per caller key (resolved identity for authenticated callers,
//! remote address otherwise). A counter resets when its window has elapsed
//! and is evicted after sitting idle, so the map stays bounded by the set of
//! recently active callers instead of growing for the process lifetime.
//!
//! All state is in this process's memory only: no cross-process
//! coordination, and nothing survives a restart.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::gauge;

/// Limiter configuration. Defaults mirror the serving API contract:
/// a one-minute window, 10 requests for authenticated callers, 5 for
/// anonymous ones.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Fixed window length.
    pub window: Duration,
    /// Per-window budget for authenticated callers.
    pub max_authenticated: u32,
    /// Per-window budget for anonymous callers.
    pub max_anonymous: u32,
    /// Idle time after which a counter is eligible for eviction.
    pub idle_timeout: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(60_000),
            max_authenticated: 10,
            max_anonymous: 5,
            idle_timeout: Duration::from_secs(900),
        }
    }
}

/// Which request budget applies to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerClass {
    Authenticated,
    Anonymous,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Allow,
    /// The caller exhausted its budget for the current window.
    Limit,
}

#[derive(Debug)]
struct RateCounter {
    count: u32,
    window_start: Instant,
    last_seen: Instant,
}

/// Fixed-window request counters keyed by caller identity or address.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    counters: DashMap<String, RateCounter>,
    config: RateLimiterConfig,
}

impl FixedWindowLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            counters: DashMap::new(),
            config,
        }
    }

    /// Record a request for `key` and decide whether it may proceed.
    ///
    /// Runs before any further request work so a limited caller costs
    /// nothing beyond this lookup.
    pub fn check(&self, key: &str, class: CallerClass) -> Decision {
        self.check_at(key, class, Instant::now())
    }

    fn check_at(&self, key: &str, class: CallerClass, now: Instant) -> Decision {
        let limit = match class {
            CallerClass::Authenticated => self.config.max_authenticated,
            CallerClass::Anonymous => self.config.max_anonymous,
        };

        let mut counter = self.counters.entry(key.to_string()).or_insert(RateCounter {
            count: 0,
            window_start: now,
            last_seen: now,
        });
        counter.last_seen = now;

        if now.duration_since(counter.window_start) >= self.config.window {
            counter.count = 1;
            counter.window_start = now;
            return Decision::Allow;
        }

        counter.count += 1;
        if counter.count > limit {
            Decision::Limit
        } else {
            Decision::Allow
        }
    }

    /// Drop counters that have been idle longer than the configured timeout.
    ///
    /// Returns the number of evicted entries.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now())
    }

    fn sweep_idle_at(&self, now: Instant) -> usize {
        // Counted inside the closure: the map length can move under us
        // while requests insert fresh keys concurrently.
        let mut evicted = 0;
        self.counters.retain(|_, counter| {
            let keep = now.duration_since(counter.last_seen) < self.config.idle_timeout;
            if !keep {
                evicted += 1;
            }
            keep
        });
        gauge!("rate_limiter_keys").set(self.counters.len() as f64);
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.counters.len(), "swept idle rate counters");
        }
        evicted
    }

    /// Number of counters currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.counters.len()
    }

    /// Spawn a background task sweeping idle counters at the given interval.
    pub fn spawn_sweeper(limiter: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                limiter.sweep_idle();
            }
        })
    }
}
