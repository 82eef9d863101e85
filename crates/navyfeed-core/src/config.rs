//! Service configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000").
    pub bind_addr: String,

    /// Path to the SQLite post database.
    pub db_path: PathBuf,

    /// DID of the identity that published the feed generator records.
    pub publisher_did: String,

    /// DID of this feed generator service itself.
    pub service_did: String,

    /// Public hostname of this service (used for the did:web document).
    pub hostname: String,

    /// Record key under which the feed is published.
    pub feed_rkey: String,

    /// Token matched case-insensitively against post text.
    pub primary_token: String,

    /// Token matched case-insensitively against image alt text.
    pub secondary_token: String,

    /// Trailing retention period for matched posts, in days.
    pub retention_days: i64,

    /// Rate-limit window length.
    pub rate_window: Duration,

    /// Maximum requests per window for authenticated callers.
    pub rate_max_authenticated: u32,

    /// Maximum requests per window for anonymous callers.
    pub rate_max_anonymous: u32,

    /// How long an untouched rate counter survives before eviction.
    pub rate_idle_timeout: Duration,

    /// Base URL of the search service used for the startup backfill.
    pub search_url: String,

    /// Prometheus metrics port (0 disables the metrics server).
    pub metrics_port: u16,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `NAVYFEED_PUBLISHER_DID`: DID that owns the published feed record
    ///
    /// Everything else has a default; see the field docs above.
    pub fn from_env() -> anyhow::Result<Self> {
        let hostname = env_or("NAVYFEED_HOSTNAME", "feed.example.com");

        let publisher_did = std::env::var("NAVYFEED_PUBLISHER_DID")
            .map_err(|_| anyhow::anyhow!("NAVYFEED_PUBLISHER_DID environment variable is required"))?;

        let service_did = env_or("NAVYFEED_SERVICE_DID", &format!("did:web:{hostname}"));

        let config = Self {
            bind_addr: env_or("NAVYFEED_BIND_ADDR", "0.0.0.0:3000"),
            db_path: PathBuf::from(env_or("NAVYFEED_DB_PATH", "./data/navyfeed.sqlite")),
            publisher_did,
            service_did,
            hostname,
            feed_rkey: env_or("NAVYFEED_FEED_RKEY", "navyfragen"),
            primary_token: env_or("NAVYFEED_PRIMARY_TOKEN", "fragen.navy"),
            secondary_token: env_or("NAVYFEED_SECONDARY_TOKEN", "navyfragen"),
            retention_days: env_parse("NAVYFEED_RETENTION_DAYS", 14)?,
            rate_window: Duration::from_millis(env_parse("NAVYFEED_RATE_WINDOW_MS", 60_000)?),
            rate_max_authenticated: env_parse("NAVYFEED_RATE_MAX_AUTH", 10)?,
            rate_max_anonymous: env_parse("NAVYFEED_RATE_MAX_ANON", 5)?,
            rate_idle_timeout: Duration::from_secs(env_parse("NAVYFEED_RATE_IDLE_SECS", 900)?),
            search_url: env_or("NAVYFEED_SEARCH_URL", "https://api.bsky.app"),
            metrics_port: env_parse("NAVYFEED_METRICS_PORT", 0)?,
        };

        tracing::info!(
            bind_addr = %config.bind_addr,
            db_path = %config.db_path.display(),
            publisher_did = %config.publisher_did,
            feed_rkey = %config.feed_rkey,
            retention_days = config.retention_days,
            "configuration loaded"
        );

        Ok(config)
    }

    /// The AT-URI of the published feed.
    pub fn feed_uri(&self) -> String {
        format!(
            "at://{}/{}/{}",
            self.publisher_did,
            crate::FEED_GENERATOR_COLLECTION,
            self.feed_rkey
        )
    }
}
