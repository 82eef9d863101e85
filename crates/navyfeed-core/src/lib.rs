//! Core types, filters, and shared utilities for the Navyfeed feed generator.
//!
//! This crate provides:
//! - Decoded repo-event and post-record types shared by the ingest and serve sides
//! - The membership filter (token matching over post text and image alt text)
//! - The retention window predicate
//! - AT-URI parsing for feed validation
//! - Configuration loaded from the environment
//! - Prometheus metrics helpers
//! - Shared error types

mod aturi;
mod config;
mod error;
mod filter;
pub mod metrics;
mod record;

// ═══════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════

/// NSID of the post collection tracked by the ingestor.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// NSID of the feed generator record collection. Feed AT-URIs must use it.
pub const FEED_GENERATOR_COLLECTION: &str = "app.bsky.feed.generator";

/// Embed type prefix for image embeds. The wire form may carry a `#main`
/// or `#view` variant suffix; all of them are the same embed kind.
pub const IMAGES_EMBED_TYPE: &str = "app.bsky.embed.images";

pub use aturi::AtUri;
pub use config::Config;
pub use error::{Error, Result};
pub use filter::{MembershipFilter, RetentionWindow};
pub use record::{
    CommitEvent, Embed, EmbeddedImage, PostCreate, PostDelete, PostOps, PostRecord, PostRef,
    RepoEvent,
};
