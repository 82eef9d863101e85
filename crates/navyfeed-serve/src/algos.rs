//! Feed algorithm registry.
//!
//! Ranking and pagination are pluggable: the serving path validates a feed
//! request and hands it to whatever [`FeedAlgorithm`] is registered under
//! the feed's record key, returning the algorithm's output verbatim.
//!
//! [`ReverseChronological`] is the stock algorithm: newest references
//! first, paged with an opaque `"<indexed_at_millis>::<cid>"` cursor.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use navyfeed_ingest::PostStore;

use crate::error::ApiError;

/// Lexicon default and maximum for the `limit` parameter.
const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 100;

/// The ordered list of post references returned by the serving API.
#[derive(Debug, Clone, Serialize)]
pub struct FeedSkeleton {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    pub feed: Vec<SkeletonItem>,
}

/// One item in a feed skeleton.
#[derive(Debug, Clone, Serialize)]
pub struct SkeletonItem {
    pub post: String,
}

/// A registered ranking algorithm.
pub trait FeedAlgorithm: Send + Sync {
    /// Produce a page of the feed from the stored references.
    fn feed_skeleton(
        &self,
        store: &PostStore,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<FeedSkeleton, ApiError>;
}

/// Algorithms published by this service, keyed by feed record key.
#[derive(Default)]
pub struct AlgorithmRegistry {
    algos: HashMap<String, Arc<dyn FeedAlgorithm>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rkey: &str, algo: Arc<dyn FeedAlgorithm>) {
        self.algos.insert(rkey.to_string(), algo);
    }

    pub fn get(&self, rkey: &str) -> Option<&Arc<dyn FeedAlgorithm>> {
        self.algos.get(rkey)
    }

    /// Record keys of all registered algorithms.
    pub fn rkeys(&self) -> impl Iterator<Item = &str> {
        self.algos.keys().map(String::as_str)
    }
}

/// Newest-first paging over the stored references.
#[derive(Debug, Default)]
pub struct ReverseChronological;

impl ReverseChronological {
    fn parse_cursor(cursor: &str) -> Result<(DateTime<Utc>, String), ApiError> {
        let malformed = || ApiError::BadRequest("malformed cursor".to_string());

        let (millis, cid) = cursor.split_once("::").ok_or_else(malformed)?;
        if cid.is_empty() {
            return Err(malformed());
        }
        let millis: i64 = millis.parse().map_err(|_| malformed())?;
        let ts = DateTime::from_timestamp_millis(millis).ok_or_else(malformed)?;
        Ok((ts, cid.to_string()))
    }

    fn render_cursor(last: &navyfeed_core::PostRef) -> String {
        format!("{}::{}", last.indexed_at.timestamp_millis(), last.cid)
    }
}

impl FeedAlgorithm for ReverseChronological {
    fn feed_skeleton(
        &self,
        store: &PostStore,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<FeedSkeleton, ApiError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        let before = match cursor {
            Some(cursor) => {
                let (ts, cid) = Self::parse_cursor(cursor)?;
                Some((ts, cid))
            }
            None => None,
        };

        let page = store.list_posts(
            limit,
            before.as_ref().map(|(ts, cid)| (*ts, cid.as_str())),
        )?;

        // No cursor on a short page: the caller has reached the end.
        let cursor = if page.len() == limit as usize {
            page.last().map(Self::render_cursor)
        } else {
            None
        };

        Ok(FeedSkeleton {
            cursor,
            feed: page
                .into_iter()
                .map(|post| SkeletonItem { post: post.uri })
                .collect(),
        })
    }
}
