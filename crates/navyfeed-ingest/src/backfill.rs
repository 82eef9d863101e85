//! One-shot historical backfill.
//!
//! At startup, before the serving surface comes up, the reconciler runs two
//! ordered search passes to pick up matching posts that predate the live
//! stream: a primary-token text query, then a secondary-token query meant
//! to surface alt-text-only matches. The second query is full-text and can
//! return false positives, so its hits are re-checked against the filter's
//! alt-text branch before acceptance.
//!
//! Both passes share one retention cutoff (computed once per run) and one
//! dedup set, so a post surfaced by both queries is written exactly once.
//! Every failure is caught here and logged; the service starts without
//! backfilled data rather than refusing to start.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Deserialize;

use navyfeed_core::{Embed, MembershipFilter, PostRef, RetentionWindow};

use crate::error::Result;
use crate::store::PostStore;

/// How many results to request per search pass.
const SEARCH_LIMIT: u32 = 100;

/// A post as returned by the historical search capability.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPost {
    pub uri: String,
    pub cid: String,
    #[serde(rename = "indexedAt")]
    pub indexed_at: DateTime<Utc>,
    #[serde(default)]
    pub embed: Option<Embed>,
}

/// Boundary to the external historical search capability.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchPost>>;
}

/// Search client backed by the public AppView `app.bsky.feed.searchPosts`
/// endpoint.
pub struct HttpSearchClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchPostsResponse {
    #[serde(default)]
    posts: Vec<SearchPost>,
}

impl HttpSearchClient {
    /// `base_url` is the AppView origin, e.g. `https://api.bsky.app`.
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<SearchPost>> {
        let url = format!("{}/xrpc/app.bsky.feed.searchPosts", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("q", query), ("limit", &limit.to_string())])
            .send()
            .await?
            .error_for_status()?;
        let body: SearchPostsResponse = response.json().await?;
        Ok(body.posts)
    }
}

/// One search pass of the backfill.
struct BackfillPass<'a> {
    query: &'a str,
    /// Whether hits must additionally be confirmed by the alt-text branch
    /// of the membership filter.
    confirm_alt_text: bool,
}

/// Runs the startup reconciliation against an external search capability.
pub struct BackfillReconciler<S> {
    search: S,
    store: PostStore,
    filter: MembershipFilter,
    retention: RetentionWindow,
}

impl<S: SearchClient> BackfillReconciler<S> {
    pub fn new(
        search: S,
        store: PostStore,
        filter: MembershipFilter,
        retention: RetentionWindow,
    ) -> Self {
        Self {
            search,
            store,
            filter,
            retention,
        }
    }

    /// Run the backfill, swallowing any error.
    pub async fn run(&self, primary_token: &str, secondary_token: &str) {
        gauge!("backfill_running").set(1.0);
        match self.reconcile(primary_token, secondary_token).await {
            Ok(written) => {
                counter!("backfill_posts_total").increment(written as u64);
                tracing::info!(posts = written, "backfill complete");
            }
            Err(e) => {
                tracing::warn!(error = %e, "backfill failed, continuing without historical posts");
            }
        }
        gauge!("backfill_running").set(0.0);
    }

    async fn reconcile(&self, primary_token: &str, secondary_token: &str) -> Result<usize> {
        let cutoff = self.retention.cutoff(Utc::now());
        let passes = [
            BackfillPass {
                query: primary_token,
                confirm_alt_text: false,
            },
            BackfillPass {
                query: secondary_token,
                confirm_alt_text: true,
            },
        ];

        let mut seen: HashSet<String> = HashSet::new();
        let mut accepted: Vec<PostRef> = Vec::new();

        for pass in &passes {
            let posts = self.search.search(pass.query, SEARCH_LIMIT).await?;
            tracing::debug!(query = pass.query, hits = posts.len(), "search pass done");

            for post in posts {
                if post.indexed_at < cutoff {
                    continue;
                }
                if pass.confirm_alt_text && !self.filter.alt_text_matches(post.embed.as_ref()) {
                    continue;
                }
                if !seen.insert(post.uri.clone()) {
                    continue;
                }
                accepted.push(PostRef {
                    uri: post.uri,
                    cid: post.cid,
                    indexed_at: post.indexed_at,
                });
            }
        }

        self.store.insert_posts(&accepted)?;
        Ok(accepted.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use navyfeed_core::EmbeddedImage;
    use std::collections::HashMap;

    /// Mock search client returning canned results per query.
    struct FakeSearch {
        results: HashMap<String, Vec<SearchPost>>,
        fail: bool,
    }

    #[async_trait]
    impl SearchClient for FakeSearch {
        async fn search(&self, query: &str, _limit: u32) -> Result<Vec<SearchPost>> {
            if self.fail {
                return Err(crate::IngestError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "search unreachable",
                )));
            }
            Ok(self.results.get(query).cloned().unwrap_or_default())
        }
    }

    fn hit(uri: &str, age_days: i64, alt: Option<&str>) -> SearchPost {
        SearchPost {
            uri: uri.to_string(),
            cid: format!("cid-{uri}"),
            indexed_at: Utc::now() - Duration::days(age_days),
            embed: alt.map(|alt| Embed {
                kind: "app.bsky.embed.images#view".to_string(),
                images: vec![EmbeddedImage {
                    alt: Some(alt.to_string()),
                }],
            }),
        }
    }

    fn reconciler(results: HashMap<String, Vec<SearchPost>>, fail: bool) -> (
        BackfillReconciler<FakeSearch>,
        PostStore,
    ) {
        let store = PostStore::open_in_memory().unwrap();
        let reconciler = BackfillReconciler::new(
            FakeSearch { results, fail },
            store.clone(),
            MembershipFilter::new("fragen.navy", "navyfragen"),
            RetentionWindow::days(14),
        );
        (reconciler, store)
    }

    #[tokio::test]
    async fn test_primary_pass_applies_retention_only() {
        let results = HashMap::from([(
            "fragen.navy".to_string(),
            vec![hit("at://a/p/recent", 1, None), hit("at://a/p/old", 20, None)],
        )]);
        let (reconciler, store) = reconciler(results, false);
        reconciler.run("fragen.navy", "navyfragen").await;
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.list_posts(10, None).unwrap()[0].uri, "at://a/p/recent");
    }

    #[tokio::test]
    async fn test_secondary_pass_requires_alt_text_confirmation() {
        let results = HashMap::from([(
            "navyfragen".to_string(),
            vec![
                // Text-only false positive from the full-text query.
                hit("at://a/p/false-positive", 1, None),
                hit("at://a/p/confirmed", 1, Some("check NavyFragen out")),
            ],
        )]);
        let (reconciler, store) = reconciler(results, false);
        reconciler.run("fragen.navy", "navyfragen").await;
        let page = store.list_posts(10, None).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].uri, "at://a/p/confirmed");
    }

    #[tokio::test]
    async fn test_post_in_both_passes_stored_once() {
        let shared = hit("at://a/p/shared", 1, Some("navyfragen"));
        let results = HashMap::from([
            ("fragen.navy".to_string(), vec![shared.clone()]),
            ("navyfragen".to_string(), vec![shared]),
        ]);
        let (reconciler, store) = reconciler(results, false);
        reconciler.run("fragen.navy", "navyfragen").await;
        assert_eq!(store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_search_failure_is_swallowed() {
        let (reconciler, store) = reconciler(HashMap::new(), true);
        // Must not panic or propagate; the store just stays empty.
        reconciler.run("fragen.navy", "navyfragen").await;
        assert_eq!(store.count().unwrap(), 0);
    }
}
