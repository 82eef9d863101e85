//! Stream ingestor: decoded repo events in, stored post references out.
//!
//! The ingestor sits behind a narrow message-passing boundary: callers hand
//! it one decoded [`RepoEvent`] at a time (directly via [`on_event`] or
//! through the channel loop in [`run`]). It never processes two events
//! concurrently, so each commit's store writes complete before the next
//! event is touched and no in-memory dedup is needed — the store's
//! idempotent insert absorbs redelivery.
//!
//! [`on_event`]: StreamIngestor::on_event
//! [`run`]: StreamIngestor::run

use chrono::Utc;
use metrics::counter;
use tokio::sync::mpsc;

use navyfeed_core::{CommitEvent, MembershipFilter, PostRef, RepoEvent, RetentionWindow};

use crate::error::Result;
use crate::store::PostStore;

/// Consumes decoded commit events and keeps the store in sync.
pub struct StreamIngestor {
    store: PostStore,
    filter: MembershipFilter,
    retention: RetentionWindow,
}

impl StreamIngestor {
    pub fn new(store: PostStore, filter: MembershipFilter, retention: RetentionWindow) -> Self {
        Self {
            store,
            filter,
            retention,
        }
    }

    /// Handle one decoded event. Non-commit events are ignored.
    pub fn on_event(&self, event: &RepoEvent) -> Result<()> {
        counter!("ingest_events_total").increment(1);
        match event {
            RepoEvent::Commit(commit) => self.on_commit(commit),
            RepoEvent::Other => Ok(()),
        }
    }

    /// Handle one commit: one batched delete for its delete ops, then one
    /// batched idempotent insert for the creates that pass both filters.
    ///
    /// The retention check runs against the wall clock at processing time,
    /// so delayed delivery can admit or drop differently than real-time
    /// processing would.
    pub fn on_commit(&self, commit: &CommitEvent) -> Result<()> {
        let now = Utc::now();

        let to_delete: Vec<String> = commit
            .ops
            .deletes
            .iter()
            .map(|del| del.uri.clone())
            .collect();

        let to_create: Vec<PostRef> = commit
            .ops
            .creates
            .iter()
            .filter(|create| self.retention.contains(create.record.created_at, now))
            .filter(|create| self.filter.matches(&create.record))
            .map(|create| {
                tracing::debug!(uri = %create.uri, "found matching post");
                PostRef {
                    uri: create.uri.clone(),
                    cid: create.cid.clone(),
                    indexed_at: now,
                }
            })
            .collect();

        if !to_delete.is_empty() {
            let deleted = self.store.delete_posts(&to_delete)?;
            counter!("ingest_posts_deleted_total").increment(deleted as u64);
        }
        if !to_create.is_empty() {
            let inserted = self.store.insert_posts(&to_create)?;
            counter!("ingest_posts_matched_total").increment(inserted as u64);
        }

        Ok(())
    }

    /// Drive the ingestor from a channel until the sender side closes.
    ///
    /// A store error aborts only the current event's batch; the loop keeps
    /// consuming.
    pub async fn run(self, mut events: mpsc::Receiver<RepoEvent>) {
        tracing::info!("stream ingestor started");
        while let Some(event) = events.recv().await {
            if let Err(e) = self.on_event(&event) {
                counter!("ingest_batch_errors_total").increment(1);
                tracing::error!(error = %e, "failed to process event batch");
            }
        }
        tracing::info!("event channel closed, stream ingestor stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use navyfeed_core::{Embed, EmbeddedImage, PostCreate, PostDelete, PostOps, PostRecord};

    fn ingestor(store: PostStore) -> StreamIngestor {
        StreamIngestor::new(
            store,
            MembershipFilter::new("fragen.navy", "navyfragen"),
            RetentionWindow::days(14),
        )
    }

    fn create_op(uri: &str, text: &str, age_days: i64, embed: Option<Embed>) -> PostCreate {
        PostCreate {
            uri: uri.to_string(),
            cid: format!("cid-{uri}"),
            record: PostRecord {
                text: text.to_string(),
                created_at: Utc::now() - Duration::days(age_days),
                embed,
            },
        }
    }

    fn commit(creates: Vec<PostCreate>, deletes: Vec<&str>) -> CommitEvent {
        CommitEvent {
            ops: PostOps {
                creates,
                deletes: deletes
                    .into_iter()
                    .map(|uri| PostDelete {
                        uri: uri.to_string(),
                    })
                    .collect(),
            },
        }
    }

    // =========================================================================
    // Membership + retention on the stream path
    // =========================================================================

    #[test]
    fn test_matching_recent_post_is_stored() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        ing.on_commit(&commit(
            vec![create_op("at://a/p/1", "hello fragen.navy world", 0, None)],
            vec![],
        ))
        .unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_alt_text_match_is_stored() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        let embed = Embed {
            kind: "app.bsky.embed.images#main".to_string(),
            images: vec![EmbeddedImage {
                alt: Some("see NavyFragen here".to_string()),
            }],
        };
        ing.on_commit(&commit(
            vec![create_op("at://a/p/1", "hello world", 0, Some(embed))],
            vec![],
        ))
        .unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_old_post_is_not_stored_even_if_matching() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        ing.on_commit(&commit(
            vec![create_op("at://a/p/1", "fragen.navy", 20, None)],
            vec![],
        ))
        .unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_non_matching_post_is_not_stored() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        ing.on_commit(&commit(
            vec![create_op("at://a/p/1", "hello world", 0, None)],
            vec![],
        ))
        .unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    // =========================================================================
    // Idempotency and deletes
    // =========================================================================

    #[test]
    fn test_same_create_event_twice_yields_one_row() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        let evt = commit(
            vec![create_op("at://a/p/1", "fragen.navy", 0, None)],
            vec![],
        );
        ing.on_commit(&evt).unwrap();
        ing.on_commit(&evt).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_delete_removes_stored_post() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        ing.on_commit(&commit(
            vec![create_op("at://a/p/1", "fragen.navy", 0, None)],
            vec![],
        ))
        .unwrap();
        ing.on_commit(&commit(vec![], vec!["at://a/p/1"])).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_delete_of_absent_uri_is_noop() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        ing.on_commit(&commit(vec![], vec!["at://a/p/404"])).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_non_commit_event_is_ignored() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        ing.on_event(&RepoEvent::Other).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    // =========================================================================
    // Channel loop
    // =========================================================================

    #[tokio::test]
    async fn test_run_consumes_until_channel_closes() {
        let store = PostStore::open_in_memory().unwrap();
        let ing = ingestor(store.clone());
        let (tx, rx) = mpsc::channel(8);

        tx.send(RepoEvent::Commit(commit(
            vec![create_op("at://a/p/1", "fragen.navy", 0, None)],
            vec![],
        )))
        .await
        .unwrap();
        tx.send(RepoEvent::Other).await.unwrap();
        drop(tx);

        ing.run(rx).await;
        assert_eq!(store.count().unwrap(), 1);
    }
}
