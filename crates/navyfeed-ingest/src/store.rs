//! SQLite-backed post reference store.
//!
//! One table, keyed by URI. Inserts use `INSERT OR IGNORE` so the store
//! absorbs duplicates from at-least-once delivery and from the backfill
//! overlapping the stream; deletes of absent rows are no-ops. The single
//! connection lives behind a mutex and is shared between the ingest task
//! and the request handlers.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;

use navyfeed_core::PostRef;

use crate::error::Result;

/// Idempotent store for matched post references.
///
/// Cheap to clone; all clones share one connection.
#[derive(Clone)]
pub struct PostStore {
    conn: Arc<Mutex<Connection>>,
}

impl PostStore {
    /// Open (or create) the store at the given path and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::info!("Opening post store at {}", path.display());
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory store. Used by tests and available for dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // journal_mode returns the resulting mode as a row.
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS post (
                uri       TEXT PRIMARY KEY,
                cid       TEXT NOT NULL,
                indexedAt TEXT NOT NULL
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert post references, ignoring URIs that are already present.
    ///
    /// Returns the number of rows actually inserted.
    pub fn insert_posts(&self, refs: &[PostRef]) -> Result<usize> {
        if refs.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO post (uri, cid, indexedAt) VALUES (?1, ?2, ?3)",
            )?;
            for post in refs {
                // Fixed-precision RFC 3339 so string comparison in SQL
                // matches chronological order.
                inserted += stmt.execute((
                    &post.uri,
                    &post.cid,
                    post.indexed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                ))?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Delete post references by URI. Absent URIs are silently skipped.
    pub fn delete_posts(&self, uris: &[String]) -> Result<usize> {
        if uris.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM post WHERE uri = ?1")?;
            for uri in uris {
                deleted += stmt.execute([uri])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Read a page of references ordered by indexing time (newest first),
    /// ties broken by `cid` descending. `before` is an exclusive bound of
    /// the same (indexedAt, cid) ordering, used for cursor pagination.
    pub fn list_posts(
        &self,
        limit: u32,
        before: Option<(DateTime<Utc>, &str)>,
    ) -> Result<Vec<PostRef>> {
        let conn = self.conn.lock();
        let mut out = Vec::new();

        let mut push_row = |uri: String, cid: String, indexed_at: String| {
            // Rows are written by this store in RFC 3339; a row that does
            // not parse is skipped rather than failing the whole page.
            match DateTime::parse_from_rfc3339(&indexed_at) {
                Ok(ts) => out.push(PostRef {
                    uri,
                    cid,
                    indexed_at: ts.with_timezone(&Utc),
                }),
                Err(e) => tracing::warn!(uri = %uri, error = %e, "skipping unparsable indexedAt"),
            }
        };

        match before {
            Some((ts, cid)) => {
                let mut stmt = conn.prepare_cached(
                    "SELECT uri, cid, indexedAt FROM post
                     WHERE indexedAt < ?1 OR (indexedAt = ?1 AND cid < ?2)
                     ORDER BY indexedAt DESC, cid DESC LIMIT ?3",
                )?;
                let mut rows =
                    stmt.query((ts.to_rfc3339_opts(SecondsFormat::Millis, true), cid, limit))?;
                while let Some(row) = rows.next()? {
                    push_row(row.get(0)?, row.get(1)?, row.get(2)?);
                }
            }
            None => {
                let mut stmt = conn.prepare_cached(
                    "SELECT uri, cid, indexedAt FROM post
                     ORDER BY indexedAt DESC, cid DESC LIMIT ?1",
                )?;
                let mut rows = stmt.query([limit])?;
                while let Some(row) = rows.next()? {
                    push_row(row.get(0)?, row.get(1)?, row.get(2)?);
                }
            }
        }

        Ok(out)
    }

    /// Number of stored references.
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM post", [], |row| row.get(0))?;
        Ok(count)
    }
}
