//! Write side of the Navyfeed feed generator.
//!
//! This crate turns decoded repo events and one historical search pass into
//! a consistent set of stored post references:
//!
//! - [`PostStore`] — idempotent SQLite-backed insert/delete keyed by URI
//! - [`StreamIngestor`] — consumes commit events one at a time, applying the
//!   membership and retention filters
//! - [`BackfillReconciler`] — one-shot startup reconciliation over two
//!   ordered search passes; failures are logged, never fatal
//! - [`JsonlSource`] — adapter feeding decoded JSONL events into the ingestor

mod backfill;
mod error;
mod ingestor;
mod source;
mod store;

pub use backfill::{BackfillReconciler, HttpSearchClient, SearchClient, SearchPost};
pub use error::{IngestError, Result};
pub use ingestor::StreamIngestor;
pub use source::JsonlSource;
pub use store::PostStore;
