//! Error types for the ingest pipeline.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors that can occur while ingesting or backfilling posts.
#[derive(Error, Debug)]
pub enum IngestError {
    /// SQLite store error. Insert conflicts on `uri` never surface here;
    /// the store suppresses them by design.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Search request failed (network or HTTP status).
    #[error("search error: {0}")]
    Search(#[from] reqwest::Error),

    /// A search response or event line did not decode.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading an event source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: IngestError = json_err.into();
        assert!(matches!(err, IngestError::Json(_)));
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: IngestError = io_err.into();
        assert!(err.to_string().contains("missing"));
    }
}
