//! Error types shared across the Navyfeed crates.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core types.
#[derive(Error, Debug)]
pub enum Error {
    /// An AT-URI did not parse (wrong scheme or missing path segments).
    #[error("invalid AT-URI '{uri}': {reason}")]
    InvalidAtUri {
        /// The input that failed to parse.
        uri: String,
        /// Description of what's wrong.
        reason: &'static str,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
