//! Minimal AT-URI parsing.
//!
//! Feed identifiers arrive as `at://<authority>/<collection>/<rkey>`. The
//! serve side only needs those three segments to validate a requested feed,
//! so this stays a small hand parser rather than a full syntax crate.

use crate::error::{Error, Result};

/// A parsed `at://` URI with authority, collection, and record key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtUri {
    /// The authority, typically a DID (e.g. `did:web:example.com`).
    pub authority: String,
    /// The record collection NSID (e.g. `app.bsky.feed.generator`).
    pub collection: String,
    /// The record key within the collection.
    pub rkey: String,
}

impl AtUri {
    /// Parse an `at://authority/collection/rkey` string.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri.strip_prefix("at://").ok_or_else(|| Error::InvalidAtUri {
            uri: uri.to_string(),
            reason: "missing at:// scheme",
        })?;

        let mut segments = rest.split('/');
        let authority = segments.next().unwrap_or_default();
        let collection = segments.next().unwrap_or_default();
        let rkey = segments.next().unwrap_or_default();

        if authority.is_empty() || collection.is_empty() || rkey.is_empty() {
            return Err(Error::InvalidAtUri {
                uri: uri.to_string(),
                reason: "expected authority/collection/rkey",
            });
        }
        if segments.next().is_some() {
            return Err(Error::InvalidAtUri {
                uri: uri.to_string(),
                reason: "trailing path segments",
            });
        }

        Ok(Self {
            authority: authority.to_string(),
            collection: collection.to_string(),
            rkey: rkey.to_string(),
        })
    }
}

impl std::fmt::Display for AtUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "at://{}/{}/{}",
            self.authority, self.collection, self.rkey
        )
    }
}
