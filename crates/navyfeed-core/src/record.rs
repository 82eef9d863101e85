//! Decoded repo-event and post-record types.
//!
//! These are the shapes the external transport/codec hands to the ingestor:
//! discriminated repo events carrying batched create/delete operations for
//! the tracked post collection, plus the stored [`PostRef`] tuple.
//!
//! Deserialization is deliberately lenient where the wire data is messy:
//! a post with no text, no embed, or an image whose `alt` is missing or not
//! a string must still decode (those sub-checks simply don't match).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::IMAGES_EMBED_TYPE;

/// A decoded event from the repository event stream.
///
/// Only commit events carry operations; everything else (identity changes,
/// account events, ...) is opaque to this service and ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RepoEvent {
    /// A repository commit bundling create and delete operations.
    Commit(CommitEvent),
    /// Any other event kind. Ignored by the ingestor.
    #[serde(other)]
    Other,
}

/// A commit event with its operations grouped by type.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommitEvent {
    /// Operations touching the tracked post collection.
    #[serde(default)]
    pub ops: PostOps,
}

/// Create and delete operations extracted from one commit.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PostOps {
    #[serde(default)]
    pub creates: Vec<PostCreate>,
    #[serde(default)]
    pub deletes: Vec<PostDelete>,
}

/// A single post creation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostCreate {
    /// Unique resource identifier of the new record.
    pub uri: String,
    /// Content-hash identifier of the record.
    pub cid: String,
    /// The post record itself.
    pub record: PostRecord,
}

/// A single post deletion. Only the URI is known for deletes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostDelete {
    pub uri: String,
}

/// The content of a post record, reduced to the fields the filter reads.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostRecord {
    /// Post text. Missing text decodes as empty (no match, not an error).
    #[serde(default)]
    pub text: String,

    /// Author-asserted creation time.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// Optional embed attached to the post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed: Option<Embed>,
}

/// An embed attached to a post or returned by search.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Embed {
    /// Embed type discriminator, e.g. `app.bsky.embed.images#main`.
    #[serde(rename = "$type", default)]
    pub kind: String,

    /// Images, present only for image embeds.
    #[serde(default)]
    pub images: Vec<EmbeddedImage>,
}

impl Embed {
    /// Whether this is an image embed, with or without a `#variant` suffix
    /// (`#main` on the stream, `#view` from search).
    pub fn is_images(&self) -> bool {
        self.kind == IMAGES_EMBED_TYPE
            || self
                .kind
                .strip_prefix(IMAGES_EMBED_TYPE)
                .is_some_and(|rest| rest.starts_with('#'))
    }
}

/// A single image within an image embed.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EmbeddedImage {
    /// Alt text. `None` when absent or not a string on the wire.
    #[serde(default, deserialize_with = "lenient_string")]
    pub alt: Option<String>,
}

/// Accept any JSON value for a string field, yielding `None` for non-strings.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

/// The stored reference to a matched post. `uri` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
    /// When this service indexed the post (wall clock, not author time).
    pub indexed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Event decoding
    // =========================================================================

    #[test]
    fn test_decode_commit_event() {
        let json = r#"{
            "kind": "commit",
            "ops": {
                "creates": [{
                    "uri": "at://did:plc:abc/app.bsky.feed.post/1",
                    "cid": "bafy1",
                    "record": {"text": "hello", "createdAt": "2026-08-01T00:00:00Z"}
                }],
                "deletes": [{"uri": "at://did:plc:abc/app.bsky.feed.post/0"}]
            }
        }"#;
        let event: RepoEvent = serde_json::from_str(json).unwrap();
        match event {
            RepoEvent::Commit(commit) => {
                assert_eq!(commit.ops.creates.len(), 1);
                assert_eq!(commit.ops.deletes.len(), 1);
                assert_eq!(commit.ops.creates[0].record.text, "hello");
            }
            RepoEvent::Other => panic!("expected a commit event"),
        }
    }

    #[test]
    fn test_decode_unknown_event_kind() {
        let event: RepoEvent = serde_json::from_str(r#"{"kind": "identity"}"#).unwrap();
        assert!(matches!(event, RepoEvent::Other));
    }

    #[test]
    fn test_decode_commit_without_ops() {
        let event: RepoEvent = serde_json::from_str(r#"{"kind": "commit"}"#).unwrap();
        match event {
            RepoEvent::Commit(commit) => {
                assert!(commit.ops.creates.is_empty());
                assert!(commit.ops.deletes.is_empty());
            }
            RepoEvent::Other => panic!("expected a commit event"),
        }
    }

    // =========================================================================
    // Lenient record decoding
    // =========================================================================

    #[test]
    fn test_record_missing_text_decodes_empty() {
        let record: PostRecord =
            serde_json::from_str(r#"{"createdAt": "2026-08-01T00:00:00Z"}"#).unwrap();
        assert_eq!(record.text, "");
        assert!(record.embed.is_none());
    }

    #[test]
    fn test_non_string_alt_decodes_as_none() {
        let image: EmbeddedImage = serde_json::from_str(r#"{"alt": 42}"#).unwrap();
        assert!(image.alt.is_none());

        let image: EmbeddedImage = serde_json::from_str(r#"{"alt": null}"#).unwrap();
        assert!(image.alt.is_none());

        let image: EmbeddedImage = serde_json::from_str(r#"{}"#).unwrap();
        assert!(image.alt.is_none());
    }

    #[test]
    fn test_string_alt_decodes() {
        let image: EmbeddedImage = serde_json::from_str(r#"{"alt": "a boat"}"#).unwrap();
        assert_eq!(image.alt.as_deref(), Some("a boat"));
    }

    // =========================================================================
    // Embed kind detection
    // =========================================================================

    #[test]
    fn test_images_embed_kind_with_and_without_suffix() {
        for kind in [
            "app.bsky.embed.images",
            "app.bsky.embed.images#main",
            "app.bsky.embed.images#view",
        ] {
            let embed = Embed {
                kind: kind.to_string(),
                images: vec![],
            };
            assert!(embed.is_images(), "{kind} should be an image embed");
        }
    }

    #[test]
    fn test_non_image_embed_kinds() {
        for kind in [
            "app.bsky.embed.external",
            "app.bsky.embed.imagesque",
            "",
        ] {
            let embed = Embed {
                kind: kind.to_string(),
                images: vec![],
            };
            assert!(!embed.is_images(), "{kind} should not be an image embed");
        }
    }
}
