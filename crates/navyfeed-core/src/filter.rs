//! Membership and retention predicates.
//!
//! Both are pure: the membership filter decides whether a post belongs to
//! the curated topic, the retention window decides whether it is recent
//! enough to keep. The ingest and backfill paths share these so the
//! matching rule lives in exactly one place.

use chrono::{DateTime, Duration, Utc};

use crate::record::{Embed, PostRecord};

/// Topical membership rule: a post belongs to the feed when its text
/// contains the primary token, or any attached image's alt text contains
/// the secondary token. All matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct MembershipFilter {
    primary_token: String,
    secondary_token: String,
}

impl MembershipFilter {
    /// Create a filter for the given tokens. Tokens are lowercased once here.
    pub fn new(primary_token: &str, secondary_token: &str) -> Self {
        Self {
            primary_token: primary_token.to_lowercase(),
            secondary_token: secondary_token.to_lowercase(),
        }
    }

    /// Full membership check over a post record.
    pub fn matches(&self, record: &PostRecord) -> bool {
        self.text_matches(&record.text) || self.alt_text_matches(record.embed.as_ref())
    }

    /// Text branch: does the post text contain the primary token.
    pub fn text_matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.primary_token)
    }

    /// Alt-text branch: does any image in an image embed carry the
    /// secondary token in its alt text. A missing embed, a non-image embed,
    /// or images without usable alt text simply don't match.
    pub fn alt_text_matches(&self, embed: Option<&Embed>) -> bool {
        let Some(embed) = embed else {
            return false;
        };
        if !embed.is_images() {
            return false;
        }
        embed.images.iter().any(|image| {
            image
                .alt
                .as_deref()
                .is_some_and(|alt| alt.to_lowercase().contains(&self.secondary_token))
        })
    }
}

/// Trailing retention window: a reference is kept only while its timestamp
/// is within `period` of the evaluation time.
#[derive(Debug, Clone, Copy)]
pub struct RetentionWindow {
    period: Duration,
}

impl RetentionWindow {
    /// Window covering the trailing `days` days.
    pub fn days(days: i64) -> Self {
        Self {
            period: Duration::days(days),
        }
    }

    /// Whether `ts` falls within the window ending at `now`.
    ///
    /// `now` is supplied by the caller: the stream path evaluates per event
    /// with the current wall clock, the backfill computes one cutoff per run.
    pub fn contains(&self, ts: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        ts >= now - self.period
    }

    /// The earliest accepted timestamp for an evaluation at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::EmbeddedImage;

    fn filter() -> MembershipFilter {
        MembershipFilter::new("fragen.navy", "NavyFragen")
    }

    fn record(text: &str, embed: Option<Embed>) -> PostRecord {
        PostRecord {
            text: text.to_string(),
            created_at: Utc::now(),
            embed,
        }
    }

    fn images_embed(alts: &[Option<&str>]) -> Embed {
        Embed {
            kind: "app.bsky.embed.images#main".to_string(),
            images: alts
                .iter()
                .map(|alt| EmbeddedImage {
                    alt: alt.map(str::to_string),
                })
                .collect(),
        }
    }

    // =========================================================================
    // Text branch
    // =========================================================================

    #[test]
    fn test_text_match_case_insensitive() {
        assert!(filter().matches(&record("hello fragen.navy world", None)));
        assert!(filter().matches(&record("HELLO FRAGEN.NAVY", None)));
        assert!(!filter().matches(&record("hello world", None)));
    }

    #[test]
    fn test_empty_text_no_match() {
        assert!(!filter().matches(&record("", None)));
    }

    // =========================================================================
    // Alt-text branch
    // =========================================================================

    #[test]
    fn test_alt_text_match() {
        let embed = images_embed(&[Some("see NavyFragen here")]);
        assert!(filter().matches(&record("hello world", Some(embed))));
    }

    #[test]
    fn test_alt_text_match_any_image() {
        let embed = images_embed(&[None, Some("nothing"), Some("navyfragen")]);
        assert!(filter().alt_text_matches(Some(&embed)));
    }

    #[test]
    fn test_missing_alt_no_match() {
        let embed = images_embed(&[None, None]);
        assert!(!filter().alt_text_matches(Some(&embed)));
    }

    #[test]
    fn test_non_image_embed_no_match() {
        let embed = Embed {
            kind: "app.bsky.embed.external".to_string(),
            images: vec![EmbeddedImage {
                alt: Some("navyfragen".to_string()),
            }],
        };
        assert!(!filter().alt_text_matches(Some(&embed)));
    }

    #[test]
    fn test_no_embed_no_match() {
        assert!(!filter().alt_text_matches(None));
    }

    // =========================================================================
    // Retention window
    // =========================================================================

    #[test]
    fn test_retention_inside_window() {
        let window = RetentionWindow::days(14);
        let now = Utc::now();
        assert!(window.contains(now, now));
        assert!(window.contains(now - Duration::days(13), now));
    }

    #[test]
    fn test_retention_outside_window() {
        let window = RetentionWindow::days(14);
        let now = Utc::now();
        assert!(!window.contains(now - Duration::days(20), now));
    }

    #[test]
    fn test_retention_boundary_is_inclusive() {
        let window = RetentionWindow::days(14);
        let now = Utc::now();
        assert!(window.contains(window.cutoff(now), now));
        assert!(!window.contains(window.cutoff(now) - Duration::seconds(1), now));
    }
}
