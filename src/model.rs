//! Core data types shared by the feed, analyzer, and store layers.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Public engagement counters attached to a raw event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    pub retweets: u32,
    pub favorites: u32,
}

/// One event as produced by a feed source. Ephemeral; not persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub text: String,
    pub observed_at: DateTime<Utc>,
    pub author: String,
    pub engagement: Engagement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentLabel::Positive => f.write_str("positive"),
            SentimentLabel::Negative => f.write_str("negative"),
            SentimentLabel::Neutral => f.write_str("neutral"),
        }
    }
}

/// Polarity/subjectivity pair plus the derived label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// In `[-1, 1]`.
    pub polarity: f32,
    /// In `[0, 1]`.
    pub subjectivity: f32,
    pub label: SentimentLabel,
}

impl SentimentScore {
    /// The zero default used for empty text and absorbed analysis faults.
    pub fn neutral() -> Self {
        Self {
            polarity: 0.0,
            subjectivity: 0.0,
            label: SentimentLabel::Neutral,
        }
    }

    /// Derive the label deterministically from the polarity sign.
    pub fn from_parts(polarity: f32, subjectivity: f32) -> Self {
        let label = if polarity > 0.0 {
            SentimentLabel::Positive
        } else if polarity < 0.0 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };
        Self {
            polarity,
            subjectivity,
            label,
        }
    }
}

/// A raw event plus its computed sentiment and trend snapshot, as persisted.
/// Written once; immutable thereafter (retention purge is the only delete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub text: String,
    pub observed_at: DateTime<Utc>,
    pub author: String,
    pub engagement: Engagement,
    pub sentiment: SentimentScore,
    /// Top-10 trend counts at enrichment time.
    pub top_trends: BTreeMap<String, u64>,
}

/// An enriched record as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub text: String,
    pub observed_at: DateTime<Utc>,
    pub author: String,
    pub engagement: Engagement,
    pub sentiment: SentimentScore,
    pub top_trends: BTreeMap<String, u64>,
}

/// Canonical storage timestamp: RFC 3339 UTC with fixed microsecond
/// precision, so lexicographic comparison on the TEXT column is
/// chronological.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_derivation_follows_polarity_sign() {
        assert_eq!(
            SentimentScore::from_parts(0.4, 0.5).label,
            SentimentLabel::Positive
        );
        assert_eq!(
            SentimentScore::from_parts(-0.1, 0.5).label,
            SentimentLabel::Negative
        );
        assert_eq!(
            SentimentScore::from_parts(0.0, 0.0).label,
            SentimentLabel::Neutral
        );
    }

    #[test]
    fn label_serializes_lowercase() {
        let s = serde_json::to_string(&SentimentLabel::Positive).unwrap();
        assert_eq!(s, "\"positive\"");
    }

    #[test]
    fn timestamps_sort_lexicographically() {
        let a = format_timestamp("2024-05-01T00:00:00Z".parse().unwrap());
        let b = format_timestamp("2024-05-01T00:00:01Z".parse().unwrap());
        assert!(a < b);
    }
}
