//! # Analyzer
//! Stateful façade over the sentiment scorer and the trend window: the one
//! component the ingestion layer reuses across events.
//!
//! `process` runs both sub-analyses independently: scoring is total and
//! extraction degrades to an empty token set on content-free input, so a
//! fault in one never suppresses the other.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::SentimentScore;
use crate::sentiment::SentimentScorer;
use crate::trends::{now_unix, TrendWindow};

static RE_HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\w+)").expect("hashtag regex"));
static RE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(\w+)").expect("mention regex"));
static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word regex"));

/// Number of trend entries returned in each enrichment snapshot.
const SNAPSHOT_K: usize = 10;

/// Illustrative warm-start tokens for an otherwise empty dashboard.
const SAMPLE_TRENDS: [&str; 10] = [
    "#ai",
    "#datascience",
    "#python",
    "machine learning",
    "artificial intelligence",
    "data analytics",
    "#technology",
    "#innovation",
    "deep learning",
    "neural networks",
];

/// Output of one `process` call.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub sentiment: SentimentScore,
    /// Top trends (count descending, lexical tie-break) at process time.
    pub top_trends: Vec<(String, u64)>,
    /// Hashtag words without the `#` prefix, lowercased, deduplicated.
    pub hashtags: BTreeSet<String>,
    /// Mention names without the `@` prefix, lowercased, deduplicated.
    pub mentions: BTreeSet<String>,
}

pub struct Analyzer {
    scorer: SentimentScorer,
    window: TrendWindow,
    seeded: bool,
}

impl Analyzer {
    /// Cold analyzer: only organically observed trends.
    pub fn new() -> Self {
        Self {
            scorer: SentimentScorer::new(),
            window: TrendWindow::new_24h(),
            seeded: false,
        }
    }

    /// Analyzer pre-seeded with illustrative trends so early queries return
    /// non-empty results before live data arrives. Each sample token gets
    /// weight 6: one fresh insertion plus five backdated 30 minutes.
    pub fn with_sample_trends() -> Self {
        let a = Self {
            scorer: SentimentScorer::new(),
            window: TrendWindow::new_24h(),
            seeded: true,
        };
        let now = now_unix();
        let backdated = now.saturating_sub(30 * 60);
        // Oldest first, so the window's FIFO matches insertion-time order.
        for trend in SAMPLE_TRENDS {
            for _ in 0..5 {
                a.window.record(vec![trend.to_string()], Some(backdated));
            }
        }
        for trend in SAMPLE_TRENDS {
            a.window.record(vec![trend.to_string()], Some(now));
        }
        a
    }

    /// Whether this instance carries the cosmetic sample-trend seed.
    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// Score sentiment, record trends, and return the combined analysis.
    /// Total: never fails the caller, whatever the text contains.
    pub fn process(&self, text: &str) -> Analysis {
        let sentiment = self.scorer.score(text);

        let lowered = text.to_lowercase();
        let hashtags: BTreeSet<String> = RE_HASHTAG
            .captures_iter(&lowered)
            .map(|c| c[1].to_string())
            .collect();
        let mentions: BTreeSet<String> = RE_MENTION
            .captures_iter(&lowered)
            .map(|c| c[1].to_string())
            .collect();

        let words: Vec<&str> = RE_WORD.find_iter(&lowered).map(|m| m.as_str()).collect();

        // Hashtags/mentions contribute once per event; 3-word phrases are
        // positional and may repeat.
        let mut tokens: Vec<String> = Vec::with_capacity(
            hashtags.len() + mentions.len() + words.len().saturating_sub(2),
        );
        tokens.extend(hashtags.iter().map(|h| format!("#{h}")));
        tokens.extend(mentions.iter().map(|m| format!("@{m}")));
        tokens.extend(words.windows(3).map(|w| w.join(" ")));

        self.window.record(tokens, None);
        let top_trends = self.window.top_k(SNAPSHOT_K);

        Analysis {
            sentiment,
            top_trends,
            hashtags,
            mentions,
        }
    }

    /// Read path for external consumers (dashboard/CLI); consistent
    /// snapshot, safe to call concurrently with `process`.
    pub fn top_trends(&self, k: usize) -> Vec<(String, u64)> {
        self.window.top_k(k)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SentimentLabel;

    #[test]
    fn hashtags_dedupe_case_insensitively() {
        let a = Analyzer::new();
        let out = a.process("#AI #ai #Ai loves @Bob and @bob");
        assert_eq!(out.hashtags.len(), 1);
        assert!(out.hashtags.contains("ai"));
        assert_eq!(out.mentions.len(), 1);
        assert!(out.mentions.contains("bob"));
    }

    #[test]
    fn short_texts_produce_no_phrases() {
        let a = Analyzer::new();
        a.process("two words");
        let snap = a.top_trends(20);
        assert!(snap.iter().all(|(t, _)| !t.contains(' ')));
    }

    #[test]
    fn three_words_produce_exactly_one_phrase() {
        let a = Analyzer::new();
        a.process("rust is fun");
        let top = a.top_trends(5);
        assert_eq!(top, vec![("rust is fun".to_string(), 1)]);
    }

    #[test]
    fn hashtag_counted_once_per_event() {
        // Reference scenario: three events, "#ai" appears in two of them
        // (twice within the second), so its window count is 2.
        let a = Analyzer::new();
        a.process("#AI is great");
        a.process("#AI #AI again");
        a.process("no tags here");
        let top = a.top_trends(1);
        assert_eq!(top, vec![("#ai".to_string(), 2)]);
    }

    #[test]
    fn sentiment_rides_along_with_trends() {
        let a = Analyzer::new();
        let out = a.process("#AI is great");
        assert_eq!(out.sentiment.label, SentimentLabel::Positive);
        assert!(out.top_trends.iter().any(|(t, _)| t == "#ai"));
    }

    #[test]
    fn malformed_input_degrades_to_noop() {
        let a = Analyzer::new();
        let out = a.process("");
        assert_eq!(out.sentiment, SentimentScore::neutral());
        assert!(out.top_trends.is_empty());
        assert!(out.hashtags.is_empty());

        let out = a.process("???!!!");
        assert!(out.top_trends.is_empty());
    }

    #[test]
    fn seeded_analyzer_is_distinguishable_and_warm() {
        let seeded = Analyzer::with_sample_trends();
        assert!(seeded.is_seeded());
        let top = seeded.top_trends(10);
        assert_eq!(top.len(), 10);
        assert!(top.iter().all(|(_, c)| *c == 6));

        let cold = Analyzer::new();
        assert!(!cold.is_seeded());
        assert!(cold.top_trends(10).is_empty());
    }
}
