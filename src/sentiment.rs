//! # Sentiment Scorer
//! Lexicon-based polarity/subjectivity scoring with a small negation window.
//!
//! This is a numeric convenience signal, not a classifier: scoring is total
//! (`score` never fails the caller) and stateless, so it is safe to call
//! from any number of tasks without synchronization.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::model::SentimentScore;

static LEXICON: Lazy<HashMap<String, f32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f32>>(raw).expect("valid sentiment lexicon")
});

#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentScorer;

impl SentimentScorer {
    pub fn new() -> Self {
        Self
    }

    /// Lexicon weight for a word (0 if not in the lexicon).
    #[inline]
    fn word_weight(&self, w: &str) -> f32 {
        *LEXICON.get(w).unwrap_or(&0.0)
    }

    /// Score a text. Total: empty or token-free input yields the neutral
    /// default rather than an error.
    ///
    /// Negation: a negator within the preceding 1..=3 tokens flips the sign
    /// of a word's lexicon weight. Polarity is the clamped mean of matched
    /// weights; subjectivity is the mean absolute weight of matched words.
    pub fn score(&self, text: &str) -> SentimentScore {
        // Collect into a vector because negation looks back by index.
        let tokens: Vec<String> = tokenize(text).collect();
        if tokens.is_empty() {
            return SentimentScore::neutral();
        }

        let mut sum = 0.0f32;
        let mut abs_sum = 0.0f32;
        let mut hits = 0usize;

        for i in 0..tokens.len() {
            let base = self.word_weight(tokens[i].as_str());
            if base == 0.0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            let adj = if negated { -base } else { base };
            sum += adj;
            abs_sum += base.abs();
            hits += 1;
        }

        if hits == 0 {
            return SentimentScore::neutral();
        }

        let polarity = (sum / hits as f32).clamp(-1.0, 1.0);
        let subjectivity = (abs_sum / hits as f32).clamp(0.0, 1.0);
        SentimentScore::from_parts(polarity, subjectivity)
    }
}

/// Alphanumeric tokens, lower-cased.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Small negator set; contractions lose their apostrophe during
/// tokenization, so "isn't" arrives as "isn".
fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn"
            | "wasn"
            | "aren"
            | "won"
            | "cannot"
            | "don"
            | "doesn"
            | "without"
    )
}
