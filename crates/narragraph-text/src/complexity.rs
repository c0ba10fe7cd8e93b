//! Text complexity scoring and model tier recommendation.
//!
//! The score blends two signals:
//!
//! - average sentence length in words, normalized against [`SENTENCE_LENGTH_CEILING`]
//! - lexical diversity, the ratio of unique words to all words
//!
//! Scores below [`LOW_THRESHOLD`] are [`ComplexityLevel::Low`], scores at or
//! above [`HIGH_THRESHOLD`] are [`ComplexityLevel::High`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::tokens;

/// Sentence length (in words) that saturates the length signal
pub const SENTENCE_LENGTH_CEILING: f64 = 25.0;

/// Weight of the sentence-length signal; diversity gets the remainder
pub const LENGTH_WEIGHT: f64 = 0.6;

pub const LOW_THRESHOLD: f64 = 0.35;
pub const HIGH_THRESHOLD: f64 = 0.65;

/// Coarse complexity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

/// Size class of the external model that should handle a text
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    #[default]
    Light,
    Heavy,
}

/// Result of classifying one text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexityReport {
    pub level: ComplexityLevel,
    pub score: f64,
    pub recommended_tier: ModelTier,
}

/// Classifier with a configurable policy for medium-complexity texts
#[derive(Debug, Default, Clone, Copy)]
pub struct ComplexityClassifier {
    medium_tier: ModelTier,
}

impl ComplexityClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tier recommended for [`ComplexityLevel::Medium`] texts
    pub fn with_medium_tier(mut self, tier: ModelTier) -> Self {
        self.medium_tier = tier;
        self
    }

    /// Score `text` and recommend a model tier.
    ///
    /// Empty or whitespace-only text scores zero.
    pub fn classify(&self, text: &str) -> ComplexityReport {
        let score = score(text);
        let level = if score < LOW_THRESHOLD {
            ComplexityLevel::Low
        } else if score >= HIGH_THRESHOLD {
            ComplexityLevel::High
        } else {
            ComplexityLevel::Medium
        };
        let recommended_tier = match level {
            ComplexityLevel::Low => ModelTier::Light,
            ComplexityLevel::Medium => self.medium_tier,
            ComplexityLevel::High => ModelTier::Heavy,
        };

        ComplexityReport {
            level,
            score,
            recommended_tier,
        }
    }
}

/// Weighted complexity score in `[0, 1]`
pub fn score(text: &str) -> f64 {
    let words = tokens::words(text);
    if words.is_empty() {
        return 0.0;
    }

    let sentence_count = tokens::sentences(text).len().max(1);
    let average_length = words.len() as f64 / sentence_count as f64;
    let length_signal = (average_length / SENTENCE_LENGTH_CEILING).min(1.0);

    let unique: HashSet<&str> = words.iter().map(String::as_str).collect();
    let diversity = unique.len() as f64 / words.len() as f64;

    (LENGTH_WEIGHT * length_signal + (1.0 - LENGTH_WEIGHT) * diversity).clamp(0.0, 1.0)
}
