//! Keyword term-frequency signal
//!
//! A deliberately simple heuristic rather than corpus TF-IDF: tokens of the
//! paper text are counted, and each tag scores the share of filtered tokens
//! that equal one of its keywords (with internal spaces removed). The signal
//! is capped at 0.5 so it stays weaker than rule matching.

use super::lexicon::Lexicon;
use std::collections::{BTreeMap, HashMap};

/// Upper bound of the term-frequency confidence
pub const MAX_CONFIDENCE: f64 = 0.5;

/// Tokens at or below this length are ignored
pub const MIN_TOKEN_LEN: usize = 3;

pub const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "be", "been", "this", "that", "these", "those", "we", "our",
];

#[derive(Debug, Clone)]
pub struct TermFrequencyExtractor {
    /// tag name → collapsed keywords
    vocabulary: Vec<(String, Vec<String>)>,
}

impl TermFrequencyExtractor {
    pub fn new(lexicon: &Lexicon) -> Self {
        let vocabulary = lexicon
            .tags()
            .map(|(tag, keywords)| {
                let collapsed = keywords
                    .iter()
                    .map(|kw| kw.to_lowercase().replace(' ', ""))
                    .filter(|kw| !kw.is_empty())
                    .collect();
                (tag.to_string(), collapsed)
            })
            .collect();
        Self { vocabulary }
    }

    pub fn score(&self, text: &str) -> BTreeMap<String, f64> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return BTreeMap::new();
        }

        let total = tokens.len() as f64;
        let mut histogram: HashMap<&str, usize> = HashMap::new();
        for token in &tokens {
            *histogram.entry(token.as_str()).or_default() += 1;
        }

        self.vocabulary
            .iter()
            .filter_map(|(tag, keywords)| {
                let hits: usize = keywords
                    .iter()
                    .map(|kw| histogram.get(kw.as_str()).copied().unwrap_or(0))
                    .sum();
                (hits > 0).then(|| (tag.clone(), (hits as f64 / total).min(MAX_CONFIDENCE)))
            })
            .collect()
    }
}

/// Lower-cased word tokens with stop words and short tokens removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() > MIN_TOKEN_LEN && !STOP_WORDS.contains(token))
        .map(str::to_string)
        .collect()
}
