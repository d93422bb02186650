//! Rule-based keyword matching
//!
//! Each lexicon phrase is compiled once into a case-insensitive,
//! word-bounded pattern. A tag's confidence grows by 0.3 per match across all
//! of its phrases, capped at 1.0.

use super::lexicon::{Lexicon, LexiconError};
use regex::Regex;
use std::collections::BTreeMap;

/// Confidence contributed by a single phrase match
pub const MATCH_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct RuleMatcher {
    rules: Vec<(String, Vec<Regex>)>,
}

impl RuleMatcher {
    pub fn new(lexicon: &Lexicon) -> Result<Self, LexiconError> {
        let mut rules = Vec::with_capacity(lexicon.len());
        for (tag, keywords) in lexicon.tags() {
            let mut patterns = Vec::with_capacity(keywords.len());
            for keyword in keywords {
                let keyword = keyword.trim();
                if keyword.is_empty() {
                    continue;
                }
                let pattern = format!(r"(?i)\b{}\b", regex::escape(&keyword.to_lowercase()));
                let regex = Regex::new(&pattern).map_err(|source| LexiconError::Pattern {
                    keyword: keyword.to_string(),
                    source,
                })?;
                patterns.push(regex);
            }
            rules.push((tag.to_string(), patterns));
        }
        Ok(Self { rules })
    }

    /// Non-overlapping word-bounded match counts per tag; tags without a
    /// match are omitted.
    pub fn match_counts(&self, text: &str) -> BTreeMap<String, usize> {
        let text = text.to_lowercase();
        self.rules
            .iter()
            .filter_map(|(tag, patterns)| {
                let count: usize = patterns.iter().map(|p| p.find_iter(&text).count()).sum();
                (count > 0).then(|| (tag.clone(), count))
            })
            .collect()
    }

    pub fn score(&self, text: &str) -> BTreeMap<String, f64> {
        self.match_counts(text)
            .into_iter()
            .map(|(tag, count)| (tag, (count as f64 * MATCH_WEIGHT).min(1.0)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(entries: &[(&str, &[&str])]) -> RuleMatcher {
        let lexicon = Lexicon::from_keywords(
            entries
                .iter()
                .map(|(tag, kws)| (*tag, kws.iter().map(|k| k.to_string()).collect::<Vec<_>>())),
        );
        RuleMatcher::new(&lexicon).unwrap()
    }

    #[test]
    fn single_match_scores_point_three() {
        let m = matcher(&[("alignment", &["alignment"])]);
        let scores = m.score("A Study of Value Alignment in Agents");
        assert_eq!(scores.len(), 1);
        assert!((scores["alignment"] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn partial_words_do_not_match() {
        let m = matcher(&[("alignment", &["alignment"])]);
        assert!(m.score("Realignment of legacy pipelines").is_empty());
        assert!(m.score("misalignments everywhere").is_empty());
    }

    #[test]
    fn counts_accumulate_across_phrases_and_cap_at_one() {
        let m = matcher(&[("alignment", &["alignment", "value alignment"])]);
        let counts = m.match_counts("value alignment. Alignment matters; alignment again, alignment.");
        assert_eq!(counts["alignment"], 5);
        assert!((m.score("value alignment and alignment")["alignment"] - 0.9).abs() < 1e-9);
        assert_eq!(
            m.score("value alignment. Alignment matters; alignment again, alignment.")["alignment"],
            1.0
        );
    }

    #[test]
    fn phrases_with_regex_metacharacters_are_literal() {
        let m = matcher(&[("capability", &["state-of-the-art"]), ("lang", &["c++"])]);
        let scores = m.score("A State-of-the-art result");
        assert!(scores.contains_key("capability"));
        assert!(!m.score("stateXofXtheXart").contains_key("capability"));
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let m = matcher(&[("empty", &["  "])]);
        assert!(m.score("anything at all").is_empty());
    }
}
