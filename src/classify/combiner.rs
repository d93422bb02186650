//! Weighted combination of the three classification signals
//!
//! Each tag carries a [`SignalScores`] triple. The combined confidence is the
//! weighted sum divided by the weights of the signals that actually fired,
//! so a tag found by a single strong signal is not diluted by the silent
//! ones.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub rule: f64,
    pub frequency: f64,
    pub source: f64,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            rule: 0.5,
            frequency: 0.3,
            source: 0.2,
        }
    }
}

/// Per-tag confidences from each signal; 0.0 means the signal was silent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub rule: f64,
    pub frequency: f64,
    pub source: f64,
}

impl SignalScores {
    pub fn weighted_sum(&self, weights: &StrategyWeights) -> f64 {
        self.rule * weights.rule + self.frequency * weights.frequency + self.source * weights.source
    }

    /// Sum of the weights of signals with a non-zero score
    pub fn contributing_weight(&self, weights: &StrategyWeights) -> f64 {
        let mut total = 0.0;
        if self.rule > 0.0 {
            total += weights.rule;
        }
        if self.frequency > 0.0 {
            total += weights.frequency;
        }
        if self.source > 0.0 {
            total += weights.source;
        }
        total
    }

    /// Re-normalized composite confidence in [0, 1]
    pub fn combined(&self, weights: &StrategyWeights) -> f64 {
        let contributing = self.contributing_weight(weights);
        if contributing <= 0.0 {
            return 0.0;
        }
        (self.weighted_sum(weights) / contributing).clamp(0.0, 1.0)
    }
}

/// A tag proposed for a paper, with the evidence behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAssignment {
    pub name: String,
    pub confidence: f64,
    pub signals: SignalScores,
}

#[derive(Debug, Clone)]
pub struct ScoreCombiner {
    weights: StrategyWeights,
    min_confidence: f64,
    max_tags: usize,
}

impl Default for ScoreCombiner {
    fn default() -> Self {
        Self::new(StrategyWeights::default(), 0.3, 10)
    }
}

impl ScoreCombiner {
    pub fn new(weights: StrategyWeights, min_confidence: f64, max_tags: usize) -> Self {
        Self {
            weights,
            min_confidence,
            max_tags,
        }
    }

    pub fn weights(&self) -> &StrategyWeights {
        &self.weights
    }

    /// Fold the three signal maps into one triple per tag.
    pub fn merge(
        rule: &BTreeMap<String, f64>,
        frequency: &BTreeMap<String, f64>,
        source: &BTreeMap<String, f64>,
    ) -> BTreeMap<String, SignalScores> {
        let mut merged: BTreeMap<String, SignalScores> = BTreeMap::new();
        for (tag, score) in rule {
            merged.entry(tag.clone()).or_default().rule = *score;
        }
        for (tag, score) in frequency {
            merged.entry(tag.clone()).or_default().frequency = *score;
        }
        for (tag, score) in source {
            merged.entry(tag.clone()).or_default().source = *score;
        }
        merged
    }

    /// Filter by minimum confidence, order by confidence descending (name
    /// ascending on ties) and keep at most `max_tags`.
    pub fn combine(&self, signals: BTreeMap<String, SignalScores>) -> Vec<TagAssignment> {
        let mut assignments: Vec<TagAssignment> = signals
            .into_iter()
            .map(|(name, signals)| TagAssignment {
                confidence: signals.combined(&self.weights),
                name,
                signals,
            })
            .filter(|a| a.confidence >= self.min_confidence)
            .collect();

        assignments.sort_by(|a, b| match b.confidence.total_cmp(&a.confidence) {
            Ordering::Equal => a.name.cmp(&b.name),
            other => other,
        });
        assignments.truncate(self.max_tags);
        assignments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn single_signal_is_not_diluted() {
        let weights = StrategyWeights::default();
        let only_rule = SignalScores {
            rule: 0.6,
            ..Default::default()
        };
        assert!((only_rule.combined(&weights) - 0.6).abs() < 1e-12);

        let only_source = SignalScores {
            source: 0.8,
            ..Default::default()
        };
        assert!((only_source.combined(&weights) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn contributing_signals_are_weighted() {
        let weights = StrategyWeights::default();
        let scores = SignalScores {
            rule: 0.9,
            frequency: 0.5,
            source: 0.0,
        };
        // (0.45 + 0.15) / 0.8
        assert!((scores.combined(&weights) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn silent_signals_combine_to_zero() {
        assert_eq!(SignalScores::default().combined(&StrategyWeights::default()), 0.0);
    }

    #[test]
    fn merge_builds_one_triple_per_tag() {
        let merged = ScoreCombiner::merge(
            &map(&[("alignment", 0.3)]),
            &map(&[("alignment", 0.2), ("llm", 0.1)]),
            &map(&[("ethics", 0.7)]),
        );
        assert_eq!(merged.len(), 3);
        assert_eq!(merged["alignment"].rule, 0.3);
        assert_eq!(merged["alignment"].frequency, 0.2);
        assert_eq!(merged["llm"].rule, 0.0);
        assert_eq!(merged["ethics"].source, 0.7);
    }

    #[test]
    fn combine_filters_sorts_and_truncates() {
        let combiner = ScoreCombiner::new(StrategyWeights::default(), 0.3, 2);
        let merged = ScoreCombiner::merge(
            &map(&[("a", 0.6), ("b", 0.9), ("c", 0.9), ("d", 0.1)]),
            &BTreeMap::new(),
            &BTreeMap::new(),
        );
        let tags = combiner.combine(merged);
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let combiner = ScoreCombiner::default();
        let merged = ScoreCombiner::merge(&map(&[("a", 0.3)]), &BTreeMap::new(), &BTreeMap::new());
        assert_eq!(combiner.combine(merged).len(), 1);
    }
}
