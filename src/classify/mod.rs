//! Hybrid tag classification
//!
//! Three independent signals run over the same paper:
//!
//! - [`RuleMatcher`]: word-bounded phrase matches in title and abstract
//! - [`TermFrequencyExtractor`]: share of tokens that are lexicon keywords
//! - [`SourceMetadataMapper`]: taxonomy codes and fields supplied by the source
//!
//! [`ScoreCombiner`] folds them into one confidence per tag, keeps the tags
//! at or above the minimum confidence and truncates to the configured count.
//! Classification is pure: it reads no store and has no side effects.

mod combiner;
mod lexicon;
mod rules;
mod source_metadata;
mod term_frequency;

pub use combiner::{ScoreCombiner, SignalScores, StrategyWeights, TagAssignment};
pub use lexicon::{Lexicon, LexiconError};
pub use rules::{RuleMatcher, MATCH_WEIGHT};
pub use source_metadata::{
    SourceMetadataMapper, SourceTaxonomy, CATEGORY_WEIGHT, FIELD_DIRECT_WEIGHT, FIELD_FUZZY_WEIGHT,
};
pub use term_frequency::{tokenize, TermFrequencyExtractor, STOP_WORDS};

use crate::config::TaggingConfig;
use crate::model::{Paper, PaperRecord, PaperSource};

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: RuleMatcher,
    frequency: TermFrequencyExtractor,
    source: SourceMetadataMapper,
    combiner: ScoreCombiner,
}

impl Classifier {
    pub fn new(lexicon: &Lexicon, config: &TaggingConfig) -> Result<Self, LexiconError> {
        Ok(Self {
            rules: RuleMatcher::new(lexicon)?,
            frequency: TermFrequencyExtractor::new(lexicon),
            source: SourceMetadataMapper::new(lexicon),
            combiner: ScoreCombiner::new(config.weights, config.min_confidence, config.max_tags),
        })
    }

    /// Built-in lexicon with default thresholds
    pub fn with_defaults() -> Result<Self, LexiconError> {
        Self::new(&Lexicon::builtin(), &TaggingConfig::default())
    }

    pub fn classify(&self, paper: &Paper) -> Vec<TagAssignment> {
        let taxonomy = SourceTaxonomy::from_raw(paper.source, paper.raw_metadata.as_ref());
        self.classify_text(&paper.title, paper.abstract_text.as_deref(), &taxonomy)
    }

    pub fn classify_record(&self, record: &PaperRecord) -> Vec<TagAssignment> {
        let taxonomy = SourceTaxonomy::from_raw(
            record.source.unwrap_or(PaperSource::Internal),
            record.raw_metadata.as_ref(),
        );
        self.classify_text(&record.title, record.abstract_text.as_deref(), &taxonomy)
    }

    /// Classify free text plus an explicit taxonomy.
    ///
    /// A blank title yields no tags.
    pub fn classify_text(
        &self,
        title: &str,
        abstract_text: Option<&str>,
        taxonomy: &SourceTaxonomy,
    ) -> Vec<TagAssignment> {
        if title.trim().is_empty() {
            return Vec::new();
        }

        let text = match abstract_text {
            Some(abstract_text) => format!("{} {}", title, abstract_text).to_lowercase(),
            None => title.to_lowercase(),
        };

        let rule_scores = self.rules.score(&text);
        let frequency_scores = self.frequency.score(&text);
        let source_scores = self.source.score(taxonomy);

        let merged = ScoreCombiner::merge(&rule_scores, &frequency_scores, &source_scores);
        for (tag, signals) in &merged {
            tracing::trace!(
                tag = %tag,
                rule = signals.rule,
                frequency = signals.frequency,
                source = signals.source,
                "tag signals"
            );
        }

        self.combiner.combine(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::with_defaults().unwrap()
    }

    #[test]
    fn test_blank_title_yields_no_tags() {
        let c = classifier();
        assert!(c
            .classify_text("   ", Some("alignment alignment"), &SourceTaxonomy::default())
            .is_empty());
    }

    #[test]
    fn test_classifies_alignment_paper() {
        let c = classifier();
        let tags = c.classify_text(
            "Scalable Oversight for Value Alignment",
            Some("We propose debate as a scalable oversight method for aligning language models with human values."),
            &SourceTaxonomy::new().with_category("cs.AI"),
        );

        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"alignment"));
        assert!(names.contains(&"scalable_oversight"));
        assert!(names.contains(&"ai"));
        assert!(tags.len() <= 10);
        for tag in &tags {
            assert!((0.0..=1.0).contains(&tag.confidence));
            assert!(tag.confidence >= 0.3);
        }
        for pair in tags.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[test]
    fn test_assignments_carry_signals() {
        let c = classifier();
        let tags = c.classify_text("Adversarial robustness of vision models", None, &SourceTaxonomy::default());
        let adversarial = tags
            .iter()
            .find(|t| t.name == "adversarial_robustness")
            .unwrap();
        assert!(adversarial.signals.rule > 0.0);
        assert!(adversarial.signals.frequency > 0.0);
        assert_eq!(adversarial.signals.source, 0.0);
    }

    #[test]
    fn test_classify_record_uses_source_metadata() {
        let c = classifier();
        let record = PaperRecord::new("Notes on a Curious Result")
            .with_source(PaperSource::Arxiv, "2401.01234")
            .with_raw_metadata(serde_json::json!({"categories": ["cs.CY"]}));
        let names: Vec<_> = c
            .classify_record(&record)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["ethics", "governance"]);
    }

    #[test]
    fn test_custom_lexicon_and_threshold() {
        let lexicon = Lexicon::from_keywords([("alignment", vec!["alignment"])]);
        let config = TaggingConfig {
            min_confidence: 0.9,
            ..TaggingConfig::default()
        };
        let c = Classifier::new(&lexicon, &config).unwrap();
        assert!(c
            .classify_text("A Study of Value Alignment in Agents", None, &SourceTaxonomy::default())
            .is_empty());
    }
}
