//! Lexicon: the static vocabulary behind every classification signal
//!
//! Three tables:
//! - tag name → keywords and phrases matched in paper text
//! - taxonomy code (arXiv-style category) → tag names
//! - field-of-study / subject string → tag names
//!
//! The built-in lexicon covers AI safety research. A custom lexicon can be
//! loaded from YAML with the same three tables:
//!
//! ```yaml
//! keywords:
//!   alignment: [alignment, value alignment]
//! categories:
//!   cs.AI: [ai]
//! fields:
//!   Ethics: [ethics]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading or compiling a lexicon
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Lexicon parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lexicon defines no tag keywords")]
    Empty,

    #[error("Invalid keyword pattern '{keyword}': {source}")]
    Pattern {
        keyword: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    pub keywords: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Lexicon {
    /// Build a lexicon from the keyword table alone.
    pub fn from_keywords<I, K, V>(keywords: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|(tag, kws)| (tag.into(), kws.into_iter().map(Into::into).collect()))
                .collect(),
            categories: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_category(mut self, code: impl Into<String>, tags: &[&str]) -> Self {
        self.categories
            .insert(code.into(), tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>, tags: &[&str]) -> Self {
        self.fields
            .insert(field.into(), tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, LexiconError> {
        let lexicon: Lexicon = serde_yaml::from_str(yaml)?;
        lexicon.validate()?;
        Ok(lexicon)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    fn validate(&self) -> Result<(), LexiconError> {
        if self.keywords.values().all(|kws| kws.is_empty()) {
            return Err(LexiconError::Empty);
        }
        Ok(())
    }

    /// Tags with their keywords, in name order
    pub fn tags(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.keywords
            .iter()
            .map(|(tag, kws)| (tag.as_str(), kws.as_slice()))
    }

    pub fn keywords_for(&self, tag: &str) -> Option<&[String]> {
        self.keywords.get(tag).map(Vec::as_slice)
    }

    pub fn category_tags(&self, code: &str) -> &[String] {
        self.categories.get(code).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_tags(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// The AI safety research vocabulary
    pub fn builtin() -> Self {
        let mut lexicon = Self::from_keywords(BUILTIN_KEYWORDS.iter().map(|(tag, kws)| {
            (*tag, kws.iter().map(|k| k.to_string()).collect::<Vec<_>>())
        }));
        for (code, tags) in BUILTIN_CATEGORIES {
            lexicon = lexicon.with_category(*code, tags);
        }
        for (field, tags) in BUILTIN_FIELDS {
            lexicon = lexicon.with_field(*field, tags);
        }
        lexicon
    }
}

const BUILTIN_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "interpretability",
        &[
            "interpretability",
            "interpret",
            "explainability",
            "explainable",
            "transparency",
            "black box",
            "feature visualization",
            "saliency",
            "attention mechanism",
            "activation atlas",
        ],
    ),
    (
        "mechanistic_interpretability",
        &[
            "mechanistic interpretability",
            "mechanistic",
            "circuits",
            "neuron analysis",
            "activation",
            "mechanistic understanding",
            "reverse engineering neural",
            "neural circuit",
        ],
    ),
    (
        "alignment",
        &[
            "alignment",
            "value alignment",
            "aligned",
            "human values",
            "goal alignment",
            "preference learning",
            "intent alignment",
        ],
    ),
    (
        "rlhf",
        &[
            "rlhf",
            "reinforcement learning from human feedback",
            "reinforcement learning human",
            "rl from human feedback",
            "reward modeling",
            "preference modeling",
        ],
    ),
    (
        "adversarial_robustness",
        &[
            "adversarial",
            "robustness",
            "adversarial examples",
            "adversarial attack",
            "adversarial training",
            "perturbation",
            "robust optimization",
            "certified robustness",
        ],
    ),
    (
        "safety",
        &[
            "ai safety",
            "safety",
            "safe ai",
            "safety critical",
            "fail-safe",
            "safety mechanism",
        ],
    ),
    (
        "governance",
        &[
            "governance",
            "ai governance",
            "policy",
            "regulation",
            "oversight",
            "compliance",
            "standards",
        ],
    ),
    (
        "ethics",
        &[
            "ethics",
            "ethical",
            "moral",
            "fairness",
            "bias",
            "discrimination",
            "justice",
            "responsible ai",
        ],
    ),
    (
        "risk",
        &[
            "risk",
            "existential risk",
            "catastrophic",
            "dangerous",
            "threat",
            "hazard",
            "harm",
        ],
    ),
    (
        "scalable_oversight",
        &[
            "scalable oversight",
            "oversight",
            "supervision",
            "recursive reward",
            "amplification",
            "debate",
        ],
    ),
    (
        "reward_hacking",
        &[
            "reward hacking",
            "reward gaming",
            "specification gaming",
            "goodhart",
            "proxy gaming",
            "side effects",
        ],
    ),
    (
        "inner_alignment",
        &[
            "inner alignment",
            "mesa-optimization",
            "mesa-optimizer",
            "inner optimizer",
            "objective robustness",
        ],
    ),
    (
        "outer_alignment",
        &[
            "outer alignment",
            "objective specification",
            "reward specification",
            "reward function design",
        ],
    ),
    (
        "deception",
        &[
            "deception",
            "deceptive",
            "hidden objectives",
            "treacherous turn",
            "misaligned behavior",
        ],
    ),
    (
        "capability",
        &[
            "capability",
            "performance",
            "benchmark",
            "state-of-the-art",
            "sota",
            "advancement",
        ],
    ),
    (
        "llm",
        &[
            "large language model",
            "llm",
            "language model",
            "gpt",
            "transformer",
            "bert",
            "chatgpt",
            "claude",
        ],
    ),
    (
        "multimodal",
        &[
            "multimodal",
            "vision-language",
            "multi-modal",
            "clip",
            "vision transformer",
            "image-text",
        ],
    ),
    (
        "agent",
        &[
            "agent",
            "autonomous",
            "reinforcement learning",
            "rl",
            "policy learning",
            "decision making",
        ],
    ),
    (
        "uncertainty",
        &[
            "uncertainty",
            "confidence",
            "calibration",
            "epistemic",
            "aleatoric",
            "uncertainty quantification",
        ],
    ),
    (
        "transparency",
        &[
            "transparency",
            "transparent",
            "openness",
            "disclosure",
            "model cards",
            "documentation",
        ],
    ),
    (
        "verification",
        &[
            "verification",
            "formal verification",
            "proof",
            "guarantee",
            "certified",
            "provable",
        ],
    ),
    (
        "testing",
        &[
            "testing",
            "evaluation",
            "benchmark",
            "test suite",
            "validation",
            "assessment",
        ],
    ),
    (
        "dataset",
        &[
            "dataset",
            "corpus",
            "benchmark",
            "data collection",
            "annotation",
            "labeling",
        ],
    ),
    (
        "computer_vision",
        &[
            "computer vision",
            "image",
            "visual",
            "object detection",
            "segmentation",
            "recognition",
        ],
    ),
    (
        "nlp",
        &[
            "natural language processing",
            "nlp",
            "text",
            "language",
            "semantic",
            "syntax",
            "tokenization",
        ],
    ),
    (
        "theoretical",
        &[
            "theoretical",
            "theory",
            "mathematical",
            "formal",
            "analysis",
            "proof",
        ],
    ),
    (
        "empirical",
        &[
            "empirical",
            "experiment",
            "experimental",
            "evaluation",
            "study",
            "case study",
        ],
    ),
    (
        "survey",
        &[
            "survey",
            "review",
            "overview",
            "literature review",
            "systematic review",
        ],
    ),
];

const BUILTIN_CATEGORIES: &[(&str, &[&str])] = &[
    ("cs.AI", &["ai", "machine_learning"]),
    ("cs.LG", &["machine_learning"]),
    ("cs.CL", &["nlp"]),
    ("cs.CV", &["computer_vision"]),
    ("cs.CY", &["governance", "ethics"]),
    ("cs.HC", &["human_computer_interaction"]),
    ("stat.ML", &["machine_learning", "theoretical"]),
];

const BUILTIN_FIELDS: &[(&str, &[&str])] = &[
    ("Computer Science", &["ai"]),
    ("Machine Learning", &["machine_learning"]),
    ("Artificial Intelligence", &["ai"]),
    ("Natural Language Processing", &["nlp"]),
    ("Computer Vision", &["computer_vision"]),
    ("Ethics", &["ethics"]),
    ("Philosophy", &["ethics", "theoretical"]),
];
