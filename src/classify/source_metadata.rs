//! Source-provided taxonomy as a classification signal

use super::lexicon::Lexicon;
use crate::model::PaperSource;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Confidence added per tag mapped from a taxonomy code
pub const CATEGORY_WEIGHT: f64 = 0.8;
/// Confidence added per tag mapped directly from a field string
pub const FIELD_DIRECT_WEIGHT: f64 = 0.7;
/// Confidence added per tag whose keyword occurs inside a field string
pub const FIELD_FUZZY_WEIGHT: f64 = 0.5;

/// Taxonomy codes and free-text fields attached to a paper by its source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceTaxonomy {
    /// arXiv-style category codes such as `cs.AI`
    pub categories: Vec<String>,
    /// Field-of-study or subject strings
    pub fields: Vec<String>,
}

impl SourceTaxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, code: impl Into<String>) -> Self {
        self.categories.push(code.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.fields.is_empty()
    }

    /// Extract the taxonomy from a source's raw metadata bag.
    ///
    /// - Semantic Scholar: `fieldsOfStudy` (plain strings, or objects with a
    ///   `category` member as in `s2FieldsOfStudy`)
    /// - arXiv: `categories`
    /// - Crossref: `subjects`
    ///
    /// Other sources and malformed shapes yield an empty taxonomy.
    pub fn from_raw(source: PaperSource, raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match source {
            PaperSource::SemanticScholar => Self {
                categories: Vec::new(),
                fields: string_list(raw.get("fieldsOfStudy")),
            },
            PaperSource::Arxiv => Self {
                categories: string_list(raw.get("categories")),
                fields: Vec::new(),
            },
            PaperSource::Crossref => Self {
                categories: Vec::new(),
                fields: string_list(raw.get("subjects")),
            },
            PaperSource::GoogleScholar | PaperSource::Internal => Self::default(),
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("category").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub struct SourceMetadataMapper {
    lexicon: Lexicon,
    /// tag name → lower-cased keywords, for the fuzzy field pass
    keywords: Vec<(String, Vec<String>)>,
}

impl SourceMetadataMapper {
    pub fn new(lexicon: &Lexicon) -> Self {
        let keywords = lexicon
            .tags()
            .map(|(tag, kws)| {
                let lowered = kws
                    .iter()
                    .map(|kw| kw.trim().to_lowercase())
                    .filter(|kw| !kw.is_empty())
                    .collect();
                (tag.to_string(), lowered)
            })
            .collect();
        Self {
            lexicon: lexicon.clone(),
            keywords,
        }
    }

    pub fn score(&self, taxonomy: &SourceTaxonomy) -> BTreeMap<String, f64> {
        let mut scores: BTreeMap<String, f64> = BTreeMap::new();

        for code in &taxonomy.categories {
            for tag in self.lexicon.category_tags(code) {
                *scores.entry(tag.clone()).or_default() += CATEGORY_WEIGHT;
            }
        }

        for field in &taxonomy.fields {
            match self.lexicon.field_tags(field) {
                Some(tags) if !tags.is_empty() => {
                    for tag in tags {
                        *scores.entry(tag.clone()).or_default() += FIELD_DIRECT_WEIGHT;
                    }
                }
                _ => {
                    let field_lower = field.to_lowercase();
                    for (tag, keywords) in &self.keywords {
                        if keywords.iter().any(|kw| field_lower.contains(kw.as_str())) {
                            *scores.entry(tag.clone()).or_default() += FIELD_FUZZY_WEIGHT;
                        }
                    }
                }
            }
        }

        for score in scores.values_mut() {
            *score = score.min(1.0);
        }
        scores
    }
}
