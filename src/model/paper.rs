//! Paper representation: persisted papers and the normalized records
//! produced by source connectors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for a persisted paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaperId(i64);

impl PaperId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a paper record was fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperSource {
    GoogleScholar,
    Crossref,
    SemanticScholar,
    Arxiv,
    /// Uploaded or created locally
    Internal,
}

impl PaperSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperSource::GoogleScholar => "google_scholar",
            PaperSource::Crossref => "crossref",
            PaperSource::SemanticScholar => "semantic_scholar",
            PaperSource::Arxiv => "arxiv",
            PaperSource::Internal => "internal",
        }
    }
}

impl fmt::Display for PaperSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown paper source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for PaperSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google_scholar" => Ok(PaperSource::GoogleScholar),
            "crossref" => Ok(PaperSource::Crossref),
            "semantic_scholar" => Ok(PaperSource::SemanticScholar),
            "arxiv" => Ok(PaperSource::Arxiv),
            "internal" => Ok(PaperSource::Internal),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// A normalized paper record as delivered by a source connector.
///
/// Only `title` is expected; every other field may be missing. Field names
/// accept both snake_case and the camelCase spellings connectors emit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, alias = "arxivId", skip_serializing_if = "Option::is_none")]
    pub arxiv_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PaperSource>,
    #[serde(default, alias = "sourceId", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Source-specific taxonomy bag (categories, fields of study, subjects)
    #[serde(
        default,
        alias = "rawMetadata",
        alias = "raw_data",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw_metadata: Option<serde_json::Value>,
    #[serde(default, alias = "citationCount")]
    pub citation_count: u32,
}

impl PaperRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }

    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn with_arxiv_id(mut self, arxiv_id: impl Into<String>) -> Self {
        self.arxiv_id = Some(arxiv_id.into());
        self
    }

    pub fn with_source(mut self, source: PaperSource, source_id: impl Into<String>) -> Self {
        self.source = Some(source);
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_raw_metadata(mut self, raw: serde_json::Value) -> Self {
        self.raw_metadata = Some(raw);
        self
    }

    pub fn with_citation_count(mut self, count: u32) -> Self {
        self.citation_count = count;
        self
    }
}

/// A persisted paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: PaperId,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub source: PaperSource,
    pub source_id: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    /// Classifier input only; never shown to readers
    pub raw_metadata: Option<serde_json::Value>,
    pub citation_count: u32,
    /// Relevance score in [0, 100]; NULL until scored or when scoring failed
    pub tag_score: Option<f64>,
    pub scored_at: Option<DateTime<Utc>>,
    /// Set exactly once, when the paper enters the tagging pipeline
    pub classified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Paper {
    pub fn is_scored(&self) -> bool {
        self.scored_at.is_some()
    }

    pub fn is_classified(&self) -> bool {
        self.classified_at.is_some()
    }
}

/// Trim an optional identifier, treating blank strings as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_source_round_trips_through_str() {
        for source in [
            PaperSource::GoogleScholar,
            PaperSource::Crossref,
            PaperSource::SemanticScholar,
            PaperSource::Arxiv,
            PaperSource::Internal,
        ] {
            assert_eq!(source.as_str().parse::<PaperSource>().unwrap(), source);
        }
        assert!("myspace".parse::<PaperSource>().is_err());
    }

    #[test]
    fn test_record_accepts_connector_spellings() {
        let record: PaperRecord = serde_json::from_value(json!({
            "title": "Scalable Oversight via Debate",
            "abstract": "We study debate.",
            "arxivId": "2401.00001",
            "source": "arxiv",
            "sourceId": "2401.00001v2",
            "rawMetadata": {"categories": ["cs.AI"]},
            "citationCount": 12
        }))
        .unwrap();

        assert_eq!(record.abstract_text.as_deref(), Some("We study debate."));
        assert_eq!(record.arxiv_id.as_deref(), Some("2401.00001"));
        assert_eq!(record.source, Some(PaperSource::Arxiv));
        assert_eq!(record.source_id.as_deref(), Some("2401.00001v2"));
        assert_eq!(record.citation_count, 12);
        assert!(record.raw_metadata.is_some());
    }

    #[test]
    fn test_record_without_title_defaults_to_empty() {
        let record: PaperRecord = serde_json::from_value(json!({"doi": "10.1/x"})).unwrap();
        assert!(record.title.is_empty());
    }

    #[test]
    fn test_non_blank_filters_whitespace() {
        assert_eq!(non_blank(&Some("  10.1/abc ".to_string())), Some("10.1/abc"));
        assert_eq!(non_blank(&Some("   ".to_string())), None);
        assert_eq!(non_blank(&None), None);
    }
}
