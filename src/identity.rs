//! Paper identity resolution
//!
//! Two records denote the same work when, in priority order, they share a
//! DOI, an arXiv id, a `(source, source_id)` pair, or a case-insensitive
//! title longer than [`MIN_TITLE_MATCH_LEN`] characters. The first key that
//! matches wins.
//!
//! The same chain serves two purposes: [`dedupe`] collapses a freshly
//! fetched batch against itself, and [`IdentityResolver::resolve`] matches a
//! single candidate against persisted papers.

use crate::model::{non_blank, Paper, PaperRecord, PaperSource};
use crate::storage::{PaperStore, StorageResult};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Titles must be strictly longer than this to be used as an identity key.
pub const MIN_TITLE_MATCH_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Doi(String),
    ArxivId(String),
    SourceId {
        source: PaperSource,
        source_id: String,
    },
    /// Normalized (trimmed, lower-cased) title
    Title(String),
}

impl IdentityKey {
    /// All keys present on a record, highest priority first.
    ///
    /// A record without a source is keyed as [`PaperSource::Internal`].
    pub fn for_record(record: &PaperRecord) -> Vec<IdentityKey> {
        let mut keys = Vec::with_capacity(4);
        if let Some(doi) = non_blank(&record.doi) {
            keys.push(IdentityKey::Doi(doi.to_string()));
        }
        if let Some(arxiv_id) = non_blank(&record.arxiv_id) {
            keys.push(IdentityKey::ArxivId(arxiv_id.to_string()));
        }
        if let Some(source_id) = non_blank(&record.source_id) {
            keys.push(IdentityKey::SourceId {
                source: record.source.unwrap_or(PaperSource::Internal),
                source_id: source_id.to_string(),
            });
        }
        if let Some(title) = normalize_title(&record.title) {
            keys.push(IdentityKey::Title(title));
        }
        keys
    }

    pub fn kind(&self) -> &'static str {
        match self {
            IdentityKey::Doi(_) => "doi",
            IdentityKey::ArxivId(_) => "arxiv_id",
            IdentityKey::SourceId { .. } => "source_id",
            IdentityKey::Title(_) => "title",
        }
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKey::Doi(doi) => write!(f, "doi:{}", doi),
            IdentityKey::ArxivId(id) => write!(f, "arxiv:{}", id),
            IdentityKey::SourceId { source, source_id } => write!(f, "{}:{}", source, source_id),
            IdentityKey::Title(title) => write!(f, "title:{}", title),
        }
    }
}

/// Trimmed, lower-cased title, or `None` when it is too short to identify a
/// paper.
pub fn normalize_title(title: &str) -> Option<String> {
    let normalized = title.trim().to_lowercase();
    (normalized.chars().count() > MIN_TITLE_MATCH_LEN).then_some(normalized)
}

/// Collapse records denoting the same work, keeping the first occurrence.
///
/// A record is dropped when any of its identity keys was already claimed by
/// an earlier record; otherwise all of its keys are claimed.
pub fn dedupe(records: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen: HashSet<IdentityKey> = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        let keys = IdentityKey::for_record(&record);
        if keys.iter().any(|key| seen.contains(key)) {
            continue;
        }
        seen.extend(keys);
        unique.push(record);
    }

    unique
}

/// Matches candidate records against persisted papers
pub struct IdentityResolver<S: PaperStore + ?Sized> {
    store: Arc<S>,
}

impl<S: PaperStore + ?Sized> Clone for IdentityResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PaperStore + ?Sized> IdentityResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The persisted paper this record denotes, if any.
    pub fn resolve(&self, record: &PaperRecord) -> StorageResult<Option<Paper>> {
        Ok(self.resolve_with_key(record)?.map(|(paper, _)| paper))
    }

    /// Like [`resolve`](Self::resolve), also reporting which key matched.
    pub fn resolve_with_key(
        &self,
        record: &PaperRecord,
    ) -> StorageResult<Option<(Paper, IdentityKey)>> {
        for key in IdentityKey::for_record(record) {
            if let Some(paper) = self.store.find_paper(&key)? {
                tracing::debug!(paper_id = %paper.id, matched_on = key.kind(), "identity resolved");
                return Ok(Some((paper, key)));
            }
        }
        Ok(None)
    }
}
