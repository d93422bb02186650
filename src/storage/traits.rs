//! Storage trait definitions

use crate::identity::IdentityKey;
use crate::model::{ComboId, ComboKey, Paper, PaperId, PaperRecord, PaperTag, Tag, TagCombo, TagId};
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Paper not found: {0}")]
    PaperNotFound(PaperId),

    #[error("Tag not found: {0}")]
    TagNotFound(TagId),

    #[error("Tag combination not found: {0}")]
    ComboNotFound(ComboId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("Integrity error: {0}")]
    Integrity(String),
}

impl StorageError {
    /// True when the error is a uniqueness or other constraint violation,
    /// i.e. another writer got there first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::Database(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence of papers
///
/// Implementations must be thread-safe (Send + Sync) to support
/// concurrent ingestion from multiple threads.
pub trait PaperStore: Send + Sync {
    /// Find a paper by a single identity key (exact match)
    fn find_paper(&self, key: &IdentityKey) -> StorageResult<Option<Paper>>;

    fn load_paper(&self, id: PaperId) -> StorageResult<Option<Paper>>;

    /// Insert a new paper. Fails with a conflict error when a unique
    /// identifier is already held by another paper.
    fn create_paper(&self, record: &PaperRecord, created_at: DateTime<Utc>) -> StorageResult<Paper>;

    /// Fill fields the stored paper lacks from a later sighting; never
    /// overwrites present values. Citation count is raised if higher.
    fn update_fill_missing(&self, id: PaperId, record: &PaperRecord) -> StorageResult<Paper>;

    /// Set or clear the relevance score
    fn set_score(
        &self,
        id: PaperId,
        score: Option<f64>,
        scored_at: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;

    /// Mark a paper as classified. Returns false when it already was, or
    /// does not exist.
    fn mark_classified(&self, id: PaperId, at: DateTime<Utc>) -> StorageResult<bool>;

    fn count_papers(&self) -> StorageResult<usize>;
}

/// Persistence of tags
pub trait TagStore: Send + Sync {
    fn find_tag_by_name(&self, name: &str) -> StorageResult<Option<Tag>>;

    fn load_tag(&self, id: TagId) -> StorageResult<Option<Tag>>;

    /// Insert a tag with zero frequency, or return the existing row for the
    /// name. The flag is true when this call created it.
    fn create_tag(&self, name: &str, created_at: DateTime<Utc>) -> StorageResult<(Tag, bool)>;

    /// Persist frequency, timestamps and growth rate of an existing tag
    fn save_tag(&self, tag: &Tag) -> StorageResult<()>;

    /// Atomically add one to the frequency, set `first_seen` if unset,
    /// `last_seen` to `seen_at` and the growth rate as of `seen_at`. Returns
    /// the updated tag.
    fn increment_tag_frequency(&self, id: TagId, seen_at: DateTime<Utc>) -> StorageResult<Tag>;

    /// The `n` most frequent tags with non-zero frequency
    fn top_tags_by_frequency(&self, n: usize) -> StorageResult<Vec<Tag>>;

    /// All tags ordered by frequency, most frequent first
    fn list_tags(&self, limit: Option<usize>) -> StorageResult<Vec<Tag>>;

    fn count_tags(&self) -> StorageResult<usize>;
}

/// Persistence of paper-tag associations
pub trait PaperTagStore: Send + Sync {
    /// Insert the association. Returns false when the pair already existed.
    fn create_paper_tag(
        &self,
        paper_id: PaperId,
        tag_id: TagId,
        confidence: f64,
        created_at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    fn count_by_tag(&self, tag_id: TagId) -> StorageResult<usize>;

    /// Associations of a paper, highest confidence first
    fn list_by_paper(&self, paper_id: PaperId) -> StorageResult<Vec<PaperTag>>;

    /// Tags held by a paper
    fn tags_for_paper(&self, paper_id: PaperId) -> StorageResult<Vec<Tag>>;

    fn set_novel_flag(&self, paper_id: PaperId, tag_id: TagId, is_novel: bool) -> StorageResult<()>;
}

/// Persistence of the tag combination ledger
pub trait ComboStore: Send + Sync {
    fn find_combo(&self, key: &ComboKey) -> StorageResult<Option<TagCombo>>;

    /// Insert a combo with frequency 1, or return the existing row for the
    /// key. The flag is true when this call created it.
    fn create_combo(
        &self,
        key: &ComboKey,
        first_paper_id: PaperId,
        created_at: DateTime<Utc>,
    ) -> StorageResult<(TagCombo, bool)>;

    /// Atomically add one to the frequency and re-derive novelty. Returns the
    /// new frequency.
    fn increment_combo_frequency(&self, id: ComboId) -> StorageResult<u32>;

    /// Combos with `min_frequency <= frequency <= NOVEL_THRESHOLD`, newest first
    fn query_novel(&self, min_frequency: u32, limit: usize) -> StorageResult<Vec<TagCombo>>;

    /// Combos with `frequency >= min_frequency`, most frequent first
    fn query_popular(&self, min_frequency: u32, limit: usize) -> StorageResult<Vec<TagCombo>>;

    fn count_combos(&self) -> StorageResult<usize>;
}

/// Everything the tagging pipeline needs from persistence
pub trait TaggingStore: PaperStore + TagStore + PaperTagStore + ComboStore {}

impl<T> TaggingStore for T where T: PaperStore + TagStore + PaperTagStore + ComboStore + ?Sized {}

/// Extension trait for opening stores from paths
pub trait OpenStore: TaggingStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
