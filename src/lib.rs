//! Papertag: tagging and relevance scoring for research papers
//!
//! Papers fetched from sources such as arXiv, Semantic Scholar or Crossref
//! are deduplicated, classified into topic tags by a hybrid classifier,
//! tracked for novel tag combinations and scored against the tags currently
//! in use.
//!
//! # Core Concepts
//!
//! - **Classifier**: rule, term-frequency and source-metadata signals folded
//!   into one confidence per tag
//! - **Tag registry**: get-or-create tags with frequency and growth statistics
//! - **Combo tracker**: canonical tag pairs, novel while seen in at most
//!   [`NOVEL_THRESHOLD`] papers
//! - **Relevance scorer**: a paper's tag weights relative to the most
//!   frequent tags, scaled to 0..=100
//!
//! # Example
//!
//! ```
//! use papertag::{IngestionPipeline, OpenStore, PaperRecord, SqliteStore, TaggingConfig};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteStore::open_in_memory().unwrap());
//! let pipeline = IngestionPipeline::new(store, &TaggingConfig::default()).unwrap();
//! let outcome = pipeline
//!     .ingest(&PaperRecord::new("Scalable Oversight for Value Alignment"))
//!     .unwrap();
//! assert!(outcome.created);
//! ```

pub mod classify;
pub mod clock;
pub mod combo;
pub mod config;
pub mod identity;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod registry;
pub mod scoring;
pub mod storage;

pub use classify::{Classifier, Lexicon, LexiconError, SourceTaxonomy, StrategyWeights, TagAssignment};
pub use clock::{Clock, ManualClock, SystemClock};
pub use combo::{ComboStats, ComboSummary, ComboTracker};
pub use config::{ConfigError, TaggingConfig};
pub use identity::{IdentityKey, IdentityResolver};
pub use ingest::{BatchReport, EnrichmentReport, IngestOutcome, IngestionPipeline};
pub use model::{
    ComboId, ComboKey, Paper, PaperId, PaperRecord, PaperSource, PaperTag, Tag, TagCombo, TagId,
    NOVEL_THRESHOLD,
};
pub use registry::TagRegistry;
pub use scoring::{BaselineCache, RelevanceScorer};
pub use storage::{OpenStore, SqliteStore, StorageError, StorageResult, TaggingStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
