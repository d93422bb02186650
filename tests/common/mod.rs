//! Common test utilities for papertag integration tests
//!
//! Stores are in-memory unless a test needs a file; time is driven by a
//! [`ManualClock`] so decay and cache expiry are deterministic.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use papertag::storage::{PaperStore, PaperTagStore, TagStore};
use papertag::{
    BaselineCache, Classifier, Clock, IngestionPipeline, ManualClock, OpenStore, Paper,
    PaperRecord, PaperSource, SqliteStore, Tag, TaggingConfig,
};
use std::sync::Arc;

/// Fixed starting instant for every test clock
pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().expect("in-memory store"))
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start()))
}

pub fn as_dyn(clock: &Arc<ManualClock>) -> Arc<dyn Clock> {
    clock.clone()
}

pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub clock: Arc<ManualClock>,
    pub pipeline: IngestionPipeline<SqliteStore>,
}

pub fn harness() -> Harness {
    harness_with(memory_store(), TaggingConfig::default())
}

pub fn harness_with(store: Arc<SqliteStore>, config: TaggingConfig) -> Harness {
    let clock = manual_clock();
    let baseline = Arc::new(BaselineCache::new(config.baseline_ttl, as_dyn(&clock)));
    let classifier = Classifier::with_defaults().expect("built-in lexicon compiles");
    let pipeline = IngestionPipeline::with_parts(
        Arc::clone(&store),
        classifier,
        as_dyn(&clock),
        baseline,
        &config,
    );
    Harness {
        store,
        clock,
        pipeline,
    }
}

// === Record builders ===

pub fn arxiv_record(arxiv_id: &str, title: &str, abstract_text: &str) -> PaperRecord {
    PaperRecord::new(title)
        .with_abstract(abstract_text)
        .with_arxiv_id(arxiv_id)
        .with_source(PaperSource::Arxiv, arxiv_id)
        .with_raw_metadata(serde_json::json!({ "categories": ["cs.AI", "cs.CL"] }))
}

/// Distinct per arXiv id, same tags every time
pub fn interpretability_record(arxiv_id: &str) -> PaperRecord {
    arxiv_record(
        arxiv_id,
        &format!("Mechanistic Interpretability of Transformer Circuits ({arxiv_id})"),
        "We study interpretability of large language models by tracing circuits and features.",
    )
}

pub fn alignment_record(doi: &str) -> PaperRecord {
    PaperRecord::new("Scalable Oversight and Value Alignment via Debate")
        .with_abstract("Debate between language models as a scalable oversight method for alignment.")
        .with_doi(doi)
}

// === Seeding helpers ===

/// Insert a bare paper
pub fn seed_paper(store: &SqliteStore, title: &str) -> Paper {
    store
        .create_paper(&PaperRecord::new(title), start())
        .expect("paper created")
}

/// Create a tag and overwrite its statistics
pub fn seed_tag(store: &SqliteStore, name: &str, frequency: u32, growth_rate: f64) -> Tag {
    let (mut tag, _) = store.create_tag(name, start()).expect("tag created");
    tag.frequency = frequency;
    tag.first_seen = Some(start());
    tag.last_seen = Some(start());
    tag.growth_rate = growth_rate;
    store.save_tag(&tag).expect("tag saved");
    tag
}

/// Associate existing tags with a paper without touching tag statistics
pub fn attach(store: &SqliteStore, paper: &Paper, tags: &[&Tag]) {
    for tag in tags {
        store
            .create_paper_tag(paper.id, tag.id, 0.8, start())
            .expect("paper tag created");
    }
}
