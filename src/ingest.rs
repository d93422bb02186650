//! Ingestion pipeline: the composition root of the tagging subsystem
//!
//! For each candidate record:
//!
//! 1. resolve identity against persisted papers; a match takes the
//!    fill-missing-fields path, otherwise the paper is created
//! 2. pass the per-paper classification gate (at most once per paper)
//! 3. classify, persist tag assignments and update tag statistics
//! 4. track tag combinations and refresh novelty flags
//! 5. score the paper
//!
//! Steps 2 to 5 are enrichment. Their failures are logged and isolated to
//! the paper; they never undo the paper's base metadata.

use crate::classify::{Classifier, Lexicon, LexiconError, TagAssignment};
use crate::clock::{Clock, SystemClock};
use crate::combo::{ComboStats, ComboTracker};
use crate::config::TaggingConfig;
use crate::identity::{dedupe, IdentityResolver};
use crate::model::{Paper, PaperId, PaperRecord};
use crate::registry::TagRegistry;
use crate::scoring::{BaselineCache, RelevanceScorer};
use crate::storage::{StorageResult, TaggingStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// What enrichment produced for one paper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentReport {
    pub assignments: Vec<TagAssignment>,
    pub combos: ComboStats,
    /// `None` when scoring failed and the score was cleared
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub paper: Paper,
    /// False when the record matched an existing paper
    pub created: bool,
    /// `None` when tagging is disabled, the paper was already classified, or
    /// enrichment failed
    pub enrichment: Option<EnrichmentReport>,
}

/// Counters for one batch of fetched records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total_fetched: usize,
    /// Records left after in-batch deduplication
    pub unique: usize,
    pub ingested: usize,
    pub new_papers: usize,
    pub duplicates_found: usize,
    pub failed: usize,
}

pub struct IngestionPipeline<S: TaggingStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    classifier: Classifier,
    resolver: IdentityResolver<S>,
    registry: TagRegistry<S>,
    combos: ComboTracker<S>,
    scorer: RelevanceScorer<S>,
    assign_tags: bool,
}

impl<S: TaggingStore + ?Sized> IngestionPipeline<S> {
    /// Build from configuration with the system clock. Loads the custom
    /// lexicon when one is configured.
    pub fn new(store: Arc<S>, config: &TaggingConfig) -> Result<Self, LexiconError> {
        let lexicon = match &config.lexicon_path {
            Some(path) => Lexicon::from_path(path)?,
            None => Lexicon::builtin(),
        };
        let classifier = Classifier::new(&lexicon, config)?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let baseline = Arc::new(BaselineCache::new(config.baseline_ttl, Arc::clone(&clock)));
        Ok(Self::with_parts(store, classifier, clock, baseline, config))
    }

    /// Assemble from explicit parts; the baseline cache may be shared with
    /// other pipelines.
    pub fn with_parts(
        store: Arc<S>,
        classifier: Classifier,
        clock: Arc<dyn Clock>,
        baseline: Arc<BaselineCache>,
        config: &TaggingConfig,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(Arc::clone(&store)),
            registry: TagRegistry::new(Arc::clone(&store), Arc::clone(&clock)),
            combos: ComboTracker::new(Arc::clone(&store), Arc::clone(&clock)),
            scorer: RelevanceScorer::new(Arc::clone(&store), Arc::clone(&clock), baseline)
                .with_top_n(config.baseline_top_n),
            store,
            clock,
            classifier,
            assign_tags: config.assign_tags,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn registry(&self) -> &TagRegistry<S> {
        &self.registry
    }

    pub fn combo_tracker(&self) -> &ComboTracker<S> {
        &self.combos
    }

    pub fn scorer(&self) -> &RelevanceScorer<S> {
        &self.scorer
    }

    // === Subsystem operations ===

    pub fn classify(&self, paper: &Paper) -> Vec<TagAssignment> {
        self.classifier.classify(paper)
    }

    pub fn track_combinations(&self, paper_id: PaperId) -> StorageResult<ComboStats> {
        self.combos.track_combinations(paper_id)
    }

    pub fn score_paper(&self, paper_id: PaperId) -> StorageResult<f64> {
        self.scorer.score_paper(paper_id)
    }

    pub fn resolve_identity(&self, record: &PaperRecord) -> StorageResult<Option<Paper>> {
        self.resolver.resolve(record)
    }

    pub fn invalidate_cache(&self) {
        self.scorer.invalidate_cache();
    }

    // === Ingestion ===

    /// Persist one record and enrich it if it has not been classified yet.
    ///
    /// Only identity resolution and the base metadata write can fail this
    /// call; enrichment failures are logged and reported as `None`.
    pub fn ingest(&self, record: &PaperRecord) -> StorageResult<IngestOutcome> {
        let (paper, created) = self.persist(record)?;

        let enrichment = if self.assign_tags {
            match self.enrich(paper.id) {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(paper_id = %paper.id, error = %e, "enrichment failed");
                    None
                }
            }
        } else {
            None
        };

        // Reload so the outcome reflects the stored score
        let paper = match self.store.load_paper(paper.id) {
            Ok(Some(reloaded)) => reloaded,
            _ => paper,
        };

        Ok(IngestOutcome {
            paper,
            created,
            enrichment,
        })
    }

    /// Create the paper, or fill the fields an existing match lacks.
    fn persist(&self, record: &PaperRecord) -> StorageResult<(Paper, bool)> {
        if let Some((existing, key)) = self.resolver.resolve_with_key(record)? {
            let updated = self.store.update_fill_missing(existing.id, record)?;
            tracing::info!(paper_id = %updated.id, matched_on = key.kind(), "paper matched existing");
            return Ok((updated, false));
        }

        match self.store.create_paper(record, self.clock.now()) {
            Ok(paper) => {
                tracing::info!(paper_id = %paper.id, source = %paper.source, "paper created");
                Ok((paper, true))
            }
            Err(e) if e.is_conflict() => {
                // Another writer created it between resolve and insert
                let Some(existing) = self.resolver.resolve(record)? else {
                    return Err(e);
                };
                let updated = self.store.update_fill_missing(existing.id, record)?;
                tracing::debug!(paper_id = %updated.id, "paper created concurrently, filled instead");
                Ok((updated, false))
            }
            Err(e) => Err(e),
        }
    }

    /// Classify, tag, track combinations and score a paper.
    ///
    /// Returns `None` for unknown papers and for papers that already passed
    /// the classification gate.
    pub fn enrich(&self, paper_id: PaperId) -> StorageResult<Option<EnrichmentReport>> {
        let Some(paper) = self.store.load_paper(paper_id)? else {
            return Ok(None);
        };
        if !self.store.mark_classified(paper_id, self.clock.now())? {
            tracing::debug!(%paper_id, "paper already classified, skipping enrichment");
            return Ok(None);
        }

        let assignments = self.classifier.classify(&paper);
        for assignment in &assignments {
            let tag = self.registry.get_or_create(&assignment.name)?;
            self.registry.assign(paper_id, &tag, assignment.confidence)?;
        }

        let combos = self.combos.track_combinations(paper_id)?;
        let score = self.score_and_save(paper_id);

        tracing::info!(
            %paper_id,
            tags = assignments.len(),
            novel_combos = combos.novel,
            score = ?score,
            "paper classified"
        );

        Ok(Some(EnrichmentReport {
            assignments,
            combos,
            score,
        }))
    }

    /// Score and store; on any failure the score is cleared instead.
    pub fn score_and_save(&self, paper_id: PaperId) -> Option<f64> {
        let scored = self.scorer.score_paper(paper_id).and_then(|score| {
            self.store
                .set_score(paper_id, Some(score), Some(self.clock.now()))
                .map(|()| score)
        });

        match scored {
            Ok(score) => Some(score),
            Err(e) => {
                tracing::warn!(%paper_id, error = %e, "scoring failed, score cleared");
                if let Err(e) = self.store.set_score(paper_id, None, None) {
                    tracing::error!(%paper_id, error = %e, "failed to clear score");
                }
                None
            }
        }
    }

    /// Deduplicate a fetched batch and ingest each unique record. A failing
    /// record is counted and skipped.
    pub fn ingest_batch(&self, records: Vec<PaperRecord>) -> BatchReport {
        let started = Instant::now();
        let total_fetched = records.len();
        let unique = dedupe(records);

        let mut report = BatchReport {
            total_fetched,
            unique: unique.len(),
            duplicates_found: total_fetched - unique.len(),
            ..BatchReport::default()
        };

        for record in &unique {
            match self.ingest(record) {
                Ok(outcome) => {
                    report.ingested += 1;
                    if outcome.created {
                        report.new_papers += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(title = %record.title, error = %e, "record ingestion failed");
                }
            }
        }

        if report.new_papers > 0 {
            self.invalidate_cache();
        }

        tracing::info!(
            total_fetched = report.total_fetched,
            unique = report.unique,
            new_papers = report.new_papers,
            duplicates_found = report.duplicates_found,
            failed = report.failed,
            duration_ms = started.elapsed().as_millis() as u64,
            "batch ingested"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::PaperSource;
    use crate::storage::{ComboStore, OpenStore, PaperStore, PaperTagStore, SqliteStore, TagStore};
    use chrono::{TimeZone, Utc};

    fn pipeline() -> IngestionPipeline<SqliteStore> {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        ));
        let config = TaggingConfig::default();
        let baseline = Arc::new(BaselineCache::new(config.baseline_ttl, Arc::clone(&clock)));
        IngestionPipeline::with_parts(
            store,
            Classifier::with_defaults().unwrap(),
            clock,
            baseline,
            &config,
        )
    }

    fn alignment_record() -> PaperRecord {
        PaperRecord::new("Scalable Oversight for Value Alignment")
            .with_abstract("Debate between language models as a scalable oversight method.")
            .with_doi("10.1000/oversight")
    }

    #[test]
    fn test_ingest_creates_and_enriches() {
        let p = pipeline();
        let outcome = p.ingest(&alignment_record()).unwrap();

        assert!(outcome.created);
        assert!(outcome.paper.is_classified());
        let report = outcome.enrichment.unwrap();
        assert!(!report.assignments.is_empty());
        assert_eq!(
            p.store().list_by_paper(outcome.paper.id).unwrap().len(),
            report.assignments.len()
        );
        assert_eq!(outcome.paper.tag_score, report.score);
        let score = report.score.unwrap();
        assert!((0.0..=100.0).contains(&score));
    }

    #[test]
    fn test_reingest_fills_and_does_not_double_count() {
        let p = pipeline();
        let first = p.ingest(&alignment_record()).unwrap();
        let tag_freqs: Vec<u32> = p
            .store()
            .list_tags(None)
            .unwrap()
            .into_iter()
            .map(|t| t.frequency)
            .collect();

        let again = alignment_record()
            .with_arxiv_id("2402.00002")
            .with_citation_count(3);
        let second = p.ingest(&again).unwrap();

        assert!(!second.created);
        assert_eq!(second.paper.id, first.paper.id);
        assert!(second.enrichment.is_none());
        assert_eq!(second.paper.arxiv_id.as_deref(), Some("2402.00002"));
        assert_eq!(second.paper.citation_count, 3);

        let after: Vec<u32> = p
            .store()
            .list_tags(None)
            .unwrap()
            .into_iter()
            .map(|t| t.frequency)
            .collect();
        assert_eq!(tag_freqs, after);
        assert_eq!(p.store().count_papers().unwrap(), 1);
    }

    #[test]
    fn test_enrich_is_gated_per_paper() {
        let p = pipeline();
        let outcome = p.ingest(&alignment_record()).unwrap();
        let combos_before = p.store().count_combos().unwrap();
        assert!(p.enrich(outcome.paper.id).unwrap().is_none());
        assert_eq!(p.store().count_combos().unwrap(), combos_before);
        assert!(p.enrich(PaperId::new(404)).unwrap().is_none());
    }

    #[test]
    fn test_tagging_disabled_persists_only() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let config = TaggingConfig {
            assign_tags: false,
            ..TaggingConfig::default()
        };
        let p = IngestionPipeline::new(Arc::clone(&store), &config).unwrap();
        let outcome = p.ingest(&alignment_record()).unwrap();
        assert!(outcome.created);
        assert!(outcome.enrichment.is_none());
        assert!(!outcome.paper.is_classified());
        assert_eq!(store.count_tags().unwrap(), 0);

        // A later enrichment still runs exactly once
        assert!(p.enrich(outcome.paper.id).unwrap().is_some());
    }

    #[test]
    fn test_blank_title_is_persisted_untagged() {
        let p = pipeline();
        let outcome = p
            .ingest(&PaperRecord::new("  ").with_source(PaperSource::Crossref, "c-1"))
            .unwrap();
        let report = outcome.enrichment.unwrap();
        assert!(report.assignments.is_empty());
        assert_eq!(report.combos, ComboStats::default());
        assert_eq!(report.score, Some(0.0));
    }

    #[test]
    fn test_batch_report_counts() {
        let p = pipeline();
        p.ingest(&PaperRecord::new("already here").with_doi("10.1/existing"))
            .unwrap();

        let report = p.ingest_batch(vec![
            PaperRecord::new("Interpretability of Reward Models").with_doi("10.1/a"),
            PaperRecord::new("Interpretability of Reward Models (mirror)").with_doi("10.1/a"),
            PaperRecord::new("Existing paper, new source").with_doi("10.1/existing"),
            PaperRecord::new("Robustness to Adversarial Perturbations").with_arxiv_id("2403.1"),
        ]);

        assert_eq!(
            report,
            BatchReport {
                total_fetched: 4,
                unique: 3,
                ingested: 3,
                new_papers: 2,
                duplicates_found: 1,
                failed: 0,
            }
        );
        assert_eq!(p.store().count_papers().unwrap(), 3);
    }
}
