//! Tag combination tracking
//!
//! Every unordered pair of tags on a paper is canonicalized into a
//! [`ComboKey`] and counted in the combo ledger. A pair seen in at most
//! [`NOVEL_THRESHOLD`] papers is novel; tags on a paper that take part in a
//! novel pair carry the paper-tag `is_novel_combo` flag.
//!
//! Tracking is not idempotent: each call counts the paper's pairs again. The
//! ingestion pipeline guards it with the per-paper classification gate.

use crate::clock::Clock;
use crate::model::{
    is_novel_frequency, ComboId, ComboKey, PaperId, TagCombo, TagId, NOVEL_THRESHOLD,
};
use crate::storage::{ComboStore, PaperTagStore, StorageResult, TagStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Default minimum frequency for novel combination queries
pub const DEFAULT_NOVEL_MIN_FREQUENCY: u32 = 1;
/// Default minimum frequency for popular combination queries
pub const DEFAULT_POPULAR_MIN_FREQUENCY: u32 = 5;
/// Default result limit for combination queries
pub const DEFAULT_QUERY_LIMIT: usize = 50;

/// Outcome of tracking one paper's tag pairs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComboStats {
    /// Pairs on the paper
    pub tracked: usize,
    /// Pairs seen for the first time
    pub created: usize,
    /// Pairs currently novel
    pub novel: usize,
}

/// A combination with its tag names resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboSummary {
    pub id: ComboId,
    pub tag_ids: [TagId; 2],
    pub tag_names: Vec<String>,
    pub frequency: u32,
    pub is_novel: bool,
    pub first_paper_id: Option<PaperId>,
    pub created_at: DateTime<Utc>,
}

/// All unordered pairs of distinct tags, canonicalized.
///
/// Duplicate ids are collapsed first, so `n` distinct tags give
/// `n * (n - 1) / 2` keys.
pub fn tag_pairs(tag_ids: &[TagId]) -> Vec<ComboKey> {
    let distinct: Vec<TagId> = tag_ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let mut pairs = Vec::with_capacity(distinct.len() * distinct.len().saturating_sub(1) / 2);
    for (i, a) in distinct.iter().enumerate() {
        for b in &distinct[i + 1..] {
            if let Some(key) = ComboKey::new(*a, *b) {
                pairs.push(key);
            }
        }
    }
    pairs
}

pub struct ComboTracker<S: TagStore + PaperTagStore + ComboStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: TagStore + PaperTagStore + ComboStore + ?Sized> Clone for ComboTracker<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: TagStore + PaperTagStore + ComboStore + ?Sized> ComboTracker<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Count every tag pair on the paper and refresh its novelty flags.
    ///
    /// Papers with fewer than two tags, including unknown papers, are a
    /// no-op.
    pub fn track_combinations(&self, paper_id: PaperId) -> StorageResult<ComboStats> {
        let paper_tags = self.store.list_by_paper(paper_id)?;
        let tag_ids: Vec<TagId> = paper_tags.iter().map(|pt| pt.tag_id).collect();
        let pairs = tag_pairs(&tag_ids);
        if pairs.is_empty() {
            return Ok(ComboStats::default());
        }

        let mut stats = ComboStats {
            tracked: pairs.len(),
            ..ComboStats::default()
        };
        let mut novel_pairs = Vec::new();

        for key in &pairs {
            let (created, is_novel) = self.track_pair(key, paper_id)?;
            if created {
                stats.created += 1;
            }
            if is_novel {
                stats.novel += 1;
                novel_pairs.push(*key);
            }
        }

        for paper_tag in &paper_tags {
            let flag = novel_pairs.iter().any(|key| key.contains(paper_tag.tag_id));
            if flag != paper_tag.is_novel_combo {
                self.store.set_novel_flag(paper_id, paper_tag.tag_id, flag)?;
            }
        }

        tracing::debug!(
            %paper_id,
            tracked = stats.tracked,
            created = stats.created,
            novel = stats.novel,
            "tag combinations tracked"
        );
        Ok(stats)
    }

    /// Record one sighting of a pair. Returns (newly created, novel now).
    fn track_pair(&self, key: &ComboKey, paper_id: PaperId) -> StorageResult<(bool, bool)> {
        let existing = match self.store.find_combo(key)? {
            Some(combo) => combo,
            None => {
                let (combo, created) = self.store.create_combo(key, paper_id, self.clock.now())?;
                if created {
                    tracing::debug!(combo = %key, %paper_id, "combo created");
                    return Ok((true, combo.is_novel));
                }
                // Lost the race to another writer; count as a sighting
                combo
            }
        };

        let frequency = self.store.increment_combo_frequency(existing.id)?;
        let is_novel = is_novel_frequency(frequency);
        if existing.is_novel && !is_novel {
            tracing::debug!(combo = %key, frequency, "combo no longer novel");
        }
        tracing::trace!(combo = %key, frequency, "combo sighted");
        Ok((false, is_novel))
    }

    /// Combos with `min_frequency <= frequency <= NOVEL_THRESHOLD`, newest first
    pub fn novel_combinations(&self, min_frequency: u32, limit: usize) -> StorageResult<Vec<ComboSummary>> {
        let combos = self.store.query_novel(min_frequency, limit)?;
        self.summarize(combos)
    }

    /// Combos with `frequency >= min_frequency`, most frequent first
    pub fn popular_combinations(&self, min_frequency: u32, limit: usize) -> StorageResult<Vec<ComboSummary>> {
        let combos = self.store.query_popular(min_frequency, limit)?;
        self.summarize(combos)
    }

    /// Whether the exact pair is currently novel. A pair never seen is
    /// novel; a tag paired with itself is not a combination.
    pub fn is_novel_pair(&self, a: TagId, b: TagId) -> StorageResult<bool> {
        let Some(key) = ComboKey::new(a, b) else {
            return Ok(false);
        };
        Ok(self
            .store
            .find_combo(&key)?
            .map_or(true, |combo| combo.frequency <= NOVEL_THRESHOLD))
    }

    /// Currently novel, recorded pairs among the paper's tags.
    ///
    /// Pairs with no combo row are skipped even though
    /// [`is_novel_pair`](Self::is_novel_pair) reports them as novel: a
    /// summary needs a stored combo id and first paper. Run
    /// [`track_combinations`](Self::track_combinations) for the paper first
    /// to have its pairs reported.
    pub fn paper_novel_combos(&self, paper_id: PaperId) -> StorageResult<Vec<ComboSummary>> {
        let tag_ids: Vec<TagId> = self
            .store
            .list_by_paper(paper_id)?
            .into_iter()
            .map(|pt| pt.tag_id)
            .collect();

        let mut combos = Vec::new();
        for key in tag_pairs(&tag_ids) {
            if let Some(combo) = self.store.find_combo(&key)? {
                if combo.is_novel {
                    combos.push(combo);
                }
            }
        }
        self.summarize(combos)
    }

    fn summarize(&self, combos: Vec<TagCombo>) -> StorageResult<Vec<ComboSummary>> {
        let mut names: HashMap<TagId, String> = HashMap::new();
        let mut summaries = Vec::with_capacity(combos.len());

        for combo in combos {
            let mut tag_names = Vec::with_capacity(2);
            for tag_id in combo.key.tags() {
                if !names.contains_key(&tag_id) {
                    if let Some(tag) = self.store.load_tag(tag_id)? {
                        names.insert(tag_id, tag.name);
                    }
                }
                if let Some(name) = names.get(&tag_id) {
                    tag_names.push(name.clone());
                }
            }
            summaries.push(ComboSummary {
                id: combo.id,
                tag_ids: combo.key.tags(),
                tag_names,
                frequency: combo.frequency,
                is_novel: combo.is_novel,
                first_paper_id: combo.first_paper_id,
                created_at: combo.created_at,
            });
        }

        Ok(summaries)
    }
}
