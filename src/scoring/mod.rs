//! Relevance scoring
//!
//! A tag's weight is its frequency, decayed by time since it was last seen
//! and boosted by its growth rate:
//!
//! ```text
//! weight = frequency * exp(-0.1 * months_since_last_seen) * (1 + max(0, 2 * growth_rate))
//! ```
//!
//! A paper scores the sum of its tag weights relative to the baseline, the
//! summed weight of the most frequent tags system-wide, scaled to 0..=100.

mod cache;

pub use cache::BaselineCache;

use crate::clock::{months_between, Clock};
use crate::model::{PaperId, Tag};
use crate::storage::{PaperTagStore, StorageResult, TagStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Monthly decay rate of the recency multiplier
pub const RECENCY_DECAY: f64 = 0.1;

/// Number of most frequent tags summed into the baseline
pub const DEFAULT_BASELINE_TOP_N: usize = 8;

pub const MAX_SCORE: f64 = 100.0;

pub fn tag_weight(tag: &Tag, now: DateTime<Utc>) -> f64 {
    let recency = tag
        .last_seen
        .map_or(1.0, |last_seen| (-RECENCY_DECAY * months_between(last_seen, now)).exp());
    let growth_bonus = 1.0 + (tag.growth_rate * 2.0).max(0.0);
    tag.frequency as f64 * recency * growth_bonus
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct RelevanceScorer<S: TagStore + PaperTagStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    baseline: Arc<BaselineCache>,
    top_n: usize,
}

impl<S: TagStore + PaperTagStore + ?Sized> Clone for RelevanceScorer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            baseline: Arc::clone(&self.baseline),
            top_n: self.top_n,
        }
    }
}

impl<S: TagStore + PaperTagStore + ?Sized> RelevanceScorer<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, baseline: Arc<BaselineCache>) -> Self {
        Self {
            store,
            clock,
            baseline,
            top_n: DEFAULT_BASELINE_TOP_N,
        }
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }

    /// Score in [0, 100], rounded to two decimals. A paper without tags, or
    /// an unknown paper, scores 0.
    pub fn score_paper(&self, paper_id: PaperId) -> StorageResult<f64> {
        let tags = self.store.tags_for_paper(paper_id)?;
        if tags.is_empty() {
            return Ok(0.0);
        }

        let now = self.clock.now();
        let total: f64 = tags.iter().map(|tag| tag_weight(tag, now)).sum();
        let baseline = self.max_possible_weight()?;
        if baseline <= 0.0 || !baseline.is_finite() {
            return Ok(0.0);
        }

        let score = round2((MAX_SCORE * total / baseline).clamp(0.0, MAX_SCORE));
        tracing::debug!(%paper_id, score, baseline, tags = tags.len(), "paper scored");
        Ok(score)
    }

    /// Summed weight of the `top_n` most frequent tags, cached for the
    /// baseline TTL. With no tags in use the baseline is 1 and is not cached.
    pub fn max_possible_weight(&self) -> StorageResult<f64> {
        if let Some(cached) = self.baseline.get() {
            return Ok(cached);
        }

        let top = self.store.top_tags_by_frequency(self.top_n)?;
        if top.is_empty() {
            return Ok(1.0);
        }

        let now = self.clock.now();
        let baseline: f64 = top.iter().map(|tag| tag_weight(tag, now)).sum();
        self.baseline.set(baseline);
        tracing::debug!(baseline, tags = top.len(), "scoring baseline recomputed");
        Ok(baseline)
    }

    /// Force the next score to recompute the baseline
    pub fn invalidate_cache(&self) {
        self.baseline.invalidate();
        tracing::debug!("scoring baseline invalidated");
    }
}
