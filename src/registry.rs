//! Tag registry: get-or-create tags and keep their usage statistics
//!
//! A tag's frequency counts the distinct papers holding it. Assignment goes
//! through the paper-tag unique pair, so re-assigning a tag to the same
//! paper never counts twice.

use crate::clock::Clock;
use crate::model::{PaperId, Tag, TagId};
use crate::storage::{PaperTagStore, StorageResult, TagStore};
use std::sync::Arc;

pub use crate::model::growth_rate;

pub struct TagRegistry<S: TagStore + PaperTagStore + ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: TagStore + PaperTagStore + ?Sized> Clone for TagRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S: TagStore + PaperTagStore + ?Sized> TagRegistry<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Existing tag by name, or a new one with zero frequency.
    pub fn get_or_create(&self, name: &str) -> StorageResult<Tag> {
        if let Some(tag) = self.store.find_tag_by_name(name)? {
            return Ok(tag);
        }
        let (tag, created) = self.store.create_tag(name, self.clock.now())?;
        if created {
            tracing::debug!(tag = %tag.name, tag_id = %tag.id, "tag created");
        }
        Ok(tag)
    }

    /// Attach a tag to a paper. Statistics are updated only when the
    /// association is new; returns the updated tag in that case.
    pub fn assign(&self, paper_id: PaperId, tag: &Tag, confidence: f64) -> StorageResult<Option<Tag>> {
        let now = self.clock.now();
        if !self.store.create_paper_tag(paper_id, tag.id, confidence, now)? {
            tracing::debug!(%paper_id, tag = %tag.name, "tag already assigned");
            return Ok(None);
        }
        let updated = self.record_assignment(tag.id)?;
        tracing::trace!(
            %paper_id,
            tag = %updated.name,
            confidence,
            frequency = updated.frequency,
            "tag assigned"
        );
        Ok(Some(updated))
    }

    /// Count one more paper for the tag: bump frequency, stamp first/last
    /// seen and recompute the growth rate, all in one store write.
    pub fn record_assignment(&self, tag_id: TagId) -> StorageResult<Tag> {
        self.store.increment_tag_frequency(tag_id, self.clock.now())
    }

    /// Reset every tag's frequency to its number of paper associations.
    /// Returns how many tags were corrected.
    pub fn recount_frequencies(&self) -> StorageResult<usize> {
        let now = self.clock.now();
        let mut corrected = 0;
        for mut tag in self.store.list_tags(None)? {
            let count = self.store.count_by_tag(tag.id)? as u32;
            if count == tag.frequency {
                continue;
            }
            tracing::info!(tag = %tag.name, from = tag.frequency, to = count, "tag frequency corrected");
            tag.frequency = count;
            tag.growth_rate = growth_rate(count, tag.first_seen, now);
            self.store.save_tag(&tag)?;
            corrected += 1;
        }
        Ok(corrected)
    }
}
