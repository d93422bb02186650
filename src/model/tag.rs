//! Tags, paper-tag associations and canonical tag combinations

use super::paper::PaperId;
use crate::clock::months_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A combination seen in at most this many papers is considered novel
pub const NOVEL_THRESHOLD: u32 = 3;

/// Category given to tags created by the classifier
pub const AUTO_ASSIGNED_CATEGORY: &str = "auto_assigned";

/// Novelty is a pure function of a combo's current frequency.
pub fn is_novel_frequency(frequency: u32) -> bool {
    frequency <= NOVEL_THRESHOLD
}

/// Papers per month since `first_seen`, with the elapsed time floored at
/// one month.
pub fn growth_rate(frequency: u32, first_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let months = first_seen.map_or(0.0, |first| months_between(first, now));
    frequency as f64 / months.max(1.0)
}

/// Unique identifier for a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(i64);

impl TagId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stored tag combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComboId(i64);

impl ComboId {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ComboId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A topical label with usage statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    /// Unique name, e.g. `mechanistic_interpretability`
    pub name: String,
    pub slug: String,
    pub category: String,
    /// Number of papers holding this tag
    pub frequency: u32,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    /// Papers per month since `first_seen`
    pub growth_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// URL-friendly form of a tag name
    pub fn slug_for(name: &str) -> String {
        name.replace('_', "-")
    }
}

/// Association between a paper and one of its tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperTag {
    pub paper_id: PaperId,
    pub tag_id: TagId,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
    /// True while the tag belongs to at least one novel pair on this paper
    pub is_novel_combo: bool,
    pub created_at: DateTime<Utc>,
}

/// Canonical key of an unordered pair of distinct tags.
///
/// The two ids are always stored in ascending order, so `(a, b)` and `(b, a)`
/// produce the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComboKey {
    low: TagId,
    high: TagId,
}

impl ComboKey {
    /// Returns `None` when both ids are the same tag.
    pub fn new(a: TagId, b: TagId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> TagId {
        self.low
    }

    pub fn high(&self) -> TagId {
        self.high
    }

    pub fn contains(&self, tag: TagId) -> bool {
        self.low == tag || self.high == tag
    }

    pub fn tags(&self) -> [TagId; 2] {
        [self.low, self.high]
    }
}

impl fmt::Display for ComboKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}

/// Ledger entry for a tag pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagCombo {
    pub id: ComboId,
    pub key: ComboKey,
    /// Papers exhibiting this pair, counted with multiplicity; never decreases
    pub frequency: u32,
    /// Paper that produced the first sighting (best effort under concurrency)
    pub first_paper_id: Option<PaperId>,
    pub is_novel: bool,
    pub created_at: DateTime<Utc>,
}
