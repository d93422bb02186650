//! Core records: papers, tags, paper-tag associations and tag combinations

mod paper;
mod tag;

pub use paper::{Paper, PaperId, PaperRecord, PaperSource, UnknownSource};
pub(crate) use paper::non_blank;
pub use tag::{
    growth_rate, is_novel_frequency, ComboId, ComboKey, PaperTag, Tag, TagCombo, TagId, AUTO_ASSIGNED_CATEGORY,
    NOVEL_THRESHOLD,
};
