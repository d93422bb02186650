//! Storage backends for papertag
//!
//! The tagging pipeline talks to persistence through the `PaperStore`,
//! `TagStore`, `PaperTagStore` and `ComboStore` traits, bundled as
//! `TaggingStore`. The primary implementation is `SqliteStore`.

mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{
    ComboStore, OpenStore, PaperStore, PaperTagStore, StorageError, StorageResult, TagStore,
    TaggingStore,
};
