//! Sync blocks: the persisted form of a synchronized document.
//!
//! The serializer flattens the Timing Store into an ordered block list;
//! the block store persists it as a versioned JSON manifest and can
//! repopulate a Timing Store on reload.

mod serializer;
mod store;
mod types;

pub use serializer::collect_blocks;
pub use store::{restore_into_store, BlockStoreError, JsonBlockStore, RestoreReport, SyncBlockStore};
pub use types::{BlockManifest, SyncBlock, MANIFEST_VERSION};
