//! Block persistence.
//!
//! One JSON manifest per document, written atomically via temp file +
//! rename. Loading repopulates a Timing Store using the same unit-id scheme
//! as extraction; intervals whose ids no longer attach are reported, not
//! silently dropped.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{SyncStatus, UnitLevel};
use crate::store::TimingStore;

use super::types::{BlockManifest, SyncBlock, MANIFEST_VERSION};

/// Errors from block persistence.
#[derive(Debug, thiserror::Error)]
pub enum BlockStoreError {
    #[error("Block store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Block manifest serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("No sync blocks saved for document '{0}'")]
    NotFound(String),

    #[error("Unsupported manifest version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Persistence contract for sync blocks.
///
/// The EPUB builder consumes the same block list; it gets no per-unit
/// control beyond what the manifest carries.
pub trait SyncBlockStore {
    /// Persist the block list for a document.
    fn save_blocks(
        &self,
        document_id: &str,
        blocks: &[SyncBlock],
        document_fingerprint: Option<String>,
        audio_file: &str,
        granularity: UnitLevel,
    ) -> Result<(), BlockStoreError>;

    /// Load the persisted manifest for a document.
    fn load_blocks(&self, document_id: &str) -> Result<BlockManifest, BlockStoreError>;
}

/// File-backed block store: one `<document_id>.sync.json` per document.
#[derive(Debug)]
pub struct JsonBlockStore {
    root: PathBuf,
}

impl JsonBlockStore {
    /// Create a store rooted at a folder.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Manifest path for a document.
    pub fn manifest_path(&self, document_id: &str) -> PathBuf {
        self.root.join(format!("{}.sync.json", document_id))
    }

    fn atomic_write(&self, path: &Path, content: &str) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl SyncBlockStore for JsonBlockStore {
    fn save_blocks(
        &self,
        document_id: &str,
        blocks: &[SyncBlock],
        document_fingerprint: Option<String>,
        audio_file: &str,
        granularity: UnitLevel,
    ) -> Result<(), BlockStoreError> {
        let manifest = BlockManifest {
            version: MANIFEST_VERSION,
            document_id: document_id.to_string(),
            document_fingerprint,
            audio_file: audio_file.to_string(),
            granularity,
            saved_at: chrono::Utc::now().to_rfc3339(),
            blocks: blocks.to_vec(),
        };

        let json = serde_json::to_string_pretty(&manifest)?;
        let path = self.manifest_path(document_id);
        self.atomic_write(&path, &json)?;

        tracing::info!(
            "Saved {} blocks for '{}' to {}",
            blocks.len(),
            document_id,
            path.display()
        );
        Ok(())
    }

    fn load_blocks(&self, document_id: &str) -> Result<BlockManifest, BlockStoreError> {
        let path = self.manifest_path(document_id);
        if !path.exists() {
            return Err(BlockStoreError::NotFound(document_id.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        let manifest: BlockManifest = serde_json::from_str(&content)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(BlockStoreError::UnsupportedVersion {
                found: manifest.version,
                expected: MANIFEST_VERSION,
            });
        }
        tracing::debug!(
            "Loaded {} blocks for '{}'",
            manifest.blocks.len(),
            document_id
        );
        Ok(manifest)
    }
}

/// Result of repopulating a Timing Store from a manifest.
#[derive(Debug, Clone, Default)]
pub struct RestoreReport {
    /// Blocks whose intervals attached to a unit.
    pub attached: usize,
    /// Block ids with no matching unit in the hierarchy.
    pub orphaned: Vec<String>,
    /// Whether the manifest fingerprint matched the hierarchy (true when
    /// the manifest carries no fingerprint).
    pub fingerprint_match: bool,
}

/// Repopulate a Timing Store from a loaded manifest.
///
/// Uses the store's own `upsert`, so the usual invariant checks run; a
/// fingerprint mismatch means the document was re-extracted with different
/// ids and loaded intervals may fail to attach.
pub fn restore_into_store(manifest: &BlockManifest, store: &mut TimingStore) -> RestoreReport {
    let fingerprint_match = match &manifest.document_fingerprint {
        Some(saved) => *saved == store.hierarchy().fingerprint(),
        None => true,
    };
    if !fingerprint_match {
        tracing::warn!(
            "Manifest fingerprint does not match document '{}'; blocks may not attach",
            manifest.document_id
        );
    }

    let mut report = RestoreReport {
        fingerprint_match,
        ..Default::default()
    };
    for block in &manifest.blocks {
        if store.hierarchy().get(&block.unit_id).is_none() {
            report.orphaned.push(block.unit_id.clone());
            continue;
        }
        store.upsert(&block.unit_id, block.start_s, block.end_s, SyncStatus::Synced);
        report.attached += 1;
    }

    if !report.orphaned.is_empty() {
        tracing::warn!(
            "{} loaded blocks did not attach to any unit",
            report.orphaned.len()
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;
    use crate::extraction::ExclusionRules;
    use crate::models::{SyncUnit, UnitHierarchy};

    fn make_units() -> Vec<SyncUnit> {
        vec![
            SyncUnit::new("s1", UnitLevel::Sentence, None, "One.", 1),
            SyncUnit::new("s2", UnitLevel::Sentence, None, "Two.", 1),
        ]
    }

    fn make_store() -> TimingStore {
        TimingStore::for_hierarchy(Arc::new(UnitHierarchy::from_units(make_units()).unwrap()))
    }

    fn make_blocks(store: &TimingStore) -> Vec<SyncBlock> {
        crate::blocks::collect_blocks(store, &ExclusionRules::none())
    }

    #[test]
    fn save_load_round_trips() {
        let dir = tempdir().unwrap();
        let block_store = JsonBlockStore::new(dir.path());

        let mut store = make_store();
        store.upsert("s1", 0.0, 2.0, SyncStatus::Synced);
        store.upsert("s2", 2.0, 3.5, SyncStatus::Synced);
        let blocks = make_blocks(&store);

        block_store
            .save_blocks(
                "doc-1",
                &blocks,
                Some(store.hierarchy().fingerprint()),
                "narration.m4a",
                UnitLevel::Sentence,
            )
            .unwrap();

        let manifest = block_store.load_blocks("doc-1").unwrap();
        assert_eq!(manifest.version, MANIFEST_VERSION);
        assert_eq!(manifest.audio_file, "narration.m4a");
        assert_eq!(manifest.blocks, blocks);
    }

    #[test]
    fn serialization_is_idempotent_through_reload() {
        let dir = tempdir().unwrap();
        let block_store = JsonBlockStore::new(dir.path());

        let mut store = make_store();
        store.upsert("s1", 0.0, 2.0, SyncStatus::Synced);
        store.upsert("s2", 2.0, 3.5, SyncStatus::Synced);
        let blocks = make_blocks(&store);

        block_store
            .save_blocks(
                "doc-1",
                &blocks,
                Some(store.hierarchy().fingerprint()),
                "narration.m4a",
                UnitLevel::Sentence,
            )
            .unwrap();

        // Reload into a fresh store over the same hierarchy and reserialize.
        let manifest = block_store.load_blocks("doc-1").unwrap();
        let mut fresh = make_store();
        let report = restore_into_store(&manifest, &mut fresh);
        assert_eq!(report.attached, 2);
        assert!(report.orphaned.is_empty());
        assert!(report.fingerprint_match);

        let again = make_blocks(&fresh);
        assert_eq!(again, blocks);
    }

    #[test]
    fn missing_document_is_not_found() {
        let dir = tempdir().unwrap();
        let block_store = JsonBlockStore::new(dir.path());
        assert!(matches!(
            block_store.load_blocks("nope"),
            Err(BlockStoreError::NotFound(_))
        ));
    }

    #[test]
    fn orphaned_blocks_and_fingerprint_mismatch_are_reported() {
        let manifest = BlockManifest {
            version: MANIFEST_VERSION,
            document_id: "doc-1".into(),
            document_fingerprint: Some("stale".into()),
            audio_file: "narration.m4a".into(),
            granularity: UnitLevel::Sentence,
            saved_at: "2026-01-01T00:00:00Z".into(),
            blocks: vec![SyncBlock {
                unit_id: "ghost".into(),
                level: UnitLevel::Sentence,
                page_number: 1,
                start_s: 0.0,
                end_s: 1.0,
                text: "gone".into(),
            }],
        };

        let mut store = make_store();
        let report = restore_into_store(&manifest, &mut store);
        assert_eq!(report.attached, 0);
        assert_eq!(report.orphaned, vec!["ghost".to_string()]);
        assert!(!report.fingerprint_match);
    }

    #[test]
    fn future_manifest_version_is_rejected() {
        let dir = tempdir().unwrap();
        let block_store = JsonBlockStore::new(dir.path());
        let path = block_store.manifest_path("doc-1");
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(
            &path,
            "{\"version\":99,\"document_id\":\"doc-1\",\"document_fingerprint\":null,\
             \"audio_file\":\"a.m4a\",\"granularity\":\"sentence\",\
             \"saved_at\":\"2026-01-01T00:00:00Z\",\"blocks\":[]}",
        )
        .unwrap();

        assert!(matches!(
            block_store.load_blocks("doc-1"),
            Err(BlockStoreError::UnsupportedVersion { found: 99, .. })
        ));
    }
}
