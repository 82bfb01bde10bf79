//! Persisted block types.

use serde::{Deserialize, Serialize};

use crate::models::UnitLevel;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// One persisted sync block: a unit with its final interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncBlock {
    /// Unit id, matching the extraction id scheme.
    pub unit_id: String,
    /// Hierarchy level of the unit.
    pub level: UnitLevel,
    /// 1-based page index.
    pub page_number: u32,
    /// Interval start in seconds.
    pub start_s: f64,
    /// Interval end in seconds.
    pub end_s: f64,
    /// Literal text, carried for the EPUB media overlay builder.
    pub text: String,
}

/// Versioned manifest persisted per document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockManifest {
    /// Manifest format version.
    pub version: u32,
    /// Document the blocks belong to.
    pub document_id: String,
    /// Fingerprint of the hierarchy the blocks were serialized from.
    /// Used to detect reloads against a different document.
    pub document_fingerprint: Option<String>,
    /// Audio file the intervals refer to.
    pub audio_file: String,
    /// Export granularity the blocks were serialized at.
    pub granularity: UnitLevel,
    /// RFC 3339 timestamp of the save.
    pub saved_at: String,
    /// Ordered blocks, ascending by start time.
    pub blocks: Vec<SyncBlock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_serde_round_trips() {
        let block = SyncBlock {
            unit_id: "par0001-sen002".into(),
            level: UnitLevel::Sentence,
            page_number: 3,
            start_s: 1.25,
            end_s: 2.75,
            text: "Hi there.".into(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"level\":\"sentence\""));
        let back: SyncBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }
}
