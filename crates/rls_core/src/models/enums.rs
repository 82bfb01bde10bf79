//! Core enums used throughout the engine.

use serde::{Deserialize, Serialize};

/// Hierarchy level of a syncable text unit.
///
/// Levels are totally ordered from coarse to fine:
/// Paragraph > Sentence > Word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitLevel {
    Paragraph,
    Sentence,
    Word,
}

impl UnitLevel {
    /// Depth in the hierarchy (0 = coarsest).
    pub fn depth(&self) -> u8 {
        match self {
            UnitLevel::Paragraph => 0,
            UnitLevel::Sentence => 1,
            UnitLevel::Word => 2,
        }
    }

    /// The next-finer level, if any.
    pub fn finer(&self) -> Option<UnitLevel> {
        match self {
            UnitLevel::Paragraph => Some(UnitLevel::Sentence),
            UnitLevel::Sentence => Some(UnitLevel::Word),
            UnitLevel::Word => None,
        }
    }

    /// The next-coarser level, if any.
    pub fn coarser(&self) -> Option<UnitLevel> {
        match self {
            UnitLevel::Paragraph => None,
            UnitLevel::Sentence => Some(UnitLevel::Paragraph),
            UnitLevel::Word => Some(UnitLevel::Sentence),
        }
    }
}

impl std::fmt::Display for UnitLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitLevel::Paragraph => write!(f, "paragraph"),
            UnitLevel::Sentence => write!(f, "sentence"),
            UnitLevel::Word => write!(f, "word"),
        }
    }
}

/// Sync lifecycle state of a timing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Created at extraction time, no interval assigned yet.
    #[default]
    Unsynced,
    /// Has a valid interval on the audio track.
    Synced,
    /// Judged absent from the audio by automatic alignment.
    Skipped,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Unsynced => write!(f, "unsynced"),
            SyncStatus::Synced => write!(f, "synced"),
            SyncStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Automatic alignment strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentMode {
    /// Phoneme-level forced alignment via an external service.
    #[default]
    Forced,
    /// Deterministic character-proportional spread across the track.
    Linear,
}

impl std::fmt::Display for AlignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentMode::Forced => write!(f, "forced"),
            AlignmentMode::Linear => write!(f, "linear"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_is_total() {
        assert!(UnitLevel::Paragraph.depth() < UnitLevel::Sentence.depth());
        assert!(UnitLevel::Sentence.depth() < UnitLevel::Word.depth());
    }

    #[test]
    fn finer_and_coarser_are_inverse() {
        assert_eq!(UnitLevel::Paragraph.finer(), Some(UnitLevel::Sentence));
        assert_eq!(UnitLevel::Sentence.coarser(), Some(UnitLevel::Paragraph));
        assert_eq!(UnitLevel::Word.finer(), None);
        assert_eq!(UnitLevel::Paragraph.coarser(), None);
    }
}
