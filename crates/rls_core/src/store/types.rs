//! Timing entry and invariant warning types.
//!
//! Times are `f64` seconds. Rounding to millisecond precision happens in
//! the subdivision arithmetic and at serialization time, not here.

use serde::{Deserialize, Serialize};

use crate::models::SyncStatus;

/// Mutable sync state for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingEntry {
    /// Id of the unit this entry times.
    pub unit_id: String,
    /// Interval start in seconds.
    pub start_s: f64,
    /// Interval end in seconds.
    pub end_s: f64,
    /// Lifecycle status.
    pub status: SyncStatus,
}

impl TimingEntry {
    /// Fresh entry with no interval, as created at extraction time.
    pub fn unsynced(unit_id: impl Into<String>) -> Self {
        Self {
            unit_id: unit_id.into(),
            start_s: 0.0,
            end_s: 0.0,
            status: SyncStatus::Unsynced,
        }
    }

    /// Synced entry with an interval.
    pub fn synced(unit_id: impl Into<String>, start_s: f64, end_s: f64) -> Self {
        Self {
            unit_id: unit_id.into(),
            start_s,
            end_s,
            status: SyncStatus::Synced,
        }
    }

    /// Interval duration in seconds (zero for unsynced entries).
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }

    /// Whether the entry carries a usable interval.
    pub fn is_synced(&self) -> bool {
        self.status == SyncStatus::Synced
    }

    /// Whether the interval contains a time.
    pub fn contains(&self, time_s: f64) -> bool {
        self.is_synced() && time_s >= self.start_s && time_s < self.end_s
    }
}

/// Invariant kinds checked on every write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantKind {
    /// The written id does not exist in the hierarchy.
    UnknownUnit,
    /// Interval fails `0 <= start < end`.
    InvalidInterval,
    /// Child interval escapes its synced parent's interval.
    ParentContainment,
    /// Sibling intervals overlap beyond the configured tolerance.
    SiblingOverlap,
}

impl std::fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantKind::UnknownUnit => write!(f, "unknown-unit"),
            InvariantKind::InvalidInterval => write!(f, "invalid-interval"),
            InvariantKind::ParentContainment => write!(f, "parent-containment"),
            InvariantKind::SiblingOverlap => write!(f, "sibling-overlap"),
        }
    }
}

/// A non-fatal invariant violation detected on write.
///
/// Editing is an iterative human-in-the-loop process, so violations are
/// surfaced for the caller to display, never used to reject the write.
#[derive(Debug, Clone)]
pub struct InvariantWarning {
    /// Unit whose write triggered the warning.
    pub unit_id: String,
    /// Which invariant was violated.
    pub kind: InvariantKind,
    /// Formatted description for a UI log.
    pub message: String,
}

impl InvariantWarning {
    pub(crate) fn new(
        unit_id: impl Into<String>,
        kind: InvariantKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for InvariantWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.unit_id, self.message)
    }
}

/// Opaque full-state copy of a store, used by undo.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub(crate) entries: std::collections::HashMap<String, TimingEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_interval_helpers() {
        let entry = TimingEntry::synced("s1", 1.0, 2.5);
        assert!((entry.duration_s() - 1.5).abs() < 1e-9);
        assert!(entry.contains(1.0));
        assert!(entry.contains(2.4));
        assert!(!entry.contains(2.5));

        let fresh = TimingEntry::unsynced("s2");
        assert!(!fresh.is_synced());
        assert!(!fresh.contains(0.0));
    }
}
