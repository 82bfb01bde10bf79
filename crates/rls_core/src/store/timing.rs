//! The Timing Store.
//!
//! Owns the `unit id -> TimingEntry` mapping for one document. Every unit in
//! the hierarchy gets an Unsynced entry up front; writes go through `upsert`
//! which validates the containment and sibling-ordering invariants and
//! returns warnings instead of rejecting, so editing stays fluid.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::{SyncStatus, UnitHierarchy, UnitLevel};

use super::types::{InvariantKind, InvariantWarning, StoreSnapshot, TimingEntry};

/// Tolerance for float comparisons between interval edges.
const EDGE_EPSILON: f64 = 1e-6;

/// Shared handle to a store.
///
/// The engine is single-threaded and event-driven; the lock exists so that
/// distinct thin controllers (tap-to-sync session, drag session, alignment
/// adapter) can hold the same store, and so that reads always observe a
/// fully-written entry.
pub type SharedTimingStore = Arc<RwLock<TimingStore>>;

/// Authoritative map from unit id to timing state.
#[derive(Debug)]
pub struct TimingStore {
    hierarchy: Arc<UnitHierarchy>,
    entries: HashMap<String, TimingEntry>,
    /// Sibling overlap up to this many seconds is logged, not warned.
    overlap_tolerance_s: f64,
}

impl TimingStore {
    /// Build a store for a hierarchy, seeding an Unsynced entry per unit.
    pub fn for_hierarchy(hierarchy: Arc<UnitHierarchy>) -> Self {
        let entries = hierarchy
            .units()
            .iter()
            .map(|u| (u.id.clone(), TimingEntry::unsynced(&u.id)))
            .collect();
        Self {
            hierarchy,
            entries,
            overlap_tolerance_s: 0.005,
        }
    }

    /// Set the tolerated sibling overlap in seconds.
    pub fn with_overlap_tolerance(mut self, tolerance_s: f64) -> Self {
        self.overlap_tolerance_s = tolerance_s.max(0.0);
        self
    }

    /// Wrap the store in the shared handle type.
    pub fn into_shared(self) -> SharedTimingStore {
        Arc::new(RwLock::new(self))
    }

    /// The hierarchy this store times.
    pub fn hierarchy(&self) -> &Arc<UnitHierarchy> {
        &self.hierarchy
    }

    /// Entry for a unit, as an owned copy.
    pub fn get(&self, unit_id: &str) -> Option<TimingEntry> {
        self.entries.get(unit_id).cloned()
    }

    /// Entries at one level, in document order.
    pub fn entries_at_level(&self, level: UnitLevel) -> Vec<TimingEntry> {
        self.hierarchy
            .at_level(level)
            .filter_map(|u| self.entries.get(&u.id).cloned())
            .collect()
    }

    /// Number of entries with a given status.
    pub fn count_with_status(&self, status: SyncStatus) -> usize {
        self.entries.values().filter(|e| e.status == status).count()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The synced unit at a level whose interval contains a time.
    ///
    /// Pure read used to drive active-unit highlighting from the playback
    /// clock; never races with writes under the shared lock.
    pub fn unit_at_time(&self, level: UnitLevel, time_s: f64) -> Option<String> {
        self.hierarchy
            .at_level(level)
            .filter_map(|u| self.entries.get(&u.id))
            .find(|e| e.contains(time_s))
            .map(|e| e.unit_id.clone())
    }

    /// Write an interval and status for a unit.
    ///
    /// The write always proceeds for known units; violated invariants come
    /// back as warnings for the caller to surface. An unknown id is the one
    /// case that does not write (unit identity is the hard invariant) and is
    /// reported the same way.
    pub fn upsert(
        &mut self,
        unit_id: &str,
        start_s: f64,
        end_s: f64,
        status: SyncStatus,
    ) -> Vec<InvariantWarning> {
        if self.hierarchy.get(unit_id).is_none() {
            return vec![InvariantWarning::new(
                unit_id,
                InvariantKind::UnknownUnit,
                format!("No unit '{}' in the document hierarchy", unit_id),
            )];
        }

        let entry = TimingEntry {
            unit_id: unit_id.to_string(),
            start_s,
            end_s,
            status,
        };
        let warnings = self.validate(&entry);
        tracing::trace!(
            "upsert {} [{:.3}, {:.3}] {} ({} warnings)",
            unit_id,
            start_s,
            end_s,
            status,
            warnings.len()
        );
        self.entries.insert(unit_id.to_string(), entry);
        warnings
    }

    /// Mark a unit as absent from the audio.
    pub fn mark_skipped(&mut self, unit_id: &str) -> Vec<InvariantWarning> {
        self.upsert(unit_id, 0.0, 0.0, SyncStatus::Skipped)
    }

    /// Delete a unit's timing, cascading to all descendants.
    ///
    /// Deleting a sentence clears its words; deleting a paragraph clears its
    /// sentences and words. Entries revert to Unsynced rather than vanish,
    /// so the id set stays identical to the hierarchy.
    pub fn delete(&mut self, unit_id: &str) {
        let mut ids = vec![unit_id.to_string()];
        ids.extend(
            self.hierarchy
                .descendants_of(unit_id)
                .iter()
                .map(|u| u.id.clone()),
        );
        for id in ids {
            if let Some(entry) = self.entries.get_mut(&id) {
                *entry = TimingEntry::unsynced(&id);
            }
        }
    }

    /// Reset every unit on a page (all levels) to Unsynced.
    pub fn clear_page(&mut self, page: u32) {
        let mut cleared = 0;
        for unit in self.hierarchy.units() {
            if unit.page_number == page {
                if let Some(entry) = self.entries.get_mut(&unit.id) {
                    *entry = TimingEntry::unsynced(&unit.id);
                    cleared += 1;
                }
            }
        }
        tracing::debug!("Cleared {} entries on page {}", cleared, page);
    }

    /// Full-state copy for undo.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            entries: self.entries.clone(),
        }
    }

    /// Restore a previous full-state copy.
    pub fn restore(&mut self, snapshot: StoreSnapshot) {
        self.entries = snapshot.entries;
    }

    /// Validate an entry against the current store state.
    fn validate(&self, entry: &TimingEntry) -> Vec<InvariantWarning> {
        let mut warnings = Vec::new();
        if entry.status != SyncStatus::Synced {
            return warnings;
        }

        if entry.start_s < 0.0 || entry.end_s <= entry.start_s {
            warnings.push(InvariantWarning::new(
                &entry.unit_id,
                InvariantKind::InvalidInterval,
                format!(
                    "Interval [{:.3}, {:.3}] fails 0 <= start < end",
                    entry.start_s, entry.end_s
                ),
            ));
        }

        // Containment against a synced parent.
        if let Some(parent) = self.hierarchy.parent_of(&entry.unit_id) {
            if let Some(parent_entry) = self.entries.get(&parent.id) {
                if parent_entry.is_synced()
                    && (entry.start_s < parent_entry.start_s - EDGE_EPSILON
                        || entry.end_s > parent_entry.end_s + EDGE_EPSILON)
                {
                    warnings.push(InvariantWarning::new(
                        &entry.unit_id,
                        InvariantKind::ParentContainment,
                        format!(
                            "Interval [{:.3}, {:.3}] escapes parent '{}' [{:.3}, {:.3}]",
                            entry.start_s,
                            entry.end_s,
                            parent.id,
                            parent_entry.start_s,
                            parent_entry.end_s
                        ),
                    ));
                }
            }
        }

        // Containment over already-synced children (a parent edit can
        // strand them outside the new interval).
        for child in self.hierarchy.children_of(&entry.unit_id) {
            if let Some(child_entry) = self.entries.get(&child.id) {
                if child_entry.is_synced()
                    && (child_entry.start_s < entry.start_s - EDGE_EPSILON
                        || child_entry.end_s > entry.end_s + EDGE_EPSILON)
                {
                    warnings.push(InvariantWarning::new(
                        &entry.unit_id,
                        InvariantKind::ParentContainment,
                        format!(
                            "New interval strands child '{}' [{:.3}, {:.3}]",
                            child.id, child_entry.start_s, child_entry.end_s
                        ),
                    ));
                }
            }
        }

        // Sibling ordering by document position.
        let position = self.hierarchy.position(&entry.unit_id);
        for sibling in self.hierarchy.siblings_of(&entry.unit_id) {
            let Some(sibling_entry) = self.entries.get(&sibling.id) else {
                continue;
            };
            if !sibling_entry.is_synced() {
                continue;
            }
            let sibling_first = self.hierarchy.position(&sibling.id) < position;
            let overlap_s = if sibling_first {
                sibling_entry.end_s - entry.start_s
            } else {
                entry.end_s - sibling_entry.start_s
            };
            if overlap_s > self.overlap_tolerance_s {
                warnings.push(InvariantWarning::new(
                    &entry.unit_id,
                    InvariantKind::SiblingOverlap,
                    format!(
                        "Overlaps sibling '{}' by {:.0}ms",
                        sibling.id,
                        overlap_s * 1000.0
                    ),
                ));
            } else if overlap_s > EDGE_EPSILON {
                tracing::trace!(
                    "Tolerated {:.1}ms overlap between '{}' and '{}'",
                    overlap_s * 1000.0,
                    entry.unit_id,
                    sibling.id
                );
            }
        }

        warnings
    }
}
