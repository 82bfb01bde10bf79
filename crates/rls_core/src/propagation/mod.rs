//! Proportional interval propagation.
//!
//! Derives child-level intervals from a synced parent interval by
//! character-length-weighted subdivision, preserving document order.
//! Children come out contiguous and non-overlapping by construction, and
//! their durations sum to the parent's duration exactly (the last child's
//! end is pinned to the parent's end after rounding).
//!
//! Propagation is triggered explicitly, on demand or after a parent edit.
//! It is never run from a drag-move callback; re-propagating on every
//! micro-edit would thrash downstream regions mid-drag.

use crate::models::SyncStatus;
use crate::store::{InvariantWarning, TimingStore};

/// Round a time to millisecond precision.
///
/// Keeps floating accumulation drift from building up across many children.
pub fn round_ms(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Outcome of one propagation pass over a parent's direct children.
#[derive(Debug, Clone, Default)]
pub struct PropagationStats {
    /// Parent the pass subdivided.
    pub parent_id: String,
    /// Children that received intervals.
    pub children_updated: usize,
    /// Invariant warnings raised by the child writes.
    pub warnings: Vec<InvariantWarning>,
}

/// Subdivide a synced parent's interval across its direct children.
///
/// No-op (empty stats) when the parent is missing, not synced, childless,
/// or has a non-positive duration.
pub fn propagate_children(store: &mut TimingStore, parent_id: &str) -> PropagationStats {
    let mut stats = PropagationStats {
        parent_id: parent_id.to_string(),
        ..Default::default()
    };

    let Some(parent) = store.get(parent_id) else {
        return stats;
    };
    if !parent.is_synced() || parent.end_s <= parent.start_s {
        return stats;
    }

    let hierarchy = store.hierarchy().clone();
    let children = hierarchy.children_of(parent_id);
    if children.is_empty() {
        return stats;
    }

    let weights: Vec<usize> = children.iter().map(|c| c.weight()).collect();
    let total: usize = weights.iter().sum();
    let span_s = parent.end_s - parent.start_s;

    let mut running_s = parent.start_s;
    let last = children.len() - 1;
    for (i, (child, weight)) in children.iter().zip(&weights).enumerate() {
        let duration_s = span_s * (*weight as f64) / (total as f64);
        let start_s = running_s;
        let end_s = if i == last {
            parent.end_s
        } else {
            round_ms(start_s + duration_s)
        };
        stats
            .warnings
            .extend(store.upsert(&child.id, start_s, end_s, SyncStatus::Synced));
        stats.children_updated += 1;
        running_s = end_s;
    }

    tracing::debug!(
        "Propagated '{}' [{:.3}, {:.3}] across {} children",
        parent_id,
        parent.start_s,
        parent.end_s,
        stats.children_updated
    );
    stats
}

/// Propagate down every level below a parent.
///
/// Runs breadth-first: the parent's children first, then each synced child's
/// own children, so a paragraph fills in sentences and then words.
pub fn propagate_descendants(store: &mut TimingStore, parent_id: &str) -> Vec<PropagationStats> {
    let mut all = Vec::new();
    let mut queue = vec![parent_id.to_string()];
    while let Some(id) = queue.pop() {
        let stats = propagate_children(store, &id);
        if stats.children_updated > 0 {
            let hierarchy = store.hierarchy().clone();
            for child in hierarchy.children_of(&id) {
                queue.push(child.id.clone());
            }
            all.push(stats);
        }
    }
    all
}
