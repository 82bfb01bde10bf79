//! Timing Store to sync block conversion.

use std::collections::HashMap;

use crate::extraction::ExclusionRules;
use crate::propagation::round_ms;
use crate::store::TimingStore;

use super::types::SyncBlock;

/// Flatten a store into the ordered block list for persistence.
///
/// Only synced units become blocks; skipped and never-touched units are
/// omitted. Blocks are deduplicated by unit id (last write wins) and
/// filtered against the exclusion rules defensively, in case an excluded
/// unit entered the hierarchy before its pattern was added. Output is
/// ascending by start time, document position breaking ties.
pub fn collect_blocks(store: &TimingStore, rules: &ExclusionRules) -> Vec<SyncBlock> {
    let hierarchy = store.hierarchy();

    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, SyncBlock> = HashMap::new();
    let mut excluded = 0;

    for unit in hierarchy.units() {
        let Some(entry) = store.get(&unit.id) else {
            continue;
        };
        if !entry.is_synced() {
            continue;
        }
        if rules.is_excluded(&unit.id, &unit.text) {
            excluded += 1;
            continue;
        }
        let block = SyncBlock {
            unit_id: unit.id.clone(),
            level: unit.level,
            page_number: unit.page_number,
            start_s: round_ms(entry.start_s),
            end_s: round_ms(entry.end_s),
            text: unit.text.clone(),
        };
        if by_id.insert(unit.id.clone(), block).is_none() {
            order.push(unit.id.clone());
        }
    }

    let mut blocks: Vec<SyncBlock> = order
        .iter()
        .filter_map(|id| by_id.remove(id))
        .collect();
    blocks.sort_by(|a, b| {
        a.start_s
            .partial_cmp(&b.start_s)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                hierarchy
                    .position(&a.unit_id)
                    .cmp(&hierarchy.position(&b.unit_id))
            })
    });

    if excluded > 0 {
        tracing::debug!("Serializer dropped {} excluded units", excluded);
    }
    tracing::debug!("Serialized {} blocks", blocks.len());
    blocks
}
