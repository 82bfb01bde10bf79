//! Automatic alignment.
//!
//! Two interchangeable strategies behind one trait: forced phoneme
//! alignment via an external service, and a deterministic linear spread.
//! The adapter normalizes either outcome into Timing Store updates with
//! replace-not-merge semantics, and guarantees the store is untouched when
//! a run fails or is cancelled.

mod forced;
mod linear;
mod types;

pub use forced::ForcedAligner;
pub use linear::LinearSpread;
pub use types::{
    AlignedSpan, AlignmentContext, AlignmentError, AlignmentOutcome, AlignmentService,
    CancelHandle, TranscriptSegment,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::models::{AlignmentMode, SyncStatus, SyncUnit, UnitLevel};
use crate::propagation::propagate_descendants;
use crate::store::{InvariantWarning, SharedTimingStore};

/// Trait for automatic alignment strategies.
///
/// Implementations receive the units to align in document order and must
/// poll the cancel handle; a cancelled or failed run returns an error and
/// produces no output to commit.
pub trait AlignmentStrategy: Send + Sync {
    /// Name of this strategy, for logs and reports.
    fn name(&self) -> &'static str;

    /// Align units against the audio track.
    fn align(
        &self,
        units: &[SyncUnit],
        ctx: &AlignmentContext,
        cancel: &CancelHandle,
    ) -> Result<AlignmentOutcome, AlignmentError>;
}

/// Create a strategy for the given mode.
///
/// Requesting forced alignment with no service available falls back to the
/// linear spread.
pub fn get_strategy(
    mode: AlignmentMode,
    service: Option<Arc<dyn AlignmentService>>,
) -> Box<dyn AlignmentStrategy> {
    match (mode, service) {
        (AlignmentMode::Forced, Some(service)) => Box::new(ForcedAligner::new(service)),
        (AlignmentMode::Forced, None) => {
            tracing::warn!("No alignment service available; falling back to linear spread");
            Box::new(LinearSpread)
        }
        (AlignmentMode::Linear, _) => Box::new(LinearSpread),
    }
}

/// Summary of a committed alignment run.
#[derive(Debug, Clone)]
pub struct AlignmentReport {
    /// Strategy that produced the result.
    pub strategy: String,
    /// Units that received intervals.
    pub synced: usize,
    /// Units marked absent from the audio.
    pub skipped: usize,
    /// Invariant warnings raised during the commit.
    pub warnings: Vec<InvariantWarning>,
    /// One-line summary for logs.
    pub summary: String,
}

/// Runs alignment strategies against the shared Timing Store.
///
/// A second run requested while one is in flight is rejected, never run
/// concurrently: two runs racing to mutate the store would violate the
/// containment invariants. The commit itself happens under a single write
/// lock, after the strategy has fully succeeded, so a failure or
/// cancellation leaves no partial result behind.
pub struct AlignmentAdapter {
    store: SharedTimingStore,
    in_flight: Arc<AtomicBool>,
}

impl AlignmentAdapter {
    /// Create an adapter over a store.
    pub fn new(store: SharedTimingStore) -> Self {
        Self {
            store,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a run is currently in flight.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run a strategy over all units at a level and commit the result.
    ///
    /// Replace semantics: previous results at the target level (and the
    /// levels below it) are reset before the new result is applied, so a
    /// second run fully replaces the first, never merges with it.
    pub fn run(
        &self,
        strategy: &dyn AlignmentStrategy,
        level: UnitLevel,
        ctx: &AlignmentContext,
        cancel: &CancelHandle,
    ) -> Result<AlignmentReport, AlignmentError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Err(AlignmentError::AlreadyRunning);
        }
        let _guard = InFlightGuard(self.in_flight.as_ref());

        let units: Vec<SyncUnit> = {
            let store = self.store.read();
            store.hierarchy().at_level(level).cloned().collect()
        };
        if units.is_empty() {
            return Err(AlignmentError::NoUnits(level.to_string()));
        }

        tracing::info!(
            "Running {} over {} {} units",
            strategy.name(),
            units.len(),
            level
        );
        let outcome = strategy.align(&units, ctx, cancel)?;
        if cancel.is_cancelled() {
            return Err(AlignmentError::Cancelled);
        }

        let mut warnings = Vec::new();
        {
            let mut store = self.store.write();
            for unit in &units {
                store.delete(&unit.id);
            }
            for span in &outcome.synced {
                warnings.extend(store.upsert(
                    &span.unit_id,
                    span.start_s,
                    span.end_s,
                    SyncStatus::Synced,
                ));
            }
            for unit_id in &outcome.skipped {
                warnings.extend(store.mark_skipped(unit_id));
            }
            for span in &outcome.synced {
                for stats in propagate_descendants(&mut store, &span.unit_id) {
                    warnings.extend(stats.warnings);
                }
            }
        }

        let summary = format!(
            "{}: {} synced, {} skipped, {} warnings",
            strategy.name(),
            outcome.synced.len(),
            outcome.skipped.len(),
            warnings.len()
        );
        tracing::info!("{}", summary);

        Ok(AlignmentReport {
            strategy: strategy.name().to_string(),
            synced: outcome.synced.len(),
            skipped: outcome.skipped.len(),
            warnings,
            summary,
        })
    }
}

/// Clears the in-flight flag when the run ends, on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
