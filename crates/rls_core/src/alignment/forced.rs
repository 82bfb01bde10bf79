//! Forced phoneme alignment over an external service.

use std::collections::HashSet;
use std::sync::Arc;

use crate::models::SyncUnit;

use super::types::{
    AlignedSpan, AlignmentContext, AlignmentError, AlignmentOutcome, AlignmentService,
    CancelHandle,
};
use super::AlignmentStrategy;

/// Strategy delegating to a phoneme-alignment service.
///
/// Units matched in the returned transcript become synced; units present in
/// the document but absent from the transcript become skipped rather than
/// force-fit. Skipping is what prevents one missing unit (a TOC entry read
/// by no narrator) from shifting every later timestamp.
pub struct ForcedAligner {
    service: Arc<dyn AlignmentService>,
}

impl ForcedAligner {
    /// Create an aligner over a service implementation.
    pub fn new(service: Arc<dyn AlignmentService>) -> Self {
        Self { service }
    }
}

impl AlignmentStrategy for ForcedAligner {
    fn name(&self) -> &'static str {
        "forced-alignment"
    }

    fn align(
        &self,
        units: &[SyncUnit],
        ctx: &AlignmentContext,
        cancel: &CancelHandle,
    ) -> Result<AlignmentOutcome, AlignmentError> {
        if cancel.is_cancelled() {
            return Err(AlignmentError::Cancelled);
        }

        let segments = self.service.align(units, &ctx.audio, &ctx.language)?;

        if cancel.is_cancelled() {
            return Err(AlignmentError::Cancelled);
        }

        let requested: HashSet<&str> = units.iter().map(|u| u.id.as_str()).collect();
        let mut outcome = AlignmentOutcome::default();
        let mut matched: HashSet<String> = HashSet::new();

        for segment in segments {
            if !requested.contains(segment.unit_id.as_str()) {
                tracing::warn!(
                    "Service returned segment for unknown unit '{}'; dropped",
                    segment.unit_id
                );
                continue;
            }
            matched.insert(segment.unit_id.clone());
            outcome.synced.push(AlignedSpan {
                unit_id: segment.unit_id,
                start_s: segment.start_s,
                end_s: segment.end_s,
            });
        }

        for unit in units {
            if !matched.contains(&unit.id) {
                outcome.skipped.push(unit.id.clone());
            }
        }

        tracing::info!(
            "Forced alignment matched {} of {} units ({} skipped)",
            outcome.synced.len(),
            units.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioTrackRef;
    use crate::models::UnitLevel;

    use super::super::types::TranscriptSegment;

    struct FakeService {
        segments: Vec<TranscriptSegment>,
    }

    impl AlignmentService for FakeService {
        fn align(
            &self,
            _units: &[SyncUnit],
            _audio: &AudioTrackRef,
            _language: &str,
        ) -> Result<Vec<TranscriptSegment>, AlignmentError> {
            Ok(self.segments.clone())
        }
    }

    struct FailingService;

    impl AlignmentService for FailingService {
        fn align(
            &self,
            _units: &[SyncUnit],
            _audio: &AudioTrackRef,
            _language: &str,
        ) -> Result<Vec<TranscriptSegment>, AlignmentError> {
            Err(AlignmentError::Service("connection reset".into()))
        }
    }

    fn make_units() -> Vec<SyncUnit> {
        vec![
            SyncUnit::new("s1", UnitLevel::Sentence, None, "One.", 1),
            SyncUnit::new("s2", UnitLevel::Sentence, None, "Contents", 1),
            SyncUnit::new("s3", UnitLevel::Sentence, None, "Three.", 1),
        ]
    }

    fn ctx() -> AlignmentContext {
        AlignmentContext::full_track(AudioTrackRef::new("narration.wav", 30.0), "en")
    }

    fn segment(unit_id: &str, start_s: f64, end_s: f64) -> TranscriptSegment {
        TranscriptSegment {
            unit_id: unit_id.to_string(),
            start_s,
            end_s,
        }
    }

    #[test]
    fn unmatched_units_are_skipped_not_force_fit() {
        let service = Arc::new(FakeService {
            segments: vec![segment("s1", 0.0, 2.0), segment("s3", 2.5, 4.0)],
        });
        let outcome = ForcedAligner::new(service)
            .align(&make_units(), &ctx(), &CancelHandle::new())
            .unwrap();

        assert_eq!(outcome.synced.len(), 2);
        assert_eq!(outcome.skipped, vec!["s2".to_string()]);
    }

    #[test]
    fn unknown_segment_ids_are_dropped() {
        let service = Arc::new(FakeService {
            segments: vec![segment("s1", 0.0, 2.0), segment("ghost", 2.0, 3.0)],
        });
        let outcome = ForcedAligner::new(service)
            .align(&make_units(), &ctx(), &CancelHandle::new())
            .unwrap();

        assert_eq!(outcome.synced.len(), 1);
        assert_eq!(outcome.synced[0].unit_id, "s1");
    }

    #[test]
    fn service_failure_propagates() {
        let result = ForcedAligner::new(Arc::new(FailingService)).align(
            &make_units(),
            &ctx(),
            &CancelHandle::new(),
        );
        assert!(matches!(result, Err(AlignmentError::Service(_))));
    }

    #[test]
    fn cancellation_short_circuits() {
        let cancel = CancelHandle::new();
        cancel.cancel();
        let result =
            ForcedAligner::new(Arc::new(FailingService)).align(&make_units(), &ctx(), &cancel);
        assert!(matches!(result, Err(AlignmentError::Cancelled)));
    }
}
