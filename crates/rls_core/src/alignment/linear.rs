//! Linear character-proportional spread.
//!
//! Deterministic fallback when forced alignment is unavailable: the spread
//! window (default: the full track) is divided across all units
//! proportional to trimmed character count, the same subdivision formula
//! the propagation engine applies below a parent.

use crate::models::SyncUnit;
use crate::propagation::round_ms;

use super::types::{
    AlignedSpan, AlignmentContext, AlignmentError, AlignmentOutcome, CancelHandle,
};
use super::AlignmentStrategy;

/// Character-proportional spread strategy.
pub struct LinearSpread;

impl AlignmentStrategy for LinearSpread {
    fn name(&self) -> &'static str {
        "linear-spread"
    }

    fn align(
        &self,
        units: &[SyncUnit],
        ctx: &AlignmentContext,
        cancel: &CancelHandle,
    ) -> Result<AlignmentOutcome, AlignmentError> {
        if units.is_empty() {
            return Ok(AlignmentOutcome::default());
        }
        let (window_start, window_end) = ctx.window.unwrap_or((0.0, ctx.audio.duration_s));
        let span_s = window_end - window_start;
        if span_s <= 0.0 {
            return Err(AlignmentError::EmptyWindow);
        }

        let weights: Vec<usize> = units.iter().map(|u| u.weight()).collect();
        let total: usize = weights.iter().sum();

        let mut outcome = AlignmentOutcome::default();
        let mut running_s = window_start;
        let last = units.len() - 1;
        for (i, (unit, weight)) in units.iter().zip(&weights).enumerate() {
            if cancel.is_cancelled() {
                return Err(AlignmentError::Cancelled);
            }
            let duration_s = span_s * (*weight as f64) / (total as f64);
            let start_s = running_s;
            let end_s = if i == last {
                window_end
            } else {
                round_ms(start_s + duration_s)
            };
            outcome.synced.push(AlignedSpan {
                unit_id: unit.id.clone(),
                start_s,
                end_s,
            });
            running_s = end_s;
        }

        tracing::debug!(
            "Linear spread: {} units over [{:.3}, {:.3}]",
            outcome.synced.len(),
            window_start,
            window_end
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioTrackRef;
    use crate::models::UnitLevel;

    fn make_units(texts: &[&str]) -> Vec<SyncUnit> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                SyncUnit::new(format!("s{}", i + 1), UnitLevel::Sentence, None, *text, 1)
            })
            .collect()
    }

    fn ctx(duration_s: f64) -> AlignmentContext {
        AlignmentContext::full_track(AudioTrackRef::new("narration.wav", duration_s), "en")
    }

    #[test]
    fn spreads_proportionally_to_char_count() {
        // 2 and 5 chars over 7 seconds.
        let units = make_units(&["Hi", "there"]);
        let outcome = LinearSpread
            .align(&units, &ctx(7.0), &CancelHandle::new())
            .unwrap();

        assert_eq!(outcome.synced.len(), 2);
        assert!(outcome.skipped.is_empty());
        assert!((outcome.synced[0].start_s - 0.0).abs() < 1e-9);
        assert!((outcome.synced[0].end_s - 2.0).abs() < 1e-9);
        assert!((outcome.synced[1].start_s - 2.0).abs() < 1e-9);
        assert!((outcome.synced[1].end_s - 7.0).abs() < 1e-9);
    }

    #[test]
    fn bounded_window_is_respected() {
        let units = make_units(&["aa", "bb"]);
        let context = ctx(100.0).with_window(10.0, 20.0);
        let outcome = LinearSpread
            .align(&units, &context, &CancelHandle::new())
            .unwrap();

        assert!((outcome.synced[0].start_s - 10.0).abs() < 1e-9);
        assert!((outcome.synced[0].end_s - 15.0).abs() < 1e-9);
        assert!((outcome.synced[1].end_s - 20.0).abs() < 1e-9);
    }

    #[test]
    fn spans_cover_the_window_contiguously() {
        let units = make_units(&["one", "couple", "a much longer sentence", "x"]);
        let outcome = LinearSpread
            .align(&units, &ctx(33.33), &CancelHandle::new())
            .unwrap();

        for pair in outcome.synced.windows(2) {
            assert!((pair[0].end_s - pair[1].start_s).abs() < 1e-9);
        }
        assert!((outcome.synced.last().unwrap().end_s - 33.33).abs() < 1e-9);
    }

    #[test]
    fn empty_window_is_an_error() {
        let units = make_units(&["a"]);
        assert!(matches!(
            LinearSpread.align(&units, &ctx(0.0), &CancelHandle::new()),
            Err(AlignmentError::EmptyWindow)
        ));
    }

    #[test]
    fn cancellation_stops_the_spread() {
        let units = make_units(&["a", "b"]);
        let cancel = CancelHandle::new();
        cancel.cancel();
        assert!(matches!(
            LinearSpread.align(&units, &ctx(10.0), &cancel),
            Err(AlignmentError::Cancelled)
        ));
    }
}
