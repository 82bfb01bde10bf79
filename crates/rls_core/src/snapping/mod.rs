//! Silence snapping.
//!
//! Adjusts a candidate boundary time to a local amplitude minimum so manual
//! marks and drag edges land in the gaps between words rather than mid-
//! phoneme. This is a local, single-pass scan over one window of samples,
//! not global silence detection; it is cheap enough to run on every
//! drag-end and mark gesture.

use crate::audio::AudioBuffer;
use crate::config::SnapSettings;

/// Parameters for one snap operation.
#[derive(Debug, Clone, Copy)]
pub struct SnapConfig {
    /// Search window on each side of the target, in milliseconds.
    pub window_ms: u32,
    /// A minimum only counts as silence below this absolute amplitude
    /// (on the [-1, 1] normalized scale).
    pub amplitude_threshold: f32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            window_ms: 100,
            amplitude_threshold: 0.1,
        }
    }
}

impl From<&SnapSettings> for SnapConfig {
    fn from(settings: &SnapSettings) -> Self {
        Self {
            window_ms: settings.window_ms,
            amplitude_threshold: settings.amplitude_threshold,
        }
    }
}

/// Result of a snap operation.
#[derive(Debug, Clone, Copy)]
pub struct SnapOutcome {
    /// Adjusted time (equal to the input when nothing qualified).
    pub time_s: f64,
    /// Whether the time was moved.
    pub snapped: bool,
    /// Quietest absolute amplitude seen in the window, if any samples were
    /// examined.
    pub min_amplitude: Option<f32>,
}

impl SnapOutcome {
    fn unchanged(time_s: f64) -> Self {
        Self {
            time_s,
            snapped: false,
            min_amplitude: None,
        }
    }
}

/// Snap a time to the quietest sample in the surrounding window.
///
/// Returns the original time unchanged when the buffer is empty, the window
/// falls outside the buffer, or the quietest sample is not below the
/// threshold. The adjustment is bounded: `|snap(t) - t| <= window_ms / 1000`.
pub fn snap_to_silence(buffer: &AudioBuffer, target_s: f64, config: &SnapConfig) -> SnapOutcome {
    if buffer.is_empty() || target_s < 0.0 || target_s > buffer.duration_s() {
        return SnapOutcome::unchanged(target_s);
    }

    let window_s = config.window_ms as f64 / 1000.0;
    let lo = buffer.index_at(target_s - window_s);
    let hi = buffer.index_at(target_s + window_s);
    if lo > hi {
        return SnapOutcome::unchanged(target_s);
    }

    let mut min_idx = lo;
    let mut min_amp = buffer.samples[lo].abs();
    for idx in lo..=hi {
        let amp = buffer.samples[idx].abs();
        if amp < min_amp {
            min_amp = amp;
            min_idx = idx;
        }
    }

    if min_amp >= config.amplitude_threshold {
        return SnapOutcome {
            min_amplitude: Some(min_amp),
            ..SnapOutcome::unchanged(target_s)
        };
    }

    let snapped_s = buffer.time_at(min_idx);
    tracing::trace!(
        "Snapped {:.3}s -> {:.3}s (min amplitude {:.3})",
        target_s,
        snapped_s,
        min_amp
    );
    SnapOutcome {
        time_s: snapped_s,
        snapped: (snapped_s - target_s).abs() > f64::EPSILON,
        min_amplitude: Some(min_amp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1 kHz buffer, loud everywhere except a dip at a known index.
    fn buffer_with_dip(dip_idx: usize, dip_amp: f32) -> AudioBuffer {
        let mut samples = vec![0.5f32; 3000];
        samples[dip_idx] = dip_amp;
        AudioBuffer::new(1000, samples)
    }

    #[test]
    fn snaps_to_quiet_sample_in_window() {
        let buffer = buffer_with_dip(1060, 0.01);
        let outcome = snap_to_silence(&buffer, 1.0, &SnapConfig::default());
        assert!(outcome.snapped);
        assert!((outcome.time_s - 1.06).abs() < 1e-9);
    }

    #[test]
    fn loud_window_leaves_time_unchanged() {
        let buffer = AudioBuffer::new(1000, vec![0.5f32; 3000]);
        let outcome = snap_to_silence(&buffer, 1.0, &SnapConfig::default());
        assert!(!outcome.snapped);
        assert!((outcome.time_s - 1.0).abs() < 1e-9);
        assert!((outcome.min_amplitude.unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn dip_outside_window_is_ignored() {
        let buffer = buffer_with_dip(1500, 0.0);
        let outcome = snap_to_silence(&buffer, 1.0, &SnapConfig::default());
        assert!(!outcome.snapped);
        assert!((outcome.time_s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn adjustment_is_bounded_by_window() {
        let config = SnapConfig::default();
        let window_s = config.window_ms as f64 / 1000.0;
        for dip in [900usize, 950, 1000, 1099] {
            let buffer = buffer_with_dip(dip, 0.0);
            let outcome = snap_to_silence(&buffer, 1.0, &config);
            assert!(
                (outcome.time_s - 1.0).abs() <= window_s + 1e-9,
                "dip at {} moved target by more than the window",
                dip
            );
        }
    }

    #[test]
    fn empty_buffer_and_out_of_range_are_noops() {
        let empty = AudioBuffer::new(1000, Vec::new());
        assert!(!snap_to_silence(&empty, 1.0, &SnapConfig::default()).snapped);

        let buffer = buffer_with_dip(10, 0.0);
        let outcome = snap_to_silence(&buffer, 50.0, &SnapConfig::default());
        assert!(!outcome.snapped);
        assert!((outcome.time_s - 50.0).abs() < 1e-9);
    }
}
