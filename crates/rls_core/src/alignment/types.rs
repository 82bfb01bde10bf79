//! Alignment strategy contract types.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::audio::AudioTrackRef;
use crate::models::SyncUnit;

/// One unit matched to an interval by a strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSpan {
    pub unit_id: String,
    pub start_s: f64,
    pub end_s: f64,
}

/// Normalized output of an alignment strategy.
///
/// Units absent from `synced` and listed in `skipped` were judged absent
/// from the audio (TOC entries, headers) and must not be force-fit;
/// force-fitting one missing unit shifts every later timestamp.
#[derive(Debug, Clone, Default)]
pub struct AlignmentOutcome {
    /// Matched units with intervals.
    pub synced: Vec<AlignedSpan>,
    /// Units judged absent from the audio.
    pub skipped: Vec<String>,
}

/// Input context shared by all strategies.
#[derive(Debug, Clone)]
pub struct AlignmentContext {
    /// The narration track being aligned against.
    pub audio: AudioTrackRef,
    /// Language hint for the external service.
    pub language: String,
    /// Optional `[start, end]` window to spread across (linear strategy);
    /// `None` means the full track duration.
    pub window: Option<(f64, f64)>,
}

impl AlignmentContext {
    /// Context over the full track.
    pub fn full_track(audio: AudioTrackRef, language: impl Into<String>) -> Self {
        Self {
            audio,
            language: language.into(),
            window: None,
        }
    }

    /// Restrict the spread window.
    pub fn with_window(mut self, start_s: f64, end_s: f64) -> Self {
        self.window = Some((start_s, end_s));
        self
    }
}

/// A segment of the transcript returned by the external service, matched to
/// a requested unit id.
#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    pub unit_id: String,
    pub start_s: f64,
    pub end_s: f64,
}

/// External phoneme-alignment service.
///
/// The service receives the requested units and the audio resource and
/// returns transcript segments for the units it could match. The engine
/// never talks to the network itself.
pub trait AlignmentService: Send + Sync {
    /// Align units against the audio, returning matched segments.
    fn align(
        &self,
        units: &[SyncUnit],
        audio: &AudioTrackRef,
        language: &str,
    ) -> Result<Vec<TranscriptSegment>, AlignmentError>;
}

/// Alignment failures. All of them leave the Timing Store untouched.
#[derive(Debug, thiserror::Error)]
pub enum AlignmentError {
    /// The external service failed or timed out; retryable.
    #[error("Alignment service failed: {0}")]
    Service(String),

    /// The run was cancelled before commit.
    #[error("Alignment run was cancelled")]
    Cancelled,

    /// Another run is already in flight for this store.
    #[error("An alignment run is already in progress")]
    AlreadyRunning,

    /// Nothing to align at the requested level.
    #[error("No units to align at level '{0}'")]
    NoUnits(String),

    /// The audio track or spread window has no usable duration.
    #[error("Audio window has no usable duration")]
    EmptyWindow,
}

/// Handle for cancelling an in-flight alignment run.
///
/// Strategies poll it between units; the adapter checks it once more before
/// committing, so a cancelled run never partially overwrites the store.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a fresh, uncancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
