//! Audio-side collaborator types.
//!
//! The engine never decodes audio itself. A decoder hands it an
//! `AudioBuffer` (sample rate plus mono amplitude samples on a [-1, 1]
//! scale) for silence snapping, and an `AudioTransport` implementation for
//! playback control. The transport is the only concurrently-advancing
//! resource in the system; the engine samples it as an external clock and
//! mutates it only through explicit commands.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

/// Decoded amplitude buffer for one audio resource.
#[derive(Debug, Clone, Default)]
pub struct AudioBuffer {
    /// Samples per second.
    pub sample_rate: u32,
    /// Mono amplitude samples, normalized to [-1, 1].
    pub samples: Vec<f32>,
}

impl AudioBuffer {
    /// Create a buffer from mono samples.
    pub fn new(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            sample_rate,
            samples,
        }
    }

    /// Mix per-channel buffers (as returned by a decoder) down to mono by
    /// averaging.
    pub fn mono_from_channels(sample_rate: u32, channels: &[Vec<f32>]) -> Self {
        if channels.is_empty() {
            return Self::new(sample_rate, Vec::new());
        }
        let len = channels.iter().map(|c| c.len()).min().unwrap_or(0);
        let n = channels.len() as f32;
        let samples = (0..len)
            .map(|i| channels.iter().map(|c| c[i]).sum::<f32>() / n)
            .collect();
        Self::new(sample_rate, samples)
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() || self.sample_rate == 0
    }

    /// Total duration in seconds.
    pub fn duration_s(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample index for a time, clamped to the buffer.
    pub fn index_at(&self, time_s: f64) -> usize {
        let idx = (time_s.max(0.0) * self.sample_rate as f64) as usize;
        idx.min(self.samples.len().saturating_sub(1))
    }

    /// Time in seconds for a sample index.
    pub fn time_at(&self, index: usize) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        index as f64 / self.sample_rate as f64
    }
}

/// Reference to the audio resource behind a document's narration.
///
/// Carries what the alignment strategies need without pulling decoded
/// samples through the adapter: the file handed to an external service, and
/// the total duration used as the default spread window.
#[derive(Debug, Clone)]
pub struct AudioTrackRef {
    /// Path to the audio file.
    pub path: PathBuf,
    /// Total duration in seconds.
    pub duration_s: f64,
}

impl AudioTrackRef {
    /// Create a track reference.
    pub fn new(path: impl Into<PathBuf>, duration_s: f64) -> Self {
        Self {
            path: path.into(),
            duration_s,
        }
    }
}

/// Playback transport for the loaded audio.
///
/// Injected into the Region Session; the session samples `current_time` on
/// mark gestures and issues explicit commands, nothing else.
pub trait AudioTransport: Send {
    /// Begin or resume playback.
    fn play(&mut self);
    /// Pause playback.
    fn pause(&mut self);
    /// Seek to an absolute position in seconds.
    fn seek(&mut self, time_s: f64);
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;
    /// Whether the transport is currently playing.
    fn is_playing(&self) -> bool;
}

/// Shared transport handle.
pub type SharedTransport = Arc<Mutex<dyn AudioTransport>>;

/// Transport implementation with a manually driven clock.
///
/// Used headless and in tests, where no real audio backend is attached.
#[derive(Debug, Default)]
pub struct ManualTransport {
    position_s: f64,
    playing: bool,
}

impl ManualTransport {
    /// Create a stopped transport at position zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock to an absolute position.
    pub fn set_time(&mut self, time_s: f64) {
        self.position_s = time_s.max(0.0);
    }
}

impl AudioTransport for ManualTransport {
    fn play(&mut self) {
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, time_s: f64) {
        self.position_s = time_s.max(0.0);
    }

    fn current_time(&self) -> f64 {
        self.position_s
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

/// Wrap a transport in the shared handle type.
pub fn shared_transport<T: AudioTransport + 'static>(transport: T) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}
