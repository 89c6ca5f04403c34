//! Media engine boundary
//!
//! The engine is whatever actually decodes and plays audio for the embedder
//! (a media element binding, a native decoder, a test double). The
//! controller drives it through the `MediaEngine` trait and receives its
//! callbacks as `EngineEvent` values on an mpsc channel owned by the
//! session.

mod adapter;

pub use adapter::{EngineAdapter, EngineOutcome};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::track::{Track, WaveformPeaks};

/// Contract the embedder's media engine implements
///
/// Seek positions cross this boundary as a normalized fraction of the
/// duration in [0, 1]; the adapter owns the seconds-to-fraction conversion
/// so engines never see absolute times they would have to re-derive.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Load a track's audio, decoding its waveform as a side effect.
    /// Completion is signaled by `EngineEvent::Ready`.
    async fn load(&self, track: &Track) -> Result<()>;

    /// Render pre-decoded waveform peaks without touching the audio path
    async fn render_peaks(&self, peaks: &WaveformPeaks) -> Result<()>;

    /// Start playback. An `Err` here is a playback rejection (autoplay
    /// policy, device unavailable) and is handled silently by the adapter.
    async fn play(&self) -> Result<()>;

    /// Pause playback
    async fn pause(&self) -> Result<()>;

    /// Seek to a normalized fraction of the duration in [0, 1]
    async fn seek(&self, fraction: f64) -> Result<()>;

    /// Ground truth: whether audio is actually running
    async fn is_playing(&self) -> Result<bool>;

    /// Ground truth: current playhead in seconds
    async fn current_time(&self) -> Result<f64>;

    /// Duration in seconds, `None` while the engine does not know it
    async fn duration(&self) -> Result<Option<f64>>;
}

/// Callbacks from the engine, delivered on the session's event channel
///
/// Internal protocol between the embedder's engine binding and the
/// adapter; these are folded into store state and re-broadcast as
/// `PlayerEvent`s, never exposed directly.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Audio is decoded and playable; duration as reported by the engine,
    /// `None` when it cannot tell (streamed sources)
    Ready { duration: Option<f64> },

    /// Playback actually started
    Playing,

    /// Playback actually paused
    Paused,

    /// Periodic playhead progress (seconds)
    Tick { position: f64 },

    /// Track played to its end
    Finished,

    /// Engine-side failure (decode error, network stall)
    Error { message: String },
}

/// Sender half handed to the embedder's engine binding
pub type EngineEventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiver half consumed by the session's engine pump
pub type EngineEventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create the engine event channel pair
pub fn engine_event_channel() -> (EngineEventSender, EngineEventReceiver) {
    mpsc::unbounded_channel()
}

/// Load progress of the current track through the two-phase load
///
/// With cached peaks the waveform renders immediately and the audio load
/// is deferred until the first play request; without them the audio load
/// starts right away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing loaded (no track, or a failed load awaiting retry)
    NotLoaded,
    /// Waveform rendered from cached peaks, audio not yet requested
    VisualOnly,
    /// Audio load issued, awaiting the ready callback
    Loading,
    /// Audio decoded and playable
    AudioReady,
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadState::NotLoaded => write!(f, "not_loaded"),
            LoadState::VisualOnly => write!(f, "visual_only"),
            LoadState::Loading => write!(f, "loading"),
            LoadState::AudioReady => write!(f, "audio_ready"),
        }
    }
}

/// Single-slot intent captured while audio is not ready
///
/// Commands arriving before `Ready` overwrite each other (last write wins)
/// and the surviving one is replayed exactly once when audio becomes
/// playable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingCommand {
    Play,
    Pause,
    /// Seek target in seconds
    Seek(f64),
}
