//! Event types for the playback session
//!
//! Provides the controller-wide event union and the EventBus that fans
//! state changes out to UI bindings and other observers.

use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;
use uuid::Uuid;

use crate::ab_loop::LoopRegion;
use crate::queue::RepeatMode;
use crate::track::{CommentMarker, PlaybackRate, Track};

/// Playback state enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        self == PlaybackState::Playing
    }

    pub fn from_playing(playing: bool) -> Self {
        if playing {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Playback session event types
///
/// Events are broadcast via EventBus and can be serialized for delivery to
/// UI bindings. Emitted only on actual state changes, so observers may
/// treat each event as an edge, not a level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Current track replaced (or cleared on close)
    ///
    /// Triggers:
    /// - UI: Rebuild player header, waveform, and comment rail
    /// - Queue panel: Highlight the new current entry
    TrackChanged {
        /// The newly selected track, None when the player was closed
        track: Option<Track>,
        /// When the track changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback state changed (Playing ↔ Paused)
    ///
    /// Triggers:
    /// - UI: Swap play/pause glyph
    /// - Sync bridge: Pause checkpoint
    PlaybackStateChanged {
        /// Playback state before change
        old_state: PlaybackState,
        /// Playback state after change
        new_state: PlaybackState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playhead position moved past the hysteresis threshold
    PositionChanged {
        /// Position in seconds
        position: f64,
        /// When the position was accepted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Track duration became known or was revised
    DurationChanged {
        /// Duration in seconds
        duration: f64,
        /// When the duration changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Queue contents or order changed
    ///
    /// Triggers:
    /// - Queue panel: Re-render entry list
    /// - Sync bridge: Queue-order push
    QueueChanged {
        /// Track ids in visible order
        queue: Vec<Uuid>,
        /// Index of the current track
        position: usize,
        /// When the queue changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Shuffle toggled
    ShuffleChanged {
        shuffled: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Repeat mode cycled
    RepeatChanged {
        mode: RepeatMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Volume changed
    ///
    /// Triggers:
    /// - UI: Update volume slider
    /// - Sync bridge: Volume push
    VolumeChanged {
        /// Previous volume (0.0-1.0)
        old_volume: f32,
        /// New volume (0.0-1.0)
        new_volume: f32,
        /// When volume changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Mute toggled
    MuteChanged {
        muted: bool,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback rate changed
    RateChanged {
        rate: PlaybackRate,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Loop region or enablement changed
    LoopChanged {
        region: LoopRegion,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Comment marker set replaced from the server
    CommentsChanged {
        /// Track the markers belong to
        track_id: Uuid,
        /// Refreshed marker set
        markers: Vec<CommentMarker>,
        /// When the markers arrived
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Player surface visibility changed
    VisibilityChanged {
        /// Whether the player is shown at all
        visible: bool,
        /// Expanded full-screen surface
        full_player: bool,
        /// Collapsed mini-player bar
        mini_player: bool,
        /// When visibility changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track played to its end
    ///
    /// Fired before the repeat policy runs, so observers see the completion
    /// even when playback immediately continues.
    TrackCompleted {
        /// Track that finished
        track_id: Uuid,
        /// When playback finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The periodic self-check found the cached playback state disagreeing
    /// with the engine and healed it
    DriftCorrected {
        /// Ground-truth engine state that was adopted
        engine_playing: bool,
        /// When the correction was applied
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_name(&self) -> &'static str {
        match self {
            PlayerEvent::TrackChanged { .. } => "TrackChanged",
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::PositionChanged { .. } => "PositionChanged",
            PlayerEvent::DurationChanged { .. } => "DurationChanged",
            PlayerEvent::QueueChanged { .. } => "QueueChanged",
            PlayerEvent::ShuffleChanged { .. } => "ShuffleChanged",
            PlayerEvent::RepeatChanged { .. } => "RepeatChanged",
            PlayerEvent::VolumeChanged { .. } => "VolumeChanged",
            PlayerEvent::MuteChanged { .. } => "MuteChanged",
            PlayerEvent::RateChanged { .. } => "RateChanged",
            PlayerEvent::LoopChanged { .. } => "LoopChanged",
            PlayerEvent::CommentsChanged { .. } => "CommentsChanged",
            PlayerEvent::VisibilityChanged { .. } => "VisibilityChanged",
            PlayerEvent::TrackCompleted { .. } => "TrackCompleted",
            PlayerEvent::DriftCorrected { .. } => "DriftCorrected",
        }
    }
}

/// Central event distribution bus for session-wide events
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity.
    ///
    /// Capacity bounds how far a slow subscriber may lag before it starts
    /// missing events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscribers are
    /// listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribe as a stream, dropping lagged gaps with a warning.
    ///
    /// Convenient for UI glue that consumes events with stream combinators.
    pub fn stream(&self) -> impl Stream<Item = PlayerEvent> {
        BroadcastStream::new(self.tx.subscribe()).filter_map(|result| async move {
            match result {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("event stream subscriber lagged: {:?}", e);
                    None
                }
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(128)
    }
}
