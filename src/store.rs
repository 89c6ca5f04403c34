//! Shared playback state
//!
//! The single source of truth for everything the player UI renders.
//! Components mutate it only through the named operations here and observe
//! it through the event bus plus snapshot getters. The media engine remains
//! the ground truth for position and playing state; the copies held here
//! are caches kept honest by engine events and the periodic drift check.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ab_loop::{LoopBound, LoopController, LoopRegion};
use crate::config::PlayerConfig;
use crate::events::{EventBus, PlaybackState, PlayerEvent};
use crate::queue::{PlayQueue, RepeatMode};
use crate::track::{CommentMarker, PlaybackRate, Track};

/// Player surface visibility
///
/// The player can render as a collapsed mini bar or an expanded full
/// surface; both are hidden until a track is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerVisibility {
    pub visible: bool,
    pub full_player: bool,
    pub mini_player: bool,
}

impl PlayerVisibility {
    /// Visibility right after a track is selected: mini bar shown
    pub fn mini() -> Self {
        Self {
            visible: true,
            full_player: false,
            mini_player: true,
        }
    }
}

/// Shared state accessible by all session components
///
/// Uses RwLock fields for concurrent read access with rare writes. Events
/// are emitted only on actual change, so identical repeated inputs signal
/// observers exactly once.
pub struct PlaybackStore {
    /// Current playback state (Playing or Paused)
    playback_state: RwLock<PlaybackState>,

    /// Currently selected track (None until selection, and after close)
    current_track: RwLock<Option<Track>>,

    /// Playhead position cache in seconds
    position: RwLock<f64>,

    /// Duration cache in seconds (0.0 while unknown)
    duration: RwLock<f64>,

    /// Play queue with shuffle/repeat state
    queue: RwLock<PlayQueue>,

    /// A-B loop region and arming state
    loop_ctl: RwLock<LoopController>,

    /// Comment markers for the current track
    comments: RwLock<Vec<CommentMarker>>,

    /// Master volume (0.0-1.0)
    volume: RwLock<f32>,

    /// Mute flag, independent of the volume value
    muted: RwLock<bool>,

    /// Playback rate selection
    rate: RwLock<PlaybackRate>,

    /// Player surface visibility
    visibility: RwLock<PlayerVisibility>,

    /// Times the drift check had to heal the cached playback state
    drift_corrections_total: AtomicU64,

    /// Minimum accepted position delta from engine ticks (seconds)
    position_hysteresis: f64,

    /// Event broadcaster
    events: EventBus,
}

impl PlaybackStore {
    /// Create a new store with the configured defaults
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            playback_state: RwLock::new(PlaybackState::Paused),
            current_track: RwLock::new(None),
            position: RwLock::new(0.0),
            duration: RwLock::new(0.0),
            queue: RwLock::new(PlayQueue::new()),
            loop_ctl: RwLock::new(LoopController::new()),
            comments: RwLock::new(Vec::new()),
            volume: RwLock::new(config.default_volume),
            muted: RwLock::new(false),
            rate: RwLock::new(PlaybackRate::default()),
            visibility: RwLock::new(PlayerVisibility::default()),
            drift_corrections_total: AtomicU64::new(0),
            position_hysteresis: config.position_hysteresis,
            events: EventBus::new(config.event_bus_capacity),
        }
    }

    /// Event bus handle for subscribing observers
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    fn emit(&self, event: PlayerEvent) {
        self.events.emit_lossy(event);
    }

    // ------------------------------------------------------------------
    // Snapshot getters
    // ------------------------------------------------------------------

    pub async fn get_playback_state(&self) -> PlaybackState {
        *self.playback_state.read().await
    }

    pub async fn is_playing(&self) -> bool {
        self.playback_state.read().await.is_playing()
    }

    pub async fn get_current_track(&self) -> Option<Track> {
        self.current_track.read().await.clone()
    }

    pub async fn get_position(&self) -> f64 {
        *self.position.read().await
    }

    pub async fn get_duration(&self) -> f64 {
        *self.duration.read().await
    }

    pub async fn get_queue(&self) -> PlayQueue {
        self.queue.read().await.clone()
    }

    pub async fn get_loop_region(&self) -> LoopRegion {
        self.loop_ctl.read().await.region()
    }

    pub async fn get_loop_arming(&self) -> Option<LoopBound> {
        self.loop_ctl.read().await.arming()
    }

    pub async fn get_comments(&self) -> Vec<CommentMarker> {
        self.comments.read().await.clone()
    }

    pub async fn get_volume(&self) -> f32 {
        *self.volume.read().await
    }

    pub async fn is_muted(&self) -> bool {
        *self.muted.read().await
    }

    pub async fn get_rate(&self) -> PlaybackRate {
        *self.rate.read().await
    }

    pub async fn get_visibility(&self) -> PlayerVisibility {
        *self.visibility.read().await
    }

    /// Total drift-check corrections since startup
    pub fn get_drift_corrections(&self) -> u64 {
        self.drift_corrections_total.load(Ordering::Relaxed)
    }

    /// Count one drift-check correction
    pub fn increment_drift_corrections(&self) {
        self.drift_corrections_total.fetch_add(1, Ordering::Relaxed);
    }

    // ------------------------------------------------------------------
    // Track and queue mutations
    // ------------------------------------------------------------------

    /// Select a track for review.
    ///
    /// Replaces the current track wholesale and resets the position and
    /// duration caches to it. A supplied non-empty queue replaces the queue
    /// and position (clamped into range); an empty or absent queue leaves
    /// the existing queue alone, re-pointing its position at the selected
    /// track when present. Selecting a track always reveals the mini
    /// player.
    pub async fn set_track(&self, track: Track, queue: Option<Vec<Track>>, queue_position: usize) {
        let now = chrono::Utc::now();

        {
            let mut current = self.current_track.write().await;
            *current = Some(track.clone());
        }
        *self.position.write().await = 0.0;
        *self.duration.write().await = track.duration.max(0.0);
        self.comments.write().await.clear();

        let queue_event = {
            let mut q = self.queue.write().await;
            match queue {
                Some(tracks) if !tracks.is_empty() => {
                    q.replace(tracks, queue_position);
                    true
                }
                _ => {
                    // Keep the queue; line its position up with the
                    // selection when the track is in it
                    match q.entries().iter().position(|t| t.id == track.id) {
                        Some(index) => q.jump_to(index),
                        None => false,
                    }
                }
            }
            .then(|| PlayerEvent::QueueChanged {
                queue: q.ids(),
                position: q.position(),
                timestamp: now,
            })
        };

        self.emit(PlayerEvent::TrackChanged {
            track: Some(track),
            timestamp: now,
        });
        if let Some(event) = queue_event {
            self.emit(event);
        }
        self.set_visibility(PlayerVisibility::mini()).await;
    }

    /// Advance to the next queue entry.
    ///
    /// Returns the new current track, or `None` at the queue boundary
    /// (repeat-all wraps; repeat-one only affects automatic completion).
    pub async fn next_track(&self) -> Option<Track> {
        let (track, ids, position) = {
            let mut q = self.queue.write().await;
            let track = q.advance()?;
            (track, q.ids(), q.position())
        };
        self.switch_to(track.clone(), ids, position).await;
        Some(track)
    }

    /// Retreat to the previous queue entry; mirror of `next_track`
    pub async fn previous_track(&self) -> Option<Track> {
        let (track, ids, position) = {
            let mut q = self.queue.write().await;
            let track = q.retreat()?;
            (track, q.ids(), q.position())
        };
        self.switch_to(track.clone(), ids, position).await;
        Some(track)
    }

    async fn switch_to(&self, track: Track, ids: Vec<Uuid>, position: usize) {
        let now = chrono::Utc::now();
        *self.current_track.write().await = Some(track.clone());
        *self.position.write().await = 0.0;
        *self.duration.write().await = track.duration.max(0.0);
        self.comments.write().await.clear();

        self.emit(PlayerEvent::TrackChanged {
            track: Some(track),
            timestamp: now,
        });
        self.emit(PlayerEvent::QueueChanged {
            queue: ids,
            position,
            timestamp: now,
        });
    }

    /// Move a queue entry; the playing track keeps playing.
    ///
    /// Returns whether anything moved.
    pub async fn reorder_queue(&self, old_index: usize, new_index: usize) -> bool {
        let mut q = self.queue.write().await;
        if !q.reorder(old_index, new_index) {
            return false;
        }
        self.emit(PlayerEvent::QueueChanged {
            queue: q.ids(),
            position: q.position(),
            timestamp: chrono::Utc::now(),
        });
        true
    }

    /// Remove a queue entry, returning it
    pub async fn remove_queue_entry(&self, index: usize) -> Option<Track> {
        let mut q = self.queue.write().await;
        let removed = q.remove(index)?;
        self.emit(PlayerEvent::QueueChanged {
            queue: q.ids(),
            position: q.position(),
            timestamp: chrono::Utc::now(),
        });
        Some(removed)
    }

    /// Toggle shuffle, returning the new flag
    pub async fn toggle_shuffle(&self) -> bool {
        let now = chrono::Utc::now();
        let mut q = self.queue.write().await;
        let shuffled = q.toggle_shuffle();
        self.emit(PlayerEvent::ShuffleChanged {
            shuffled,
            timestamp: now,
        });
        self.emit(PlayerEvent::QueueChanged {
            queue: q.ids(),
            position: q.position(),
            timestamp: now,
        });
        shuffled
    }

    /// Cycle the repeat mode, returning the new mode
    pub async fn cycle_repeat(&self) -> RepeatMode {
        let mode = self.queue.write().await.cycle_repeat();
        self.emit(PlayerEvent::RepeatChanged {
            mode,
            timestamp: chrono::Utc::now(),
        });
        mode
    }

    // ------------------------------------------------------------------
    // Playback state and position
    // ------------------------------------------------------------------

    /// Set the playing/paused cache, returning whether it changed
    pub async fn set_playing(&self, playing: bool) -> bool {
        let new_state = PlaybackState::from_playing(playing);
        let mut state = self.playback_state.write().await;
        let old_state = *state;
        if old_state == new_state {
            return false;
        }
        *state = new_state;
        self.emit(PlayerEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        });
        true
    }

    /// Accept an engine position tick, subject to hysteresis.
    ///
    /// Movements at or below the threshold are dropped so sub-second jitter
    /// does not churn observers; repeated identical inputs therefore signal
    /// exactly once. Returns whether the tick was accepted.
    pub async fn update_position(&self, position: f64) -> bool {
        if !position.is_finite() {
            return false;
        }
        let mut current = self.position.write().await;
        if (position - *current).abs() <= self.position_hysteresis {
            return false;
        }
        *current = position;
        self.emit(PlayerEvent::PositionChanged {
            position,
            timestamp: chrono::Utc::now(),
        });
        true
    }

    /// Set the position cache directly, bypassing hysteresis.
    ///
    /// The path for seeks, completion pinning, and rehydration, where the
    /// new value is authoritative no matter how close it is.
    pub async fn set_position(&self, position: f64) {
        if !position.is_finite() {
            return;
        }
        let mut current = self.position.write().await;
        if *current == position {
            return;
        }
        *current = position;
        self.emit(PlayerEvent::PositionChanged {
            position,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Set the duration cache, emitting on change
    pub async fn set_duration(&self, duration: f64) {
        if !duration.is_finite() || duration < 0.0 {
            return;
        }
        let mut current = self.duration.write().await;
        if *current == duration {
            return;
        }
        *current = duration;
        self.emit(PlayerEvent::DurationChanged {
            duration,
            timestamp: chrono::Utc::now(),
        });
    }

    // ------------------------------------------------------------------
    // Volume, mute, rate
    // ------------------------------------------------------------------

    /// Set master volume, clamped to 0.0-1.0
    pub async fn set_volume(&self, volume: f32) {
        let new_volume = volume.clamp(0.0, 1.0);
        let mut current = self.volume.write().await;
        let old_volume = *current;
        if old_volume == new_volume {
            return;
        }
        *current = new_volume;
        self.emit(PlayerEvent::VolumeChanged {
            old_volume,
            new_volume,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Toggle mute, returning the new flag
    pub async fn toggle_mute(&self) -> bool {
        let mut muted = self.muted.write().await;
        *muted = !*muted;
        let new = *muted;
        self.emit(PlayerEvent::MuteChanged {
            muted: new,
            timestamp: chrono::Utc::now(),
        });
        new
    }

    /// Set mute directly (rehydration path), emitting on change
    pub async fn set_muted(&self, value: bool) {
        let mut muted = self.muted.write().await;
        if *muted == value {
            return;
        }
        *muted = value;
        self.emit(PlayerEvent::MuteChanged {
            muted: value,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Set the playback rate, emitting on change
    pub async fn set_rate(&self, rate: PlaybackRate) {
        let mut current = self.rate.write().await;
        if *current == rate {
            return;
        }
        *current = rate;
        self.emit(PlayerEvent::RateChanged {
            rate,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Cycle to the next playback rate, returning it
    pub async fn cycle_rate(&self) -> PlaybackRate {
        let mut current = self.rate.write().await;
        let rate = current.cycle();
        *current = rate;
        self.emit(PlayerEvent::RateChanged {
            rate,
            timestamp: chrono::Utc::now(),
        });
        rate
    }

    // ------------------------------------------------------------------
    // A-B loop
    // ------------------------------------------------------------------

    /// Arm or disarm a loop boundary button
    pub async fn loop_arm(&self, bound: LoopBound) {
        self.loop_ctl.write().await.arm(bound);
    }

    /// Feed a waveform click to the loop controller.
    ///
    /// Returns whether the click was consumed as a boundary set; an
    /// unconsumed click is an ordinary seek for the caller to handle.
    pub async fn loop_click(&self, time: f64) -> bool {
        let mut ctl = self.loop_ctl.write().await;
        let before = ctl.region();
        let consumed = ctl.apply_click(time);
        if consumed && ctl.region() != before {
            self.emit(PlayerEvent::LoopChanged {
                region: ctl.region(),
                timestamp: chrono::Utc::now(),
            });
        }
        consumed
    }

    /// Set a loop boundary directly
    pub async fn loop_set_bound(&self, bound: LoopBound, time: f64) {
        let mut ctl = self.loop_ctl.write().await;
        let before = ctl.region();
        ctl.set_bound(bound, time);
        if ctl.region() != before {
            self.emit(PlayerEvent::LoopChanged {
                region: ctl.region(),
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Toggle loop enforcement, returning the resulting flag
    pub async fn loop_toggle(&self) -> bool {
        let mut ctl = self.loop_ctl.write().await;
        let before = ctl.is_enabled();
        let enabled = ctl.toggle();
        if enabled != before {
            self.emit(PlayerEvent::LoopChanged {
                region: ctl.region(),
                timestamp: chrono::Utc::now(),
            });
        }
        enabled
    }

    /// Clear the loop region
    pub async fn loop_clear(&self) {
        let mut ctl = self.loop_ctl.write().await;
        if ctl.region() == LoopRegion::default() {
            return;
        }
        ctl.clear();
        self.emit(PlayerEvent::LoopChanged {
            region: ctl.region(),
            timestamp: chrono::Utc::now(),
        });
    }

    /// Per-tick loop enforcement check; `Some(start)` means rewind
    pub async fn loop_check(&self, position: f64) -> Option<f64> {
        self.loop_ctl.read().await.check(position)
    }

    // ------------------------------------------------------------------
    // Comments and visibility
    // ------------------------------------------------------------------

    /// Replace the comment marker set for a track.
    ///
    /// Markers for a track other than the current one are stale deliveries
    /// and are dropped.
    pub async fn set_comments(&self, track_id: Uuid, markers: Vec<CommentMarker>) {
        let current_id = self.current_track.read().await.as_ref().map(|t| t.id);
        if current_id != Some(track_id) {
            debug!(
                "dropping comment markers for {} (current track is {:?})",
                track_id, current_id
            );
            return;
        }
        *self.comments.write().await = markers.clone();
        self.emit(PlayerEvent::CommentsChanged {
            track_id,
            markers,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Set the player surface visibility, emitting on change
    pub async fn set_visibility(&self, visibility: PlayerVisibility) {
        let mut current = self.visibility.write().await;
        if *current == visibility {
            return;
        }
        *current = visibility;
        self.emit(PlayerEvent::VisibilityChanged {
            visible: visibility.visible,
            full_player: visibility.full_player,
            mini_player: visibility.mini_player,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Swap between the full surface and the mini bar
    pub async fn toggle_full_player(&self) {
        let current = *self.visibility.read().await;
        if !current.visible {
            warn!("full player toggle with no track selected, ignoring");
            return;
        }
        self.set_visibility(PlayerVisibility {
            visible: true,
            full_player: !current.full_player,
            mini_player: current.full_player,
        })
        .await;
    }

    /// Close the player: clear track, queue, loop, and comments, pause,
    /// and hide the surface. Volume, mute, rate, and repeat survive for
    /// the next selection.
    pub async fn close(&self) {
        let now = chrono::Utc::now();

        self.set_playing(false).await;

        let had_track = self.current_track.write().await.take().is_some();
        *self.position.write().await = 0.0;
        *self.duration.write().await = 0.0;
        self.comments.write().await.clear();

        {
            let mut q = self.queue.write().await;
            if !q.is_empty() {
                q.clear();
                self.emit(PlayerEvent::QueueChanged {
                    queue: Vec::new(),
                    position: 0,
                    timestamp: now,
                });
            }
        }
        self.loop_clear().await;

        if had_track {
            self.emit(PlayerEvent::TrackChanged {
                track: None,
                timestamp: now,
            });
        }
        self.set_visibility(PlayerVisibility::default()).await;
    }
}
