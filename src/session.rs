//! Player session
//!
//! Wires the store, the engine adapter, and the sync bridge into one
//! controller, exposes the UI-facing control API, and runs the background
//! tasks: the engine event pump, the remote update pump, the drift check
//! interval, and the sync flush interval.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ab_loop::LoopBound;
use crate::bridge::{
    RemoteCommand, RemoteSession, RemoteUpdate, RemoteUpdateReceiver, SyncBridge,
};
use crate::config::PlayerConfig;
use crate::engine::{
    EngineAdapter, EngineEvent, EngineEventReceiver, EngineOutcome, MediaEngine,
};
use crate::error::{Error, Result};
use crate::queue::{DragReorder, RepeatMode};
use crate::store::{PlaybackStore, PlayerVisibility};
use crate::track::{PlaybackRate, Track};

/// The assembled playback session controller
///
/// One per page session. Construct with the embedder's engine and remote
/// bindings, call `start` with the two inbound channels, drive it through
/// the control API, and `shutdown` when the page goes away.
pub struct PlayerSession {
    config: PlayerConfig,
    store: Arc<PlaybackStore>,
    adapter: Arc<EngineAdapter>,
    bridge: Arc<SyncBridge>,

    /// Queue panel drag interaction state
    drag: Mutex<DragReorder>,

    /// Background task handles, drained on shutdown
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,

    /// Stop signal for the background tasks
    stop: watch::Sender<bool>,
}

impl PlayerSession {
    pub fn new(
        config: PlayerConfig,
        engine: Arc<dyn MediaEngine>,
        remote: Arc<dyn RemoteSession>,
    ) -> Arc<Self> {
        let store = Arc::new(PlaybackStore::new(&config));
        let adapter = Arc::new(EngineAdapter::new(engine, store.clone(), &config));
        let bridge = Arc::new(SyncBridge::new(remote, config.sync_queue_capacity));
        let (stop, _) = watch::channel(false);

        Arc::new(Self {
            config,
            store,
            adapter,
            bridge,
            drag: Mutex::new(DragReorder::new()),
            tasks: std::sync::Mutex::new(Vec::new()),
            stop,
        })
    }

    /// Shared state for observers (event subscriptions, snapshot getters)
    pub fn store(&self) -> &Arc<PlaybackStore> {
        &self.store
    }

    /// Spawn the background tasks. Call at most once.
    ///
    /// Takes ownership of the inbound channels: engine callbacks and remote
    /// updates flow into the controller from here until `shutdown`.
    pub fn start(
        self: &Arc<Self>,
        mut engine_rx: EngineEventReceiver,
        mut remote_rx: RemoteUpdateReceiver,
    ) {
        let mut handles = Vec::with_capacity(4);

        // Engine event pump
        let session = Arc::clone(self);
        let mut stop = self.stop.subscribe();
        handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    event = engine_rx.recv() => {
                        let Some(event) = event else { break };
                        if let Err(e) = session.handle_engine_event(event).await {
                            warn!("engine event handling failed: {}", e);
                        }
                    }
                }
            }
            debug!("engine event pump stopped");
        }));

        // Remote update pump
        let session = Arc::clone(self);
        let mut stop = self.stop.subscribe();
        handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    update = remote_rx.recv() => {
                        let Some(update) = update else { break };
                        if let Err(e) = session.apply_remote_update(update).await {
                            warn!("remote update handling failed: {}", e);
                        }
                    }
                }
            }
            debug!("remote update pump stopped");
        }));

        // Playback state drift check, ~1 Hz
        let session = Arc::clone(self);
        let mut stop = self.stop.subscribe();
        let drift_interval = self.config.drift_check_interval();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(drift_interval);
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = ticker.tick() => session.adapter.correct_drift().await,
                }
            }
            debug!("drift check stopped");
        }));

        // Outbound sync flush
        let session = Arc::clone(self);
        let mut stop = self.stop.subscribe();
        let flush_interval = self.config.sync_flush_interval();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(flush_interval);
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = ticker.tick() => session.bridge.flush_now().await,
                }
            }
            debug!("sync flush stopped");
        }));

        self.tasks.lock().unwrap().extend(handles);
    }

    /// Stop the background tasks and push any final queued commands
    pub async fn shutdown(&self) {
        info!("Session shutting down");
        let _ = self.stop.send(true);
        let handles: Vec<JoinHandle<()>> = self.tasks.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        self.bridge.flush_now().await;
    }

    // ------------------------------------------------------------------
    // Track selection and navigation
    // ------------------------------------------------------------------

    /// Select a track for review, optionally replacing the queue.
    ///
    /// Track-change checkpoint: the new order and position are pushed to
    /// the remote immediately.
    pub async fn select_track(
        &self,
        track: Track,
        queue: Option<Vec<Track>>,
        position: usize,
    ) -> Result<()> {
        self.store.set_track(track.clone(), queue, position).await;
        self.adapter.select(&track).await?;
        self.push_queue_order().await;
        self.bridge.flush_now().await;
        Ok(())
    }

    /// Skip to the next queue entry, carrying the playing state over.
    ///
    /// Returns the new track, or `None` at the queue boundary.
    pub async fn next(&self) -> Result<Option<Track>> {
        let was_playing = self.store.is_playing().await;
        let Some(track) = self.store.next_track().await else {
            debug!("next at queue boundary, staying put");
            return Ok(None);
        };
        self.adapter.select(&track).await?;
        if was_playing {
            self.adapter.play().await?;
        }
        self.bridge.enqueue(RemoteCommand::NextTrack).await;
        self.bridge.flush_now().await;
        Ok(Some(track))
    }

    /// Skip to the previous queue entry; mirror of `next`
    pub async fn previous(&self) -> Result<Option<Track>> {
        let was_playing = self.store.is_playing().await;
        let Some(track) = self.store.previous_track().await else {
            debug!("previous at queue boundary, staying put");
            return Ok(None);
        };
        self.adapter.select(&track).await?;
        if was_playing {
            self.adapter.play().await?;
        }
        self.bridge.enqueue(RemoteCommand::PreviousTrack).await;
        self.bridge.flush_now().await;
        Ok(Some(track))
    }

    /// Close the player, resetting track, queue, and engine state
    pub async fn close(&self) {
        self.bridge.flush_now().await;
        self.adapter.reset().await;
        self.store.close().await;
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    pub async fn toggle_playback(&self) -> Result<()> {
        if self.store.is_playing().await {
            self.pause().await
        } else {
            self.play().await
        }
    }

    pub async fn play(&self) -> Result<()> {
        self.adapter.play().await?;
        self.bridge.enqueue(RemoteCommand::TogglePlayback).await;
        Ok(())
    }

    /// Pause playback.
    ///
    /// Pause checkpoint: the precise position rides along and the queue is
    /// flushed immediately so the remote observes the pause promptly.
    pub async fn pause(&self) -> Result<()> {
        self.adapter.pause().await?;
        let position = self.adapter.precise_position().await;
        self.bridge
            .enqueue(RemoteCommand::SeekTo { time: position })
            .await;
        self.bridge.enqueue(RemoteCommand::TogglePlayback).await;
        self.bridge.flush_now().await;
        Ok(())
    }

    /// Seek to an absolute position in seconds.
    ///
    /// Explicit-seek checkpoint: the accepted position is pushed right
    /// away. A seek the adapter dropped (unknown duration) pushes nothing.
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        self.adapter.seek(seconds).await?;
        if self.store.get_duration().await > 0.0 {
            let position = self.store.get_position().await;
            self.bridge
                .enqueue(RemoteCommand::SeekTo { time: position })
                .await;
            self.bridge.flush_now().await;
        }
        Ok(())
    }

    /// A click on the waveform: sets an armed loop boundary, otherwise
    /// seeks
    pub async fn waveform_click(&self, time: f64) -> Result<()> {
        if self.store.loop_click(time).await {
            return Ok(());
        }
        self.seek(time).await
    }

    // ------------------------------------------------------------------
    // Queue panel
    // ------------------------------------------------------------------

    /// Drag started on the entry at `source`
    pub async fn drag_begin(&self, source: usize) {
        self.drag.lock().await.begin(source);
    }

    /// Drag dropped on `target`; applies and persists the move.
    ///
    /// Returns whether anything moved.
    pub async fn drag_drop(&self, target: usize) -> bool {
        let completed = self.drag.lock().await.drop_on(target);
        let Some((source, target)) = completed else {
            return false;
        };
        if !self.store.reorder_queue(source, target).await {
            return false;
        }
        self.push_queue_order().await;
        true
    }

    /// Drag ended without a drop
    pub async fn drag_cancel(&self) {
        self.drag.lock().await.cancel();
    }

    pub async fn toggle_shuffle(&self) -> bool {
        let shuffled = self.store.toggle_shuffle().await;
        self.push_queue_order().await;
        shuffled
    }

    pub async fn cycle_repeat(&self) -> RepeatMode {
        self.store.cycle_repeat().await
    }

    // ------------------------------------------------------------------
    // Volume, mute, rate, loop
    // ------------------------------------------------------------------

    pub async fn set_volume(&self, volume: f32) {
        self.store.set_volume(volume).await;
        let level = self.store.get_volume().await;
        self.bridge.enqueue(RemoteCommand::SetVolume { level }).await;
    }

    pub async fn toggle_mute(&self) -> bool {
        let muted = self.store.toggle_mute().await;
        self.bridge.enqueue(RemoteCommand::ToggleMute).await;
        muted
    }

    pub async fn cycle_rate(&self) -> PlaybackRate {
        self.store.cycle_rate().await
    }

    pub async fn loop_arm(&self, bound: LoopBound) {
        self.store.loop_arm(bound).await;
    }

    pub async fn loop_toggle(&self) -> bool {
        self.store.loop_toggle().await
    }

    pub async fn loop_clear(&self) {
        self.store.loop_clear().await;
    }

    // ------------------------------------------------------------------
    // Comment round-trips
    // ------------------------------------------------------------------

    /// Add a timed comment on the current track.
    ///
    /// The marker set comes back from the server as a `CommentMarkers`
    /// update once persisted; nothing is rendered optimistically.
    pub async fn add_comment(&self, timestamp: f64, text: String) -> Result<()> {
        let Some(track) = self.store.get_current_track().await else {
            return Err(Error::InvalidState(
                "cannot comment with no track selected".to_string(),
            ));
        };
        self.bridge
            .enqueue(RemoteCommand::AddComment {
                track_id: track.id,
                timestamp,
                text,
            })
            .await;
        self.bridge.flush_now().await;
        Ok(())
    }

    pub async fn resolve_comment(&self, comment_id: Uuid) {
        self.bridge
            .enqueue(RemoteCommand::ResolveComment { comment_id })
            .await;
        self.bridge.flush_now().await;
    }

    pub async fn delete_comment(&self, comment_id: Uuid) {
        self.bridge
            .enqueue(RemoteCommand::DeleteComment { comment_id })
            .await;
        self.bridge.flush_now().await;
    }

    // ------------------------------------------------------------------
    // Inbound event handling
    // ------------------------------------------------------------------

    /// Fold one engine callback in, applying the completion policy when a
    /// track finishes
    pub async fn handle_engine_event(&self, event: EngineEvent) -> Result<()> {
        match self.adapter.handle_event(event).await? {
            EngineOutcome::Handled => Ok(()),
            EngineOutcome::TrackFinished => self.on_track_finished().await,
        }
    }

    /// Completion policy: One replays, All advances with wraparound, Off
    /// advances or stops pinned at the end
    async fn on_track_finished(&self) -> Result<()> {
        match self.store.get_queue().await.repeat() {
            RepeatMode::One => {
                debug!("repeat one, replaying");
                self.adapter.seek(0.0).await?;
                self.adapter.play().await?;
            }
            RepeatMode::All | RepeatMode::Off => match self.store.next_track().await {
                Some(track) => {
                    self.adapter.select(&track).await?;
                    self.adapter.play().await?;
                    self.push_queue_order().await;
                    self.bridge.flush_now().await;
                }
                None => {
                    info!("End of queue reached, stopping");
                }
            },
        }
        Ok(())
    }

    /// Apply one server-side property change or named event.
    ///
    /// Property frames go through the store's change-only setters, so
    /// echoes of our own pushes settle without re-emitting events.
    pub async fn apply_remote_update(&self, update: RemoteUpdate) -> Result<()> {
        match update {
            RemoteUpdate::CurrentTrack { track } => {
                self.store.set_track(track.clone(), None, 0).await;
                self.adapter.select(&track).await?;
            }
            RemoteUpdate::IsPlaying { playing } => {
                self.store.set_playing(playing).await;
            }
            RemoteUpdate::CurrentPosition { position } => {
                self.store.set_position(position).await;
            }
            RemoteUpdate::Duration { duration } => {
                self.store.set_duration(duration).await;
            }
            RemoteUpdate::Volume { volume } => {
                self.store.set_volume(volume).await;
            }
            RemoteUpdate::IsMuted { muted } => {
                self.store.set_muted(muted).await;
            }
            RemoteUpdate::Visibility {
                visible,
                full_player,
                mini_player,
            } => {
                self.store
                    .set_visibility(PlayerVisibility {
                        visible,
                        full_player,
                        mini_player,
                    })
                    .await;
            }
            RemoteUpdate::CommentMarkers { track_id, markers } => {
                self.store.set_comments(track_id, markers).await;
            }
            RemoteUpdate::TrackEnded => {
                self.on_track_finished().await?;
            }
            RemoteUpdate::FullPlayerToggled => {
                self.store.toggle_full_player().await;
            }
            RemoteUpdate::PlayerClosed => {
                self.close().await;
            }
            RemoteUpdate::StartPersistentAudio {
                track,
                queue,
                position,
            } => {
                self.store
                    .set_track(track.clone(), Some(queue), position)
                    .await;
                self.adapter.select(&track).await?;
                self.adapter.play().await?;
            }
            RemoteUpdate::SeekToPosition { time } => {
                self.adapter.seek(time).await?;
            }
            RemoteUpdate::PausePlayback => {
                self.adapter.pause().await?;
            }
        }
        Ok(())
    }

    /// Queue the current order and position for persistence
    async fn push_queue_order(&self) {
        let queue = self.store.get_queue().await;
        self.bridge
            .enqueue(RemoteCommand::UpdateQueueOrder {
                queue: queue.ids(),
                position: queue.position(),
            })
            .await;
    }
}
