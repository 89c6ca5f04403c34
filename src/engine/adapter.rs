//! Media engine adapter
//!
//! Sits between the store and the embedder's engine. Owns the two-phase
//! load state machine, the single-slot pending command, loop enforcement
//! on position ticks, and the playback state drift check. All engine
//! calls and engine events funnel through here so the rest of the crate
//! never touches the engine directly.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::{EngineEvent, LoadState, MediaEngine, PendingCommand};
use crate::config::PlayerConfig;
use crate::error::Result;
use crate::events::PlayerEvent;
use crate::store::PlaybackStore;
use crate::track::Track;

/// What the session should do after an engine event was folded in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineOutcome {
    /// Nothing further; store state is updated
    Handled,
    /// The track played to its end; apply the repeat/advance policy
    TrackFinished,
}

/// Adapter between the playback store and a media engine
pub struct EngineAdapter {
    engine: Arc<dyn MediaEngine>,
    store: Arc<PlaybackStore>,

    /// Load progress of the current track
    load_state: RwLock<LoadState>,

    /// Deferred command slot, last write wins. Taken exactly once when the
    /// ready callback arrives.
    pending: Mutex<Option<PendingCommand>>,

    /// Peak sample rate for the duration estimate fallback
    peaks_per_second: f64,
}

impl EngineAdapter {
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        store: Arc<PlaybackStore>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            engine,
            store,
            load_state: RwLock::new(LoadState::NotLoaded),
            pending: Mutex::new(None),
            peaks_per_second: config.peaks_per_second,
        }
    }

    pub async fn load_state(&self) -> LoadState {
        *self.load_state.read().await
    }

    /// Begin the two-phase load for a newly selected track.
    ///
    /// With valid cached peaks the waveform renders immediately and the
    /// audio load is deferred until the first play request. Without them
    /// (or when the render fails) the full decode starts right away.
    pub async fn select(&self, track: &Track) -> Result<()> {
        info!("Selecting track {} ({})", track.title, track.id);
        *self.pending.lock().await = None;

        match &track.peaks {
            Some(peaks) => match self.engine.render_peaks(peaks).await {
                Ok(()) => {
                    *self.load_state.write().await = LoadState::VisualOnly;
                    debug!(
                        "waveform rendered from {} cached peaks, audio load deferred",
                        peaks.len()
                    );
                }
                Err(e) => {
                    warn!("peak render failed ({}), falling back to full decode", e);
                    self.engine.load(track).await?;
                    *self.load_state.write().await = LoadState::Loading;
                }
            },
            None => {
                self.engine.load(track).await?;
                *self.load_state.write().await = LoadState::Loading;
                debug!("no cached peaks, full decode started");
            }
        }
        Ok(())
    }

    /// Forget the engine-side state on close
    pub async fn reset(&self) {
        *self.pending.lock().await = None;
        *self.load_state.write().await = LoadState::NotLoaded;
    }

    /// Start playback, deferring until audio is ready when necessary.
    ///
    /// An engine rejection reverts the store to paused without surfacing
    /// an error; the collaborator owns user-facing messaging.
    pub async fn play(&self) -> Result<()> {
        info!("Play command received");
        let state = *self.load_state.read().await;
        match state {
            LoadState::AudioReady => {
                self.store.set_playing(true).await;
                if let Err(e) = self.engine.play().await {
                    debug!("play rejected by engine: {}", e);
                    self.store.set_playing(false).await;
                }
            }
            LoadState::Loading => {
                self.store.set_playing(true).await;
                *self.pending.lock().await = Some(PendingCommand::Play);
            }
            LoadState::VisualOnly | LoadState::NotLoaded => {
                if self.request_audio().await? {
                    self.store.set_playing(true).await;
                    *self.pending.lock().await = Some(PendingCommand::Play);
                } else {
                    debug!("play with no track selected, ignoring");
                }
            }
        }
        Ok(())
    }

    /// Pause playback, deferring until audio is ready when necessary
    pub async fn pause(&self) -> Result<()> {
        info!("Pause command received");
        self.store.set_playing(false).await;
        match *self.load_state.read().await {
            LoadState::AudioReady => {
                if let Err(e) = self.engine.pause().await {
                    warn!("engine pause failed: {}", e);
                }
            }
            LoadState::Loading | LoadState::VisualOnly => {
                *self.pending.lock().await = Some(PendingCommand::Pause);
            }
            LoadState::NotLoaded => {}
        }
        Ok(())
    }

    /// Seek to an absolute position in seconds.
    ///
    /// The engine takes a normalized fraction, so an unknown duration
    /// makes the target meaningless: the request is dropped with a
    /// diagnostic instead of guessing.
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        let duration = self.store.get_duration().await;
        if !duration.is_finite() || duration <= 0.0 {
            warn!("Seek to {:.1}s ignored: duration unknown", seconds);
            return Ok(());
        }
        let target = seconds.clamp(0.0, duration);

        match *self.load_state.read().await {
            LoadState::AudioReady => {
                self.engine.seek(target / duration).await?;
                self.store.set_position(target).await;
            }
            LoadState::NotLoaded => {
                debug!("seek with nothing loaded, ignoring");
            }
            LoadState::Loading | LoadState::VisualOnly => {
                *self.pending.lock().await = Some(PendingCommand::Seek(target));
                // Optimistic: the waveform cursor follows the click while
                // the audio catches up
                self.store.set_position(target).await;
            }
        }
        Ok(())
    }

    /// Fold one engine event into store state
    pub async fn handle_event(&self, event: EngineEvent) -> Result<EngineOutcome> {
        match event {
            EngineEvent::Ready { duration } => {
                self.on_ready(duration).await?;
                Ok(EngineOutcome::Handled)
            }
            EngineEvent::Playing => {
                self.store.set_playing(true).await;
                Ok(EngineOutcome::Handled)
            }
            EngineEvent::Paused => {
                self.store.set_playing(false).await;
                Ok(EngineOutcome::Handled)
            }
            EngineEvent::Tick { position } => {
                self.on_tick(position).await;
                Ok(EngineOutcome::Handled)
            }
            EngineEvent::Finished => {
                self.on_finished().await;
                Ok(EngineOutcome::TrackFinished)
            }
            EngineEvent::Error { message } => {
                self.on_error(&message).await;
                Ok(EngineOutcome::Handled)
            }
        }
    }

    /// Playback state self-check, run on the session's periodic interval.
    ///
    /// The engine is ground truth; a cache that drifted (missed callback,
    /// engine-side interruption) is healed here, counted, and announced.
    /// Detection happens at most once per interval, the event-driven paths
    /// remain the primary update mechanism.
    pub async fn correct_drift(&self) {
        if *self.load_state.read().await != LoadState::AudioReady {
            return;
        }
        let engine_playing = match self.engine.is_playing().await {
            Ok(playing) => playing,
            Err(e) => {
                debug!("drift check skipped, engine unreachable: {}", e);
                return;
            }
        };
        let store_playing = self.store.is_playing().await;
        if engine_playing == store_playing {
            return;
        }

        warn!(
            "[DRIFT] cached playback state is {} but engine reports {}, adopting engine state",
            if store_playing { "playing" } else { "paused" },
            if engine_playing { "playing" } else { "paused" },
        );
        self.store.set_playing(engine_playing).await;
        self.store.increment_drift_corrections();
        self.store.events().emit_lossy(PlayerEvent::DriftCorrected {
            engine_playing,
            timestamp: chrono::Utc::now(),
        });
    }

    /// Best available playhead position, for checkpoint pushes.
    ///
    /// Reads the engine clock when audio is live; otherwise the store
    /// cache is as good as it gets.
    pub async fn precise_position(&self) -> f64 {
        if *self.load_state.read().await == LoadState::AudioReady {
            if let Ok(time) = self.engine.current_time().await {
                if time.is_finite() && time >= 0.0 {
                    return time;
                }
            }
        }
        self.store.get_position().await
    }

    async fn request_audio(&self) -> Result<bool> {
        let Some(track) = self.store.get_current_track().await else {
            return Ok(false);
        };
        self.engine.load(&track).await?;
        *self.load_state.write().await = LoadState::Loading;
        Ok(true)
    }

    async fn on_ready(&self, engine_duration: Option<f64>) -> Result<()> {
        *self.load_state.write().await = LoadState::AudioReady;

        let duration = self.resolve_duration(engine_duration).await;
        if duration > 0.0 {
            self.store.set_duration(duration).await;
        }

        let pending = self.pending.lock().await.take();
        let Some(command) = pending else {
            return Ok(());
        };
        debug!("replaying deferred {:?} now that audio is ready", command);
        match command {
            PendingCommand::Play => {
                self.store.set_playing(true).await;
                if let Err(e) = self.engine.play().await {
                    debug!("deferred play rejected by engine: {}", e);
                    self.store.set_playing(false).await;
                }
            }
            PendingCommand::Pause => {
                self.store.set_playing(false).await;
                if let Err(e) = self.engine.pause().await {
                    warn!("engine pause failed: {}", e);
                }
            }
            PendingCommand::Seek(seconds) => {
                if duration > 0.0 {
                    let target = seconds.clamp(0.0, duration);
                    if let Err(e) = self.engine.seek(target / duration).await {
                        warn!("deferred seek failed: {}", e);
                    } else {
                        self.store.set_position(target).await;
                    }
                } else {
                    warn!("deferred seek to {:.1}s dropped: duration still unknown", seconds);
                }
            }
        }
        Ok(())
    }

    /// Duration at ready time: engine report, then peak-count estimate,
    /// then the selection metadata
    async fn resolve_duration(&self, engine_duration: Option<f64>) -> f64 {
        if let Some(d) = engine_duration {
            if d.is_finite() && d > 0.0 {
                return d;
            }
        }
        if let Some(track) = self.store.get_current_track().await {
            if let Some(peaks) = &track.peaks {
                let estimate = peaks.estimate_duration(self.peaks_per_second);
                if estimate > 0.0 {
                    debug!(
                        "engine reported no duration, estimated {:.1}s from peak count",
                        estimate
                    );
                    return estimate;
                }
            }
            if track.duration > 0.0 {
                return track.duration;
            }
        }
        warn!("duration unknown at ready time; seeks stay disabled until one arrives");
        0.0
    }

    async fn on_tick(&self, position: f64) {
        if !position.is_finite() {
            return;
        }

        // Loop enforcement runs before the position cache update: at most
        // one rewind seek per tick
        if let Some(start) = self.store.loop_check(position).await {
            let duration = self.store.get_duration().await;
            if duration > 0.0 {
                debug!("loop end reached at {:.1}s, rewinding to {:.1}s", position, start);
                if let Err(e) = self.engine.seek((start / duration).clamp(0.0, 1.0)).await {
                    warn!("loop rewind seek failed: {}", e);
                } else {
                    self.store.set_position(start).await;
                }
            }
            return;
        }

        self.store.update_position(position).await;
    }

    async fn on_finished(&self) {
        info!("Track finished");
        self.store.set_playing(false).await;
        let duration = self.store.get_duration().await;
        if duration > 0.0 {
            self.store.set_position(duration).await;
        }
        if let Some(track) = self.store.get_current_track().await {
            self.store.events().emit_lossy(PlayerEvent::TrackCompleted {
                track_id: track.id,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    async fn on_error(&self, message: &str) {
        error!("Engine error: {}", message);
        {
            let mut state = self.load_state.write().await;
            if *state == LoadState::Loading {
                // A failed load can be retried by the next play request
                *state = LoadState::NotLoaded;
            }
        }
        *self.pending.lock().await = None;
        self.store.set_playing(false).await;
    }
}
