//! Shared test doubles and fixtures for the integration suites
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use playdeck::{
    Error, MediaEngine, RemoteCommand, RemoteSession, Result, Track, TrackKind, WaveformPeaks,
};
use uuid::Uuid;

/// Opt-in controller logs while debugging a failing scenario
/// (`RUST_LOG=playdeck=debug cargo test ...`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One recorded call into the mock engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Load(Uuid),
    RenderPeaks(usize),
    Play,
    Pause,
    Seek(f64),
}

/// Recording engine double
///
/// Captures every call for later verification and exposes knobs for the
/// ground-truth state the real engine would own: whether audio is running,
/// the playhead clock, and whether play requests are rejected.
#[derive(Default)]
pub struct MockEngine {
    calls: Mutex<Vec<EngineCall>>,
    reject_play: AtomicBool,
    playing: AtomicBool,
    current_time: Mutex<f64>,
}

impl MockEngine {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matcher: impl Fn(&EngineCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matcher(c)).count()
    }

    pub fn play_calls(&self) -> usize {
        self.count(|c| matches!(c, EngineCall::Play))
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn set_reject_play(&self, reject: bool) {
        self.reject_play.store(reject, Ordering::SeqCst);
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }

    pub fn set_current_time(&self, time: f64) {
        *self.current_time.lock().unwrap() = time;
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl MediaEngine for MockEngine {
    async fn load(&self, track: &Track) -> Result<()> {
        self.record(EngineCall::Load(track.id));
        Ok(())
    }

    async fn render_peaks(&self, peaks: &WaveformPeaks) -> Result<()> {
        self.record(EngineCall::RenderPeaks(peaks.len()));
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.record(EngineCall::Play);
        if self.reject_play.load(Ordering::SeqCst) {
            return Err(Error::Engine("autoplay blocked".to_string()));
        }
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.record(EngineCall::Pause);
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn seek(&self, fraction: f64) -> Result<()> {
        self.record(EngineCall::Seek(fraction));
        Ok(())
    }

    async fn is_playing(&self) -> Result<bool> {
        Ok(self.playing.load(Ordering::SeqCst))
    }

    async fn current_time(&self) -> Result<f64> {
        Ok(*self.current_time.lock().unwrap())
    }

    async fn duration(&self) -> Result<Option<f64>> {
        Ok(None)
    }
}

/// Recording remote double with switchable call failure
#[derive(Default)]
pub struct RemoteSpy {
    calls: Mutex<Vec<RemoteCommand>>,
    fail: AtomicBool,
}

impl RemoteSpy {
    pub fn calls(&self) -> Vec<RemoteCommand> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matcher: impl Fn(&RemoteCommand) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matcher(c)).count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RemoteSession for RemoteSpy {
    async fn call(&self, command: RemoteCommand) -> Result<()> {
        self.calls.lock().unwrap().push(command);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Remote("connection lost".to_string()));
        }
        Ok(())
    }
}

/// Deterministic track fixture; id byte makes assertions readable
pub fn test_track(id: u8, duration: f64) -> Track {
    Track {
        id: Uuid::from_bytes([id; 16]),
        kind: TrackKind::PitchFile,
        title: format!("Track {}", id),
        artist: "Test Artist".to_string(),
        project_title: String::new(),
        duration,
        stream_url: format!("https://cdn.test/stream/{}", id),
        peaks: None,
    }
}

/// Track fixture with cached waveform peaks and no known duration
pub fn track_with_peaks(id: u8, peak_count: usize) -> Track {
    Track {
        duration: 0.0,
        peaks: WaveformPeaks::new(vec![0.5; peak_count]),
        ..test_track(id, 0.0)
    }
}

pub fn track_id(id: u8) -> Uuid {
    Uuid::from_bytes([id; 16])
}
