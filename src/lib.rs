//! playdeck — playback session controller for collaborative track review
//!
//! The controller owns everything the player UI renders (current track,
//! queue, A-B loop, playback state), keeps the waveform widget in sync
//! with an underlying media engine, and mediates between the server-held
//! session component and the client-local state.
//!
//! The two external collaborators are trait seams the embedder implements:
//! [`MediaEngine`] for whatever actually decodes and plays audio, and
//! [`RemoteSession`] for the transport to the server session. Their
//! callbacks arrive on mpsc channels created with [`engine_event_channel`]
//! and [`remote_update_channel`].
//!
//! Typical wiring:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use playdeck::*;
//! # async fn wire(engine: Arc<dyn MediaEngine>, remote: Arc<dyn RemoteSession>) {
//! let config = PlayerConfig::load(None).unwrap_or_default();
//! let (engine_tx, engine_rx) = engine_event_channel();
//! let (remote_tx, remote_rx) = remote_update_channel();
//! // engine_tx goes to the engine binding, remote_tx to the server binding
//!
//! let session = PlayerSession::new(config, engine, remote);
//! session.start(engine_rx, remote_rx);
//!
//! let mut events = session.store().events().subscribe();
//! # }
//! ```

pub mod ab_loop;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod queue;
pub mod session;
pub mod store;
pub mod time;
pub mod track;

pub use ab_loop::{LoopBound, LoopController, LoopRegion};
pub use bridge::{
    remote_update_channel, RemoteCommand, RemoteSession, RemoteUpdate, RemoteUpdateReceiver,
    RemoteUpdateSender, SyncBridge,
};
pub use config::PlayerConfig;
pub use engine::{
    engine_event_channel, EngineAdapter, EngineEvent, EngineEventReceiver, EngineEventSender,
    LoadState, MediaEngine,
};
pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, PlayerEvent};
pub use queue::{DragReorder, PlayQueue, RepeatMode};
pub use session::PlayerSession;
pub use store::{PlaybackStore, PlayerVisibility};
pub use time::format_clock;
pub use track::{CommentMarker, PlaybackRate, Track, TrackKind, WaveformPeaks};
