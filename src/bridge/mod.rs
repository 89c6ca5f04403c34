//! Remote session boundary
//!
//! The server-held session component is the collaborator of record for
//! persistence: which track and queue the user was on, their volume, the
//! comment threads. The controller talks to it through the object-safe
//! `RemoteSession` trait and receives its property changes and named
//! events as `RemoteUpdate` values on an mpsc channel owned by the
//! session. Both directions are closed enums, so the handled set is
//! checked at compile time.

mod sync;

pub use sync::SyncBridge;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::Result;
use crate::track::{CommentMarker, Track};

/// Outbound command to the server session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RemoteCommand {
    /// Position checkpoint (pause, track change, explicit seek)
    SeekTo { time: f64 },
    TogglePlayback,
    NextTrack,
    PreviousTrack,
    SetVolume { level: f32 },
    ToggleMute,
    /// Persist the visible queue order and the playing index
    UpdateQueueOrder { queue: Vec<Uuid>, position: usize },
    AddComment {
        track_id: Uuid,
        timestamp: f64,
        text: String,
    },
    ResolveComment { comment_id: Uuid },
    DeleteComment { comment_id: Uuid },
}

/// Coalescing class of an outbound command
///
/// Commands of a `Some` class are last-write-wins: a newer value replaces
/// an already queued one of the same class instead of queuing behind it.
/// `None` commands are order-sensitive and always queue distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalesceClass {
    Seek,
    Volume,
    QueueOrder,
}

impl RemoteCommand {
    pub fn coalesce_class(&self) -> Option<CoalesceClass> {
        match self {
            RemoteCommand::SeekTo { .. } => Some(CoalesceClass::Seek),
            RemoteCommand::SetVolume { .. } => Some(CoalesceClass::Volume),
            RemoteCommand::UpdateQueueOrder { .. } => Some(CoalesceClass::QueueOrder),
            _ => None,
        }
    }

    /// Command name, matching the serialized `command` tag
    pub fn command_name(&self) -> &'static str {
        match self {
            RemoteCommand::SeekTo { .. } => "seek_to",
            RemoteCommand::TogglePlayback => "toggle_playback",
            RemoteCommand::NextTrack => "next_track",
            RemoteCommand::PreviousTrack => "previous_track",
            RemoteCommand::SetVolume { .. } => "set_volume",
            RemoteCommand::ToggleMute => "toggle_mute",
            RemoteCommand::UpdateQueueOrder { .. } => "update_queue_order",
            RemoteCommand::AddComment { .. } => "add_comment",
            RemoteCommand::ResolveComment { .. } => "resolve_comment",
            RemoteCommand::DeleteComment { .. } => "delete_comment",
        }
    }
}

/// Inbound property change or named event from the server session
///
/// Property frames rehydrate the local store verbatim; named events map to
/// controller actions. Both arrive on the same channel in delivery order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "update", rename_all = "snake_case")]
pub enum RemoteUpdate {
    CurrentTrack { track: Track },
    IsPlaying { playing: bool },
    CurrentPosition { position: f64 },
    Duration { duration: f64 },
    Volume { volume: f32 },
    IsMuted { muted: bool },
    Visibility {
        visible: bool,
        full_player: bool,
        mini_player: bool,
    },
    CommentMarkers {
        track_id: Uuid,
        markers: Vec<CommentMarker>,
    },
    /// The server noticed the track end (e.g. another tab was playing)
    TrackEnded,
    FullPlayerToggled,
    PlayerClosed,
    /// Begin playback of a track with its review queue
    StartPersistentAudio {
        track: Track,
        queue: Vec<Track>,
        position: usize,
    },
    SeekToPosition { time: f64 },
    PausePlayback,
}

/// Transport to the server session, supplied by the embedder
///
/// One call per command; a failed call is the transport's problem to
/// report to the user, the controller logs and drops it without retrying.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn call(&self, command: RemoteCommand) -> Result<()>;
}

/// Sender half handed to the embedder's server binding
pub type RemoteUpdateSender = mpsc::UnboundedSender<RemoteUpdate>;

/// Receiver half consumed by the session's remote pump
pub type RemoteUpdateReceiver = mpsc::UnboundedReceiver<RemoteUpdate>;

/// Create the remote update channel pair
pub fn remote_update_channel() -> (RemoteUpdateSender, RemoteUpdateReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesce_classes() {
        assert_eq!(
            RemoteCommand::SeekTo { time: 5.0 }.coalesce_class(),
            Some(CoalesceClass::Seek)
        );
        assert_eq!(
            RemoteCommand::SetVolume { level: 0.5 }.coalesce_class(),
            Some(CoalesceClass::Volume)
        );
        assert_eq!(
            RemoteCommand::UpdateQueueOrder {
                queue: Vec::new(),
                position: 0
            }
            .coalesce_class(),
            Some(CoalesceClass::QueueOrder)
        );

        // Order-sensitive commands never coalesce
        assert_eq!(RemoteCommand::TogglePlayback.coalesce_class(), None);
        assert_eq!(RemoteCommand::NextTrack.coalesce_class(), None);
        assert_eq!(
            RemoteCommand::ResolveComment {
                comment_id: Uuid::new_v4()
            }
            .coalesce_class(),
            None
        );
    }

    #[test]
    fn test_command_serialization_tag() {
        let command = RemoteCommand::SeekTo { time: 12.5 };
        assert_eq!(command.command_name(), "seek_to");

        let json = serde_json::to_value(&command).unwrap();
        assert_eq!(json["command"], "seek_to");
        assert_eq!(json["time"], 12.5);
    }

    #[test]
    fn test_update_deserialization() {
        let update: RemoteUpdate =
            serde_json::from_str(r#"{"update": "current_position", "position": 42.0}"#).unwrap();
        assert_eq!(update, RemoteUpdate::CurrentPosition { position: 42.0 });

        let event: RemoteUpdate = serde_json::from_str(r#"{"update": "pause_playback"}"#).unwrap();
        assert_eq!(event, RemoteUpdate::PausePlayback);
    }
}
