//! Outbound sync behavior through the session
//!
//! Verifies the checkpoint policy (position goes out on pause, track
//! change, and explicit seek, never on ordinary ticks) and the coalescing
//! of high-frequency pushes between flushes.

mod helpers;

use std::sync::Arc;

use helpers::{test_track, track_id, MockEngine, RemoteSpy};
use playdeck::{EngineEvent, PlayerConfig, PlayerSession, RemoteCommand};

struct Fixture {
    engine: Arc<MockEngine>,
    remote: Arc<RemoteSpy>,
    session: Arc<PlayerSession>,
}

fn fixture() -> Fixture {
    helpers::init_tracing();
    let engine = Arc::new(MockEngine::default());
    let remote = Arc::new(RemoteSpy::default());
    let session = PlayerSession::new(PlayerConfig::default(), engine.clone(), remote.clone());
    Fixture {
        engine,
        remote,
        session,
    }
}

async fn select_ready(f: &Fixture, id: u8, duration: f64) {
    f.session
        .select_track(test_track(id, duration), None, 0)
        .await
        .unwrap();
    f.session
        .handle_engine_event(EngineEvent::Ready {
            duration: Some(duration),
        })
        .await
        .unwrap();
}

fn seeks(remote: &RemoteSpy) -> Vec<RemoteCommand> {
    remote
        .calls()
        .into_iter()
        .filter(|c| matches!(c, RemoteCommand::SeekTo { .. }))
        .collect()
}

#[tokio::test]
async fn ticks_never_push_position() {
    let f = fixture();
    select_ready(&f, 1, 300.0).await;
    f.session.play().await.unwrap();
    f.remote.clear();

    // A minute of once-a-second progress
    for i in 0..60 {
        f.session
            .handle_engine_event(EngineEvent::Tick {
                position: i as f64,
            })
            .await
            .unwrap();
    }

    f.session.shutdown().await;
    assert!(seeks(&f.remote).is_empty());
}

#[tokio::test]
async fn pause_checkpoints_the_precise_position() {
    let f = fixture();
    select_ready(&f, 1, 300.0).await;
    f.session.play().await.unwrap();
    f.session
        .handle_engine_event(EngineEvent::Tick { position: 42.0 })
        .await
        .unwrap();
    f.engine.set_current_time(42.7);
    f.remote.clear();

    f.session.pause().await.unwrap();

    // The engine clock, not the coarser tick cache, rode the checkpoint,
    // and the flush was immediate
    assert_eq!(seeks(&f.remote), vec![RemoteCommand::SeekTo { time: 42.7 }]);
    // The earlier play toggle was still queued; the pause flush delivered
    // both deliberate toggles
    assert_eq!(
        f.remote.count(|c| matches!(c, RemoteCommand::TogglePlayback)),
        2
    );
}

#[tokio::test]
async fn explicit_seek_checkpoints_immediately() {
    let f = fixture();
    select_ready(&f, 1, 200.0).await;
    f.remote.clear();

    f.session.seek(150.0).await.unwrap();

    assert_eq!(seeks(&f.remote), vec![RemoteCommand::SeekTo { time: 150.0 }]);
}

#[tokio::test]
async fn dropped_seek_pushes_nothing() {
    let f = fixture();
    // Unknown duration: the adapter refuses the seek
    f.session
        .select_track(test_track(1, 0.0), None, 0)
        .await
        .unwrap();
    f.remote.clear();

    f.session.seek(50.0).await.unwrap();

    f.session.shutdown().await;
    assert!(seeks(&f.remote).is_empty());
}

#[tokio::test]
async fn track_change_checkpoints_the_queue() {
    let f = fixture();
    let tracks = vec![test_track(1, 100.0), test_track(2, 100.0)];
    f.remote.clear();

    f.session
        .select_track(tracks[0].clone(), Some(tracks.clone()), 0)
        .await
        .unwrap();

    assert_eq!(
        f.remote.calls(),
        vec![RemoteCommand::UpdateQueueOrder {
            queue: vec![track_id(1), track_id(2)],
            position: 0,
        }]
    );
}

#[tokio::test]
async fn volume_scrub_coalesces_to_one_push() {
    let f = fixture();

    // Slider drag: many store updates between flushes
    for step in 1..=10 {
        f.session.set_volume(step as f32 / 10.0).await;
    }

    f.session.shutdown().await;
    let volumes: Vec<RemoteCommand> = f
        .remote
        .calls()
        .into_iter()
        .filter(|c| matches!(c, RemoteCommand::SetVolume { .. }))
        .collect();
    assert_eq!(volumes, vec![RemoteCommand::SetVolume { level: 1.0 }]);
}

#[tokio::test]
async fn repeated_reorders_coalesce_to_final_order() {
    let f = fixture();
    let tracks = vec![test_track(1, 100.0), test_track(2, 100.0), test_track(3, 100.0)];
    f.session
        .select_track(tracks[0].clone(), Some(tracks.clone()), 0)
        .await
        .unwrap();
    f.remote.clear();

    // Two drags before the next flush
    f.session.drag_begin(1).await;
    f.session.drag_drop(2).await;
    f.session.drag_begin(0).await;
    f.session.drag_drop(1).await;

    f.session.shutdown().await;
    assert_eq!(
        f.remote.calls(),
        vec![RemoteCommand::UpdateQueueOrder {
            queue: vec![track_id(3), track_id(1), track_id(2)],
            position: 1,
        }]
    );
}

#[tokio::test]
async fn remote_failure_is_dropped_without_retry() {
    let f = fixture();
    select_ready(&f, 1, 200.0).await;
    f.remote.clear();
    f.remote.set_fail(true);

    f.session.seek(60.0).await.unwrap();
    assert_eq!(f.remote.calls().len(), 1);

    // The failed checkpoint is gone; the next one goes out alone
    f.remote.set_fail(false);
    f.remote.clear();
    f.session.seek(90.0).await.unwrap();
    assert_eq!(seeks(&f.remote), vec![RemoteCommand::SeekTo { time: 90.0 }]);
}

#[tokio::test]
async fn mute_toggles_queue_distinctly() {
    let f = fixture();

    // Two deliberate toggles are two pushes, not one
    f.session.toggle_mute().await;
    f.session.toggle_mute().await;

    f.session.shutdown().await;
    assert_eq!(
        f.remote.count(|c| matches!(c, RemoteCommand::ToggleMute)),
        2
    );
}
