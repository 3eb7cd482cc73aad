//! Engine event synchronization and stall recovery.

mod common;

use bridge_traits::{EngineEvent, EngineState};
use common::{controller_with, ids, settle, tracks, FakeEngine};
use core_playback::{ControllerConfig, PlaybackStatus};
use core_runtime::events::{CoreEvent, PlaybackEvent};
use std::time::Duration;

#[tokio::test]
async fn now_playing_sync_is_idempotent() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    controller
        .submit_queue(tracks(&["a", "b", "c"]), 0, None)
        .await
        .unwrap();

    controller.apply_engine_event(EngineEvent::PlaybackTimeDidChange { current_time: 12.0 });
    engine.set_now_playing(Some("b"));
    controller.apply_engine_event(EngineEvent::NowPlayingItemDidChange);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.current_index, 1);
    assert_eq!(snapshot.current_time, 0.0);

    controller.apply_engine_event(EngineEvent::PlaybackTimeDidChange { current_time: 3.0 });
    controller.apply_engine_event(EngineEvent::NowPlayingItemDidChange);
    assert_eq!(controller.current_index(), 1);
    assert_eq!(controller.current_track().unwrap().track_id, "b");
}

#[tokio::test]
async fn now_playing_during_retry_tracks_pruned_queue() {
    let engine = FakeEngine::new();
    engine.reject_ids(&["a"]);
    engine.report_during_queue(&["c"]);
    engine.report_during_queue(&["a", "c"]);
    let controller = controller_with(&engine, ControllerConfig::default());
    let mut events = controller.subscribe_events();
    assert!(controller.bind_events());

    controller
        .submit_queue(tracks(&["a", "b", "c", "d"]), 0, None)
        .await
        .unwrap();
    settle().await;

    assert_eq!(ids(&controller.queue()), vec!["b", "c", "d"]);
    assert_eq!(controller.current_index(), 1);
    assert_eq!(controller.current_track().unwrap().track_id, "c");

    let moves: Vec<(String, usize)> = events
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            CoreEvent::Playback(PlaybackEvent::NowPlayingChanged { track_id, index }) => {
                Some((track_id, index))
            }
            _ => None,
        })
        .collect();
    // Index 2 in the first submission, index 1 once "a" is gone. The stale
    // report of the rejected "a" never becomes current.
    assert_eq!(moves, vec![("c".to_string(), 2), ("c".to_string(), 1)]);
}

#[tokio::test]
async fn unknown_now_playing_item_changes_nothing() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    controller
        .submit_queue(tracks(&["a", "b"]), 1, None)
        .await
        .unwrap();

    controller.apply_engine_event(EngineEvent::PlaybackDurationDidChange { duration: 200.0 });
    engine.set_now_playing(Some("zzz"));
    controller.apply_engine_event(EngineEvent::NowPlayingItemDidChange);
    engine.set_now_playing(None);
    controller.apply_engine_event(EngineEvent::NowPlayingItemDidChange);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.current_index, 1);
    assert_eq!(snapshot.duration, 200.0);
}

#[tokio::test]
async fn bound_events_drive_status() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    let mut events = controller.subscribe_events();
    assert!(controller.bind_events());
    assert!(controller.is_bound());

    engine.emit(EngineEvent::state_changed(EngineState::Playing));
    settle().await;
    assert_eq!(controller.status(), PlaybackStatus::Playing);
    assert!(controller.is_playing());

    // Duplicate notifications do not produce a second transition.
    engine.emit(EngineEvent::state_changed(EngineState::Playing));
    engine.emit(EngineEvent::state_changed(EngineState::Paused));
    settle().await;
    assert_eq!(controller.status(), PlaybackStatus::Paused);

    let transitions: Vec<(String, String)> = events
        .drain()
        .into_iter()
        .filter_map(|e| match e {
            CoreEvent::Playback(PlaybackEvent::StatusChanged { from, to }) => Some((from, to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("idle".to_string(), "playing".to_string()),
            ("playing".to_string(), "paused".to_string()),
        ]
    );
}

#[tokio::test]
async fn rebinding_keeps_a_single_subscription() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    let mut events = controller.subscribe_events();

    assert!(controller.bind_events());
    assert!(controller.bind_events());
    settle().await;

    engine.emit(EngineEvent::state_changed(EngineState::Playing));
    settle().await;

    let transitions = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, CoreEvent::Playback(PlaybackEvent::StatusChanged { .. })))
        .count();
    assert_eq!(transitions, 1);

    controller.unbind_events();
    controller.unbind_events();
    assert!(!controller.is_bound());

    engine.emit(EngineEvent::state_changed(EngineState::Paused));
    settle().await;
    assert_eq!(controller.status(), PlaybackStatus::Playing);
}

#[tokio::test]
async fn unknown_state_code_is_ignored() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());

    controller.apply_engine_event(EngineEvent::state_changed(EngineState::Paused));
    controller.apply_engine_event(EngineEvent::PlaybackStateDidChange { state: 42 });
    assert_eq!(controller.status(), PlaybackStatus::Paused);
}

#[tokio::test(start_paused = true)]
async fn stall_recovery_fires_once() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    let mut events = controller.subscribe_events();
    controller.bind_events();

    engine.emit(EngineEvent::state_changed(EngineState::Stalled));
    settle().await;
    assert_eq!(controller.status(), PlaybackStatus::Stalled);
    assert!(controller.is_stall_recovery_armed());

    tokio::time::sleep(Duration::from_millis(3999)).await;
    assert_eq!(engine.count("stop"), 0);

    tokio::time::sleep(Duration::from_millis(10)).await;
    settle().await;
    assert_eq!(engine.commands(), vec!["stop", "play"]);
    assert!(!controller.is_stall_recovery_armed());

    tokio::time::sleep(Duration::from_secs(30)).await;
    settle().await;
    assert_eq!(engine.commands(), vec!["stop", "play"]);

    let drained = events.drain();
    assert!(drained.iter().any(|e| matches!(
        e,
        CoreEvent::Playback(PlaybackEvent::StallDetected { timeout_ms: 4000 })
    )));
    assert!(drained.iter().any(|e| matches!(
        e,
        CoreEvent::Playback(PlaybackEvent::StallRecovery { succeeded: true, .. })
    )));
}

#[tokio::test(start_paused = true)]
async fn playing_before_timeout_cancels_recovery() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    controller.bind_events();

    engine.emit(EngineEvent::state_changed(EngineState::Waiting));
    settle().await;
    assert!(controller.is_stall_recovery_armed());

    tokio::time::sleep(Duration::from_millis(2000)).await;
    engine.emit(EngineEvent::state_changed(EngineState::Playing));
    settle().await;
    assert!(!controller.is_stall_recovery_armed());

    tokio::time::sleep(Duration::from_secs(10)).await;
    settle().await;
    assert!(engine.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn repeated_stall_rearms_single_timer() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    controller.bind_events();

    engine.emit(EngineEvent::state_changed(EngineState::Waiting));
    settle().await;
    tokio::time::sleep(Duration::from_millis(3000)).await;
    engine.emit(EngineEvent::state_changed(EngineState::Stalled));
    settle().await;

    // The first timer would have fired at 4000 ms.
    tokio::time::sleep(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(engine.count("stop"), 0);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    settle().await;
    assert_eq!(engine.commands(), vec!["stop", "play"]);
}

#[tokio::test(start_paused = true)]
async fn engine_playing_on_expiry_skips_recovery() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    controller.bind_events();

    engine.emit(EngineEvent::state_changed(EngineState::Stalled));
    settle().await;
    engine.set_playing(true);

    tokio::time::sleep(Duration::from_millis(5000)).await;
    settle().await;
    assert!(engine.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn detaching_session_cancels_watchdog() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    controller.bind_events();

    engine.emit(EngineEvent::state_changed(EngineState::Stalled));
    settle().await;
    assert!(controller.detach_session().is_some());
    assert!(!controller.has_session());
    assert!(!controller.is_stall_recovery_armed());

    tokio::time::sleep(Duration::from_millis(5000)).await;
    settle().await;
    assert!(engine.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn close_cancels_pending_recovery() {
    let engine = FakeEngine::new();
    let controller = controller_with(&engine, ControllerConfig::default());
    controller.bind_events();

    engine.emit(EngineEvent::state_changed(EngineState::Stalled));
    settle().await;
    assert!(controller.is_stall_recovery_armed());

    tokio::time::sleep(Duration::from_millis(1000)).await;
    controller.close().await;
    assert!(!controller.is_stall_recovery_armed());

    tokio::time::sleep(Duration::from_millis(6000)).await;
    settle().await;
    assert_eq!(engine.commands(), vec!["stop"]);
    assert_eq!(controller.status(), PlaybackStatus::Idle);
}
