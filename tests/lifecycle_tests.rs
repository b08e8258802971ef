// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the view lifecycle guard

use snapshoot_camera::backends::camera::{DeviceMediaSource, Facing, SyntheticBackend};
use snapshoot_camera::pipelines::CaptureEncoder;
use snapshoot_camera::{LifecycleGuard, Session, SessionConfig, SessionEvent, SessionState};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (Arc<SyntheticBackend>, Session, LifecycleGuard) {
    let backend = Arc::new(SyntheticBackend::new().with_resolution(16, 12));
    let source = DeviceMediaSource::new(backend.clone());
    let config = SessionConfig {
        initial_facing: Facing::Front,
        ..SessionConfig::default()
    };
    let session = Session::spawn(config, source, CaptureEncoder::default());
    let guard = LifecycleGuard::new(session.clone());
    (backend, session, guard)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(500)).await;
}

#[tokio::test(start_paused = true)]
async fn test_enter_starts_and_leave_releases() {
    let (backend, session, mut guard) = setup();

    guard.will_enter().unwrap();
    settle().await;
    assert_eq!(session.snapshot().state, SessionState::Live);
    assert_eq!(backend.stats().open_now, 1);

    guard.will_leave().unwrap();
    guard.did_leave().unwrap();
    settle().await;
    assert_eq!(session.snapshot().state, SessionState::Idle);
    assert_eq!(backend.stats().open_now, 0);
}

#[tokio::test(start_paused = true)]
async fn test_leave_during_recording_releases() {
    let (backend, session, mut guard) = setup();
    guard.will_enter().unwrap();
    settle().await;

    session.dispatch(SessionEvent::StartRecording).unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(session.snapshot().state, SessionState::Recording);

    guard.will_leave().unwrap();
    settle().await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(snapshot.captured_media.is_none());
    assert_eq!(backend.stats().open_now, 0);
}

#[tokio::test(start_paused = true)]
async fn test_pending_media_blocks_restart() {
    let (backend, session, mut guard) = setup();
    guard.will_enter().unwrap();
    settle().await;

    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    settle().await;
    assert_eq!(session.snapshot().state, SessionState::Captured);

    guard.will_leave().unwrap();
    guard.will_enter().unwrap();
    settle().await;

    assert_eq!(session.snapshot().state, SessionState::Captured);
    assert_eq!(backend.stats().opens, 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume() {
    let (backend, session, mut guard) = setup();
    guard.will_enter().unwrap();
    settle().await;

    guard.pause().unwrap();
    settle().await;
    assert!(guard.is_paused());
    assert_eq!(session.snapshot().state, SessionState::Idle);
    assert_eq!(backend.stats().open_now, 0);

    // Paused: entering again does not start the camera
    guard.will_leave().unwrap();
    guard.will_enter().unwrap();
    settle().await;
    assert_eq!(session.snapshot().state, SessionState::Idle);

    guard.resume().unwrap();
    settle().await;
    assert_eq!(session.snapshot().state, SessionState::Live);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_guard_releases() {
    let (backend, session, mut guard) = setup();
    guard.will_enter().unwrap();
    settle().await;
    assert_eq!(backend.stats().open_now, 1);

    drop(guard);
    settle().await;
    assert_eq!(session.snapshot().state, SessionState::Idle);
    assert_eq!(backend.stats().open_now, 0);
}

#[tokio::test(start_paused = true)]
async fn test_panic_unwind_releases() {
    let (backend, session, mut guard) = setup();
    guard.will_enter().unwrap();
    settle().await;
    assert_eq!(backend.stats().open_now, 1);

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
        let _guard = guard;
        panic!("view crashed");
    }));
    assert!(result.is_err());

    settle().await;
    assert_eq!(session.snapshot().state, SessionState::Idle);
    assert_eq!(backend.stats().open_now, 0);
}
