// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the camera session state machine

use snapshoot_camera::backends::camera::{DeviceMediaSource, Facing, SyntheticBackend};
use snapshoot_camera::constants::mime;
use snapshoot_camera::pipelines::CaptureEncoder;
use snapshoot_camera::session::MediaContent;
use snapshoot_camera::{ErrorKind, Session, SessionConfig, SessionEvent, SessionSnapshot, SessionState};
use std::sync::Arc;
use std::time::Duration;

fn setup(config: SessionConfig) -> (Arc<SyntheticBackend>, Session) {
    let backend = Arc::new(SyntheticBackend::new().with_resolution(16, 12));
    let source = DeviceMediaSource::new(backend.clone());
    let session = Session::spawn(config, source, CaptureEncoder::default());
    (backend, session)
}

fn front() -> SessionConfig {
    SessionConfig {
        initial_facing: Facing::Front,
        ..SessionConfig::default()
    }
}

async fn wait_state(session: &Session, state: SessionState) -> SessionSnapshot {
    tokio::time::timeout(
        Duration::from_secs(60),
        session.wait_until(|s| s.state == state),
    )
    .await
    .expect("timed out waiting for state")
    .expect("session closed")
}

async fn live(session: &Session) -> SessionSnapshot {
    session.dispatch(SessionEvent::StartPreview).unwrap();
    wait_state(session, SessionState::Live).await
}

#[tokio::test(start_paused = true)]
async fn test_start_preview_goes_live() {
    let (backend, session) = setup(front());
    let snapshot = live(&session).await;

    assert_eq!(snapshot.facing, Facing::Front);
    let preview = snapshot.preview.expect("live snapshot has a preview");
    assert!(preview.mirrored);
    assert_eq!(backend.stats().open_now, 1);
    assert_eq!(snapshot.error_kind, None);
    assert!(snapshot.captured_media.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_switches_never_overlap() {
    let (backend, session) = setup(front());
    live(&session).await;

    for _ in 0..5 {
        session.dispatch(SessionEvent::SwitchFacing).unwrap();
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, SessionState::Live);
    assert_eq!(snapshot.facing, Facing::Rear);

    let stats = backend.stats();
    assert_eq!(stats.max_concurrent, 1);
    assert_eq!(stats.open_now, 1);
    assert_eq!(stats.opens, 6);
    assert_eq!(backend.open_facings(), vec![Facing::Rear]);
}

#[tokio::test(start_paused = true)]
async fn test_switch_from_idle_acquires_other_camera() {
    let (backend, session) = setup(front());
    session.dispatch(SessionEvent::SwitchFacing).unwrap();
    let snapshot = wait_state(&session, SessionState::Live).await;

    assert_eq!(snapshot.facing, Facing::Rear);
    assert!(!snapshot.preview.unwrap().mirrored);
    assert_eq!(backend.stats().requests.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_during_request_releases_late_stream() {
    let (backend, session) = setup(front());
    session.dispatch(SessionEvent::StartPreview).unwrap();
    session.dispatch(SessionEvent::Teardown).unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(session.snapshot().state, SessionState::Idle);
    let stats = backend.stats();
    assert_eq!(stats.opens, 1);
    assert_eq!(stats.closes, 1);
    assert_eq!(stats.open_now, 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_teardown_waits_for_stale_stream() {
    let (backend, session) = setup(front());
    session.dispatch(SessionEvent::StartPreview).unwrap();
    session.dispatch(SessionEvent::Teardown).unwrap();
    session.dispatch(SessionEvent::StartPreview).unwrap();

    wait_state(&session, SessionState::Live).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let stats = backend.stats();
    assert_eq!(stats.max_concurrent, 1);
    assert_eq!(stats.open_now, 1);
    assert_eq!(stats.opens, 2);
}

#[tokio::test(start_paused = true)]
async fn test_events_during_request_are_replayed() {
    let (_backend, session) = setup(front());
    session.dispatch(SessionEvent::StartPreview).unwrap();
    session.dispatch(SessionEvent::CapturePhoto).unwrap();

    let snapshot = wait_state(&session, SessionState::Captured).await;
    assert!(snapshot.captured_media.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_front_photo_is_mirrored() {
    let (backend, session) = setup(front());
    live(&session).await;

    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    let snapshot = wait_state(&session, SessionState::Captured).await;
    let media = snapshot.captured_media.unwrap();
    assert_eq!(media.mime(), mime::IMAGE_JPEG);

    let MediaContent::Image(image) = &media.content else {
        panic!("expected an image");
    };
    let raw = backend.reference_frame(Facing::Front);
    let expected = image::imageops::flip_horizontal(&raw);
    assert!(image.mirrored);
    assert_eq!(*image.pixels, expected);
    assert_ne!(*image.pixels, raw);

    // Released as soon as the still was taken
    assert_eq!(backend.stats().open_now, 0);
    assert!(snapshot.preview.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_rear_photo_is_not_mirrored() {
    let config = SessionConfig {
        initial_facing: Facing::Rear,
        ..SessionConfig::default()
    };
    let (backend, session) = setup(config);
    live(&session).await;

    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    let media = session.wait_until(|s| s.state == SessionState::Captured).await.unwrap();
    let Some(MediaContent::Image(image)) = media.captured_media.map(|m| m.content) else {
        panic!("expected an image");
    };
    assert!(!image.mirrored);
    assert_eq!(*image.pixels, backend.reference_frame(Facing::Rear));
}

#[tokio::test(start_paused = true)]
async fn test_recording_stops_at_cap() {
    let config = SessionConfig {
        max_recording_seconds: 10,
        ..front()
    };
    let (backend, session) = setup(config);
    live(&session).await;

    let mut events = session.subscribe();
    session.dispatch(SessionEvent::StartRecording).unwrap();
    let started = wait_state(&session, SessionState::Recording).await;
    assert_eq!(started.recording_elapsed_seconds, Some(0));

    let mut elapsed_seen = Vec::new();
    let captured = loop {
        let snapshot = events.recv().await.unwrap();
        if let Some(elapsed) = snapshot.recording_elapsed_seconds {
            elapsed_seen.push(elapsed);
        }
        if snapshot.state == SessionState::Captured {
            break snapshot;
        }
        assert_ne!(snapshot.state, SessionState::Error);
    };

    assert_eq!(elapsed_seen, (0..=10).collect::<Vec<u32>>());
    assert!(elapsed_seen.iter().all(|e| *e <= 10));

    let media = captured.captured_media.unwrap();
    assert_eq!(media.mime(), mime::VIDEO_MJPEG);
    let MediaContent::Clip(clip) = &media.content else {
        panic!("expected a clip");
    };
    assert!(!clip.is_empty());
    assert!(clip.has_audio);
    assert_eq!(captured.recording_elapsed_seconds, None);
    assert_eq!(backend.stats().open_now, 0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_stop_recording() {
    let (backend, session) = setup(front());
    live(&session).await;

    session.dispatch(SessionEvent::StartRecording).unwrap();
    wait_state(&session, SessionState::Recording).await;
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    assert_eq!(session.snapshot().recording_elapsed_seconds, Some(3));

    session.dispatch(SessionEvent::StopRecording).unwrap();
    let snapshot = wait_state(&session, SessionState::Captured).await;
    assert!(snapshot.captured_media.unwrap().is_clip());
    assert_eq!(backend.stats().open_now, 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_recording_is_an_error() {
    let (backend, session) = setup(front());
    backend.pause_frames(true);
    live(&session).await;

    session.dispatch(SessionEvent::StartRecording).unwrap();
    wait_state(&session, SessionState::Recording).await;
    tokio::time::sleep(Duration::from_secs(2)).await;
    session.dispatch(SessionEvent::StopRecording).unwrap();

    let snapshot = wait_state(&session, SessionState::Error).await;
    assert_eq!(snapshot.error_kind, Some(ErrorKind::RecordingProducedEmptyClip));
    assert_eq!(backend.stats().open_now, 0);

    // Retryable
    backend.pause_frames(false);
    live(&session).await;
}

#[tokio::test(start_paused = true)]
async fn test_switch_during_recording_is_rejected() {
    let (backend, session) = setup(front());
    live(&session).await;
    session.dispatch(SessionEvent::StartRecording).unwrap();
    wait_state(&session, SessionState::Recording).await;

    session.dispatch(SessionEvent::SwitchFacing).unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, SessionState::Recording);
    assert_eq!(snapshot.facing, Facing::Front);
    assert_eq!(backend.stats().opens, 1);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_during_recording_discards_clip() {
    let (backend, session) = setup(front());
    live(&session).await;
    session.dispatch(SessionEvent::StartRecording).unwrap();
    wait_state(&session, SessionState::Recording).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    session.dispatch(SessionEvent::Teardown).unwrap();
    let snapshot = wait_state(&session, SessionState::Idle).await;
    assert!(snapshot.captured_media.is_none());
    assert_eq!(backend.stats().open_now, 0);

    // No stray ticks after teardown
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(session.snapshot().state, SessionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_discard_reacquires_same_facing() {
    let config = SessionConfig {
        initial_facing: Facing::Rear,
        ..SessionConfig::default()
    };
    let (backend, session) = setup(config);
    live(&session).await;
    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    wait_state(&session, SessionState::Captured).await;

    let mut events = session.subscribe();
    session.dispatch(SessionEvent::Discard).unwrap();
    let next = events.recv().await.unwrap();
    assert_eq!(next.state, SessionState::Requesting);
    assert_eq!(next.facing, Facing::Rear);
    assert!(next.captured_media.is_none());

    wait_state(&session, SessionState::Live).await;
    let stats = backend.stats();
    assert_eq!(stats.opens, 2);
    assert!(stats.requests.iter().all(|r| r.facing == Facing::Rear));
}

#[tokio::test(start_paused = true)]
async fn test_deliver_hands_over_media_without_reacquire() {
    let (backend, session) = setup(front());
    live(&session).await;
    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    wait_state(&session, SessionState::Captured).await;

    let media = session.deliver().await.expect("media delivered");
    assert!(!media.is_clip());
    assert!(!media.bytes().is_empty());

    tokio::time::sleep(Duration::from_secs(1)).await;
    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(snapshot.captured_media.is_none());
    assert_eq!(backend.stats().opens, 1);
    assert!(session.deliver().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_teardown_keeps_captured_media() {
    let (_backend, session) = setup(front());
    live(&session).await;
    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    let captured = wait_state(&session, SessionState::Captured).await;

    session.dispatch(SessionEvent::Teardown).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, SessionState::Captured);
    assert_eq!(
        snapshot.captured_media.map(|m| m.id),
        captured.captured_media.map(|m| m.id)
    );
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_is_retryable() {
    let (backend, session) = setup(front());
    backend.deny_permission(true);

    session.dispatch(SessionEvent::StartPreview).unwrap();
    let snapshot = wait_state(&session, SessionState::Error).await;
    assert_eq!(snapshot.error_kind, Some(ErrorKind::PermissionDenied));
    assert_eq!(snapshot.facing, Facing::Front);
    assert!(snapshot.preview.is_none());

    backend.deny_permission(false);
    let snapshot = live(&session).await;
    assert_eq!(snapshot.facing, Facing::Front);
    assert_eq!(snapshot.error_kind, None);
}

#[tokio::test(start_paused = true)]
async fn test_device_unavailable_needs_teardown() {
    let (backend, session) = setup(front());
    backend.set_unavailable(Facing::Front, true);

    session.dispatch(SessionEvent::StartPreview).unwrap();
    let snapshot = wait_state(&session, SessionState::Error).await;
    assert_eq!(snapshot.error_kind, Some(ErrorKind::DeviceUnavailable));

    backend.set_unavailable(Facing::Front, false);
    session.dispatch(SessionEvent::StartPreview).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(session.snapshot().state, SessionState::Error);
    assert_eq!(backend.stats().requests.len(), 1);

    session.dispatch(SessionEvent::Teardown).unwrap();
    wait_state(&session, SessionState::Idle).await;
    live(&session).await;
    assert_eq!(backend.stats().requests.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_capture_without_frames_fails() {
    let (backend, session) = setup(front());
    backend.pause_frames(true);
    live(&session).await;

    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    let snapshot = wait_state(&session, SessionState::Error).await;
    assert_eq!(snapshot.error_kind, Some(ErrorKind::CaptureFailed));
    assert_eq!(backend.stats().open_now, 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_during_capture_drops_photo() {
    let (backend, session) = setup(front());
    backend.pause_frames(true);
    live(&session).await;

    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    wait_state(&session, SessionState::Capturing).await;

    // Hardware goes back right away, not after the frame timeout
    session.dispatch(SessionEvent::Teardown).unwrap();
    wait_state(&session, SessionState::Idle).await;
    assert_eq!(backend.stats().open_now, 0);

    backend.pause_frames(false);
    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = session.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert!(snapshot.captured_media.is_none());
    assert!(session.deliver().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_events_during_capture_wait_for_photo() {
    let (backend, session) = setup(front());
    live(&session).await;
    let mut events = session.subscribe();

    session.dispatch(SessionEvent::CapturePhoto).unwrap();
    session.dispatch(SessionEvent::Discard).unwrap();

    // Discard applies to the finished photo and re-acquires
    let mut states = Vec::new();
    while states.last() != Some(&SessionState::Live) {
        let snapshot = tokio::time::timeout(Duration::from_secs(60), events.recv())
            .await
            .expect("timed out waiting for snapshot")
            .expect("session closed");
        states.push(snapshot.state);
    }
    assert_eq!(
        states,
        vec![
            SessionState::Capturing,
            SessionState::Captured,
            SessionState::Requesting,
            SessionState::Live
        ]
    );
    assert_eq!(backend.stats().opens, 2);
    assert!(session.snapshot().captured_media.is_none());
}
