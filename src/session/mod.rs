// SPDX-License-Identifier: GPL-3.0-only

//! Camera session
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  events   ┌──────────────────┐  acquire/release  ┌───────────────────┐
//! │  Session   │ ────────▶ │   SessionActor   │ ────────────────▶ │ DeviceMediaSource │
//! │  (handle)  │ ◀──────── │  (tokio task)    │ ────────────────▶ │  CaptureEncoder   │
//! └────────────┘ snapshots └──────────────────┘  still/recording  └───────────────────┘
//! ```
//!
//! State transitions:
//!
//! ```text
//! Idle ──startPreview──▶ Requesting ──ok──▶ Live ──capturePhoto──▶ Captured
//!  ▲                        │                 │                      │  │
//!  │                        └─fail─▶ Error    └─startRecording─▶ Recording
//!  │                                                 │ stop / cap      │  │
//!  └──────────────── deliver ◀────────── Captured ◀──┘       discard ──┘  │
//!                                                          (Requesting) ◀─┘
//! ```
//!
//! `Teardown` from any state releases the hardware and returns to Idle.

mod machine;
mod recording;
pub mod state;

pub use state::{
    CapturedMedia, MediaContent, SessionConfig, SessionEvent, SessionSnapshot, SessionState,
};

use crate::backends::camera::DeviceMediaSource;
use crate::errors::SessionError;
use crate::pipelines::CaptureEncoder;
use futures::Stream;
use machine::{Command, SessionActor};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Snapshots buffered per [`Session::subscribe`] receiver
const EVENT_CAPACITY: usize = 64;

/// Handle to a running camera session
///
/// Cheap to clone. The session task stops (and releases the camera) once
/// every handle is dropped or [`Session::shutdown`] is called.
pub struct Session {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    /// Only the actor holds the sender, so receivers close with it
    events: broadcast::Receiver<SessionSnapshot>,
}

impl Session {
    /// Start a session task on the current runtime
    ///
    /// The session begins Idle; nothing is acquired until `StartPreview`.
    pub fn spawn(
        mut config: SessionConfig,
        source: DeviceMediaSource,
        encoder: CaptureEncoder,
    ) -> Self {
        config.max_recording_seconds = config.max_recording_seconds.max(1);

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(SessionSnapshot {
            facing: config.initial_facing,
            ..SessionSnapshot::default()
        });
        let (events_tx, events) = broadcast::channel(EVENT_CAPACITY);

        let (actor, internal) = SessionActor::new(config, source, encoder, snapshot_tx, events_tx);
        tokio::spawn(actor.run(command_rx, internal));

        Self {
            commands,
            snapshots,
            events,
        }
    }

    /// Queue an event
    ///
    /// Returns once the event is queued, not once it is processed. Events
    /// that make no sense in the current state are logged and ignored.
    pub fn dispatch(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.commands
            .send(Command::Event(event))
            .map_err(|_| SessionError::Closed)
    }

    /// Every snapshot published from now on, in order
    ///
    /// Slow receivers lag (see [`broadcast::error::RecvError::Lagged`]);
    /// use [`Session::updates`] when only the latest state matters. The
    /// receiver reports `Closed` once the session stops.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSnapshot> {
        self.events.resubscribe()
    }

    /// Latest snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stream of the latest snapshot after each change
    ///
    /// Intermediate snapshots may be skipped. Ends when the session stops.
    pub fn updates(&self) -> impl Stream<Item = SessionSnapshot> + Send + 'static {
        let mut snapshots = self.snapshots.clone();
        async_stream::stream! {
            while snapshots.changed().await.is_ok() {
                let snapshot = snapshots.borrow_and_update().clone();
                yield snapshot;
            }
        }
    }

    /// Wait until a snapshot matches
    pub async fn wait_until<F>(&self, mut predicate: F) -> Result<SessionSnapshot, SessionError>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Take the captured media and return to Idle
    ///
    /// `None` when nothing was captured or the session is gone.
    pub async fn deliver(&self) -> Option<CapturedMedia> {
        let (reply, response) = oneshot::channel();
        self.commands.send(Command::Deliver(reply)).ok()?;
        response.await.ok().flatten()
    }

    /// Tear down and stop the session task
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        let (reply, done) = oneshot::channel();
        self.commands
            .send(Command::Shutdown(reply))
            .map_err(|_| SessionError::Closed)?;
        done.await.map_err(|_| SessionError::Closed)
    }
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            snapshots: self.snapshots.clone(),
            events: self.events.resubscribe(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshots.borrow();
        f.debug_struct("Session")
            .field("state", &snapshot.state)
            .field("facing", &snapshot.facing)
            .field("revision", &snapshot.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{Facing, SyntheticBackend};
    use futures::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;

    fn session(config: SessionConfig) -> (Arc<SyntheticBackend>, Session) {
        let backend = Arc::new(SyntheticBackend::new().with_resolution(16, 12));
        let source = DeviceMediaSource::new(backend.clone());
        (backend, Session::spawn(config, source, CaptureEncoder::default()))
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_idle_with_initial_facing() {
        let config = SessionConfig {
            initial_facing: Facing::Rear,
            ..SessionConfig::default()
        };
        let (backend, session) = session(config);
        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(snapshot.facing, Facing::Rear);
        assert_eq!(backend.stats().requests.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revision_increases() {
        let (_backend, session) = session(SessionConfig::default());
        let mut events = session.subscribe();
        session.dispatch(SessionEvent::StartPreview).unwrap();

        let requesting = events.recv().await.unwrap();
        let live = events.recv().await.unwrap();
        assert_eq!(requesting.state, SessionState::Requesting);
        assert_eq!(live.state, SessionState::Live);
        assert_eq!(live.revision, requesting.revision + 1);
        assert!(live.preview.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_event_is_ignored() {
        let (backend, session) = session(SessionConfig::default());
        session.dispatch(SessionEvent::StopRecording).unwrap();
        session.dispatch(SessionEvent::Discard).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(session.snapshot().state, SessionState::Idle);
        assert_eq!(backend.stats().requests.len(), 0);
        assert!(session.deliver().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_updates_end_after_shutdown() {
        let (backend, session) = session(SessionConfig::default());
        let updates = session.updates();
        let mut events = session.subscribe();
        session.dispatch(SessionEvent::StartPreview).unwrap();
        session.wait_until(|s| s.state == SessionState::Live).await.unwrap();

        session.shutdown().await.unwrap();
        let seen: Vec<_> = updates.collect().await;
        assert_eq!(seen.last().map(|s| s.state), Some(SessionState::Idle));

        let mut last = None;
        loop {
            match events.recv().await {
                Ok(snapshot) => last = Some(snapshot.state),
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
        assert_eq!(last, Some(SessionState::Idle));
        assert_eq!(backend.stats().open_now, 0);
        assert_eq!(
            session.dispatch(SessionEvent::StartPreview),
            Err(SessionError::Closed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_close_when_handles_dropped() {
        let (_backend, session) = session(SessionConfig::default());
        let clone = session.clone();
        let mut events = clone.subscribe();
        drop(session);
        drop(clone);

        let closed = tokio::time::timeout(Duration::from_secs(5), events.recv()).await;
        assert!(matches!(closed, Ok(Err(broadcast::error::RecvError::Closed))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_releases_camera() {
        let (backend, session) = session(SessionConfig::default());
        session.dispatch(SessionEvent::StartPreview).unwrap();
        session.wait_until(|s| s.state == SessionState::Live).await.unwrap();
        assert_eq!(backend.stats().open_now, 1);

        drop(session);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.stats().open_now, 0);
    }
}
