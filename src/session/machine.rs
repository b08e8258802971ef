// SPDX-License-Identifier: GPL-3.0-only

//! Session actor
//!
//! A single task owns the stream handle, the recording and the captured
//! media. Commands are processed one at a time. Slow work that must stay
//! preemptible (acquiring the camera, grabbing a still, the recording clock)
//! runs in spawned tasks whose results come back on an internal channel
//! tagged with the generation they were started in; a teardown or a new
//! acquire bumps the generation so late results are recognized and released.

use super::recording::RecordingState;
use super::state::{CapturedMedia, SessionConfig, SessionEvent, SessionSnapshot, SessionState};
use crate::backends::camera::{BackendResult, DeviceMediaSource, Facing, StreamHandle};
use crate::errors::ErrorKind;
use crate::pipelines::{CaptureEncoder, CaptureResult, ImageBuffer};
use std::collections::VecDeque;
use std::fmt;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

/// Messages from [`super::Session`] handles
pub(crate) enum Command {
    Event(SessionEvent),
    /// `Deliver` with the media handed back to the caller
    Deliver(oneshot::Sender<Option<CapturedMedia>>),
    Shutdown(oneshot::Sender<()>),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Event(event) => write!(f, "{}", event),
            Command::Deliver(_) => f.write_str("Deliver"),
            Command::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

/// Results posted back by tasks the actor spawned
enum Internal {
    Acquired {
        generation: u64,
        result: BackendResult<StreamHandle>,
    },
    Captured {
        generation: u64,
        result: CaptureResult<ImageBuffer>,
    },
    Tick {
        generation: u64,
    },
}

pub(crate) struct SessionActor {
    config: SessionConfig,
    source: DeviceMediaSource,
    encoder: CaptureEncoder,

    state: SessionState,
    facing: Facing,
    /// Bumped on every acquire and teardown
    generation: u64,
    stream: Option<StreamHandle>,
    recording: RecordingState,
    /// Still capture in flight
    capture: Option<AbortHandle>,
    media: Option<CapturedMedia>,
    error: Option<ErrorKind>,
    /// Commands received while Requesting, replayed once it settles
    pending: VecDeque<Command>,

    revision: u64,
    internal: mpsc::UnboundedSender<Internal>,
    snapshots: watch::Sender<SessionSnapshot>,
    events: broadcast::Sender<SessionSnapshot>,
}

impl SessionActor {
    pub fn new(
        config: SessionConfig,
        source: DeviceMediaSource,
        encoder: CaptureEncoder,
        snapshots: watch::Sender<SessionSnapshot>,
        events: broadcast::Sender<SessionSnapshot>,
    ) -> (Self, InternalReceiver) {
        let (internal, internal_rx) = mpsc::unbounded_channel();
        let facing = config.initial_facing;
        let actor = Self {
            config,
            source,
            encoder,
            state: SessionState::Idle,
            facing,
            generation: 0,
            stream: None,
            recording: RecordingState::Idle,
            capture: None,
            media: None,
            error: None,
            pending: VecDeque::new(),
            revision: 0,
            internal,
            snapshots,
            events,
        };
        (actor, InternalReceiver(internal_rx))
    }

    /// Process commands until shut down or every handle is dropped
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        InternalReceiver(mut internal): InternalReceiver,
    ) {
        info!(
            backend = self.source.backend_name(),
            facing = %self.facing,
            max_recording_seconds = self.config.max_recording_seconds,
            "Session started"
        );

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.teardown();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                    None => {
                        debug!("All session handles dropped");
                        self.teardown();
                        break;
                    }
                },
                Some(message) = internal.recv() => self.on_internal(message).await,
            }
        }

        info!("Session stopped");
    }

    async fn on_command(&mut self, command: Command) {
        if self.is_settling() {
            match command {
                Command::Event(SessionEvent::Teardown) => self.teardown(),
                command => {
                    debug!(%command, state = %self.state, "Queued until the session settles");
                    self.pending.push_back(command);
                }
            }
            return;
        }

        match command {
            Command::Event(event) => self.apply(event).await,
            Command::Deliver(reply) => {
                let media = self.deliver();
                let _ = reply.send(media);
            }
            // Handled by the run loop
            Command::Shutdown(reply) => {
                let _ = reply.send(());
            }
        }
    }

    async fn apply(&mut self, event: SessionEvent) {
        use SessionEvent as E;
        use SessionState as S;

        match (self.state, event) {
            (_, E::Teardown) => self.teardown(),
            (S::Idle, E::StartPreview) => self.begin_acquire(),
            (S::Error, E::StartPreview) => match self.error {
                Some(kind) if !kind.is_retryable() => {
                    warn!(error = %kind, "Preview retry rejected until teardown");
                }
                _ => self.begin_acquire(),
            },
            (S::Live, E::CapturePhoto) => self.capture_photo(),
            (S::Live, E::StartRecording) => self.start_recording(),
            (S::Recording, E::StopRecording) => self.finish_recording().await,
            (S::Idle | S::Live, E::SwitchFacing) => self.switch_facing(),
            (S::Captured, E::Discard) => {
                self.media = None;
                info!(facing = %self.facing, "Captured media discarded");
                self.begin_acquire();
            }
            (S::Captured, E::Deliver) => {
                self.deliver();
            }
            (state, event) => {
                warn!(%state, %event, "Event rejected in current state");
            }
        }
    }

    async fn on_internal(&mut self, message: Internal) {
        match message {
            Internal::Acquired { generation, result } => {
                if generation != self.generation || self.state != SessionState::Requesting {
                    match result {
                        Ok(handle) => {
                            debug!(
                                kind = %ErrorKind::StaleResultDiscarded,
                                stream = %handle.id(),
                                generation,
                                "Releasing stream from superseded request"
                            );
                            self.source.release(&handle);
                        }
                        Err(e) => {
                            debug!(error = %e, generation, "Ignoring failure of superseded request");
                        }
                    }
                    return;
                }

                match result {
                    Ok(handle) => {
                        info!(stream = %handle.id(), facing = %self.facing, "Preview live");
                        self.stream = Some(handle);
                        self.transition(SessionState::Live);
                    }
                    Err(e) => {
                        warn!(facing = %self.facing, error = %e, "Camera request failed");
                        self.error = Some(e.kind());
                        self.transition(SessionState::Error);
                    }
                }
                self.replay_pending().await;
            }
            Internal::Captured { generation, result } => {
                if generation != self.generation || self.state != SessionState::Capturing {
                    debug!(
                        kind = %ErrorKind::StaleResultDiscarded,
                        generation,
                        ok = result.is_ok(),
                        "Dropping result of superseded capture"
                    );
                    return;
                }
                self.capture = None;
                self.finish_capture(result);
                self.replay_pending().await;
            }
            Internal::Tick { generation } => {
                if generation != self.generation || self.state != SessionState::Recording {
                    debug!(generation, "Ignoring stale recording tick");
                    return;
                }
                let Some(elapsed) = self.recording.advance() else {
                    return;
                };
                self.publish();

                if elapsed >= self.config.max_recording_seconds {
                    info!(elapsed, "Recording limit reached");
                    self.finish_recording().await;
                }
            }
        }
    }

    async fn replay_pending(&mut self) {
        while !self.is_settling() {
            let Some(command) = self.pending.pop_front() else {
                break;
            };
            debug!(%command, "Replaying queued command");
            self.on_command(command).await;
        }
    }

    fn begin_acquire(&mut self) {
        self.generation += 1;
        self.error = None;
        self.transition(SessionState::Requesting);

        let generation = self.generation;
        let facing = self.facing;
        let audio = self.config.capture_audio;
        let source = self.source.clone();
        let internal = self.internal.clone();

        debug!(generation, %facing, audio, "Requesting camera");
        tokio::spawn(async move {
            let result = source.acquire(facing, audio).await;
            // A closed channel drops the handle, which releases it
            let _ = internal.send(Internal::Acquired { generation, result });
        });
    }

    fn switch_facing(&mut self) {
        self.release_stream();
        self.facing = self.facing.flipped();
        info!(facing = %self.facing, "Switching camera");
        self.begin_acquire();
    }

    fn capture_photo(&mut self) {
        let Some(handle) = &self.stream else {
            error!("Live session without a stream");
            self.error = Some(ErrorKind::CaptureFailed);
            self.transition(SessionState::Error);
            return;
        };

        let capture = self.encoder.capture_still(handle, self.facing);
        let generation = self.generation;
        let internal = self.internal.clone();
        self.transition(SessionState::Capturing);

        let task = tokio::spawn(async move {
            let result = capture.await;
            let _ = internal.send(Internal::Captured { generation, result });
        });
        self.capture = Some(task.abort_handle());
    }

    fn finish_capture(&mut self, result: CaptureResult<ImageBuffer>) {
        self.release_stream();

        match result {
            Ok(image) => {
                info!(
                    width = image.width,
                    height = image.height,
                    mirrored = image.mirrored,
                    "Photo captured"
                );
                self.media = Some(CapturedMedia::image(image, self.facing));
                self.transition(SessionState::Captured);
            }
            Err(e) => {
                warn!(error = %e, "Photo capture failed");
                self.error = Some(e.kind());
                self.transition(SessionState::Error);
            }
        }
    }

    fn start_recording(&mut self) {
        let Some(handle) = &self.stream else {
            error!("Live session without a stream");
            return;
        };

        let recording = self.encoder.start_recording(handle);
        let generation = self.generation;
        self.recording = RecordingState::start(recording, self.internal.clone(), move || {
            Internal::Tick { generation }
        });
        self.transition(SessionState::Recording);
    }

    async fn finish_recording(&mut self) {
        let Some(stopped) = self.recording.stop() else {
            return;
        };
        let result = self.encoder.stop_recording(stopped.handle).await;
        self.release_stream();

        match result {
            Ok(clip) => {
                info!(
                    elapsed = stopped.elapsed,
                    frames = clip.frame_count(),
                    bytes = clip.len(),
                    "Clip recorded"
                );
                self.media = Some(CapturedMedia::clip(clip, self.facing));
                self.transition(SessionState::Captured);
            }
            Err(e) => {
                warn!(error = %e, "Recording failed");
                self.error = Some(e.kind());
                self.transition(SessionState::Error);
            }
        }
    }

    fn deliver(&mut self) -> Option<CapturedMedia> {
        if self.state != SessionState::Captured {
            warn!(state = %self.state, "Nothing to deliver");
            return None;
        }
        let media = self.media.take();
        if let Some(media) = &media {
            info!(id = %media.id, mime = media.mime(), "Captured media delivered");
        }
        self.transition(SessionState::Idle);
        media
    }

    /// Release everything held; completed media survives
    fn teardown(&mut self) {
        self.generation += 1;

        for command in self.pending.drain(..) {
            debug!(%command, "Dropping queued command on teardown");
        }

        if let Some(capture) = self.capture.take() {
            info!("Photo capture aborted by teardown");
            capture.abort();
        }

        if let Some(stopped) = self.recording.stop() {
            info!(elapsed = stopped.elapsed, "Recording aborted by teardown");
            self.encoder.abort_recording(stopped.handle);
        }
        self.release_stream();

        match self.state {
            SessionState::Idle => {}
            SessionState::Captured => {
                debug!("Teardown keeps captured media");
            }
            _ => {
                self.error = None;
                self.transition(SessionState::Idle);
            }
        }
    }

    /// Waiting on a spawned task whose outcome decides the next state
    fn is_settling(&self) -> bool {
        matches!(
            self.state,
            SessionState::Requesting | SessionState::Capturing
        )
    }

    fn release_stream(&mut self) {
        if let Some(handle) = self.stream.take() {
            self.source.release(&handle);
        }
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            info!(from = %self.state, %to, facing = %self.facing, "Session state changed");
        }
        self.state = to;
        self.publish();
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = self.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        // No subscribers is fine
        let _ = self.events.send(snapshot);
    }

    fn snapshot(&self) -> SessionSnapshot {
        let state = self.state;
        SessionSnapshot {
            state,
            facing: self.facing,
            recording_elapsed_seconds: match state {
                SessionState::Recording => self.recording.elapsed(),
                _ => None,
            },
            captured_media: match state {
                SessionState::Captured => self.media.clone(),
                _ => None,
            },
            error_kind: match state {
                SessionState::Error => self.error,
                _ => None,
            },
            preview: match state {
                s if s.holds_stream() => self.stream.as_ref().map(StreamHandle::preview),
                _ => None,
            },
            revision: self.revision,
        }
    }
}

/// Receiving end of the actor's internal channel
pub(crate) struct InternalReceiver(mpsc::UnboundedReceiver<Internal>);
