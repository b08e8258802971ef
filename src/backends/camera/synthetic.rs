// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic camera backend
//!
//! Streams a generated test pattern (or a looped still image) at a fixed
//! framerate. Used by the CLI when no platform camera is wired in and by
//! tests, which can also inject permission and availability failures and
//! inspect how many streams were open at once.

use super::CameraBackend;
use super::types::*;
use crate::constants::synthetic as defaults;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Counters describing backend usage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntheticStats {
    /// Streams successfully opened
    pub opens: u64,
    /// Streams closed
    pub closes: u64,
    /// Streams open right now
    pub open_now: u64,
    /// Highest number of simultaneously open streams observed
    pub max_concurrent: u64,
    /// Every open request, including failed ones, in order
    pub requests: Vec<StreamRequest>,
}

struct OpenStream {
    facing: Facing,
    producer: JoinHandle<()>,
}

#[derive(Default)]
struct BackendState {
    streams: HashMap<StreamId, OpenStream>,
    unavailable: HashSet<Facing>,
    stats: SyntheticStats,
}

/// Test-pattern camera
pub struct SyntheticBackend {
    width: u32,
    height: u32,
    open_latency: Duration,
    image: Option<Arc<RgbaImage>>,
    permission_denied: AtomicBool,
    frames_paused: Arc<AtomicBool>,
    state: Mutex<BackendState>,
}

impl SyntheticBackend {
    /// Create a backend with the default resolution and latency
    pub fn new() -> Self {
        Self {
            width: defaults::FRAME_WIDTH,
            height: defaults::FRAME_HEIGHT,
            open_latency: defaults::OPEN_LATENCY,
            image: None,
            permission_denied: AtomicBool::new(false),
            frames_paused: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(BackendState::default()),
        }
    }

    /// Frame size of the generated pattern
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    /// Simulated time before a stream is granted
    pub fn with_open_latency(mut self, latency: Duration) -> Self {
        self.open_latency = latency;
        self
    }

    /// Loop a still image instead of the generated pattern
    pub fn with_image(mut self, image: RgbaImage) -> Self {
        self.width = image.width();
        self.height = image.height();
        self.image = Some(Arc::new(image));
        self
    }

    /// Refuse every following open with `PermissionDenied`
    pub fn deny_permission(&self, denied: bool) {
        self.permission_denied.store(denied, Ordering::SeqCst);
    }

    /// Make one facing report `DeviceUnavailable`
    pub fn set_unavailable(&self, facing: Facing, unavailable: bool) {
        let mut state = self.lock_state();
        if unavailable {
            state.unavailable.insert(facing);
        } else {
            state.unavailable.remove(&facing);
        }
    }

    /// Stop (or resume) delivering frames on open streams
    pub fn pause_frames(&self, paused: bool) {
        self.frames_paused.store(paused, Ordering::SeqCst);
    }

    /// Snapshot of the usage counters
    pub fn stats(&self) -> SyntheticStats {
        self.lock_state().stats.clone()
    }

    /// Facings of the currently open streams
    pub fn open_facings(&self) -> Vec<Facing> {
        self.lock_state().streams.values().map(|s| s.facing).collect()
    }

    /// The frame this backend produces for a facing
    pub fn reference_frame(&self, facing: Facing) -> RgbaImage {
        match &self.image {
            Some(image) => (**image).clone(),
            None => test_pattern(self.width, self.height, facing),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CameraBackend for SyntheticBackend {
    async fn open(&self, request: StreamRequest) -> BackendResult<OpenedStream> {
        self.lock_state().stats.requests.push(request);

        if !self.open_latency.is_zero() {
            tokio::time::sleep(self.open_latency).await;
        }

        if self.permission_denied.load(Ordering::SeqCst) {
            return Err(BackendError::PermissionDenied);
        }
        if self.lock_state().unavailable.contains(&request.facing) {
            return Err(BackendError::DeviceUnavailable(format!(
                "No {} camera",
                request.facing
            )));
        }

        let id = StreamId::next();
        let reference = Arc::new(CameraFrame::from_rgba(&self.reference_frame(request.facing), 0));
        let (sender, frames) = tokio::sync::watch::channel(None);
        let producer = spawn_producer(
            id,
            reference,
            sender,
            defaults::frame_interval(defaults::FRAMERATE),
            Arc::clone(&self.frames_paused),
        );

        let mut state = self.lock_state();
        state.streams.insert(
            id,
            OpenStream {
                facing: request.facing,
                producer,
            },
        );
        state.stats.opens += 1;
        state.stats.open_now = state.streams.len() as u64;
        state.stats.max_concurrent = state.stats.max_concurrent.max(state.stats.open_now);

        info!(stream = %id, facing = %request.facing, "Synthetic stream opened");

        Ok(OpenedStream {
            id,
            frames,
            has_audio: request.audio,
        })
    }

    fn close(&self, id: StreamId) -> BackendResult<()> {
        let mut state = self.lock_state();
        let stream = state
            .streams
            .remove(&id)
            .ok_or(BackendError::UnknownStream(id))?;
        stream.producer.abort();
        state.stats.closes += 1;
        state.stats.open_now = state.streams.len() as u64;

        debug!(stream = %id, "Synthetic stream closed");
        Ok(())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

impl Drop for SyntheticBackend {
    fn drop(&mut self) {
        for (_, stream) in self.lock_state().streams.drain() {
            stream.producer.abort();
        }
    }
}

fn spawn_producer(
    id: StreamId,
    reference: Arc<CameraFrame>,
    sender: FrameSender,
    interval: Duration,
    paused: Arc<AtomicBool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut sequence = 0u64;

        loop {
            ticker.tick().await;
            if paused.load(Ordering::SeqCst) {
                continue;
            }
            sequence += 1;

            let frame = CameraFrame {
                sequence,
                captured_at: std::time::Instant::now(),
                ..(*reference).clone()
            };
            if sender.send(Some(Arc::new(frame))).is_err() {
                debug!(stream = %id, "No frame receivers left");
            }
        }
    })
}

/// Left-to-right red ramp, top-to-bottom green ramp, blue marks the facing
///
/// Asymmetric on purpose so a mirrored capture is distinguishable.
pub fn test_pattern(width: u32, height: u32, facing: Facing) -> RgbaImage {
    let blue = match facing {
        Facing::Front => 200,
        Facing::Rear => 40,
    };
    let w = width.max(2) - 1;
    let h = height.max(2) - 1;

    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / w) as u8,
            (y * 255 / h) as u8,
            blue,
            255,
        ])
    })
}
