// SPDX-License-Identifier: MPL-2.0

//! Clip recorder
//!
//! Buffers one encoded chunk per frame of a live stream until stopped.
//! The recorder has no timeout of its own; whoever started it decides when
//! to stop.

use crate::backends::camera::{FrameReceiver, StreamHandle, StreamId};
use crate::constants::mime;
use crate::pipelines::photo::PhotoEncoder;
use crate::pipelines::{CaptureError, CaptureResult};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A finished recording
#[derive(Debug, Clone)]
pub struct ClipBuffer {
    /// Mime type of the concatenated chunks
    pub mime: &'static str,
    /// Encoded chunks in capture order
    pub chunks: Vec<Arc<[u8]>>,
    pub width: u32,
    pub height: u32,
    /// Wall time between start and stop
    pub duration: Duration,
    /// Whether the stream carried audio
    pub has_audio: bool,
}

impl ClipBuffer {
    pub fn frame_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total encoded size in bytes
    pub fn len(&self) -> usize {
        self.chunks.iter().map(|c| c.len()).sum()
    }

    /// Chunks concatenated into a single buffer
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for chunk in &self.chunks {
            out.extend_from_slice(chunk);
        }
        out
    }
}

#[derive(Default)]
struct Chunks {
    chunks: Vec<Arc<[u8]>>,
    width: u32,
    height: u32,
}

/// A running recording
///
/// Dropping it without calling [`ClipRecorder::stop`] discards the chunks.
pub struct RecordingHandle {
    stream: StreamId,
    has_audio: bool,
    started_at: Instant,
    stop_sender: Option<oneshot::Sender<()>>,
    task: JoinHandle<Chunks>,
}

impl RecordingHandle {
    /// Time since the recording started
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for RecordingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingHandle")
            .field("stream", &self.stream)
            .field("elapsed", &self.elapsed())
            .finish()
    }
}

/// Recorder operations
pub struct ClipRecorder;

impl ClipRecorder {
    /// Start buffering chunks from a stream
    ///
    /// Only frames drawn after this call are recorded.
    pub fn start(handle: &StreamHandle, encoder: PhotoEncoder) -> RecordingHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let mut frames = handle.frames();
        frames.mark_unchanged();

        info!(stream = %handle.id(), audio = handle.has_audio(), "Recording started");

        RecordingHandle {
            stream: handle.id(),
            has_audio: handle.has_audio(),
            started_at: Instant::now(),
            stop_sender: Some(stop_tx),
            task: tokio::spawn(record(frames, encoder, stop_rx)),
        }
    }

    /// Finalize and return the clip
    ///
    /// A recording that buffered nothing yields `CaptureError::EmptyClip`.
    pub async fn stop(mut recording: RecordingHandle) -> CaptureResult<ClipBuffer> {
        let duration = recording.elapsed();
        if let Some(sender) = recording.stop_sender.take() {
            let _ = sender.send(());
        }

        let chunks = (&mut recording.task)
            .await
            .map_err(|e| CaptureError::TaskFailed(format!("Recorder task error: {}", e)))?;

        info!(
            stream = %recording.stream,
            chunks = chunks.chunks.len(),
            duration_ms = duration.as_millis() as u64,
            "Recording stopped"
        );

        if chunks.chunks.is_empty() {
            warn!(stream = %recording.stream, "Recording produced no chunks");
            return Err(CaptureError::EmptyClip);
        }

        Ok(ClipBuffer {
            mime: mime::VIDEO_MJPEG,
            chunks: chunks.chunks,
            width: chunks.width,
            height: chunks.height,
            duration,
            has_audio: recording.has_audio,
        })
    }

    /// Discard a recording without finalizing it
    pub fn abort(recording: RecordingHandle) {
        debug!(stream = %recording.stream, "Recording aborted");
        drop(recording);
    }
}

async fn record(
    mut frames: FrameReceiver,
    encoder: PhotoEncoder,
    mut stop_rx: oneshot::Receiver<()>,
) -> Chunks {
    let mut out = Chunks::default();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            changed = frames.changed() => {
                if changed.is_err() {
                    debug!("Stream ended during recording");
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                let Some(frame) = frame else { continue };
                let Some(image) = frame.to_rgba_image() else {
                    warn!(sequence = frame.sequence, "Skipping malformed frame");
                    continue;
                };
                match encoder.encode(Arc::new(image)).await {
                    Ok(chunk) => {
                        out.width = frame.width;
                        out.height = frame.height;
                        out.chunks.push(Arc::from(chunk));
                    }
                    Err(e) => warn!(error = %e, "Failed to encode chunk"),
                }
            }
        }
    }

    out
}

/// Decode every chunk of a clip back into frames
pub fn decode_clip(clip: &ClipBuffer) -> CaptureResult<Vec<RgbaImage>> {
    clip.chunks
        .iter()
        .map(|chunk| {
            image::load_from_memory(chunk)
                .map(|img| img.to_rgba8())
                .map_err(|e| CaptureError::EncodingFailed(e.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{DeviceMediaSource, Facing, SyntheticBackend};

    async fn live_stream() -> (Arc<SyntheticBackend>, StreamHandle) {
        let backend = Arc::new(SyntheticBackend::new().with_resolution(16, 12));
        let source = DeviceMediaSource::new(backend.clone());
        let handle = source.acquire(Facing::Rear, true).await.unwrap();
        (backend, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_chunks_until_stopped() {
        let (_backend, handle) = live_stream().await;
        let recording = ClipRecorder::start(&handle, PhotoEncoder::new());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let clip = ClipRecorder::stop(recording).await.unwrap();

        assert!(clip.frame_count() > 0);
        assert!(clip.has_audio);
        assert_eq!((clip.width, clip.height), (16, 12));
        assert_eq!(clip.mime, mime::VIDEO_MJPEG);
        assert_eq!(decode_clip(&clip).unwrap().len(), clip.frame_count());
        assert_eq!(clip.to_bytes().len(), clip.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_frames_is_empty_clip() {
        let (backend, handle) = live_stream().await;
        backend.pause_frames(true);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let recording = ClipRecorder::start(&handle, PhotoEncoder::new());
        tokio::time::sleep(Duration::from_millis(500)).await;

        let err = ClipRecorder::stop(recording).await.unwrap_err();
        assert_eq!(err, CaptureError::EmptyClip);
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_stream_ends_recording() {
        let (_backend, handle) = live_stream().await;
        let recording = ClipRecorder::start(&handle, PhotoEncoder::new());
        tokio::time::sleep(Duration::from_millis(200)).await;

        drop(handle);
        let clip = ClipRecorder::stop(recording).await.unwrap();
        assert!(!clip.is_empty());
    }
}
