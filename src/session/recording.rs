// SPDX-License-Identifier: GPL-3.0-only

//! Recording bookkeeping for a session
//!
//! Two-state design: either recording or not. While recording, a ticker
//! task posts one tick per second back to the session, tagged with the
//! generation it was started in.

use crate::constants::RECORDING_TICK_INTERVAL;
use crate::pipelines::RecordingHandle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Recording state machine
#[derive(Debug, Default)]
pub(crate) enum RecordingState {
    /// Not recording
    #[default]
    Idle,
    /// Actively recording
    Recording {
        /// Running recorder
        handle: RecordingHandle,
        /// 1 Hz tick source
        ticker: Ticker,
        /// Whole seconds counted so far
        elapsed: u32,
    },
}

/// Tick task, aborted on drop
#[derive(Debug)]
pub(crate) struct Ticker(JoinHandle<()>);

impl Drop for Ticker {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// What a stopped recording leaves behind
pub(crate) struct StoppedRecording {
    pub handle: RecordingHandle,
    pub elapsed: u32,
}

impl RecordingState {
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingState::Recording { .. })
    }

    /// Seconds counted so far, if recording
    pub fn elapsed(&self) -> Option<u32> {
        match self {
            RecordingState::Idle => None,
            RecordingState::Recording { elapsed, .. } => Some(*elapsed),
        }
    }

    /// Start counting, sending `make_tick()` on `ticks` once per interval
    pub fn start<T, F>(handle: RecordingHandle, ticks: mpsc::UnboundedSender<T>, make_tick: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + 'static,
    {
        let ticker = Ticker(tokio::spawn(async move {
            // First tick one period from now, not immediately
            let mut interval = tokio::time::interval_at(
                Instant::now() + RECORDING_TICK_INTERVAL,
                RECORDING_TICK_INTERVAL,
            );
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(make_tick()).is_err() {
                    break;
                }
            }
        }));

        RecordingState::Recording {
            handle,
            ticker,
            elapsed: 0,
        }
    }

    /// Count one tick, returning the new elapsed value
    pub fn advance(&mut self) -> Option<u32> {
        match self {
            RecordingState::Idle => None,
            RecordingState::Recording { elapsed, .. } => {
                *elapsed += 1;
                Some(*elapsed)
            }
        }
    }

    /// Stop the ticker and hand back the recorder (returns to Idle)
    pub fn stop(&mut self) -> Option<StoppedRecording> {
        match std::mem::take(self) {
            RecordingState::Idle => None,
            RecordingState::Recording {
                handle,
                ticker,
                elapsed,
            } => {
                drop(ticker);
                Some(StoppedRecording { handle, elapsed })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{DeviceMediaSource, Facing, SyntheticBackend};
    use crate::pipelines::CaptureEncoder;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_second_until_stopped() {
        let backend = Arc::new(SyntheticBackend::new().with_resolution(8, 8));
        let source = DeviceMediaSource::new(backend);
        let stream = source.acquire(Facing::Rear, false).await.unwrap();
        let handle = CaptureEncoder::default().start_recording(&stream);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = RecordingState::start(handle, tx, || ());
        assert_eq!(state.elapsed(), Some(0));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        let mut ticks = 0;
        while rx.try_recv().is_ok() {
            ticks += 1;
            state.advance();
        }
        assert_eq!(ticks, 2);
        assert_eq!(state.elapsed(), Some(2));

        let stopped = state.stop().unwrap();
        assert_eq!(stopped.elapsed, 2);
        assert!(!state.is_recording());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
    }
}
