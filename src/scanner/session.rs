// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cooperative frame-sampling task.
//!
//! Each tick takes the newest frame and makes at most one decode attempt.
//! The task ends on the first decoded code, when the source closes, or when
//! the session is stopped or dropped. The frame source is released in every
//! case.

use super::{CaptureError, FramePoll, FrameSource, QrDecoder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

type Outcome = Result<String, CaptureError>;

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a running scan.
pub struct ScanSession {
    stop: Option<oneshot::Sender<()>>,
    outcome: Option<oneshot::Receiver<Outcome>>,
    handle: Option<JoinHandle<()>>,
}

impl ScanSession {
    /// Spawn the sampling task. Must be called within a tokio runtime.
    pub fn start(
        mut source: Box<dyn FrameSource>,
        decoder: Arc<dyn QrDecoder>,
        interval: Duration,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let (outcome_tx, outcome_rx) = oneshot::channel();

        // tokio intervals cannot have a zero period.
        let interval = interval.max(MIN_FRAME_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut attempts: u64 = 0;

            let outcome = loop {
                let frame = tokio::select! {
                    _ = &mut stop_rx => break None,
                    _ = ticker.tick() => match source.poll_frame() {
                        FramePoll::Frame(frame) => frame,
                        FramePoll::Pending => continue,
                        FramePoll::Closed => break Some(Err(CaptureError::Closed)),
                    },
                };

                // Grid detection over a full frame is CPU-bound.
                attempts += 1;
                let decoder = Arc::clone(&decoder);
                match tokio::task::spawn_blocking(move || decoder.decode(&frame)).await {
                    Ok(Some(text)) => break Some(Ok(text)),
                    Ok(None) => {}
                    Err(err) => tracing::warn!(error = %err, "Frame decode task failed"),
                }
            };

            source.release();
            tracing::debug!(
                attempts,
                decoded = matches!(outcome, Some(Ok(_))),
                "Scan session finished"
            );

            if let Some(outcome) = outcome {
                // Receiver gone means nobody is waiting any more.
                let _ = outcome_tx.send(outcome);
            }
        });

        Self {
            stop: Some(stop_tx),
            outcome: Some(outcome_rx),
            handle: Some(handle),
        }
    }

    /// Wait for the decoded text.
    ///
    /// Cancel-safe: dropping the returned future before completion leaves the
    /// session running and a later call picks up the same outcome.
    pub async fn decoded(&mut self) -> Result<String, CaptureError> {
        let Some(rx) = self.outcome.as_mut() else {
            return Err(CaptureError::Closed);
        };

        let outcome = match rx.await {
            Ok(outcome) => outcome,
            // Task ended without an outcome: it was stopped.
            Err(_) => Err(CaptureError::Closed),
        };
        self.outcome = None;
        outcome
    }

    /// Cancel sampling and wait until the frame source has been released.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "Scan task ended abnormally");
            }
        }
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}
