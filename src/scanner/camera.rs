// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Channel-fed camera.
//!
//! Frames are pushed by whoever owns the physical device (a browser over a
//! websocket, a test) and sampled by the scan session.

use super::{Camera, CaptureError, FramePoll, FrameSource, GrayFrame};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// Producer half handed to the frame supplier.
pub type FrameSender = mpsc::Sender<GrayFrame>;

struct CameraSlot {
    frames: mpsc::Receiver<GrayFrame>,
    in_use: bool,
}

/// Camera whose frames arrive through a bounded channel.
///
/// Only one [`FrameSource`] may be open at a time; releasing it makes the
/// camera available again.
#[derive(Clone)]
pub struct ChannelCamera {
    slot: Arc<Mutex<CameraSlot>>,
}

fn lock(slot: &Mutex<CameraSlot>) -> MutexGuard<'_, CameraSlot> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ChannelCamera {
    pub fn new(capacity: usize) -> (FrameSender, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        let camera = Self {
            slot: Arc::new(Mutex::new(CameraSlot {
                frames: rx,
                in_use: false,
            })),
        };
        (tx, camera)
    }

    pub fn in_use(&self) -> bool {
        lock(&self.slot).in_use
    }
}

impl Camera for ChannelCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
        let mut slot = lock(&self.slot);
        if slot.in_use {
            return Err(CaptureError::Unavailable(
                "camera already in use".to_string(),
            ));
        }

        // Frames queued while nobody was scanning are stale.
        while slot.frames.try_recv().is_ok() {}
        slot.in_use = true;

        Ok(Box::new(ChannelFrameSource {
            slot: Arc::clone(&self.slot),
            released: false,
        }))
    }
}

struct ChannelFrameSource {
    slot: Arc<Mutex<CameraSlot>>,
    released: bool,
}

impl FrameSource for ChannelFrameSource {
    fn poll_frame(&mut self) -> FramePoll {
        if self.released {
            return FramePoll::Closed;
        }

        let mut slot = lock(&self.slot);
        let mut latest = None;
        loop {
            match slot.frames.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return latest.map_or(FramePoll::Closed, FramePoll::Frame);
                }
            }
        }

        latest.map_or(FramePoll::Pending, FramePoll::Frame)
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            lock(&self.slot).in_use = false;
        }
    }
}

impl Drop for ChannelFrameSource {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(value: u8) -> GrayFrame {
        GrayFrame::new(1, 1, vec![value]).unwrap()
    }

    #[test]
    fn test_poll_returns_latest_frame_only() {
        let (tx, camera) = ChannelCamera::new(8);
        let mut source = camera.open().unwrap();

        assert!(matches!(source.poll_frame(), FramePoll::Pending));

        tx.try_send(frame(1)).unwrap();
        tx.try_send(frame(2)).unwrap();
        tx.try_send(frame(3)).unwrap();
        match source.poll_frame() {
            FramePoll::Frame(f) => assert_eq!(f.pixel(0, 0), 3),
            other => panic!("expected frame, got {:?}", other),
        }
        assert!(matches!(source.poll_frame(), FramePoll::Pending));
    }

    #[test]
    fn test_single_open_until_released() {
        let (_tx, camera) = ChannelCamera::new(1);
        let mut source = camera.open().unwrap();
        assert!(camera.in_use());
        assert!(matches!(
            camera.open(),
            Err(CaptureError::Unavailable(_))
        ));

        source.release();
        assert!(!camera.in_use());
        assert!(camera.open().is_ok());
    }

    #[test]
    fn test_stale_frames_dropped_on_open() {
        let (tx, camera) = ChannelCamera::new(4);
        tx.try_send(frame(9)).unwrap();

        let mut source = camera.open().unwrap();
        assert!(matches!(source.poll_frame(), FramePoll::Pending));
    }

    #[test]
    fn test_closed_when_sender_dropped() {
        let (tx, camera) = ChannelCamera::new(1);
        let mut source = camera.open().unwrap();
        drop(tx);
        assert!(matches!(source.poll_frame(), FramePoll::Closed));
    }
}
