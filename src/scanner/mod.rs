// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Frame capture and QR decoding for the check-in desk.
//!
//! A [`Camera`] hands out a [`FrameSource`]; a [`ScanSession`] samples that
//! source on a fixed tick and runs one [`QrDecoder`] attempt per tick until a
//! code is found or the session is stopped.

pub mod camera;
pub mod decoder;
pub mod session;

pub use camera::{ChannelCamera, FrameSender};
pub use decoder::{QrDecoder, RqrrDecoder};
pub use session::ScanSession;

/// Capture-side failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera unavailable: {0}")]
    Unavailable(String),

    #[error("unreadable frame: {0}")]
    UnreadableFrame(String),

    #[error("camera stream closed")]
    Closed,
}

/// 8-bit grayscale raster, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayFrame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl GrayFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CaptureError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(CaptureError::UnreadableFrame(format!(
                "expected {} pixels for {}x{}, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode an encoded image (PNG or JPEG) into a grayscale frame.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self, CaptureError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| CaptureError::UnreadableFrame(e.to_string()))?;
        Ok(Self::from_luma(image.to_luma8()))
    }

    pub fn from_luma(image: image::GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            pixels: image.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luma at (x, y). Callers stay within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width as usize + x]
    }
}

/// Result of sampling a frame source once.
#[derive(Debug)]
pub enum FramePoll {
    /// Most recent frame since the previous poll
    Frame(GrayFrame),
    /// No new frame yet
    Pending,
    /// The source ended and will produce no more frames
    Closed,
}

/// A live video stream.
pub trait FrameSource: Send {
    /// Take the newest available frame, discarding older queued ones.
    fn poll_frame(&mut self) -> FramePoll;

    /// Release the underlying device. Must be idempotent.
    fn release(&mut self);
}

/// A capture device that may refuse access.
pub trait Camera: Send + Sync {
    fn open(&self) -> Result<Box<dyn FrameSource>, CaptureError>;
}
