// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QR decoding of captured frames.

use super::GrayFrame;

/// Extracts QR text from a raster.
pub trait QrDecoder: Send + Sync {
    /// Text of the first decodable QR code in the frame, if any.
    fn decode(&self, frame: &GrayFrame) -> Option<String>;
}

/// Decoder backed by `rqrr`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrDecoder;

impl QrDecoder for RqrrDecoder {
    fn decode(&self, frame: &GrayFrame) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            frame.width() as usize,
            frame.height() as usize,
            |x, y| frame.pixel(x, y),
        );

        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| match grid.decode() {
                Ok((_meta, content)) => Some(content),
                Err(err) => {
                    tracing::trace!(error = ?err, "QR grid found but not decodable");
                    None
                }
            })
    }
}
