// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ticket and certificate rendering.
//!
//! Tickets are a QR raster of the rider's payload, exported either as PNG or
//! as a single-page PDF whose page matches the raster's pixel size plus a
//! caption band. Certificates are text-only PDF pages.

use crate::models::QrPayload;
use image::{GrayImage, ImageFormat, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use qrcode::{Color, QrCode};
use std::io::Cursor;

/// Blank modules around the code required by the QR standard.
const QUIET_ZONE_MODULES: u32 = 4;
const CAPTION_FONT_SIZE: i64 = 12;
const CAPTION_LINE_HEIGHT: u32 = 18;
const CAPTION_PADDING: u32 = 12;
/// A4 landscape in points.
const CERTIFICATE_SIZE: (i64, i64) = (842, 595);

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("QR encoding failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF generation failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("PDF write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A line of text placed on a PDF page, in points from the bottom-left.
struct TextLine<'a> {
    text: &'a str,
    size: i64,
    x: i64,
    y: i64,
}

/// Renders ticket rasters and exports them.
#[derive(Debug, Clone, Copy)]
pub struct TicketRenderer {
    module_px: u32,
}

impl TicketRenderer {
    pub fn new(module_px: u32) -> Self {
        Self {
            module_px: module_px.max(1),
        }
    }

    /// Render the payload's QR code as a grayscale raster with a quiet zone.
    pub fn render_qr(&self, payload: &QrPayload) -> Result<GrayImage, TicketError> {
        let code = QrCode::new(payload.encode().as_bytes())?;
        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side_modules = modules + 2 * QUIET_ZONE_MODULES;
        let side_px = side_modules * self.module_px;

        Ok(GrayImage::from_fn(side_px, side_px, |x, y| {
            let mx = x / self.module_px;
            let my = y / self.module_px;
            let inside = (QUIET_ZONE_MODULES..QUIET_ZONE_MODULES + modules).contains(&mx)
                && (QUIET_ZONE_MODULES..QUIET_ZONE_MODULES + modules).contains(&my);
            if !inside {
                return Luma([255]);
            }

            let index = ((my - QUIET_ZONE_MODULES) * modules + (mx - QUIET_ZONE_MODULES)) as usize;
            match colors[index] {
                Color::Dark => Luma([0]),
                Color::Light => Luma([255]),
            }
        }))
    }

    /// Ticket QR as PNG bytes.
    pub fn ticket_png(&self, payload: &QrPayload) -> Result<Vec<u8>, TicketError> {
        let raster = self.render_qr(payload)?;
        let mut buf = Cursor::new(Vec::new());
        raster.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// Ticket as a one-page PDF: the QR raster above a caption band.
    pub fn ticket_pdf(&self, payload: &QrPayload, caption: &[String]) -> Result<Vec<u8>, TicketError> {
        let raster = self.render_qr(payload)?;
        raster_pdf(&raster, caption)
    }
}

/// Wrap a raster into a single page sized to its pixel dimensions, with the
/// caption lines in a band underneath.
pub fn raster_pdf(raster: &GrayImage, caption: &[String]) -> Result<Vec<u8>, TicketError> {
    let (width, height) = raster.dimensions();
    let band = if caption.is_empty() {
        0
    } else {
        CAPTION_LINE_HEIGHT * caption.len() as u32 + 2 * CAPTION_PADDING
    };
    let page_width = i64::from(width);
    let page_height = i64::from(height + band);

    let lines: Vec<TextLine<'_>> = caption
        .iter()
        .enumerate()
        .map(|(i, text)| TextLine {
            text,
            size: CAPTION_FONT_SIZE,
            x: i64::from(CAPTION_PADDING),
            y: i64::from(band - CAPTION_PADDING - CAPTION_LINE_HEIGHT * (i as u32 + 1))
                + (CAPTION_LINE_HEIGHT as i64 - CAPTION_FONT_SIZE),
        })
        .collect();

    let mut builder = PageBuilder::new(page_width, page_height);
    builder.image(raster, 0, i64::from(band));
    builder.lines(&lines);
    builder.finish()
}

/// Certificate of completion as a one-page landscape PDF.
pub fn certificate_pdf(event_name: &str, rider_name: &str) -> Result<Vec<u8>, TicketError> {
    let (width, height) = CERTIFICATE_SIZE;
    let lines = [
        TextLine {
            text: "Certificate of Completion",
            size: 36,
            x: 72,
            y: height - 144,
        },
        TextLine {
            text: "This certifies that",
            size: 16,
            x: 72,
            y: height - 220,
        },
        TextLine {
            text: rider_name,
            size: 30,
            x: 72,
            y: height - 270,
        },
        TextLine {
            text: "has completed",
            size: 16,
            x: 72,
            y: height - 320,
        },
        TextLine {
            text: event_name,
            size: 24,
            x: 72,
            y: height - 360,
        },
    ];

    let mut builder = PageBuilder::new(width, height);
    builder.lines(&lines);
    builder.finish()
}

/// Encode text for the standard Helvetica font. Characters outside
/// WinAnsiEncoding become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            _ => b'?',
        })
        .collect()
}

/// Minimal single-page PDF assembly.
struct PageBuilder {
    doc: Document,
    width: i64,
    height: i64,
    operations: Vec<Operation>,
    images: Vec<(String, ObjectId)>,
}

impl PageBuilder {
    fn new(width: i64, height: i64) -> Self {
        Self {
            doc: Document::with_version("1.5"),
            width,
            height,
            operations: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Draw a grayscale raster at one point per pixel, bottom-left at (x, y).
    fn image(&mut self, raster: &GrayImage, x: i64, y: i64) {
        let (width, height) = raster.dimensions();
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            raster.as_raw().clone(),
        );
        let image_id = self.doc.add_object(stream);
        let name = format!("Im{}", self.images.len() + 1);

        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    i64::from(width).into(),
                    0.into(),
                    0.into(),
                    i64::from(height).into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        self.images.push((name, image_id));
    }

    fn lines(&mut self, lines: &[TextLine<'_>]) {
        for line in lines {
            self.operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), line.size.into()]),
                Operation::new("Td", vec![line.x.into(), line.y.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(win_ansi(line.text), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
    }

    fn finish(mut self) -> Result<Vec<u8>, TicketError> {
        let pages_id = self.doc.new_object_id();
        let font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut xobjects = lopdf::Dictionary::new();
        for (name, id) in &self.images {
            xobjects.set(name.as_bytes().to_vec(), *id);
        }
        let resources_id = self.doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
            "XObject" => xobjects,
        });

        let content = Content {
            operations: self.operations,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), self.width.into(), self.height.into()],
        });

        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}
