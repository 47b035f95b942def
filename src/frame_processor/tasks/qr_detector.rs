// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! This module implements QR code detection using the rqrr crate.
//! It extracts a luma plane from camera frames, downscales it and searches
//! for QR codes, returning their positions and raw payload bytes.

use super::SymbolDecoder;
use crate::backends::camera::format_converters::{downscale_luma, to_luma};
use crate::backends::camera::types::CameraFrame;
use crate::constants::decode;
use crate::frame_processor::types::{FrameRegion, RawSymbol};
use tracing::{debug, trace};

/// QR code detector
///
/// Analyzes camera frames to detect and decode QR codes.
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: decode::MAX_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self { max_dimension }
    }
}

impl SymbolDecoder for QrDetector {
    fn decode(&self, frame: &CameraFrame) -> Vec<RawSymbol> {
        detect_sync(frame, self.max_dimension)
    }
}

fn detect_sync(frame: &CameraFrame, max_dimension: u32) -> Vec<RawSymbol> {
    let start = std::time::Instant::now();

    let Some((width, height, luma)) = to_luma(frame) else {
        trace!(format = %frame.format, "Frame could not be converted to luma");
        return Vec::new();
    };
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let (luma, proc_width, proc_height, scale) =
        downscale_luma(luma, width, height, max_dimension);

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
        proc_width as usize,
        proc_height as usize,
        |x, y| luma[y * proc_width as usize + x],
    );
    let grids = prepared.detect_grids();

    trace!(
        proc_width,
        proc_height,
        scale,
        candidates = grids.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "QR grid search complete"
    );

    let mut symbols = Vec::with_capacity(grids.len());
    for grid in grids {
        let mut payload = Vec::new();
        if let Err(e) = grid.decode_to(&mut payload) {
            debug!(error = ?e, "Failed to decode QR grid");
            continue;
        }

        let bounds = bounds_to_region(&grid.bounds, scale, width, height);
        debug!(
            bytes = payload.len(),
            x = bounds.x,
            y = bounds.y,
            "Detected QR code"
        );
        symbols.push(RawSymbol {
            payload,
            bounds: Some(bounds),
        });
    }

    symbols
}

/// Axis-aligned box around the four grid corners, mapped back to the
/// original frame and normalized
fn bounds_to_region(
    corners: &[rqrr::Point; 4],
    scale: f32,
    frame_width: u32,
    frame_height: u32,
) -> FrameRegion {
    let xs = corners.iter().map(|p| p.x.max(0) as f32 * scale);
    let ys = corners.iter().map(|p| p.y.max(0) as f32 * scale);

    let min_x = xs.clone().fold(f32::MAX, f32::min);
    let max_x = xs.fold(0.0, f32::max).min(frame_width as f32);
    let min_y = ys.clone().fold(f32::MAX, f32::min);
    let max_y = ys.fold(0.0, f32::max).min(frame_height as f32);

    FrameRegion::from_pixels(
        min_x as u32,
        min_y as u32,
        (max_x - min_x).max(0.0) as u32,
        (max_y - min_y).max(0.0) as u32,
        frame_width,
        frame_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;
    use crate::frame_processor::parse;

    const PRODUCT: &[u8] = br#"{"product_id": 7, "name": "Widget", "category": "Tools", "price": "9.99", "description": "Blue"}"#;

    /// Dark-on-light QR luma plane, `scale` pixels per module, 4 module quiet zone
    fn qr_luma(payload: &[u8], scale: usize) -> (u32, Vec<u8>) {
        let code = qrcode::QrCode::new(payload).unwrap();
        let modules = code.width();
        let size = (modules + 8) * scale;
        let mut luma = vec![255u8; size * size];

        for (i, color) in code.to_colors().into_iter().enumerate() {
            if color != qrcode::Color::Dark {
                continue;
            }
            let (mx, my) = (i % modules + 4, i / modules + 4);
            for y in my * scale..(my + 1) * scale {
                luma[y * size + mx * scale..y * size + (mx + 1) * scale].fill(0);
            }
        }
        (size as u32, luma)
    }

    #[test]
    fn test_decodes_product_code() {
        let (size, luma) = qr_luma(PRODUCT, 4);
        let frame = CameraFrame::from_packed(size, size, PixelFormat::Gray8, luma);

        let symbols = QrDetector::new().decode(&frame);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].payload, PRODUCT);
        assert!(symbols[0].bounds.is_some());

        let record = parse(&symbols[0].payload).unwrap();
        assert_eq!(record.product_id, 7);
        assert_eq!(record.name, "Widget");
    }

    #[test]
    fn test_decodes_downscaled_rgba_frame() {
        let (size, luma) = qr_luma(PRODUCT, 16);
        assert!(size > decode::MAX_DIMENSION);
        let rgba: Vec<u8> = luma.iter().flat_map(|&v| [v, v, v, 255]).collect();
        let frame = CameraFrame::from_packed(size, size, PixelFormat::RGBA, rgba);

        let symbols = QrDetector::new().decode(&frame);
        assert_eq!(symbols.len(), 1);
        assert_eq!(parse(&symbols[0].payload).unwrap().product_id, 7);

        // Bounds are reported in full-frame coordinates
        let bounds = symbols[0].bounds.as_ref().unwrap();
        assert!(bounds.x > 0.0 && bounds.x < 0.2);
        assert!(bounds.width > 0.6);
    }

    #[test]
    fn test_blank_frame_has_no_symbols() {
        let frame = CameraFrame::from_packed(64, 48, PixelFormat::Gray8, vec![255; 64 * 48]);
        assert!(QrDetector::new().decode(&frame).is_empty());
    }

    #[test]
    fn test_corrupt_mjpeg_has_no_symbols() {
        let frame = CameraFrame::from_packed(640, 480, PixelFormat::MJPEG, vec![0xff, 0xd8, 0x00]);
        assert!(QrDetector::new().decode(&frame).is_empty());
    }

    #[test]
    fn test_bounds_scale_back_to_frame() {
        let corners = [
            rqrr::Point { x: 80, y: 60 },
            rqrr::Point { x: 240, y: 60 },
            rqrr::Point { x: 240, y: 180 },
            rqrr::Point { x: 80, y: 180 },
        ];
        let region = bounds_to_region(&corners, 2.0, 640, 480);
        assert_eq!(region, FrameRegion::from_pixels(160, 120, 320, 240, 640, 480));
    }
}
