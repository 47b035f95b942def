// SPDX-License-Identifier: GPL-3.0-only

//! Display frame preparation
//!
//! Turns a captured frame into the RGBA frame shown to the user: optional
//! horizontal mirroring plus the scan guide rectangle. The captured frame is
//! never modified; a new frame is built whenever anything is drawn.

use crate::backends::camera::format_converters::to_rgba;
use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::constants::display;
use crate::frame_processor::types::ScanRegion;
use std::sync::Arc;

/// Build the display frame for `frame`
///
/// The guide rectangle is placed after mirroring, so it stays centered in
/// what the user sees. Returns `None` if the frame cannot be converted.
pub fn display_frame(frame: &CameraFrame, show_region: bool, mirror: bool) -> Option<CameraFrame> {
    let packed_rgba = frame.format == PixelFormat::RGBA && frame.stride == frame.width * 4;
    if packed_rgba && !show_region && !mirror {
        return Some(frame.clone());
    }

    let (width, height, mut rgba) = to_rgba(frame)?;

    if mirror {
        mirror_rows(&mut rgba, width);
    }
    if show_region {
        draw_rect(
            &mut rgba,
            width,
            height,
            ScanRegion::centered(width, height),
            display::SCAN_REGION_COLOR,
            display::SCAN_REGION_THICKNESS,
        );
    }

    Some(CameraFrame {
        width,
        height,
        data: Arc::from(rgba.into_boxed_slice()),
        format: PixelFormat::RGBA,
        stride: width * 4,
        sequence: frame.sequence,
        captured_at: frame.captured_at,
    })
}

fn mirror_rows(rgba: &mut [u8], width: u32) {
    let row_bytes = width as usize * 4;
    if row_bytes == 0 {
        return;
    }
    for row in rgba.chunks_exact_mut(row_bytes) {
        let w = width as usize;
        for x in 0..w / 2 {
            let (left, right) = (x * 4, (w - 1 - x) * 4);
            for c in 0..4 {
                row.swap(left + c, right + c);
            }
        }
    }
}

/// Outline `region` with a `thickness` pixel border, clipped to the frame
fn draw_rect(
    rgba: &mut [u8],
    width: u32,
    height: u32,
    region: ScanRegion,
    color: [u8; 4],
    thickness: u32,
) {
    if width == 0 || height == 0 || region.x1 <= region.x0 || region.y1 <= region.y0 {
        return;
    }
    let x1 = region.x1.min(width - 1);
    let y1 = region.y1.min(height - 1);

    let mut put = |x: u32, y: u32| {
        let idx = (y as usize * width as usize + x as usize) * 4;
        if let Some(px) = rgba.get_mut(idx..idx + 4) {
            px.copy_from_slice(&color);
        }
    };

    for t in 0..thickness {
        for x in region.x0..=x1 {
            put(x, (region.y0 + t).min(y1));
            put(x, y1.saturating_sub(t).max(region.y0));
        }
        for y in region.y0..=y1 {
            put((region.x0 + t).min(x1), y);
            put(x1.saturating_sub(t).max(region.x0), y);
        }
    }
}
