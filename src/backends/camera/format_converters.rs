// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion utilities
//!
//! Camera frames arrive in whatever layout the device negotiated. The display
//! path wants RGBA and the QR detector wants 8-bit luma, so everything funnels
//! through [`to_rgba`] and [`to_luma`].

use super::types::{CameraFrame, PixelFormat};

/// BT.601 YUV to RGB for a single pixel
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    [
        (y + 1.402 * v).clamp(0.0, 255.0) as u8,
        (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8,
        (y + 1.772 * u).clamp(0.0, 255.0) as u8,
    ]
}

/// Convert packed 4:2:2 to RGBA
///
/// `order` gives the byte offsets of (Y0, U, Y1, V) inside each 4-byte group.
fn packed_422_to_rgba(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    order: [usize; 4],
) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let stride = (stride as usize).max(w * 2);
    let mut rgba = Vec::with_capacity(w * h * 4);

    for row in data.chunks(stride).take(h) {
        let row = &row[..row.len().min(w * 2)];
        for chunk in row.chunks_exact(4) {
            let (y0, u, y1, v) = (chunk[order[0]], chunk[order[1]], chunk[order[2]], chunk[order[3]]);
            for y in [y0, y1] {
                let [r, g, b] = yuv_to_rgb(y, u, v);
                rgba.extend_from_slice(&[r, g, b, 255]);
            }
        }
    }

    rgba
}

/// Convert YUYV (Y0 U Y1 V) to RGBA
pub fn yuyv_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, stride, [0, 1, 2, 3])
}

/// Convert UYVY (U Y0 V Y1) to RGBA
pub fn uyvy_to_rgba(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    packed_422_to_rgba(data, width, height, stride, [1, 0, 3, 2])
}

/// Copy pixel rows into a tightly packed buffer, dropping any stride padding
pub fn copy_without_stride(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    bytes_per_pixel: u32,
) -> Vec<u8> {
    let row_bytes = (width * bytes_per_pixel) as usize;
    let stride = stride as usize;

    if stride == row_bytes || stride == 0 {
        let len = (row_bytes * height as usize).min(data.len());
        return data[..len].to_vec();
    }

    let mut packed = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * stride;
        let end = start + row_bytes;
        if end <= data.len() {
            packed.extend_from_slice(&data[start..end]);
        }
    }
    packed
}

/// Decode an MJPEG frame into an RGBA image
fn decode_mjpeg(data: &[u8]) -> Option<image::RgbaImage> {
    image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .ok()
        .map(|img| img.to_rgba8())
}

/// Convert any supported frame to tightly packed RGBA
///
/// Returns `(width, height, pixels)`, or `None` if the frame data is
/// truncated or cannot be decoded.
pub fn to_rgba(frame: &CameraFrame) -> Option<(u32, u32, Vec<u8>)> {
    let (w, h) = (frame.width, frame.height);
    let data = frame.data_slice();
    let expected = (w * h * 4) as usize;

    let rgba = match frame.format {
        PixelFormat::RGBA => copy_without_stride(data, w, h, frame.stride, 4),
        PixelFormat::RGB24 => copy_without_stride(data, w, h, frame.stride, 3)
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        PixelFormat::Gray8 => copy_without_stride(data, w, h, frame.stride, 1)
            .iter()
            .flat_map(|&l| [l, l, l, 255])
            .collect(),
        PixelFormat::YUYV => yuyv_to_rgba(data, w, h, frame.stride),
        PixelFormat::UYVY => uyvy_to_rgba(data, w, h, frame.stride),
        PixelFormat::MJPEG => {
            let img = decode_mjpeg(data)?;
            return Some((img.width(), img.height(), img.into_raw()));
        }
    };

    (rgba.len() == expected).then_some((w, h, rgba))
}

/// Extract an 8-bit luma plane from any supported frame
///
/// Returns `(width, height, luma)`, or `None` if the frame cannot be read.
pub fn to_luma(frame: &CameraFrame) -> Option<(u32, u32, Vec<u8>)> {
    let (w, h) = (frame.width, frame.height);
    let data = frame.data_slice();
    let expected = (w * h) as usize;

    let luma: Vec<u8> = match frame.format {
        PixelFormat::Gray8 => copy_without_stride(data, w, h, frame.stride, 1),
        // Y samples sit at even offsets in YUYV and odd offsets in UYVY
        PixelFormat::YUYV => copy_without_stride(data, w, h, frame.stride, 2)
            .iter()
            .step_by(2)
            .copied()
            .collect(),
        PixelFormat::UYVY => copy_without_stride(data, w, h, frame.stride, 2)
            .iter()
            .skip(1)
            .step_by(2)
            .copied()
            .collect(),
        PixelFormat::RGBA => copy_without_stride(data, w, h, frame.stride, 4)
            .chunks_exact(4)
            .map(|px| rgb_to_luma(px[0], px[1], px[2]))
            .collect(),
        PixelFormat::RGB24 => copy_without_stride(data, w, h, frame.stride, 3)
            .chunks_exact(3)
            .map(|px| rgb_to_luma(px[0], px[1], px[2]))
            .collect(),
        PixelFormat::MJPEG => {
            let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
                .ok()?
                .to_luma8();
            return Some((img.width(), img.height(), img.into_raw()));
        }
    };

    (luma.len() == expected).then_some((w, h, luma))
}

/// BT.601 luma from RGB
fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).clamp(0.0, 255.0) as u8
}

/// Downscale a luma plane so its longest side is at most `max_dim`
///
/// Uses bilinear interpolation. Returns the input unchanged when it already
/// fits, along with the scale factor that maps output coordinates back to
/// the source.
pub fn downscale_luma(
    luma: Vec<u8>,
    width: u32,
    height: u32,
    max_dim: u32,
) -> (Vec<u8>, u32, u32, f32) {
    if max_dim == 0 || (width <= max_dim && height <= max_dim) {
        return (luma, width, height, 1.0);
    }

    let scale = max_dim as f32 / width.max(height) as f32;
    let new_width = ((width as f32 * scale) as u32).max(1);
    let new_height = ((height as f32 * scale) as u32).max(1);
    let inv = 1.0 / scale;

    let src_w = width as usize;
    let mut out = Vec::with_capacity((new_width * new_height) as usize);

    for y in 0..new_height {
        for x in 0..new_width {
            let src_x = x as f32 * inv;
            let src_y = y as f32 * inv;

            let x0 = (src_x as u32).min(width - 1);
            let y0 = (src_y as u32).min(height - 1);
            let x1 = (x0 + 1).min(width - 1);
            let y1 = (y0 + 1).min(height - 1);
            let fx = src_x - x0 as f32;
            let fy = src_y - y0 as f32;

            let at = |px: u32, py: u32| luma[py as usize * src_w + px as usize] as f32;
            let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
            let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
            out.push((top * (1.0 - fy) + bottom * fy).clamp(0.0, 255.0) as u8);
        }
    }

    (out, new_width, new_height, inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_grey_round_trips_to_grey() {
        // Neutral chroma keeps R = G = B = Y
        let data = [100, 128, 200, 128];
        let rgba = yuyv_to_rgba(&data, 2, 1, 4);
        assert_eq!(rgba, vec![100, 100, 100, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn test_uyvy_and_yuyv_agree() {
        let yuyv = [50, 90, 60, 170];
        let uyvy = [90, 50, 170, 60];
        assert_eq!(yuyv_to_rgba(&yuyv, 2, 1, 4), uyvy_to_rgba(&uyvy, 2, 1, 4));
    }

    #[test]
    fn test_copy_without_stride() {
        // 2x2 RGBA with 4 bytes of padding per row
        let data = [
            1, 2, 3, 4, 5, 6, 7, 8, 0, 0, 0, 0, //
            9, 10, 11, 12, 13, 14, 15, 16, 0, 0, 0, 0,
        ];
        let packed = copy_without_stride(&data, 2, 2, 12, 4);
        assert_eq!(packed, (1..=16).collect::<Vec<u8>>());
    }

    #[test]
    fn test_luma_from_yuyv_picks_y_samples() {
        let frame = CameraFrame::from_packed(2, 1, PixelFormat::YUYV, vec![10, 128, 20, 128]);
        assert_eq!(to_luma(&frame), Some((2, 1, vec![10, 20])));
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = CameraFrame::from_packed(4, 4, PixelFormat::RGBA, vec![0; 10]);
        assert!(to_rgba(&frame).is_none());
        assert!(to_luma(&frame).is_none());
    }

    #[test]
    fn test_downscale_luma() {
        let (out, w, h, inv) = downscale_luma(vec![128; 1280 * 960], 1280, 960, 640);
        assert_eq!((w, h), (640, 480));
        assert_eq!(out.len(), 640 * 480);
        assert!((inv - 2.0).abs() < f32::EPSILON);
        assert!(out.iter().all(|&v| v == 128));
    }

    #[test]
    fn test_downscale_noop_when_small() {
        let (out, w, h, inv) = downscale_luma(vec![7; 16], 4, 4, 640);
        assert_eq!((w, h, inv), (4, 4, 1.0));
        assert_eq!(out.len(), 16);
    }
}
