// SPDX-License-Identifier: GPL-3.0-only

//! Still image served as a camera
//!
//! Useful for running the full scan pipeline without hardware: point it at
//! a generated product QR code and every read returns that image, paced at
//! the requested framerate.

use crate::backends::camera::types::{
    BackendError, BackendResult, CameraBackendType, CameraFrame, CaptureFormat, DeviceHandle,
    Framerate, PixelFormat,
};
use crate::backends::camera::CameraBackend;
use crate::constants::file_formats;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Load an image file and convert it to a CameraFrame
///
/// Supports common image formats: PNG, JPEG, GIF, BMP, WebP
pub fn load_image_as_frame(path: &Path) -> BackendResult<CameraFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !file_formats::is_image_extension(extension) {
        return Err(BackendError::FormatNotSupported(format!(
            "Unsupported file format: {}",
            path.display()
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BackendError::Other(format!("Failed to load image '{}': {}", path.display(), e))
    })?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();

    debug!(width, height, "Image loaded successfully");

    Ok(CameraFrame::from_packed(
        width,
        height,
        PixelFormat::RGBA,
        rgba.into_raw(),
    ))
}

pub struct ImageFileBackend {
    path: PathBuf,
    frame: Option<CameraFrame>,
    interval: Duration,
    last_read: Option<Instant>,
}

impl ImageFileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            frame: None,
            interval: Framerate::default().frame_interval(),
            last_read: None,
        }
    }
}

impl CameraBackend for ImageFileBackend {
    fn open(&mut self, index: u32, requested: &CaptureFormat) -> BackendResult<DeviceHandle> {
        if self.frame.is_some() {
            return Err(BackendError::Busy(self.path.display().to_string()));
        }

        let frame = load_image_as_frame(&self.path)?;
        // A zero rate would serve frames in a busy loop
        let framerate = requested
            .framerate
            .filter(|f| !f.frame_interval().is_zero())
            .unwrap_or_default();
        self.interval = framerate.frame_interval();
        self.last_read = None;

        let format = CaptureFormat {
            width: frame.width,
            height: frame.height,
            framerate: Some(framerate),
            pixel_format: PixelFormat::RGBA,
        };
        self.frame = Some(frame);

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string());

        Ok(DeviceHandle {
            index,
            name,
            format,
        })
    }

    fn read(&mut self) -> BackendResult<CameraFrame> {
        let frame = self.frame.as_ref().ok_or(BackendError::NotOpen)?;

        if let Some(last) = self.last_read {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        self.last_read = Some(Instant::now());

        // Same pixels every time; only the timestamp moves
        Ok(CameraFrame {
            data: Arc::clone(&frame.data),
            captured_at: Instant::now(),
            ..frame.clone()
        })
    }

    fn close(&mut self) -> BackendResult<()> {
        self.frame = None;
        Ok(())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::ImageFile
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_image_extension() {
        let err = load_image_as_frame(Path::new("/tmp/clip.mp4")).unwrap_err();
        assert!(matches!(err, BackendError::FormatNotSupported(_)));
    }

    #[test]
    fn test_missing_image_fails_to_open() {
        let mut backend = ImageFileBackend::new(PathBuf::from("/nonexistent/code.png"));
        let requested = CaptureFormat {
            width: 640,
            height: 480,
            framerate: None,
            pixel_format: PixelFormat::YUYV,
        };
        assert!(backend.open(0, &requested).is_err());
        assert_eq!(backend.read().unwrap_err(), BackendError::NotOpen);
    }

    #[test]
    fn test_serves_image_repeatedly() {
        let dir = std::env::temp_dir().join(format!("scanner-image-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("still.png");
        image::RgbaImage::from_pixel(8, 6, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let mut backend = ImageFileBackend::new(path);
        let requested = CaptureFormat {
            width: 640,
            height: 480,
            framerate: Some(Framerate::from_int(100)),
            pixel_format: PixelFormat::YUYV,
        };
        let handle = backend.open(0, &requested).unwrap();
        assert_eq!((handle.format.width, handle.format.height), (8, 6));

        let a = backend.read().unwrap();
        let b = backend.read().unwrap();
        assert_eq!(a.data_slice(), b.data_slice());
        assert_eq!(a.format, PixelFormat::RGBA);

        backend.close().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_zero_framerate_falls_back_to_default() {
        let dir = std::env::temp_dir().join(format!("scanner-zero-fps-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("still.png");
        image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let mut backend = ImageFileBackend::new(path);
        let requested = CaptureFormat {
            width: 640,
            height: 480,
            framerate: Some(Framerate::from_int(0)),
            pixel_format: PixelFormat::YUYV,
        };
        let handle = backend.open(0, &requested).unwrap();
        assert_eq!(handle.format.framerate, Some(Framerate::default()));

        // Reads stay paced at the default rate
        let started = Instant::now();
        let mut reads = 0;
        while started.elapsed() < Duration::from_millis(100) {
            backend.read().unwrap();
            reads += 1;
        }
        assert!(reads <= 10, "served {} frames in 100 ms", reads);

        backend.close().unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
