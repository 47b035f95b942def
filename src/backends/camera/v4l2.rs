// SPDX-License-Identifier: GPL-3.0-only
//! V4L2 webcam backend
//!
//! Opens `/dev/videoN`, asks for YUYV at the requested size (falling back to
//! MJPEG, then to whatever the driver already has configured) and streams
//! through memory-mapped buffers. The requested size and rate are hints only;
//! the negotiated format is logged and reported in the device handle.

use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraDevice, CameraFrame, CaptureFormat,
    DeviceHandle, Framerate, PixelFormat,
};
use super::CameraBackend;
use crate::constants::capture;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::video::capture::Parameters;
use v4l::{Format, FourCC};

/// ENODEV, reported once a USB camera has been unplugged
const ENODEV: i32 = 19;

pub struct V4l2Backend {
    // Field order matters: the stream must be released before the device
    stream: Option<Stream<'static>>,
    device: Option<Device>,
    format: Option<CaptureFormat>,
    read_timeout: Duration,
}

impl V4l2Backend {
    pub fn new(read_timeout: Duration) -> Self {
        Self {
            stream: None,
            device: None,
            format: None,
            read_timeout,
        }
    }

    /// Negotiate a capture format, preferring raw YUYV over MJPEG
    fn negotiate(dev: &Device, requested: &CaptureFormat) -> BackendResult<Format> {
        let preferred = [requested.pixel_format, PixelFormat::YUYV, PixelFormat::MJPEG];

        for pixel_format in preferred {
            let wanted = Format::new(
                requested.width,
                requested.height,
                FourCC::new(&pixel_format.fourcc()),
            );
            match dev.set_format(&wanted) {
                Ok(actual) if PixelFormat::from_fourcc(&actual.fourcc.repr).is_some() => {
                    return Ok(actual);
                }
                Ok(actual) => {
                    debug!(fourcc = %actual.fourcc, "Driver substituted unsupported format");
                }
                Err(e) => {
                    debug!(format = %pixel_format, error = %e, "Format rejected");
                }
            }
        }

        // Last resort: keep whatever the driver is already configured for
        let current = dev
            .format()
            .map_err(|e| BackendError::FormatNotSupported(e.to_string()))?;
        if PixelFormat::from_fourcc(&current.fourcc.repr).is_none() {
            return Err(BackendError::FormatNotSupported(format!(
                "device only offers {}",
                current.fourcc
            )));
        }
        warn!(
            width = current.width,
            height = current.height,
            fourcc = %current.fourcc,
            "Could not apply requested format, using current device format"
        );
        Ok(current)
    }
}

impl CameraBackend for V4l2Backend {
    fn open(&mut self, index: u32, requested: &CaptureFormat) -> BackendResult<DeviceHandle> {
        if self.device.is_some() {
            return Err(BackendError::Busy("backend already has an open device".into()));
        }

        let path = format!("/dev/video{}", index);
        let dev = Device::new(index as usize).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BackendError::DeviceNotFound(path.clone()),
            io::ErrorKind::PermissionDenied => {
                BackendError::NotAvailable(format!("{}: permission denied", path))
            }
            _ => BackendError::IoError(format!("{}: {}", path, e)),
        })?;

        let caps = dev
            .query_caps()
            .map_err(|e| BackendError::IoError(format!("{}: {}", path, e)))?;
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            return Err(BackendError::NotAvailable(format!(
                "{} ({}) is not a capture device",
                path, caps.card
            )));
        }

        let actual = Self::negotiate(&dev, requested)?;
        let pixel_format = PixelFormat::from_fourcc(&actual.fourcc.repr)
            .ok_or_else(|| BackendError::FormatNotSupported(actual.fourcc.to_string()))?;

        let framerate = requested.framerate.and_then(|fps| {
            match dev.set_params(&Parameters::with_fps(fps.as_int())) {
                Ok(params) => Some(Framerate::new(
                    params.interval.denominator,
                    params.interval.numerator,
                )),
                Err(e) => {
                    debug!(error = %e, "Device refused framerate request");
                    None
                }
            }
        });

        let mut stream = Stream::with_buffers(&dev, Type::VideoCapture, capture::MMAP_BUFFER_COUNT)
            .map_err(|e| match e.raw_os_error() {
                Some(16) => BackendError::Busy(path.clone()),
                _ => BackendError::IoError(format!("Failed to create stream: {}", e)),
            })?;
        stream.set_timeout(self.read_timeout);

        let format = CaptureFormat {
            width: actual.width,
            height: actual.height,
            framerate,
            pixel_format,
        };

        info!(
            path = %path,
            card = %caps.card,
            driver = %caps.driver,
            format = %format,
            "V4L2 camera opened"
        );

        self.stream = Some(stream);
        self.device = Some(dev);
        self.format = Some(format.clone());

        Ok(DeviceHandle {
            index,
            name: caps.card,
            format,
        })
    }

    fn read(&mut self) -> BackendResult<CameraFrame> {
        let format = self.format.as_ref().ok_or(BackendError::NotOpen)?;
        let stream = self.stream.as_mut().ok_or(BackendError::NotOpen)?;

        let (buf, meta) = stream.next().map_err(|e| {
            if e.kind() == io::ErrorKind::TimedOut {
                BackendError::Timeout
            } else if e.raw_os_error() == Some(ENODEV) {
                BackendError::Disconnected
            } else {
                BackendError::IoError(e.to_string())
            }
        })?;

        // Compressed frames only fill part of the mapped buffer
        let used = (meta.bytesused as usize).min(buf.len());
        let data: &[u8] = if used > 0 { &buf[..used] } else { buf };

        if format.pixel_format != PixelFormat::MJPEG {
            let bpp = format.pixel_format.bytes_per_pixel().unwrap_or(1);
            let expected = (format.width * format.height * bpp) as usize;
            if data.len() < expected {
                return Err(BackendError::IoError(format!(
                    "short frame: {} of {} bytes",
                    data.len(),
                    expected
                )));
            }
        }

        let stride = format
            .pixel_format
            .bytes_per_pixel()
            .map(|bpp| format.width * bpp)
            .unwrap_or(0);

        Ok(CameraFrame {
            width: format.width,
            height: format.height,
            data: Arc::from(data),
            format: format.pixel_format,
            stride,
            sequence: 0,
            captured_at: Instant::now(),
        })
    }

    fn close(&mut self) -> BackendResult<()> {
        // Dropping the stream issues STREAMOFF and unmaps the buffers
        if self.stream.take().is_some() {
            debug!("V4L2 stream released");
        }
        self.format = None;
        if self.device.take().is_some() {
            info!("V4L2 camera closed");
        }
        Ok(())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}

impl Drop for V4l2Backend {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// List V4L2 capture devices by scanning `/dev/video*`
pub fn enumerate_cameras() -> Vec<CameraDevice> {
    let mut cameras = Vec::new();

    for entry in std::fs::read_dir("/dev").into_iter().flatten().flatten() {
        let path = entry.path();
        let Some(index) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix("video"))
            .and_then(|n| n.parse::<u32>().ok())
        else {
            continue;
        };

        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        // Skip metadata nodes that many UVC cameras expose next to the video node
        if !caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
            continue;
        }

        let device = CameraDevice {
            index,
            name: caps.card.clone(),
            path: path.to_string_lossy().to_string(),
            driver: caps.driver.clone(),
        };
        debug!(name = %device.name, path = %device.path, "Found V4L2 camera");
        cameras.push(device);
    }

    cameras.sort_by_key(|c| c.index);
    cameras
}
