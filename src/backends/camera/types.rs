// SPDX-License-Identifier: GPL-3.0-only
// Shared types for camera backend abstraction

//! Shared types for camera backends

use std::sync::Arc;
use std::time::Instant;

/// Camera backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraBackendType {
    /// Video4Linux2 capture device
    #[default]
    V4l2,
    /// Still image served as a camera
    ImageFile,
    /// Scripted in-memory camera
    Mock,
}

impl std::fmt::Display for CameraBackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraBackendType::V4l2 => write!(f, "V4L2"),
            CameraBackendType::ImageFile => write!(f, "image file"),
            CameraBackendType::Mock => write!(f, "mock"),
        }
    }
}

/// Represents a camera device found during enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Index used to open the device (N in /dev/videoN)
    pub index: u32,
    /// Human readable name (V4L2 card)
    pub name: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
}

/// An opened camera: which device was picked and what it agreed to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceHandle {
    /// Candidate index that opened successfully
    pub index: u32,
    /// Human readable device name
    pub name: String,
    /// Format the device actually negotiated
    pub format: CaptureFormat,
}

/// Framerate as a fraction (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Framerate {
    pub num: u32,
    pub denom: u32,
}

impl Framerate {
    /// Create a new framerate from numerator and denominator
    pub fn new(num: u32, denom: u32) -> Self {
        Self {
            num,
            denom: if denom == 0 { 1 } else { denom },
        }
    }

    /// Create a framerate from an integer (e.g., 30 becomes 30/1)
    pub fn from_int(fps: u32) -> Self {
        Self { num: fps, denom: 1 }
    }

    /// Get the framerate as a floating point value
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.denom as f64
    }

    /// Get the rounded-down integer framerate
    pub fn as_int(&self) -> u32 {
        self.num / self.denom
    }

    /// Duration of one frame at this rate
    pub fn frame_interval(&self) -> std::time::Duration {
        if self.num == 0 {
            return std::time::Duration::ZERO;
        }
        std::time::Duration::from_secs_f64(self.denom as f64 / self.num as f64)
    }
}

impl std::fmt::Display for Framerate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denom != 1 {
            write!(f, "{:.2}", self.as_f64())
        } else {
            write!(f, "{}", self.num)
        }
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self { num: 30, denom: 1 }
    }
}

/// Requested or negotiated capture format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: Option<Framerate>,
    pub pixel_format: PixelFormat,
}

impl std::fmt::Display for CaptureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(fps) = &self.framerate {
            write!(
                f,
                "{}x{} @ {}fps ({})",
                self.width, self.height, fps, self.pixel_format
            )
        } else {
            write!(f, "{}x{} ({})", self.width, self.height, self.pixel_format)
        }
    }
}

/// Pixel format for camera frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    /// Used for display frames and still images
    RGBA,
    /// RGB24 - 24-bit RGB (3 bytes per pixel, no alpha)
    RGB24,
    /// Gray8 - 8-bit grayscale (single channel)
    Gray8,
    /// YUYV - Packed 4:2:2 (Y0 U Y1 V interleaved)
    /// Common raw format from webcam sensors
    YUYV,
    /// UYVY - Packed 4:2:2 (U Y0 V Y1 interleaved)
    UYVY,
    /// Motion JPEG - each frame is a complete JPEG image
    MJPEG,
}

impl PixelFormat {
    /// Bytes per pixel for uncompressed layouts, `None` for MJPEG
    pub fn bytes_per_pixel(&self) -> Option<u32> {
        match self {
            Self::RGBA => Some(4),
            Self::RGB24 => Some(3),
            Self::Gray8 => Some(1),
            Self::YUYV | Self::UYVY => Some(2),
            Self::MJPEG => None,
        }
    }

    /// Parse a V4L2 FourCC code
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"YUYV" => Some(Self::YUYV),
            b"UYVY" => Some(Self::UYVY),
            b"MJPG" => Some(Self::MJPEG),
            b"GREY" => Some(Self::Gray8),
            b"RGB3" => Some(Self::RGB24),
            b"AB24" => Some(Self::RGBA),
            _ => None,
        }
    }

    /// V4L2 FourCC code for this format
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::YUYV => *b"YUYV",
            Self::UYVY => *b"UYVY",
            Self::MJPEG => *b"MJPG",
            Self::Gray8 => *b"GREY",
            Self::RGB24 => *b"RGB3",
            Self::RGBA => *b"AB24",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::RGBA => "RGBA",
            Self::RGB24 => "RGB24",
            Self::Gray8 => "GRAY8",
            Self::YUYV => "YUYV",
            Self::UYVY => "UYVY",
            Self::MJPEG => "MJPEG",
        };
        write!(f, "{}", name)
    }
}

/// A single frame from the camera
///
/// Frames are immutable once built: the pixel buffer is shared behind an
/// `Arc`, so handing a frame to both the decoder and the display path never
/// copies or mutates it. Annotation produces a new frame.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data (or a complete JPEG image for MJPEG)
    pub data: Arc<[u8]>,
    /// Pixel format of the data
    pub format: PixelFormat,
    /// Row stride in bytes (may include padding, unused for MJPEG)
    pub stride: u32,
    /// Arrival order, assigned by the frame source
    pub sequence: u64,
    /// Timestamp when frame was captured (for latency diagnostics)
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Build a tightly packed frame from owned bytes
    pub fn from_packed(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        let stride = format.bytes_per_pixel().map(|bpp| width * bpp).unwrap_or(0);
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format,
            stride,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    /// Raw frame bytes
    pub fn data_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error types for backend operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Backend is not available on this system
    NotAvailable(String),
    /// Camera device not found
    DeviceNotFound(String),
    /// Format not supported
    FormatNotSupported(String),
    /// Device is held by another process
    Busy(String),
    /// No frame arrived within the read timeout
    Timeout,
    /// Device disappeared while streaming
    Disconnected,
    /// No device is open
    NotOpen,
    /// General I/O error
    IoError(String),
    /// Other errors
    Other(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::NotAvailable(msg) => write!(f, "Backend not available: {}", msg),
            BackendError::DeviceNotFound(msg) => write!(f, "Device not found: {}", msg),
            BackendError::FormatNotSupported(msg) => write!(f, "Format not supported: {}", msg),
            BackendError::Busy(msg) => write!(f, "Device busy: {}", msg),
            BackendError::Timeout => write!(f, "Timed out waiting for frame"),
            BackendError::Disconnected => write!(f, "Device disconnected"),
            BackendError::NotOpen => write!(f, "Device not open"),
            BackendError::IoError(msg) => write!(f, "I/O error: {}", msg),
            BackendError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<BackendError> for crate::errors::ReadError {
    fn from(err: BackendError) -> Self {
        use crate::errors::ReadError;
        match err {
            BackendError::Timeout => ReadError::Timeout,
            BackendError::Disconnected => ReadError::Disconnected,
            BackendError::NotOpen => ReadError::NotOpen,
            other => ReadError::Backend(other.to_string()),
        }
    }
}
