// SPDX-License-Identifier: GPL-3.0-only

//! Inventory Scanner - live QR code scanning for the inventory manager
//!
//! Reads frames from a webcam, looks for QR codes carrying product records
//! and exposes the latest frame and the latest scanned product to whatever
//! front-end polls it, while tolerating camera hiccups.
//!
//! # Architecture
//!
//! - [`backends`]: Camera backends (V4L2, still image, and a mock behind the
//!   `mock` feature) and the frame source
//! - [`frame_processor`]: QR detection, product record parsing, dedup
//! - [`pipelines`]: The threaded scan pipeline and its state machine
//! - [`config`]: User configuration handling
//! - [`storage`]: Snapshot and log file locations
//! - [`terminal`]: Terminal front-end
//!
//! # Example
//!
//! ```ignore
//! let config = Config::load();
//! let source = FrameSource::new(backend_for(None, config.read_timeout()), format);
//! let pipeline = ScanPipeline::new(source, QrDetector::new(), ScanSettings::from_config(&config));
//! pipeline.start()?;
//! if let Some(record) = pipeline.latest_record() {
//!     println!("{}", record.name);
//! }
//! pipeline.stop();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod frame_processor;
pub mod pipelines;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use backends::camera::{CameraFrame, FrameSource};
pub use config::Config;
pub use errors::{AppError, AppResult, OpenError, ParseError, PipelineError, ReadError};
pub use frame_processor::{DecodedRecord, QrDetector, SymbolDecoder};
pub use pipelines::scan::{PipelineState, ScanPipeline, ScanSettings, ScanStatus};

use backends::camera::types::{CaptureFormat, Framerate, PixelFormat};
use std::path::PathBuf;

/// Capture hint derived from the config
pub fn requested_format(config: &Config) -> CaptureFormat {
    CaptureFormat {
        width: config.capture_width,
        height: config.capture_height,
        framerate: Some(Framerate::from_int(config.capture_fps)),
        pixel_format: PixelFormat::YUYV,
    }
}

/// Build a QR scan pipeline from the config
///
/// Uses the still image at `image` instead of a camera when given.
pub fn build_pipeline(config: &Config, image: Option<PathBuf>) -> ScanPipeline {
    let backend = backends::camera::backend_for(image, config.read_timeout());
    let source = FrameSource::new(backend, requested_format(config));
    ScanPipeline::new(
        source,
        QrDetector::with_max_dimension(config.decode_max_dimension),
        ScanSettings::from_config(config),
    )
}
