// SPDX-License-Identifier: GPL-3.0-only
// Camera backend with trait-based abstraction

//! Camera backend abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │    ScanPipeline     │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │     FrameSource     │  ← Candidate selection, failure counting
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ CameraBackend Trait │  ← Common interface
//! └──────────┬──────────┘
//!            │
//!      ┌─────┼───────────┐
//!      ▼     ▼           ▼
//!   ┌────┐ ┌──────────┐ ┌────┐
//!   │V4L2│ │Image file│ │Mock│
//!   └────┘ └──────────┘ └────┘
//! ```

pub mod format_converters;
pub mod frame_loop;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod source;
pub mod types;
pub mod v4l2;

pub use frame_loop::{CaptureLoopController, LoopAction, StopSignal};
pub use source::{FailureCounter, FrameSource};
pub use types::*;

use std::path::PathBuf;
use std::time::Duration;

/// Camera backend trait
///
/// A backend drives exactly one device at a time. `open` must fail rather
/// than silently re-acquire when a device is already held, and `read` must
/// return within the backend's read timeout so the capture loop can observe
/// stop requests.
pub trait CameraBackend: Send {
    /// Acquire device `index` and start streaming
    ///
    /// `requested` is a hint. The returned handle carries the format the
    /// device actually agreed to.
    fn open(&mut self, index: u32, requested: &CaptureFormat) -> BackendResult<DeviceHandle>;

    /// Block until the next frame arrives or the read timeout elapses
    fn read(&mut self) -> BackendResult<CameraFrame>;

    /// Stop streaming and release the device. Closing a closed backend is a no-op.
    fn close(&mut self) -> BackendResult<()>;

    /// Get the backend type identifier
    fn backend_type(&self) -> CameraBackendType;
}

/// Pick a backend: a still image when one is given, otherwise V4L2
pub fn backend_for(image: Option<PathBuf>, read_timeout: Duration) -> Box<dyn CameraBackend> {
    match image {
        Some(path) => Box::new(crate::backends::virtual_camera::ImageFileBackend::new(path)),
        None => Box::new(v4l2::V4l2Backend::new(read_timeout)),
    }
}
