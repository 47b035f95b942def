// SPDX-License-Identifier: GPL-3.0-only

//! Frame source: owns the camera device for the scan pipeline
//!
//! Wraps a [`CameraBackend`] with candidate-device selection, the
//! consecutive read-failure counter and arrival sequence numbering.

use super::types::{CameraFrame, CaptureFormat, DeviceHandle};
use super::CameraBackend;
use crate::errors::{OpenError, ReadError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, error, info, warn};

/// Consecutive failed reads, shared read-only with the pipeline
///
/// Only the owning [`FrameSource`] writes it.
#[derive(Debug, Clone, Default)]
pub struct FailureCounter(Arc<AtomicU32>);

impl FailureCounter {
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

pub struct FrameSource {
    backend: Box<dyn CameraBackend>,
    requested: CaptureFormat,
    handle: Option<DeviceHandle>,
    failures: FailureCounter,
    next_sequence: u64,
}

impl FrameSource {
    /// Create a closed source; `requested` is the capture hint passed on open
    pub fn new(backend: Box<dyn CameraBackend>, requested: CaptureFormat) -> Self {
        Self {
            backend,
            requested,
            handle: None,
            failures: FailureCounter::default(),
            next_sequence: 0,
        }
    }

    /// Try each candidate index in order; the first one that opens wins
    pub fn open(&mut self, candidates: &[u32]) -> Result<DeviceHandle, OpenError> {
        if self.handle.is_some() {
            error!("open called on a frame source that is already open");
            return Err(OpenError::AlreadyOpen);
        }

        for &index in candidates {
            match self.backend.open(index, &self.requested) {
                Ok(handle) => {
                    if handle.format.width != self.requested.width
                        || handle.format.height != self.requested.height
                    {
                        info!(
                            requested = %self.requested,
                            actual = %handle.format,
                            "Camera ignored capture hint"
                        );
                    }
                    info!(
                        index,
                        name = %handle.name,
                        backend = %self.backend.backend_type(),
                        "Camera opened"
                    );
                    self.failures.reset();
                    self.handle = Some(handle.clone());
                    return Ok(handle);
                }
                Err(e) => {
                    warn!(index, error = %e, "Failed to open camera");
                }
            }
        }

        Err(OpenError::NoDeviceAvailable {
            tried: candidates.to_vec(),
        })
    }

    /// Read the next frame, updating the failure counter
    pub fn read_frame(&mut self) -> Result<CameraFrame, ReadError> {
        if self.handle.is_none() {
            self.failures.increment();
            return Err(ReadError::NotOpen);
        }

        match self.backend.read() {
            Ok(mut frame) => {
                self.failures.reset();
                frame.sequence = self.next_sequence;
                self.next_sequence += 1;
                Ok(frame)
            }
            Err(e) => {
                let failures = self.failures.increment();
                debug!(failures, error = %e, "Frame read failed");
                Err(e.into())
            }
        }
    }

    /// Release the device. Safe to call on a closed source.
    pub fn close(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Err(e) = self.backend.close() {
            warn!(index = handle.index, error = %e, "Error while releasing camera");
        } else {
            info!(index = handle.index, "Camera released");
        }
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// The currently opened device, if any
    pub fn device(&self) -> Option<&DeviceHandle> {
        self.handle.as_ref()
    }

    pub fn failure_counter(&self) -> FailureCounter {
        self.failures.clone()
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
