// SPDX-License-Identifier: GPL-3.0-only

//! Scriptable in-memory camera
//!
//! Lets the pipeline run without hardware. A [`MockControl`] handle, shared
//! with the [`MockCamera`] it was created with, decides which device indices
//! open, what each read returns and records every open and close so tests
//! can check that a device is released exactly once.
//!
//! Frames can carry a planted payload that [`PlantedPayloadDecoder`] reads
//! back, which stands in for a real QR symbol.

use super::types::{
    BackendError, BackendResult, CameraBackendType, CameraFrame, CaptureFormat, DeviceHandle,
    PixelFormat,
};
use super::CameraBackend;
use crate::frame_processor::tasks::SymbolDecoder;
use crate::frame_processor::types::RawSymbol;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Marker that prefixes a planted payload inside a mock frame
const PAYLOAD_MARKER: &[u8] = b"QRMK";

/// Delay between successful mock frames
const FRAME_INTERVAL: Duration = Duration::from_millis(2);

/// Delay before a scripted failure is reported
const FAIL_DELAY: Duration = Duration::from_millis(1);

/// Outcome of one scripted read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockRead {
    /// Deliver a frame, optionally carrying a planted payload
    Frame(Option<Vec<u8>>),
    /// Report a backend I/O failure
    Fail,
    /// Block for the given time, then report a timeout
    Stall(Duration),
}

#[derive(Debug)]
struct Script {
    available: Vec<u32>,
    queue: VecDeque<MockRead>,
    fallback: MockRead,
    open: bool,
    open_attempts: u32,
    opens: u32,
    closes: u32,
    reads: u64,
    double_acquired: bool,
}

/// Test-side handle to a [`MockCamera`]
#[derive(Debug, Clone)]
pub struct MockControl {
    script: Arc<Mutex<Script>>,
}

impl MockControl {
    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Device indices that open successfully (default: `[0]`)
    pub fn set_available(&self, indices: &[u32]) {
        self.lock().available = indices.to_vec();
    }

    /// Queue reads to be served before the fallback
    pub fn push_reads(&self, reads: impl IntoIterator<Item = MockRead>) {
        self.lock().queue.extend(reads);
    }

    /// What every read returns once the queue is empty (default: a blank frame)
    pub fn set_fallback(&self, read: MockRead) {
        self.lock().fallback = read;
    }

    pub fn open_attempts(&self) -> u32 {
        self.lock().open_attempts
    }

    pub fn opens(&self) -> u32 {
        self.lock().opens
    }

    pub fn closes(&self) -> u32 {
        self.lock().closes
    }

    pub fn reads(&self) -> u64 {
        self.lock().reads
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// True if the device was ever opened while already held
    pub fn double_acquired(&self) -> bool {
        self.lock().double_acquired
    }
}

pub struct MockCamera {
    control: MockControl,
    format: Option<CaptureFormat>,
}

impl MockCamera {
    /// Create a camera together with its control handle
    pub fn new() -> (Self, MockControl) {
        let control = MockControl {
            script: Arc::new(Mutex::new(Script {
                available: vec![0],
                queue: VecDeque::new(),
                fallback: MockRead::Frame(None),
                open: false,
                open_attempts: 0,
                opens: 0,
                closes: 0,
                reads: 0,
                double_acquired: false,
            })),
        };
        (
            Self {
                control: control.clone(),
                format: None,
            },
            control,
        )
    }
}

impl CameraBackend for MockCamera {
    fn open(&mut self, index: u32, requested: &CaptureFormat) -> BackendResult<DeviceHandle> {
        let mut script = self.control.lock();
        script.open_attempts += 1;

        if !script.available.contains(&index) {
            return Err(BackendError::DeviceNotFound(format!("mock camera {}", index)));
        }
        if script.open {
            script.double_acquired = true;
            return Err(BackendError::Busy(format!("mock camera {}", index)));
        }

        script.open = true;
        script.opens += 1;
        let format = CaptureFormat {
            pixel_format: PixelFormat::Gray8,
            ..requested.clone()
        };
        self.format = Some(format.clone());

        Ok(DeviceHandle {
            index,
            name: format!("Mock Camera {}", index),
            format,
        })
    }

    fn read(&mut self) -> BackendResult<CameraFrame> {
        let next = {
            let mut script = self.control.lock();
            if !script.open {
                return Err(BackendError::NotOpen);
            }
            script.reads += 1;
            match script.queue.pop_front() {
                Some(read) => read,
                None => script.fallback.clone(),
            }
        };

        match next {
            MockRead::Frame(payload) => {
                thread::sleep(FRAME_INTERVAL);
                Ok(match payload {
                    Some(payload) => planted_frame(&payload),
                    None => blank_frame(self.format.as_ref()),
                })
            }
            MockRead::Fail => {
                thread::sleep(FAIL_DELAY);
                Err(BackendError::IoError("scripted read failure".into()))
            }
            MockRead::Stall(duration) => {
                thread::sleep(duration);
                Err(BackendError::Timeout)
            }
        }
    }

    fn close(&mut self) -> BackendResult<()> {
        let mut script = self.control.lock();
        if script.open {
            script.open = false;
            script.closes += 1;
        }
        self.format = None;
        Ok(())
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Mock
    }
}

/// A small grey frame with no payload
fn blank_frame(format: Option<&CaptureFormat>) -> CameraFrame {
    let (width, height) = format
        .map(|f| (f.width.clamp(1, 64), f.height.clamp(1, 48)))
        .unwrap_or((64, 48));
    CameraFrame::from_packed(
        width,
        height,
        PixelFormat::Gray8,
        vec![0x80; (width * height) as usize],
    )
}

/// A one-row Gray8 frame whose bytes are the marker followed by `payload`
pub fn planted_frame(payload: &[u8]) -> CameraFrame {
    let mut data = PAYLOAD_MARKER.to_vec();
    data.extend_from_slice(payload);
    CameraFrame::from_packed(data.len() as u32, 1, PixelFormat::Gray8, data)
}

/// Decoder that finds payloads planted by [`planted_frame`]
#[derive(Debug, Default, Clone, Copy)]
pub struct PlantedPayloadDecoder;

impl SymbolDecoder for PlantedPayloadDecoder {
    fn decode(&self, frame: &CameraFrame) -> Vec<RawSymbol> {
        match frame.data_slice().strip_prefix(PAYLOAD_MARKER) {
            Some(payload) => vec![RawSymbol {
                payload: payload.to_vec(),
                bounds: None,
            }],
            None => Vec::new(),
        }
    }
}
