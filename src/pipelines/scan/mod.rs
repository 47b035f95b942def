// SPDX-License-Identifier: GPL-3.0-only

//! Live QR scanning pipeline
//!
//! ```text
//!                ┌──────────────────── capture thread ───────────────────┐
//! FrameSource ──▶│ read_frame ──▶ display_frame ──▶ LatestSlot<frame>    │──▶ UI poll
//!                │      │                                                │
//!                │      └──▶ FrameHandoff (depth one)                    │
//!                └──────────────────────┬────────────────────────────────┘
//!                                       ▼
//!                ┌──────────────────── decode thread ────────────────────┐
//!                │ decode ──▶ parse ──▶ dedup ──▶ LatestSlot<record>     │──▶ UI poll
//!                └───────────────────────────────────────────────────────┘
//! ```
//!
//! The capture thread owns the [`FrameSource`] for as long as it runs and
//! hands it back when joined, so the device is only ever touched by one
//! thread at a time. It also performs automatic recovery: after
//! `failure_threshold` consecutive failed reads it closes the device and
//! re-opens it with a back-off until a frame arrives again.
//!
//! All control operations serialize through one mutex. State changes made by
//! the workers go through [`PipelineState::can_transition_to`], so a `stop()`
//! that already moved the pipeline to `Stopped` cannot be undone by a worker.

mod overlay;
mod slot;
mod state;

pub use overlay::display_frame;
pub use slot::{FrameHandoff, LatestSlot};
pub use state::{PipelineState, ScanStatus};

use crate::backends::camera::frame_loop::{CaptureLoopController, LoopAction, StopSignal};
use crate::backends::camera::source::{FailureCounter, FrameSource};
use crate::backends::camera::types::CameraFrame;
use crate::config::Config;
use crate::constants::timing;
use crate::errors::PipelineError;
use crate::frame_processor::dedup::Deduplicator;
use crate::frame_processor::record;
use crate::frame_processor::tasks::{QrDetector, SymbolDecoder};
use crate::frame_processor::types::DecodedRecord;
use slot::lock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};

/// Pipeline tuning, usually derived from [`Config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Camera indices tried in order on every open
    pub candidate_devices: Vec<u32>,
    /// Consecutive failed reads that trigger a device restart
    pub failure_threshold: u32,
    /// Delay before each re-open attempt during recovery
    pub restart_backoff: Duration,
    /// Draw the scan guide rectangle on display frames
    pub show_scan_region: bool,
    /// Mirror display frames horizontally
    pub mirror_preview: bool,
}

impl ScanSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            candidate_devices: config.candidate_devices.clone(),
            failure_threshold: config.failure_threshold.max(1),
            restart_backoff: config.restart_backoff(),
            show_scan_region: config.show_scan_region,
            mirror_preview: config.mirror_preview,
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// State shared between the control path and both workers
#[derive(Default)]
struct Shared {
    state: Mutex<PipelineState>,
    last_error: Mutex<Option<PipelineError>>,
    frame: LatestSlot<CameraFrame>,
    record: LatestSlot<DecodedRecord>,
    handoff: FrameHandoff<Arc<CameraFrame>>,
    dedup: Mutex<Deduplicator>,
    frames_captured: AtomicU64,
}

impl Shared {
    fn state(&self) -> PipelineState {
        *lock(&self.state)
    }

    /// Apply an automatic transition if it is allowed from the current state
    fn advance(&self, next: PipelineState) -> bool {
        let mut state = lock(&self.state);
        let from = *state;
        if from.can_transition_to(next) {
            debug!(from = %from, to = %next, "Pipeline state change");
            *state = next;
            true
        } else {
            false
        }
    }

    /// Set the state unconditionally (control path only)
    fn force(&self, next: PipelineState) {
        let mut state = lock(&self.state);
        let from = *state;
        if from != next {
            debug!(from = %from, to = %next, "Pipeline state forced");
            *state = next;
        }
    }

    fn set_error(&self, err: PipelineError) {
        *lock(&self.last_error) = Some(err);
    }

    fn clear_error(&self) {
        lock(&self.last_error).take();
    }
}

/// Where the capture worker is in the device lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapturePhase {
    /// First open after start / restart
    Opening,
    /// Device open, reading frames
    Streaming,
    /// Device closed after repeated failures, next open attempt at the deadline
    Reopening { next_attempt: Instant },
}

/// State owned by the capture thread
struct CaptureWorker {
    source: FrameSource,
    failures: FailureCounter,
    phase: CapturePhase,
    shared: Arc<Shared>,
    settings: ScanSettings,
}

impl CaptureWorker {
    fn step(&mut self, stop: &StopSignal) -> LoopAction {
        match self.phase {
            CapturePhase::Opening => self.open_initial(),
            CapturePhase::Streaming => self.read_one(),
            CapturePhase::Reopening { next_attempt } => self.reopen(next_attempt, stop),
        }
    }

    fn open_initial(&mut self) -> LoopAction {
        match self.source.open(&self.settings.candidate_devices) {
            Ok(handle) => {
                if !self.shared.advance(PipelineState::Running) {
                    // stop() won the race; the control path closes the device
                    return LoopAction::Stop;
                }
                info!(
                    index = handle.index,
                    name = %handle.name,
                    format = %handle.format,
                    "Scanning started"
                );
                self.phase = CapturePhase::Streaming;
                LoopAction::Continue
            }
            Err(e) => {
                error!(error = %e, "Could not start camera");
                self.shared.set_error(PipelineError::Open(e));
                self.shared.advance(PipelineState::Stopped);
                LoopAction::Stop
            }
        }
    }

    fn read_one(&mut self) -> LoopAction {
        match self.source.read_frame() {
            Ok(frame) => {
                if self.shared.state() == PipelineState::Restarting
                    && self.shared.advance(PipelineState::Running)
                {
                    info!("Camera recovered");
                }

                let count = self.shared.frames_captured.fetch_add(1, Ordering::Relaxed);
                if count % timing::FRAME_LOG_INTERVAL == 0 {
                    debug!(
                        frame = count,
                        sequence = frame.sequence,
                        width = frame.width,
                        height = frame.height,
                        format = %frame.format,
                        "Capture progress"
                    );
                }

                let frame = Arc::new(frame);
                if self.shared.handoff.offer(Arc::clone(&frame)).is_some() {
                    trace!("Decoder busy, dropped older frame");
                }
                if let Some(shown) = display_frame(
                    &frame,
                    self.settings.show_scan_region,
                    self.settings.mirror_preview,
                ) {
                    self.shared.frame.publish(Arc::new(shown));
                }
                LoopAction::Continue
            }
            Err(e) => {
                let failures = self.failures.get();
                trace!(failures, error = %e, "Frame read failed");
                if failures >= self.settings.failure_threshold {
                    self.begin_recovery(failures)
                } else {
                    LoopAction::Continue
                }
            }
        }
    }

    fn begin_recovery(&mut self, failures: u32) -> LoopAction {
        let state = self.shared.state();
        if state != PipelineState::Restarting && !self.shared.advance(PipelineState::Restarting) {
            return LoopAction::Stop;
        }
        match self.source.device() {
            Some(device) => warn!(
                failures,
                index = device.index,
                name = %device.name,
                "Camera stopped delivering frames, restarting it"
            ),
            None => warn!(failures, "Camera stopped delivering frames, restarting it"),
        }

        self.source.close();
        self.shared.handoff.clear();
        self.phase = CapturePhase::Reopening {
            next_attempt: Instant::now() + self.settings.restart_backoff,
        };
        LoopAction::Continue
    }

    fn reopen(&mut self, next_attempt: Instant, stop: &StopSignal) -> LoopAction {
        let wait = next_attempt.saturating_duration_since(Instant::now());
        if !stop.sleep(wait) {
            return LoopAction::Stop;
        }

        match self.source.open(&self.settings.candidate_devices) {
            Ok(handle) => {
                // Running again only once a frame actually arrives
                info!(index = handle.index, "Camera re-opened");
                self.phase = CapturePhase::Streaming;
            }
            Err(e) => {
                warn!(error = %e, "Camera re-open failed, retrying");
                self.phase = CapturePhase::Reopening {
                    next_attempt: Instant::now() + self.settings.restart_backoff,
                };
            }
        }
        LoopAction::Continue
    }
}

/// State owned by the decode thread
struct DecodeWorker<D> {
    decoder: Arc<D>,
    shared: Arc<Shared>,
}

impl<D: SymbolDecoder> DecodeWorker<D> {
    fn step(&mut self) -> LoopAction {
        if self.shared.state() == PipelineState::Stopped {
            return LoopAction::Stop;
        }
        let Some(frame) = self.shared.handoff.take_timeout(timing::DECODE_WAIT) else {
            return LoopAction::Continue;
        };

        let (payloads, records): (Vec<Vec<u8>>, Vec<DecodedRecord>) = self
            .decoder
            .decode(&frame)
            .into_iter()
            .filter_map(|symbol| match record::parse(&symbol.payload) {
                Ok(record) => Some((symbol.payload, record)),
                Err(e) => {
                    debug!(error = %e, "Ignoring unusable QR payload");
                    None
                }
            })
            .unzip();

        if !payloads.is_empty() {
            self.publish(payloads, records, frame.sequence);
        }
        LoopAction::Continue
    }

    /// Publish the records whose payload was not already in view
    fn publish(&self, payloads: Vec<Vec<u8>>, records: Vec<DecodedRecord>, sequence: u64) {
        // Held across publish so reset_detection cannot interleave
        let mut dedup = lock(&self.shared.dedup);
        let mut published: Vec<&[u8]> = Vec::new();

        for (payload, record) in payloads.iter().zip(records) {
            if dedup.is_repeat(payload) || published.contains(&payload.as_slice()) {
                trace!(sequence, "Same code still in view");
                continue;
            }
            published.push(payload);
            info!(
                product_id = record.product_id,
                name = %record.name,
                sequence,
                "Product code scanned"
            );
            self.shared.record.publish(Arc::new(record));
        }

        dedup.update_view(payloads);
    }
}

/// Worker threads and the frame source while it is not lent to a worker
struct Control {
    source: Option<FrameSource>,
    capture: Option<CaptureLoopController<CaptureWorker>>,
    decode: Option<CaptureLoopController<()>>,
}

/// Live QR scanning pipeline
///
/// See the [module documentation](self) for the threading layout.
pub struct ScanPipeline<D: SymbolDecoder = QrDetector> {
    control: Mutex<Control>,
    shared: Arc<Shared>,
    decoder: Arc<D>,
    failures: FailureCounter,
    settings: ScanSettings,
}

impl<D: SymbolDecoder> ScanPipeline<D> {
    /// Create an idle pipeline around a closed frame source
    pub fn new(source: FrameSource, decoder: D, settings: ScanSettings) -> Self {
        let failures = source.failure_counter();
        Self {
            control: Mutex::new(Control {
                source: Some(source),
                capture: None,
                decode: None,
            }),
            shared: Arc::new(Shared::default()),
            decoder: Arc::new(decoder),
            failures,
            settings,
        }
    }

    /// Start scanning
    ///
    /// Returns immediately: the camera is opened on the capture thread, and
    /// an open failure shows up as `Stopped` plus [`last_error`](Self::last_error).
    /// Calling `start()` on an active pipeline does nothing.
    pub fn start(&self) -> Result<(), PipelineError> {
        let mut control = lock(&self.control);
        match self.shared.state() {
            PipelineState::Initializing | PipelineState::Running | PipelineState::Restarting => {
                Ok(())
            }
            PipelineState::Stopped => Err(PipelineError::Stopped),
            PipelineState::Idle => self.launch(&mut control),
        }
    }

    /// Release the device and start over from `Initializing`
    ///
    /// Also the way out of `Stopped`. The last record and dedup memory are
    /// kept, so a code still in view is not reported again.
    pub fn restart(&self) -> Result<(), PipelineError> {
        let mut control = lock(&self.control);
        info!(state = %self.shared.state(), "Restarting scan pipeline");
        self.halt(&mut control);
        self.launch(&mut control)
    }

    /// Stop both workers and release the device
    ///
    /// Safe to call repeatedly and from any thread. Blocks at most for one
    /// in-flight camera read.
    pub fn stop(&self) {
        let mut control = lock(&self.control);
        if self.shared.state() != PipelineState::Stopped {
            info!("Stopping scan pipeline");
        }
        // Set before joining so no worker can move the state on
        self.shared.force(PipelineState::Stopped);
        self.halt(&mut control);
    }

    /// Most recent display frame, without waiting
    pub fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.shared.frame.latest()
    }

    /// Most recent distinct record since the last reset, without waiting
    pub fn latest_record(&self) -> Option<Arc<DecodedRecord>> {
        self.shared.record.latest()
    }

    /// Forget the last payload and clear the shown record
    ///
    /// The next decode of any code, including the one just shown, is
    /// published again.
    pub fn reset_detection(&self) {
        let mut dedup = lock(&self.shared.dedup);
        dedup.reset();
        self.shared.record.clear();
        debug!("Detection reset");
    }

    pub fn state(&self) -> PipelineState {
        self.shared.state()
    }

    /// Indicator for the presentation layer
    pub fn status(&self) -> ScanStatus {
        match self.shared.state() {
            PipelineState::Idle | PipelineState::Initializing | PipelineState::Restarting => {
                ScanStatus::Initializing
            }
            PipelineState::Running if self.shared.record.latest().is_some() => {
                ScanStatus::Detected
            }
            PipelineState::Running => ScanStatus::Scanning,
            PipelineState::Stopped if lock(&self.shared.last_error).is_some() => ScanStatus::Error,
            PipelineState::Stopped => ScanStatus::Stopped,
        }
    }

    /// Error that ended the last start attempt, if any
    pub fn last_error(&self) -> Option<PipelineError> {
        lock(&self.shared.last_error).clone()
    }

    /// Current run of failed reads
    pub fn consecutive_failures(&self) -> u32 {
        self.failures.get()
    }

    /// Number of records published so far; changes whenever a new code is shown
    pub fn records_published(&self) -> u64 {
        self.shared.record.generation()
    }

    pub fn frames_captured(&self) -> u64 {
        self.shared.frames_captured.load(Ordering::Relaxed)
    }

    pub fn settings(&self) -> &ScanSettings {
        &self.settings
    }

    /// Spawn both workers; the source moves into the capture thread
    fn launch(&self, control: &mut Control) -> Result<(), PipelineError> {
        let Some(source) = control.source.take() else {
            error!("Frame source was lost, cannot start");
            self.shared.force(PipelineState::Stopped);
            self.shared.set_error(PipelineError::SourceLost);
            return Err(PipelineError::SourceLost);
        };

        self.shared.clear_error();
        self.shared.handoff.clear();
        self.shared.force(PipelineState::Initializing);

        let decode_worker = DecodeWorker {
            decoder: Arc::clone(&self.decoder),
            shared: Arc::clone(&self.shared),
        };
        let decode = CaptureLoopController::start("qr-decode", (), {
            let mut worker = decode_worker;
            move |_, _| worker.step()
        });
        let decode = match decode {
            Ok(decode) => decode,
            Err(e) => {
                control.source = Some(source);
                return Err(self.fail_launch(e));
            }
        };

        let capture_worker = CaptureWorker {
            failures: source.failure_counter(),
            source,
            phase: CapturePhase::Opening,
            shared: Arc::clone(&self.shared),
            settings: self.settings.clone(),
        };
        let capture = CaptureLoopController::start(
            "camera-capture",
            capture_worker,
            |worker: &mut CaptureWorker, stop| worker.step(stop),
        );
        match capture {
            Ok(capture) => {
                control.capture = Some(capture);
                control.decode = Some(decode);
                Ok(())
            }
            Err(e) => {
                // The worker state, source included, went down with the spawn
                control.decode = Some(decode);
                let err = self.fail_launch(e);
                self.halt(control);
                Err(err)
            }
        }
    }

    fn fail_launch(&self, e: std::io::Error) -> PipelineError {
        error!(error = %e, "Failed to spawn scan worker");
        let err = PipelineError::Spawn(e.to_string());
        self.shared.force(PipelineState::Stopped);
        self.shared.set_error(err.clone());
        err
    }

    /// Join both workers, take the source back and close the device
    fn halt(&self, control: &mut Control) {
        if let Some(capture) = control.capture.as_ref() {
            capture.request_stop();
        }
        if let Some(decode) = control.decode.as_ref() {
            decode.request_stop();
        }
        self.shared.handoff.wake();

        if let Some(mut capture) = control.capture.take() {
            match capture.join() {
                Some(worker) => control.source = Some(worker.source),
                None => warn!("Capture worker did not hand back the frame source"),
            }
        }
        if let Some(mut decode) = control.decode.take() {
            decode.join();
        }

        if let Some(source) = control.source.as_mut() {
            source.close();
        }
        self.shared.handoff.clear();
    }
}

impl<D: SymbolDecoder> Drop for ScanPipeline<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
