// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for worker loops
//!
//! Both the capture and decode workers of the scan pipeline run as a named
//! thread that repeatedly calls a closure until asked to stop. The loop owns
//! its state for its whole life and hands it back on join, which lets the
//! pipeline recover the frame source after a stop and re-use it on restart.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::constants::timing;

/// Action returned by the loop callback to control loop behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Continue running the loop
    Continue,
    /// Stop the loop gracefully
    Stop,
}

/// Shared stop flag, checked between iterations and inside long waits
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Sleep for `duration` in short slices, returning early once the signal
    /// is set. Returns `true` if the full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_set() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(timing::SLEEP_SLICE));
        }
    }
}

/// Controller for a worker loop running in a separate thread
///
/// # Example
///
/// ```ignore
/// let mut controller = CaptureLoopController::start("capture", source, |source, stop| {
///     match source.read_frame() {
///         Ok(frame) => publish(frame),
///         Err(e) => warn!("Capture error: {}", e),
///     }
///     LoopAction::Continue
/// })?;
///
/// // Later, stop the loop and take the source back
/// let source = controller.stop();
/// ```
pub struct CaptureLoopController<S: Send + 'static> {
    /// Thread handle for joining; the thread hands its state back
    thread_handle: Option<JoinHandle<S>>,
    /// Signal to stop the loop
    stop_signal: StopSignal,
    /// Name for logging and the thread name
    name: String,
}

impl<S: Send + 'static> CaptureLoopController<S> {
    /// Start a new loop in a separate, named thread
    ///
    /// `loop_fn` is called repeatedly with the loop state until it returns
    /// [`LoopAction::Stop`] or the controller is stopped. The stop signal is
    /// passed along so blocking work inside an iteration can bail out early.
    pub fn start<F>(name: &str, state: S, mut loop_fn: F) -> io::Result<Self>
    where
        F: FnMut(&mut S, &StopSignal) -> LoopAction + Send + 'static,
    {
        let stop_signal = StopSignal::new();
        let thread_signal = stop_signal.clone();
        let name_clone = name.to_string();

        info!(name = %name, "Starting worker loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %name_clone, "Worker loop thread started");
                let mut state = state;

                loop {
                    if thread_signal.is_set() {
                        debug!(name = %name_clone, "Stop signal received");
                        break;
                    }

                    match loop_fn(&mut state, &thread_signal) {
                        LoopAction::Continue => {}
                        LoopAction::Stop => {
                            debug!(name = %name_clone, "Loop requested stop");
                            break;
                        }
                    }
                }

                info!(name = %name_clone, "Worker loop thread exiting");
                state
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the loop to stop without waiting for it
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting worker loop stop");
        self.stop_signal.set();
    }

    /// Stop the loop, wait for the thread and take its state back
    pub fn stop(&mut self) -> Option<S> {
        self.request_stop();
        self.join()
    }

    /// Wait for the thread to finish without sending the stop signal
    ///
    /// Returns `None` if the thread was already joined or panicked.
    pub fn join(&mut self) -> Option<S> {
        let handle = self.thread_handle.take()?;
        debug!(name = %self.name, "Waiting for worker loop thread to finish");
        match handle.join() {
            Ok(state) => {
                debug!(name = %self.name, "Worker loop thread finished");
                Some(state)
            }
            Err(e) => {
                warn!(name = %self.name, "Worker loop thread panicked: {:?}", e);
                None
            }
        }
    }
}

impl<S: Send + 'static> Drop for CaptureLoopController<S> {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_basic_loop_returns_state() {
        let mut controller = CaptureLoopController::start("test-loop", 0u32, |count, _| {
            *count += 1;
            if *count > 10 {
                LoopAction::Stop
            } else {
                LoopAction::Continue
            }
        })
        .unwrap();

        assert_eq!(controller.join(), Some(11));
        // Second join has nothing left to hand back
        assert_eq!(controller.join(), None);
    }

    #[test]
    fn test_stop_signal() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut controller = CaptureLoopController::start("test-loop", (), move |_, _| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            LoopAction::Continue
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));

        assert!(controller.stop().is_some());
        assert!(counter.load(Ordering::SeqCst) > 0);
        assert!(!controller.is_running());
    }

    #[test]
    fn test_stop_interrupts_long_sleep() {
        let mut controller = CaptureLoopController::start("test-sleep", (), |_, stop| {
            stop.sleep(Duration::from_secs(30));
            LoopAction::Continue
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        controller.stop();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_panicking_loop_loses_state() {
        let mut controller =
            CaptureLoopController::start("test-panic", String::from("source"), |_, _| {
                panic!("worker failure");
            })
            .unwrap();

        assert_eq!(controller.join(), None);
    }

    #[test]
    fn test_is_running() {
        let controller = CaptureLoopController::start("test-running", (), |_, _| {
            thread::sleep(Duration::from_millis(100));
            LoopAction::Continue
        })
        .unwrap();

        assert!(controller.is_running());

        // Drop will stop it
        drop(controller);
    }

    #[test]
    fn test_signal_sleep_completes_when_unset() {
        let signal = StopSignal::new();
        assert!(signal.sleep(Duration::from_millis(5)));
        signal.set();
        assert!(!signal.sleep(Duration::from_secs(5)));
    }
}
