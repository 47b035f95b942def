// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing tasks
//!
//! This module contains the symbol decoding abstraction and its
//! implementations.

pub mod qr_detector;

pub use qr_detector::QrDetector;

use super::types::RawSymbol;
use crate::backends::camera::types::CameraFrame;

/// Finds symbols in a frame
///
/// Returning an empty list is the normal "nothing in view" outcome, not an
/// error. Implementations are shared between the decode worker and callers
/// such as the `decode` command, so they must be thread-safe.
pub trait SymbolDecoder: Send + Sync + 'static {
    fn decode(&self, frame: &CameraFrame) -> Vec<RawSymbol>;
}
