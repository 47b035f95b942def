// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera sources
//!
//! Backends that look like a camera to the scan pipeline but read from
//! files instead of hardware.

mod file_source;

pub use file_source::{ImageFileBackend, load_image_as_frame};
