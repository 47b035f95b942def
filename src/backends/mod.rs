// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! # Modules
//!
//! - [`camera`]: Camera backend trait, V4L2 and mock implementations, and the
//!   frame source used by the scan pipeline
//! - [`virtual_camera`]: Still-image source that behaves like a camera

pub mod camera;
pub mod virtual_camera;
