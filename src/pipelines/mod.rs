// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! # Modules
//!
//! - [`scan`]: Live QR scanning with capture, decode and automatic camera
//!   recovery running on background threads

pub mod scan;
