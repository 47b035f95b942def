// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Camera acquisition defaults
pub mod capture {
    /// Device indices tried in order when opening the camera
    pub const DEFAULT_CANDIDATE_DEVICES: [u32; 2] = [0, 1];

    /// Requested capture width (hint, the device may ignore it)
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Requested capture height (hint, the device may ignore it)
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Requested capture framerate (hint, the device may ignore it)
    pub const DEFAULT_FPS: u32 = 30;

    /// Upper bound for a single blocking frame read
    pub const READ_TIMEOUT_MS: u64 = 1000;

    /// Number of memory-mapped V4L2 buffers
    pub const MMAP_BUFFER_COUNT: u32 = 4;
}

/// Failure detection and recovery
pub mod recovery {
    /// Consecutive failed reads that trigger a camera restart
    pub const FAILURE_THRESHOLD: u32 = 30;

    /// Delay between re-open attempts while restarting
    pub const RESTART_BACKOFF_MS: u64 = 500;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Default UI poll cadence
    pub const DISPLAY_POLL_MS: u64 = 10;

    /// Fastest allowed UI poll cadence
    pub const MIN_DISPLAY_POLL_MS: u64 = 10;

    /// Slowest allowed UI poll cadence
    pub const MAX_DISPLAY_POLL_MS: u64 = 70;

    /// How long the decode loop waits for a frame before re-checking for stop
    pub const DECODE_WAIT: Duration = Duration::from_millis(100);

    /// Granularity of interruptible sleeps in the capture loop
    pub const SLEEP_SLICE: Duration = Duration::from_millis(50);

    /// Frame counter modulo for periodic logging
    pub const FRAME_LOG_INTERVAL: u64 = 120;
}

/// QR decoding
pub mod decode {
    /// Frames are downscaled to this maximum dimension before detection
    pub const MAX_DIMENSION: u32 = 640;
}

/// Display-side constants
pub mod display {
    /// Scan region outline color (RGBA)
    pub const SCAN_REGION_COLOR: [u8; 4] = [0, 255, 0, 255];

    /// Scan region outline thickness in pixels
    pub const SCAN_REGION_THICKNESS: u32 = 2;
}

/// Supported file formats for the still-image camera
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information utilities
pub mod app_info {
    /// Application name used for config/data directories
    pub const APP_DIR_NAME: &str = "inventory-scanner";

    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extensions() {
        assert!(file_formats::is_image_extension("PNG"));
        assert!(file_formats::is_image_extension("jpeg"));
        assert!(!file_formats::is_image_extension("mp4"));
    }

    #[test]
    fn test_poll_bounds_contain_default() {
        assert!(timing::MIN_DISPLAY_POLL_MS <= timing::DISPLAY_POLL_MS);
        assert!(timing::DISPLAY_POLL_MS <= timing::MAX_DISPLAY_POLL_MS);
    }
}
