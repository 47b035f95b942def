// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/inventory-scanner/config.json`.
//! Unknown or missing fields fall back to their defaults so older files keep
//! loading after new settings are added.

use crate::constants::{app_info, capture, decode, recovery, timing};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera indices tried in order (e.g. /dev/video0, then /dev/video1)
    pub candidate_devices: Vec<u32>,
    /// Requested capture width
    pub capture_width: u32,
    /// Requested capture height
    pub capture_height: u32,
    /// Requested capture framerate
    pub capture_fps: u32,
    /// Consecutive failed reads before the camera is restarted
    pub failure_threshold: u32,
    /// Upper bound for one blocking frame read
    pub read_timeout_ms: u64,
    /// Delay between re-open attempts while restarting
    pub restart_backoff_ms: u64,
    /// UI poll cadence for latest frame / record
    pub display_poll_ms: u64,
    /// Frames are downscaled to this size before QR detection
    pub decode_max_dimension: u32,
    /// Draw the scan guide rectangle on the preview
    pub show_scan_region: bool,
    /// Mirror camera preview horizontally
    pub mirror_preview: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            candidate_devices: capture::DEFAULT_CANDIDATE_DEVICES.to_vec(),
            capture_width: capture::DEFAULT_WIDTH,
            capture_height: capture::DEFAULT_HEIGHT,
            capture_fps: capture::DEFAULT_FPS,
            failure_threshold: recovery::FAILURE_THRESHOLD,
            read_timeout_ms: capture::READ_TIMEOUT_MS,
            restart_backoff_ms: recovery::RESTART_BACKOFF_MS,
            display_poll_ms: timing::DISPLAY_POLL_MS,
            decode_max_dimension: decode::MAX_DIMENSION,
            show_scan_region: true,
            mirror_preview: false,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::APP_DIR_NAME).join("config.json"))
    }

    /// Load the config from the default location
    ///
    /// A missing file yields defaults. A file that cannot be read or parsed
    /// is reported and replaced by defaults rather than aborting startup.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                debug!("No config directory available, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults on any problem
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Self::default();
        }

        match Self::load_from(path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`, reporting read and parse failures
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> AppResult<()> {
        if self.candidate_devices.is_empty() {
            return Err(AppError::Config(
                "candidate_devices must list at least one camera index".into(),
            ));
        }
        if self.failure_threshold == 0 {
            return Err(AppError::Config(
                "failure_threshold must be at least 1".into(),
            ));
        }
        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(AppError::Config(
                "capture resolution must be non-zero".into(),
            ));
        }
        if self.capture_fps == 0 {
            return Err(AppError::Config("capture_fps must be at least 1".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(AppError::Config(
                "read_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// UI poll cadence clamped to the supported range
    pub fn display_poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.display_poll_ms
                .clamp(timing::MIN_DISPLAY_POLL_MS, timing::MAX_DISPLAY_POLL_MS),
        )
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn restart_backoff(&self) -> Duration {
        Duration::from_millis(self.restart_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = serde_json::from_str(r#"{"failure_threshold": 12}"#).unwrap();
        assert_eq!(config.failure_threshold, 12);
        assert_eq!(config.candidate_devices, vec![0, 1]);
        assert_eq!(config.capture_width, 640);
    }

    #[test]
    fn test_validate_rejects_zero_rates() {
        let no_fps = Config {
            capture_fps: 0,
            ..Config::default()
        };
        let no_timeout = Config {
            read_timeout_ms: 0,
            ..Config::default()
        };
        assert!(no_fps.validate().is_err());
        assert!(no_timeout.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_candidates() {
        let config = Config {
            candidate_devices: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        let fast = Config {
            display_poll_ms: 1,
            ..Config::default()
        };
        assert_eq!(fast.display_poll_interval(), Duration::from_millis(10));

        let slow = Config {
            display_poll_ms: 500,
            ..Config::default()
        };
        assert_eq!(slow.display_poll_interval(), Duration::from_millis(70));
    }
}
