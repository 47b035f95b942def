// SPDX-License-Identifier: GPL-3.0-only

//! Storage utilities for snapshots and log files

use crate::backends::camera::format_converters::to_rgba;
use crate::backends::camera::types::CameraFrame;
use crate::constants::app_info;
use crate::errors::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory for saved scan snapshots (`~/Pictures/inventory-scanner`)
pub fn snapshot_directory() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(app_info::APP_DIR_NAME)
}

/// Log file used while the terminal UI owns stdout
pub fn log_file_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(app_info::APP_DIR_NAME)
        .join("scanner.log")
}

/// Save `frame` as `SCAN_<timestamp>.jpg` in the snapshot directory
///
/// The timestamp has millisecond resolution; a `_<n>` suffix keeps names
/// unique if it still collides.
pub fn save_snapshot(frame: &CameraFrame) -> AppResult<PathBuf> {
    save_snapshot_in(frame, &snapshot_directory())
}

/// Save `frame` as `SCAN_<timestamp>.jpg` in `dir`
pub fn save_snapshot_in(frame: &CameraFrame, dir: &Path) -> AppResult<PathBuf> {
    let (width, height, rgba) =
        to_rgba(frame).ok_or_else(|| AppError::Camera("frame cannot be converted".into()))?;

    // JPEG has no alpha channel
    let rgb: Vec<u8> = rgba
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    let img = image::RgbImage::from_raw(width, height, rgb)
        .ok_or_else(|| AppError::Storage("snapshot buffer has the wrong size".into()))?;

    std::fs::create_dir_all(dir)?;

    let stem = format!("SCAN_{}", chrono::Local::now().format("%Y%m%d_%H%M%S_%3f"));
    let mut filepath = dir.join(format!("{}.jpg", stem));
    let mut suffix = 1;
    while filepath.exists() {
        filepath = dir.join(format!("{}_{}.jpg", stem, suffix));
        suffix += 1;
    }

    img.save(&filepath)
        .map_err(|e| AppError::Storage(format!("{}: {}", filepath.display(), e)))?;
    info!(path = %filepath.display(), "Snapshot saved");

    Ok(filepath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::types::PixelFormat;

    #[test]
    fn test_snapshot_is_written_as_jpeg() {
        let dir = std::env::temp_dir().join(format!("scanner-snapshot-{}", std::process::id()));
        let frame = CameraFrame::from_packed(16, 8, PixelFormat::Gray8, vec![200; 128]);

        let path = save_snapshot_in(&frame, &dir).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("SCAN_"));
        assert_eq!(path.extension().unwrap(), "jpg");

        let saved = image::open(&path).unwrap();
        assert_eq!((saved.width(), saved.height()), (16, 8));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_snapshots_in_quick_succession_do_not_overwrite() {
        let dir = std::env::temp_dir().join(format!("scanner-burst-{}", std::process::id()));
        let frame = CameraFrame::from_packed(8, 8, PixelFormat::Gray8, vec![90; 64]);

        let first = save_snapshot_in(&frame, &dir).unwrap();
        let second = save_snapshot_in(&frame, &dir).unwrap();
        let third = save_snapshot_in(&frame, &dir).unwrap();
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_snapshot_directory_is_app_specific() {
        assert!(snapshot_directory().ends_with(app_info::APP_DIR_NAME));
    }
}
