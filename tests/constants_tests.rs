// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use inventory_scanner::constants::{capture, decode, file_formats, recovery, timing};

#[test]
fn test_default_candidates_are_tried_in_order() {
    assert_eq!(capture::DEFAULT_CANDIDATE_DEVICES, [0, 1]);
}

#[test]
fn test_failure_threshold_is_about_one_second_of_frames() {
    // ~30 consecutive failures at the default framerate
    assert_eq!(recovery::FAILURE_THRESHOLD, capture::DEFAULT_FPS);
}

#[test]
fn test_poll_cadence_range() {
    assert_eq!(timing::MIN_DISPLAY_POLL_MS, 10);
    assert_eq!(timing::MAX_DISPLAY_POLL_MS, 70);
    assert!(timing::DISPLAY_POLL_MS >= timing::MIN_DISPLAY_POLL_MS);
}

#[test]
fn test_decode_wait_is_short() {
    // Stop must be observed promptly by the decode loop
    assert!(timing::DECODE_WAIT.as_millis() <= 250);
    assert!(timing::SLEEP_SLICE <= timing::DECODE_WAIT);
}

#[test]
fn test_decode_dimension_fits_default_capture() {
    assert!(decode::MAX_DIMENSION >= capture::DEFAULT_WIDTH);
}

#[test]
fn test_image_extensions_are_lowercase() {
    for ext in file_formats::IMAGE_EXTENSIONS {
        assert_eq!(*ext, ext.to_lowercase());
        assert!(file_formats::is_image_extension(ext));
    }
}
