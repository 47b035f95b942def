// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Listing available cameras
//! - Decoding product codes from an image file
//! - Scanning without a UI
//! - Showing and saving the configuration

use inventory_scanner::backends::camera::v4l2::enumerate_cameras;
use inventory_scanner::backends::virtual_camera::load_image_as_frame;
use inventory_scanner::frame_processor::parse;
use inventory_scanner::{AppResult, Config, QrDetector, SymbolDecoder, build_pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// List all available cameras
pub fn list_cameras() -> AppResult<()> {
    let cameras = enumerate_cameras();

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for camera in &cameras {
        println!("  [{}] {}", camera.index, camera.name);
        println!("      Device: {} ({})", camera.path, camera.driver);
        println!();
    }

    Ok(())
}

/// Decode every QR code in an image and print the product records
pub fn decode_image(path: &Path) -> AppResult<()> {
    let frame = load_image_as_frame(path)?;
    let symbols = QrDetector::new().decode(&frame);

    if symbols.is_empty() {
        println!("No QR codes found in {}", path.display());
        return Ok(());
    }

    for symbol in symbols {
        match parse(&symbol.payload) {
            Ok(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            Err(e) => println!(
                "Skipped code ({}): {}",
                e,
                String::from_utf8_lossy(&symbol.payload)
            ),
        }
    }

    Ok(())
}

/// Scan without a UI, printing each newly published product as a JSON line
///
/// Runs until Ctrl+C, or until the first product when `once` is set.
pub fn run_headless(config: &Config, image: Option<PathBuf>, once: bool) -> AppResult<()> {
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| format!("Failed to set Ctrl+C handler: {}", e))?;

    let pipeline = build_pipeline(config, image);
    pipeline.start()?;
    info!(
        candidates = ?pipeline.settings().candidate_devices,
        threshold = pipeline.settings().failure_threshold,
        "Headless scan started"
    );
    eprintln!("Scanning... Press Ctrl+C to stop.");

    let poll = config.display_poll_interval();
    let mut seen = pipeline.records_published();

    while !stop_flag.load(Ordering::SeqCst) {
        std::thread::sleep(poll);

        let published = pipeline.records_published();
        if published != seen {
            seen = published;
            if let Some(record) = pipeline.latest_record() {
                println!("{}", serde_json::to_string(&*record)?);
                if once {
                    break;
                }
            }
        }

        if !pipeline.state().is_active() {
            break;
        }
    }

    pipeline.stop();
    info!(
        frames = pipeline.frames_captured(),
        records = pipeline.records_published(),
        "Scan finished"
    );

    match pipeline.last_error() {
        Some(e) => {
            warn!(error = %e, "Pipeline stopped with an error");
            Err(e.into())
        }
        None => Ok(()),
    }
}

/// Print the effective configuration, optionally saving it
pub fn show_config(config: &Config, save: bool, path: Option<&Path>) -> AppResult<()> {
    config.validate()?;
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        let path = path.ok_or("No config directory available")?;
        config.save_to(path)?;
        eprintln!("Saved to {}", path.display());
    }

    Ok(())
}
