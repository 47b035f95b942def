// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the scan pipeline with the QR detector,
//! fed from a still image of a product code

use inventory_scanner::backends::virtual_camera::load_image_as_frame;
use inventory_scanner::frame_processor::parse;
use inventory_scanner::{Config, PipelineState, QrDetector, ScanStatus, SymbolDecoder, build_pipeline};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const PRODUCT: &str = r#"{"product_id": 7, "name": "Widget", "category": "Tools", "price": "9.99", "description": null}"#;

/// Write `payload` as a QR code PNG and return its path
fn write_code_png(name: &str, payload: &str) -> PathBuf {
    let code = qrcode::QrCode::new(payload.as_bytes()).unwrap();
    let modules = code.width();
    let scale = 6;
    let size = (modules + 8) * scale;

    let colors = code.to_colors();
    let img = image::GrayImage::from_fn(size as u32, size as u32, |x, y| {
        let mx = (x as usize / scale).checked_sub(4).filter(|&m| m < modules);
        let my = (y as usize / scale).checked_sub(4).filter(|&m| m < modules);
        match (mx, my) {
            (Some(mx), Some(my)) if colors[my * modules + mx] == qrcode::Color::Dark => {
                image::Luma([0])
            }
            _ => image::Luma([255]),
        }
    });

    let dir = std::env::temp_dir().join(format!("scanner-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("code.png");
    img.save(&path).unwrap();
    path
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_decode_command_path_reads_product() {
    let path = write_code_png("decode", PRODUCT);

    let frame = load_image_as_frame(&path).unwrap();
    let symbols = QrDetector::new().decode(&frame);
    assert_eq!(symbols.len(), 1);

    let record = parse(&symbols[0].payload).unwrap();
    assert_eq!(record.product_id, 7);
    assert_eq!(record.description, None);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_still_image_scan_publishes_product_once() {
    let path = write_code_png("scan", PRODUCT);
    let pipeline = build_pipeline(&Config::default(), Some(path.clone()));

    pipeline.start().unwrap();
    assert!(wait_until(|| pipeline.latest_record().is_some()));

    let record = pipeline.latest_record().unwrap();
    assert_eq!(record.product_id, 7);
    assert_eq!(record.name, "Widget");
    assert_eq!(pipeline.state(), PipelineState::Running);
    assert_eq!(pipeline.status(), ScanStatus::Detected);

    // The code stays in view; it is not reported again
    let frames = pipeline.frames_captured();
    assert!(wait_until(|| pipeline.frames_captured() >= frames + 10));
    assert_eq!(pipeline.records_published(), 1);

    pipeline.stop();
    assert_eq!(pipeline.state(), PipelineState::Stopped);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_missing_image_stops_with_error() {
    let pipeline = build_pipeline(
        &Config::default(),
        Some(PathBuf::from("/nonexistent/product-code.png")),
    );

    pipeline.start().unwrap();
    assert!(wait_until(|| pipeline.state() == PipelineState::Stopped));
    assert!(pipeline.last_error().is_some());
    assert_eq!(pipeline.status(), ScanStatus::Error);
}
