//! Headless Chrome integration tests
#![cfg(feature = "cdp")]

use notesnap::{CancelToken, CaptureConfig, CdpSurface, Converter, RenderConfig, Surface, Theme};
use std::time::Duration;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

fn offline_config(out: &std::path::Path) -> RenderConfig {
    RenderConfig {
        out_dir: out.to_path_buf(),
        // Keep the page free of network fetches so idle is reached quickly.
        theme: Theme {
            font_import_url: None,
            ..Default::default()
        },
        capture: CaptureConfig {
            idle_timeout: Duration::from_secs(5),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_convert_writes_pngs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.md");
    std::fs::write(&input, "# Title\nIntro\n## A\nfoo\n## B\n```rust\nfn main() {}\n```\n").unwrap();
    let out = dir.path().join("out");

    let converter = Converter::new(offline_config(&out)).expect("valid config");
    let written = converter
        .convert_file(&input, &CancelToken::new())
        .expect("Failed to convert");

    assert_eq!(written.len(), 3);
    for path in &written {
        let data = std::fs::read(path).unwrap();
        assert!(data.len() > 100, "PNG data seems too small");
        assert_eq!(&data[0..8], PNG_MAGIC);
    }
}

#[test]
#[ignore] // Requires Chrome to be installed
fn test_surface_measures_and_captures() {
    let config = offline_config(std::path::Path::new("."));
    let mut surface = CdpSurface::launch(&config.capture).expect("Failed to launch Chrome");

    surface
        .load_html("<!DOCTYPE html><html><body style=\"margin:0\"><div style=\"height:1234px\">tall</div></body></html>")
        .expect("Failed to load page");
    assert!(surface.wait_for_idle(Duration::from_secs(5)).expect("idle wait failed"));

    let height = surface.content_height().expect("Failed to measure");
    assert!(height >= 1234, "measured {}", height);

    let png = surface.capture_png().expect("Failed to capture");
    assert_eq!(&png[0..8], PNG_MAGIC);

    surface.close().unwrap();
}
