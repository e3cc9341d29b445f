// Demo: capture the desktop into a fixed-size buffer and save it
//
// Reads DXGICAPTURE_* overrides from the environment; the source defaults to
// the full desktop. Off Windows a synthetic two-monitor desktop stands in.
//
// Usage: cargo run --release --example capture -- [width] [height] [output.png]

use std::time::Instant;

use tracing::{error, info};

use dxgicapture::capture::CaptureSource;
use dxgicapture::{CaptureConfig, CaptureManager};

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let mut args = std::env::args().skip(1);
    let width = args.next().and_then(|v| v.parse().ok()).unwrap_or(1280u32);
    let height = args.next().and_then(|v| v.parse().ok()).unwrap_or(720u32);
    let path = args.next().unwrap_or_else(|| "capture.png".to_string());

    let mut config = CaptureConfig::from_env();
    if config.source == CaptureSource::Undefined {
        config.source = CaptureSource::FullDesktop;
    }
    let mut manager = build_manager(config);

    match manager.outputs() {
        Ok(outputs) => {
            for output in outputs {
                info!(
                    "#{} {} {:?} {:?} primary={}",
                    output.index, output.name, output.rect, output.rotation, output.is_primary
                );
            }
        }
        Err(e) => {
            error!("Initialization failed: {}", e);
            return;
        }
    }

    let t = Instant::now();
    match manager.capture(width, height) {
        Ok(frame) => {
            info!(
                "{:?} path, {}x{} content in {}x{} buffer, {:.2}ms",
                frame.info.path,
                frame.info.content_width,
                frame.info.content_height,
                frame.width,
                frame.height,
                t.elapsed().as_secs_f64() * 1000.0
            );
            if let Err(e) = frame.save(&path) {
                error!("Failed to save {}: {:#}", path, e);
            } else {
                info!("Saved {}", path);
            }
        }
        Err(e) => error!("Capture failed: {}", e),
    }

    manager.shutdown();
}

#[cfg(windows)]
fn build_manager(config: CaptureConfig) -> CaptureManager {
    CaptureManager::dxgi(config)
}

#[cfg(not(windows))]
fn build_manager(config: CaptureConfig) -> CaptureManager {
    use dxgicapture::capture::synthetic::{SyntheticDesktop, SyntheticOutput};
    use dxgicapture::capture::{Rect, Rotation};

    let desktop = SyntheticDesktop::new(vec![
        SyntheticOutput::patterned(0, "SYNTH1", Rect::new(0, 0, 1920, 1080), Rotation::Identity, true, 64),
        SyntheticOutput::patterned(1, "SYNTH2", Rect::new(1920, -420, 3000, 1500), Rotation::Rotate90, false, 192),
    ]);
    CaptureManager::new(Box::new(desktop), config)
}
