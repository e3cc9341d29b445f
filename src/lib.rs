//! # dxgicapture
//!
//! Multi-monitor desktop capture into a caller-supplied BGRA8 buffer.
//!
//! Each attached output is duplicated once; every capture call acquires a
//! frame from the selected outputs, rotates it upright, stitches it into the
//! virtual desktop rectangle and, when the destination is smaller, scales it
//! down with the aspect ratio preserved.
//!
//! ## Rust usage
//!
//! ```no_run
//! # #[cfg(windows)]
//! # fn main() -> Result<(), dxgicapture::CaptureError> {
//! use dxgicapture::capture::{CaptureSource, Rect};
//! use dxgicapture::{CaptureConfig, CaptureManager};
//!
//! let mut manager = CaptureManager::dxgi(CaptureConfig::from_env());
//! manager.set_capture_source(CaptureSource::FullDesktop);
//!
//! // Caller-owned buffer
//! let mut buffer = vec![0u8; 1280 * 720 * 4];
//! let info = manager.get_frame(&mut buffer, Rect::from_size(1280, 720))?;
//! println!("{}x{} of content", info.content_width, info.content_height);
//!
//! // Owned frame
//! let frame = manager.capture(1920, 1080)?;
//! frame.save("desktop.png").ok();
//! # Ok(())
//! # }
//! # #[cfg(not(windows))]
//! # fn main() {}
//! ```
//!
//! On non-Windows targets only the synthetic backend
//! ([`capture::synthetic`]) is available.

pub mod capture;
pub mod compose;
pub mod config;
pub mod error;
pub mod image;
pub mod memory;
pub mod pipeline;
pub mod platform;

pub use config::CaptureConfig;
pub use error::{CaptureError, CaptureResult, ErrorKind};
pub use pipeline::{CaptureManager, CapturedFrame, FrameInfo};
