use std::path::Path;

use anyhow::Result;

use crate::capture::Rect;

/// Lifecycle of a [`CaptureManager`](super::CaptureManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// No outputs discovered yet; the first capture call initializes.
    Uninitialized,
    /// Outputs discovered and duplicated.
    Initialized,
    /// Torn down; every further call fails.
    Shutdown,
}

/// How a `get_frame` call produced its pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePath {
    /// Nothing selected; the destination was not touched.
    Skipped,
    /// Composited straight into the destination at native size.
    Direct,
    /// Composited into the scale buffer, then resampled into the destination.
    Scaled,
}

/// Outcome of one successful `get_frame` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub path: FramePath,
    /// Virtual desktop rectangle of the selected outputs
    pub virtual_rect: Rect,
    /// Outputs composited
    pub outputs: usize,
    /// Size of the image at the destination's top-left; the rest is letterbox
    pub content_width: u32,
    pub content_height: u32,
}

impl FrameInfo {
    pub(super) fn skipped(virtual_rect: Rect) -> Self {
        Self {
            path: FramePath::Skipped,
            virtual_rect,
            outputs: 0,
            content_width: 0,
            content_height: 0,
        }
    }
}

/// Owned frame returned by [`CaptureManager::capture`](super::CaptureManager::capture).
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// BGRA8 pixels, length = width * height * 4, letterbox zeroed
    pub data: Vec<u8>,
    /// Frame width (pixels)
    pub width: u32,
    /// Frame height (pixels)
    pub height: u32,
    pub info: FrameInfo,
}

impl CapturedFrame {
    /// Save frame to file.
    ///
    /// Format is determined by file extension: `.png` `.bmp` `.jpg` `.tiff`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        crate::image::save_bgra(path.as_ref(), &self.data, self.width, self.height)
    }
}
