// Output capability: the seam between the compositor and a duplication backend.
//
// A backend hands out one `PixelSurface` per successful `acquire`; the caller
// must pair it with exactly one `release`, whatever happens in between.

use std::time::Duration;

use super::types::OutputDescriptor;
use crate::error::CaptureResult;

/// Bytes per BGRA8 pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Read-only view of one freshly acquired output frame.
///
/// Pixels are BGRA8 in the output's *native* orientation. `pitch` is the row
/// stride in bytes and may exceed `width * 4` because of hardware padding.
#[derive(Debug, Clone, Copy)]
pub struct PixelSurface<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub pitch: usize,
}

impl<'a> PixelSurface<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32, pitch: usize) -> Self {
        Self {
            data,
            width,
            height,
            pitch,
        }
    }

    /// Whether `data` actually holds `height` rows of `width` pixels at `pitch`.
    pub fn is_consistent(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return true;
        }
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        if self.pitch < row_bytes {
            return false;
        }
        let needed = self.pitch * (self.height as usize - 1) + row_bytes;
        self.data.len() >= needed
    }

    /// The 4 bytes of the native pixel at (x, y). Callers keep (x, y) in bounds.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &'a [u8] {
        let start = y as usize * self.pitch + x as usize * BYTES_PER_PIXEL;
        &self.data[start..start + BYTES_PER_PIXEL]
    }

    /// Native row `y`, trimmed to `width` pixels.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.pitch;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }
}

/// One duplicated output.
///
/// The Windows backend implements this over `IDXGIOutputDuplication`; the
/// synthetic backend implements it over in-memory frames for tests.
pub trait OutputHandle {
    /// Geometry and metadata, fixed for the session.
    fn descriptor(&self) -> &OutputDescriptor;

    /// Block up to `timeout` for a frame.
    ///
    /// `Ok(None)` means nothing is available to show (no new frame and nothing
    /// retained); no release is owed. `Ok(Some(_))` must be followed by
    /// exactly one [`release`](Self::release).
    fn acquire(&mut self, timeout: Duration) -> CaptureResult<Option<PixelSurface<'_>>>;

    /// Give the acquired frame back to the session.
    fn release(&mut self) -> CaptureResult<()>;
}

/// Discovers the outputs attached to the desktop and opens a session on each.
pub trait OutputEnumerator {
    /// Open every output. With `reuse_last_frame`, a handle whose wait times
    /// out hands back its previous frame instead of `Ok(None)`.
    fn enumerate(&mut self, reuse_last_frame: bool) -> CaptureResult<Vec<Box<dyn OutputHandle>>>;
}
