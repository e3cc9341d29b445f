use tracing::debug;

use crate::capture::{Rect, BYTES_PER_PIXEL};
use crate::error::{CaptureError, CaptureResult};

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Buffers allocated over the cache's lifetime
    pub alloc_count: usize,
    /// Lookups served without reallocating
    pub hit_count: usize,
}

/// Intermediate full-resolution buffer for the scaled capture path.
///
/// Keyed by the virtual desktop rectangle: repeated captures of the same
/// geometry reuse one allocation, a geometry change replaces it. Holds at most
/// one buffer.
#[derive(Debug, Default)]
pub struct ScaleCache {
    rect: Option<Rect>,
    buffer: Vec<u8>,
    stats: CacheStats,
}

impl ScaleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer sized for `rect` (width * height * 4 bytes), contents unspecified
    /// on a hit and zeroed on a fresh allocation.
    ///
    /// On allocation failure the cache is left empty.
    pub fn get_or_resize(&mut self, rect: Rect) -> CaptureResult<&mut [u8]> {
        if self.rect == Some(rect) {
            self.stats.hit_count += 1;
            return Ok(self.buffer.as_mut_slice());
        }

        self.invalidate();
        let bytes = (rect.width() as usize)
            .checked_mul(rect.height() as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or(CaptureError::Allocation { bytes: usize::MAX })?;

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(bytes)
            .map_err(|_| CaptureError::Allocation { bytes })?;
        buffer.resize(bytes, 0);

        debug!("Scale buffer allocated for {:?} ({} bytes)", rect, bytes);
        self.buffer = buffer;
        self.rect = Some(rect);
        self.stats.alloc_count += 1;
        Ok(self.buffer.as_mut_slice())
    }

    /// Rectangle the current buffer was sized for.
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    /// Drop the buffer; the next lookup allocates.
    pub fn invalidate(&mut self) {
        self.rect = None;
        self.buffer = Vec::new();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
