// Rotation normalization: one coordinate transform for all four orientations.
//
// A duplication surface is stored in the output's native scan-out orientation.
// For an output whose desktop footprint is `width x height`, upright pixel
// (x, y) lives at `source_coords(rotation, x, y, width, height)` in the native
// surface. Rotate90 and Rotate270 are inverses; Rotate180 is its own inverse.

use crate::capture::{PixelSurface, Rotation, BYTES_PER_PIXEL};

/// Native-surface coordinate of upright pixel (x, y).
///
/// `width`/`height` are the upright (desktop) dimensions; callers keep
/// `x < width` and `y < height`.
#[inline]
pub fn source_coords(rotation: Rotation, x: u32, y: u32, width: u32, height: u32) -> (u32, u32) {
    match rotation {
        Rotation::Identity => (x, y),
        Rotation::Rotate90 => (y, width - 1 - x),
        Rotation::Rotate180 => (width - 1 - x, height - 1 - y),
        Rotation::Rotate270 => (height - 1 - y, x),
    }
}

/// Upright dimensions of a native `width x height` surface.
pub fn upright_size(rotation: Rotation, native_width: u32, native_height: u32) -> (u32, u32) {
    // The axis swap is symmetric
    rotation.native_size(native_width, native_height)
}

/// Rotate a whole native surface upright into a tightly packed buffer.
///
/// Returns the pixels and their upright width and height.
pub fn normalize(rotation: Rotation, surface: &PixelSurface<'_>) -> (Vec<u8>, u32, u32) {
    let (width, height) = upright_size(rotation, surface.width, surface.height);
    let mut upright = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = source_coords(rotation, x, y, width, height);
            upright.extend_from_slice(surface.pixel(sx, sy));
        }
    }
    (upright, width, height)
}
