// Aspect-preserving downscale for the scaled capture path.
//
// The full-resolution composite is fitted inside the caller's rectangle and
// written at its top-left; the uncovered remainder (letterbox) is left as is.

use anyhow::anyhow;
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba};

use crate::capture::BYTES_PER_PIXEL;
use crate::error::{CaptureError, CaptureResult};

/// Interpolation used when scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleFilter {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResampleFilter {
    /// Parse a filter name (`nearest`, `triangle`, `catmull-rom`, `gaussian`, `lanczos3`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "nearest" => Some(Self::Nearest),
            "triangle" | "linear" => Some(Self::Triangle),
            "catmull-rom" | "catmullrom" | "cubic" => Some(Self::CatmullRom),
            "gaussian" => Some(Self::Gaussian),
            "lanczos3" | "lanczos" => Some(Self::Lanczos3),
            _ => None,
        }
    }

    fn filter_type(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Largest `w x h` with the source's aspect ratio that fits in `dest_width x dest_height`.
///
/// The constrained side fills the destination exactly; the other side is
/// truncated, never below one pixel.
pub fn fit_aspect(src_width: u32, src_height: u32, dest_width: u32, dest_height: u32) -> (u32, u32) {
    if src_width == 0 || src_height == 0 || dest_width == 0 || dest_height == 0 {
        return (0, 0);
    }
    let (sw, sh) = (src_width as u64, src_height as u64);
    let (dw, dh) = (dest_width as u64, dest_height as u64);
    if sw * dh > dw * sh {
        // source is wider: full width, letterbox below
        let h = (dw * sh / sw).clamp(1, dh);
        (dest_width, h as u32)
    } else {
        let w = (dh * sw / sh).clamp(1, dw);
        (w as u32, dest_height)
    }
}

/// Scales a tightly packed BGRA8 image into a destination buffer.
pub trait Resampler {
    /// Fit `src` (`src_width x src_height`) inside `dest_width x dest_height`
    /// preserving aspect, writing at the top-left of `dest` with stride
    /// `dest_width * 4`. Returns the size actually written.
    fn resample(
        &self,
        src: &[u8],
        src_width: u32,
        src_height: u32,
        dest: &mut [u8],
        dest_width: u32,
        dest_height: u32,
    ) -> CaptureResult<(u32, u32)>;
}

/// [`Resampler`] backed by `image::imageops::resize`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageResampler {
    filter: ResampleFilter,
}

impl ImageResampler {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }
}

impl Resampler for ImageResampler {
    fn resample(
        &self,
        src: &[u8],
        src_width: u32,
        src_height: u32,
        dest: &mut [u8],
        dest_width: u32,
        dest_height: u32,
    ) -> CaptureResult<(u32, u32)> {
        let dest_stride = dest_width as usize * BYTES_PER_PIXEL;
        if dest.len() < dest_stride * dest_height as usize {
            return Err(CaptureError::InvalidDestination(format!(
                "{} bytes cannot hold {}x{}",
                dest.len(),
                dest_width,
                dest_height
            )));
        }

        let (width, height) = fit_aspect(src_width, src_height, dest_width, dest_height);
        if width == 0 || height == 0 {
            return Ok((0, 0));
        }

        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if (width, height) == (src_width, src_height) {
            // 1:1, nothing to interpolate
            for (src_row, dest_row) in src
                .chunks_exact(row_bytes)
                .zip(dest.chunks_exact_mut(dest_stride))
                .take(height as usize)
            {
                dest_row[..row_bytes].copy_from_slice(src_row);
            }
            return Ok((width, height));
        }

        // Channel order is irrelevant to interpolation, so BGRA goes through as Rgba
        let view = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(src_width, src_height, src)
            .ok_or_else(|| {
                CaptureError::Resample(anyhow!(
                    "source holds {} bytes, expected {}x{} BGRA8",
                    src.len(),
                    src_width,
                    src_height
                ))
            })?;
        let scaled = imageops::resize(&view, width, height, self.filter.filter_type());

        for (src_row, dest_row) in scaled
            .as_raw()
            .chunks_exact(row_bytes)
            .zip(dest.chunks_exact_mut(dest_stride))
        {
            dest_row[..row_bytes].copy_from_slice(src_row);
        }
        Ok((width, height))
    }
}
