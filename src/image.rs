// Pixel post-processing for captured frames.
//
// - `resample`: aspect-preserving scaling into a caller rectangle
// - `encode`: saving BGRA8 frames as PNG/BMP/JPEG/TIFF

pub mod encode;
pub mod resample;

pub use encode::save_bgra;
pub use resample::{fit_aspect, ImageResampler, ResampleFilter, Resampler};
