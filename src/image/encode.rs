// Still-image encoding of captured BGRA8 frames via the `image` crate.
//
// PNG, BMP and TIFF keep alpha; JPEG drops it.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

use crate::capture::BYTES_PER_PIXEL;

/// Output container, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeFormat {
    Png,
    Bmp,
    Jpeg,
    Tiff,
}

impl EncodeFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "tiff" | "tif" => Some(Self::Tiff),
            _ => None,
        }
    }
}

/// Swap blue and red so BGRA8 bytes read as RGBA8.
pub fn bgra_to_rgba(data: &[u8]) -> Vec<u8> {
    let mut rgba = data.to_vec();
    for px in rgba.chunks_exact_mut(BYTES_PER_PIXEL) {
        px.swap(0, 2);
    }
    rgba
}

/// Write a tightly packed `width x height` BGRA8 frame to `path`.
pub fn save_bgra(path: &Path, data: &[u8], width: u32, height: u32) -> Result<()> {
    let Some(format) = EncodeFormat::from_path(path) else {
        bail!(
            "unsupported extension on {}; supported: .png .bmp .jpg .tiff",
            path.display()
        );
    };
    let expected = width as usize * height as usize * BYTES_PER_PIXEL;
    ensure!(
        data.len() == expected,
        "frame holds {} bytes, expected {} for {}x{}",
        data.len(),
        expected,
        width,
        height
    );

    let rgba = bgra_to_rgba(data);
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        EncodeFormat::Png => {
            PngEncoder::new_with_quality(writer, CompressionType::Fast, FilterType::Sub)
                .write_image(&rgba, width, height, ExtendedColorType::Rgba8)?;
        }
        EncodeFormat::Jpeg => {
            let rgb: Vec<u8> = rgba
                .chunks_exact(BYTES_PER_PIXEL)
                .flat_map(|px| &px[..3])
                .copied()
                .collect();
            image::write_buffer_with_format(
                &mut writer,
                &rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
                ImageFormat::Jpeg,
            )?;
        }
        EncodeFormat::Bmp | EncodeFormat::Tiff => {
            let container = if format == EncodeFormat::Bmp {
                ImageFormat::Bmp
            } else {
                ImageFormat::Tiff
            };
            image::write_buffer_with_format(
                &mut writer,
                &rgba,
                width,
                height,
                ExtendedColorType::Rgba8,
                container,
            )?;
        }
    }
    Ok(())
}
