// Frame compositor: stitches selected outputs into one upright BGRA8 image.
//
// Each output is acquired, copied (rotation-normalized) into the destination at
// its offset within the virtual desktop rectangle, then released. An output's
// acquisition is always paired with its release, even when the copy fails.

pub mod rotation;

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::capture::{OutputHandle, PixelSurface, Rect, Rotation, BYTES_PER_PIXEL};
use crate::config::MAX_ACQUIRE_TIMEOUT;
use crate::error::{CaptureError, CaptureResult};

/// Writes outputs into a destination buffer of stride `dest_width * 4`.
#[derive(Debug, Clone)]
pub struct FrameCompositor {
    acquire_timeout: Duration,
}

impl FrameCompositor {
    /// `acquire_timeout` is clamped to [`MAX_ACQUIRE_TIMEOUT`].
    pub fn new(acquire_timeout: Duration) -> Self {
        Self {
            acquire_timeout: acquire_timeout.min(MAX_ACQUIRE_TIMEOUT),
        }
    }

    /// Composite `outputs` into `dest`.
    ///
    /// `dest` is `dest_width` pixels wide; its height is `dest.len() / (dest_width * 4)`.
    /// Upright pixel (0, 0) of each output lands at the output's offset from
    /// `virtual_rect`; anything outside the destination is clipped.
    ///
    /// Stops at the first failing output and returns its error. Outputs
    /// composited before it keep their pixels in `dest`; the caller decides
    /// whether that partial frame is usable.
    ///
    /// Returns the number of outputs composited.
    pub fn compose(
        &self,
        outputs: &mut [&mut dyn OutputHandle],
        virtual_rect: Rect,
        dest: &mut [u8],
        dest_width: u32,
    ) -> CaptureResult<usize> {
        let mut composed = 0;
        for output in outputs.iter_mut() {
            if let Err(err) = self.compose_output(&mut **output, virtual_rect, dest, dest_width) {
                warn!(
                    "Output #{} failed after {} composited: {}",
                    output.descriptor().index,
                    composed,
                    err
                );
                return Err(err);
            }
            composed += 1;
        }
        Ok(composed)
    }

    fn compose_output(
        &self,
        output: &mut dyn OutputHandle,
        virtual_rect: Rect,
        dest: &mut [u8],
        dest_width: u32,
    ) -> CaptureResult<()> {
        let descriptor = output.descriptor().clone();

        let Some(surface) = output.acquire(self.acquire_timeout)? else {
            return Err(CaptureError::AcquisitionTimeout {
                output: descriptor.index,
                name: descriptor.name,
                timeout: self.acquire_timeout,
            });
        };

        let placement = Placement {
            rotation: descriptor.rotation,
            width: descriptor.rect.width(),
            height: descriptor.rect.height(),
            offset: descriptor.rect.offset_from(&virtual_rect),
        };
        let copied = blit(&surface, &placement, dest, dest_width).map_err(|actual| {
            CaptureError::SurfaceMismatch {
                output: descriptor.index,
                expected: descriptor.native_size(),
                actual,
                pitch: surface.pitch,
            }
        });

        // Release regardless of the copy result
        let released = output.release();
        copied?;
        released?;

        trace!(
            "Composited output #{} ({}) at {:?}",
            descriptor.index,
            descriptor.name,
            placement.offset
        );
        Ok(())
    }
}

/// Where and how one output lands in the destination.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub rotation: Rotation,
    /// Upright footprint
    pub width: u32,
    pub height: u32,
    /// Top-left in destination pixels; may be negative
    pub offset: (i64, i64),
}

/// Copy `surface` upright into `dest` per `placement`, clipping to the destination.
///
/// Fails with the surface's actual size when it cannot cover the placement's
/// native footprint.
pub fn blit(
    surface: &PixelSurface<'_>,
    placement: &Placement,
    dest: &mut [u8],
    dest_width: u32,
) -> Result<(), (u32, u32)> {
    let (native_w, native_h) = placement
        .rotation
        .native_size(placement.width, placement.height);
    if surface.width < native_w || surface.height < native_h || !surface.is_consistent() {
        return Err((surface.width, surface.height));
    }
    if dest_width == 0 {
        return Ok(());
    }

    let dest_height = (dest.len() / (dest_width as usize * BYTES_PER_PIXEL)) as i64;
    let (ox, oy) = placement.offset;
    let x0 = (-ox).max(0);
    let y0 = (-oy).max(0);
    let x1 = (placement.width as i64).min(dest_width as i64 - ox);
    let y1 = (placement.height as i64).min(dest_height - oy);
    if x0 >= x1 || y0 >= y1 {
        debug!("Output at {:?} lies outside the destination", placement.offset);
        return Ok(());
    }

    let dest_stride = dest_width as usize * BYTES_PER_PIXEL;
    let span = (x1 - x0) as usize * BYTES_PER_PIXEL;

    match placement.rotation {
        Rotation::Identity => {
            for y in y0..y1 {
                let src_start = x0 as usize * BYTES_PER_PIXEL;
                let src = &surface.row(y as u32)[src_start..src_start + span];
                let dst_start = (oy + y) as usize * dest_stride + (ox + x0) as usize * BYTES_PER_PIXEL;
                dest[dst_start..dst_start + span].copy_from_slice(src);
            }
        }
        rotated => {
            for y in y0..y1 {
                let row_start = (oy + y) as usize * dest_stride;
                for x in x0..x1 {
                    let (sx, sy) = rotation::source_coords(
                        rotated,
                        x as u32,
                        y as u32,
                        placement.width,
                        placement.height,
                    );
                    let dst = row_start + (ox + x) as usize * BYTES_PER_PIXEL;
                    dest[dst..dst + BYTES_PER_PIXEL].copy_from_slice(surface.pixel(sx, sy));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::{SyntheticEvent, SyntheticOutput};

    const TIMEOUT: Duration = Duration::from_millis(20);

    fn pixel(dest: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let at = ((y * width + x) as usize) * BYTES_PER_PIXEL;
        [dest[at], dest[at + 1], dest[at + 2], dest[at + 3]]
    }

    #[test]
    fn test_side_by_side_placement() {
        let mut left = SyntheticOutput::solid(0, "L", Rect::new(-2, 0, 0, 2), Rotation::Identity, false, [1, 1, 1, 255]);
        let mut right = SyntheticOutput::solid(1, "R", Rect::new(0, 0, 3, 2), Rotation::Identity, true, [2, 2, 2, 255]);
        let virtual_rect = Rect::new(-2, 0, 3, 2);
        let mut dest = vec![0u8; 5 * 2 * 4];

        let compositor = FrameCompositor::new(TIMEOUT);
        let composed = compositor
            .compose(&mut [&mut left, &mut right], virtual_rect, &mut dest, 5)
            .unwrap();

        assert_eq!(composed, 2);
        assert_eq!(pixel(&dest, 5, 0, 0), [1, 1, 1, 255]);
        assert_eq!(pixel(&dest, 5, 1, 1), [1, 1, 1, 255]);
        assert_eq!(pixel(&dest, 5, 2, 0), [2, 2, 2, 255]);
        assert_eq!(pixel(&dest, 5, 4, 1), [2, 2, 2, 255]);
    }

    #[test]
    fn test_rotated_output_lands_upright() {
        let rect = Rect::new(0, 0, 3, 4);
        for rotation in [Rotation::Rotate90, Rotation::Rotate180, Rotation::Rotate270] {
            let mut output = SyntheticOutput::patterned(0, "R", rect, rotation, true, 9).with_row_padding(12);
            let mut dest = vec![0u8; 3 * 4 * 4];
            FrameCompositor::new(TIMEOUT)
                .compose(&mut [&mut output], rect, &mut dest, 3)
                .unwrap();
            for y in 0..4 {
                for x in 0..3 {
                    assert_eq!(pixel(&dest, 3, x, y), [x as u8, y as u8, 9, 255], "{rotation:?}");
                }
            }
        }
    }

    #[test]
    fn test_clips_to_destination() {
        let mut output = SyntheticOutput::patterned(0, "A", Rect::new(0, 0, 4, 4), Rotation::Rotate90, true, 1);
        // destination smaller than the output, and the output starts at (1, 1)
        let virtual_rect = Rect::new(-1, -1, 3, 3);
        let mut dest = vec![0u8; 3 * 3 * 4];
        FrameCompositor::new(TIMEOUT)
            .compose(&mut [&mut output], virtual_rect, &mut dest, 3)
            .unwrap();
        assert_eq!(pixel(&dest, 3, 0, 0), [0; 4]);
        assert_eq!(pixel(&dest, 3, 1, 1), [0, 0, 1, 255]);
        assert_eq!(pixel(&dest, 3, 2, 2), [1, 1, 1, 255]);
    }

    #[test]
    fn test_failure_stops_and_keeps_earlier_pixels() {
        let mut first = SyntheticOutput::solid(0, "A", Rect::new(0, 0, 1, 1), Rotation::Identity, true, [7; 4]);
        let mut second = SyntheticOutput::solid(1, "B", Rect::new(1, 0, 2, 1), Rotation::Identity, false, [8; 4])
            .with_script([SyntheticEvent::Fail("access lost".into())]);
        let mut third = SyntheticOutput::solid(2, "C", Rect::new(2, 0, 3, 1), Rotation::Identity, false, [9; 4]);
        let probes = [first.probe(), second.probe(), third.probe()];
        let mut dest = vec![0u8; 3 * 4];

        let err = FrameCompositor::new(TIMEOUT)
            .compose(&mut [&mut first, &mut second, &mut third], Rect::new(0, 0, 3, 1), &mut dest, 3)
            .unwrap_err();

        assert_eq!(err.output(), Some(1));
        assert_eq!(pixel(&dest, 3, 0, 0), [7; 4]);
        assert_eq!(pixel(&dest, 3, 1, 0), [0; 4]);
        assert_eq!(pixel(&dest, 3, 2, 0), [0; 4]);
        for probe in &probes {
            assert_eq!(probe.acquires(), probe.releases());
        }
        assert_eq!(probes[2].acquires(), 0);
    }

    #[test]
    fn test_timeout_without_retained_frame() {
        let mut output = SyntheticOutput::solid(0, "A", Rect::new(0, 0, 1, 1), Rotation::Identity, true, [1; 4])
            .with_script([SyntheticEvent::Timeout]);
        let mut dest = vec![0u8; 4];
        let err = FrameCompositor::new(TIMEOUT)
            .compose(&mut [&mut output], Rect::new(0, 0, 1, 1), &mut dest, 1)
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(output.probe().releases(), 0);
    }

    #[test]
    fn test_unbounded_timeout_is_clamped() {
        let mut output = SyntheticOutput::solid(0, "A", Rect::new(0, 0, 1, 1), Rotation::Identity, true, [1; 4])
            .with_script([SyntheticEvent::Timeout]);
        let mut dest = vec![0u8; 4];
        let err = FrameCompositor::new(Duration::MAX)
            .compose(&mut [&mut output], Rect::new(0, 0, 1, 1), &mut dest, 1)
            .unwrap_err();
        assert!(matches!(
            err,
            CaptureError::AcquisitionTimeout { timeout, .. } if timeout == MAX_ACQUIRE_TIMEOUT
        ));
    }

    #[test]
    fn test_undersized_surface_is_released() {
        let descriptor = crate::capture::OutputDescriptor::new(0, "A", Rect::new(0, 0, 4, 4), Rotation::Identity, true);
        // native surface holds only 2x2
        let mut output = SyntheticOutput::from_native(descriptor, vec![0u8; 2 * 2 * 4], 8);
        let probe = output.probe();
        let mut dest = vec![0u8; 4 * 4 * 4];

        let err = FrameCompositor::new(TIMEOUT)
            .compose(&mut [&mut output], Rect::new(0, 0, 4, 4), &mut dest, 4)
            .unwrap_err();

        assert!(matches!(err, CaptureError::SurfaceMismatch { .. }));
        assert_eq!((probe.acquires(), probe.releases()), (1, 1));
    }
}
