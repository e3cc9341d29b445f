// Capture pipeline: output discovery → source selection → composition → optional downscale
//
// `CaptureManager` owns the discovered outputs and the scale buffer. Each
// `get_frame` recomputes the virtual desktop rectangle of the selected outputs:
// - fits the destination: composite straight into it (stride = dest width)
// - larger than the destination: composite into the cached full-size buffer,
//   then resample into the destination's top-left
// Calls must be serialized per instance; nothing here is reentrant.

mod types;

pub use types::{CapturedFrame, FrameInfo, FramePath, ManagerState};

use tracing::{debug, info, instrument};

use crate::capture::{
    CaptureSource, OutputDescriptor, OutputEnumerator, OutputRegistry, Rect, BYTES_PER_PIXEL,
};
use crate::compose::FrameCompositor;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::image::{ImageResampler, Resampler};
use crate::memory::{CacheStats, ScaleCache};

/// Multi-output capture manager
///
/// # Examples
/// ```
/// use dxgicapture::capture::synthetic::{SyntheticDesktop, SyntheticOutput};
/// use dxgicapture::capture::{CaptureSource, Rect, Rotation};
/// use dxgicapture::{CaptureConfig, CaptureManager};
///
/// let desktop = SyntheticDesktop::new(vec![SyntheticOutput::solid(
///     0, "A", Rect::new(0, 0, 64, 32), Rotation::Identity, true, [0, 0, 255, 255],
/// )]);
/// let mut manager = CaptureManager::new(Box::new(desktop), CaptureConfig::default());
/// manager.set_capture_source(CaptureSource::Primary);
///
/// let frame = manager.capture(32, 32).unwrap();
/// assert_eq!((frame.info.content_width, frame.info.content_height), (32, 16));
/// ```
pub struct CaptureManager {
    enumerator: Box<dyn OutputEnumerator>,
    registry: Option<OutputRegistry>,
    state: ManagerState,
    source: CaptureSource,
    reuse_last_frame: bool,
    compositor: FrameCompositor,
    cache: ScaleCache,
    resampler: Box<dyn Resampler>,
}

impl CaptureManager {
    /// Manager over `enumerator`'s outputs. Nothing is discovered until the
    /// first call that needs outputs (or an explicit [`init`](Self::init)).
    pub fn new(enumerator: Box<dyn OutputEnumerator>, config: CaptureConfig) -> Self {
        Self {
            enumerator,
            registry: None,
            state: ManagerState::Uninitialized,
            source: config.source,
            reuse_last_frame: config.reuse_last_frame,
            compositor: FrameCompositor::new(config.acquire_timeout),
            cache: ScaleCache::new(),
            resampler: Box::new(ImageResampler::new(config.resample_filter)),
        }
    }

    /// Manager over the real desktop through DXGI desktop duplication.
    #[cfg(windows)]
    pub fn dxgi(config: CaptureConfig) -> Self {
        Self::new(Box::new(crate::platform::windows::DxgiEnumerator), config)
    }

    /// Replace the resampler used on the scaled path.
    pub fn with_resampler(mut self, resampler: Box<dyn Resampler>) -> Self {
        self.resampler = resampler;
        self
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Allocation counters of the scaled path's buffer.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Discover and duplicate outputs. A no-op when already initialized.
    ///
    /// On failure the manager stays uninitialized and the next call retries.
    #[instrument(skip_all, err)]
    pub fn init(&mut self) -> CaptureResult<()> {
        match self.state {
            ManagerState::Initialized => return Ok(()),
            ManagerState::Shutdown => return Err(CaptureError::ShutDown),
            ManagerState::Uninitialized => {}
        }

        let outputs = self.enumerator.enumerate(self.reuse_last_frame)?;
        if outputs.is_empty() {
            return Err(CaptureError::NoOutputs);
        }
        let registry = OutputRegistry::new(outputs);
        info!(
            "Capture initialized: {} outputs, desktop {:?}",
            registry.len(),
            registry.virtual_rect(CaptureSource::FullDesktop)
        );
        self.registry = Some(registry);
        self.state = ManagerState::Initialized;
        Ok(())
    }

    /// Drop every output and discover again, e.g. after access to a
    /// duplication session was lost.
    pub fn reinitialize(&mut self) -> CaptureResult<()> {
        if self.state == ManagerState::Shutdown {
            return Err(CaptureError::ShutDown);
        }
        debug!("Reinitializing capture outputs");
        self.registry = None;
        self.cache.invalidate();
        self.state = ManagerState::Uninitialized;
        self.init()
    }

    /// Release all outputs. Terminal: every later call returns `ShutDown`.
    pub fn shutdown(&mut self) {
        if self.state != ManagerState::Shutdown {
            info!("Capture shut down");
        }
        self.registry = None;
        self.cache.invalidate();
        self.state = ManagerState::Shutdown;
    }

    /// Takes effect on the next capture call.
    pub fn set_capture_source(&mut self, source: CaptureSource) {
        self.source = source;
    }

    pub fn get_capture_source(&self) -> CaptureSource {
        self.source
    }

    /// Descriptors of all discovered outputs, in enumeration order.
    pub fn outputs(&mut self) -> CaptureResult<Vec<OutputDescriptor>> {
        Ok(self.registry()?.descriptors().cloned().collect())
    }

    /// Bounding box of the selected outputs; all zeros when nothing is selected.
    pub fn get_output_rect(&mut self) -> CaptureResult<Rect> {
        let source = self.source;
        Ok(self.registry()?.virtual_rect(source))
    }

    /// Fill `dest` (BGRA8, stride = `dest_rect.width() * 4`) with the selected outputs.
    ///
    /// Scaled content keeps the desktop's aspect ratio and sits at the top-left;
    /// the letterbox is left untouched. With no outputs selected the call
    /// succeeds without writing.
    ///
    /// If an output fails, outputs composited before it keep their pixels
    /// and the error names the failing output.
    #[instrument(skip_all, fields(dest = ?dest_rect), err)]
    pub fn get_frame(&mut self, dest: &mut [u8], dest_rect: Rect) -> CaptureResult<FrameInfo> {
        let source = self.source;
        let (dest_width, dest_height) = (dest_rect.width(), dest_rect.height());
        let needed = (dest_width as usize)
            .checked_mul(dest_height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or_else(|| {
                CaptureError::InvalidDestination(format!("{dest_width}x{dest_height} overflows"))
            })?;
        if dest.len() < needed {
            return Err(CaptureError::InvalidDestination(format!(
                "{} bytes cannot hold {}x{} BGRA8 ({} bytes)",
                dest.len(),
                dest_width,
                dest_height,
                needed
            )));
        }

        self.init()?;
        let Some(registry) = self.registry.as_mut() else {
            return Err(CaptureError::ShutDown);
        };

        let virtual_rect = registry.virtual_rect(source);
        if virtual_rect.is_empty() || dest_width == 0 || dest_height == 0 {
            debug!("Nothing to capture for {:?}", source);
            return Ok(FrameInfo::skipped(virtual_rect));
        }

        let (src_width, src_height) = (virtual_rect.width(), virtual_rect.height());
        let mut selected = registry.select_mut(source);

        if src_width > dest_width || src_height > dest_height {
            debug!(
                "Scaled path: {}x{} -> {}x{}",
                src_width, src_height, dest_width, dest_height
            );
            let scratch = self.cache.get_or_resize(virtual_rect)?;
            let outputs = self
                .compositor
                .compose(&mut selected, virtual_rect, scratch, src_width)?;
            let (content_width, content_height) = self.resampler.resample(
                scratch,
                src_width,
                src_height,
                &mut dest[..needed],
                dest_width,
                dest_height,
            )?;
            Ok(FrameInfo {
                path: FramePath::Scaled,
                virtual_rect,
                outputs,
                content_width,
                content_height,
            })
        } else {
            let outputs = self
                .compositor
                .compose(&mut selected, virtual_rect, &mut dest[..needed], dest_width)?;
            Ok(FrameInfo {
                path: FramePath::Direct,
                virtual_rect,
                outputs,
                content_width: src_width,
                content_height: src_height,
            })
        }
    }

    /// Capture into a fresh zeroed `width x height` frame.
    pub fn capture(&mut self, width: u32, height: u32) -> CaptureResult<CapturedFrame> {
        let dest_rect = Rect::checked_from_size(width, height).ok_or_else(|| {
            CaptureError::InvalidDestination(format!(
                "{}x{} exceeds the desktop coordinate range",
                width, height
            ))
        })?;
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|pixels| pixels.checked_mul(BYTES_PER_PIXEL))
            .ok_or(CaptureError::Allocation { bytes: usize::MAX })?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|_| CaptureError::Allocation { bytes })?;
        data.resize(bytes, 0);

        let info = self.get_frame(&mut data, dest_rect)?;
        Ok(CapturedFrame {
            data,
            width,
            height,
            info,
        })
    }

    fn registry(&mut self) -> CaptureResult<&OutputRegistry> {
        self.init()?;
        self.registry.as_ref().ok_or(CaptureError::ShutDown)
    }
}
