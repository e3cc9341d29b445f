// Synthetic backend: in-memory outputs that emit scripted frames.
//
// Lets the compositor and manager run without a GPU or a real desktop. Frames
// are stored in native (rotated) orientation with optional row padding, the
// same way a duplication session hands them out.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;

use super::output::{OutputEnumerator, OutputHandle, PixelSurface, BYTES_PER_PIXEL};
use super::types::{OutputDescriptor, Rect, Rotation};
use crate::compose::rotation::source_coords;
use crate::error::{AcquirePhase, CaptureError, CaptureResult};

/// What the next `acquire` call does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntheticEvent {
    /// Deliver the current frame.
    Frame,
    /// No new frame within the timeout.
    Timeout,
    /// Session failure (e.g. access lost after a mode change).
    Fail(String),
}

/// Counters shared between an output and the test observing it.
#[derive(Debug, Default)]
pub struct OutputProbe {
    acquires: AtomicUsize,
    releases: AtomicUsize,
}

impl OutputProbe {
    /// Successful acquisitions (those that owe a release).
    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// In-memory output
#[derive(Clone)]
pub struct SyntheticOutput {
    descriptor: OutputDescriptor,
    native: Vec<u8>,
    pitch: usize,
    script: VecDeque<SyntheticEvent>,
    reuse_last_frame: bool,
    delivered: bool,
    held: bool,
    probe: Arc<OutputProbe>,
}

impl SyntheticOutput {
    /// Build from an upright (desktop-orientation) BGRA8 image covering `descriptor.rect`.
    ///
    /// The image is stored rotated into the output's native orientation.
    pub fn new(descriptor: OutputDescriptor, upright: &[u8]) -> Self {
        let (width, height) = (descriptor.rect.width(), descriptor.rect.height());
        let (native_w, native_h) = descriptor.native_size();
        let pitch = native_w as usize * BYTES_PER_PIXEL;
        let mut native = vec![0u8; pitch * native_h as usize];

        for y in 0..height {
            for x in 0..width {
                let (sx, sy) = source_coords(descriptor.rotation, x, y, width, height);
                let src = (y as usize * width as usize + x as usize) * BYTES_PER_PIXEL;
                let dst = sy as usize * pitch + sx as usize * BYTES_PER_PIXEL;
                native[dst..dst + BYTES_PER_PIXEL]
                    .copy_from_slice(&upright[src..src + BYTES_PER_PIXEL]);
            }
        }

        Self::from_native(descriptor, native, pitch)
    }

    /// Build from raw native-orientation pixels laid out at `pitch` bytes per row.
    pub fn from_native(descriptor: OutputDescriptor, native: Vec<u8>, pitch: usize) -> Self {
        Self {
            descriptor,
            native,
            pitch,
            script: VecDeque::new(),
            reuse_last_frame: false,
            delivered: false,
            held: false,
            probe: Arc::new(OutputProbe::default()),
        }
    }

    /// Output filled with a single BGRA colour.
    pub fn solid(
        index: usize,
        name: &str,
        rect: Rect,
        rotation: Rotation,
        is_primary: bool,
        bgra: [u8; 4],
    ) -> Self {
        let descriptor = OutputDescriptor::new(index, name, rect, rotation, is_primary);
        let pixels = rect.width() as usize * rect.height() as usize;
        let upright = bgra.repeat(pixels);
        Self::new(descriptor, &upright)
    }

    /// Output showing [`coordinate_pattern`] tagged with `tag`.
    pub fn patterned(
        index: usize,
        name: &str,
        rect: Rect,
        rotation: Rotation,
        is_primary: bool,
        tag: u8,
    ) -> Self {
        let descriptor = OutputDescriptor::new(index, name, rect, rotation, is_primary);
        let upright = coordinate_pattern(rect.width(), rect.height(), tag);
        Self::new(descriptor, &upright)
    }

    /// Re-lay rows with `padding` extra bytes at the end of each, like a
    /// hardware surface whose pitch exceeds its visible width.
    pub fn with_row_padding(mut self, padding: usize) -> Self {
        let (native_w, native_h) = self.descriptor.native_size();
        let row_bytes = native_w as usize * BYTES_PER_PIXEL;
        let pitch = row_bytes + padding;
        let mut padded = vec![0xEEu8; pitch * native_h as usize];
        for y in 0..native_h as usize {
            let src = y * self.pitch;
            padded[y * pitch..y * pitch + row_bytes]
                .copy_from_slice(&self.native[src..src + row_bytes]);
        }
        self.native = padded;
        self.pitch = pitch;
        self
    }

    /// Queue events consumed by successive `acquire` calls; once exhausted every
    /// call delivers a frame.
    pub fn with_script(mut self, events: impl IntoIterator<Item = SyntheticEvent>) -> Self {
        self.script.extend(events);
        self
    }

    /// Re-show the last delivered frame when a wait times out. Overridden by
    /// the policy passed to [`SyntheticDesktop::enumerate`].
    pub fn with_reuse_last_frame(mut self, reuse: bool) -> Self {
        self.reuse_last_frame = reuse;
        self
    }

    pub fn probe(&self) -> Arc<OutputProbe> {
        Arc::clone(&self.probe)
    }

    fn surface(&self) -> PixelSurface<'_> {
        let (native_w, native_h) = self.descriptor.native_size();
        PixelSurface::new(&self.native, native_w, native_h, self.pitch)
    }

    fn deliver(&mut self) -> Option<PixelSurface<'_>> {
        self.held = true;
        self.delivered = true;
        self.probe.acquires.fetch_add(1, Ordering::SeqCst);
        Some(self.surface())
    }
}

impl OutputHandle for SyntheticOutput {
    fn descriptor(&self) -> &OutputDescriptor {
        &self.descriptor
    }

    fn acquire(&mut self, _timeout: Duration) -> CaptureResult<Option<PixelSurface<'_>>> {
        match self.script.pop_front().unwrap_or(SyntheticEvent::Frame) {
            SyntheticEvent::Frame => Ok(self.deliver()),
            SyntheticEvent::Timeout if self.reuse_last_frame && self.delivered => {
                Ok(self.deliver())
            }
            SyntheticEvent::Timeout => Ok(None),
            SyntheticEvent::Fail(reason) => Err(CaptureError::Acquisition {
                output: self.descriptor.index,
                name: self.descriptor.name.clone(),
                phase: AcquirePhase::Acquire,
                source: anyhow!(reason),
            }),
        }
    }

    fn release(&mut self) -> CaptureResult<()> {
        if !self.held {
            return Err(CaptureError::Acquisition {
                output: self.descriptor.index,
                name: self.descriptor.name.clone(),
                phase: AcquirePhase::Release,
                source: anyhow!("release without a matching acquire"),
            });
        }
        self.held = false;
        self.probe.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Enumerator over a fixed set of synthetic outputs.
///
/// Every `enumerate` call hands out fresh clones, so re-initialization sees the
/// same topology and the same probes.
#[derive(Clone, Default)]
pub struct SyntheticDesktop {
    outputs: Vec<SyntheticOutput>,
    failure: Option<String>,
    enumerations: Arc<AtomicUsize>,
}

impl SyntheticDesktop {
    pub fn new(outputs: Vec<SyntheticOutput>) -> Self {
        Self {
            outputs,
            failure: None,
            enumerations: Arc::default(),
        }
    }

    /// Enumeration fails with `reason`, like a machine without usable adapters.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Number of `enumerate` calls so far.
    pub fn enumerations(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.enumerations)
    }
}

impl OutputEnumerator for SyntheticDesktop {
    fn enumerate(&mut self, reuse_last_frame: bool) -> CaptureResult<Vec<Box<dyn OutputHandle>>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(CaptureError::Initialization(anyhow!(reason.clone())));
        }
        Ok(self
            .outputs
            .iter()
            .cloned()
            .map(|output| {
                Box::new(output.with_reuse_last_frame(reuse_last_frame)) as Box<dyn OutputHandle>
            })
            .collect())
    }
}

/// Upright BGRA8 test image where pixel (x, y) is `[x, y, tag, 255]` (x and y wrap at 256).
pub fn coordinate_pattern(width: u32, height: u32, tag: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[x as u8, y as u8, tag, 255]);
        }
    }
    data
}
