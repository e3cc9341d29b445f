// Output registry: owns the duplicated outputs and applies the capture-source policy

use super::output::OutputHandle;
use super::source::CaptureSource;
use super::types::{OutputDescriptor, Rect};

/// The set of outputs discovered at initialization, in enumeration order.
pub struct OutputRegistry {
    outputs: Vec<Box<dyn OutputHandle>>,
}

impl OutputRegistry {
    pub fn new(outputs: Vec<Box<dyn OutputHandle>>) -> Self {
        Self { outputs }
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &OutputDescriptor> {
        self.outputs.iter().map(|output| output.descriptor())
    }

    /// Registry positions selected by `source`, ascending.
    ///
    /// - `Primary`: the primary output, if any (at most one).
    /// - `Secondary`: the first non-primary output (at most one).
    /// - `FullDesktop`: every output.
    /// - `Undefined`: nothing.
    pub fn select_indices(&self, source: CaptureSource) -> Vec<usize> {
        let mut positions = self.descriptors().enumerate();
        match source {
            CaptureSource::Undefined => Vec::new(),
            CaptureSource::Primary => positions
                .find(|(_, desc)| desc.is_primary)
                .map(|(i, _)| i)
                .into_iter()
                .collect(),
            CaptureSource::Secondary => positions
                .find(|(_, desc)| !desc.is_primary)
                .map(|(i, _)| i)
                .into_iter()
                .collect(),
            CaptureSource::FullDesktop => (0..self.outputs.len()).collect(),
        }
    }

    /// Outputs selected by `source`, in enumeration order.
    pub fn select(&self, source: CaptureSource) -> Vec<&dyn OutputHandle> {
        self.select_indices(source)
            .into_iter()
            .map(|i| self.outputs[i].as_ref())
            .collect()
    }

    /// Mutable variant of [`select`](Self::select), for acquiring frames.
    pub fn select_mut(&mut self, source: CaptureSource) -> Vec<&mut dyn OutputHandle> {
        let selected = self.select_indices(source);
        self.outputs
            .iter_mut()
            .enumerate()
            .filter(|(i, _)| selected.contains(i))
            .map(|(_, output)| output.as_mut() as &mut dyn OutputHandle)
            .collect()
    }

    /// Virtual desktop rectangle: bounding box of the selected outputs.
    pub fn virtual_rect(&self, source: CaptureSource) -> Rect {
        Rect::bounding(
            self.select(source)
                .into_iter()
                .map(|output| &output.descriptor().rect),
        )
    }
}
