// Error types for the capture pipeline.
//
// Component operations return `CaptureResult`; the manager stops at the first
// failure and hands it up with the failing output and phase attached.

use std::time::Duration;

use thiserror::Error;

/// Stage of a single output's acquire → copy → release cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquirePhase {
    Acquire,
    Map,
    Copy,
    Release,
}

impl std::fmt::Display for AcquirePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Acquire => "acquire",
            Self::Map => "map",
            Self::Copy => "copy",
            Self::Release => "release",
        };
        f.write_str(name)
    }
}

/// Coarse classification used by callers to pick retry vs. reinit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Initialization,
    AcquisitionTimeout,
    AcquisitionFailure,
    Allocation,
    InvalidInput,
    Resample,
    ShutDown,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to initialize capture outputs:\n{0:#}")]
    Initialization(#[source] anyhow::Error),

    #[error("no outputs attached to the desktop could be duplicated")]
    NoOutputs,

    #[error("output #{output} ({name}) produced no frame within {}ms", .timeout.as_millis())]
    AcquisitionTimeout {
        output: usize,
        name: String,
        timeout: Duration,
    },

    #[error("output #{output} ({name}) failed during {phase}:\n{source:#}")]
    Acquisition {
        output: usize,
        name: String,
        phase: AcquirePhase,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "output #{output} surface is {}x{} (pitch {pitch}), expected at least {}x{}",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    SurfaceMismatch {
        output: usize,
        expected: (u32, u32),
        actual: (u32, u32),
        pitch: usize,
    },

    #[error("failed to allocate {bytes} byte scratch buffer")]
    Allocation { bytes: usize },

    #[error("invalid destination buffer: {0}")]
    InvalidDestination(String),

    #[error("failed to resample composited frame:\n{0:#}")]
    Resample(#[source] anyhow::Error),

    #[error("capture manager has been shut down")]
    ShutDown,
}

impl CaptureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Initialization(_) | Self::NoOutputs => ErrorKind::Initialization,
            Self::AcquisitionTimeout { .. } => ErrorKind::AcquisitionTimeout,
            Self::Acquisition { .. } | Self::SurfaceMismatch { .. } => {
                ErrorKind::AcquisitionFailure
            }
            Self::Allocation { .. } => ErrorKind::Allocation,
            Self::InvalidDestination(_) => ErrorKind::InvalidInput,
            Self::Resample(_) => ErrorKind::Resample,
            Self::ShutDown => ErrorKind::ShutDown,
        }
    }

    /// The next capture call may succeed without touching the instance.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::AcquisitionTimeout | ErrorKind::Allocation
        )
    }

    /// Output sessions are likely gone (mode change, access lost);
    /// call [`CaptureManager::reinitialize`](crate::pipeline::CaptureManager::reinitialize).
    pub fn requires_reinit(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Initialization | ErrorKind::AcquisitionFailure
        )
    }

    /// Enumeration index of the output the error refers to.
    pub fn output(&self) -> Option<usize> {
        match self {
            Self::AcquisitionTimeout { output, .. }
            | Self::Acquisition { output, .. }
            | Self::SurfaceMismatch { output, .. } => Some(*output),
            _ => None,
        }
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;
