// Capture configuration and its environment-variable overlay

use std::time::Duration;

use tracing::warn;

use crate::capture::CaptureSource;
use crate::image::ResampleFilter;

pub const ENV_ACQUIRE_TIMEOUT_MS: &str = "DXGICAPTURE_ACQUIRE_TIMEOUT_MS";
pub const ENV_REUSE_LAST_FRAME: &str = "DXGICAPTURE_REUSE_LAST_FRAME";
pub const ENV_FILTER: &str = "DXGICAPTURE_FILTER";
pub const ENV_SOURCE: &str = "DXGICAPTURE_SOURCE";

/// Default per-output wait for a new frame
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(20);

/// Upper bound on the per-output wait. Longer requests are clamped so a
/// capture call always returns.
pub const MAX_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// How long each output waits for a new frame, at most [`MAX_ACQUIRE_TIMEOUT`]
    pub acquire_timeout: Duration,
    /// Re-show an output's previous frame when no new one arrives in time
    pub reuse_last_frame: bool,
    /// Interpolation for the scaled path
    pub resample_filter: ResampleFilter,
    /// Initial capture source
    pub source: CaptureSource,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            reuse_last_frame: true,
            resample_filter: ResampleFilter::default(),
            source: CaptureSource::default(),
        }
    }
}

impl CaptureConfig {
    /// Defaults overlaid with `DXGICAPTURE_*` environment variables.
    ///
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup` (variable name → raw value).
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_ACQUIRE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 && ms <= MAX_ACQUIRE_TIMEOUT.as_millis() as u64 => {
                    self.acquire_timeout = Duration::from_millis(ms)
                }
                _ => warn!(
                    "Ignoring {}={:?}: expected a positive integer up to {}",
                    ENV_ACQUIRE_TIMEOUT_MS,
                    raw,
                    MAX_ACQUIRE_TIMEOUT.as_millis()
                ),
            }
        }
        if let Some(raw) = lookup(ENV_REUSE_LAST_FRAME) {
            match parse_flag(&raw) {
                Some(flag) => self.reuse_last_frame = flag,
                None => warn!("Ignoring {}={:?}: expected a boolean", ENV_REUSE_LAST_FRAME, raw),
            }
        }
        if let Some(raw) = lookup(ENV_FILTER) {
            match ResampleFilter::from_name(&raw) {
                Some(filter) => self.resample_filter = filter,
                None => warn!("Ignoring {}={:?}: unknown filter", ENV_FILTER, raw),
            }
        }
        if let Some(raw) = lookup(ENV_SOURCE) {
            match CaptureSource::from_name(&raw) {
                Some(source) => self.source = source,
                None => warn!("Ignoring {}={:?}: unknown capture source", ENV_SOURCE, raw),
            }
        }
        self
    }

    pub fn with_source(mut self, source: CaptureSource) -> Self {
        self.source = source;
        self
    }

    /// Clamped to [`MAX_ACQUIRE_TIMEOUT`].
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout.min(MAX_ACQUIRE_TIMEOUT);
        self
    }

    pub fn with_reuse_last_frame(mut self, reuse: bool) -> Self {
        self.reuse_last_frame = reuse;
        self
    }

    pub fn with_resample_filter(mut self, filter: ResampleFilter) -> Self {
        self.resample_filter = filter;
        self
    }
}

/// `1/true/yes/on` or `0/false/no/off`, case-insensitive.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
