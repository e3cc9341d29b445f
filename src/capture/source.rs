/// Which outputs participate in a capture.
///
/// - `Undefined`: nothing is selected, captures are no-ops until a source is set.
/// - `Primary`: the output the OS marks as primary.
/// - `Secondary`: the first non-primary output in enumeration order. Only
///   meaningful on two-monitor setups; a third monitor is never selected.
/// - `FullDesktop`: every output, composited into one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureSource {
    #[default]
    Undefined,
    Primary,
    Secondary,
    FullDesktop,
}

impl CaptureSource {
    /// Parse from a source name ("primary", "secondary", "desktop", "undefined").
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "undefined" | "none" => Some(Self::Undefined),
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "desktop" | "full" | "all" => Some(Self::FullDesktop),
            _ => None,
        }
    }
}
