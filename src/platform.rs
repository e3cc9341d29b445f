// Platform backends implementing the output seam

#[cfg(windows)]
pub mod windows;
