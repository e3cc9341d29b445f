// 捕获源与输出模块
//
// Output geometry, the capture-source policy and the `OutputHandle` seam that
// the compositor acquires frames through.

pub mod output;
pub mod registry;
pub mod source;
pub mod synthetic;
pub mod types;

// 重新导出常用类型
pub use output::{OutputEnumerator, OutputHandle, PixelSurface, BYTES_PER_PIXEL};
pub use registry::OutputRegistry;
pub use source::CaptureSource;
pub use types::{OutputDescriptor, Rect, Rotation};
