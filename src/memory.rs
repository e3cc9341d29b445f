// Buffer management for the capture path

mod scale_cache;

pub use scale_cache::{CacheStats, ScaleCache};
