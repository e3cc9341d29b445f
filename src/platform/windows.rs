// DXGI desktop duplication backend
//
// - `d3d11`: one device per adapter that drives attached outputs
// - `enumerate`: adapter/output discovery → `DuplicatedOutput` per output
// - `duplication`: AcquireNextFrame → staging copy → CPU mapping

mod d3d11;
mod duplication;
mod enumerate;

pub use duplication::DuplicatedOutput;
pub use enumerate::{enable_dpi_awareness, DxgiEnumerator};
