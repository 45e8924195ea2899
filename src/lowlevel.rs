//! Low-level building blocks for custom matching pipelines.
//!
//! These expose the rasterizer, per-pixel comparison and post-processing
//! stages used by `Matcher`. Most users should prefer `Matcher::run_with`.

pub use crate::circle::{circle_offsets, CircleCache, Offset};
pub use crate::diff::{ring_vector_diff, DiffParams, RingDiffCache, PERFECT_MATCH_MSE};
pub use crate::postprocess::{fix_circle_defects, render_heat_map, MIN_AVERAGE_BIAS};
pub use crate::search::{ProgressFn, ScanRegion};
pub use crate::vector::{RingLayout, RingSource};
