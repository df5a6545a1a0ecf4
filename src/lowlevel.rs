//! Low-level building blocks for custom decoding pipelines.
//!
//! Most callers should prefer [`crate::PostProcessor`] or the per-stage
//! functions re-exported at the crate root.

pub use crate::candidate::nms::{local_peaks, neighborhood_max};
pub use crate::candidate::topk::{Peak, TopK};
pub use crate::region::bounding_box;
