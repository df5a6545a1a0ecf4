//! shelfscout turns the dense outputs of a panoptic shelf model into
//! inventory signals.
//!
//! The model emits three feature-space grids per image: a foreground
//! probability map, a center heatmap and an offset field. This crate decodes
//! object centers with max-filter suppression, reconstructs instances by
//! offset-guided nearest-center assignment, partitions the grid into
//! product, empty and background regions, and reduces those to an empty-shelf
//! ratio. Every stage is a pure function; row parallelism is available via
//! the `rayon` feature.

mod candidate;
pub mod decode;
pub mod grid;
pub mod instance;
#[cfg(feature = "image-io")]
pub mod io;
pub mod lowlevel;
pub mod pipeline;
pub mod region;
mod trace;
pub mod util;

pub use decode::{decode_centers, Center, CenterConfig};
pub use grid::maps::{Heatmap, OffsetField, ProbabilityMap};
pub use grid::{Grid, InstanceMap, Mask};
pub use instance::{count_instances, reconstruct_instances, InstanceConfig};
pub use pipeline::{ModelOutputs, PostProcessConfig, PostProcessor, ShelfReport, ShelfSummary};
pub use region::{empty_ratio, segment_regions, RegionConfig, RegionMasks, ShelfBox};
pub use util::{ShelfError, ShelfResult};
