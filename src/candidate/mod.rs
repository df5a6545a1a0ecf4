//! Peak extraction and ranking for the center heatmap.
//!
//! Includes the K×K neighborhood-maximum filter used for suppression and a
//! deterministic Top-K collector.

pub(crate) mod nms;
pub(crate) mod topk;
