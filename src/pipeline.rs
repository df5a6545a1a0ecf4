//! End-to-end post-processing of one model forward pass.
//!
//! [`PostProcessor`] owns a validated [`PostProcessConfig`] and threads a
//! single stride through center decoding and instance reconstruction.

use crate::decode::{decode_centers, validate_stride, Center, CenterConfig};
use crate::grid::maps::{Heatmap, OffsetField, ProbabilityMap};
use crate::grid::{ensure_shape, InstanceMap};
use crate::instance::{count_instances, reconstruct_instances, InstanceConfig};
use crate::region::{segment_regions, RegionConfig, RegionMasks, ShelfBox};
use crate::trace::{trace_event, trace_span};
use crate::util::ShelfResult;

/// The three feature-space grids produced by the model for one image.
#[derive(Clone, Debug)]
pub struct ModelOutputs {
    semantic: ProbabilityMap,
    centers: Heatmap,
    offsets: OffsetField,
}

impl ModelOutputs {
    /// Bundles the grids, checking that they share one shape.
    pub fn new(
        semantic: ProbabilityMap,
        centers: Heatmap,
        offsets: OffsetField,
    ) -> ShelfResult<Self> {
        ensure_shape(semantic.shape(), centers.shape(), "center heatmap")?;
        ensure_shape(semantic.shape(), offsets.shape(), "offset field")?;
        Ok(Self {
            semantic,
            centers,
            offsets,
        })
    }

    /// Foreground probability map.
    pub fn semantic(&self) -> &ProbabilityMap {
        &self.semantic
    }

    /// Center heatmap logits.
    pub fn centers(&self) -> &Heatmap {
        &self.centers
    }

    /// Offset field.
    pub fn offsets(&self) -> &OffsetField {
        &self.offsets
    }

    /// Feature-map `(width, height)`.
    pub fn shape(&self) -> (usize, usize) {
        self.semantic.shape()
    }
}

/// Configuration for every stage of the pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostProcessConfig {
    /// Pixels per feature cell, shared by decoding and reconstruction.
    pub stride: usize,
    pub centers: CenterConfig,
    pub instances: InstanceConfig,
    pub regions: RegionConfig,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            stride: 4,
            centers: CenterConfig::default(),
            instances: InstanceConfig::default(),
            regions: RegionConfig::default(),
        }
    }
}

impl PostProcessConfig {
    /// Validates every stage.
    pub fn validate(&self) -> ShelfResult<()> {
        validate_stride(self.stride)?;
        self.centers.validate()?;
        self.instances.validate()?;
        self.regions.validate()
    }

    /// Enables or disables row parallelism in every stage that supports it.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.centers.parallel = parallel;
        self.instances.parallel = parallel;
        self
    }
}

/// Scalar statistics for one processed image.
#[derive(Clone, Debug, PartialEq)]
pub struct ShelfSummary {
    pub empty_ratio: f32,
    pub decoded_centers: usize,
    pub predicted_instances: usize,
    pub product_pixels: usize,
    pub empty_pixels: usize,
    /// `[height, width]` of the feature map.
    pub feature_map_size: [usize; 2],
    pub shelf_bbox: Option<ShelfBox>,
}

/// Every output of the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ShelfReport {
    pub centers: Vec<Center>,
    pub instances: InstanceMap,
    pub regions: RegionMasks,
    pub empty_ratio: f32,
}

impl ShelfReport {
    /// Reduces the report to its scalar statistics.
    pub fn summary(&self) -> ShelfSummary {
        ShelfSummary {
            empty_ratio: self.empty_ratio,
            decoded_centers: self.centers.len(),
            predicted_instances: count_instances(&self.instances),
            product_pixels: self.regions.product_pixels(),
            empty_pixels: self.regions.empty_pixels(),
            feature_map_size: [self.instances.height(), self.instances.width()],
            shelf_bbox: self.regions.shelf_box,
        }
    }
}

/// Caller-owned post-processing handle.
#[derive(Clone, Debug, Default)]
pub struct PostProcessor {
    cfg: PostProcessConfig,
}

impl PostProcessor {
    /// Creates a post-processor after validating `cfg`.
    pub fn new(cfg: PostProcessConfig) -> ShelfResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &PostProcessConfig {
        &self.cfg
    }

    /// Runs decoding, reconstruction, segmentation and the ratio.
    pub fn process(&self, outputs: &ModelOutputs) -> ShelfResult<ShelfReport> {
        let _span = trace_span!(
            "post_process",
            width = outputs.shape().0,
            height = outputs.shape().1
        )
        .entered();

        let centers = decode_centers(outputs.centers(), self.cfg.stride, &self.cfg.centers)?;
        let instances = reconstruct_instances(
            outputs.semantic(),
            &centers,
            outputs.offsets(),
            self.cfg.stride,
            &self.cfg.instances,
        )?;
        let regions = segment_regions(outputs.semantic(), &self.cfg.regions)?;
        let empty_ratio = regions.empty_ratio();

        trace_event!(
            "post_process_done",
            centers = centers.len(),
            empty_ratio = empty_ratio
        );
        Ok(ShelfReport {
            centers,
            instances,
            regions,
            empty_ratio,
        })
    }
}
