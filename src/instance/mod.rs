//! Offset-guided instance reconstruction.
//!
//! Each cell is moved by its offset vector and assigned to the nearest
//! decoded center. Assignments farther than `max_radius` or on cells at or
//! below the semantic threshold are dropped, then instances smaller than
//! `min_pixels` are removed in a separate tally pass.

use crate::decode::{validate_stride, Center};
use crate::grid::maps::{OffsetField, ProbabilityMap};
use crate::grid::{ensure_shape, Grid, InstanceMap};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::math::euclidean;
use crate::util::{ShelfError, ShelfResult};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Parameters for [`reconstruct_instances`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceConfig {
    /// Cells with probability at or below this value stay unassigned.
    pub sem_thresh: f32,
    /// Maximum distance, in feature cells, between a shifted cell and its center.
    pub max_radius: f32,
    /// Instances with fewer surviving cells are removed.
    pub min_pixels: usize,
    /// Row-parallel assignment (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            sem_thresh: 0.5,
            max_radius: 16.0,
            min_pixels: 12,
            parallel: false,
        }
    }
}

impl InstanceConfig {
    /// Checks parameter ranges.
    pub fn validate(&self) -> ShelfResult<()> {
        validate_sem_thresh(self.sem_thresh)?;
        if !(self.max_radius.is_finite() && self.max_radius > 0.0) {
            return Err(ShelfError::InvalidParameter {
                name: "max_radius",
                reason: "must be finite and > 0",
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_sem_thresh(sem_thresh: f32) -> ShelfResult<()> {
    if !(0.0..=1.0).contains(&sem_thresh) {
        return Err(ShelfError::InvalidParameter {
            name: "sem_thresh",
            reason: "must be in [0, 1]",
        });
    }
    Ok(())
}

/// Center position in feature space as `(y, x)`.
#[derive(Clone, Copy)]
struct FeatureCenter {
    y: f32,
    x: f32,
}

/// Builds the instance-label map.
///
/// Label `i + 1` marks cells owned by `centers[i]`; 0 marks unassigned cells.
/// `stride` must be the value the centers were decoded with.
pub fn reconstruct_instances(
    sem_prob: &ProbabilityMap,
    centers: &[Center],
    offsets: &OffsetField,
    stride: usize,
    cfg: &InstanceConfig,
) -> ShelfResult<InstanceMap> {
    validate_stride(stride)?;
    cfg.validate()?;
    ensure_shape(sem_prob.shape(), offsets.shape(), "offset field")?;
    if centers.len() >= u32::MAX as usize {
        return Err(ShelfError::InvalidParameter {
            name: "centers",
            reason: "too many centers for u32 labels",
        });
    }

    let (width, height) = sem_prob.shape();
    let _span = trace_span!(
        "reconstruct_instances",
        width = width,
        height = height,
        centers = centers.len()
    )
    .entered();

    if centers.is_empty() {
        trace_debug!("no centers, returning empty instance map");
        return Grid::filled(width, height, 0u32);
    }

    let scale = stride as f32;
    let mut feature_centers = Vec::with_capacity(centers.len());
    for (index, center) in centers.iter().enumerate() {
        if !(center.x.is_finite() && center.y.is_finite()) {
            return Err(ShelfError::ValueOutOfRange {
                context: "center coordinates",
                index,
                value: if center.x.is_finite() { center.y } else { center.x },
            });
        }
        feature_centers.push(FeatureCenter {
            y: center.y / scale,
            x: center.x / scale,
        });
    }

    let gated = assign_gated(sem_prob, offsets, &feature_centers, cfg);
    let labels = suppress_small(gated, centers.len(), cfg.min_pixels);
    let map = Grid::from_raw(labels, width, height);

    trace_event!("instances_reconstructed", instances = count_instances(&map));
    Ok(map)
}

/// Nearest-center assignment with the radius and semantic gates applied.
fn assign_gated(
    sem_prob: &ProbabilityMap,
    offsets: &OffsetField,
    centers: &[FeatureCenter],
    cfg: &InstanceConfig,
) -> Vec<u32> {
    let width = sem_prob.grid().width();
    let mut labels = vec![0u32; sem_prob.grid().len()];

    let fill_row = |y: usize, out: &mut [u32]| {
        let start = y * width;
        let probs = &sem_prob.grid().as_slice()[start..start + width];
        let dy = &offsets.dy().as_slice()[start..start + width];
        let dx = &offsets.dx().as_slice()[start..start + width];
        for x in 0..width {
            if probs[x] <= cfg.sem_thresh {
                continue;
            }
            let sy = y as f32 + dy[x];
            let sx = x as f32 + dx[x];
            let (best_idx, best_dist) = nearest_center(sy, sx, centers);
            if best_dist <= cfg.max_radius {
                out[x] = best_idx as u32 + 1;
            }
        }
    };

    #[cfg(feature = "rayon")]
    {
        if cfg.parallel {
            labels
                .par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, out)| fill_row(y, out));
            return labels;
        }
    }

    for (y, out) in labels.chunks_mut(width).enumerate() {
        fill_row(y, out);
    }
    labels
}

/// Index of the closest center and its distance; ties keep the lower index.
fn nearest_center(sy: f32, sx: f32, centers: &[FeatureCenter]) -> (usize, f32) {
    let mut best_idx = 0usize;
    let mut best_dist = f32::INFINITY;
    for (idx, c) in centers.iter().enumerate() {
        let dist = euclidean(sy, sx, c.y, c.x);
        if dist < best_dist {
            best_dist = dist;
            best_idx = idx;
        }
    }
    (best_idx, best_dist)
}

/// Zeroes every label whose cell count is below `min_pixels`.
fn suppress_small(mut labels: Vec<u32>, num_centers: usize, min_pixels: usize) -> Vec<u32> {
    let mut counts = vec![0usize; num_centers + 1];
    for &label in &labels {
        counts[label as usize] += 1;
    }
    for label in labels.iter_mut() {
        if *label != 0 && counts[*label as usize] < min_pixels {
            *label = 0;
        }
    }
    labels
}

/// Number of distinct non-zero labels.
pub fn count_instances(map: &InstanceMap) -> usize {
    let mut labels: Vec<u32> = map.as_slice().iter().copied().filter(|&l| l != 0).collect();
    labels.sort_unstable();
    labels.dedup();
    labels.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_must_be_positive() {
        let cfg = InstanceConfig {
            max_radius: 0.0,
            ..InstanceConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ShelfError::InvalidParameter {
                name: "max_radius",
                ..
            })
        ));
    }

    #[test]
    fn nearest_center_prefers_lower_index_on_ties() {
        let centers = [
            FeatureCenter { y: 0.0, x: 1.0 },
            FeatureCenter { y: 0.0, x: -1.0 },
        ];
        let (idx, dist) = nearest_center(0.0, 0.0, &centers);
        assert_eq!(idx, 0);
        assert!((dist - 1.0).abs() < 1e-6);
    }

    #[test]
    fn suppression_counts_surviving_cells_only() {
        let labels = vec![1, 1, 2, 0, 2, 2];
        assert_eq!(suppress_small(labels, 2, 3), vec![0, 0, 2, 0, 2, 2]);
    }

    #[test]
    fn count_instances_ignores_background() {
        let map = Grid::new(vec![0, 3, 3, 1, 0, 0], 3, 2).unwrap();
        assert_eq!(count_instances(&map), 2);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let probs = ProbabilityMap::new(vec![1.0; 4], 2, 2).unwrap();
        let offsets = OffsetField::zeros(2, 1).unwrap();
        let centers = [Center {
            x: 2.0,
            y: 2.0,
            score: 0.9,
        }];
        let err = reconstruct_instances(&probs, &centers, &offsets, 4, &InstanceConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ShelfError::ShapeMismatch {
                context: "offset field",
                ..
            }
        ));
    }
}
