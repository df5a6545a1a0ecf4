//! Center decoding from the center heatmap.
//!
//! Logits are mapped through a sigmoid, suppressed with a K×K max filter,
//! thresholded, capped to the best `top_k` and lifted to pixel space.

use crate::candidate::nms::local_peaks;
use crate::candidate::topk::select_top_k;
use crate::grid::maps::Heatmap;
use crate::trace::{trace_event, trace_span};
use crate::util::{ShelfError, ShelfResult};

/// Decoded object center in pixel space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Center {
    /// Pixel-space column of the cell center.
    pub x: f32,
    /// Pixel-space row of the cell center.
    pub y: f32,
    /// Center probability, in `(0, 1]`.
    pub score: f32,
}

/// Parameters for [`decode_centers`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenterConfig {
    /// Minimum center probability (exclusive), in `(0, 1)`.
    pub prob_thresh: f32,
    /// Odd side length of the suppression window.
    pub nms_kernel: usize,
    /// Maximum number of centers returned.
    pub top_k: usize,
    /// Row-parallel max filter (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for CenterConfig {
    fn default() -> Self {
        Self {
            prob_thresh: 0.3,
            nms_kernel: 3,
            top_k: 200,
            parallel: false,
        }
    }
}

impl CenterConfig {
    /// Checks parameter ranges.
    pub fn validate(&self) -> ShelfResult<()> {
        if !(self.prob_thresh > 0.0 && self.prob_thresh < 1.0) {
            return Err(ShelfError::InvalidParameter {
                name: "prob_thresh",
                reason: "must be in (0, 1)",
            });
        }
        if self.nms_kernel == 0 || self.nms_kernel % 2 == 0 {
            return Err(ShelfError::InvalidParameter {
                name: "nms_kernel",
                reason: "must be a positive odd integer",
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_stride(stride: usize) -> ShelfResult<()> {
    if stride == 0 {
        return Err(ShelfError::InvalidParameter {
            name: "stride",
            reason: "must be > 0",
        });
    }
    Ok(())
}

/// Decodes object centers from a center heatmap.
///
/// Every cell that equals its neighborhood maximum and exceeds
/// `cfg.prob_thresh` becomes a center; exact ties each produce one. When more
/// than `cfg.top_k` survive, the highest scores are kept (ties in raster
/// order). Centers are returned by descending score and placed at
/// `((x + 0.5) * stride, (y + 0.5) * stride)`.
pub fn decode_centers(
    heatmap: &Heatmap,
    stride: usize,
    cfg: &CenterConfig,
) -> ShelfResult<Vec<Center>> {
    validate_stride(stride)?;
    cfg.validate()?;

    let _span = trace_span!(
        "decode_centers",
        width = heatmap.shape().0,
        height = heatmap.shape().1,
        stride = stride
    )
    .entered();

    let probs = heatmap.probabilities();
    let peaks = local_peaks(&probs, cfg.nms_kernel, cfg.prob_thresh, cfg.parallel);
    let found = peaks.len();
    let kept = select_top_k(peaks, cfg.top_k);

    let scale = stride as f32;
    let centers: Vec<Center> = kept
        .into_iter()
        .map(|peak| Center {
            x: (peak.x as f32 + 0.5) * scale,
            y: (peak.y as f32 + 0.5) * scale,
            score: peak.score,
        })
        .collect();

    trace_event!("centers_decoded", peaks = found, kept = centers.len());
    Ok(centers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CenterConfig::default().validate().is_ok());
    }

    #[test]
    fn even_kernel_is_rejected() {
        let cfg = CenterConfig {
            nms_kernel: 4,
            ..CenterConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ShelfError::InvalidParameter {
                name: "nms_kernel",
                ..
            })
        ));
    }

    #[test]
    fn zero_stride_is_rejected() {
        let heatmap = Heatmap::new(vec![0.0; 4], 2, 2).unwrap();
        let err = decode_centers(&heatmap, 0, &CenterConfig::default()).unwrap_err();
        assert!(matches!(err, ShelfError::InvalidParameter { name: "stride", .. }));
    }

    #[test]
    fn threshold_bounds_are_exclusive() {
        for prob_thresh in [0.0, 1.0, f32::NAN] {
            let cfg = CenterConfig {
                prob_thresh,
                ..CenterConfig::default()
            };
            assert!(cfg.validate().is_err());
        }
    }
}
