//! Shelf region segmentation.
//!
//! Product cells are the thresholded semantic map. The shelf is the product
//! bounding box grown by a margin; shelf cells that are not product are
//! empty, everything outside the shelf is background.

use crate::grid::maps::ProbabilityMap;
use crate::grid::{Grid, Mask};
use crate::instance::validate_sem_thresh;
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::ShelfResult;

mod ratio;

pub use ratio::empty_ratio;

/// Parameters for [`segment_regions`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionConfig {
    /// Cells with probability above this value are product.
    pub sem_thresh: f32,
    /// Cells added on each side of the product bounding box.
    pub margin: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            sem_thresh: 0.5,
            margin: 2,
        }
    }
}

impl RegionConfig {
    /// Checks parameter ranges.
    pub fn validate(&self) -> ShelfResult<()> {
        validate_sem_thresh(self.sem_thresh)
    }
}

/// Inclusive feature-space rectangle around the shelf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShelfBox {
    pub y_min: usize,
    pub y_max: usize,
    pub x_min: usize,
    pub x_max: usize,
}

impl ShelfBox {
    /// True if `(x, y)` lies inside the box.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        (self.y_min..=self.y_max).contains(&y) && (self.x_min..=self.x_max).contains(&x)
    }

    /// Number of cells covered.
    pub fn area(&self) -> usize {
        (self.y_max - self.y_min + 1) * (self.x_max - self.x_min + 1)
    }

    /// `[y_min, y_max, x_min, x_max]`.
    pub fn to_array(&self) -> [usize; 4] {
        [self.y_min, self.y_max, self.x_min, self.x_max]
    }

    /// Grows the box by `margin` on every side, clamped to a `width × height` grid.
    fn expand(self, margin: usize, width: usize, height: usize) -> Self {
        Self {
            y_min: self.y_min.saturating_sub(margin),
            y_max: self.y_max.saturating_add(margin).min(height - 1),
            x_min: self.x_min.saturating_sub(margin),
            x_max: self.x_max.saturating_add(margin).min(width - 1),
        }
    }
}

/// Product / empty / background partition of the feature grid.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionMasks {
    pub product: Mask,
    pub empty: Mask,
    pub background: Mask,
    /// Margin-expanded shelf box; `None` when no product cell exists.
    pub shelf_box: Option<ShelfBox>,
}

impl RegionMasks {
    /// Number of product cells.
    pub fn product_pixels(&self) -> usize {
        self.product.count_true()
    }

    /// Number of empty-shelf cells.
    pub fn empty_pixels(&self) -> usize {
        self.empty.count_true()
    }

    /// Number of background cells.
    pub fn background_pixels(&self) -> usize {
        self.background.count_true()
    }

    /// Fraction of shelf cells that are empty.
    pub fn empty_ratio(&self) -> f32 {
        ratio::ratio_of_counts(self.empty_pixels(), self.product_pixels())
    }
}

/// Tight bounding box of the true cells, or `None` if there are none.
pub fn bounding_box(mask: &Mask) -> Option<ShelfBox> {
    let mut bbox: Option<ShelfBox> = None;
    for (y, row) in mask.rows().enumerate() {
        let Some(first) = row.iter().position(|&v| v) else {
            continue;
        };
        let last = row.iter().rposition(|&v| v).unwrap_or(first);
        bbox = Some(match bbox {
            None => ShelfBox {
                y_min: y,
                y_max: y,
                x_min: first,
                x_max: last,
            },
            Some(b) => ShelfBox {
                y_min: b.y_min,
                y_max: y,
                x_min: b.x_min.min(first),
                x_max: b.x_max.max(last),
            },
        });
    }
    bbox
}

/// Splits the grid into product, empty and background cells.
///
/// An all-background result with no shelf box is returned when no cell
/// exceeds `cfg.sem_thresh`.
pub fn segment_regions(sem_prob: &ProbabilityMap, cfg: &RegionConfig) -> ShelfResult<RegionMasks> {
    cfg.validate()?;
    let (width, height) = sem_prob.shape();
    let _span = trace_span!("segment_regions", width = width, height = height).entered();

    let product = sem_prob.threshold(cfg.sem_thresh);
    let Some(tight) = bounding_box(&product) else {
        trace_debug!("no product cells, grid is all background");
        return Ok(RegionMasks {
            empty: Grid::filled(width, height, false)?,
            background: Grid::filled(width, height, true)?,
            product,
            shelf_box: None,
        });
    };

    let shelf_box = tight.expand(cfg.margin, width, height);
    let empty = Grid::from_fn(width, height, |x, y| {
        shelf_box.contains(x, y) && !product.as_slice()[y * width + x]
    })?;
    let background = Grid::from_fn(width, height, |x, y| !shelf_box.contains(x, y))?;

    trace_event!(
        "regions_segmented",
        product = product.count_true(),
        empty = empty.count_true()
    );
    Ok(RegionMasks {
        product,
        empty,
        background,
        shelf_box: Some(shelf_box),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_spans_all_rows() {
        let mask = Grid::new(
            vec![
                false, false, true, false, //
                false, false, false, false, //
                true, false, false, false,
            ],
            4,
            3,
        )
        .unwrap();
        assert_eq!(
            bounding_box(&mask),
            Some(ShelfBox {
                y_min: 0,
                y_max: 2,
                x_min: 0,
                x_max: 2,
            })
        );
    }

    #[test]
    fn expand_clamps_to_grid() {
        let b = ShelfBox {
            y_min: 1,
            y_max: 2,
            x_min: 0,
            x_max: 4,
        };
        let grown = b.expand(3, 5, 4);
        assert_eq!(grown.to_array(), [0, 3, 0, 4]);
        assert_eq!(grown.area(), 20);
    }

    #[test]
    fn empty_mask_has_no_box() {
        let mask = Grid::filled(3, 3, false).unwrap();
        assert!(bounding_box(&mask).is_none());
    }
}
