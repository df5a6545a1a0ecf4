//! Validated model-output grids.
//!
//! The model head emits three feature-space tensors per image: semantic class
//! logits, a center heatmap and a two-channel offset field. These types check
//! value ranges once at construction so the stages can assume clean input.

use crate::grid::{cell_count, ensure_shape, Grid};
use crate::util::math::{sigmoid, softmax_into};
use crate::util::{ShelfError, ShelfResult};

/// Foreground probability per feature cell, every value in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityMap {
    grid: Grid<f32>,
}

impl ProbabilityMap {
    /// Wraps a row-major probability buffer.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> ShelfResult<Self> {
        Self::from_grid(Grid::new(data, width, height)?)
    }

    /// Validates an existing grid.
    pub fn from_grid(grid: Grid<f32>) -> ShelfResult<Self> {
        for (index, &value) in grid.as_slice().iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ShelfError::ValueOutOfRange {
                    context: "probability map",
                    index,
                    value,
                });
            }
        }
        Ok(Self { grid })
    }

    /// Softmax over the class axis of channel-first logits, keeping
    /// `foreground_class`.
    ///
    /// `logits` holds `num_classes` planes of `width * height` values.
    pub fn from_class_logits(
        logits: &[f32],
        num_classes: usize,
        foreground_class: usize,
        width: usize,
        height: usize,
    ) -> ShelfResult<Self> {
        if num_classes < 2 {
            return Err(ShelfError::InvalidParameter {
                name: "num_classes",
                reason: "must be at least 2",
            });
        }
        if foreground_class >= num_classes {
            return Err(ShelfError::InvalidParameter {
                name: "foreground_class",
                reason: "must be < num_classes",
            });
        }
        let plane = cell_count(width, height)?;
        let expected = plane
            .checked_mul(num_classes)
            .ok_or(ShelfError::InvalidDimensions { width, height })?;
        if logits.len() != expected {
            return Err(ShelfError::BufferLengthMismatch {
                expected,
                got: logits.len(),
            });
        }
        ensure_finite(logits, "semantic logits")?;

        let mut column = vec![0.0f32; num_classes];
        let mut probs = vec![0.0f32; num_classes];
        let mut data = Vec::with_capacity(plane);
        for idx in 0..plane {
            for (class, slot) in column.iter_mut().enumerate() {
                *slot = logits[class * plane + idx];
            }
            softmax_into(&column, &mut probs);
            data.push(probs[foreground_class].clamp(0.0, 1.0));
        }
        Self::from_grid(Grid::new(data, width, height)?)
    }

    /// Returns the underlying grid.
    pub fn grid(&self) -> &Grid<f32> {
        &self.grid
    }

    /// Returns `(width, height)`.
    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    /// Cell-wise `probability > threshold`.
    pub fn threshold(&self, threshold: f32) -> Grid<bool> {
        self.grid.map(|&p| p > threshold)
    }
}

/// Raw center logits per feature cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Heatmap {
    grid: Grid<f32>,
}

impl Heatmap {
    /// Wraps a row-major logit buffer.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> ShelfResult<Self> {
        Self::from_grid(Grid::new(data, width, height)?)
    }

    /// Validates an existing grid.
    pub fn from_grid(grid: Grid<f32>) -> ShelfResult<Self> {
        ensure_finite(grid.as_slice(), "center heatmap")?;
        Ok(Self { grid })
    }

    /// Returns the raw logits.
    pub fn grid(&self) -> &Grid<f32> {
        &self.grid
    }

    /// Returns `(width, height)`.
    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    /// Sigmoid of every logit.
    pub fn probabilities(&self) -> Grid<f32> {
        self.grid.map(|&v| sigmoid(v))
    }
}

/// Per-cell `(dy, dx)` vectors pointing toward the owning instance center,
/// in feature-space units.
#[derive(Clone, Debug, PartialEq)]
pub struct OffsetField {
    dy: Grid<f32>,
    dx: Grid<f32>,
}

impl OffsetField {
    /// Builds the field from its two planes.
    pub fn new(dy: Grid<f32>, dx: Grid<f32>) -> ShelfResult<Self> {
        ensure_shape(dy.shape(), dx.shape(), "offset dx plane")?;
        ensure_finite(dy.as_slice(), "offset dy plane")?;
        ensure_finite(dx.as_slice(), "offset dx plane")?;
        Ok(Self { dy, dx })
    }

    /// Builds the field from a channel-first buffer: the `dy` plane followed
    /// by the `dx` plane.
    pub fn from_planar(data: &[f32], width: usize, height: usize) -> ShelfResult<Self> {
        let plane = cell_count(width, height)?;
        let expected = plane
            .checked_mul(2)
            .ok_or(ShelfError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(ShelfError::BufferLengthMismatch {
                expected,
                got: data.len(),
            });
        }
        let (dy, dx) = data.split_at(plane);
        Self::new(
            Grid::new(dy.to_vec(), width, height)?,
            Grid::new(dx.to_vec(), width, height)?,
        )
    }

    /// An all-zero field.
    pub fn zeros(width: usize, height: usize) -> ShelfResult<Self> {
        Ok(Self {
            dy: Grid::filled(width, height, 0.0)?,
            dx: Grid::filled(width, height, 0.0)?,
        })
    }

    /// Returns `(width, height)`.
    pub fn shape(&self) -> (usize, usize) {
        self.dy.shape()
    }

    /// Returns the `(dy, dx)` vector at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<(f32, f32)> {
        Some((*self.dy.get(x, y)?, *self.dx.get(x, y)?))
    }

    /// Returns the `dy` plane.
    pub fn dy(&self) -> &Grid<f32> {
        &self.dy
    }

    /// Returns the `dx` plane.
    pub fn dx(&self) -> &Grid<f32> {
        &self.dx
    }
}

fn ensure_finite(values: &[f32], context: &'static str) -> ShelfResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ShelfError::ValueOutOfRange {
            context,
            index,
            value: values[index],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_map_rejects_out_of_range() {
        let err = ProbabilityMap::new(vec![0.2, 1.5, 0.0, 0.0], 2, 2).unwrap_err();
        assert_eq!(
            err,
            ShelfError::ValueOutOfRange {
                context: "probability map",
                index: 1,
                value: 1.5,
            }
        );
    }

    #[test]
    fn probability_map_rejects_nan() {
        assert!(ProbabilityMap::new(vec![f32::NAN], 1, 1).is_err());
    }

    #[test]
    fn class_logits_select_foreground_channel() {
        // Two classes over a 2x1 grid: background plane then foreground plane.
        let logits = [0.0, 2.0, 0.0, -2.0];
        let map = ProbabilityMap::from_class_logits(&logits, 2, 1, 2, 1).unwrap();
        let probs = map.grid().as_slice();
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!(probs[1] < 0.05);
    }

    #[test]
    fn class_logits_validate_class_index() {
        let err = ProbabilityMap::from_class_logits(&[0.0; 4], 2, 2, 2, 1).unwrap_err();
        assert!(matches!(
            err,
            ShelfError::InvalidParameter {
                name: "foreground_class",
                ..
            }
        ));
    }

    #[test]
    fn heatmap_rejects_infinite_logits() {
        let err = Heatmap::new(vec![0.0, f32::INFINITY], 2, 1).unwrap_err();
        assert!(matches!(err, ShelfError::ValueOutOfRange { index: 1, .. }));
    }

    #[test]
    fn offsets_split_planar_buffer() {
        let field = OffsetField::from_planar(&[1.0, 2.0, -1.0, -2.0], 2, 1).unwrap();
        assert_eq!(field.get(0, 0), Some((1.0, -1.0)));
        assert_eq!(field.get(1, 0), Some((2.0, -2.0)));
        assert_eq!(field.get(2, 0), None);
    }

    #[test]
    fn offsets_reject_mismatched_planes() {
        let dy = Grid::filled(2, 2, 0.0).unwrap();
        let dx = Grid::filled(2, 1, 0.0).unwrap();
        assert!(matches!(
            OffsetField::new(dy, dx),
            Err(ShelfError::ShapeMismatch { .. })
        ));
    }
}
