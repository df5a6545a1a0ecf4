//! Dense feature-space grids.
//!
//! `Grid<T>` is an owned, contiguous, row-major buffer. Every model output
//! and every stage result is a grid of the same feature-space shape; the
//! typed wrappers in [`maps`] add value-range validation on top.

use crate::util::{ShelfError, ShelfResult};

pub mod maps;

/// Owned row-major 2D buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    data: Vec<T>,
    width: usize,
    height: usize,
}

/// Boolean region mask.
pub type Mask = Grid<bool>;

/// Per-cell instance labels; 0 is unassigned.
pub type InstanceMap = Grid<u32>;

impl<T> Grid<T> {
    /// Wraps a row-major buffer of exactly `width * height` elements.
    pub fn new(data: Vec<T>, width: usize, height: usize) -> ShelfResult<Self> {
        let expected = cell_count(width, height)?;
        if data.len() != expected {
            return Err(ShelfError::BufferLengthMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Builds a grid by evaluating `f(x, y)` in raster order.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> ShelfResult<Self>
    where
        F: FnMut(usize, usize) -> T,
    {
        let len = cell_count(width, height)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Wraps a buffer whose shape was taken from an existing grid.
    pub(crate) fn from_raw(data: Vec<T>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Returns the grid width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the grid height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; zero-sized grids cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the backing row-major slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consumes the grid and returns its buffer.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.width + x)
    }

    /// Returns row `y`.
    pub fn row(&self, y: usize) -> Option<&[T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.width;
        self.data.get(start..start + self.width)
    }

    /// Iterates over rows top to bottom.
    pub fn rows(&self) -> std::slice::ChunksExact<'_, T> {
        self.data.chunks_exact(self.width)
    }

    /// Applies `f` cell-wise, producing a grid of the same shape.
    pub fn map<U, F>(&self, f: F) -> Grid<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid {
            data: self.data.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Counts the cells satisfying `pred`.
    pub fn count_where<F>(&self, mut pred: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        self.data.iter().filter(|v| pred(v)).count()
    }

    /// Errors with [`ShelfError::ShapeMismatch`] unless `other` has this shape.
    pub fn ensure_same_shape<U>(&self, other: &Grid<U>, context: &'static str) -> ShelfResult<()> {
        ensure_shape(self.shape(), other.shape(), context)
    }
}

impl<T: Clone> Grid<T> {
    /// Creates a grid with every cell set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> ShelfResult<Self> {
        let len = cell_count(width, height)?;
        Ok(Self {
            data: vec![value; len],
            width,
            height,
        })
    }
}

impl Grid<bool> {
    /// Number of true cells.
    pub fn count_true(&self) -> usize {
        self.count_where(|&v| v)
    }

    /// True if at least one cell is set.
    pub fn any(&self) -> bool {
        self.data.iter().any(|&v| v)
    }
}

pub(crate) fn ensure_shape(
    expected: (usize, usize),
    got: (usize, usize),
    context: &'static str,
) -> ShelfResult<()> {
    if expected != got {
        return Err(ShelfError::ShapeMismatch {
            context,
            expected_width: expected.0,
            expected_height: expected.1,
            got_width: got.0,
            got_height: got.1,
        });
    }
    Ok(())
}

pub(crate) fn cell_count(width: usize, height: usize) -> ShelfResult<usize> {
    if width == 0 || height == 0 {
        return Err(ShelfError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(ShelfError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        let err = Grid::new(vec![0u8; 5], 2, 2).unwrap_err();
        assert_eq!(
            err,
            ShelfError::BufferLengthMismatch {
                expected: 4,
                got: 5
            }
        );
    }

    #[test]
    fn from_fn_fills_in_raster_order() {
        let grid = Grid::from_fn(3, 2, |x, y| y * 10 + x).unwrap();
        assert_eq!(grid.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(grid.row(1).unwrap(), &[10, 11, 12]);
        assert_eq!(grid.get(2, 1), Some(&12));
        assert!(grid.get(3, 0).is_none());
        assert!(grid.row(2).is_none());
    }

    #[test]
    fn ensure_same_shape_reports_both_shapes() {
        let a = Grid::filled(3, 2, 0.0f32).unwrap();
        let b = Grid::filled(2, 3, false).unwrap();
        let err = a.ensure_same_shape(&b, "mask").unwrap_err();
        assert_eq!(
            err,
            ShelfError::ShapeMismatch {
                context: "mask",
                expected_width: 3,
                expected_height: 2,
                got_width: 2,
                got_height: 3,
            }
        );
    }
}
