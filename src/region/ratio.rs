//! Empty-shelf ratio.

use crate::grid::Mask;
use crate::util::ShelfResult;

/// `count(empty) / count(empty | product)`, or 0.0 when both masks are clear.
pub fn empty_ratio(empty: &Mask, product: &Mask) -> ShelfResult<f32> {
    empty.ensure_same_shape(product, "product mask")?;
    let mut empty_count = 0usize;
    let mut shelf_count = 0usize;
    for (&e, &p) in empty.as_slice().iter().zip(product.as_slice()) {
        empty_count += usize::from(e);
        shelf_count += usize::from(e || p);
    }
    Ok(if shelf_count == 0 {
        0.0
    } else {
        empty_count as f32 / shelf_count as f32
    })
}

/// Ratio for disjoint masks, from their counts.
pub(crate) fn ratio_of_counts(empty: usize, product: usize) -> f32 {
    let shelf = empty + product;
    if shelf == 0 {
        0.0
    } else {
        empty as f32 / shelf as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::util::ShelfError;

    #[test]
    fn clear_masks_give_zero() {
        let clear = Grid::filled(3, 2, false).unwrap();
        assert_eq!(empty_ratio(&clear, &clear).unwrap(), 0.0);
    }

    #[test]
    fn all_empty_gives_one() {
        let empty = Grid::filled(3, 2, true).unwrap();
        let product = Grid::filled(3, 2, false).unwrap();
        assert_eq!(empty_ratio(&empty, &product).unwrap(), 1.0);
    }

    #[test]
    fn overlapping_cells_count_once() {
        let empty = Grid::new(vec![true, true, false, false], 2, 2).unwrap();
        let product = Grid::new(vec![true, false, true, false], 2, 2).unwrap();
        let ratio = empty_ratio(&empty, &product).unwrap();
        assert!((ratio - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_shapes_error() {
        let a = Grid::filled(2, 2, false).unwrap();
        let b = Grid::filled(4, 1, false).unwrap();
        assert!(matches!(
            empty_ratio(&a, &b),
            Err(ShelfError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn count_ratio_matches_mask_ratio() {
        assert_eq!(ratio_of_counts(0, 0), 0.0);
        assert!((ratio_of_counts(12, 4) - 0.75).abs() < 1e-6);
    }
}
