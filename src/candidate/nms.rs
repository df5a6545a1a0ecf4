//! Max-filter non-maximum suppression over a probability grid.
//!
//! The K×K neighborhood maximum is computed separably (horizontal pass, then
//! vertical pass). Windows are truncated at the grid border, so cells outside
//! the grid never take part in the comparison.

use crate::candidate::topk::Peak;
use crate::grid::Grid;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Returns the maximum over the `kernel × kernel` window centered on each cell.
///
/// `kernel` must be odd and non-zero.
pub fn neighborhood_max(probs: &Grid<f32>, kernel: usize, parallel: bool) -> Grid<f32> {
    debug_assert!(kernel % 2 == 1);
    let radius = kernel / 2;
    let (width, height) = probs.shape();
    let src = probs.as_slice();

    let mut horizontal = vec![0.0f32; src.len()];
    let mut out = vec![0.0f32; src.len()];

    #[cfg(feature = "rayon")]
    {
        if parallel {
            horizontal
                .par_chunks_mut(width)
                .zip(src.par_chunks(width))
                .for_each(|(dst, row)| row_max(row, dst, radius));
            out.par_chunks_mut(width)
                .enumerate()
                .for_each(|(y, dst)| column_max(&horizontal, width, height, y, radius, dst));
            return Grid::from_raw(out, width, height);
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;

    for (dst, row) in horizontal.chunks_mut(width).zip(src.chunks(width)) {
        row_max(row, dst, radius);
    }
    for (y, dst) in out.chunks_mut(width).enumerate() {
        column_max(&horizontal, width, height, y, radius, dst);
    }
    Grid::from_raw(out, width, height)
}

/// Collects cells equal to their neighborhood maximum and strictly above
/// `threshold`, in raster order. Plateaus yield one peak per tied cell.
pub fn local_peaks(probs: &Grid<f32>, kernel: usize, threshold: f32, parallel: bool) -> Vec<Peak> {
    let pooled = neighborhood_max(probs, kernel, parallel);
    let width = probs.width();
    probs
        .as_slice()
        .iter()
        .zip(pooled.as_slice())
        .enumerate()
        .filter(|(_, (&p, &m))| p == m && p > threshold)
        .map(|(idx, (&score, _))| Peak {
            x: idx % width,
            y: idx / width,
            score,
        })
        .collect()
}

fn row_max(row: &[f32], dst: &mut [f32], radius: usize) {
    let width = row.len();
    for (x, slot) in dst.iter_mut().enumerate() {
        let lo = x.saturating_sub(radius);
        let hi = (x + radius).min(width - 1);
        *slot = row[lo..=hi].iter().copied().fold(f32::NEG_INFINITY, f32::max);
    }
}

fn column_max(
    horizontal: &[f32],
    width: usize,
    height: usize,
    y: usize,
    radius: usize,
    dst: &mut [f32],
) {
    let lo = y.saturating_sub(radius);
    let hi = (y + radius).min(height - 1);
    dst.fill(f32::NEG_INFINITY);
    for yy in lo..=hi {
        let row = &horizontal[yy * width..(yy + 1) * width];
        for (slot, &v) in dst.iter_mut().zip(row) {
            *slot = slot.max(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: usize, height: usize, data: &[f32]) -> Grid<f32> {
        Grid::new(data.to_vec(), width, height).unwrap()
    }

    #[test]
    fn border_windows_are_truncated() {
        let probs = grid(3, 1, &[0.1, 0.2, 0.3]);
        let pooled = neighborhood_max(&probs, 3, false);
        assert_eq!(pooled.as_slice(), &[0.2, 0.3, 0.3]);
    }

    #[test]
    fn kernel_one_is_identity() {
        let probs = grid(2, 2, &[0.4, 0.1, 0.7, 0.2]);
        let pooled = neighborhood_max(&probs, 1, false);
        assert_eq!(pooled, probs);
    }

    #[test]
    fn plateau_keeps_every_tied_cell() {
        let probs = grid(4, 1, &[0.1, 0.8, 0.8, 0.1]);
        let peaks = local_peaks(&probs, 3, 0.3, false);
        assert_eq!(peaks.len(), 2);
        assert_eq!((peaks[0].x, peaks[1].x), (1, 2));
    }

    #[test]
    fn threshold_is_strict() {
        let probs = grid(1, 1, &[0.3]);
        assert!(local_peaks(&probs, 3, 0.3, false).is_empty());
    }
}
