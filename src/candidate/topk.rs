//! Top-K selection for heatmap peaks.

use std::cmp::Ordering;

/// Local maximum in feature-space cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// Column of the cell.
    pub x: usize,
    /// Row of the cell.
    pub y: usize,
    /// Center probability at the cell.
    pub score: f32,
}

/// Descending score, ties in raster order.
fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Sorts peaks by descending score with deterministic tie-breaking.
pub(crate) fn sort_peaks_desc(peaks: &mut [Peak]) {
    peaks.sort_by(peak_cmp_desc);
}

/// Bounded collector keeping the `k` best peaks.
pub struct TopK {
    k: usize,
    items: Vec<Peak>,
}

impl TopK {
    /// Creates a collector for at most `k` peaks.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k.min(1024)),
        }
    }

    /// Pushes a peak, evicting the weakest one when full.
    pub fn push(&mut self, peak: Peak) {
        if self.k == 0 {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(peak);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if peak_cmp_desc(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }

        if peak_cmp_desc(&peak, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = peak;
        }
    }

    /// Returns the kept peaks sorted by descending score.
    pub fn into_sorted_desc(mut self) -> Vec<Peak> {
        sort_peaks_desc(&mut self.items);
        self.items
    }
}

/// Keeps the `k` best peaks, returned sorted by descending score.
pub(crate) fn select_top_k(peaks: Vec<Peak>, k: usize) -> Vec<Peak> {
    if peaks.len() <= k {
        let mut peaks = peaks;
        sort_peaks_desc(&mut peaks);
        return peaks;
    }
    let mut topk = TopK::new(k);
    for peak in peaks {
        topk.push(peak);
    }
    topk.into_sorted_desc()
}
