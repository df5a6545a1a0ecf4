//! Scalar helpers shared by the decoding stages.

/// Logistic sigmoid.
#[inline]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Euclidean distance between two points given as `(y, x)`.
#[inline]
pub(crate) fn euclidean(ay: f32, ax: f32, by: f32, bx: f32) -> f32 {
    let dy = ay - by;
    let dx = ax - bx;
    (dy * dy + dx * dx).sqrt()
}

/// Numerically stable softmax over `logits`, written into `out`.
pub(crate) fn softmax_into(logits: &[f32], out: &mut [f32]) {
    debug_assert_eq!(logits.len(), out.len());
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for (o, &l) in out.iter_mut().zip(logits) {
        *o = (l - max).exp();
        sum += *o;
    }
    for o in out.iter_mut() {
        *o /= sum;
    }
}
