#![allow(clippy::undocumented_unsafe_blocks)]

use std::arch::x86_64::*;

/// Eight-lane weighted sum. The caller guarantees equal lengths that are a
/// multiple of 8.
#[target_feature(enable = "avx2")]
pub(super) unsafe fn weighted_sum(weights: &[f32], taps: &[f32]) -> f32 {
    let mut acc = _mm256_setzero_ps();
    for (w, t) in weights.chunks_exact(8).zip(taps.chunks_exact(8)) {
        let w = _mm256_loadu_ps(w.as_ptr());
        let t = _mm256_loadu_ps(t.as_ptr());
        acc = _mm256_add_ps(acc, _mm256_mul_ps(w, t));
    }

    // Horizontal sum of the eight lanes
    let lo = _mm256_castps256_ps128(acc);
    let hi = _mm256_extractf128_ps::<1>(acc);
    let quad = _mm_add_ps(lo, hi);
    let dup = _mm_movehdup_ps(quad);
    let pair = _mm_add_ps(quad, dup);
    let high = _mm_movehl_ps(dup, pair);
    _mm_cvtss_f32(_mm_add_ss(pair, high))
}
