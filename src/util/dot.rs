#[cfg(target_arch = "x86_64")]
mod avx2;
mod rust;


use cfg_if::cfg_if;

/// Computes `Σ weights[i] * taps[i]` over a cubic neighbourhood.
///
/// The neighbourhoods used by the downsampling kernels have 16 (2D) or
/// 64 (3D) taps, so both slices always have a length that is a multiple of
/// eight. That lets the AVX2 path consume eight taps per iteration with no
/// scalar tail.
///
/// # Panics
/// Panics if the slices differ in length or the length is not a multiple of 8.
#[must_use]
pub fn weighted_sum(weights: &[f32], taps: &[f32]) -> f32 {
    assert_eq!(weights.len(), taps.len());
    assert!(weights.len() % 8 == 0);

    cfg_if! {
        if #[cfg(all(target_arch = "x86_64", not(feature = "no_simd")))] {
            if crate::util::has_avx2() {
                // SAFETY: We check for AVX2 first
                return unsafe { avx2::weighted_sum(weights, taps) };
            }
        }
    }

    rust::weighted_sum(weights, taps)
}
