#[must_use]
pub(super) fn weighted_sum(weights: &[f32], taps: &[f32]) -> f32 {
    weights.iter().zip(taps).fold(0.0, |acc, (&w, &t)| acc + w * t)
}
