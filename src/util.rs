pub mod dot;

#[cfg(test)]
mod tests;

use core::slice;
use std::{
    fmt::Debug,
    ops::Neg,
    sync::atomic::{AtomicU32, Ordering},
};

use ndarray::LinalgScalar;

use crate::operator::DType;

#[cfg(target_arch = "x86_64")]
cpufeatures::new!(cpuid_avx2, "avx2");

#[cfg(target_arch = "x86_64")]
pub use cpuid_avx2::get as has_avx2;

/// Scalar types the linear operators can be instantiated with.
pub trait Sample: LinalgScalar + Neg<Output = Self> + Send + Sync + Debug + Into<f64> {
    const DTYPE: DType;
}

impl Sample for f32 {
    const DTYPE: DType = DType::F32;
}

impl Sample for f64 {
    const DTYPE: DType = DType::F64;
}

const _: () = assert!(size_of::<AtomicU32>() == size_of::<f32>());
const _: () = assert!(align_of::<AtomicU32>() == align_of::<f32>());

/// Reinterprets an exclusively borrowed `f32` buffer as atomic cells so that
/// parallel workers can accumulate into it through a shared reference.
#[must_use]
pub fn as_atomic_cells(data: &mut [f32]) -> &[AtomicU32] {
    // SAFETY: `AtomicU32` has the size and alignment of `f32` (checked above),
    // every bit pattern is valid for both, and the exclusive borrow rules out
    // non-atomic access while the returned slice is alive.
    unsafe { slice::from_raw_parts(data.as_mut_ptr().cast::<AtomicU32>(), data.len()) }
}

/// Adds `value` to the `f32` stored in `cell` without losing concurrent updates.
#[inline]
pub fn atomic_add_f32(cell: &AtomicU32, value: f32) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = (f32::from_bits(current) + value).to_bits();
        match cell.compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

/// Product of all extents, i.e. the number of samples of a dense grid.
#[must_use]
pub fn grid_len(shape: &[usize]) -> usize {
    shape.iter().product()
}
