#![allow(dead_code)]

use anyhow::{Result, bail};
use cubic_downsample::{CoefficientTables, adjoint_downsample, downsample};
use ndarray::{ArrayD, IxDyn};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

/// Uniform samples in `[-1, 1)` from a fixed seed.
pub fn random_grid(shape: &[usize], seed: u64) -> ArrayD<f32> {
    let mut rng = Xoshiro128StarStar::seed_from_u64(seed);
    ArrayD::from_shape_simple_fn(IxDyn(shape), || rng.random_range(-1.0..1.0))
}

pub fn inner(a: &ArrayD<f32>, b: &ArrayD<f32>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&a, &b)| f64::from(a) * f64::from(b))
        .sum()
}

#[derive(Debug, Clone, Copy)]
pub struct AdjointCheck {
    pub lhs: f64,
    pub rhs: f64,
}

impl AdjointCheck {
    /// Mismatch relative to the larger inner product, or absolute when both
    /// are below 1.
    pub fn relative_error(&self) -> f64 {
        (self.lhs - self.rhs).abs() / self.lhs.abs().max(self.rhs.abs()).max(1.0)
    }
}

/// Runs the forward and adjoint passes on random grids and compares
/// `<A x, y>` with `<x, Aᵀ y>`.
pub fn adjoint_check(
    tables: &CoefficientTables,
    fine: &[usize],
    coarse: &[usize],
    seed: u64,
) -> Result<AdjointCheck> {
    let x = random_grid(fine, seed);
    let y = random_grid(coarse, seed.wrapping_add(1));

    let mut ax = ArrayD::<f32>::zeros(IxDyn(coarse));
    downsample(tables, &x, &mut ax)?;
    let mut aty = ArrayD::<f32>::zeros(IxDyn(fine));
    adjoint_downsample(tables, &mut aty, &y)?;

    Ok(AdjointCheck {
        lhs: inner(&ax, &y),
        rhs: inner(&x, &aty),
    })
}

/// Fails with both inner products in the message when the relative error
/// exceeds `tolerance`.
pub fn assert_adjoint(check: AdjointCheck, tolerance: f64, context: &str) -> Result<()> {
    let error = check.relative_error();
    if error > tolerance {
        bail!(
            "{context}: <Ax, y> = {} but <x, A^T y> = {} (relative error {error:e} > {tolerance:e})",
            check.lhs,
            check.rhs
        );
    }
    Ok(())
}
