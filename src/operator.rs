
use std::fmt;

use anyhow::{Result, bail};
use ndarray::{Array1, ArrayView1};

use crate::util::Sample;

/// Element type reported by a linear operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    F32,
    F64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::F32 => "float32",
            Self::F64 => "float64",
        })
    }
}

/// A matrix-free linear map `A: R^cols -> R^rows` together with its adjoint.
///
/// This is the capability set iterative solvers rely on: apply forward,
/// apply adjoint, and report shape and element type. Vectors are flattened in
/// C order.
pub trait LinearOperator {
    type Elem: Sample;

    /// `(rows, cols)` of the implied matrix.
    fn shape(&self) -> (usize, usize);

    fn dtype(&self) -> DType {
        <Self::Elem as Sample>::DTYPE
    }

    /// `A x`. `x` must have `cols` elements.
    fn matvec(&self, x: ArrayView1<'_, Self::Elem>) -> Result<Array1<Self::Elem>>;

    /// `Aᵀ y`. `y` must have `rows` elements.
    fn rmatvec(&self, y: ArrayView1<'_, Self::Elem>) -> Result<Array1<Self::Elem>>;

    /// The transposed operator, sharing this one.
    fn adjoint(&self) -> Adjoint<'_, Self>
    where
        Self: Sized,
    {
        Adjoint { inner: self }
    }
}

/// View of an operator with forward and adjoint exchanged.
#[derive(Debug, Clone, Copy)]
pub struct Adjoint<'a, Op> {
    inner: &'a Op,
}

impl<Op: LinearOperator> LinearOperator for Adjoint<'_, Op> {
    type Elem = Op::Elem;

    fn shape(&self) -> (usize, usize) {
        let (rows, cols) = self.inner.shape();
        (cols, rows)
    }

    fn matvec(&self, x: ArrayView1<'_, Self::Elem>) -> Result<Array1<Self::Elem>> {
        self.inner.rmatvec(x)
    }

    fn rmatvec(&self, y: ArrayView1<'_, Self::Elem>) -> Result<Array1<Self::Elem>> {
        self.inner.matvec(y)
    }
}

/// Checks that an input vector matches the length the operator expects.
pub(crate) fn check_len(what: &str, len: usize, expected: usize) -> Result<()> {
    if len != expected {
        bail!("{what} expects an input of length {expected}, got {len}.");
    }
    Ok(())
}

/// Dot-product test for an operator pair.
///
/// Returns `|<A x, y> - <x, Aᵀ y>|` relative to the larger of the two inner
/// products, accumulated in `f64`. A correct adjoint gives a value at the
/// level of the element type's rounding error.
pub fn dot_test<Op: LinearOperator>(
    op: &Op,
    x: ArrayView1<'_, Op::Elem>,
    y: ArrayView1<'_, Op::Elem>,
) -> Result<f64> {
    let ax = op.matvec(x)?;
    let aty = op.rmatvec(y)?;

    let lhs = inner(ax.view(), y);
    let rhs = inner(x, aty.view());
    let scale = lhs.abs().max(rhs.abs()).max(f64::MIN_POSITIVE);
    Ok((lhs - rhs).abs() / scale)
}

fn inner<T: Sample>(a: ArrayView1<'_, T>, b: ArrayView1<'_, T>) -> f64 {
    a.iter().zip(b.iter()).map(|(&a, &b)| a.into() * b.into()).sum()
}
