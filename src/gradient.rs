
use std::marker::PhantomData;

use anyhow::{Result, bail};
use ndarray::{Array, Array1, ArrayView, ArrayView1, Axis, Dimension, Slice, s};

use crate::{
    operator::{LinearOperator, check_len},
    util::{Sample, grid_len},
};

/// First differences along `axis`, one sample shorter than `x` on that axis.
fn forward_diff<T: Sample, D: Dimension>(x: &ArrayView<'_, T, D>, axis: Axis) -> Array<T, D> {
    let n = x.len_of(axis);
    let mut out = x.slice_axis(axis, Slice::from(1..)).to_owned();
    out.zip_mut_with(&x.slice_axis(axis, Slice::from(..n - 1)), |o, &v| *o = *o - v);
    out
}

/// Adjoint of [`forward_diff`]: `-y[0]` at the head, `y[i - 1] - y[i]` in the
/// interior and `y[last]` at the tail, making the output one sample longer
/// than `y` along `axis`.
fn diff_adjoint<T: Sample, D: Dimension>(y: &ArrayView<'_, T, D>, axis: Axis) -> Array<T, D> {
    let n = y.len_of(axis) + 1;
    let mut dim = y.raw_dim();
    dim[axis.index()] = n;

    let mut out = Array::zeros(dim);
    out.slice_axis_mut(axis, Slice::from(..n - 1))
        .zip_mut_with(y, |o, &v| *o = *o - v);
    out.slice_axis_mut(axis, Slice::from(1..))
        .zip_mut_with(y, |o, &v| *o = *o + v);
    out
}

/// 1D first-difference operator `R^n -> R^(n-1)`.
#[derive(Debug, Clone, Copy)]
pub struct GradientOperator<T = f32> {
    n: usize,
    _sample: PhantomData<T>,
}

impl<T: Sample> GradientOperator<T> {
    pub fn new(n: usize) -> Result<Self> {
        if n < 2 {
            bail!("GradientOperator needs at least 2 samples, got {n}.");
        }
        Ok(Self {
            n,
            _sample: PhantomData,
        })
    }
}

impl<T: Sample> LinearOperator for GradientOperator<T> {
    type Elem = T;

    fn shape(&self) -> (usize, usize) {
        (self.n - 1, self.n)
    }

    fn matvec(&self, x: ArrayView1<'_, T>) -> Result<Array1<T>> {
        check_len("GradientOperator::matvec", x.len(), self.n)?;
        Ok(forward_diff(&x, Axis(0)))
    }

    fn rmatvec(&self, y: ArrayView1<'_, T>) -> Result<Array1<T>> {
        check_len("GradientOperator::rmatvec", y.len(), self.n - 1)?;
        Ok(diff_adjoint(&y, Axis(0)))
    }
}

/// 1D first-difference operator that keeps the first sample, `R^n -> R^n`.
///
/// Row 0 is the identity on `x[0]`, the remaining rows are `x[i] - x[i - 1]`.
#[derive(Debug, Clone, Copy)]
pub struct SquareGradientOperator<T = f32> {
    n: usize,
    _sample: PhantomData<T>,
}

impl<T: Sample> SquareGradientOperator<T> {
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            bail!("SquareGradientOperator needs at least 1 sample, got 0.");
        }
        Ok(Self {
            n,
            _sample: PhantomData,
        })
    }
}

impl<T: Sample> LinearOperator for SquareGradientOperator<T> {
    type Elem = T;

    fn shape(&self) -> (usize, usize) {
        (self.n, self.n)
    }

    fn matvec(&self, x: ArrayView1<'_, T>) -> Result<Array1<T>> {
        check_len("SquareGradientOperator::matvec", x.len(), self.n)?;
        let mut out = x.to_owned();
        out.slice_mut(s![1..])
            .zip_mut_with(&x.slice(s![..-1]), |o, &v| *o = *o - v);
        Ok(out)
    }

    fn rmatvec(&self, y: ArrayView1<'_, T>) -> Result<Array1<T>> {
        check_len("SquareGradientOperator::rmatvec", y.len(), self.n)?;
        let mut out = y.to_owned();
        out.slice_mut(s![..-1])
            .zip_mut_with(&y.slice(s![1..]), |o, &v| *o = *o - v);
        Ok(out)
    }
}

/// First differences of a C-ordered 3D image along axis `AXIS`.
///
/// Use through the [`GradientOperator3DX`], [`GradientOperator3DY`] and
/// [`GradientOperator3DZ`] aliases.
#[derive(Debug, Clone, Copy)]
pub struct AxisGradientOperator<T, const AXIS: usize> {
    shape: [usize; 3],
    _sample: PhantomData<T>,
}

pub type GradientOperator3DX<T = f32> = AxisGradientOperator<T, 0>;
pub type GradientOperator3DY<T = f32> = AxisGradientOperator<T, 1>;
pub type GradientOperator3DZ<T = f32> = AxisGradientOperator<T, 2>;

impl<T: Sample, const AXIS: usize> AxisGradientOperator<T, AXIS> {
    const NAME: &'static str = match AXIS {
        0 => "GradientOperator3DX",
        1 => "GradientOperator3DY",
        _ => "GradientOperator3DZ",
    };

    pub fn new(shape: [usize; 3]) -> Result<Self> {
        const { assert!(AXIS < 3) };

        if shape[AXIS] < 2 {
            bail!(
                "{} needs at least 2 samples along axis {AXIS}, got shape {shape:?}.",
                Self::NAME
            );
        }
        if shape.contains(&0) {
            bail!("{} cannot operate on an empty image {shape:?}.", Self::NAME);
        }
        Ok(Self {
            shape,
            _sample: PhantomData,
        })
    }

    /// Image shape the operator was built for.
    #[must_use]
    pub fn image_shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Shape of the difference image, one shorter along `AXIS`.
    #[must_use]
    pub fn diff_shape(&self) -> [usize; 3] {
        let mut shape = self.shape;
        shape[AXIS] -= 1;
        shape
    }
}

impl<T: Sample, const AXIS: usize> LinearOperator for AxisGradientOperator<T, AXIS> {
    type Elem = T;

    fn shape(&self) -> (usize, usize) {
        (grid_len(&self.diff_shape()), grid_len(&self.shape))
    }

    fn matvec(&self, x: ArrayView1<'_, T>) -> Result<Array1<T>> {
        check_len(Self::NAME, x.len(), grid_len(&self.shape))?;
        let image = x.to_shape(self.shape)?;
        Ok(forward_diff(&image.view(), Axis(AXIS)).into_iter().collect())
    }

    fn rmatvec(&self, y: ArrayView1<'_, T>) -> Result<Array1<T>> {
        check_len(Self::NAME, y.len(), grid_len(&self.diff_shape()))?;
        let diff = y.to_shape(self.diff_shape())?;
        Ok(diff_adjoint(&diff.view(), Axis(AXIS)).into_iter().collect())
    }
}
