pub mod cubic;


use std::{borrow::Cow, sync::Arc};

use anyhow::{Result, bail};
use log::trace;
use ndarray::{Array1, ArrayBase, ArrayView1, Data, DataMut, Dimension};

use crate::{
    coefficients::CoefficientTables,
    launch::{LaunchConfig, Shape},
    operator::{LinearOperator, check_len},
    params::{DownsampleParams, Mode, Rank},
    util::grid_len,
};
use cubic::AxisMapping;

/// Downsamples the fine grid `f` into the coarse grid `f_lr`.
///
/// Every coarse sample is the cubic (Catmull-Rom) interpolant of `f` at the
/// centre of the fine cells it covers. `f_lr` is overwritten and returned.
///
/// Both grids must be 2D or 3D, of the same rank, in standard (C-contiguous)
/// layout, and every fine extent must be a positive integer multiple of the
/// matching coarse extent.
pub fn downsample<'a, S1, S2, D>(
    tables: &CoefficientTables,
    f: &ArrayBase<S1, D>,
    f_lr: &'a mut ArrayBase<S2, D>,
) -> Result<&'a mut ArrayBase<S2, D>>
where
    S1: Data<Elem = f32>,
    S2: DataMut<Elem = f32>,
    D: Dimension,
{
    forward_grid(tables, &DownsampleParams::default(), f, f_lr)
}

/// Applies the adjoint of [`downsample`], accumulating into `f`.
///
/// `f` is added to, not overwritten: start from zeros to get `Aᵀ f_lr`
/// alone. The same shape rules as [`downsample`] apply.
pub fn adjoint_downsample<'a, S1, S2, D>(
    tables: &CoefficientTables,
    f: &'a mut ArrayBase<S1, D>,
    f_lr: &ArrayBase<S2, D>,
) -> Result<&'a mut ArrayBase<S1, D>>
where
    S1: DataMut<Elem = f32>,
    S2: Data<Elem = f32>,
    D: Dimension,
{
    adjoint_grid(tables, &DownsampleParams::default(), f, f_lr)
}

/// Validated description of one kernel launch: rank, both shapes and the
/// direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    rank: Rank,
    fine: Shape,
    coarse: Shape,
    mode: Mode,
}

impl Descriptor {
    pub fn new(fine: &[usize], coarse: &[usize], mode: Mode) -> Result<Self> {
        if fine.len() != coarse.len() {
            bail!(
                "Fine grid has rank {} but coarse grid has rank {}.",
                fine.len(),
                coarse.len()
            );
        }
        let rank = Rank::try_from(fine.len())?;
        for (axis, (&n, &m)) in fine.iter().zip(coarse).enumerate() {
            if let Err(e) = AxisMapping::new(n, m) {
                bail!("Shape mismatch on axis {axis} ({fine:?} -> {coarse:?}): {e}");
            }
        }

        Ok(Self {
            rank,
            fine: fine.into(),
            coarse: coarse.into(),
            mode,
        })
    }

    #[must_use]
    pub fn rank(&self) -> Rank {
        self.rank
    }

    #[must_use]
    pub fn fine(&self) -> &[usize] {
        &self.fine
    }

    #[must_use]
    pub fn coarse(&self) -> &[usize] {
        &self.coarse
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn axes<const R: usize>(&self) -> Result<[AxisMapping; R]> {
        let mut axes = [AxisMapping::new(1, 1)?; R];
        for (axis, dst) in axes.iter_mut().enumerate() {
            *dst = AxisMapping::new(self.fine[axis], self.coarse[axis])?;
        }
        Ok(axes)
    }

    /// Runs the kernel described by `self` over flat, C-ordered buffers.
    ///
    /// In forward mode `fine` is read and `coarse` overwritten; in adjoint
    /// mode `coarse` is read and `fine` accumulated into.
    pub fn execute(
        &self,
        tables: &CoefficientTables,
        params: &DownsampleParams,
        fine: Buffer<'_>,
        coarse: Buffer<'_>,
    ) -> Result<()> {
        check_len("Fine grid", fine.len(), grid_len(&self.fine))?;
        check_len("Coarse grid", coarse.len(), grid_len(&self.coarse))?;

        let launch = LaunchConfig::new(&self.coarse, params.threads_per_block(self.rank))?;
        trace!(
            "cubic downsample {:?} {:?}: {:?} -> {:?}, blocks {:?} x threads {:?}",
            self.rank,
            self.mode,
            self.fine,
            self.coarse,
            launch.num_blocks(),
            launch.threads_per_block()
        );

        match (self.rank, self.mode, fine, coarse) {
            (Rank::Two, Mode::Forward, Buffer::Read(src), Buffer::Write(dest)) => {
                let axes = self.axes::<2>()?;
                let weights = tables.cubic_2d().tap_weights(&axes.map(|a| a.offset()));
                cubic::forward_2d(dest, src, &axes, &weights, &launch);
            }
            (Rank::Two, Mode::Adjoint, Buffer::Write(dest), Buffer::Read(src)) => {
                let axes = self.axes::<2>()?;
                let weights = tables.cubic_2d().tap_weights(&axes.map(|a| a.offset()));
                cubic::adjoint_2d(dest, src, &axes, &weights, &launch);
            }
            (Rank::Three, Mode::Forward, Buffer::Read(src), Buffer::Write(dest)) => {
                let axes = self.axes::<3>()?;
                let weights = tables.cubic_3d().tap_weights(&axes.map(|a| a.offset()));
                cubic::forward_3d(dest, src, &axes, &weights, &launch);
            }
            (Rank::Three, Mode::Adjoint, Buffer::Write(dest), Buffer::Read(src)) => {
                let axes = self.axes::<3>()?;
                let weights = tables.cubic_3d().tap_weights(&axes.map(|a| a.offset()));
                cubic::adjoint_3d(dest, src, &axes, &weights, &launch);
            }
            (_, mode, _, _) => bail!("Buffer roles do not match {mode:?} mode."),
        }
        Ok(())
    }
}

/// A grid buffer together with the role it plays in one launch.
#[derive(Debug)]
pub enum Buffer<'a> {
    Read(&'a [f32]),
    Write(&'a mut [f32]),
}

impl Buffer<'_> {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Read(data) => data.len(),
            Self::Write(data) => data.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn forward_grid<'a, S1, S2, D>(
    tables: &CoefficientTables,
    params: &DownsampleParams,
    f: &ArrayBase<S1, D>,
    f_lr: &'a mut ArrayBase<S2, D>,
) -> Result<&'a mut ArrayBase<S2, D>>
where
    S1: Data<Elem = f32>,
    S2: DataMut<Elem = f32>,
    D: Dimension,
{
    let descriptor = Descriptor::new(f.shape(), f_lr.shape(), Mode::Forward)?;
    let Some(src) = f.as_slice() else {
        bail!("Fine grid must be in standard (C-contiguous) layout.");
    };
    let Some(dest) = f_lr.as_slice_mut() else {
        bail!("Coarse grid must be in standard (C-contiguous) layout.");
    };
    descriptor.execute(tables, params, Buffer::Read(src), Buffer::Write(dest))?;
    Ok(f_lr)
}

fn adjoint_grid<'a, S1, S2, D>(
    tables: &CoefficientTables,
    params: &DownsampleParams,
    f: &'a mut ArrayBase<S1, D>,
    f_lr: &ArrayBase<S2, D>,
) -> Result<&'a mut ArrayBase<S1, D>>
where
    S1: DataMut<Elem = f32>,
    S2: Data<Elem = f32>,
    D: Dimension,
{
    let descriptor = Descriptor::new(f.shape(), f_lr.shape(), Mode::Adjoint)?;
    let Some(src) = f_lr.as_slice() else {
        bail!("Coarse grid must be in standard (C-contiguous) layout.");
    };
    let Some(dest) = f.as_slice_mut() else {
        bail!("Fine grid must be in standard (C-contiguous) layout.");
    };
    descriptor.execute(tables, params, Buffer::Write(dest), Buffer::Read(src))?;
    Ok(f)
}

/// Cubic downsampler bound to a set of tables and tile sizes.
#[derive(Debug, Clone)]
pub struct Downsampler {
    tables: Arc<CoefficientTables>,
    params: DownsampleParams,
}

impl Downsampler {
    #[must_use]
    pub fn new(tables: Arc<CoefficientTables>) -> Self {
        Self::with_params(tables, DownsampleParams::default())
    }

    #[must_use]
    pub fn with_params(tables: Arc<CoefficientTables>, params: DownsampleParams) -> Self {
        Self { tables, params }
    }

    #[must_use]
    pub fn tables(&self) -> &CoefficientTables {
        &self.tables
    }

    #[must_use]
    pub fn params(&self) -> &DownsampleParams {
        &self.params
    }

    /// See [`downsample`].
    pub fn downsample<'a, S1, S2, D>(
        &self,
        f: &ArrayBase<S1, D>,
        f_lr: &'a mut ArrayBase<S2, D>,
    ) -> Result<&'a mut ArrayBase<S2, D>>
    where
        S1: Data<Elem = f32>,
        S2: DataMut<Elem = f32>,
        D: Dimension,
    {
        forward_grid(&self.tables, &self.params, f, f_lr)
    }

    /// See [`adjoint_downsample`].
    pub fn adjoint_downsample<'a, S1, S2, D>(
        &self,
        f: &'a mut ArrayBase<S1, D>,
        f_lr: &ArrayBase<S2, D>,
    ) -> Result<&'a mut ArrayBase<S1, D>>
    where
        S1: DataMut<Elem = f32>,
        S2: Data<Elem = f32>,
        D: Dimension,
    {
        adjoint_grid(&self.tables, &self.params, f, f_lr)
    }

    /// Binds fixed fine and coarse shapes, producing a matrix-free operator.
    pub fn operator(&self, fine: &[usize], coarse: &[usize]) -> Result<CubicDownsampleOperator> {
        CubicDownsampleOperator::new(self.clone(), fine, coarse)
    }
}

/// The downsampling map for one fine/coarse shape pair, as a
/// [`LinearOperator`] over flattened grids.
#[derive(Debug, Clone)]
pub struct CubicDownsampleOperator {
    downsampler: Downsampler,
    forward: Descriptor,
    adjoint: Descriptor,
}

impl CubicDownsampleOperator {
    pub fn new(downsampler: Downsampler, fine: &[usize], coarse: &[usize]) -> Result<Self> {
        Ok(Self {
            downsampler,
            forward: Descriptor::new(fine, coarse, Mode::Forward)?,
            adjoint: Descriptor::new(fine, coarse, Mode::Adjoint)?,
        })
    }

    #[must_use]
    pub fn fine_shape(&self) -> &[usize] {
        self.forward.fine()
    }

    #[must_use]
    pub fn coarse_shape(&self) -> &[usize] {
        self.forward.coarse()
    }
}

impl LinearOperator for CubicDownsampleOperator {
    type Elem = f32;

    fn shape(&self) -> (usize, usize) {
        (
            grid_len(self.forward.coarse()),
            grid_len(self.forward.fine()),
        )
    }

    fn matvec(&self, x: ArrayView1<'_, f32>) -> Result<Array1<f32>> {
        let (rows, cols) = self.shape();
        check_len("CubicDownsampleOperator::matvec", x.len(), cols)?;

        let x = contiguous(x);
        let mut out = vec![0f32; rows];
        self.forward.execute(
            self.downsampler.tables(),
            self.downsampler.params(),
            Buffer::Read(&x),
            Buffer::Write(&mut out),
        )?;
        Ok(Array1::from(out))
    }

    fn rmatvec(&self, y: ArrayView1<'_, f32>) -> Result<Array1<f32>> {
        let (rows, cols) = self.shape();
        check_len("CubicDownsampleOperator::rmatvec", y.len(), rows)?;

        let y = contiguous(y);
        let mut out = vec![0f32; cols];
        self.adjoint.execute(
            self.downsampler.tables(),
            self.downsampler.params(),
            Buffer::Write(&mut out),
            Buffer::Read(&y),
        )?;
        Ok(Array1::from(out))
    }
}

fn contiguous<'a>(v: ArrayView1<'a, f32>) -> Cow<'a, [f32]> {
    match v.to_slice() {
        Some(slice) => Cow::Borrowed(slice),
        None => Cow::Owned(v.to_vec()),
    }
}
