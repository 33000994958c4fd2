use anyhow::{Result, bail};
use rayon::prelude::*;

use crate::{
    coefficients::{TAPS_2D, TAPS_3D, TAPS_PER_AXIS},
    launch::LaunchConfig,
    util::{as_atomic_cells, atomic_add_f32, dot::weighted_sum},
};

/// How one coarse axis maps onto the corresponding fine axis.
///
/// Coarse index `c` covers the fine samples `c * ratio .. (c + 1) * ratio`,
/// whose centre sits at fine coordinate `c * ratio + (ratio - 1) / 2`. The
/// interpolation base is the integer part of that centre and the sub-pixel
/// offset is `0.5` for even ratios and `0` for odd ones. The four taps
/// `base - 1 ..= base + 2` are clamped into the fine grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMapping {
    ratio: usize,
    fine_len: usize,
}

impl AxisMapping {
    pub fn new(fine_len: usize, coarse_len: usize) -> Result<Self> {
        if coarse_len == 0 || fine_len == 0 {
            bail!("Cannot downsample an empty axis ({fine_len} -> {coarse_len}).");
        }
        if fine_len < coarse_len || fine_len % coarse_len != 0 {
            bail!(
                "Fine axis of length {fine_len} is not an integer multiple of coarse axis of length {coarse_len}."
            );
        }
        Ok(Self {
            ratio: fine_len / coarse_len,
            fine_len,
        })
    }

    #[must_use]
    pub fn ratio(&self) -> usize {
        self.ratio
    }

    /// Sub-pixel offset of every coarse centre relative to its base tap.
    #[must_use]
    pub fn offset(&self) -> f32 {
        if self.ratio % 2 == 0 { 0.5 } else { 0.0 }
    }

    /// Fine indices of the four taps for coarse index `c`.
    #[inline]
    #[must_use]
    pub fn taps(&self, c: usize) -> [usize; TAPS_PER_AXIS] {
        let base = c * self.ratio + (self.ratio - 1) / 2;
        let last = self.fine_len - 1;
        // base - 1 underflows only for base == 0, where the tap clamps to 0
        [base.saturating_sub(1), base, (base + 1).min(last), (base + 2).min(last)]
    }
}

/// Forward 2D pass: `dest[c] = Σ_j weights[j] * src[tap_j(c)]`.
///
/// `src` is the fine grid, `dest` the coarse grid; both are C-ordered.
/// Bands of blocks along axis 0 run in parallel and own disjoint rows of
/// `dest`.
pub fn forward_2d(
    dest: &mut [f32],
    src: &[f32],
    axes: &[AxisMapping; 2],
    weights: &[f32; TAPS_2D],
    launch: &LaunchConfig,
) {
    let [m0, m1] = *axes;
    let n1 = launch.grid()[1];
    let fine_n1 = m1.fine_len;
    assert!(dest.len() >= launch.grid()[0] * n1);
    assert!(src.len() >= m0.fine_len * fine_n1);

    let band_len = launch.threads_per_block()[0] * n1;
    dest.par_chunks_mut(band_len)
        .enumerate()
        .for_each(|(b0, band)| {
            let rows = launch.tile_range(0, b0);
            for b1 in 0..launch.num_blocks()[1] {
                for c0 in rows.clone() {
                    let t0 = m0.taps(c0);
                    let row = &mut band[(c0 - rows.start) * n1..][..n1];
                    for c1 in launch.tile_range(1, b1) {
                        let t1 = m1.taps(c1);
                        let mut taps = [0f32; TAPS_2D];
                        for (j0, &i0) in t0.iter().enumerate() {
                            let src_row = &src[i0 * fine_n1..][..fine_n1];
                            for (j1, &i1) in t1.iter().enumerate() {
                                taps[j0 * TAPS_PER_AXIS + j1] = src_row[i1];
                            }
                        }
                        row[c1] = weighted_sum(weights, &taps);
                    }
                }
            }
        });
}

/// Adjoint 2D pass: `dest[tap_j(c)] += weights[j] * src[c]` for every coarse
/// `c`.
///
/// `dest` is the fine grid and is accumulated into, not cleared. All blocks
/// run in parallel; neighbouring blocks share fine cells, so every update is
/// an atomic add.
pub fn adjoint_2d(
    dest: &mut [f32],
    src: &[f32],
    axes: &[AxisMapping; 2],
    weights: &[f32; TAPS_2D],
    launch: &LaunchConfig,
) {
    let [m0, m1] = *axes;
    let n1 = launch.grid()[1];
    let fine_n1 = m1.fine_len;
    assert!(src.len() >= launch.grid()[0] * n1);
    assert!(dest.len() >= m0.fine_len * fine_n1);

    let cells = as_atomic_cells(dest);
    (0..launch.total_blocks()).into_par_iter().for_each(|b| {
        let block = launch.block_index(b);
        for c0 in launch.tile_range(0, block[0]) {
            let t0 = m0.taps(c0);
            for c1 in launch.tile_range(1, block[1]) {
                let t1 = m1.taps(c1);
                let value = src[c0 * n1 + c1];
                for (j0, &i0) in t0.iter().enumerate() {
                    for (j1, &i1) in t1.iter().enumerate() {
                        let w = weights[j0 * TAPS_PER_AXIS + j1];
                        atomic_add_f32(&cells[i0 * fine_n1 + i1], w * value);
                    }
                }
            }
        }
    });
}

/// Forward 3D pass, the 4x4x4 counterpart of [`forward_2d`].
pub fn forward_3d(
    dest: &mut [f32],
    src: &[f32],
    axes: &[AxisMapping; 3],
    weights: &[f32; TAPS_3D],
    launch: &LaunchConfig,
) {
    let [m0, m1, m2] = *axes;
    let (n1, n2) = (launch.grid()[1], launch.grid()[2]);
    let (fine_n1, fine_n2) = (m1.fine_len, m2.fine_len);
    assert!(dest.len() >= launch.grid()[0] * n1 * n2);
    assert!(src.len() >= m0.fine_len * fine_n1 * fine_n2);

    let band_len = launch.threads_per_block()[0] * n1 * n2;
    dest.par_chunks_mut(band_len)
        .enumerate()
        .for_each(|(b0, band)| {
            let slabs = launch.tile_range(0, b0);
            for b1 in 0..launch.num_blocks()[1] {
                for b2 in 0..launch.num_blocks()[2] {
                    for c0 in slabs.clone() {
                        let t0 = m0.taps(c0);
                        let slab = &mut band[(c0 - slabs.start) * n1 * n2..][..n1 * n2];
                        for c1 in launch.tile_range(1, b1) {
                            let t1 = m1.taps(c1);
                            for c2 in launch.tile_range(2, b2) {
                                let t2 = m2.taps(c2);
                                let mut taps = [0f32; TAPS_3D];
                                for (j0, &i0) in t0.iter().enumerate() {
                                    for (j1, &i1) in t1.iter().enumerate() {
                                        let src_row = &src[(i0 * fine_n1 + i1) * fine_n2..][..fine_n2];
                                        let tap_row = (j0 * TAPS_PER_AXIS + j1) * TAPS_PER_AXIS;
                                        for (j2, &i2) in t2.iter().enumerate() {
                                            taps[tap_row + j2] = src_row[i2];
                                        }
                                    }
                                }
                                slab[c1 * n2 + c2] = weighted_sum(weights, &taps);
                            }
                        }
                    }
                }
            }
        });
}

/// Adjoint 3D pass, the 4x4x4 counterpart of [`adjoint_2d`].
pub fn adjoint_3d(
    dest: &mut [f32],
    src: &[f32],
    axes: &[AxisMapping; 3],
    weights: &[f32; TAPS_3D],
    launch: &LaunchConfig,
) {
    let [m0, m1, m2] = *axes;
    let (n1, n2) = (launch.grid()[1], launch.grid()[2]);
    let (fine_n1, fine_n2) = (m1.fine_len, m2.fine_len);
    assert!(src.len() >= launch.grid()[0] * n1 * n2);
    assert!(dest.len() >= m0.fine_len * fine_n1 * fine_n2);

    let cells = as_atomic_cells(dest);
    (0..launch.total_blocks()).into_par_iter().for_each(|b| {
        let block = launch.block_index(b);
        for c0 in launch.tile_range(0, block[0]) {
            let t0 = m0.taps(c0);
            for c1 in launch.tile_range(1, block[1]) {
                let t1 = m1.taps(c1);
                for c2 in launch.tile_range(2, block[2]) {
                    let t2 = m2.taps(c2);
                    let value = src[(c0 * n1 + c1) * n2 + c2];
                    for (j0, &i0) in t0.iter().enumerate() {
                        for (j1, &i1) in t1.iter().enumerate() {
                            let fine_row = (i0 * fine_n1 + i1) * fine_n2;
                            let tap_row = (j0 * TAPS_PER_AXIS + j1) * TAPS_PER_AXIS;
                            for (j2, &i2) in t2.iter().enumerate() {
                                atomic_add_f32(&cells[fine_row + i2], weights[tap_row + j2] * value);
                            }
                        }
                    }
                }
            }
        }
    });
}
