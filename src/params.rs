
use std::num::NonZeroUsize;

use anyhow::{Result, bail};

/// Dimensionality of the grids handed to the downsampling kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Rank {
    Two = 2,
    Three = 3,
}

impl TryFrom<usize> for Rank {
    type Error = anyhow::Error;

    fn try_from(val: usize) -> Result<Self> {
        Ok(match val {
            2 => Self::Two,
            3 => Self::Three,
            _ => bail!("Unsupported grid rank, must be 2 or 3, got {val}."),
        })
    }
}

/// Which way the kernel moves data between the fine and the coarse grid.
///
/// - `Forward` gathers a fine neighbourhood into each coarse sample and
///   overwrites the coarse grid.
/// - `Adjoint` scatters each coarse sample back over the same neighbourhood
///   and accumulates into the fine grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Forward,
    Adjoint,
}

pub const DEFAULT_THREADS_PER_BLOCK_2D: [usize; 2] = [16, 16];
pub const DEFAULT_THREADS_PER_BLOCK_3D: [usize; 3] = [8, 8, 8];

/// Tile sizes used to partition the coarse grid into parallel blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownsampleParams {
    /// Coarse samples per block along each axis of a 2D grid.
    pub threads_per_block_2d: [NonZeroUsize; 2],
    /// Coarse samples per block along each axis of a 3D grid.
    pub threads_per_block_3d: [NonZeroUsize; 3],
}

impl DownsampleParams {
    /// Builds parameters from raw tile sizes, rejecting zero-sized tiles.
    pub fn new(threads_per_block_2d: [usize; 2], threads_per_block_3d: [usize; 3]) -> Result<Self> {
        Ok(Self {
            threads_per_block_2d: non_zero_tile(threads_per_block_2d)?,
            threads_per_block_3d: non_zero_tile(threads_per_block_3d)?,
        })
    }

    /// The tile size for the given rank, as a rank-length slice.
    #[must_use]
    pub fn threads_per_block(&self, rank: Rank) -> &[NonZeroUsize] {
        match rank {
            Rank::Two => &self.threads_per_block_2d,
            Rank::Three => &self.threads_per_block_3d,
        }
    }
}

impl Default for DownsampleParams {
    fn default() -> Self {
        // SAFETY: the default tile sizes are non-zero constants
        unsafe {
            Self {
                threads_per_block_2d: DEFAULT_THREADS_PER_BLOCK_2D
                    .map(|t| NonZeroUsize::new_unchecked(t)),
                threads_per_block_3d: DEFAULT_THREADS_PER_BLOCK_3D
                    .map(|t| NonZeroUsize::new_unchecked(t)),
            }
        }
    }
}

fn non_zero_tile<const N: usize>(tile: [usize; N]) -> Result<[NonZeroUsize; N]> {
    let mut out = [NonZeroUsize::MIN; N];
    for (axis, (dst, &t)) in out.iter_mut().zip(tile.iter()).enumerate() {
        let Some(t) = NonZeroUsize::new(t) else {
            bail!("Invalid tile size, axis {axis} of {tile:?} is zero.");
        };
        *dst = t;
    }
    Ok(out)
}
