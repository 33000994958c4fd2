
use std::{num::NonZeroUsize, ops::Range};

use anyhow::{Result, bail};
use smallvec::SmallVec;

pub type Shape = SmallVec<[usize; 3]>;

/// A regular grid of blocks covering the coarse grid.
///
/// Each block owns a tile of at most `threads_per_block` coarse coordinates
/// per axis; blocks on the upper edge are clipped to the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    grid: Shape,
    threads_per_block: Shape,
    num_blocks: Shape,
}

impl LaunchConfig {
    /// Sizes the block grid to cover `grid` exactly (ceiling division).
    ///
    /// Tiles larger than the grid are clamped to the grid extent.
    pub fn new(grid: &[usize], threads_per_block: &[NonZeroUsize]) -> Result<Self> {
        if grid.len() != threads_per_block.len() {
            bail!(
                "Launch rank mismatch, grid has {} axes but tile has {}.",
                grid.len(),
                threads_per_block.len()
            );
        }
        if grid.contains(&0) {
            bail!("Cannot launch over an empty grid {grid:?}.");
        }

        // A tile never needs to be wider than the grid it covers
        let threads_per_block: Shape = grid
            .iter()
            .zip(threads_per_block)
            .map(|(&n, t)| t.get().min(n))
            .collect();
        let num_blocks = grid
            .iter()
            .zip(&threads_per_block)
            .map(|(&n, &t)| n.div_ceil(t))
            .collect();

        Ok(Self {
            grid: grid.into(),
            threads_per_block,
            num_blocks,
        })
    }

    #[must_use]
    pub fn grid(&self) -> &[usize] {
        &self.grid
    }

    #[must_use]
    pub fn threads_per_block(&self) -> &[usize] {
        &self.threads_per_block
    }

    #[must_use]
    pub fn num_blocks(&self) -> &[usize] {
        &self.num_blocks
    }

    #[must_use]
    pub fn total_blocks(&self) -> usize {
        self.num_blocks.iter().product()
    }

    /// Multi-index of the block with C-order linear index `linear`.
    #[must_use]
    pub fn block_index(&self, mut linear: usize) -> Shape {
        let mut index: Shape = SmallVec::from_elem(0, self.num_blocks.len());
        for (i, &n) in index.iter_mut().zip(&self.num_blocks).rev() {
            *i = linear % n;
            linear /= n;
        }
        index
    }

    /// Coarse coordinates covered by `block` along `axis`.
    #[must_use]
    pub fn tile_range(&self, axis: usize, block: usize) -> Range<usize> {
        let start = block * self.threads_per_block[axis];
        start..(start + self.threads_per_block[axis]).min(self.grid[axis])
    }
}
