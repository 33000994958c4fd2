#[cfg(test)]
mod tests;

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use log::debug;

pub const CUBIC_2D: &str = "cubic_2D_coefficients.inc";
pub const CUBIC_2D_DX: &str = "cubic_2D_coefficients_dx.inc";
pub const CUBIC_2D_DY: &str = "cubic_2D_coefficients_dy.inc";
pub const CUBIC_3D: &str = "cubic_3D_coefficients.inc";
pub const CUBIC_3D_DX: &str = "cubic_3D_coefficients_dx.inc";
pub const CUBIC_3D_DY: &str = "cubic_3D_coefficients_dy.inc";
pub const CUBIC_3D_DZ: &str = "cubic_3D_coefficients_dz.inc";

/// Every resource a complete set of tables is built from.
pub const RESOURCE_NAMES: [&str; 7] = [
    CUBIC_2D,
    CUBIC_2D_DX,
    CUBIC_2D_DY,
    CUBIC_3D,
    CUBIC_3D_DX,
    CUBIC_3D_DY,
    CUBIC_3D_DZ,
];

/// Number of taps along one axis of the cubic neighbourhood.
pub const TAPS_PER_AXIS: usize = 4;
/// Taps of a 2D neighbourhood (4x4).
pub const TAPS_2D: usize = TAPS_PER_AXIS * TAPS_PER_AXIS;
/// Taps of a 3D neighbourhood (4x4x4).
pub const TAPS_3D: usize = TAPS_2D * TAPS_PER_AXIS;

/// A square cubic-convolution matrix.
///
/// Row `k` belongs to the monomial `t0^k0 * t1^k1 (* t2^k2)`, column `j` to the
/// tap at relative offset `(j0 - 1, j1 - 1 (, j2 - 1))`. Both multi-indices are
/// flattened in C order with axis 0 most significant. Multiplying the table
/// with the neighbourhood samples yields the coefficients of the local cubic
/// interpolant.
#[derive(Debug, Clone)]
pub struct Table<const N: usize> {
    rows: Box<[[f32; N]; N]>,
}

impl<const N: usize> Table<N> {
    /// Parses a table from comma-delimited text, one row per line.
    ///
    /// Blank lines are skipped and a single trailing comma per row is accepted.
    /// Anything else that is not exactly `N` rows of `N` numbers is an error.
    pub fn parse(name: &str, text: &str) -> Result<Self> {
        let mut rows: Vec<[f32; N]> = Vec::with_capacity(N);

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if rows.len() == N {
                bail!("{name}: more than {N} rows (line {})", line_no + 1);
            }

            let line = line.strip_suffix(',').unwrap_or(line);
            let mut row = [0f32; N];
            let mut count = 0;
            for field in line.split(',') {
                if count == N {
                    bail!("{name}: more than {N} values on line {}", line_no + 1);
                }
                let field = field.trim();
                row[count] = field.parse().with_context(|| {
                    format!("{name}: invalid number {field:?} on line {}", line_no + 1)
                })?;
                count += 1;
            }
            if count != N {
                bail!(
                    "{name}: expected {N} values on line {}, got {count}",
                    line_no + 1
                );
            }
            rows.push(row);
        }

        if rows.len() != N {
            bail!("{name}: expected {N} rows, got {}", rows.len());
        }

        let rows = rows
            .into_boxed_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("{name}: row count changed while boxing"))?;
        Ok(Self { rows })
    }

    /// Tap weights of the interpolant at the per-axis sub-pixel `offsets`.
    ///
    /// `weights[j] = Σ_k mono_k(offsets) * table[k][j]`. The number of offsets
    /// must match the table's rank (`4^offsets.len() == N`).
    ///
    /// # Panics
    /// Panics if `offsets` does not match the table's rank.
    #[must_use]
    pub fn tap_weights(&self, offsets: &[f32]) -> [f32; N] {
        assert_eq!(TAPS_PER_AXIS.pow(offsets.len() as u32), N);

        let mut weights = [0f32; N];
        for (k, row) in self.rows.iter().enumerate() {
            let mono = monomial(k, offsets);
            if mono == 0.0 {
                continue;
            }
            for (w, &c) in weights.iter_mut().zip(row.iter()) {
                *w += mono * c;
            }
        }
        weights
    }
}

impl<const N: usize> PartialEq for Table<N> {
    /// Bitwise equality, so that reloading a resource can be checked for
    /// producing the exact same table.
    fn eq(&self, other: &Self) -> bool {
        self.rows
            .iter()
            .flatten()
            .zip(other.rows.iter().flatten())
            .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl<const N: usize> Eq for Table<N> {}

/// Evaluates monomial `k` (base-4 digits, axis 0 most significant) at `offsets`.
fn monomial(mut k: usize, offsets: &[f32]) -> f32 {
    let mut value = 1.0f32;
    for &t in offsets.iter().rev() {
        let power = k % TAPS_PER_AXIS;
        k /= TAPS_PER_AXIS;
        for _ in 0..power {
            value *= t;
        }
    }
    value
}

/// The complete, immutable set of cubic-convolution tables.
///
/// Build it once and pass it by reference (or `Arc`) to every operator call;
/// nothing mutates it after construction, so it can be shared freely across
/// threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoefficientTables {
    cubic_2d: Table<TAPS_2D>,
    cubic_2d_dx: Table<TAPS_2D>,
    cubic_2d_dy: Table<TAPS_2D>,
    cubic_3d: Table<TAPS_3D>,
    cubic_3d_dx: Table<TAPS_3D>,
    cubic_3d_dy: Table<TAPS_3D>,
    cubic_3d_dz: Table<TAPS_3D>,
}

impl CoefficientTables {
    /// Builds the tables from a resource loader.
    ///
    /// `load` is called once per name in [`RESOURCE_NAMES`] and must return
    /// the resource text. The first failure, whether from the loader or from
    /// parsing, aborts construction.
    pub fn from_sources<F>(mut load: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<String>,
    {
        let mut table_2d = |name: &str| -> Result<Table<TAPS_2D>> {
            let text = load(name).with_context(|| format!("failed to load {name}"))?;
            let table = Table::parse(name, &text)?;
            debug!("loaded coefficient table {name} ({TAPS_2D}x{TAPS_2D})");
            Ok(table)
        };
        let cubic_2d = table_2d(CUBIC_2D)?;
        let cubic_2d_dx = table_2d(CUBIC_2D_DX)?;
        let cubic_2d_dy = table_2d(CUBIC_2D_DY)?;

        let mut table_3d = |name: &str| -> Result<Table<TAPS_3D>> {
            let text = load(name).with_context(|| format!("failed to load {name}"))?;
            let table = Table::parse(name, &text)?;
            debug!("loaded coefficient table {name} ({TAPS_3D}x{TAPS_3D})");
            Ok(table)
        };
        let cubic_3d = table_3d(CUBIC_3D)?;
        let cubic_3d_dx = table_3d(CUBIC_3D_DX)?;
        let cubic_3d_dy = table_3d(CUBIC_3D_DY)?;
        let cubic_3d_dz = table_3d(CUBIC_3D_DZ)?;

        Ok(Self {
            cubic_2d,
            cubic_2d_dx,
            cubic_2d_dy,
            cubic_3d,
            cubic_3d_dx,
            cubic_3d_dy,
            cubic_3d_dz,
        })
    }

    /// Reads the seven resource files from `dir`.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        debug!("loading coefficient tables from {}", dir.display());
        Self::from_sources(|name| {
            let path = dir.join(name);
            fs::read_to_string(&path).with_context(|| format!("cannot read {}", path.display()))
        })
    }

    /// Parses the resources shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_sources(|name| {
            let text = match name {
                CUBIC_2D => include_str!("../resources/cubic_2D_coefficients.inc"),
                CUBIC_2D_DX => include_str!("../resources/cubic_2D_coefficients_dx.inc"),
                CUBIC_2D_DY => include_str!("../resources/cubic_2D_coefficients_dy.inc"),
                CUBIC_3D => include_str!("../resources/cubic_3D_coefficients.inc"),
                CUBIC_3D_DX => include_str!("../resources/cubic_3D_coefficients_dx.inc"),
                CUBIC_3D_DY => include_str!("../resources/cubic_3D_coefficients_dy.inc"),
                CUBIC_3D_DZ => include_str!("../resources/cubic_3D_coefficients_dz.inc"),
                _ => bail!("no bundled resource named {name}"),
            };
            Ok(text.to_owned())
        })
    }

    #[must_use]
    pub fn cubic_2d(&self) -> &Table<TAPS_2D> {
        &self.cubic_2d
    }

    #[must_use]
    pub fn cubic_3d(&self) -> &Table<TAPS_3D> {
        &self.cubic_3d
    }

    /// Partial-derivative table along `axis` (0 = x, 1 = y) of a 2D grid.
    pub fn derivative_2d(&self, axis: usize) -> Result<&Table<TAPS_2D>> {
        Ok(match axis {
            0 => &self.cubic_2d_dx,
            1 => &self.cubic_2d_dy,
            _ => bail!("Invalid derivative axis for a 2D table, must be 0 or 1, got {axis}."),
        })
    }

    /// Partial-derivative table along `axis` (0 = x, 1 = y, 2 = z) of a 3D grid.
    pub fn derivative_3d(&self, axis: usize) -> Result<&Table<TAPS_3D>> {
        Ok(match axis {
            0 => &self.cubic_3d_dx,
            1 => &self.cubic_3d_dy,
            2 => &self.cubic_3d_dz,
            _ => bail!("Invalid derivative axis for a 3D table, must be 0, 1 or 2, got {axis}."),
        })
    }
}
