//! Displaced-geometry input generation for finite-difference Hessians.
//!
//! For N atoms there are 3N Cartesian coordinates and exactly 3N(3N+1)
//! displacements: each coordinate shifted by +h and -h on its own, and each
//! coordinate pair shifted together by (+h, +h) and (-h, -h). That covers
//! the stencil of the symmetric second-difference formulas for diagonal and
//! off-diagonal Hessian elements.

use crate::molecule::Molecule;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;
use tracing::info;

/// One element of the displacement grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shift {
    /// Offset a single flat coordinate (0..3N) by `step * h`.
    Single { coord: usize, step: i32 },
    /// Offset two distinct flat coordinates (`first < second`) by the same
    /// `step * h`.
    Double {
        first: usize,
        second: usize,
        step: i32,
    },
}

impl Shift {
    /// The displaced geometry: a deep copy of `reference` with the offsets
    /// applied.
    pub fn apply(&self, reference: &Molecule, disp_size: f64) -> Molecule {
        let mut displaced = reference.clone();
        match *self {
            Shift::Single { coord, step } => {
                *displaced.coord_mut(coord) += step as f64 * disp_size;
            }
            Shift::Double {
                first,
                second,
                step,
            } => {
                *displaced.coord_mut(first) += step as f64 * disp_size;
                *displaced.coord_mut(second) += step as f64 * disp_size;
            }
        }
        displaced
    }
}

/// Enumerate the full grid for `natom` atoms, in a fixed order: all single
/// shifts (coordinate-major, + before -), then all pair shifts
/// (lexicographic pairs, + before -). The index of each entry names its
/// output directory.
pub fn displacements(natom: usize) -> Vec<Shift> {
    let ncoord = 3 * natom;
    let mut shifts = Vec::with_capacity(ncoord * (ncoord + 1));
    for coord in 0..ncoord {
        for step in [1, -1] {
            shifts.push(Shift::Single { coord, step });
        }
    }
    for first in 0..ncoord {
        for second in (first + 1)..ncoord {
            for step in [1, -1] {
                shifts.push(Shift::Double {
                    first,
                    second,
                    step,
                });
            }
        }
    }
    shifts
}

#[derive(Debug, Clone)]
pub struct DisplacementSettings {
    /// Step size in Bohr.
    pub disp_size: f64,
    /// Name of the grid directory created under the output root.
    pub directory: String,
}

impl Default for DisplacementSettings {
    fn default() -> Self {
        DisplacementSettings {
            disp_size: 0.005,
            directory: "DISPS".to_string(),
        }
    }
}

/// Write one subdirectory per displacement under `root/<directory>/<index>`,
/// each holding a copy of the reference input template and the displaced
/// geometry, plus the reference geometry at the grid root. Returns the number
/// of displacements written.
pub fn write_displacement_inputs(
    reference: &Molecule,
    template: &str,
    settings: &DisplacementSettings,
    root: &Path,
) -> Result<usize> {
    let mut mol = reference.clone();
    mol.to_bohr();

    let grid_dir = root.join(&settings.directory);
    fs::create_dir_all(&grid_dir)
        .wrap_err_with(|| format!("unable to create {}", grid_dir.display()))?;
    fs::write(grid_dir.join("molecule.xyz"), mol.to_string())?;

    let shifts = displacements(mol.natom());
    for (index, shift) in shifts.iter().enumerate() {
        let dir = grid_dir.join(index.to_string());
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("input.dat"), template)?;
        fs::write(
            dir.join("disp.xyz"),
            shift.apply(&mol, settings.disp_size).to_string(),
        )?;
    }

    info!(
        "wrote {} displacement inputs under {}",
        shifts.len(),
        grid_dir.display()
    );
    Ok(shifts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn grid_size_is_3n_times_3n_plus_1() {
        for natom in 1..=4 {
            let n = 3 * natom;
            assert_eq!(displacements(natom).len(), n * (n + 1));
        }
    }

    #[test]
    fn shifts_are_pairwise_distinct() {
        let shifts = displacements(3);
        let unique: HashSet<_> = shifts.iter().copied().collect();
        assert_eq!(unique.len(), shifts.len());
    }

    #[test]
    fn single_shift_moves_exactly_one_coordinate() {
        let mol = Molecule::parse("2\nBohr\nH 0 0 0\nH 0 0 1.4\n").unwrap();
        let shifted = Shift::Single { coord: 5, step: -1 }.apply(&mol, 0.005);
        assert_eq!(shifted.geom[1].z, 1.4 - 0.005);
        assert_eq!(shifted.geom[0], mol.geom[0]);
        assert_eq!(shifted.geom[1].x, 0.0);
    }

    #[test]
    fn double_shift_moves_exactly_two_coordinates() {
        let mol = Molecule::parse("2\nBohr\nH 0 0 0\nH 0 0 1.4\n").unwrap();
        let shifted = Shift::Double {
            first: 0,
            second: 5,
            step: 1,
        }
        .apply(&mol, 0.01);
        assert_eq!(shifted.geom[0].x, 0.01);
        assert_eq!(shifted.geom[1].z, 1.4 + 0.01);
        assert_eq!(shifted.geom[0].y, 0.0);
    }

    #[test]
    fn every_shift_produces_a_distinct_geometry() {
        let mol = Molecule::parse("1\nBohr\nH 0.1 0.2 0.3\n").unwrap();
        let shifts = displacements(mol.natom());
        let geometries: HashSet<String> = shifts
            .iter()
            .map(|s| s.apply(&mol, 0.005).to_string())
            .collect();
        assert_eq!(geometries.len(), shifts.len());
    }
}
