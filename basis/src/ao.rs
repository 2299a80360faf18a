//! Atomic-orbital integral assembly: the provider surface consumed by the
//! SCF solvers.

use itertools::iproduct;
use nalgebra::{DMatrix, Vector3};
use rayon::prelude::*;

use crate::eri::EriTensor;
use crate::gto::ContractedGaussian;
use crate::sets::{self, BasisError};

/// Every integral a mean-field calculation needs, computed once per molecule
/// and basis. The ERI tensor is in chemist's notation `(ij|kl)`.
pub struct AoIntegrals {
    pub nbf: usize,
    pub overlap: DMatrix<f64>,
    pub kinetic: DMatrix<f64>,
    pub potential: DMatrix<f64>,
    pub eri: EriTensor,
    pub nuclear_repulsion: f64,
}

/// Compute all AO integrals for `atoms` (atomic number, position in Bohr)
/// in the named basis set.
pub fn compute_integrals(
    atoms: &[(u32, Vector3<f64>)],
    basis_name: &str,
) -> Result<AoIntegrals, BasisError> {
    let mut functions: Vec<ContractedGaussian> = Vec::new();
    for &(number, center) in atoms {
        for shell in sets::lookup(basis_name, number)? {
            functions.push(ContractedGaussian::new(
                shell.exponents.to_vec(),
                shell.coefficients.to_vec(),
                center,
            ));
        }
    }
    let nbf = functions.len();

    let ij_pairs: Vec<(usize, usize)> = iproduct!(0..nbf, 0..nbf).collect();

    let overlap_values: Vec<f64> = ij_pairs
        .par_iter()
        .map(|&(i, j)| ContractedGaussian::overlap(&functions[i], &functions[j]))
        .collect();

    let kinetic_values: Vec<f64> = ij_pairs
        .par_iter()
        .map(|&(i, j)| ContractedGaussian::kinetic(&functions[i], &functions[j]))
        .collect();

    let potential_values: Vec<f64> = ij_pairs
        .par_iter()
        .map(|&(i, j)| {
            atoms
                .iter()
                .map(|&(number, site)| {
                    ContractedGaussian::nuclear(&functions[i], &functions[j], site, number)
                })
                .sum()
        })
        .collect();

    let mut overlap = DMatrix::zeros(nbf, nbf);
    let mut kinetic = DMatrix::zeros(nbf, nbf);
    let mut potential = DMatrix::zeros(nbf, nbf);
    for (idx, &(i, j)) in ij_pairs.iter().enumerate() {
        overlap[(i, j)] = overlap_values[idx];
        kinetic[(i, j)] = kinetic_values[idx];
        potential[(i, j)] = potential_values[idx];
    }

    let quartets: Vec<(usize, usize, usize, usize)> =
        iproduct!(0..nbf, 0..nbf, 0..nbf, 0..nbf).collect();
    let eri_values: Vec<f64> = quartets
        .par_iter()
        .map(|&(i, j, k, l)| {
            ContractedGaussian::repulsion(&functions[i], &functions[j], &functions[k], &functions[l])
        })
        .collect();
    let mut eri = EriTensor::zeros(nbf);
    for (idx, &(i, j, k, l)) in quartets.iter().enumerate() {
        eri[(i, j, k, l)] = eri_values[idx];
    }

    Ok(AoIntegrals {
        nbf,
        overlap,
        kinetic,
        potential,
        eri,
        nuclear_repulsion: nuclear_repulsion(atoms),
    })
}

/// Point-charge repulsion between the nuclei.
pub fn nuclear_repulsion(atoms: &[(u32, Vector3<f64>)]) -> f64 {
    let mut energy = 0.0;
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            let (zi, ri) = atoms[i];
            let (zj, rj) = atoms[j];
            energy += (zi * zj) as f64 / (ri - rj).norm();
        }
    }
    energy
}

impl AoIntegrals {
    /// Core Hamiltonian h = T + V.
    pub fn core_hamiltonian(&self) -> DMatrix<f64> {
        &self.kinetic + &self.potential
    }

    /// Density-fitted approximation of the ERI tensor.
    ///
    /// The positive-semidefinite supermatrix `M[(ij),(kl)] = (ij|kl)` is
    /// eigendecomposed and reassembled from the eigenpairs above `threshold`,
    /// which is the Cholesky-style factorization used in place of an
    /// auxiliary-basis fit. A threshold at machine precision reproduces the
    /// direct tensor.
    pub fn fitted_eri(&self, threshold: f64) -> EriTensor {
        let n = self.nbf;
        let supermatrix = DMatrix::from_fn(n * n, n * n, |row, col| {
            self.eri[(row / n, row % n, col / n, col % n)]
        });
        let eig = supermatrix.symmetric_eigen();

        let mut fitted = DMatrix::zeros(n * n, n * n);
        for p in 0..eig.eigenvalues.len() {
            let lambda = eig.eigenvalues[p];
            if lambda > threshold {
                let u = eig.eigenvectors.column(p);
                fitted += &u * u.transpose() * lambda;
            }
        }
        EriTensor::from_fn(n, |i, j, k, l| fitted[(i * n + j, k * n + l)])
    }
}
