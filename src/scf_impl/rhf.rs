//! Restricted closed-shell Hartree-Fock over spatial orbitals.

use basis::{AoIntegrals, EriTensor};
use color_eyre::eyre::{bail, Result};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{info, warn};

use super::{
    align_eigenvectors, sorted_symmetric_eigen, symmetric_inv_sqrt, Diis, EnergyReport,
    IterationRecord, Scf, ScfOptions, SpinBlock,
};

pub struct Rhf {
    h: DMatrix<f64>,
    eri: EriTensor,
    overlap: DMatrix<f64>,
    x: DMatrix<f64>,
    nuclear_repulsion: f64,
    /// Number of doubly occupied spatial orbitals.
    nocc: usize,
    options: ScfOptions,

    pub energy: f64,
    pub coeffs: DMatrix<f64>,
    pub orbital_energies: DVector<f64>,
    pub density: DMatrix<f64>,
    pub trace: Vec<IterationRecord>,
    converged: bool,
    iterations: usize,
}

impl Rhf {
    /// Set up the solver. An odd electron count has no closed-shell
    /// determinant and is rejected up front.
    pub fn new(ints: &AoIntegrals, n_electrons: usize, options: ScfOptions) -> Result<Rhf> {
        if n_electrons % 2 != 0 {
            bail!(
                "restricted Hartree-Fock needs an even electron count, got {}",
                n_electrons
            );
        }
        let h = ints.core_hamiltonian();
        let x = symmetric_inv_sqrt(&ints.overlap);
        let dim = h.nrows();

        Ok(Rhf {
            h,
            eri: ints.eri.clone(),
            overlap: ints.overlap.clone(),
            x,
            nuclear_repulsion: ints.nuclear_repulsion,
            nocc: n_electrons / 2,
            options,
            energy: 0.0,
            coeffs: DMatrix::zeros(dim, dim),
            orbital_energies: DVector::zeros(dim),
            density: DMatrix::zeros(dim, dim),
            trace: Vec::new(),
            converged: false,
            iterations: 0,
        })
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Two-electron part of the Fock matrix,
    /// G_ij = sum_kl D_kl [(ij|kl) - (ik|jl)/2].
    fn two_electron_matrix(&self, density: &DMatrix<f64>) -> DMatrix<f64> {
        let dim = self.h.nrows();
        let ij_pairs: Vec<(usize, usize)> = (0..dim)
            .flat_map(|i| (0..dim).map(move |j| (i, j)))
            .collect();

        let values: Vec<f64> = ij_pairs
            .par_iter()
            .map(|&(i, j)| {
                let mut g_ij = 0.0;
                for k in 0..dim {
                    for l in 0..dim {
                        g_ij += density[(k, l)]
                            * (self.eri[(i, j, k, l)] - 0.5 * self.eri[(i, k, j, l)]);
                    }
                }
                g_ij
            })
            .collect();

        let mut g = DMatrix::zeros(dim, dim);
        for (idx, &(i, j)) in ij_pairs.iter().enumerate() {
            g[(i, j)] = values[idx];
        }
        g
    }

    /// Density from the lowest occupied columns, D = 2 C_occ C_occ^T.
    fn density_from(&self, coeffs: &DMatrix<f64>) -> DMatrix<f64> {
        let occupied = coeffs.columns(0, self.nocc);
        2.0 * &occupied * occupied.transpose()
    }
}

impl Scf for Rhf {
    fn compute_energy(&mut self) -> EnergyReport {
        self.trace.clear();
        self.converged = false;

        // Core guess: diagonalize h in the orthogonalized basis.
        let h_prime = self.x.transpose() * &self.h * &self.x;
        let (_, transformed) = sorted_symmetric_eigen(h_prime);
        self.coeffs = align_eigenvectors(&self.x * transformed);
        self.density = self.density_from(&self.coeffs);

        let mut diis = self
            .options
            .diis
            .then(|| Diis::new(self.options.diis_nvector, self.overlap.clone()));

        let mut old_energy = 0.0;
        for cycle in 0..self.options.max_iter {
            self.iterations = cycle + 1;

            let g = self.two_electron_matrix(&self.density);
            let mut fock = &self.h + &g;

            if let Some(diis) = diis.as_mut() {
                if cycle > 0 {
                    diis.update(
                        SpinBlock::Restricted(fock.clone()),
                        &SpinBlock::Restricted(self.density.clone()),
                    );
                    if cycle + 1 >= self.options.diis_start {
                        match diis.extrapolate() {
                            Some(SpinBlock::Restricted(extrapolated)) => fock = extrapolated,
                            Some(_) => unreachable!("restricted history is single-matrix"),
                            None => {}
                        }
                    }
                }
            }

            let f_prime = self.x.transpose() * &fock * &self.x;
            let (orbital_energies, transformed) = sorted_symmetric_eigen(f_prime);
            let coeffs = align_eigenvectors(&self.x * transformed);
            let new_density = self.density_from(&coeffs);

            let one_electron = (&self.h * &new_density).trace();
            let two_electron = 0.5 * (&g * &new_density).trace();
            let total = one_electron + two_electron + self.nuclear_repulsion;
            let delta = total - old_energy;
            let density_change = (&new_density - &self.density).norm();

            info!(
                "RHF {:3}  E = {:20.12}  dE = {:12.3e}",
                cycle, total, delta
            );
            self.trace.push(IterationRecord {
                iteration: cycle,
                energy: total,
                delta_e: delta,
                density_change,
            });

            self.energy = total;
            self.coeffs = coeffs;
            self.orbital_energies = orbital_energies;
            self.density = new_density;

            if cycle > 0 && delta.abs() < self.options.e_convergence {
                self.converged = true;
                info!("RHF converged in {} iterations", cycle + 1);
                break;
            }
            old_energy = total;
        }

        if !self.converged {
            warn!(
                "RHF did not converge within {} iterations; last energy {:.10}",
                self.options.max_iter, self.energy
            );
        }

        EnergyReport {
            energy: self.energy,
            converged: self.converged,
            iterations: self.iterations,
        }
    }
}
