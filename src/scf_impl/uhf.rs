//! Spin-orbital unrestricted Hartree-Fock.
//!
//! The spatial integrals from the provider are spin-blocked to dimension 2n
//! and antisymmetrized once at construction; the iteration then works with a
//! single Fock/density matrix over spin orbitals, filling the `n_electrons`
//! lowest orbitals. The core guess is the empty density.

use basis::{AoIntegrals, EriTensor};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::{info, warn};

use super::{
    align_eigenvectors, sorted_symmetric_eigen, symmetric_inv_sqrt, Diis, EnergyReport,
    IterationRecord, Scf, ScfOptions, SpinBlock,
};
use crate::spin::{antisymmetrize, spin_block_oei, spin_block_tei};

pub struct Uhf {
    /// Spin-blocked core Hamiltonian h = T + V.
    h: DMatrix<f64>,
    /// Antisymmetrized spin-orbital ERIs <pq||rs> (physicist's notation).
    g: EriTensor,
    /// Spin-blocked overlap.
    overlap: DMatrix<f64>,
    /// Orthogonalizer X = S^{-1/2}.
    x: DMatrix<f64>,
    nuclear_repulsion: f64,
    nocc: usize,
    options: ScfOptions,

    pub energy: f64,
    pub coeffs: DMatrix<f64>,
    pub orbital_energies: DVector<f64>,
    pub density: DMatrix<f64>,
    /// Per-iteration convergence diagnostics.
    pub trace: Vec<IterationRecord>,
    converged: bool,
    iterations: usize,
}

impl Uhf {
    /// Set up the solver from provider integrals and an electron count
    /// (`sum of Z - charge`).
    pub fn new(ints: &AoIntegrals, n_electrons: usize, options: ScfOptions) -> Uhf {
        let h = spin_block_oei(&ints.core_hamiltonian());
        let g = antisymmetrize(&spin_block_tei(&ints.eri));
        let overlap = spin_block_oei(&ints.overlap);
        let x = symmetric_inv_sqrt(&overlap);
        let dim = h.nrows();

        Uhf {
            h,
            g,
            overlap,
            x,
            nuclear_repulsion: ints.nuclear_repulsion,
            nocc: n_electrons,
            options,
            energy: 0.0,
            coeffs: DMatrix::zeros(dim, dim),
            orbital_energies: DVector::zeros(dim),
            density: DMatrix::zeros(dim, dim),
            trace: Vec::new(),
            converged: false,
            iterations: 0,
        }
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn n_occupied(&self) -> usize {
        self.nocc
    }

    pub fn n_spin_orbitals(&self) -> usize {
        self.h.nrows()
    }

    /// Mean-field potential v_{mu nu} = sum_{rho sigma} <mu rho||nu sigma> D_{sigma rho}.
    fn mean_field(&self, density: &DMatrix<f64>) -> DMatrix<f64> {
        let dim = self.h.nrows();
        let ij_pairs: Vec<(usize, usize)> = (0..dim)
            .flat_map(|i| (0..dim).map(move |j| (i, j)))
            .collect();

        let values: Vec<f64> = ij_pairs
            .par_iter()
            .map(|&(m, n)| {
                let mut v = 0.0;
                for r in 0..dim {
                    for s in 0..dim {
                        v += self.g[(m, r, n, s)] * density[(s, r)];
                    }
                }
                v
            })
            .collect();

        let mut v = DMatrix::zeros(dim, dim);
        for (idx, &(m, n)) in ij_pairs.iter().enumerate() {
            v[(m, n)] = values[idx];
        }
        v
    }
}

impl Scf for Uhf {
    fn compute_energy(&mut self) -> EnergyReport {
        let dim = self.h.nrows();
        self.trace.clear();
        self.density = DMatrix::zeros(dim, dim); // core guess
        self.converged = false;

        let mut diis = self
            .options
            .diis
            .then(|| Diis::new(self.options.diis_nvector, self.overlap.clone()));

        let mut old_energy = 0.0;
        for cycle in 0..self.options.max_iter {
            self.iterations = cycle + 1;

            let v = self.mean_field(&self.density);
            let mut fock = &self.h + &v;

            if let Some(diis) = diis.as_mut() {
                // The core-guess pair carries a trivial error vector; keep it
                // out of the history.
                if cycle > 0 {
                    diis.update(
                        SpinBlock::Restricted(fock.clone()),
                        &SpinBlock::Restricted(self.density.clone()),
                    );
                    if cycle + 1 >= self.options.diis_start {
                        match diis.extrapolate() {
                            Some(SpinBlock::Restricted(extrapolated)) => fock = extrapolated,
                            Some(_) => unreachable!("spin-orbital history is single-matrix"),
                            None => {}
                        }
                    }
                }
            }

            let f_prime = self.x.transpose() * &fock * &self.x;
            let (orbital_energies, transformed) = sorted_symmetric_eigen(f_prime);
            let coeffs = align_eigenvectors(&self.x * transformed);
            let occupied = coeffs.columns(0, self.nocc);
            let new_density = &occupied * occupied.transpose();

            let electronic = ((&self.h + &v * 0.5) * &new_density).trace();
            let total = electronic + self.nuclear_repulsion;
            let delta = total - old_energy;
            let density_change = (&new_density - &self.density).norm();

            info!(
                "UHF {:3}  E = {:20.12}  dE = {:12.3e}",
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
                info!("UHF converged in {} iterations", cycle + 1);
                break;
            }
            old_energy = total;
        }

        if !self.converged {
            warn!(
                "UHF did not converge within {} iterations; last energy {:.10}",
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
