//! Core UMP2 implementation.

use basis::{AoIntegrals, EriTensor};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use tracing::info;

use crate::scf_impl::{EnergyReport, Scf, Uhf};
use crate::spin::{antisymmetrize, spin_block_tei};

/// UMP2 calculator holding everything extracted from a converged UHF
/// reference: occupied count, spin-orbital energies, and the antisymmetrized
/// MO-basis integrals.
pub struct Ump2 {
    nocc: usize,
    orbital_energies: DVector<f64>,
    gmo: EriTensor,
    scf_energy: f64,
    scf_converged: bool,
    pub correlation_energy: Option<f64>,
}

impl Ump2 {
    /// Build from the reference and the provider's direct AO integrals.
    pub fn new(uhf: &Uhf, ints: &AoIntegrals) -> Ump2 {
        Ump2::with_eri(uhf, &ints.eri)
    }

    /// Build from the reference and the provider's density-fitted integrals.
    pub fn with_fitted(uhf: &Uhf, ints: &AoIntegrals, threshold: f64) -> Ump2 {
        Ump2::with_eri(uhf, &ints.fitted_eri(threshold))
    }

    /// Build from an arbitrary chemist-notation spatial ERI tensor: spin
    /// block, transform to the MO basis, antisymmetrize.
    pub fn with_eri(uhf: &Uhf, eri: &EriTensor) -> Ump2 {
        let spin_orbital = spin_block_tei(eri);
        let mo_chemist = mo_transform(&spin_orbital, &uhf.coeffs);
        Ump2 {
            nocc: uhf.n_occupied(),
            orbital_energies: uhf.orbital_energies.clone(),
            gmo: antisymmetrize(&mo_chemist),
            scf_energy: uhf.energy,
            scf_converged: uhf.converged(),
            correlation_energy: None,
        }
    }

    /// The antisymmetrized MO-basis integrals, for cross-checking integral
    /// paths against each other.
    pub fn gmo(&self) -> &EriTensor {
        &self.gmo
    }

    pub fn scf_energy(&self) -> f64 {
        self.scf_energy
    }

    /// The second-order correlation energy. Cached after the first call; the
    /// sum runs in a fixed iteration order per outer index, parallelized over
    /// the outer occupied orbital.
    pub fn correlation(&mut self) -> f64 {
        if let Some(ec) = self.correlation_energy {
            return ec;
        }

        let dim = self.gmo.dim();
        let nocc = self.nocc;
        let e = &self.orbital_energies;
        let gmo = &self.gmo;

        let ec: f64 = (0..nocc)
            .into_par_iter()
            .map(|i| {
                let mut acc = 0.0;
                for j in 0..nocc {
                    for a in nocc..dim {
                        for b in nocc..dim {
                            let denominator = e[i] + e[j] - e[a] - e[b];
                            if denominator.abs() < 1e-12 {
                                continue;
                            }
                            let integral = gmo[(i, j, a, b)];
                            acc += 0.25 * integral * integral / denominator;
                        }
                    }
                }
                acc
            })
            .sum();

        info!("UMP2 correlation energy: {:.10} au", ec);
        self.correlation_energy = Some(ec);
        ec
    }
}

impl Scf for Ump2 {
    /// Total MP2 energy, Ec + E_scf. A single pass: `iterations` is the one
    /// summation sweep, and convergence is inherited from the reference.
    fn compute_energy(&mut self) -> EnergyReport {
        let ec = self.correlation();
        let total = ec + self.scf_energy;
        info!("Total UMP2 energy: {:.10} au", total);
        EnergyReport {
            energy: total,
            converged: self.scf_converged,
            iterations: 1,
        }
    }
}

/// Four staged one-index contractions taking an AO-basis tensor to the MO
/// basis: `(pq|rs) = sum C_mu,p C_nu,q C_rh,r C_si,s (mu nu|rh si)`.
fn mo_transform(g: &EriTensor, coeffs: &DMatrix<f64>) -> EriTensor {
    let n = g.dim();
    let stage1 = EriTensor::from_fn(n, |p, j, k, l| {
        (0..n).map(|mu| coeffs[(mu, p)] * g[(mu, j, k, l)]).sum()
    });
    let stage2 = EriTensor::from_fn(n, |p, q, k, l| {
        (0..n).map(|nu| coeffs[(nu, q)] * stage1[(p, nu, k, l)]).sum()
    });
    let stage3 = EriTensor::from_fn(n, |p, q, r, l| {
        (0..n).map(|rh| coeffs[(rh, r)] * stage2[(p, q, rh, l)]).sum()
    });
    EriTensor::from_fn(n, |p, q, r, s| {
        (0..n).map(|si| coeffs[(si, s)] * stage3[(p, q, r, si)]).sum()
    })
}
