//! Contracted s-type Gaussian orbitals and their closed-form integrals.
//!
//! All integrals are over normalized contracted functions; the primitive
//! normalization constants are folded into the contraction coefficients when
//! a [`ContractedGaussian`] is constructed, and the contraction itself is
//! rescaled to unit self-overlap.

use libm::erf;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// The Boys function F0(t), the s-orbital Coulomb kernel.
///
/// Small arguments use the Taylor branch 1 - t/3 to avoid the 0/0 of the
/// closed form.
pub fn boys_f0(t: f64) -> f64 {
    if t < 1e-12 {
        1.0 - t / 3.0
    } else {
        0.5 * (PI / t).sqrt() * erf(t.sqrt())
    }
}

/// A contracted s-type Gaussian centered on an atom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractedGaussian {
    pub exponents: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub center: Vector3<f64>,
}

impl ContractedGaussian {
    /// Build a contracted function from raw exponents and contraction
    /// coefficients (as tabulated for normalized primitives), then rescale to
    /// unit self-overlap.
    pub fn new(exponents: Vec<f64>, coefficients: Vec<f64>, center: Vector3<f64>) -> Self {
        assert_eq!(exponents.len(), coefficients.len());
        let coefficients = exponents
            .iter()
            .zip(&coefficients)
            .map(|(&alpha, &c)| c * primitive_norm(alpha))
            .collect();
        let mut cg = ContractedGaussian {
            exponents,
            coefficients,
            center,
        };
        let self_overlap = ContractedGaussian::overlap(&cg, &cg);
        let scale = 1.0 / self_overlap.sqrt();
        for c in &mut cg.coefficients {
            *c *= scale;
        }
        cg
    }

    pub fn evaluate(&self, r: &Vector3<f64>) -> f64 {
        let r2 = (r - self.center).norm_squared();
        self.exponents
            .iter()
            .zip(&self.coefficients)
            .map(|(&alpha, &c)| c * (-alpha * r2).exp())
            .sum()
    }

    /// Overlap integral <a|b>.
    pub fn overlap(a: &Self, b: &Self) -> f64 {
        let r2 = (a.center - b.center).norm_squared();
        contract_pairs(a, b, |alpha, beta| {
            let p = alpha + beta;
            let mu = alpha * beta / p;
            (PI / p).powf(1.5) * (-mu * r2).exp()
        })
    }

    /// Kinetic energy integral <a|-1/2 del^2|b>.
    pub fn kinetic(a: &Self, b: &Self) -> f64 {
        let r2 = (a.center - b.center).norm_squared();
        contract_pairs(a, b, |alpha, beta| {
            let p = alpha + beta;
            let mu = alpha * beta / p;
            mu * (3.0 - 2.0 * mu * r2) * (PI / p).powf(1.5) * (-mu * r2).exp()
        })
    }

    /// Nuclear attraction integral <a| -Z/|r - site| |b>.
    pub fn nuclear(a: &Self, b: &Self, site: Vector3<f64>, charge: u32) -> f64 {
        let r2 = (a.center - b.center).norm_squared();
        let z = charge as f64;
        contract_pairs(a, b, |alpha, beta| {
            let p = alpha + beta;
            let mu = alpha * beta / p;
            let gaussian_center = (alpha * a.center + beta * b.center) / p;
            let pc2 = (gaussian_center - site).norm_squared();
            -2.0 * PI / p * z * (-mu * r2).exp() * boys_f0(p * pc2)
        })
    }

    /// Two-electron repulsion integral (ab|cd) in chemist's notation.
    pub fn repulsion(a: &Self, b: &Self, c: &Self, d: &Self) -> f64 {
        let rab2 = (a.center - b.center).norm_squared();
        let rcd2 = (c.center - d.center).norm_squared();
        let mut total = 0.0;
        for (&alpha, &ca) in a.exponents.iter().zip(&a.coefficients) {
            for (&beta, &cb) in b.exponents.iter().zip(&b.coefficients) {
                let p = alpha + beta;
                let pc = (alpha * a.center + beta * b.center) / p;
                let bra = ca * cb * (-alpha * beta / p * rab2).exp();
                for (&gamma, &cc) in c.exponents.iter().zip(&c.coefficients) {
                    for (&delta, &cd_coeff) in d.exponents.iter().zip(&d.coefficients) {
                        let q = gamma + delta;
                        let qc = (gamma * c.center + delta * d.center) / q;
                        let ket = cc * cd_coeff * (-gamma * delta / q * rcd2).exp();
                        let pq2 = (pc - qc).norm_squared();
                        total += bra
                            * ket
                            * 2.0
                            * PI.powf(2.5)
                            * (p * q * (p + q).sqrt()).recip()
                            * boys_f0(p * q / (p + q) * pq2);
                    }
                }
            }
        }
        total
    }
}

fn primitive_norm(alpha: f64) -> f64 {
    (2.0 * alpha / PI).powf(0.75)
}

fn contract_pairs(
    a: &ContractedGaussian,
    b: &ContractedGaussian,
    f: impl Fn(f64, f64) -> f64,
) -> f64 {
    let mut total = 0.0;
    for (&alpha, &ca) in a.exponents.iter().zip(&a.coefficients) {
        for (&beta, &cb) in b.exponents.iter().zip(&b.coefficients) {
            total += ca * cb * f(alpha, beta);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sets;
    use approx::assert_relative_eq;

    fn h_1s(z: f64) -> ContractedGaussian {
        let shell = &sets::lookup("sto-3g", 1).unwrap()[0];
        ContractedGaussian::new(
            shell.exponents.to_vec(),
            shell.coefficients.to_vec(),
            Vector3::new(0.0, 0.0, z),
        )
    }

    #[test]
    fn contracted_functions_are_normalized() {
        let a = h_1s(0.0);
        assert_relative_eq!(ContractedGaussian::overlap(&a, &a), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn boys_f0_limits() {
        assert_relative_eq!(boys_f0(0.0), 1.0, epsilon = 1e-12);
        // Large argument: F0(t) -> sqrt(pi/t)/2
        assert_relative_eq!(boys_f0(50.0), 0.5 * (PI / 50.0).sqrt(), epsilon = 1e-12);
    }

    // Reference values for H2/STO-3G at R = 1.4 Bohr from the standard
    // minimal-basis tables (Szabo & Ostlund, ch. 3).
    #[test]
    fn h2_one_electron_integrals_match_reference() {
        let (a, b) = (h_1s(0.0), h_1s(1.4));
        assert_relative_eq!(ContractedGaussian::overlap(&a, &b), 0.6593, epsilon = 1e-3);
        assert_relative_eq!(ContractedGaussian::kinetic(&a, &a), 0.7600, epsilon = 1e-3);
        assert_relative_eq!(ContractedGaussian::kinetic(&a, &b), 0.2365, epsilon = 1e-3);
    }

    #[test]
    fn h2_repulsion_integrals_match_reference() {
        let (a, b) = (h_1s(0.0), h_1s(1.4));
        assert_relative_eq!(
            ContractedGaussian::repulsion(&a, &a, &a, &a),
            0.7746,
            epsilon = 1e-3
        );
        assert_relative_eq!(
            ContractedGaussian::repulsion(&a, &a, &b, &b),
            0.5697,
            epsilon = 1e-3
        );
        assert_relative_eq!(
            ContractedGaussian::repulsion(&b, &a, &a, &a),
            0.4441,
            epsilon = 1e-3
        );
        assert_relative_eq!(
            ContractedGaussian::repulsion(&b, &a, &b, &a),
            0.2970,
            epsilon = 1e-3
        );
    }
}
