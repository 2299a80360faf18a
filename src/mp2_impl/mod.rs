//! MP2 (Moller-Plesset perturbation theory, second order) over an
//! unrestricted reference.
//!
//! The correction is a single pass over a converged UHF solution: with
//! antisymmetrized spin-orbital integrals `<ij||ab>` in the molecular-orbital
//! basis and orbital energies `e`,
//!
//! ```text
//! Ec = 1/4 sum_{ij occ} sum_{ab virt} <ij||ab>^2 / (e_i + e_j - e_a - e_b)
//! ```
//!
//! and the total energy is `Ec + E_scf`. There is no iteration and no
//! convergence test. The density-fitted variant runs the same sum over the
//! provider's factorized integrals and must agree with the direct path to
//! numerical tolerance.

mod ump2;

pub use ump2::Ump2;
