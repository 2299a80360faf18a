//! Integral provider for the SCF solvers: contracted Gaussian basis data,
//! closed-form one- and two-electron integrals, and the dense ERI tensor.

pub mod ao;
pub mod eri;
pub mod gto;
pub mod sets;

pub use ao::AoIntegrals;
pub use eri::EriTensor;
pub use sets::BasisError;
