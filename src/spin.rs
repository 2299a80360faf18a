//! Spin-orbital blocking of spatial-orbital integrals.
//!
//! Spatial quantities of dimension n become spin-orbital quantities of
//! dimension 2n, with the alpha functions first: spin-orbital index p maps to
//! spatial index `p % n` and spin `p / n`. These are pure tensor transforms
//! over trusted inputs.

use basis::EriTensor;
use nalgebra::DMatrix;

/// Block-diagonal expansion of a one-electron matrix: the spatial block
/// repeated for each spin, zero between spins.
pub fn spin_block_oei(a: &DMatrix<f64>) -> DMatrix<f64> {
    let n = a.nrows();
    DMatrix::from_fn(2 * n, 2 * n, |p, q| {
        if p / n == q / n {
            a[(p % n, q % n)]
        } else {
            0.0
        }
    })
}

/// Spin expansion of a chemist-notation two-electron tensor `(pq|rs)`:
/// nonzero only where each electron's index pair is spin-aligned.
pub fn spin_block_tei(g: &EriTensor) -> EriTensor {
    let n = g.dim();
    EriTensor::from_fn(2 * n, |p, q, r, s| {
        if p / n == q / n && r / n == s / n {
            g[(p % n, q % n, r % n, s % n)]
        } else {
            0.0
        }
    })
}

/// Antisymmetrized physicist-notation integrals from a chemist-notation
/// tensor: `<pq||rs> = (pr|qs) - (ps|qr)`.
pub fn antisymmetrize(g: &EriTensor) -> EriTensor {
    &g.permuted([0, 2, 1, 3]) - &g.permuted([0, 3, 1, 2])
}
