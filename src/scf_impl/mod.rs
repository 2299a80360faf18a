//! SCF engines with DIIS acceleration.
//!
//! This module provides the shared solver surface (the [`Scf`] trait and
//! [`ScfOptions`]), DIIS (Direct Inversion in the Iterative Subspace)
//! convergence acceleration over restricted or unrestricted Fock histories,
//! and the concrete [`Rhf`] and [`Uhf`] solvers.

mod rhf;
mod uhf;

pub use rhf::Rhf;
pub use uhf::Uhf;

use nalgebra::{DMatrix, DVector};
use std::collections::VecDeque;
use tracing::warn;

/// Iteration controls shared by the SCF solvers, defaulted to the recognized
/// configuration values.
#[derive(Debug, Clone)]
pub struct ScfOptions {
    pub max_iter: usize,
    pub e_convergence: f64,
    pub diis: bool,
    pub diis_nvector: usize,
    pub diis_start: usize,
}

impl Default for ScfOptions {
    fn default() -> Self {
        ScfOptions {
            max_iter: 50,
            e_convergence: 1e-10,
            diis: true,
            diis_nvector: 6,
            diis_start: 6,
        }
    }
}

/// The outcome of an energy calculation. Non-convergence is reported, not
/// raised: the caller decides whether an unconverged energy is usable.
#[derive(Debug, Clone, Copy)]
pub struct EnergyReport {
    pub energy: f64,
    pub converged: bool,
    pub iterations: usize,
}

/// Capability shared by every solver that can produce an energy (RHF, UHF,
/// and the perturbative correction layered on top).
pub trait Scf {
    fn compute_energy(&mut self) -> EnergyReport;
}

/// One row of the convergence diagnostics retained by the iterative solvers.
#[derive(Debug, Clone, Copy)]
pub struct IterationRecord {
    pub iteration: usize,
    pub energy: f64,
    pub delta_e: f64,
    pub density_change: f64,
}

/// A Fock or density matrix in either spin formalism: one matrix for a
/// restricted (or spin-orbital) treatment, an alpha/beta pair for an
/// unrestricted one. Operations are uniform across the two arms.
#[derive(Debug, Clone)]
pub enum SpinBlock {
    Restricted(DMatrix<f64>),
    Unrestricted {
        alpha: DMatrix<f64>,
        beta: DMatrix<f64>,
    },
}

impl SpinBlock {
    /// DIIS error e = FDS - SDF, per spin channel, with a shared overlap.
    fn error(&self, density: &SpinBlock, overlap: &DMatrix<f64>) -> SpinBlock {
        match (self, density) {
            (SpinBlock::Restricted(f), SpinBlock::Restricted(d)) => {
                SpinBlock::Restricted(commutator(f, d, overlap))
            }
            (
                SpinBlock::Unrestricted { alpha: fa, beta: fb },
                SpinBlock::Unrestricted { alpha: da, beta: db },
            ) => SpinBlock::Unrestricted {
                alpha: commutator(fa, da, overlap),
                beta: commutator(fb, db, overlap),
            },
            _ => unreachable!("mixed restricted/unrestricted pair in a DIIS history"),
        }
    }

    /// Frobenius inner product; for the unrestricted arm the alpha and beta
    /// error vectors are concatenated, i.e. the channel products are summed.
    fn dot(&self, other: &SpinBlock) -> f64 {
        match (self, other) {
            (SpinBlock::Restricted(a), SpinBlock::Restricted(b)) => a.dot(b),
            (
                SpinBlock::Unrestricted { alpha: aa, beta: ab },
                SpinBlock::Unrestricted { alpha: ba, beta: bb },
            ) => aa.dot(ba) + ab.dot(bb),
            _ => unreachable!("mixed restricted/unrestricted pair in a DIIS history"),
        }
    }

    fn scaled(&self, w: f64) -> SpinBlock {
        match self {
            SpinBlock::Restricted(m) => SpinBlock::Restricted(m * w),
            SpinBlock::Unrestricted { alpha, beta } => SpinBlock::Unrestricted {
                alpha: alpha * w,
                beta: beta * w,
            },
        }
    }

    fn accumulate(&mut self, w: f64, other: &SpinBlock) {
        match (self, other) {
            (SpinBlock::Restricted(a), SpinBlock::Restricted(b)) => *a += b * w,
            (
                SpinBlock::Unrestricted { alpha: aa, beta: ab },
                SpinBlock::Unrestricted { alpha: ba, beta: bb },
            ) => {
                *aa += ba * w;
                *ab += bb * w;
            }
            _ => unreachable!("mixed restricted/unrestricted pair in a DIIS history"),
        }
    }
}

fn commutator(fock: &DMatrix<f64>, density: &DMatrix<f64>, overlap: &DMatrix<f64>) -> DMatrix<f64> {
    fock * density * overlap - overlap * density * fock
}

/// DIIS convergence accelerator (P. Pulay, Chem. Phys. Lett. 73, 393).
///
/// Retains a bounded window of (error, Fock) pairs and extrapolates the Fock
/// matrix as the history combination whose error vector has minimal norm
/// under the constraint that the weights sum to 1, enforced through the
/// bordered linear system
///
/// ```text
/// +---+---+---+---+ +---+   +---+
/// |B00|B01|B02|-1 | | q0|   | 0 |
/// |B10|B11|B12|-1 | | q1|   | 0 |
/// |B20|B21|B22|-1 | | q2| = | 0 |
/// |-1 |-1 |-1 | 0 | | l |   |-1 |
/// +---+---+---+---+ +---+   +---+
/// ```
///
/// with `B[i,j] = <e_i, e_j>`.
pub struct Diis {
    overlap: DMatrix<f64>,
    history: VecDeque<(SpinBlock, SpinBlock)>,
    nvector: usize,
}

impl Diis {
    /// `nvector` bounds the retained history; `overlap` is the metric used in
    /// the error vectors (the spatial or spin-blocked S, matching the shape
    /// of the Fock matrices pushed in).
    pub fn new(nvector: usize, overlap: DMatrix<f64>) -> Self {
        Diis {
            overlap,
            history: VecDeque::new(),
            nvector,
        }
    }

    /// Record one (Fock, density) pair, evicting the oldest once the window
    /// is full.
    pub fn update(&mut self, fock: SpinBlock, density: &SpinBlock) {
        let error = fock.error(density, &self.overlap);
        while self.history.len() >= self.nvector.max(1) {
            self.history.pop_front();
        }
        self.history.push_back((error, fock));
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Solve the bordered system for the extrapolation weights, which sum
    /// to 1 by construction. `None` with fewer than two retained pairs or
    /// when the B matrix is singular (e.g. duplicate iterations).
    pub fn solve_weights(&self) -> Option<DVector<f64>> {
        let n = self.history.len();
        if n < 2 {
            return None;
        }

        let mut b = DMatrix::from_element(n + 1, n + 1, -1.0);
        b[(n, n)] = 0.0;
        for i in 0..n {
            for j in i..n {
                let v = self.history[i].0.dot(&self.history[j].0);
                b[(i, j)] = v;
                b[(j, i)] = v;
            }
        }

        let mut rhs = DVector::zeros(n + 1);
        rhs[n] = -1.0;

        let solution = b.lu().solve(&rhs)?;
        let weights = solution.rows(0, n).into_owned();
        // An ill-conditioned system (near-collinear error vectors) shows up
        // as exploding weights; treat it like a singular solve.
        if !weights.iter().all(|w| w.is_finite()) || weights.amax() > 1e4 {
            return None;
        }
        Some(weights)
    }

    /// The extrapolated Fock matrix, or `None` when the weights cannot be
    /// solved for; the caller falls back to the unextrapolated Fock.
    pub fn extrapolate(&self) -> Option<SpinBlock> {
        let weights = match self.solve_weights() {
            Some(w) => w,
            None => {
                if self.history.len() >= 2 {
                    warn!("DIIS B matrix is singular; keeping the unextrapolated Fock");
                }
                return None;
            }
        };

        let mut fock = self.history[0].1.scaled(weights[0]);
        for i in 1..self.history.len() {
            fock.accumulate(weights[i], &self.history[i].1);
        }
        Some(fock)
    }
}

/// Inverse square root of a symmetric positive-definite matrix, the
/// orthogonalizer X = S^{-1/2}. Eigenvalues below a small threshold (near
/// linear dependence in the basis) are discarded rather than inverted.
pub fn symmetric_inv_sqrt(m: &DMatrix<f64>) -> DMatrix<f64> {
    let eig = m.clone().symmetric_eigen();

    let threshold = 1e-10;
    let inv_sqrt_vals = DVector::from_fn(eig.eigenvalues.len(), |i, _| {
        let val = eig.eigenvalues[i];
        if val > threshold {
            1.0 / val.sqrt()
        } else {
            0.0
        }
    });

    &eig.eigenvectors * DMatrix::from_diagonal(&inv_sqrt_vals) * eig.eigenvectors.transpose()
}

/// Symmetric eigendecomposition with eigenvalues in ascending order and the
/// eigenvector columns reordered to match.
pub fn sorted_symmetric_eigen(m: DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let eig = m.symmetric_eigen();

    let mut indices: Vec<usize> = (0..eig.eigenvalues.len()).collect();
    indices.sort_by(|&a, &b| {
        eig.eigenvalues[a]
            .partial_cmp(&eig.eigenvalues[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let sorted_values = DVector::from_fn(eig.eigenvalues.len(), |i, _| eig.eigenvalues[indices[i]]);
    let sorted_vectors = eig.eigenvectors.select_columns(&indices);
    (sorted_values, sorted_vectors)
}

/// Align each eigenvector column so its largest-magnitude entry is positive,
/// making coefficient signs deterministic across eigensolver backends.
pub fn align_eigenvectors(mut eigvecs: DMatrix<f64>) -> DMatrix<f64> {
    for j in 0..eigvecs.ncols() {
        let col = eigvecs.column(j);
        let (_, &extreme) = col
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.abs()
                    .partial_cmp(&b.abs())
                    .unwrap_or(std::cmp::Ordering::Less)
            })
            .unwrap();
        if extreme < 0.0 {
            for i in 0..eigvecs.nrows() {
                eigvecs[(i, j)] = -eigvecs[(i, j)];
            }
        }
    }
    eigvecs
}
