// ─────────────────────────────────────────────────────────────────────
// PertNet RS — State
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
use std::collections::BTreeMap;

use ndarray::{Array1, Array2};

use crate::error::{PertError, PertResult};

/// One signal's raw samples, aligned row-for-row with shot and time.
///
/// Row order must stay identical across `x`, `shot` and `time` at all
/// times; every consumer relies on it.
#[derive(Debug, Clone)]
pub struct SignalFrame {
    /// Sample matrix, (n_samples, n_features).
    pub x: Array2<f64>,
    /// Shot identifier per sample.
    pub shot: Array1<i64>,
    /// Time within shot per sample [s].
    pub time: Array1<f64>,
}

impl SignalFrame {
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.x.nrows() == 0
    }

    /// Check the row alignment invariant.
    pub fn validate(&self) -> PertResult<()> {
        let n = self.x.nrows();
        if self.shot.len() != n {
            return Err(PertError::Alignment {
                what: "shot column".to_string(),
                expected: n,
                got: self.shot.len(),
            });
        }
        if self.time.len() != n {
            return Err(PertError::Alignment {
                what: "time column".to_string(),
                expected: n,
                got: self.time.len(),
            });
        }
        Ok(())
    }
}

/// PCA basis for one phase group.
///
/// Explicit record: mean, orthonormal component rows, and the full
/// explained-variance-ratio vector of the exploratory fit.
#[derive(Debug, Clone)]
pub struct PcaBasis {
    /// Mean of the fitted samples, (n_features,).
    pub mean: Array1<f64>,
    /// Component rows, (n_components, n_features).
    pub components: Array2<f64>,
    /// Explained-variance ratio of the exploratory fit, one entry per
    /// exploratory component (usually longer than n_components).
    pub explained_variance_ratio: Array1<f64>,
}

impl PcaBasis {
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    /// Project samples into coefficient space.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let centered = x - &self.mean.broadcast(x.raw_dim()).unwrap();
        centered.dot(&self.components.t())
    }

    /// Reconstruct samples from coefficients.
    pub fn inverse_transform(&self, coeffs: &Array2<f64>) -> Array2<f64> {
        coeffs.dot(&self.components)
            + self
                .mean
                .broadcast((coeffs.nrows(), self.mean.len()))
                .unwrap()
    }
}

/// Re-orthogonalized union of the three phase bases.
///
/// The only basis used for projection after the merge; the phase bases
/// are retained as provenance.
#[derive(Debug, Clone)]
pub struct MergedBasis {
    /// Average of the three phase means, (n_features,).
    pub mean: Array1<f64>,
    /// Merged orthonormal component rows, (n_components, n_features).
    pub components: Array2<f64>,
    /// Fraction of stacked singular-value energy captured at the chosen
    /// rank.
    pub energy_captured: f64,
    pub rampup: PcaBasis,
    pub flattop: PcaBasis,
    pub rampdown: PcaBasis,
}

impl MergedBasis {
    pub fn n_components(&self) -> usize {
        self.components.nrows()
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let centered = x - &self.mean.broadcast(x.raw_dim()).unwrap();
        centered.dot(&self.components.t())
    }

    pub fn inverse_transform(&self, coeffs: &Array2<f64>) -> Array2<f64> {
        coeffs.dot(&self.components)
            + self
                .mean
                .broadcast((coeffs.nrows(), self.mean.len()))
                .unwrap()
    }
}

/// How a signal is represented in the coefficient table.
#[derive(Debug, Clone)]
pub enum SignalBasis {
    /// Merged PCA basis; coefficients are projections through it.
    Pca(MergedBasis),
    /// Too few features for PCA; the raw matrix is passed through.
    Raw,
}

/// Per-split coefficient table: signal name -> coefficient matrix,
/// plus shared shot and time columns.
#[derive(Debug, Clone, Default)]
pub struct CoeffTable {
    pub signals: BTreeMap<String, Array2<f64>>,
    pub shot: Array1<i64>,
    pub time: Array1<f64>,
}

impl CoeffTable {
    pub fn n_samples(&self) -> usize {
        self.shot.len()
    }

    /// Check that every coefficient matrix has exactly one row per
    /// shot/time entry.
    pub fn validate_alignment(&self) -> PertResult<()> {
        let n = self.shot.len();
        if self.time.len() != n {
            return Err(PertError::Alignment {
                what: "time column".to_string(),
                expected: n,
                got: self.time.len(),
            });
        }
        for (name, coeff) in &self.signals {
            if coeff.nrows() != n {
                return Err(PertError::Alignment {
                    what: format!("signal '{name}'"),
                    expected: n,
                    got: coeff.nrows(),
                });
            }
        }
        Ok(())
    }

    /// Select rows by index across every column in lockstep.
    pub fn select_rows(&self, idx: &[usize]) -> CoeffTable {
        let signals = self
            .signals
            .iter()
            .map(|(name, coeff)| (name.clone(), coeff.select(ndarray::Axis(0), idx)))
            .collect();
        CoeffTable {
            signals,
            shot: self.shot.select(ndarray::Axis(0), idx),
            time: self.time.select(ndarray::Axis(0), idx),
        }
    }
}
