// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Growth Rate
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Vertical-stability growth rate from shot geometry matrices.
//!
//! The conductor-space system matrix is assembled per sample from the
//! flux sensitivity tensor; the growth rate is the dominant eigenvalue
//! real part. Positive values mean the equilibrium is unstable.

use std::fs::File;

use ndarray::{Array1, Array2, Array3, Axis};
use ndarray_npy::NpzReader;
use pert_math::eigen::max_real_eigenvalue;
use pert_math::linalg::inv;
use pert_types::error::{PertError, PertResult};

/// Growth-rate calculator over fixed geometry matrices.
///
/// Everything is loaded once at construction and shared read-only
/// across all subsequent evaluations; `Mpp` is inverted exactly once.
#[derive(Debug, Clone)]
pub struct GrowthRate {
    m: Array2<f64>,
    rxx: Array2<f64>,
    mpp_inv: Array2<f64>,
    /// Pxxᵀ · MpcMpvᵀ, precomputed.
    coupling: Array2<f64>,
}

impl GrowthRate {
    /// Build from explicit geometry matrices.
    pub fn new(
        m: Array2<f64>,
        mpc_mpv: Array2<f64>,
        mpp: Array2<f64>,
        pxx: Array2<f64>,
        rxx: Array2<f64>,
    ) -> PertResult<Self> {
        let nc = m.nrows();
        if m.ncols() != nc {
            return Err(PertError::LinAlg(format!(
                "M must be square, got {}x{}",
                m.nrows(),
                m.ncols()
            )));
        }
        if rxx.dim() != (nc, nc) {
            return Err(PertError::LinAlg(format!(
                "Rxx shape {:?} does not match M ({nc}x{nc})",
                rxx.dim()
            )));
        }
        let mpp_inv = inv(&mpp)
            .map_err(|_| PertError::Singular("Mpp is not invertible".to_string()))?;
        let coupling = pxx.t().dot(&mpc_mpv.t());
        if coupling.nrows() != nc {
            return Err(PertError::LinAlg(format!(
                "Pxxᵀ·MpcMpvᵀ has {} rows, expected {nc}",
                coupling.nrows()
            )));
        }
        Ok(GrowthRate {
            m,
            rxx,
            mpp_inv,
            coupling,
        })
    }

    /// Load geometry matrices from a single NPZ archive with entries
    /// M, MpcMpv, Mpp, Pxx, Rxx.
    pub fn from_npz(path: &str) -> PertResult<Self> {
        let mut npz = NpzReader::new(File::open(path)?)
            .map_err(|e| PertError::ConfigError(format!("npz '{path}': {e}")))?;
        // NpzWriter appends ".npy" to entry names; accept either form.
        let read = |npz: &mut NpzReader<File>, name: &str| -> PertResult<Array2<f64>> {
            npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix2>(&format!("{name}.npy"))
                .or_else(|_| npz.by_name::<ndarray::OwnedRepr<f64>, ndarray::Ix2>(name))
                .map_err(|e| PertError::ConfigError(format!("npz '{path}' entry '{name}': {e}")))
        };
        let m = read(&mut npz, "M")?;
        let mpc_mpv = read(&mut npz, "MpcMpv")?;
        let mpp = read(&mut npz, "Mpp")?;
        let pxx = read(&mut npz, "Pxx")?;
        let rxx = read(&mut npz, "Rxx")?;
        Self::new(m, mpc_mpv, mpp, pxx, rxx)
    }

    /// Growth rate for each sample of a sensitivity batch
    /// `dpsidix[n_samples, n_grid, n_x]`.
    ///
    /// Per sample: Amat = -(M + Pxxᵀ MpcMpvᵀ Mpp⁻¹ dpsidix)⁻¹ Rxx, and
    /// γ = max Re λ(Amat). A singular M + X is fatal for the batch; no
    /// fallback value exists.
    pub fn calc_gamma(&self, dpsidix: &Array3<f64>) -> PertResult<Array1<f64>> {
        let n_samples = dpsidix.len_of(Axis(0));
        let nc = self.m.nrows();
        let mut gamma = Array1::zeros(n_samples);

        for i in 0..n_samples {
            let d = dpsidix.index_axis(Axis(0), i);
            if d.nrows() != self.mpp_inv.ncols() {
                return Err(PertError::Alignment {
                    what: format!("dpsidix sample {i}"),
                    expected: self.mpp_inv.ncols(),
                    got: d.nrows(),
                });
            }
            let dcphidix = self.mpp_inv.dot(&d);
            let xmat = self.coupling.dot(&dcphidix);
            if xmat.dim() != (nc, nc) {
                return Err(PertError::Alignment {
                    what: format!("system matrix for sample {i}"),
                    expected: nc,
                    got: xmat.ncols(),
                });
            }
            let system = &self.m + &xmat;
            let amat = inv(&system)
                .map_err(|_| {
                    PertError::Singular(format!("M + X is singular for sample {i}"))
                })?
                .dot(&self.rxx)
                .mapv(|v| -v);
            gamma[i] = max_real_eigenvalue(&amat)?;
        }

        Ok(gamma)
    }
}
