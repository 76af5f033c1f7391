// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Basis Merger
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Merge the three phase bases into one orthonormal basis.
//!
//! The stacked matrix carries every phase component row plus the three
//! mean-offset directions, so phase-to-phase mean shifts survive the
//! truncation. Row normalization puts all directions on equal footing
//! before the SVD re-orthogonalization.

use ndarray::Array2;
use pert_math::linalg::{normalize_rows, svd_thin};
use pert_types::error::{PertError, PertResult};
use pert_types::state::{MergedBasis, PcaBasis};

/// Cumulative singular-value energy fraction kept after the merge.
const MERGE_ENERGY: f64 = 0.999;

/// Merge three phase bases into a single basis of rank at most
/// `ncomps_max`.
pub fn merge_bases(
    rampup: PcaBasis,
    flattop: PcaBasis,
    rampdown: PcaBasis,
    ncomps_max: usize,
) -> PertResult<MergedBasis> {
    let f = rampup.mean.len();
    for (basis, name) in [(&flattop, "flattop"), (&rampdown, "rampdown")] {
        if basis.mean.len() != f {
            return Err(PertError::Alignment {
                what: format!("{name} phase mean"),
                expected: f,
                got: basis.mean.len(),
            });
        }
    }

    let mu = (&rampup.mean + &flattop.mean + &rampdown.mean) / 3.0;

    let k1 = rampup.n_components();
    let k2 = flattop.n_components();
    let k3 = rampdown.n_components();
    let rows = k1 + k2 + k3 + 3;

    let mut a = Array2::zeros((rows, f));
    a.slice_mut(ndarray::s![0..k1, ..]).assign(&rampup.components);
    a.slice_mut(ndarray::s![k1..k1 + k2, ..])
        .assign(&flattop.components);
    a.slice_mut(ndarray::s![k1 + k2..k1 + k2 + k3, ..])
        .assign(&rampdown.components);
    a.row_mut(rows - 3).assign(&(&mu - &rampup.mean));
    a.row_mut(rows - 2).assign(&(&mu - &flattop.mean));
    a.row_mut(rows - 1).assign(&(&mu - &rampdown.mean));

    let a = normalize_rows(&a);
    let (_, s, vt) = svd_thin(&a)?;

    let total: f64 = s.sum();
    if total <= 0.0 {
        return Err(PertError::Singular(
            "all singular values vanished in basis merge".to_string(),
        ));
    }

    // Smallest rank whose cumulative energy clears the threshold.
    let mut n_components = s.len();
    let mut energy_captured = 1.0;
    let mut cum = 0.0;
    for (j, &sv) in s.iter().enumerate() {
        cum += sv;
        if cum / total > MERGE_ENERGY {
            n_components = j + 1;
            energy_captured = cum / total;
            break;
        }
    }
    if n_components > ncomps_max {
        n_components = ncomps_max;
        energy_captured = s.iter().take(n_components).sum::<f64>() / total;
    }

    let components = vt.slice(ndarray::s![0..n_components, ..]).to_owned();

    Ok(MergedBasis {
        mean: mu,
        components,
        energy_captured,
        rampup,
        flattop,
        rampdown,
    })
}
