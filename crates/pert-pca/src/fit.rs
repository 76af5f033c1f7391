// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Phase PCA Fitter
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Single-phase PCA fit with adaptive rank selection.
//!
//! An exploratory decomposition establishes the explained-variance
//! profile; the retained rank is the smallest component count whose
//! cumulative explained variance clears the target, capped at
//! `ncomps_max`.

use ndarray::{Array1, Array2, Axis};
use pert_math::linalg::symmetric_eigh;
use pert_types::error::{PertError, PertResult};
use pert_types::state::PcaBasis;

/// Upper bound on exploratory components, matching the historical
/// dataset pipeline.
const EXPLORE_CAP: usize = 100;

/// Full centered decomposition of one phase group.
struct Decomposition {
    mean: Array1<f64>,
    /// Component rows sorted by descending variance.
    components: Array2<f64>,
    /// Explained-variance ratio per component, against total variance.
    evr: Array1<f64>,
}

/// Decompose through the Gram matrix of the smaller side, the same
/// trick the flux-map feature counts force everywhere in this code
/// (n_samples ≪ n_features or vice versa).
fn decompose(x: &Array2<f64>, n_keep: usize) -> PertResult<Decomposition> {
    let (n, f) = x.dim();
    let mean = x
        .mean_axis(Axis(0))
        .ok_or_else(|| PertError::EmptyGroup("phase group has zero samples".to_string()))?;
    let xc = x - &mean.broadcast(x.raw_dim()).unwrap();

    let (lambda, components_full) = if n <= f {
        let gram = xc.dot(&xc.t());
        let (lambda, u) = symmetric_eigh(&gram)?;
        let lambda = lambda.mapv(|l| l.max(0.0));
        let mut components = Array2::zeros((n_keep, f));
        for i in 0..n_keep {
            if lambda[i] > 0.0 {
                let u_i = u.column(i);
                let row = u_i.dot(&xc);
                let inv_norm = 1.0 / lambda[i].sqrt();
                components.row_mut(i).assign(&(&row * inv_norm));
            }
        }
        (lambda, components)
    } else {
        let gram = xc.t().dot(&xc);
        let (lambda, v) = symmetric_eigh(&gram)?;
        let lambda = lambda.mapv(|l| l.max(0.0));
        let mut components = Array2::zeros((n_keep, f));
        for i in 0..n_keep {
            components.row_mut(i).assign(&v.column(i));
        }
        (lambda, components)
    };

    let total: f64 = lambda.sum();
    let evr = if total > 0.0 {
        Array1::from_iter(lambda.iter().take(n_keep).map(|&l| l / total))
    } else {
        Array1::zeros(n_keep)
    };

    Ok(Decomposition {
        mean,
        components: components_full,
        evr,
    })
}

/// Fit a PCA basis to one phase group with the adaptive rank rule.
///
/// Steps: exploratory fit with `min(min(n, F), 100) - 1` components;
/// pick the smallest k whose cumulative explained variance exceeds
/// `evt`, falling back to `ncomps_max` when no k qualifies or the
/// found k exceeds the cap; refit at exactly k. The exploratory
/// explained-variance-ratio vector rides along for diagnostics.
pub fn fit_phase_pca(x: &Array2<f64>, evt: f64, ncomps_max: usize) -> PertResult<PcaBasis> {
    let (n, f) = x.dim();
    if n == 0 {
        return Err(PertError::EmptyGroup(
            "phase group has zero samples".to_string(),
        ));
    }
    let n_explore = n.min(f).min(EXPLORE_CAP).saturating_sub(1);
    if n_explore == 0 {
        return Err(PertError::LinAlg(format!(
            "phase group too small for an exploratory fit ({n} samples, {f} features)"
        )));
    }

    let explored = decompose(x, n_explore)?;

    // Smallest k with cumulative EVR above the target.
    let mut k = ncomps_max;
    let mut cum = 0.0;
    let mut found = None;
    for (i, &r) in explored.evr.iter().enumerate() {
        cum += r;
        if cum > evt {
            found = Some(i + 1);
            break;
        }
    }
    if let Some(kk) = found {
        if kk <= ncomps_max {
            k = kk;
        }
    }

    if k > n_explore {
        return Err(PertError::LinAlg(format!(
            "requested {k} components but the exploratory fit only has {n_explore}"
        )));
    }

    // Refit at exactly k components on the same data.
    let refit = decompose(x, k)?;

    Ok(PcaBasis {
        mean: refit.mean,
        components: refit.components,
        explained_variance_ratio: explored.evr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn pseudo_random(m: usize, n: usize, seed: u64) -> Array2<f64> {
        let mut state = seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
        Array2::from_shape_fn((m, n), |_| {
            state = state
                .wrapping_mul(2862933555777941757)
                .wrapping_add(3037000493);
            ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
        })
    }

    /// Rank-r data plus offsets.
    fn low_rank_data(n: usize, f: usize, r: usize, seed: u64) -> Array2<f64> {
        let a = pseudo_random(n, r, seed);
        let b = pseudo_random(r, f, seed + 17);
        a.dot(&b)
    }

    #[test]
    fn test_low_rank_selects_small_k() {
        let x = low_rank_data(30, 50, 3, 7);
        let basis = fit_phase_pca(&x, 0.99, 20).unwrap();
        assert!(basis.n_components() <= 3 + 1);
        assert_eq!(basis.components.ncols(), 50);
    }

    #[test]
    fn test_cap_respected() {
        let x = pseudo_random(40, 60, 11); // full-rank noise
        let basis = fit_phase_pca(&x, 0.999, 5).unwrap();
        assert_eq!(basis.n_components(), 5);
    }

    #[test]
    fn test_evr_descending_and_cumulative_monotone() {
        let x = pseudo_random(25, 40, 3);
        let basis = fit_phase_pca(&x, 0.95, 20).unwrap();
        let evr = &basis.explained_variance_ratio;
        let mut cum = 0.0;
        for i in 0..evr.len() {
            assert!(evr[i] >= -1e-12);
            if i > 0 {
                assert!(evr[i] <= evr[i - 1] + 1e-12, "EVR not descending at {i}");
            }
            let next = cum + evr[i];
            assert!(next >= cum);
            cum = next;
        }
        assert!(cum <= 1.0 + 1e-9);
    }

    #[test]
    fn test_empty_group_fails() {
        let x = Array2::<f64>::zeros((0, 10));
        match fit_phase_pca(&x, 0.99, 20) {
            Err(PertError::EmptyGroup(_)) => {}
            other => panic!("expected EmptyGroup, got {other:?}"),
        }
    }

    #[test]
    fn test_single_sample_fails_explicitly() {
        let x = Array2::<f64>::ones((1, 10));
        assert!(fit_phase_pca(&x, 0.99, 20).is_err());
    }

    #[test]
    fn test_roundtrip_error_bounded_by_unexplained_variance() {
        let x = low_rank_data(40, 30, 4, 23)
            + &pseudo_random(40, 30, 99).mapv(|v| v * 0.01);
        let basis = fit_phase_pca(&x, 0.99, 20).unwrap();

        let coeffs = basis.transform(&x);
        let recon = basis.inverse_transform(&coeffs);

        let mean = x.mean_axis(ndarray::Axis(0)).unwrap();
        let xc = &x - &mean.broadcast(x.raw_dim()).unwrap();
        let total_energy: f64 = xc.mapv(|v| v * v).sum();
        let err_energy: f64 = (&x - &recon).mapv(|v| v * v).sum();

        let captured: f64 = basis
            .explained_variance_ratio
            .iter()
            .take(basis.n_components())
            .sum();
        let unexplained = (1.0 - captured).max(0.0);
        assert!(
            err_energy <= unexplained * total_energy + 1e-6 * total_energy,
            "reconstruction error {err_energy} exceeds unexplained bound {}",
            unexplained * total_energy
        );
    }

    #[test]
    fn test_components_orthonormal() {
        let x = low_rank_data(30, 25, 5, 3);
        let basis = fit_phase_pca(&x, 0.999, 10).unwrap();
        let g = basis.components.dot(&basis.components.t());
        for i in 0..g.nrows() {
            for j in 0..g.ncols() {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (g[[i, j]] - expected).abs() < 1e-7,
                    "components not orthonormal at ({i},{j})"
                );
            }
        }
    }
}
