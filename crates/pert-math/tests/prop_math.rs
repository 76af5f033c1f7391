// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Property-Based Tests for pert-math
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests: LU solve residuals, SVD reconstruction and
//! ordering, Jacobi eigendecomposition orthogonality, row
//! normalization, median filter bounds.

use ndarray::{Array1, Array2};
use pert_math::eigen::max_real_eigenvalue;
use pert_math::filter::median_filter_columns;
use pert_math::linalg::{inv, lu_factor, normalize_rows, svd_thin, symmetric_eigh};
use proptest::prelude::*;

fn matrix_from_seed(m: usize, n: usize, seed: u64) -> Array2<f64> {
    // Deterministic pseudo-random entries in [-1, 1].
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    Array2::from_shape_fn((m, n), |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    })
}

proptest! {
    /// Diagonally dominant systems are solvable and the solution
    /// satisfies A x = b.
    #[test]
    fn lu_solve_residual(n in 2usize..12, seed in 0u64..500) {
        let mut a = matrix_from_seed(n, n, seed);
        for i in 0..n {
            a[[i, i]] += n as f64; // force diagonal dominance
        }
        let b = Array1::from_shape_fn(n, |i| (i as f64 + 1.0).sin());

        let lu = lu_factor(&a).unwrap();
        let x = lu.solve_vec(&b);
        let residual = a.dot(&x) - &b;
        for r in residual.iter() {
            prop_assert!(r.abs() < 1e-9, "residual {r}");
        }
    }

    /// A · A⁻¹ = I for well-conditioned matrices.
    #[test]
    fn inv_times_matrix_is_identity(n in 2usize..8, seed in 0u64..200) {
        let mut a = matrix_from_seed(n, n, seed);
        for i in 0..n {
            a[[i, i]] += n as f64;
        }
        let ai = inv(&a).unwrap();
        let prod = a.dot(&ai);
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                prop_assert!((prod[[i, j]] - expected).abs() < 1e-8);
            }
        }
    }

    /// Thin SVD reconstructs the input and orders singular values
    /// descending.
    #[test]
    fn svd_reconstructs(m in 1usize..8, n in 1usize..8, seed in 0u64..200) {
        let a = matrix_from_seed(m, n, seed);
        let (u, s, vt) = svd_thin(&a).unwrap();
        let k = m.min(n);

        for i in 1..k {
            prop_assert!(s[i] <= s[i - 1] + 1e-12);
        }

        let mut recon: Array2<f64> = Array2::zeros((m, n));
        for kk in 0..k {
            for i in 0..m {
                for j in 0..n {
                    recon[[i, j]] += u[[i, kk]] * s[kk] * vt[[kk, j]];
                }
            }
        }
        for i in 0..m {
            for j in 0..n {
                prop_assert!((recon[[i, j]] - a[[i, j]]).abs() < 1e-7,
                    "mismatch at ({}, {})", i, j);
            }
        }
    }

    /// Eigenvectors of a symmetric matrix are orthonormal.
    #[test]
    fn eigh_orthonormal(n in 2usize..8, seed in 0u64..200) {
        let b = matrix_from_seed(n, n, seed);
        let a = &b + &b.t(); // symmetrize
        let (_, v) = symmetric_eigh(&a).unwrap();
        let vtv = v.t().dot(&v);
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                prop_assert!((vtv[[i, j]] - expected).abs() < 1e-8);
            }
        }
    }

    /// Normalized rows have unit norm or are exactly zero.
    #[test]
    fn normalized_rows_unit_or_zero(m in 1usize..10, n in 1usize..10, seed in 0u64..200) {
        let a = matrix_from_seed(m, n, seed);
        let normed = normalize_rows(&a);
        for row in normed.rows() {
            let norm = row.dot(&row).sqrt();
            prop_assert!(norm < 1e-12 || (norm - 1.0).abs() < 1e-12);
        }
    }

    /// Median filtering never produces values outside the column's
    /// original range.
    #[test]
    fn median_filter_within_bounds(n in 1usize..30, window in 1usize..9, seed in 0u64..100) {
        let x = matrix_from_seed(n, 2, seed);
        let y = median_filter_columns(&x, window);
        for col in 0..2 {
            let lo = x.column(col).iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = x.column(col).iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            for &v in y.column(col).iter() {
                prop_assert!(v >= lo - 1e-15 && v <= hi + 1e-15);
            }
        }
    }

    /// The dominant real part of a triangular matrix is its largest
    /// diagonal entry.
    #[test]
    fn max_real_eig_of_triangular(n in 1usize..8, seed in 0u64..200) {
        let mut a = matrix_from_seed(n, n, seed);
        for i in 0..n {
            for j in 0..i {
                a[[i, j]] = 0.0;
            }
        }
        let expected = (0..n).map(|i| a[[i, i]]).fold(f64::NEG_INFINITY, f64::max);
        let got = max_real_eigenvalue(&a).unwrap();
        prop_assert!((got - expected).abs() < 1e-7, "got {got}, expected {expected}");
    }
}
