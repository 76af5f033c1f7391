// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Dense Linear Algebra
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Dense kernels: row normalization, symmetric eigendecomposition via
//! cyclic Jacobi rotations, thin SVD through the smaller-side Gram
//! matrix, and LU factorization with partial pivoting.
//!
//! The matrices here are small (stacked basis rows, conductor-space
//! geometry), so simple O(n³) kernels are sufficient.

use ndarray::{Array1, Array2};
use pert_types::error::{PertError, PertResult};

/// Convergence threshold on the summed off-diagonal magnitude.
const JACOBI_TOL: f64 = 1e-14;

/// Maximum Jacobi sweeps before giving up.
const JACOBI_MAX_SWEEPS: usize = 100;

/// L2-normalize each row independently. A zero row stays zero.
pub fn normalize_rows(a: &Array2<f64>) -> Array2<f64> {
    let mut out = a.clone();
    for mut row in out.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row /= norm;
        }
    }
    out
}

/// Eigendecomposition of a symmetric matrix by cyclic Jacobi rotation.
///
/// Returns (eigenvalues, eigenvectors) with eigenvalues sorted
/// descending and eigenvectors as matching columns.
pub fn symmetric_eigh(a: &Array2<f64>) -> PertResult<(Array1<f64>, Array2<f64>)> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(PertError::LinAlg(format!(
            "symmetric_eigh requires a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }

    let mut d = a.clone();
    let mut v = Array2::eye(n);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let mut off_diag = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off_diag += d[[i, j]].abs();
            }
        }
        if off_diag < JACOBI_TOL {
            break;
        }

        for i in 0..n {
            for j in (i + 1)..n {
                if d[[i, j]].abs() < 1e-15 {
                    continue;
                }
                let tau = (d[[j, j]] - d[[i, i]]) / (2.0 * d[[i, j]]);
                let t = if tau >= 0.0 {
                    1.0 / (tau + (1.0 + tau * tau).sqrt())
                } else {
                    -1.0 / (-tau + (1.0 + tau * tau).sqrt())
                };
                let cos = 1.0 / (1.0 + t * t).sqrt();
                let sin = t * cos;

                let dii = d[[i, i]];
                let djj = d[[j, j]];
                let dij = d[[i, j]];
                d[[i, i]] = cos * cos * dii - 2.0 * sin * cos * dij + sin * sin * djj;
                d[[j, j]] = sin * sin * dii + 2.0 * sin * cos * dij + cos * cos * djj;
                d[[i, j]] = 0.0;
                d[[j, i]] = 0.0;

                for r in 0..n {
                    if r == i || r == j {
                        continue;
                    }
                    let ri = d[[r, i]];
                    let rj = d[[r, j]];
                    d[[r, i]] = cos * ri - sin * rj;
                    d[[i, r]] = d[[r, i]];
                    d[[r, j]] = sin * ri + cos * rj;
                    d[[j, r]] = d[[r, j]];
                }

                for r in 0..n {
                    let vi = v[[r, i]];
                    let vj = v[[r, j]];
                    v[[r, i]] = cos * vi - sin * vj;
                    v[[r, j]] = sin * vi + cos * vj;
                }
            }
        }
    }

    // Sort descending by eigenvalue.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        d[[j, j]]
            .partial_cmp(&d[[i, i]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut eigenvalues = Array1::zeros(n);
    let mut eigenvectors = Array2::zeros((n, n));
    for (idx, &col) in order.iter().enumerate() {
        eigenvalues[idx] = d[[col, col]];
        for r in 0..n {
            eigenvectors[[r, idx]] = v[[r, col]];
        }
    }

    Ok((eigenvalues, eigenvectors))
}

/// Thin SVD, A ≈ U · diag(s) · Vt with k = min(m, n).
///
/// Works through the Gram matrix of the smaller side, which keeps the
/// Jacobi iteration cheap for the wide stacked-basis matrices used by
/// the merge step. Singular values come back descending; rows of Vt
/// belonging to (numerically) zero singular values are left zero.
pub fn svd_thin(a: &Array2<f64>) -> PertResult<(Array2<f64>, Array1<f64>, Array2<f64>)> {
    let (m, n) = a.dim();
    if m == 0 || n == 0 {
        return Err(PertError::LinAlg(format!(
            "svd_thin on degenerate shape {m}x{n}"
        )));
    }
    let k = m.min(n);

    if m <= n {
        // Gram on the row side: A Aᵀ = U diag(s²) Uᵀ.
        let gram = a.dot(&a.t());
        let (lambda, u) = symmetric_eigh(&gram)?;
        let s = lambda.mapv(|l| l.max(0.0).sqrt());
        let cutoff = s[0].max(0.0) * 1e-12;

        let mut vt = Array2::zeros((k, n));
        for i in 0..k {
            if s[i] > cutoff {
                let u_i = u.column(i);
                let row = u_i.dot(a);
                let inv_s = 1.0 / s[i];
                for j in 0..n {
                    vt[[i, j]] = row[j] * inv_s;
                }
            }
        }
        Ok((u, s, vt))
    } else {
        // Gram on the column side: Aᵀ A = V diag(s²) Vᵀ.
        let gram = a.t().dot(a);
        let (lambda, v) = symmetric_eigh(&gram)?;
        let s = lambda.mapv(|l| l.max(0.0).sqrt());
        let cutoff = s[0].max(0.0) * 1e-12;

        let mut u = Array2::zeros((m, k));
        for i in 0..k {
            if s[i] > cutoff {
                let v_i = v.column(i);
                let col = a.dot(&v_i);
                let inv_s = 1.0 / s[i];
                for r in 0..m {
                    u[[r, i]] = col[r] * inv_s;
                }
            }
        }
        let vt = v.t().to_owned();
        Ok((u, s, vt))
    }
}

/// LU factorization with partial pivoting.
#[derive(Debug, Clone)]
pub struct Lu {
    lu: Array2<f64>,
    piv: Vec<usize>,
}

/// Factor a square matrix. Fails with [`PertError::Singular`] when a
/// pivot falls below the numerical rank threshold.
pub fn lu_factor(a: &Array2<f64>) -> PertResult<Lu> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(PertError::LinAlg(format!(
            "lu_factor requires a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }

    let scale = a.iter().fold(0.0f64, |acc, &x| acc.max(x.abs()));
    let tiny = (scale * (n as f64) * f64::EPSILON).max(1e-300);

    let mut lu = a.clone();
    let mut piv: Vec<usize> = (0..n).collect();

    for k in 0..n {
        // Partial pivot: largest magnitude in column k at or below row k.
        let mut p = k;
        let mut max_val = lu[[k, k]].abs();
        for i in (k + 1)..n {
            if lu[[i, k]].abs() > max_val {
                max_val = lu[[i, k]].abs();
                p = i;
            }
        }
        if max_val <= tiny {
            return Err(PertError::Singular(format!(
                "zero pivot at column {k} (|pivot| = {max_val:.3e})"
            )));
        }
        if p != k {
            for j in 0..n {
                let tmp = lu[[k, j]];
                lu[[k, j]] = lu[[p, j]];
                lu[[p, j]] = tmp;
            }
            piv.swap(k, p);
        }

        let pivot = lu[[k, k]];
        for i in (k + 1)..n {
            let factor = lu[[i, k]] / pivot;
            lu[[i, k]] = factor;
            for j in (k + 1)..n {
                lu[[i, j]] -= factor * lu[[k, j]];
            }
        }
    }

    Ok(Lu { lu, piv })
}

impl Lu {
    pub fn n(&self) -> usize {
        self.lu.nrows()
    }

    /// Solve A x = b for a single right-hand side.
    pub fn solve_vec(&self, b: &Array1<f64>) -> Array1<f64> {
        let n = self.n();
        let mut x = Array1::zeros(n);
        for i in 0..n {
            x[i] = b[self.piv[i]];
        }
        // Forward substitution (unit lower triangle).
        for i in 1..n {
            let mut sum = x[i];
            for j in 0..i {
                sum -= self.lu[[i, j]] * x[j];
            }
            x[i] = sum;
        }
        // Back substitution.
        for i in (0..n).rev() {
            let mut sum = x[i];
            for j in (i + 1)..n {
                sum -= self.lu[[i, j]] * x[j];
            }
            x[i] = sum / self.lu[[i, i]];
        }
        x
    }

    /// Solve A X = B column by column.
    pub fn solve_mat(&self, b: &Array2<f64>) -> Array2<f64> {
        let n = self.n();
        let p = b.ncols();
        let mut x = Array2::zeros((n, p));
        for col in 0..p {
            let rhs = b.column(col).to_owned();
            let sol = self.solve_vec(&rhs);
            x.column_mut(col).assign(&sol);
        }
        x
    }
}

/// Matrix inverse through LU.
pub fn inv(a: &Array2<f64>) -> PertResult<Array2<f64>> {
    let lu = lu_factor(a)?;
    Ok(lu.solve_mat(&Array2::eye(a.nrows())))
}
