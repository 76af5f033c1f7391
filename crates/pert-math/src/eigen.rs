// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Nonsymmetric Eigenvalues
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Eigenvalues of a general real matrix: Householder reduction to upper
//! Hessenberg form followed by Francis double-shift QR iteration.
//!
//! Only the spectrum is computed (no eigenvectors); the growth-rate
//! diagnostic needs just the maximum real part.

use ndarray::Array2;
use num_complex::Complex64;
use pert_types::error::{PertError, PertResult};

/// Maximum QR iterations per eigenvalue before declaring failure.
const MAX_QR_ITERS: usize = 30;

/// Eigenvalues of a square real matrix, in no particular order.
pub fn eigenvalues(a: &Array2<f64>) -> PertResult<Vec<Complex64>> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(PertError::LinAlg(format!(
            "eigenvalues requires a square matrix, got {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }
    if n == 1 {
        return Ok(vec![Complex64::new(a[[0, 0]], 0.0)]);
    }

    let mut h = hessenberg(a);
    hqr(&mut h)
}

/// Maximum real part over the spectrum. The growth-rate scalar.
pub fn max_real_eigenvalue(a: &Array2<f64>) -> PertResult<f64> {
    let eigs = eigenvalues(a)?;
    eigs.iter()
        .map(|e| e.re)
        .fold(None, |acc: Option<f64>, re| {
            Some(acc.map_or(re, |m| m.max(re)))
        })
        .ok_or_else(|| PertError::LinAlg("empty matrix has no eigenvalues".to_string()))
}

/// Householder reduction to upper Hessenberg form.
fn hessenberg(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let mut h = a.clone();

    for k in 0..n.saturating_sub(2) {
        let mut norm2 = 0.0;
        for i in (k + 1)..n {
            norm2 += h[[i, k]] * h[[i, k]];
        }
        if norm2 <= 1e-300 {
            continue;
        }
        let alpha = -norm2.sqrt().copysign(h[[k + 1, k]]);

        // Householder vector v = x - alpha·e1, stored densely.
        let mut v = vec![0.0; n];
        v[k + 1] = h[[k + 1, k]] - alpha;
        for i in (k + 2)..n {
            v[i] = h[[i, k]];
        }
        let vnorm2: f64 = v.iter().map(|x| x * x).sum();
        if vnorm2 <= 1e-300 {
            continue;
        }
        let beta = 2.0 / vnorm2;

        // H ← (I - β v vᵀ) H
        for j in k..n {
            let mut dot = 0.0;
            for i in (k + 1)..n {
                dot += v[i] * h[[i, j]];
            }
            let dot = beta * dot;
            for i in (k + 1)..n {
                h[[i, j]] -= dot * v[i];
            }
        }
        // H ← H (I - β v vᵀ)
        for i in 0..n {
            let mut dot = 0.0;
            for j in (k + 1)..n {
                dot += h[[i, j]] * v[j];
            }
            let dot = beta * dot;
            for j in (k + 1)..n {
                h[[i, j]] -= dot * v[j];
            }
        }

        h[[k + 1, k]] = alpha;
        for i in (k + 2)..n {
            h[[i, k]] = 0.0;
        }
    }

    h
}

/// Francis double-shift QR on an upper Hessenberg matrix.
/// Destroys `h`; returns all n eigenvalues.
#[allow(clippy::many_single_char_names)]
fn hqr(h: &mut Array2<f64>) -> PertResult<Vec<Complex64>> {
    let n = h.nrows() as isize;
    let hv = |h: &Array2<f64>, i: isize, j: isize| h[[i as usize, j as usize]];

    let anorm: f64 = h.iter().map(|x| x.abs()).sum();
    if anorm == 0.0 {
        return Ok(vec![Complex64::new(0.0, 0.0); n as usize]);
    }

    let mut eigs: Vec<Complex64> = Vec::with_capacity(n as usize);
    let mut nn = n - 1;
    let mut t = 0.0;

    while nn >= 0 {
        let mut its = 0usize;
        loop {
            // Look for a negligible subdiagonal element.
            let mut l = nn;
            while l >= 1 {
                let mut s = hv(h, l - 1, l - 1).abs() + hv(h, l, l).abs();
                if s == 0.0 {
                    s = anorm;
                }
                if hv(h, l, l - 1).abs() <= f64::EPSILON * s {
                    h[[l as usize, (l - 1) as usize]] = 0.0;
                    break;
                }
                l -= 1;
            }

            let mut x = hv(h, nn, nn);
            if l == nn {
                // One real eigenvalue isolated.
                eigs.push(Complex64::new(x + t, 0.0));
                nn -= 1;
                break;
            }

            let mut y = hv(h, nn - 1, nn - 1);
            let mut w = hv(h, nn, nn - 1) * hv(h, nn - 1, nn);

            if l == nn - 1 {
                // A 2x2 block isolated: solve its quadratic directly.
                let p = 0.5 * (y - x);
                let q = p * p + w;
                let z = q.abs().sqrt();
                let x = x + t;
                if q >= 0.0 {
                    let z = p + z.copysign(p);
                    eigs.push(Complex64::new(x + z, 0.0));
                    if z != 0.0 {
                        eigs.push(Complex64::new(x - w / z, 0.0));
                    } else {
                        eigs.push(Complex64::new(x + z, 0.0));
                    }
                } else {
                    eigs.push(Complex64::new(x + p, z));
                    eigs.push(Complex64::new(x + p, -z));
                }
                nn -= 2;
                break;
            }

            if its == MAX_QR_ITERS {
                return Err(PertError::LinAlg(
                    "QR eigenvalue iteration did not converge".to_string(),
                ));
            }
            if its == 10 || its == 20 {
                // Exceptional shift.
                t += x;
                for i in 0..=nn {
                    h[[i as usize, i as usize]] -= x;
                }
                let s = hv(h, nn, nn - 1).abs() + hv(h, nn - 1, nn - 2).abs();
                y = 0.75 * s;
                x = y;
                w = -0.4375 * s * s;
            }
            its += 1;

            // Find two consecutive small subdiagonal elements.
            let mut m = nn - 2;
            let mut p = 0.0;
            let mut q = 0.0;
            let mut r = 0.0;
            while m >= l {
                let z = hv(h, m, m);
                let rr = x - z;
                let ss = y - z;
                p = (rr * ss - w) / hv(h, m + 1, m) + hv(h, m, m + 1);
                q = hv(h, m + 1, m + 1) - z - rr - ss;
                r = hv(h, m + 2, m + 1);
                let s = p.abs() + q.abs() + r.abs();
                p /= s;
                q /= s;
                r /= s;
                if m == l {
                    break;
                }
                let u = hv(h, m, m - 1).abs() * (q.abs() + r.abs());
                let v = p.abs() * (hv(h, m - 1, m - 1).abs() + z.abs() + hv(h, m + 1, m + 1).abs());
                if u <= f64::EPSILON * v {
                    break;
                }
                m -= 1;
            }

            for i in (m + 2)..=nn {
                h[[i as usize, (i - 2) as usize]] = 0.0;
                if i > m + 2 {
                    h[[i as usize, (i - 3) as usize]] = 0.0;
                }
            }

            // Double QR step on rows l..nn, columns m..nn.
            for k in m..=(nn - 1) {
                if k != m {
                    p = hv(h, k, k - 1);
                    q = hv(h, k + 1, k - 1);
                    r = if k != nn - 1 { hv(h, k + 2, k - 1) } else { 0.0 };
                    x = p.abs() + q.abs() + r.abs();
                    if x != 0.0 {
                        p /= x;
                        q /= x;
                        r /= x;
                    }
                }
                let s = (p * p + q * q + r * r).sqrt().copysign(p);
                if s == 0.0 {
                    continue;
                }
                if k == m {
                    if l != m {
                        h[[k as usize, (k - 1) as usize]] = -hv(h, k, k - 1);
                    }
                } else {
                    h[[k as usize, (k - 1) as usize]] = -s * x;
                }
                p += s;
                x = p / s;
                y = q / s;
                let z = r / s;
                q /= p;
                r /= p;

                // Row modification.
                for j in k..=nn {
                    let mut pp = hv(h, k, j) + q * hv(h, k + 1, j);
                    if k != nn - 1 {
                        pp += r * hv(h, k + 2, j);
                        h[[(k + 2) as usize, j as usize]] -= pp * z;
                    }
                    h[[(k + 1) as usize, j as usize]] -= pp * y;
                    h[[k as usize, j as usize]] -= pp * x;
                }
                // Column modification.
                let mmin = if nn < k + 3 { nn } else { k + 3 };
                for i in l..=mmin {
                    let mut pp = x * hv(h, i, k) + y * hv(h, i, k + 1);
                    if k != nn - 1 {
                        pp += z * hv(h, i, k + 2);
                        h[[i as usize, (k + 2) as usize]] -= pp * r;
                    }
                    h[[i as usize, (k + 1) as usize]] -= pp * q;
                    h[[i as usize, k as usize]] -= pp;
                }
            }
        }
    }

    Ok(eigs)
}
