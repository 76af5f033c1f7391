// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Response Predictor
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Feed-forward predictor over PCA coefficient space.
//!
//! The pipeline only relies on the [`Predictor`] contract: one
//! prediction row per input row, aligned to shot/time. The bundled MLP
//! is a plain two-hidden-layer tanh network; training it is a concern
//! for the surrounding experiment scripts, not this crate.

use ndarray::{Array1, Array2};
use rand::Rng;

/// MLP architecture: input → 64 (tanh) → 32 (tanh) → output.
const HIDDEN1: usize = 64;
const HIDDEN2: usize = 32;

/// Anything that maps present-state coefficients to a predicted
/// response, one row per sample.
pub trait Predictor {
    fn predict_batch(&self, x: &Array2<f64>) -> Array2<f64>;
}

/// Two-hidden-layer tanh MLP.
pub struct ResponseMlp {
    pub w1: Array2<f64>,
    pub b1: Array1<f64>,
    pub w2: Array2<f64>,
    pub b2: Array1<f64>,
    pub w3: Array2<f64>,
    pub b3: Array1<f64>,
}

impl ResponseMlp {
    /// Create with random Xavier initialization.
    pub fn new(input_dim: usize, output_dim: usize) -> Self {
        let mut rng = rand::thread_rng();
        let s1 = (2.0 / (input_dim + HIDDEN1) as f64).sqrt();
        let s2 = (2.0 / (HIDDEN1 + HIDDEN2) as f64).sqrt();
        let s3 = (2.0 / (HIDDEN2 + output_dim) as f64).sqrt();

        ResponseMlp {
            w1: Array2::from_shape_fn((input_dim, HIDDEN1), |_| (rng.gen::<f64>() - 0.5) * 2.0 * s1),
            b1: Array1::zeros(HIDDEN1),
            w2: Array2::from_shape_fn((HIDDEN1, HIDDEN2), |_| (rng.gen::<f64>() - 0.5) * 2.0 * s2),
            b2: Array1::zeros(HIDDEN2),
            w3: Array2::from_shape_fn((HIDDEN2, output_dim), |_| (rng.gen::<f64>() - 0.5) * 2.0 * s3),
            b3: Array1::zeros(output_dim),
        }
    }

    /// Forward pass for a single sample.
    pub fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        let a1 = (x.dot(&self.w1) + &self.b1).mapv(f64::tanh);
        let a2 = (a1.dot(&self.w2) + &self.b2).mapv(f64::tanh);
        a2.dot(&self.w3) + &self.b3
    }
}

impl Predictor for ResponseMlp {
    fn predict_batch(&self, x: &Array2<f64>) -> Array2<f64> {
        let a1 = (x.dot(&self.w1) + &self.b1).mapv(f64::tanh);
        let a2 = (a1.dot(&self.w2) + &self.b2).mapv(f64::tanh);
        a2.dot(&self.w3) + &self.b3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_output_shape() {
        let mlp = ResponseMlp::new(6, 15);
        let x = Array1::from_elem(6, 1.0);
        let out = mlp.forward(&x);
        assert_eq!(out.len(), 15);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_batch_matches_single() {
        let mlp = ResponseMlp::new(4, 3);
        let x = Array2::from_shape_fn((5, 4), |(i, j)| (i as f64) * 0.1 + (j as f64) * 0.01);
        let batch = mlp.predict_batch(&x);
        assert_eq!(batch.dim(), (5, 3));
        for i in 0..5 {
            let single = mlp.forward(&x.row(i).to_owned());
            for j in 0..3 {
                assert!((batch[[i, j]] - single[j]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_one_row_per_sample() {
        let mlp = ResponseMlp::new(8, 2);
        let x = Array2::zeros((17, 8));
        assert_eq!(mlp.predict_batch(&x).nrows(), 17);
    }
}
