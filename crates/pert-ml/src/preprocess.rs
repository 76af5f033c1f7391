// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Data Preprocessing
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Assemble predictor design matrices from coefficient tables.
//!
//! Configured input and target signals are stacked column-wise,
//! standardized against training statistics, filtered by an optional
//! time threshold, and purged of NaN rows with shot/time kept in
//! lockstep.

use ndarray::{Array1, Array2, Axis};
use pert_types::error::{PertError, PertResult};
use pert_types::state::CoeffTable;
use rand::seq::SliceRandom;
use rand::Rng;

/// Floor on the per-column standard deviation to keep constant
/// channels from blowing up the scaling.
const EPS_STD: f64 = 1e-8;

/// Per-column standardization fitted on training data.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl StandardScaler {
    pub fn fit(x: &Array2<f64>) -> PertResult<Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(PertError::EmptyGroup(
                "cannot fit a scaler to zero rows".to_string(),
            ));
        }
        let mean = x.mean_axis(Axis(0)).unwrap();
        let mut var = Array1::zeros(x.ncols());
        for row in x.rows() {
            for (j, &v) in row.iter().enumerate() {
                let d = v - mean[j];
                var[j] += d * d;
            }
        }
        var /= n as f64;
        let std = var.mapv(|v: f64| v.sqrt().max(EPS_STD));
        Ok(StandardScaler { mean, std })
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let centered = x - &self.mean.broadcast(x.raw_dim()).unwrap();
        centered / &self.std.broadcast(x.raw_dim()).unwrap()
    }

    pub fn inverse_transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let scaled = x * &self.std.broadcast(x.raw_dim()).unwrap();
        scaled + &self.mean.broadcast(x.raw_dim()).unwrap()
    }
}

/// Column-stack the named signals' coefficient matrices.
pub fn stack_signals(table: &CoeffTable, names: &[String]) -> PertResult<Array2<f64>> {
    if names.is_empty() {
        return Err(PertError::ConfigError(
            "no signals named for stacking".to_string(),
        ));
    }
    let n = table.n_samples();
    let mut width = 0;
    for name in names {
        let coeff = table
            .signals
            .get(name)
            .ok_or_else(|| PertError::ConfigError(format!("signal '{name}' not in table")))?;
        if coeff.nrows() != n {
            return Err(PertError::Alignment {
                what: format!("signal '{name}'"),
                expected: n,
                got: coeff.nrows(),
            });
        }
        width += coeff.ncols();
    }

    let mut out = Array2::zeros((n, width));
    let mut col = 0;
    for name in names {
        let coeff = &table.signals[name];
        out.slice_mut(ndarray::s![.., col..col + coeff.ncols()])
            .assign(coeff);
        col += coeff.ncols();
    }
    Ok(out)
}

/// One split's design matrices, aligned with shot and time.
#[derive(Debug, Clone)]
pub struct TransformedSet {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub shot: Array1<i64>,
    pub time: Array1<f64>,
}

impl TransformedSet {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    fn select(&self, idx: &[usize]) -> TransformedSet {
        TransformedSet {
            x: self.x.select(Axis(0), idx),
            y: self.y.select(Axis(0), idx),
            shot: self.shot.select(Axis(0), idx),
            time: self.time.select(Axis(0), idx),
        }
    }
}

/// Scalers plus the signal layout they were fitted for.
#[derive(Debug, Clone)]
pub struct DataPreprocess {
    pub x_scaler: StandardScaler,
    pub y_scaler: StandardScaler,
    xnames: Vec<String>,
    ynames: Vec<String>,
    t_thresh: Option<f64>,
}

impl DataPreprocess {
    /// Fit scalers on a training table.
    pub fn fit(
        table: &CoeffTable,
        xnames: &[String],
        ynames: &[String],
        t_thresh: Option<f64>,
    ) -> PertResult<Self> {
        let x = stack_signals(table, xnames)?;
        let y = stack_signals(table, ynames)?;
        Ok(DataPreprocess {
            x_scaler: StandardScaler::fit(&x)?,
            y_scaler: StandardScaler::fit(&y)?,
            xnames: xnames.to_vec(),
            ynames: ynames.to_vec(),
            t_thresh,
        })
    }

    /// Stack, standardize, time-filter and NaN-purge one table.
    pub fn transform(&self, table: &CoeffTable) -> PertResult<TransformedSet> {
        let x = self.x_scaler.transform(&stack_signals(table, &self.xnames)?);
        let y = self.y_scaler.transform(&stack_signals(table, &self.ynames)?);

        let keep: Vec<usize> = (0..table.n_samples())
            .filter(|&i| {
                let time_ok = self.t_thresh.map_or(true, |t| table.time[i] > t);
                let finite =
                    x.row(i).iter().all(|v| !v.is_nan()) && y.row(i).iter().all(|v| !v.is_nan());
                time_ok && finite
            })
            .collect();

        Ok(TransformedSet {
            x: x.select(Axis(0), &keep),
            y: y.select(Axis(0), &keep),
            shot: table.shot.select(Axis(0), &keep),
            time: table.time.select(Axis(0), &keep),
        })
    }

    /// Randomly drop a fraction of whole shots, keeping sample order
    /// grouped by the surviving shots.
    pub fn holdback_by_shot<R: Rng>(
        set: &TransformedSet,
        holdback_fraction: f64,
        rng: &mut R,
    ) -> TransformedSet {
        if holdback_fraction <= 0.0 {
            return set.clone();
        }
        let mut uniq: Vec<i64> = set.shot.to_vec();
        uniq.sort_unstable();
        uniq.dedup();

        let n_keep = ((1.0 - holdback_fraction) * uniq.len() as f64) as usize;
        let chosen: Vec<i64> = uniq
            .choose_multiple(rng, n_keep)
            .copied()
            .collect();

        let mut idx = Vec::new();
        for &s in &chosen {
            idx.extend((0..set.shot.len()).filter(|&i| set.shot[i] == s));
        }
        set.select(&idx)
    }
}
