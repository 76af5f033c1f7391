// ─────────────────────────────────────────────────────────────────────
// PertNet RS — PCA Pipeline
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Per-signal orchestration: segment, fit three phase bases on
//! training data, merge, then project train/validation/test through
//! the merged basis.
//!
//! One signal's failure never aborts the run; it is reported and the
//! signal is simply absent from the output tables.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use pert_math::filter::median_filter_columns;
use pert_types::config::PipelineConfig;
use pert_types::error::{PertError, PertResult};
use pert_types::state::{CoeffTable, MergedBasis, SignalBasis, SignalFrame};

use crate::fit::fit_phase_pca;
use crate::merge::merge_bases;
use crate::segment::segment_phases;

/// Signals with this many features or fewer skip PCA entirely and pass
/// through raw.
const VOID_FEATURE_LIMIT: usize = 2;

/// Source of raw signal frames, pre-filtered by the dataset's
/// good-sample mask. One loader per dataset split.
pub trait SignalLoader {
    fn load(&self, name: &str) -> PertResult<SignalFrame>;
}

/// Outcome of one signal's trip through the pipeline.
#[derive(Debug, Clone)]
pub enum SignalReport {
    /// Piecewise PCA fitted and merged.
    Fitted {
        name: String,
        n_components: usize,
        energy_captured: f64,
    },
    /// Too few features; raw values carried through unprojected.
    Passthrough { name: String, n_features: usize },
    /// Fit or projection failed; signal absent from the output.
    Failed { name: String, error: String },
}

/// Everything a completed run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub train: CoeffTable,
    pub val: CoeffTable,
    pub test: CoeffTable,
    /// Train-fit basis per surviving signal.
    pub bases: BTreeMap<String, SignalBasis>,
    pub reports: Vec<SignalReport>,
}

struct ProcessedSignal {
    basis: SignalBasis,
    coeffs: [Array2<f64>; 3],
    shot_time: [(Array1<i64>, Array1<f64>); 3],
}

/// The piecewise-PCA pipeline over one configuration.
pub struct PcaPipeline<'a> {
    config: &'a PipelineConfig,
}

impl<'a> PcaPipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        PcaPipeline { config }
    }

    /// Run every configured signal across the three dataset splits.
    pub fn run<L: SignalLoader>(
        &self,
        train: &L,
        val: &L,
        test: &L,
    ) -> PertResult<PipelineOutput> {
        let mut split_signals: [BTreeMap<String, Array2<f64>>; 3] =
            [BTreeMap::new(), BTreeMap::new(), BTreeMap::new()];
        let mut bases: BTreeMap<String, SignalBasis> = BTreeMap::new();
        let mut reports: Vec<SignalReport> = Vec::new();
        let mut columns: Option<[(Array1<i64>, Array1<f64>); 3]> = None;

        for name in &self.config.signals {
            match self.process_signal(name, train, val, test, columns.as_ref()) {
                Ok(processed) => {
                    match &processed.basis {
                        SignalBasis::Pca(merged) => {
                            log::info!(
                                "signal '{name}': {} merged components, energy {:.4}",
                                merged.n_components(),
                                merged.energy_captured
                            );
                            reports.push(SignalReport::Fitted {
                                name: name.clone(),
                                n_components: merged.n_components(),
                                energy_captured: merged.energy_captured,
                            });
                        }
                        SignalBasis::Raw => {
                            log::info!("signal '{name}': raw pass-through");
                            reports.push(SignalReport::Passthrough {
                                name: name.clone(),
                                n_features: processed.coeffs[0].ncols(),
                            });
                        }
                    }
                    let ProcessedSignal {
                        basis,
                        coeffs,
                        shot_time,
                    } = processed;
                    if columns.is_none() {
                        columns = Some(shot_time);
                    }
                    for (split, coeff) in coeffs.into_iter().enumerate() {
                        split_signals[split].insert(name.clone(), coeff);
                    }
                    bases.insert(name.clone(), basis);
                }
                Err(e) => {
                    log::warn!("signal '{name}' skipped: {e}");
                    reports.push(SignalReport::Failed {
                        name: name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // Shared shot/time columns, set once from the raw filtered
        // values of the first surviving signal.
        let columns = columns.unwrap_or_else(|| {
            let empty = || {
                (
                    Array1::from_vec(Vec::new()),
                    Array1::from_vec(Vec::new()),
                )
            };
            [empty(), empty(), empty()]
        });

        let [c_train, c_val, c_test] = columns;
        let [s_train, s_val, s_test] = split_signals;
        let make_table = |signals, (shot, time): (Array1<i64>, Array1<f64>)| {
            let table = CoeffTable { signals, shot, time };
            table.validate_alignment().map(|_| table)
        };

        Ok(PipelineOutput {
            train: make_table(s_train, c_train)?,
            val: make_table(s_val, c_val)?,
            test: make_table(s_test, c_test)?,
            bases,
            reports,
        })
    }

    fn process_signal<L: SignalLoader>(
        &self,
        name: &str,
        train: &L,
        val: &L,
        test: &L,
        expected: Option<&[(Array1<i64>, Array1<f64>); 3]>,
    ) -> PertResult<ProcessedSignal> {
        let mut frames = [train.load(name)?, val.load(name)?, test.load(name)?];
        for frame in &frames {
            frame.validate()?;
        }
        if let Some(exp) = expected {
            for (frame, (shot, _)) in frames.iter().zip(exp) {
                if frame.len() != shot.len() {
                    return Err(PertError::Alignment {
                        what: format!("signal '{name}'"),
                        expected: shot.len(),
                        got: frame.len(),
                    });
                }
            }
        }

        if let Some(window) = self.config.smooth_window {
            for frame in frames.iter_mut() {
                frame.x = median_filter_columns(&frame.x, window);
            }
        }

        let n_features = frames[0].x.ncols();
        for frame in &frames[1..] {
            if frame.x.ncols() != n_features {
                return Err(PertError::LinAlg(format!(
                    "signal '{name}': feature count differs across splits \
                     ({n_features} vs {})",
                    frame.x.ncols()
                )));
            }
        }

        let (basis, coeffs) = if n_features <= VOID_FEATURE_LIMIT {
            // Void basis: carry the raw features through unprojected.
            let coeffs = [
                frames[0].x.clone(),
                frames[1].x.clone(),
                frames[2].x.clone(),
            ];
            (SignalBasis::Raw, coeffs)
        } else {
            let merged = self.fit_piecewise(&frames[0])?;
            let coeffs = [
                merged.transform(&frames[0].x),
                merged.transform(&frames[1].x),
                merged.transform(&frames[2].x),
            ];
            (SignalBasis::Pca(merged), coeffs)
        };

        let [f0, f1, f2] = frames;
        Ok(ProcessedSignal {
            basis,
            coeffs,
            shot_time: [(f0.shot, f0.time), (f1.shot, f1.time), (f2.shot, f2.time)],
        })
    }

    /// Segment the training frame, fit one basis per phase, merge.
    /// Training data only; validation and test never touch the fit.
    fn fit_piecewise(&self, frame: &SignalFrame) -> PertResult<MergedBasis> {
        let cfg = self.config;
        let groups = segment_phases(
            frame.shot.view(),
            frame.time.view(),
            cfg.t_rampup,
            cfg.t_rampdown,
        );

        let rampup = fit_phase_pca(
            &frame.x.select(Axis(0), &groups.rampup),
            cfg.evt,
            cfg.ncomps_max,
        )?;
        let flattop = fit_phase_pca(
            &frame.x.select(Axis(0), &groups.flattop),
            cfg.evt,
            cfg.ncomps_max,
        )?;
        let rampdown = fit_phase_pca(
            &frame.x.select(Axis(0), &groups.rampdown),
            cfg.evt,
            cfg.ncomps_max,
        )?;

        merge_bases(rampup, flattop, rampdown, cfg.ncomps_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory loader backed by a map of frames.
    struct MapLoader {
        frames: BTreeMap<String, SignalFrame>,
    }

    impl SignalLoader for MapLoader {
        fn load(&self, name: &str) -> PertResult<SignalFrame> {
            self.frames
                .get(name)
                .cloned()
                .ok_or_else(|| PertError::ConfigError(format!("no such signal '{name}'")))
        }
    }

    fn pseudo_random(m: usize, n: usize, seed: u64) -> Array2<f64> {
        let mut state = seed.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1);
        Array2::from_shape_fn((m, n), |_| {
            state = state.wrapping_mul(0x9E3779B97F4A7C15).wrapping_add(1);
            ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
        })
    }

    /// Build a split with `n_shots` shots of `per_shot` samples each,
    /// times 0.0, 0.1, ... within each shot.
    fn shot_columns(n_shots: i64, per_shot: usize, first_shot: i64) -> (Array1<i64>, Array1<f64>) {
        let mut shot = Vec::new();
        let mut time = Vec::new();
        for s in 0..n_shots {
            for k in 0..per_shot {
                shot.push(first_shot + s);
                time.push(k as f64 * 0.1);
            }
        }
        (Array1::from_vec(shot), Array1::from_vec(time))
    }

    fn loader_for(first_shot: i64, seed: u64) -> MapLoader {
        let (shot, time) = shot_columns(4, 10, first_shot);
        let n = shot.len();

        // Low-rank wide signal plus small noise.
        let a = pseudo_random(n, 3, seed);
        let b = pseudo_random(3, 8, seed + 1);
        let wide = a.dot(&b) + &pseudo_random(n, 8, seed + 2).mapv(|v| v * 0.001);

        let narrow = pseudo_random(n, 2, seed + 3);

        let mut frames = BTreeMap::new();
        frames.insert(
            "wide".to_string(),
            SignalFrame {
                x: wide,
                shot: shot.clone(),
                time: time.clone(),
            },
        );
        frames.insert(
            "narrow".to_string(),
            SignalFrame {
                x: narrow,
                shot,
                time,
            },
        );
        MapLoader { frames }
    }

    fn config(signals: &[&str]) -> PipelineConfig {
        PipelineConfig {
            signals: signals.iter().map(|s| s.to_string()).collect(),
            evt: 0.99,
            t_rampup: 0.15,
            t_rampdown: 0.15,
            ncomps_max: 6,
            smooth_window: None,
            split: Default::default(),
        }
    }

    #[test]
    fn test_run_aligns_all_splits() {
        let cfg = config(&["narrow", "wide"]);
        let pipeline = PcaPipeline::new(&cfg);
        let out = pipeline
            .run(&loader_for(1, 5), &loader_for(100, 6), &loader_for(200, 7))
            .unwrap();

        for table in [&out.train, &out.val, &out.test] {
            table.validate_alignment().unwrap();
            assert_eq!(table.n_samples(), 40);
            assert_eq!(table.signals.len(), 2);
        }
        assert_eq!(out.reports.len(), 2);
    }

    #[test]
    fn test_void_signal_passes_through_raw() {
        let cfg = config(&["narrow"]);
        let pipeline = PcaPipeline::new(&cfg);
        let train = loader_for(1, 5);
        let expected = train.frames["narrow"].x.clone();
        let out = pipeline
            .run(&train, &loader_for(100, 6), &loader_for(200, 7))
            .unwrap();

        // Same values, same row order, no projection.
        assert_eq!(out.train.signals["narrow"], expected);
        assert!(matches!(out.bases["narrow"], SignalBasis::Raw));
        assert!(matches!(
            out.reports[0],
            SignalReport::Passthrough { n_features: 2, .. }
        ));
    }

    #[test]
    fn test_failed_signal_skipped_not_fatal() {
        let cfg = config(&["missing", "wide"]);
        let pipeline = PcaPipeline::new(&cfg);
        let out = pipeline
            .run(&loader_for(1, 5), &loader_for(100, 6), &loader_for(200, 7))
            .unwrap();

        assert!(!out.train.signals.contains_key("missing"));
        assert!(out.train.signals.contains_key("wide"));
        assert!(matches!(out.reports[0], SignalReport::Failed { .. }));
        assert!(matches!(out.reports[1], SignalReport::Fitted { .. }));
    }

    #[test]
    fn test_basis_fit_from_training_only() {
        let cfg = config(&["wide"]);
        let pipeline = PcaPipeline::new(&cfg);
        let train = loader_for(1, 5);

        let out1 = pipeline
            .run(&train, &loader_for(100, 6), &loader_for(200, 7))
            .unwrap();
        let out2 = pipeline
            .run(&train, &loader_for(100, 60), &loader_for(200, 70))
            .unwrap();

        // Different validation/test data, identical merged basis.
        let (b1, b2) = match (&out1.bases["wide"], &out2.bases["wide"]) {
            (SignalBasis::Pca(a), SignalBasis::Pca(b)) => (a, b),
            _ => panic!("expected PCA bases"),
        };
        assert_eq!(b1.components, b2.components);
        assert_eq!(b1.mean, b2.mean);
    }

    #[test]
    fn test_merged_rank_capped() {
        let cfg = config(&["wide"]);
        let pipeline = PcaPipeline::new(&cfg);
        let out = pipeline
            .run(&loader_for(1, 5), &loader_for(100, 6), &loader_for(200, 7))
            .unwrap();
        match &out.bases["wide"] {
            SignalBasis::Pca(merged) => assert!(merged.n_components() <= cfg.ncomps_max),
            SignalBasis::Raw => panic!("expected PCA basis"),
        }
    }

    #[test]
    fn test_row_count_mismatch_is_alignment_error() {
        let cfg = config(&["wide", "narrow"]);
        let pipeline = PcaPipeline::new(&cfg);

        let train = loader_for(1, 5);
        let val = loader_for(100, 6);
        let test = loader_for(200, 7);

        // Truncate one signal's frame in the val split only.
        let mut bad_val = MapLoader {
            frames: val.frames.clone(),
        };
        let frame = bad_val.frames.get_mut("narrow").unwrap();
        frame.x = frame.x.slice(ndarray::s![0..10, ..]).to_owned();
        frame.shot = frame.shot.slice(ndarray::s![0..10]).to_owned();
        frame.time = frame.time.slice(ndarray::s![0..10]).to_owned();

        let out = pipeline.run(&train, &bad_val, &test).unwrap();
        // "wide" processed first sets the expected row counts; the
        // shortened "narrow" is rejected per signal, not fatally.
        assert!(out.train.signals.contains_key("wide"));
        assert!(!out.train.signals.contains_key("narrow"));
        let failed = out
            .reports
            .iter()
            .find(|r| matches!(r, SignalReport::Failed { .. }))
            .unwrap();
        match failed {
            SignalReport::Failed { name, error } => {
                assert_eq!(name, "narrow");
                assert!(error.contains("alignment") || error.contains("rows"), "{error}");
            }
            _ => unreachable!(),
        }
    }
}
