// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Piecewise PCA Benchmark
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────

use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use pert_pca::fit::fit_phase_pca;
use pert_pca::merge::merge_bases;
use pert_pca::segment::segment_phases;
use std::hint::black_box;

fn synthetic_signal(n_shots: usize, per_shot: usize, n_features: usize) -> (Array2<f64>, Array1<i64>, Array1<f64>) {
    let n = n_shots * per_shot;
    let mut state = 0x9E3779B97F4A7C15u64;
    let mut next = move || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
    };

    let rank = 4;
    let a = Array2::from_shape_fn((n, rank), |_| next());
    let b = Array2::from_shape_fn((rank, n_features), |_| next());
    let x = a.dot(&b);

    let mut shot = Vec::with_capacity(n);
    let mut time = Vec::with_capacity(n);
    for s in 0..n_shots {
        for k in 0..per_shot {
            shot.push(s as i64);
            time.push(k as f64 * 0.02);
        }
    }
    (x, Array1::from_vec(shot), Array1::from_vec(time))
}

fn bench_segment_fit_merge(c: &mut Criterion) {
    let (x, shot, time) = synthetic_signal(8, 50, 64);

    c.bench_function("segment_fit_merge_8x50x64", |b| {
        b.iter(|| {
            let groups = segment_phases(shot.view(), time.view(), 0.1, 0.1);
            let up = fit_phase_pca(
                &x.select(ndarray::Axis(0), &groups.rampup),
                0.99,
                20,
            )
            .unwrap();
            let flat = fit_phase_pca(
                &x.select(ndarray::Axis(0), &groups.flattop),
                0.99,
                20,
            )
            .unwrap();
            let down = fit_phase_pca(
                &x.select(ndarray::Axis(0), &groups.rampdown),
                0.99,
                20,
            )
            .unwrap();
            let merged = merge_bases(up, flat, down, 20).unwrap();
            black_box(merged.transform(&x))
        })
    });
}

criterion_group!(benches, bench_segment_fit_merge);
criterion_main!(benches);
