// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Phase Segmentation
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Partition a signal's sample indices into rampup, flattop and
//! rampdown phase groups from shot and time columns.

use std::collections::BTreeMap;

use ndarray::ArrayView1;

/// Sample index groups for the three discharge phases.
///
/// `rampup` and `rampdown` may overlap when a shot is shorter than
/// `t_rampup + t_rampdown`; `flattop` is the ascending complement of
/// their union, so the three groups always cover `[0, N)` as sets.
#[derive(Debug, Clone)]
pub struct PhaseGroups {
    pub rampup: Vec<usize>,
    pub flattop: Vec<usize>,
    pub rampdown: Vec<usize>,
}

impl PhaseGroups {
    /// Total index coverage counting overlaps once.
    pub fn coverage(&self) -> usize {
        let mut seen: Vec<usize> = self
            .rampup
            .iter()
            .chain(&self.flattop)
            .chain(&self.rampdown)
            .copied()
            .collect();
        seen.sort_unstable();
        seen.dedup();
        seen.len()
    }
}

/// Segment samples into phase groups.
///
/// Rampup membership is `time < t_rampup` evaluated globally, not per
/// shot; shots that do not start near time zero contribute nothing to
/// the rampup group. Rampdown is per shot: samples within the final
/// `t_rampdown` seconds of that shot's own end time.
pub fn segment_phases(
    shot: ArrayView1<i64>,
    time: ArrayView1<f64>,
    t_rampup: f64,
    t_rampdown: f64,
) -> PhaseGroups {
    let n = time.len();

    let rampup: Vec<usize> = (0..n).filter(|&i| time[i] < t_rampup).collect();

    // Group sample indices by shot, then take each shot's tail.
    let mut by_shot: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for i in 0..n {
        by_shot.entry(shot[i]).or_default().push(i);
    }

    let mut rampdown: Vec<usize> = Vec::new();
    for indices in by_shot.values() {
        let tend = indices
            .iter()
            .map(|&i| time[i])
            .fold(f64::NEG_INFINITY, f64::max);
        for &i in indices {
            if time[i] > tend - t_rampdown {
                rampdown.push(i);
            }
        }
    }
    rampdown.sort_unstable();

    let mut in_edge = vec![false; n];
    for &i in rampup.iter().chain(&rampdown) {
        in_edge[i] = true;
    }
    let flattop: Vec<usize> = (0..n).filter(|&i| !in_edge[i]).collect();

    PhaseGroups {
        rampup,
        flattop,
        rampdown,
    }
}
