// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Config
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::PertResult;

/// Top-level pipeline configuration.
///
/// Immutable after load; components borrow it rather than mutating a
/// shared settings object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Signals to compress, by name.
    pub signals: Vec<String>,
    /// Target cumulative explained-variance ratio for phase fits.
    #[serde(default = "default_evt")]
    pub evt: f64,
    /// Rampup phase duration threshold [s].
    #[serde(default = "default_t_ramp")]
    pub t_rampup: f64,
    /// Rampdown phase duration threshold [s].
    #[serde(default = "default_t_ramp")]
    pub t_rampdown: f64,
    /// Hard cap on retained components, per phase and after merging.
    #[serde(default = "default_ncomps_max")]
    pub ncomps_max: usize,
    /// Sliding-median window applied per feature column before fitting.
    /// None disables smoothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smooth_window: Option<usize>,
    /// Train/validation/test shot fractions.
    #[serde(default)]
    pub split: SplitFractions,
}

/// Shot-level split fractions. Nominally sum to 1.0 (not enforced).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplitFractions {
    pub ftrain: f64,
    pub fval: f64,
    pub ftest: f64,
}

impl Default for SplitFractions {
    fn default() -> Self {
        SplitFractions {
            ftrain: 0.8,
            fval: 0.1,
            ftest: 0.1,
        }
    }
}

fn default_evt() -> f64 {
    0.99
}
fn default_t_ramp() -> f64 {
    0.1
}
fn default_ncomps_max() -> usize {
    20
}

impl PipelineConfig {
    /// Load from a JSON file.
    pub fn from_file(path: &str) -> PertResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }
}
