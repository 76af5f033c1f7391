//! Piecewise PCA compression of tokamak diagnostic signals.
//!
//! Phase segmentation, per-phase PCA with adaptive rank, basis merging,
//! per-signal pipeline orchestration, shot-identity splitting, and NPZ
//! persistence of the resulting coefficient tables.

pub mod fit;
pub mod merge;
pub mod persist;
pub mod pipeline;
pub mod segment;
pub mod split;
