// ─────────────────────────────────────────────────────────────────────
// PertNet RS — Machine-Learning Support
// Reduced-order tokamak plasma response model
// License: MIT
// ─────────────────────────────────────────────────────────────────────
//! Training-side helpers for the coefficient pipeline: feature
//! standardization, NaN/time filtering, shot holdback, and a baseline
//! MLP predictor.

pub mod mlp;
pub mod preprocess;
