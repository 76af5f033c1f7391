//! Numerical primitives for the PertNet response model.

pub mod eigen;
pub mod filter;
pub mod linalg;
