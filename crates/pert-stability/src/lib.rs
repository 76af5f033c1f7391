//! Linear-stability diagnostics for the response model.

pub mod growth_rate;
