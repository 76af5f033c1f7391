//! Shared types for the PertNet reduced-order response model.
//!
//! Configuration, error taxonomy, and the data-model records that the
//! pipeline crates exchange.

pub mod config;
pub mod error;
pub mod state;
