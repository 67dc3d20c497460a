//! Time-series model implementations.
//!
//! Models work on plain `f64` slices; calendar handling lives in `fit`.

pub mod sarima;

pub use sarima::*;
