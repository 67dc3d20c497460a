//! Numerical building blocks: SVD least squares and bounded simplex search.

pub mod ols;
pub mod optim;

pub use ols::*;
pub use optim::*;
