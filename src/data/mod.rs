//! Series acquisition: the INE client and the reshaping steps that turn its
//! records into the canonical monthly series.

pub mod ine;
pub mod reshape;

pub use ine::{IneClient, SeriesSource};
pub use reshape::{format_and_index, reshape, window_to_recent_year};
