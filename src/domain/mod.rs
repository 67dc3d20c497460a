//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - upstream records and the reshaped monthly table (`RawObservation`, `MonthlyTable`)
//! - the canonical persisted series (`Series`, `SeriesPoint`)
//! - forecast outputs (`ForecastPoint`, `CombinedDataset`)
//! - typed configuration bundles (`AcquisitionConfig`, `ModelConfig`, `StorageConfig`)

pub mod types;

pub use types::*;
