//! Forecast engine.
//!
//! Responsibilities:
//!
//! - validate that the loaded series can be modelled (non-empty, gap-free)
//! - fit the configured SARIMA model
//! - turn point forecasts into dated rows
//! - merge history and forecast into one timeline

pub mod engine;

pub use engine::*;
