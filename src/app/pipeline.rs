//! The two flows, as plain functions over injected collaborators.
//!
//! - acquire: fetch -> reshape -> window -> format -> persist
//! - forecast: load -> fit -> forecast -> merge -> persist
//!
//! The remote source, the storage root, the retry policy and the reference
//! date are all passed in, so the CLI and the tests drive the same code.

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::info;

use crate::app::retry::RetryPolicy;
use crate::data::{SeriesSource, format_and_index, reshape, window_to_recent_year};
use crate::domain::{AcquisitionConfig, CombinedDataset, ForecastPoint, ModelConfig, PersistScope, Series, SeriesPoint};
use crate::error::{AppError, FitError};
use crate::fit::{FittedModel, fit, forecast, merge};
use crate::io::{Artifact, Storage};

/// Outputs of one acquisition run.
#[derive(Debug, Clone)]
pub struct AcquireOutput {
    /// Full canonical series.
    pub series: Series,
    /// Recent-year window (always computed, presented to the sink).
    pub window: Series,
    pub persisted: PathBuf,
}

/// Outputs of one forecast run.
#[derive(Debug, Clone)]
pub struct ForecastOutput {
    pub history: Series,
    pub model: FittedModel,
    pub forecast: Vec<ForecastPoint>,
    pub combined: CombinedDataset,
    pub combined_path: PathBuf,
    pub forecast_path: PathBuf,
}

/// Fetch the configured series and persist its canonical form.
pub fn run_acquire(
    config: &AcquisitionConfig,
    source: &dyn SeriesSource,
    storage: &Storage,
    retry: &RetryPolicy,
    reference: NaiveDate,
) -> Result<AcquireOutput, AppError> {
    info!(code = %config.series_code, "acquiring series");
    let raw = retry.run("fetch", || source.fetch_raw_series(config))?;
    info!(records = raw.len(), "records fetched");

    let table = reshape(&raw, config.duplicates)?;
    let windowed = window_to_recent_year(&table, reference);
    let series = format_and_index(&table)?;
    let window = format_and_index(&windowed)?;
    info!(
        rows = series.len(),
        window_rows = window.len(),
        first = ?series.first_date(),
        last = ?series.last_date(),
        "series normalized"
    );

    let to_persist = match config.persist {
        PersistScope::Full => &series,
        PersistScope::Window => &window,
    };
    if to_persist.is_empty() {
        return Err(FitError::InsufficientData { needed: 1, got: 0 }.into());
    }
    if let Some((before, after)) = to_persist.first_gap() {
        return Err(AppError::Data(format!(
            "upstream series has a missing month: {before} is followed by {after}"
        )));
    }

    let persisted = storage.write_points(Artifact::Series, to_persist.points())?;
    info!(path = %persisted.display(), scope = ?config.persist, "series persisted");

    Ok(AcquireOutput {
        series,
        window,
        persisted,
    })
}

/// Load the persisted series, forecast it, and persist the results.
pub fn run_forecast(config: &ModelConfig, storage: &Storage, retry: &RetryPolicy) -> Result<ForecastOutput, AppError> {
    let history = retry.run("load", || storage.read_series(Artifact::Series))?;
    info!(rows = history.len(), last = ?history.last_date(), "series loaded");

    let model = fit(&history, config)?;
    let predicted = forecast(&model, config.horizon)?;
    let (combined, forecast_only) = merge(&history, &predicted)?;

    let combined_path = storage.write_points(Artifact::Combined, &combined.points)?;
    let forecast_rows: Vec<SeriesPoint> = forecast_only.iter().copied().map(SeriesPoint::from).collect();
    let forecast_path = storage.write_points(Artifact::ForecastOnly, &forecast_rows)?;
    info!(
        horizon = config.horizon,
        combined = %combined_path.display(),
        forecast = %forecast_path.display(),
        "forecast persisted"
    );

    Ok(ForecastOutput {
        history,
        model,
        forecast: forecast_only,
        combined,
        combined_path,
        forecast_path,
    })
}
