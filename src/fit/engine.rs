//! Fit, forecast and merge over dated monthly series.
//!
//! The model itself works on plain values; this layer owns the calendar:
//! it refuses irregular series, stamps forecasts with the months that follow
//! the last observation, and checks the merged timeline.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::domain::{CombinedDataset, ForecastPoint, ModelConfig, Series, SeriesPoint, add_months};
use crate::error::{AppError, FitError};
use crate::models::{Sarima, SarimaFit};

/// A fitted model anchored to the last date it was trained on.
#[derive(Debug, Clone)]
pub struct FittedModel {
    pub fit: SarimaFit,
    pub last_date: NaiveDate,
    pub n_obs: usize,
}

/// Fit the configured model to `series`.
pub fn fit(series: &Series, config: &ModelConfig) -> Result<FittedModel, AppError> {
    let model = Sarima::new(config.regular, config.seasonal)?;

    let Some(last_date) = series.last_date() else {
        return Err(FitError::InsufficientData {
            needed: model.min_observations(),
            got: 0,
        }
        .into());
    };
    if let Some((before, after)) = series.first_gap() {
        return Err(FitError::IrregularSeries(format!("{before} is followed by {after}")).into());
    }

    debug!(
        regular = %config.regular,
        seasonal = %config.seasonal,
        n_obs = series.len(),
        needed = model.min_observations(),
        "fitting SARIMA"
    );
    let fit = model.fit(&series.values())?;

    info!(
        iterations = fit.iterations,
        sigma2 = fit.sigma2,
        aic = ?fit.aic,
        "model fitted"
    );

    Ok(FittedModel {
        fit,
        last_date,
        n_obs: series.len(),
    })
}

/// Exactly `horizon` dated forecasts for the months after the training data.
pub fn forecast(model: &FittedModel, horizon: usize) -> Result<Vec<ForecastPoint>, AppError> {
    let values = model.fit.forecast(horizon);

    let mut out = Vec::with_capacity(horizon);
    for (step, predicted_value) in values.into_iter().enumerate() {
        if !predicted_value.is_finite() {
            return Err(FitError::NonFinite(format!("forecast step {}", step + 1)).into());
        }
        let offset = u32::try_from(step + 1)
            .map_err(|_| AppError::Consistency(format!("forecast step {} out of range", step + 1)))?;
        let date = add_months(model.last_date, offset).ok_or_else(|| {
            AppError::Consistency(format!("cannot date forecast step {} after {}", step + 1, model.last_date))
        })?;
        out.push(ForecastPoint { date, predicted_value });
    }
    Ok(out)
}

/// History followed by forecast, plus the forecast-only rows.
///
/// Fails with a consistency error if the forecast does not start strictly
/// after the history or is itself out of order.
pub fn merge(
    historical: &Series,
    forecast: &[ForecastPoint],
) -> Result<(CombinedDataset, Vec<ForecastPoint>), AppError> {
    if let Some(pair) = forecast.windows(2).find(|w| w[0].date >= w[1].date) {
        return Err(AppError::Consistency(format!(
            "forecast dates are not increasing: {} followed by {}",
            pair[0].date, pair[1].date
        )));
    }
    if let (Some(last), Some(first)) = (historical.last_date(), forecast.first()) {
        if first.date <= last {
            return Err(AppError::Consistency(format!(
                "forecast starts at {} but history runs until {last}",
                first.date
            )));
        }
    }

    let mut points: Vec<SeriesPoint> = historical.points().to_vec();
    points.extend(forecast.iter().copied().map(SeriesPoint::from));

    let combined = CombinedDataset {
        points,
        history_len: historical.len(),
    };
    Ok((combined, forecast.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RegularOrder, SeasonalOrder};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};
    use std::f64::consts::PI;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn monthly(start: NaiveDate, values: &[f64]) -> Series {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| SeriesPoint {
                date: add_months(start, i as u32).unwrap(),
                value,
            })
            .collect();
        Series::new(points).unwrap()
    }

    fn seasonal_config(horizon: usize) -> ModelConfig {
        ModelConfig {
            regular: RegularOrder { p: 1, d: 1, q: 1 },
            seasonal: SeasonalOrder {
                p: 1,
                d: 1,
                q: 1,
                period: 12,
            },
            horizon,
        }
    }

    fn synthetic(t: usize) -> f64 {
        100.0 + 0.5 * t as f64 + 10.0 * (2.0 * PI * t as f64 / 12.0).sin()
    }

    #[test]
    fn forecast_has_horizon_consecutive_months() {
        let mut rng = StdRng::seed_from_u64(42);
        let noise = Normal::new(0.0, 0.4).unwrap();
        let values: Vec<f64> = (0..48).map(|t| synthetic(t) + noise.sample(&mut rng)).collect();
        let series = monthly(d(2020, 1), &values);

        let model = fit(&series, &seasonal_config(6)).unwrap();
        let points = forecast(&model, 6).unwrap();

        assert_eq!(points.len(), 6);
        assert_eq!(points[0].date, d(2024, 1));
        for pair in points.windows(2) {
            assert_eq!(add_months(pair[0].date, 1), Some(pair[1].date));
        }
    }

    #[test]
    fn synthetic_series_forecast_within_tolerance() {
        let values: Vec<f64> = (0..36).map(synthetic).collect();
        let series = monthly(d(2021, 1), &values);

        let model = fit(&series, &seasonal_config(12)).unwrap();
        let points = forecast(&model, 12).unwrap();

        assert_eq!(points.len(), 12);
        for (h, p) in points.iter().enumerate() {
            let expected = synthetic(36 + h);
            assert!(
                (p.predicted_value - expected).abs() < 1.0,
                "{}: {} vs {expected}",
                p.date,
                p.predicted_value
            );
        }
    }

    #[test]
    fn three_observations_are_not_enough_for_a_seasonal_model() {
        let series = monthly(d(2024, 1), &[1.0, 2.0, 3.0]);
        let err = fit(&series, &seasonal_config(6)).unwrap_err();
        assert!(matches!(
            err,
            AppError::ModelFit(FitError::InsufficientData { got: 3, .. })
        ));
    }

    #[test]
    fn empty_and_gapped_series_are_rejected() {
        let err = fit(&Series::default(), &seasonal_config(6)).unwrap_err();
        assert!(matches!(
            err,
            AppError::ModelFit(FitError::InsufficientData { got: 0, .. })
        ));

        let gapped = Series::new(vec![
            SeriesPoint { date: d(2024, 1), value: 1.0 },
            SeriesPoint { date: d(2024, 3), value: 2.0 },
        ])
        .unwrap();
        let err = fit(&gapped, &seasonal_config(6)).unwrap_err();
        assert!(matches!(err, AppError::ModelFit(FitError::IrregularSeries(_))));
    }

    #[test]
    fn merge_puts_history_before_forecast() {
        let history = monthly(d(2024, 4), &[1.0, 2.0, 3.0]);
        let future = vec![
            ForecastPoint { date: d(2024, 7), predicted_value: 4.0 },
            ForecastPoint { date: d(2024, 8), predicted_value: 5.0 },
        ];

        let (combined, forecast_only) = merge(&history, &future).unwrap();
        assert_eq!(combined.points.len(), 5);
        assert_eq!(combined.history(), history.points());
        assert_eq!(combined.forecast()[0].date, d(2024, 7));
        assert_eq!(forecast_only, future);
    }

    #[test]
    fn merge_rejects_overlapping_dates() {
        let history = monthly(d(2024, 4), &[1.0, 2.0, 3.0]);
        let overlapping = vec![ForecastPoint { date: d(2024, 6), predicted_value: 9.0 }];
        let err = merge(&history, &overlapping).unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));

        let unordered = vec![
            ForecastPoint { date: d(2024, 9), predicted_value: 1.0 },
            ForecastPoint { date: d(2024, 8), predicted_value: 1.0 },
        ];
        let err = merge(&history, &unordered).unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));
    }
}
