//! Normalization of upstream records into the canonical monthly series.
//!
//! The acquisition flow runs these in order:
//!
//! 1. [`reshape`]: group raw records by (year, month), applying the duplicate policy
//! 2. [`window_to_recent_year`]: keep the trailing window relative to a reference date
//! 3. [`format_and_index`]: turn (year, month) into a first-of-month date key
//!
//! All three are pure; the reference date is passed in rather than read from
//! the clock.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use tracing::warn;

use crate::domain::{
    DuplicatePolicy, MonthlyTable, PeriodValue, RawObservation, Series, SeriesPoint, month_start,
};
use crate::error::AppError;

/// Group raw observations into one row per (year, month), ascending.
pub fn reshape(raw: &[RawObservation], policy: DuplicatePolicy) -> Result<MonthlyTable, AppError> {
    let mut grouped: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    let mut duplicates = 0usize;

    for obs in raw {
        if !(1..=12).contains(&obs.month) {
            return Err(AppError::Data(format!(
                "record for year {} has period {} (expected a month 1..=12)",
                obs.year, obs.month
            )));
        }
        if !obs.value.is_finite() {
            return Err(AppError::Data(format!(
                "record {}-{:02} has a non-finite value",
                obs.year, obs.month
            )));
        }

        if grouped.insert((obs.year, obs.month), obs.value).is_some() {
            if policy == DuplicatePolicy::Reject {
                return Err(AppError::Data(format!(
                    "duplicate record for {}-{:02}",
                    obs.year, obs.month
                )));
            }
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        warn!(duplicates, "duplicate (year, month) records; kept the last value of each");
    }

    let rows = grouped
        .into_iter()
        .map(|((year, month), value)| PeriodValue { year, month, value })
        .collect();
    Ok(MonthlyTable { rows })
}

/// Keep rows whose year is at least `reference.year() - 1`.
pub fn window_to_recent_year(table: &MonthlyTable, reference: NaiveDate) -> MonthlyTable {
    let first_year = reference.year() - 1;
    MonthlyTable {
        rows: table
            .rows
            .iter()
            .copied()
            .filter(|r| r.year >= first_year)
            .collect(),
    }
}

/// Replace the (year, month) pair with a first-of-month date key.
pub fn format_and_index(table: &MonthlyTable) -> Result<Series, AppError> {
    let points = table
        .rows
        .iter()
        .map(|r| {
            month_start(r.year, r.month)
                .map(|date| SeriesPoint { date, value: r.value })
                .ok_or_else(|| AppError::Data(format!("invalid period {}-{:02}", r.year, r.month)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Series::new(points).map_err(AppError::Data)
}

/// Inverse of [`format_and_index`]; lets a canonical series be fed back through
/// the pipeline.
pub fn to_raw(series: &Series) -> Vec<RawObservation> {
    series
        .points()
        .iter()
        .map(|p| RawObservation {
            year: p.date.year(),
            month: p.date.month(),
            value: p.value,
        })
        .collect()
}
