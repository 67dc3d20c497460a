//! Shared domain types.
//!
//! These types are intentionally kept small and serializable so they can be:
//!
//! - passed stage to stage inside one flow
//! - persisted as CSV between the acquisition and forecast flows
//! - handed to the presentation sinks

use std::fmt;
use std::path::PathBuf;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// One record as delivered by the upstream statistics API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawObservation {
    pub year: i32,
    /// Reporting period; monthly series use 1..=12.
    pub month: u32,
    pub value: f64,
}

/// A (year, month) row after grouping, before the date index is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodValue {
    pub year: i32,
    pub month: u32,
    pub value: f64,
}

/// Reshaped upstream data: one row per (year, month), ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyTable {
    pub rows: Vec<PeriodValue>,
}

impl MonthlyTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One canonical observation: first day of the month and its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Canonical monthly series.
///
/// Invariants (checked by [`Series::new`]):
/// - every date is the first day of its month
/// - dates are strictly increasing (so no duplicates)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(points: Vec<SeriesPoint>) -> Result<Self, String> {
        for (idx, p) in points.iter().enumerate() {
            if p.date.day() != 1 {
                return Err(format!("date {} (row {idx}) is not the first of a month", p.date));
            }
            if idx > 0 && points[idx - 1].date >= p.date {
                return Err(format!(
                    "dates are not strictly increasing: {} followed by {}",
                    points[idx - 1].date,
                    p.date
                ));
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// First pair of neighbours that are not consecutive months, if any.
    pub fn first_gap(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.points
            .windows(2)
            .find(|w| add_months(w[0].date, 1) != Some(w[1].date))
            .map(|w| (w[0].date, w[1].date))
    }
}

/// One forecast step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_value: f64,
}

impl From<ForecastPoint> for SeriesPoint {
    fn from(p: ForecastPoint) -> Self {
        SeriesPoint {
            date: p.date,
            value: p.predicted_value,
        }
    }
}

/// History followed by forecast, one continuous timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedDataset {
    pub points: Vec<SeriesPoint>,
    /// Number of leading rows that are observed history.
    pub history_len: usize,
}

impl CombinedDataset {
    pub fn history(&self) -> &[SeriesPoint] {
        &self.points[..self.history_len]
    }

    pub fn forecast(&self) -> &[SeriesPoint] {
        &self.points[self.history_len..]
    }
}

/// Non-seasonal `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegularOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

/// Seasonal `(P, D, Q, s)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl SeasonalOrder {
    /// True when any seasonal term is requested.
    pub fn is_active(&self) -> bool {
        self.p + self.d + self.q > 0
    }
}

impl fmt::Display for RegularOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl fmt::Display for SeasonalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})[{}]", self.p, self.d, self.q, self.period)
    }
}

/// Model parameters from the `MODEL` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelConfig {
    pub regular: RegularOrder,
    pub seasonal: SeasonalOrder,
    /// Number of months to forecast (always > 0).
    pub horizon: usize,
}

/// What to do when upstream repeats a (year, month) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the value seen last in upstream order.
    #[default]
    KeepLast,
    /// Fail the acquisition with a data error.
    Reject,
}

/// Which part of the acquired series is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistScope {
    /// Whole canonical series (enough history for seasonal models).
    #[default]
    Full,
    /// Only the recent-year window that is also presented.
    Window,
}

/// Acquisition parameters from the `DATA` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionConfig {
    pub endpoint_base: String,
    pub series_code: String,
    pub duplicates: DuplicatePolicy,
    pub persist: PersistScope,
}

/// Storage parameters from the optional `STORAGE` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("ine"),
        }
    }
}

/// First day of `(year, month)`, or `None` if the pair is not a valid month.
pub fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// `date` shifted forward by `n` calendar months.
pub fn add_months(date: NaiveDate, n: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn series_rejects_unordered_and_mid_month_dates() {
        let unordered = vec![
            SeriesPoint { date: d(2024, 2), value: 1.0 },
            SeriesPoint { date: d(2024, 1), value: 2.0 },
        ];
        assert!(Series::new(unordered).is_err());

        let duplicate = vec![
            SeriesPoint { date: d(2024, 1), value: 1.0 },
            SeriesPoint { date: d(2024, 1), value: 2.0 },
        ];
        assert!(Series::new(duplicate).is_err());

        let mid_month = vec![SeriesPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            value: 1.0,
        }];
        assert!(Series::new(mid_month).is_err());
    }

    #[test]
    fn first_gap_finds_missing_month() {
        let series = Series::new(vec![
            SeriesPoint { date: d(2023, 11), value: 1.0 },
            SeriesPoint { date: d(2023, 12), value: 1.0 },
            SeriesPoint { date: d(2024, 2), value: 1.0 },
        ])
        .unwrap();
        assert_eq!(series.first_gap(), Some((d(2023, 12), d(2024, 2))));
    }

    #[test]
    fn add_months_rolls_over_year() {
        assert_eq!(add_months(d(2024, 11), 3), Some(d(2025, 2)));
        assert_eq!(month_start(2024, 13), None);
    }
}
