//! Presentation of run results.
//!
//! Each flow ends by handing a labelled table to one or more sinks. The sinks
//! decide how to show it: an aligned terminal table, a JSON file, or both.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::domain::{ForecastPoint, Series};
use crate::error::AppError;
use crate::io::ensure_dir;

pub mod format;

pub use format::*;

/// Key of the table published after acquisition.
pub const WINDOW_KEY: &str = "muestra-tabla";
/// Key of the table published after forecasting.
pub const FORECAST_KEY: &str = "prediccion-tabla";

/// A labelled record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableArtifact {
    pub key: String,
    pub description: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TableArtifact {
    /// Rows as column-name → value maps.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// The recent-year window shown after acquisition.
    pub fn window(series: &Series) -> Self {
        Self {
            key: WINDOW_KEY.to_string(),
            description: "Recent-year window of the series".to_string(),
            columns: vec!["date".to_string(), "value".to_string()],
            rows: series
                .points()
                .iter()
                .map(|p| vec![json!(p.date.to_string()), json!(p.value)])
                .collect(),
        }
    }

    /// Forecast rows shown after the forecast flow.
    pub fn forecast(points: &[ForecastPoint]) -> Self {
        Self {
            key: FORECAST_KEY.to_string(),
            description: "Forecast for the configured horizon".to_string(),
            columns: vec!["date".to_string(), "predicted_value".to_string()],
            rows: points
                .iter()
                .map(|p| vec![json!(p.date.to_string()), json!(p.predicted_value)])
                .collect(),
        }
    }
}

/// Something that accepts a labelled table.
pub trait ReportSink {
    fn publish(&self, artifact: &TableArtifact) -> Result<(), AppError>;
}

/// Prints tables to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSink;

impl ReportSink for TerminalSink {
    fn publish(&self, artifact: &TableArtifact) -> Result<(), AppError> {
        println!("{}", format_artifact(artifact));
        Ok(())
    }
}

/// Writes `<dir>/<key>.json` as pretty JSON.
#[derive(Debug, Clone)]
pub struct JsonArtifactSink {
    dir: PathBuf,
}

impl JsonArtifactSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl ReportSink for JsonArtifactSink {
    fn publish(&self, artifact: &TableArtifact) -> Result<(), AppError> {
        ensure_dir(&self.dir)?;
        let path = self.path_for(&artifact.key);
        let body = json!({
            "key": artifact.key,
            "description": artifact.description,
            "records": artifact.records(),
        });
        let text = serde_json::to_string_pretty(&body)
            .map_err(|e| AppError::storage(&path, format!("Failed to encode artifact: {e}")))?;
        fs::write(&path, text).map_err(|e| AppError::storage(&path, format!("Failed to write: {e}")))?;
        info!(key = %artifact.key, path = %path.display(), "artifact published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesPoint;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn window_records_are_keyed_by_column() {
        let series = Series::new(vec![
            SeriesPoint { date: d(2024, 1), value: 112.5 },
            SeriesPoint { date: d(2024, 2), value: 113.0 },
        ])
        .unwrap();
        let artifact = TableArtifact::window(&series);
        assert_eq!(artifact.key, WINDOW_KEY);

        let records = artifact.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["date"], json!("2024-01-01"));
        assert_eq!(records[1]["value"], json!(113.0));
    }

    #[test]
    fn json_sink_writes_one_file_per_key() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = JsonArtifactSink::new(tmp.path().join("artifacts"));
        let artifact = TableArtifact::forecast(&[ForecastPoint {
            date: d(2024, 7),
            predicted_value: 114.25,
        }]);

        sink.publish(&artifact).unwrap();

        let text = fs::read_to_string(sink.path_for(FORECAST_KEY)).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["key"], json!(FORECAST_KEY));
        assert_eq!(doc["records"][0]["predicted_value"], json!(114.25));
    }
}
