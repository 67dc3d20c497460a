//! Persisted artifacts under an explicit storage root.
//!
//! Every artifact is a `date,value` CSV that is fully rewritten on each run.
//! Writes land in a temp file next to the target and are renamed over it, so a
//! reader never sees a half-written file.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::{Series, SeriesPoint};
use crate::error::AppError;

/// The well-known artifacts exchanged between flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    /// Canonical series written by acquisition, read by forecasting.
    Series,
    /// History followed by forecast.
    Combined,
    /// Forecast rows only.
    ForecastOnly,
}

impl Artifact {
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Series => "data_ine.csv",
            Artifact::Combined => "data_real_pred_ine.csv",
            Artifact::ForecastOnly => "data_pred_ine.csv",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    date: String,
    value: f64,
}

/// Create `path` (and parents) if missing and hand it back.
pub fn ensure_dir(path: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(path).map_err(|e| AppError::storage(path, format!("Failed to create directory: {e}")))?;
    Ok(path.to_path_buf())
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, artifact: Artifact) -> PathBuf {
        self.root.join(artifact.file_name())
    }

    /// Overwrite `artifact` with `points`.
    pub fn write_points(&self, artifact: Artifact, points: &[SeriesPoint]) -> Result<PathBuf, AppError> {
        let target = self.path_for(artifact);
        let rows = points.iter().map(|p| Row {
            date: p.date.format("%Y-%m-%d").to_string(),
            value: p.value,
        });
        self.write_atomic(&target, |file| {
            let mut writer = csv::Writer::from_writer(file);
            for row in rows {
                writer.serialize(row).map_err(|e| e.to_string())?;
            }
            writer.flush().map_err(|e| e.to_string())
        })?;
        debug!(path = %target.display(), rows = points.len(), "artifact written");
        Ok(target)
    }

    /// Read and validate a persisted series.
    pub fn read_series(&self, artifact: Artifact) -> Result<Series, AppError> {
        let path = self.path_for(artifact);
        let file = File::open(&path).map_err(|e| AppError::storage(&path, format!("Failed to open: {e}")))?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let headers = reader
            .headers()
            .map_err(|e| AppError::storage(&path, format!("Failed to read header: {e}")))?
            .clone();
        for required in ["date", "value"] {
            if !headers.iter().any(|h| h.trim_start_matches('\u{feff}') == required) {
                return Err(AppError::storage(&path, format!("Missing column `{required}`")));
            }
        }

        let mut points = Vec::new();
        for (idx, result) in reader.deserialize::<Row>().enumerate() {
            // +2: one for the header, one for 1-based line numbers.
            let line = idx + 2;
            let row = result.map_err(|e| AppError::storage(&path, format!("line {line}: {e}")))?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
                .map_err(|e| AppError::storage(&path, format!("line {line}: invalid date '{}': {e}", row.date)))?;
            if !row.value.is_finite() {
                return Err(AppError::storage(&path, format!("line {line}: non-finite value")));
            }
            points.push(SeriesPoint { date, value: row.value });
        }

        Series::new(points).map_err(|e| AppError::storage(&path, e))
    }

    fn write_atomic<F>(&self, target: &Path, fill: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut File) -> Result<(), String>,
    {
        let dir = ensure_dir(&self.root)?;
        let mut tmp = NamedTempFile::new_in(&dir)
            .map_err(|e| AppError::storage(&dir, format!("Failed to create temp file: {e}")))?;

        fill(tmp.as_file_mut()).map_err(|e| AppError::storage(target, format!("Failed to write: {e}")))?;
        tmp.as_file_mut()
            .flush()
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| AppError::storage(target, format!("Failed to flush: {e}")))?;

        tmp.persist(target)
            .map_err(|e| AppError::storage(target, format!("Failed to replace file: {}", e.error)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn sample_points() -> Vec<SeriesPoint> {
        vec![
            SeriesPoint { date: d(2023, 12), value: 111.25 },
            SeriesPoint { date: d(2024, 1), value: 112.5 },
        ]
    }

    #[test]
    fn ensure_dir_creates_nested_path() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let out = ensure_dir(&nested).unwrap();
        assert_eq!(out, nested);
        assert!(nested.is_dir());
        // Idempotent.
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn write_then_read_series() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path().join("ine"));

        let path = storage.write_points(Artifact::Series, &sample_points()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "date,value\n2023-12-01,111.25\n2024-01-01,112.5\n");

        let series = storage.read_series(Artifact::Series).unwrap();
        assert_eq!(series.points(), sample_points().as_slice());
    }

    #[test]
    fn rewrite_replaces_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path());

        storage.write_points(Artifact::Series, &sample_points()).unwrap();
        storage.write_points(Artifact::Series, &sample_points()[..1]).unwrap();
        assert_eq!(storage.read_series(Artifact::Series).unwrap().len(), 1);

        // No temp files left behind.
        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn failed_write_keeps_previous_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path());
        storage.write_points(Artifact::Series, &sample_points()).unwrap();

        let target = storage.path_for(Artifact::Series);
        let err = storage
            .write_atomic(&target, |file| {
                file.write_all(b"date,value\n2024-02-01,1").map_err(|e| e.to_string())?;
                Err("disk full".to_string())
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Storage { .. }));

        let series = storage.read_series(Artifact::Series).unwrap();
        assert_eq!(series.points(), sample_points().as_slice());

        let entries: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_artifact_is_storage_error() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path());
        let err = storage.read_series(Artifact::Series).unwrap_err();
        assert!(matches!(err, AppError::Storage { .. }));
    }

    #[test]
    fn malformed_artifacts_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = Storage::new(tmp.path());
        let path = storage.path_for(Artifact::Series);

        let cases = [
            "value\n1.0\n",
            "date,value\n2024-01-01,abc\n",
            "date,value\n01/01/2024,1.0\n",
            "date,value\n2024-01-15,1.0\n",
            "date,value\n2024-02-01,1.0\n2024-01-01,2.0\n",
        ];
        for text in cases {
            fs::write(&path, text).unwrap();
            let err = storage.read_series(Artifact::Series).unwrap_err();
            assert!(matches!(err, AppError::Storage { .. }), "accepted: {text:?}");
        }
    }
}
