//! INE (Spanish statistics office) API integration.
//!
//! The series endpoint is `{path}/{code}?nult=N`, where `nult` asks for the
//! last N periods. The body looks like:
//!
//! ```text
//! { "COD": "IPC251856", "Nombre": "...", "Data": [ { "Anyo": 2024, "FK_Periodo": 3, "Valor": 114.2 }, ... ] }
//! ```

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{AcquisitionConfig, RawObservation};
use crate::error::AppError;

/// Number of most recent periods requested from the API.
const LAST_PERIODS: usize = 999;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can deliver the raw upstream records for a series.
///
/// The HTTP client is the production implementation; tests plug in fakes.
pub trait SeriesSource {
    fn fetch_raw_series(&self, config: &AcquisitionConfig) -> Result<Vec<RawObservation>, AppError>;
}

pub struct IneClient {
    client: Client,
}

impl IneClient {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ipc-forecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::fetch(None, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl SeriesSource for IneClient {
    fn fetch_raw_series(&self, config: &AcquisitionConfig) -> Result<Vec<RawObservation>, AppError> {
        let url = series_url(config);
        debug!(%url, "requesting series");

        let resp = self
            .client
            .get(&url)
            .query(&[("nult", LAST_PERIODS.to_string())])
            .send()
            .map_err(|e| AppError::fetch(e.status().map(|s| s.as_u16()), format!("INE request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::fetch(
                Some(status.as_u16()),
                format!("INE request for series {} was not successful", config.series_code),
            ));
        }

        let text = resp
            .text()
            .map_err(|e| AppError::fetch(Some(status.as_u16()), format!("Failed to read INE response: {e}")))?;

        parse_series_body(&text)
    }
}

/// `{path}/{code}` with any trailing slash on the base removed.
pub fn series_url(config: &AcquisitionConfig) -> String {
    format!(
        "{}/{}",
        config.endpoint_base.trim_end_matches('/'),
        config.series_code
    )
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(rename = "Data", default)]
    data: Vec<DataRecord>,
}

#[derive(Debug, Deserialize)]
struct DataRecord {
    #[serde(rename = "Anyo")]
    year: i32,
    #[serde(rename = "FK_Periodo")]
    period: u32,
    #[serde(rename = "Valor")]
    value: Option<f64>,
}

fn observations_from_response(body: SeriesResponse) -> Vec<RawObservation> {
    let total = body.data.len();
    let out: Vec<RawObservation> = body
        .data
        .into_iter()
        .filter_map(|r| {
            let value = r.value.filter(|v| v.is_finite())?;
            Some(RawObservation {
                year: r.year,
                month: r.period,
                value,
            })
        })
        .collect();

    let skipped = total - out.len();
    if skipped > 0 {
        warn!(skipped, "dropped records without a numeric value");
    }
    out
}

/// Parse a response body without going through HTTP (used by tests and replays).
pub fn parse_series_body(text: &str) -> Result<Vec<RawObservation>, AppError> {
    let body: SeriesResponse = serde_json::from_str(text)
        .map_err(|e| AppError::Data(format!("Failed to parse INE response: {e}")))?;
    Ok(observations_from_response(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DuplicatePolicy, PersistScope};

    #[test]
    fn url_joins_base_and_code() {
        let config = AcquisitionConfig {
            endpoint_base: "https://servicios.ine.es/wstempus/js/ES/DATOS_SERIE/".to_string(),
            series_code: "IPC251856".to_string(),
            duplicates: DuplicatePolicy::KeepLast,
            persist: PersistScope::Full,
        };
        assert_eq!(
            series_url(&config),
            "https://servicios.ine.es/wstempus/js/ES/DATOS_SERIE/IPC251856"
        );
    }

    #[test]
    fn parses_body_and_skips_missing_values() {
        let body = r#"{
            "COD": "IPC251856",
            "Nombre": "Total Nacional. Índice general. Índice.",
            "Data": [
                { "Fecha": 1706742000000, "FK_TipoDato": 1, "FK_Periodo": 2, "Anyo": 2024, "Valor": 113.9, "Secreto": false },
                { "Fecha": 1704063600000, "FK_TipoDato": 1, "FK_Periodo": 1, "Anyo": 2024, "Valor": 113.5, "Secreto": false },
                { "Fecha": 1701385200000, "FK_TipoDato": 1, "FK_Periodo": 12, "Anyo": 2023, "Valor": null, "Secreto": true }
            ]
        }"#;
        let obs = parse_series_body(body).unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(
            obs[0],
            RawObservation {
                year: 2024,
                month: 2,
                value: 113.9
            }
        );
    }

    #[test]
    fn malformed_body_is_a_data_error() {
        let err = parse_series_body(r#"{ "Data": [ { "Anyo": "x" } ] }"#).unwrap_err();
        assert!(matches!(err, AppError::Data(_)));
    }
}
