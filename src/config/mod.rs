//! Configuration document loading.
//!
//! The document is JSON with two required top-level sections and one optional:
//!
//! ```text
//! {
//!   "DATA":    { "path": "...", "code": "...", "duplicates": "keep-last", "persist": "full" },
//!   "MODEL":   { "regular": [p, d, q], "seasonal": [P, D, Q, s], "horizon": 12 },
//!   "STORAGE": { "root": "ine" }
//! }
//! ```
//!
//! Each section is validated on its own, so a caller asking for `DATA` is not
//! failed by a typo in `MODEL`. Every problem surfaces as `AppError::Config`
//! naming the offending key.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{
    AcquisitionConfig, DuplicatePolicy, ModelConfig, PersistScope, RegularOrder, SeasonalOrder, StorageConfig,
};
use crate::error::AppError;

/// Default location of the configuration document, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.json";

/// Largest accepted entry in an order tuple (other than the period).
const MAX_ORDER: usize = 24;
/// Largest accepted seasonal period.
const MAX_PERIOD: usize = 366;
/// Largest accepted forecast horizon, in months.
const MAX_HORIZON: i64 = 1200;

const SECTION_DATA: &str = "DATA";
const SECTION_MODEL: &str = "MODEL";
const SECTION_STORAGE: &str = "STORAGE";

#[derive(Debug, Deserialize)]
struct DataSection {
    path: String,
    code: String,
    #[serde(default)]
    duplicates: Option<DuplicatePolicy>,
    #[serde(default)]
    persist: Option<PersistScope>,
}

#[derive(Debug, Deserialize)]
struct ModelSection {
    regular: Vec<i64>,
    seasonal: Vec<i64>,
    horizon: i64,
}

#[derive(Debug, Deserialize)]
struct StorageSection {
    #[serde(default)]
    root: Option<PathBuf>,
}

/// Load the `DATA` section from a document on disk.
pub fn load_acquisition_config(path: &Path) -> Result<AcquisitionConfig, AppError> {
    parse_acquisition_config(&read_document(path)?)
}

/// Load the `MODEL` section from a document on disk.
pub fn load_model_config(path: &Path) -> Result<ModelConfig, AppError> {
    parse_model_config(&read_document(path)?)
}

/// Load the optional `STORAGE` section (defaults when absent).
pub fn load_storage_config(path: &Path) -> Result<StorageConfig, AppError> {
    parse_storage_config(&read_document(path)?)
}

pub fn parse_acquisition_config(text: &str) -> Result<AcquisitionConfig, AppError> {
    let doc = parse_document(text)?;
    let raw: DataSection = required_section(&doc, SECTION_DATA)?;

    let endpoint_base = raw.path;
    if endpoint_base.trim().trim_end_matches('/').is_empty() {
        return Err(AppError::Config("`DATA.path` must not be empty".to_string()));
    }
    let series_code = raw.code;
    if series_code.trim().is_empty() {
        return Err(AppError::Config("`DATA.code` must not be empty".to_string()));
    }

    Ok(AcquisitionConfig {
        endpoint_base,
        series_code,
        duplicates: raw.duplicates.unwrap_or_default(),
        persist: raw.persist.unwrap_or_default(),
    })
}

pub fn parse_model_config(text: &str) -> Result<ModelConfig, AppError> {
    let doc = parse_document(text)?;
    let raw: ModelSection = required_section(&doc, SECTION_MODEL)?;

    let [p, d, q] = order_tuple::<3>(&raw.regular, "MODEL.regular")?;
    let [sp, sd, sq, period] = order_tuple::<4>(&raw.seasonal, "MODEL.seasonal")?;

    if raw.horizon <= 0 {
        return Err(AppError::Config(format!(
            "`MODEL.horizon` must be a positive integer, got {}",
            raw.horizon
        )));
    }
    if raw.horizon > MAX_HORIZON {
        return Err(AppError::Config(format!(
            "`MODEL.horizon` must be at most {MAX_HORIZON}, got {}",
            raw.horizon
        )));
    }
    if let Some(v) = [p, d, q, sp, sd, sq].into_iter().find(|&v| v > MAX_ORDER) {
        return Err(AppError::Config(format!(
            "`MODEL` order entries must be at most {MAX_ORDER}, got {v}"
        )));
    }
    if period > MAX_PERIOD {
        return Err(AppError::Config(format!(
            "`MODEL.seasonal` period must be at most {MAX_PERIOD}, got {period}"
        )));
    }

    let seasonal = SeasonalOrder {
        p: sp,
        d: sd,
        q: sq,
        period,
    };
    if seasonal.is_active() && period < 2 {
        return Err(AppError::Config(format!(
            "`MODEL.seasonal` has seasonal terms but period s={period}; s must be >= 2"
        )));
    }

    Ok(ModelConfig {
        regular: RegularOrder { p, d, q },
        seasonal,
        horizon: raw.horizon as usize,
    })
}

pub fn parse_storage_config(text: &str) -> Result<StorageConfig, AppError> {
    let doc = parse_document(text)?;
    let Some(section) = doc.get(SECTION_STORAGE) else {
        return Ok(StorageConfig::default());
    };
    let raw: StorageSection = section_from_value(section, SECTION_STORAGE)?;
    Ok(raw
        .root
        .map(|root| StorageConfig { root })
        .unwrap_or_default())
}

fn read_document(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read config '{}': {e}", path.display())))
}

fn parse_document(text: &str) -> Result<Value, AppError> {
    let doc: Value =
        serde_json::from_str(text).map_err(|e| AppError::Config(format!("Invalid config JSON: {e}")))?;
    if !doc.is_object() {
        return Err(AppError::Config("Config document must be a JSON object".to_string()));
    }
    Ok(doc)
}

fn required_section<T: DeserializeOwned>(doc: &Value, name: &str) -> Result<T, AppError> {
    let section = doc
        .get(name)
        .ok_or_else(|| AppError::Config(format!("Missing section `{name}`")))?;
    section_from_value(section, name)
}

fn section_from_value<T: DeserializeOwned>(section: &Value, name: &str) -> Result<T, AppError> {
    T::deserialize(section).map_err(|e| AppError::Config(format!("Invalid section `{name}`: {e}")))
}

fn order_tuple<const N: usize>(values: &[i64], key: &str) -> Result<[usize; N], AppError> {
    if values.len() != N {
        return Err(AppError::Config(format!(
            "`{key}` must have exactly {N} entries, got {}",
            values.len()
        )));
    }
    let mut out = [0usize; N];
    for (slot, &v) in out.iter_mut().zip(values) {
        *slot = usize::try_from(v)
            .map_err(|_| AppError::Config(format!("`{key}` entries must be non-negative, got {v}")))?;
    }
    Ok(out)
}
