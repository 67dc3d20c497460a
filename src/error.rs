//! Error taxonomy for both flows.
//!
//! Every failure that can end a run maps to one `AppError` variant, and each
//! variant maps to a process exit code so the scheduler driving `ipc` can tell
//! a bad config apart from a flaky upstream.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration document missing, unparsable, or invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Remote call failed. `status` is `None` when no HTTP response arrived.
    #[error("fetch failed{}: {message}", fmt_status(.status))]
    Fetch { status: Option<u16>, message: String },

    /// Read or write failure on a persisted artifact.
    #[error("storage error at '{}': {message}", .path.display())]
    Storage { path: PathBuf, message: String },

    /// Upstream delivered records that cannot form a monthly series.
    #[error("data error: {0}")]
    Data(String),

    /// Model could not be fitted (or the fitted model cannot forecast).
    #[error("model fit failed: {0}")]
    ModelFit(#[from] FitError),

    /// History and forecast disagree on the timeline.
    #[error("consistency error: {0}")]
    Consistency(String),
}

/// Reasons a SARIMA fit is refused or fails.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FitError {
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("invalid model order: {0}")]
    InvalidOrder(String),

    #[error("series is not a gap-free monthly sequence: {0}")]
    IrregularSeries(String),

    #[error("optimizer did not converge after {iterations} iterations")]
    NotConverged { iterations: usize },

    #[error("non-finite value: {0}")]
    NonFinite(String),
}

impl AppError {
    pub fn storage(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn fetch(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Fetch {
            status,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Data(_) | AppError::Consistency(_) => 3,
            AppError::Fetch { .. } => 4,
            AppError::Storage { .. } => 5,
            AppError::ModelFit(_) => 6,
        }
    }

    /// Only I/O failures are worth another attempt; everything else is
    /// deterministic given the same inputs.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Fetch { .. } | AppError::Storage { .. })
    }

    /// Short machine-friendly name of the error kind (used in run logs).
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Config(_) => "ConfigError",
            AppError::Fetch { .. } => "FetchError",
            AppError::Storage { .. } => "StorageError",
            AppError::Data(_) => "DataError",
            AppError::ModelFit(_) => "ModelFitError",
            AppError::Consistency(_) => "ConsistencyError",
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {code}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_message_includes_status() {
        let err = AppError::fetch(Some(500), "Incorrect request");
        assert_eq!(err.to_string(), "fetch failed with status 500: Incorrect request");

        let err = AppError::fetch(None, "connection refused");
        assert_eq!(err.to_string(), "fetch failed: connection refused");
    }

    #[test]
    fn fit_errors_wrap_into_model_fit() {
        let err: AppError = FitError::InsufficientData { needed: 31, got: 3 }.into();
        assert_eq!(
            err.to_string(),
            "model fit failed: insufficient data: need at least 31 observations, got 3"
        );
        assert_eq!(err.exit_code(), 6);
        assert_eq!(err.kind(), "ModelFitError");
    }

    #[test]
    fn only_io_errors_are_transient() {
        assert!(AppError::fetch(Some(503), "x").is_transient());
        assert!(AppError::storage("ine/data_ine.csv", "missing").is_transient());
        assert!(!AppError::Config("x".into()).is_transient());
        assert!(!AppError::from(FitError::NotConverged { iterations: 10 }).is_transient());
        assert!(!AppError::Consistency("x".into()).is_transient());
    }
}
