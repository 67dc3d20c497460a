//! Retry with exponential backoff for I/O-bound steps.
//!
//! Only fetch and storage reads are wrapped. Errors that are not transient
//! (bad data, bad config, model failures) are returned on the first attempt.

use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// `attempts` tries with no sleeping in between.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Result<T, AppError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;

        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    warn!(
                        step = label,
                        attempt,
                        max_attempts = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    if !backoff.is_zero() {
                        thread::sleep(backoff);
                    }
                    backoff = (backoff * 2).min(self.max_backoff);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
