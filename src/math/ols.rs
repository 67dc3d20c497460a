//! Least squares on lagged values.
//!
//! The SARIMA fitter needs sensible starting values for its autoregressive
//! coefficients before the likelihood search begins. We get them from the
//! regression
//!
//! ```text
//! w_t = Σ_k β_k w_{t-k} + ε_t,   k ∈ lags
//! ```
//!
//! solved with SVD so tall, slightly collinear designs still give an answer.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Regress `series[t]` on `series[t - lag]` for each lag (no intercept).
///
/// Returns one coefficient per lag, in the order given, or `None` when there
/// are fewer usable rows than lags.
pub fn regress_on_lags(series: &[f64], lags: &[usize]) -> Option<Vec<f64>> {
    let max_lag = *lags.iter().max()?;
    if series.len() <= max_lag {
        return None;
    }
    let rows = series.len() - max_lag;
    if rows < lags.len() {
        return None;
    }

    let x = DMatrix::from_fn(rows, lags.len(), |r, c| series[max_lag + r - lags[c]]);
    let y = DVector::from_fn(rows, |r, _| series[max_lag + r]);

    solve_least_squares(&x, &y).map(|beta| beta.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn recovers_ar1_coefficient() {
        let mut series = vec![1.0];
        for _ in 0..40 {
            let last = *series.last().unwrap();
            series.push(0.6 * last);
        }
        let beta = regress_on_lags(&series, &[1]).unwrap();
        assert!((beta[0] - 0.6).abs() < 1e-8);
    }

    #[test]
    fn too_short_for_lags() {
        assert!(regress_on_lags(&[1.0, 2.0], &[12]).is_none());
        assert!(regress_on_lags(&[1.0, 2.0, 3.0], &[]).is_none());
    }
}
