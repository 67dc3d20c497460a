//! Seasonal ARIMA, `SARIMA(p,d,q)(P,D,Q)[s]`.
//!
//! ```text
//! φ(B) Φ(B^s) (1 - B)^d (1 - B^s)^D y_t = θ(B) Θ(B^s) e_t
//! ```
//!
//! Estimation is by conditional sum of squares (CSS): the series is
//! differenced, the multiplicative lag polynomials are expanded into plain lag
//! coefficients, and the one-step residuals are minimised with a bounded
//! simplex search. A constant mean is estimated only when no differencing is
//! requested.
//!
//! Forecasts run the ARMA recursion forward on the differenced scale (future
//! shocks are zero) and then undo the differencing with the expanded
//! differencing polynomial.

use std::f64::consts::PI;

use crate::domain::{RegularOrder, SeasonalOrder};
use crate::error::FitError;
use crate::math::{SimplexConfig, minimize, regress_on_lags};

/// Coefficient bound that keeps the search inside the stationary/invertible region
/// for the single-coefficient case.
const COEF_BOUND: f64 = 0.99;
/// Starting AR values are pulled inside this bound.
const INIT_BOUND: f64 = 0.9;

/// Validated model structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sarima {
    regular: RegularOrder,
    seasonal: SeasonalOrder,
}

/// Estimated coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct SarimaParams {
    pub mean: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
}

/// A fitted model: coefficients plus the state needed to forecast.
#[derive(Debug, Clone)]
pub struct SarimaFit {
    pub model: Sarima,
    pub params: SarimaParams,
    /// Residual variance of the one-step errors.
    pub sigma2: f64,
    pub aic: Option<f64>,
    pub bic: Option<f64>,
    /// Optimizer iterations used.
    pub iterations: usize,
    /// Number of residuals the objective was computed over.
    pub n_effective: usize,
    history: Vec<f64>,
    differenced: Vec<f64>,
    residuals: Vec<f64>,
}

impl Sarima {
    pub fn new(regular: RegularOrder, seasonal: SeasonalOrder) -> Result<Self, FitError> {
        if seasonal.is_active() {
            let s = seasonal.period;
            if s < 2 {
                return Err(FitError::InvalidOrder(format!(
                    "seasonal terms {seasonal} need a period of at least 2"
                )));
            }
            if seasonal.p > 0 && regular.p >= s {
                return Err(FitError::InvalidOrder(format!(
                    "autoregressive lags overlap: p={} reaches the seasonal period {s}",
                    regular.p
                )));
            }
            if seasonal.q > 0 && regular.q >= s {
                return Err(FitError::InvalidOrder(format!(
                    "moving-average lags overlap: q={} reaches the seasonal period {s}",
                    regular.q
                )));
            }
        }
        Ok(Self { regular, seasonal })
    }

    pub fn regular(&self) -> RegularOrder {
        self.regular
    }

    pub fn seasonal(&self) -> SeasonalOrder {
        self.seasonal
    }

    fn period(&self) -> usize {
        if self.seasonal.is_active() { self.seasonal.period } else { 0 }
    }

    fn with_mean(&self) -> bool {
        self.regular.d + self.seasonal.d == 0
    }

    /// Number of estimated coefficients (excluding the residual variance).
    pub fn param_count(&self) -> usize {
        self.regular.p + self.regular.q + self.seasonal.p + self.seasonal.q + usize::from(self.with_mean())
    }

    fn differencing_len(&self) -> usize {
        self.regular.d + self.seasonal.d * self.period()
    }

    fn ar_len(&self) -> usize {
        self.regular.p + self.seasonal.p * self.period()
    }

    fn ma_len(&self) -> usize {
        self.regular.q + self.seasonal.q * self.period()
    }

    /// First index of the differenced series with a full set of lags.
    fn start(&self) -> usize {
        self.ar_len().max(self.ma_len())
    }

    /// Shortest series this model will accept.
    pub fn min_observations(&self) -> usize {
        let base = self.differencing_len() + self.start() + self.param_count() + 1;
        if self.seasonal.is_active() {
            base.max(2 * self.seasonal.period)
        } else {
            base
        }
    }

    pub fn fit(&self, values: &[f64]) -> Result<SarimaFit, FitError> {
        let needed = self.min_observations();
        if values.len() < needed {
            return Err(FitError::InsufficientData {
                needed,
                got: values.len(),
            });
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(FitError::NonFinite(format!("observation {idx}")));
        }

        let differenced = apply_differencing(values, &self.differencing_poly());
        let layout = Layout::new(self);

        let objective = |theta: &[f64]| {
            let params = layout.unpack(theta);
            self.residuals(&differenced, &params).1
        };

        let start_point = self.initial_params(&differenced, &layout);
        let bounds = layout.bounds();
        let result = minimize(objective, &start_point, &bounds, &SimplexConfig::default());
        if !result.converged {
            return Err(FitError::NotConverged {
                iterations: result.iterations,
            });
        }
        if !result.value.is_finite() || result.value == f64::MAX {
            return Err(FitError::NonFinite("conditional sum of squares".to_string()));
        }

        let params = layout.unpack(&result.point);
        let (residuals, css) = self.residuals(&differenced, &params);
        let n_effective = differenced.len() - self.start();
        let sigma2 = css / n_effective as f64;

        let (aic, bic) = information_criteria(sigma2, n_effective, self.param_count() + 1);

        Ok(SarimaFit {
            model: *self,
            params,
            sigma2,
            aic,
            bic,
            iterations: result.iterations,
            n_effective,
            history: values.to_vec(),
            differenced,
            residuals,
        })
    }

    /// Expanded `(1 - B)^d (1 - B^s)^D`, constant term first.
    fn differencing_poly(&self) -> Vec<f64> {
        let mut poly = vec![1.0];
        for _ in 0..self.regular.d {
            poly = poly_mul(&poly, &[1.0, -1.0]);
        }
        let s = self.period();
        for _ in 0..self.seasonal.d {
            let mut seasonal = vec![0.0; s + 1];
            seasonal[0] = 1.0;
            seasonal[s] = -1.0;
            poly = poly_mul(&poly, &seasonal);
        }
        poly
    }

    /// One-step residuals over the differenced series and their sum of squares.
    fn residuals(&self, w: &[f64], params: &SarimaParams) -> (Vec<f64>, f64) {
        let a = ar_lags(&params.ar, &params.seasonal_ar, self.period());
        let m = ma_lags(&params.ma, &params.seasonal_ma, self.period());
        let mu = params.mean;

        let mut e = vec![0.0; w.len()];
        let mut css = 0.0;
        for t in self.start()..w.len() {
            let pred = mu + one_step(&a, &m, mu, &w[..t], &e[..t]);
            e[t] = w[t] - pred;
            css += e[t] * e[t];
        }
        if !css.is_finite() {
            css = f64::MAX;
        }
        (e, css)
    }

    fn initial_params(&self, w: &[f64], layout: &Layout) -> Vec<f64> {
        let mean = if layout.with_mean {
            w.iter().sum::<f64>() / w.len() as f64
        } else {
            0.0
        };
        let centered: Vec<f64> = w.iter().map(|v| v - mean).collect();

        let s = self.period();
        let mut lags: Vec<usize> = (1..=self.regular.p).collect();
        lags.extend((1..=self.seasonal.p).map(|j| j * s));

        let ar_start = if lags.is_empty() {
            Vec::new()
        } else {
            regress_on_lags(&centered, &lags)
                .map(|beta| beta.into_iter().map(|b| b.clamp(-INIT_BOUND, INIT_BOUND)).collect())
                .unwrap_or_else(|| vec![0.0; lags.len()])
        };
        let (ar, seasonal_ar) = ar_start.split_at(self.regular.p);

        layout.pack(&SarimaParams {
            mean,
            ar: ar.to_vec(),
            ma: vec![0.0; self.regular.q],
            seasonal_ar: seasonal_ar.to_vec(),
            seasonal_ma: vec![0.0; self.seasonal.q],
        })
    }
}

impl SarimaFit {
    /// Point forecasts for the next `horizon` periods on the original scale.
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let s = self.model.period();
        let a = ar_lags(&self.params.ar, &self.params.seasonal_ar, s);
        let m = ma_lags(&self.params.ma, &self.params.seasonal_ma, s);
        let mu = self.params.mean;

        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();
        for _ in 0..horizon {
            let t = w.len();
            let next = mu + one_step(&a, &m, mu, &w[..t], &e[..t]);
            w.push(next);
            e.push(0.0);
        }

        let c = self.model.differencing_poly();
        let mut y = self.history.clone();
        for step in 0..horizon {
            let t = y.len();
            let carried: f64 = c
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, ck)| ck * y[t - k])
                .sum();
            y.push(w[self.differenced.len() + step] - carried);
        }
        y.split_off(self.history.len())
    }
}

/// Position of each coefficient group inside the optimizer's flat vector.
struct Layout {
    with_mean: bool,
    p: usize,
    q: usize,
    sp: usize,
    sq: usize,
}

impl Layout {
    fn new(model: &Sarima) -> Self {
        Self {
            with_mean: model.with_mean(),
            p: model.regular.p,
            q: model.regular.q,
            sp: model.seasonal.p,
            sq: model.seasonal.q,
        }
    }

    fn offset(&self) -> usize {
        usize::from(self.with_mean)
    }

    fn unpack(&self, theta: &[f64]) -> SarimaParams {
        let mut rest = &theta[self.offset()..];
        let mut take = |n: usize| {
            let (head, tail) = rest.split_at(n);
            rest = tail;
            head.to_vec()
        };
        let ar = take(self.p);
        let ma = take(self.q);
        let seasonal_ar = take(self.sp);
        let seasonal_ma = take(self.sq);
        SarimaParams {
            mean: if self.with_mean { theta[0] } else { 0.0 },
            ar,
            ma,
            seasonal_ar,
            seasonal_ma,
        }
    }

    fn pack(&self, params: &SarimaParams) -> Vec<f64> {
        let mut out = Vec::new();
        if self.with_mean {
            out.push(params.mean);
        }
        out.extend_from_slice(&params.ar);
        out.extend_from_slice(&params.ma);
        out.extend_from_slice(&params.seasonal_ar);
        out.extend_from_slice(&params.seasonal_ma);
        out
    }

    fn bounds(&self) -> Vec<(f64, f64)> {
        let mut out = Vec::new();
        if self.with_mean {
            out.push((f64::NEG_INFINITY, f64::INFINITY));
        }
        out.extend(std::iter::repeat_n((-COEF_BOUND, COEF_BOUND), self.p + self.q + self.sp + self.sq));
        out
    }
}

/// ARMA prediction of the next value given past values and shocks.
///
/// `a[k-1]` and `m[k-1]` are the coefficients at lag `k`. Lags reaching before
/// the start of the history contribute nothing.
fn one_step(a: &[f64], m: &[f64], mu: f64, w: &[f64], e: &[f64]) -> f64 {
    let t = w.len();
    let ar: f64 = a
        .iter()
        .enumerate()
        .filter(|(k, _)| *k < t)
        .map(|(k, ak)| ak * (w[t - k - 1] - mu))
        .sum();
    let ma: f64 = m
        .iter()
        .enumerate()
        .filter(|(k, _)| *k < t)
        .map(|(k, mk)| mk * e[t - k - 1])
        .sum();
    ar + ma
}

/// Lag coefficients of `1 - (1 - Σφ_i B^i)(1 - ΣΦ_j B^{js})`.
fn ar_lags(ar: &[f64], seasonal_ar: &[f64], s: usize) -> Vec<f64> {
    let regular = lag_poly(ar, 1, -1.0);
    let seasonal = lag_poly(seasonal_ar, s, -1.0);
    poly_mul(&regular, &seasonal)
        .into_iter()
        .skip(1)
        .map(|c| -c)
        .collect()
}

/// Lag coefficients of `(1 + Σθ_i B^i)(1 + ΣΘ_j B^{js}) - 1`.
fn ma_lags(ma: &[f64], seasonal_ma: &[f64], s: usize) -> Vec<f64> {
    let regular = lag_poly(ma, 1, 1.0);
    let seasonal = lag_poly(seasonal_ma, s, 1.0);
    poly_mul(&regular, &seasonal).into_iter().skip(1).collect()
}

/// `1 + sign * Σ coefs[j] B^{(j+1) * step}` as a dense coefficient vector.
fn lag_poly(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefs.len() * step + 1];
    poly[0] = 1.0;
    for (j, c) in coefs.iter().enumerate() {
        poly[(j + 1) * step] = sign * c;
    }
    poly
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, ai) in a.iter().enumerate() {
        for (j, bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

/// `w_t = Σ_k c_k y_{t-k}` for every `t` with a full set of lags.
fn apply_differencing(y: &[f64], c: &[f64]) -> Vec<f64> {
    let lag = c.len() - 1;
    (lag..y.len())
        .map(|t| c.iter().enumerate().map(|(k, ck)| ck * y[t - k]).sum())
        .collect()
}

/// Gaussian AIC/BIC from the CSS residual variance; `None` for a perfect fit.
fn information_criteria(sigma2: f64, n: usize, k: usize) -> (Option<f64>, Option<f64>) {
    if !(sigma2.is_finite() && sigma2 > f64::EPSILON) || n == 0 {
        return (None, None);
    }
    let n = n as f64;
    let k = k as f64;
    let loglik = -0.5 * n * (1.0 + (2.0 * PI * sigma2).ln());
    (Some(-2.0 * loglik + 2.0 * k), Some(-2.0 * loglik + k * n.ln()))
}
