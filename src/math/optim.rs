//! Bounded Nelder–Mead simplex minimisation.
//!
//! Used to minimise the SARIMA conditional sum of squares. Points outside the
//! box are clamped back onto it after every simplex move.

use nalgebra::DVector;

#[derive(Debug, Clone)]
pub struct SimplexConfig {
    pub max_iter: usize,
    /// Stop when the spread of objective values across the simplex falls below
    /// `tolerance * (1 + |best|)`, or when the simplex diameter falls below `tolerance`.
    pub tolerance: f64,
    /// Size of the initial simplex along each axis.
    pub initial_step: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            max_iter: 10_000,
            tolerance: 1e-10,
            initial_step: 0.1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimise `objective` starting from `start`, keeping each coordinate in `bounds[i]`.
///
/// `bounds` must have the same length as `start`.
pub fn minimize<F>(objective: F, start: &[f64], bounds: &[(f64, f64)], config: &SimplexConfig) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let clamp = |mut v: DVector<f64>| {
        for (x, &(lo, hi)) in v.iter_mut().zip(bounds) {
            *x = x.clamp(lo, hi);
        }
        v
    };
    let eval = |v: &DVector<f64>| {
        let f = objective(v.as_slice());
        if f.is_finite() { f } else { f64::MAX }
    };

    if n == 0 {
        return Minimum {
            point: Vec::new(),
            value: objective(&[]),
            iterations: 0,
            converged: true,
        };
    }

    let origin = clamp(DVector::from_column_slice(start));
    let mut simplex: Vec<DVector<f64>> = Vec::with_capacity(n + 1);
    simplex.push(origin.clone());
    for i in 0..n {
        let mut v = origin.clone();
        // Step away from a bound rather than into it.
        let (lo, hi) = bounds[i];
        v[i] = if v[i] + config.initial_step <= hi {
            v[i] + config.initial_step
        } else {
            (v[i] - config.initial_step).max(lo)
        };
        simplex.push(v);
    }
    let mut values: Vec<f64> = simplex.iter().map(eval).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        let (best, worst, second_worst) = (order[0], order[n], order[n - 1]);

        let spread = values[worst] - values[best];
        let diameter = simplex
            .iter()
            .map(|v| (v - &simplex[best]).norm())
            .fold(0.0, f64::max);
        if spread <= config.tolerance * (1.0 + values[best].abs()) || diameter <= config.tolerance {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid = simplex
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != worst)
            .fold(DVector::zeros(n), |acc, (_, v)| acc + v)
            / n as f64;

        let reflected = clamp(&centroid + (&centroid - &simplex[worst]) * REFLECT);
        let f_reflected = eval(&reflected);

        if f_reflected < values[best] {
            let expanded = clamp(&centroid + (&reflected - &centroid) * EXPAND);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[worst] = expanded;
                values[worst] = f_expanded;
            } else {
                simplex[worst] = reflected;
                values[worst] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[second_worst] {
            simplex[worst] = reflected;
            values[worst] = f_reflected;
            continue;
        }

        let (contracted, threshold) = if f_reflected < values[worst] {
            (clamp(&centroid + (&reflected - &centroid) * CONTRACT), f_reflected)
        } else {
            (clamp(&centroid + (&simplex[worst] - &centroid) * CONTRACT), values[worst])
        };
        let f_contracted = eval(&contracted);
        if f_contracted < threshold {
            simplex[worst] = contracted;
            values[worst] = f_contracted;
            continue;
        }

        let anchor = simplex[best].clone();
        for i in 0..=n {
            if i != best {
                simplex[i] = clamp(&anchor + (&simplex[i] - &anchor) * SHRINK);
                values[i] = eval(&simplex[i]);
            }
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);

    Minimum {
        point: simplex[best].iter().copied().collect(),
        value: values[best],
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const WIDE: (f64, f64) = (f64::NEG_INFINITY, f64::INFINITY);

    #[test]
    fn finds_quadratic_minimum() {
        let result = minimize(
            |x| (x[0] - 2.0).powi(2) + (x[1] + 3.0).powi(2),
            &[0.0, 0.0],
            &[WIDE, WIDE],
            &SimplexConfig::default(),
        );
        assert!(result.converged);
        assert_abs_diff_eq!(result.point[0], 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(result.point[1], -3.0, epsilon = 1e-4);
    }

    #[test]
    fn respects_bounds() {
        let result = minimize(
            |x| (x[0] - 5.0).powi(2),
            &[0.0],
            &[(-0.99, 0.99)],
            &SimplexConfig::default(),
        );
        assert!(result.converged);
        assert_abs_diff_eq!(result.point[0], 0.99, epsilon = 1e-6);
    }

    #[test]
    fn reports_non_convergence_when_budget_is_tiny() {
        let config = SimplexConfig {
            max_iter: 2,
            ..SimplexConfig::default()
        };
        let result = minimize(
            |x| (x[0] - 2.0).powi(2) + (x[1] - 1.0).powi(2),
            &[-10.0, 10.0],
            &[WIDE, WIDE],
            &config,
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 2);
    }
}
