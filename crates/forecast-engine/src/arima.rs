//! Autoregressive integrated moving-average models estimated by conditional
//! sum of squares.
//!
//! Pure AR orders are solved exactly by least squares on the lagged,
//! differenced series. Orders with moving-average terms start from
//! Hannan–Rissanen estimates and are refined by Gauss–Newton with step halving,
//! within a fixed iteration budget.

use analysis_core::AnalysisError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

const MAX_HALVINGS: usize = 20;
const TOLERANCE: f64 = 1e-10;
const JACOBIAN_STEP: f64 = 1e-6;
const SVD_EPS: f64 = 1e-12;

/// Model order (p, d, q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Lightweight order for constrained deployments.
    pub const fn light() -> Self {
        Self::new(1, 1, 1)
    }

    /// Estimated parameters including the innovation variance.
    pub fn n_params(&self, with_mean: bool) -> usize {
        self.p + self.q + 1 + usize::from(with_mean)
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(5, 1, 0)
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl FromStr for ArimaOrder {
    type Err = String;

    /// Accepts `5,1,0` or `(5,1,0)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .map(str::trim)
            .collect();

        if parts.len() != 3 {
            return Err(format!("expected p,d,q but got '{}'", s));
        }

        let parse = |v: &str| {
            v.parse::<usize>()
                .map_err(|e| format!("invalid order component '{}': {}", v, e))
        };

        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

/// A fitted model, ready to forecast.
#[derive(Debug, Clone)]
pub struct ArimaFit {
    pub order: ArimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub mean: f64,
    pub sigma2: f64,
    pub log_likelihood: f64,
    /// Observations entering the conditional likelihood.
    pub nobs: usize,
    pub iterations: usize,
    pub converged: bool,
    diffed: Vec<f64>,
    residuals: Vec<f64>,
    levels: Vec<f64>,
}

impl ArimaFit {
    pub fn fit(series: &[f64], order: ArimaOrder, max_iterations: usize) -> Result<Self, AnalysisError> {
        if series.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::ModelFit("non-finite observation".to_string()));
        }

        let ArimaOrder { p, d, q } = order;
        let too_short = || {
            AnalysisError::InsufficientData(format!(
                "{} observations are too few for ARIMA{}",
                series.len(),
                order
            ))
        };

        if series.len() <= d {
            return Err(too_short());
        }

        let (mut w, levels) = difference(series, d);
        let with_mean = d == 0;
        let mean = if with_mean {
            w.iter().sum::<f64>() / w.len() as f64
        } else {
            0.0
        };
        if with_mean {
            w.iter_mut().for_each(|v| *v -= mean);
        }

        // The conditional sample must outnumber the estimated parameters.
        if w.len() < p + order.n_params(with_mean) + 1 {
            return Err(too_short());
        }

        let (params, iterations, converged) = if q == 0 {
            (ar_least_squares(&w, p)?, 0, true)
        } else {
            let start = hannan_rissanen(&w, p, q)?;
            gauss_newton(&w, p, q, start, max_iterations)?
        };

        if params.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::ModelFit("non-finite parameters".to_string()));
        }

        let (ar, ma) = params.split_at(p);
        let residuals = css_residuals(&w, ar, ma);
        let nobs = w.len() - p;
        let sse: f64 = residuals[p..].iter().map(|e| e * e).sum();
        let sigma2 = sse / nobs as f64;
        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return Err(AnalysisError::ModelFit(format!(
                "degenerate residual variance {}",
                sigma2
            )));
        }

        let log_likelihood = -(nobs as f64) / 2.0 * ((2.0 * PI).ln() + sigma2.ln() + 1.0);

        Ok(Self {
            order,
            ar: ar.to_vec(),
            ma: ma.to_vec(),
            mean,
            sigma2,
            log_likelihood,
            nobs,
            iterations,
            converged,
            diffed: w,
            residuals,
            levels,
        })
    }

    fn n_params(&self) -> usize {
        self.order.n_params(self.order.d == 0)
    }

    /// Akaike information criterion.
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood + 2.0 * self.n_params() as f64
    }

    /// Bayesian information criterion.
    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood + self.n_params() as f64 * (self.nobs as f64).ln()
    }

    /// Point forecasts for the next `steps` observations on the original scale.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let mut w = self.diffed.clone();
        let mut e = self.residuals.clone();
        let mut levels = self.levels.clone();
        let mut out = Vec::with_capacity(steps);

        for _ in 0..steps {
            let t = w.len();
            let mut next = 0.0;
            for (i, phi) in self.ar.iter().enumerate() {
                next += phi * w[t - 1 - i];
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if t > j {
                    next += theta * e[t - 1 - j];
                }
            }
            w.push(next);
            e.push(0.0);

            // Undo differencing from the deepest level up.
            let mut value = next + self.mean;
            for level in levels.iter_mut().rev() {
                *level += value;
                value = *level;
            }
            out.push(value);
        }

        out
    }
}

/// Difference `d` times, remembering the last value at each level for integration.
fn difference(series: &[f64], d: usize) -> (Vec<f64>, Vec<f64>) {
    let mut levels = Vec::with_capacity(d);
    let mut current = series.to_vec();
    for _ in 0..d {
        if let Some(&last) = current.last() {
            levels.push(last);
        }
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    (current, levels)
}

/// Conditional residuals; zero for the first `p` positions.
fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut pred = 0.0;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * w[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - pred;
    }
    e
}

fn css_sse(w: &[f64], p: usize, params: &[f64]) -> f64 {
    let (ar, ma) = params.split_at(p);
    css_residuals(w, ar, ma)[p..].iter().map(|e| e * e).sum()
}

fn solve_least_squares(x: DMatrix<f64>, y: DVector<f64>) -> Result<Vec<f64>, AnalysisError> {
    let svd = x.svd(true, true);
    svd.solve(&y, SVD_EPS)
        .map(|beta| beta.iter().copied().collect())
        .map_err(|e| AnalysisError::ModelFit(e.to_string()))
}

/// Regress `w[t]` on its `p` lags.
fn ar_least_squares(w: &[f64], p: usize) -> Result<Vec<f64>, AnalysisError> {
    if p == 0 {
        return Ok(Vec::new());
    }
    let rows = w.len().saturating_sub(p);
    if rows == 0 {
        return Err(AnalysisError::InsufficientData("no rows for AR regression".to_string()));
    }

    let x = DMatrix::from_fn(rows, p, |r, i| w[p + r - 1 - i]);
    let y = DVector::from_fn(rows, |r, _| w[p + r]);
    solve_least_squares(x, y)
}

/// Two-stage start values: a long autoregression supplies residual proxies,
/// then `w[t]` is regressed on its own lags and the lagged proxies.
fn hannan_rissanen(w: &[f64], p: usize, q: usize) -> Result<Vec<f64>, AnalysisError> {
    let n = w.len();
    let m = (2 * (p + q)).max(p + q + 2).min(n / 3);
    let s = (m + q).max(p);
    let rows = n.saturating_sub(s);

    if m == 0 || rows < p + q + 1 {
        let mut start = ar_least_squares(w, p)?;
        start.extend(std::iter::repeat(0.0).take(q));
        return Ok(start);
    }

    let long_ar = ar_least_squares(w, m)?;
    let mut proxy = vec![0.0; n];
    for t in m..n {
        let fitted: f64 = long_ar.iter().enumerate().map(|(i, a)| a * w[t - 1 - i]).sum();
        proxy[t] = w[t] - fitted;
    }

    let x = DMatrix::from_fn(rows, p + q, |r, c| {
        let t = s + r;
        if c < p {
            w[t - 1 - c]
        } else {
            proxy[t - 1 - (c - p)]
        }
    });
    let y = DVector::from_fn(rows, |r, _| w[s + r]);
    solve_least_squares(x, y)
}

/// Minimise the conditional sum of squares from `start`.
fn gauss_newton(
    w: &[f64],
    p: usize,
    q: usize,
    start: Vec<f64>,
    max_iterations: usize,
) -> Result<(Vec<f64>, usize, bool), AnalysisError> {
    let k = p + q;
    let mut params = start;
    let mut sse = css_sse(w, p, &params);
    if !sse.is_finite() {
        params = vec![0.0; k];
        sse = css_sse(w, p, &params);
    }

    let rows = w.len() - p;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;

        let (ar, ma) = params.split_at(p);
        let base = css_residuals(w, ar, ma);

        let mut jacobian = DMatrix::zeros(rows, k);
        for j in 0..k {
            let h = JACOBIAN_STEP * params[j].abs().max(1.0);
            let mut bumped = params.clone();
            bumped[j] += h;
            let (ar_b, ma_b) = bumped.split_at(p);
            let shifted = css_residuals(w, ar_b, ma_b);
            for r in 0..rows {
                jacobian[(r, j)] = (shifted[p + r] - base[p + r]) / h;
            }
        }
        let rhs = DVector::from_fn(rows, |r, _| -base[p + r]);
        let delta = solve_least_squares(jacobian, rhs)?;

        let mut step = 1.0;
        let mut improved = false;
        for _ in 0..MAX_HALVINGS {
            let candidate: Vec<f64> = params
                .iter()
                .zip(delta.iter())
                .map(|(b, d)| b + step * d)
                .collect();
            let candidate_sse = css_sse(w, p, &candidate);
            if candidate_sse.is_finite() && candidate_sse < sse {
                let gain = (sse - candidate_sse) / sse.max(f64::MIN_POSITIVE);
                params = candidate;
                sse = candidate_sse;
                improved = true;
                converged = gain < TOLERANCE;
                break;
            }
            step *= 0.5;
        }

        // No descent direction left: at a minimum to working precision.
        if !improved {
            converged = true;
        }
        if converged {
            break;
        }
    }

    if !converged {
        tracing::debug!(
            "CSS refinement stopped after {} iterations without converging",
            max_iterations
        );
    }

    Ok((params, iterations, converged))
}
