use analysis_core::{
    round_dp, AnalysisError, EvalScores, ForecastPoint, ForecastResult, IndicatorFrame,
};
use chrono::{Days, NaiveDate};
use std::time::Duration;

use crate::arima::{ArimaFit, ArimaOrder};

/// Forecast length in calendar days.
pub const FORECAST_STEPS: usize = 7;

pub const DEFAULT_MAX_HISTORY: usize = 300;
pub const DEFAULT_MAX_ITERATIONS: usize = 50;
pub const DEFAULT_FIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Fits an ARIMA model to a symbol's indicator frame and produces a 7-day
/// forecast with AIC/BIC, within a hard deadline.
#[derive(Debug, Clone)]
pub struct ForecastModel {
    pub order: ArimaOrder,
    /// Keep only the most recent rows before fitting.
    pub max_history: Option<usize>,
    pub max_iterations: usize,
    pub fit_timeout: Option<Duration>,
}

impl Default for ForecastModel {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            max_history: Some(DEFAULT_MAX_HISTORY),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            fit_timeout: Some(DEFAULT_FIT_TIMEOUT),
        }
    }
}

struct FitOutput {
    values: Vec<f64>,
    aic: f64,
    bic: f64,
}

impl ForecastModel {
    pub fn new(
        order: ArimaOrder,
        max_history: Option<usize>,
        max_iterations: usize,
        fit_timeout: Option<Duration>,
    ) -> Self {
        Self {
            order,
            max_history,
            max_iterations,
            fit_timeout,
        }
    }

    /// Fit on the blocking pool and give up once the deadline passes.
    pub async fn forecast(&self, frame: &IndicatorFrame) -> Result<ForecastResult, AnalysisError> {
        let (closes, last_date) = self.history(frame)?;
        let order = self.order;
        let max_iterations = self.max_iterations;

        let output = run_with_deadline(self.fit_timeout, move || {
            fit_and_project(&closes, order, max_iterations)
        })
        .await;

        match output {
            Ok(output) => build_result(last_date, output),
            Err(e) => {
                tracing::warn!("ARIMA{} failed for {}: {}", self.order, frame.symbol, e);
                Err(e)
            }
        }
    }

    /// Same computation on the caller's thread, without a deadline.
    #[cfg(test)]
    pub(crate) fn forecast_sync(&self, frame: &IndicatorFrame) -> Result<ForecastResult, AnalysisError> {
        let (closes, last_date) = self.history(frame)?;
        let output = fit_and_project(&closes, self.order, self.max_iterations)?;
        build_result(last_date, output)
    }

    fn history(&self, frame: &IndicatorFrame) -> Result<(Vec<f64>, NaiveDate), AnalysisError> {
        let rows = match self.max_history {
            Some(limit) if frame.rows.len() > limit => &frame.rows[frame.rows.len() - limit..],
            _ => &frame.rows[..],
        };
        let last = rows.last().ok_or_else(|| {
            AnalysisError::InsufficientData(format!("no rows to fit for {}", frame.symbol))
        })?;
        Ok((rows.iter().map(|r| r.close).collect(), last.date))
    }
}

fn fit_and_project(
    closes: &[f64],
    order: ArimaOrder,
    max_iterations: usize,
) -> Result<FitOutput, AnalysisError> {
    let fit = ArimaFit::fit(closes, order, max_iterations)?;
    let values = fit.forecast(FORECAST_STEPS);
    let (aic, bic) = (fit.aic(), fit.bic());

    if !aic.is_finite() || !bic.is_finite() || values.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::ModelFit("non-finite forecast or scores".to_string()));
    }

    Ok(FitOutput { values, aic, bic })
}

fn build_result(last_date: NaiveDate, output: FitOutput) -> Result<ForecastResult, AnalysisError> {
    let predictions = output
        .values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let date = last_date
                .checked_add_days(Days::new(i as u64 + 1))
                .ok_or_else(|| AnalysisError::Internal("forecast date overflow".to_string()))?;
            Ok(ForecastPoint {
                date,
                predicted: round_dp(*value, 2),
            })
        })
        .collect::<Result<Vec<_>, AnalysisError>>()?;

    Ok(ForecastResult {
        predictions,
        eval_scores: EvalScores {
            aic: round_dp(output.aic, 2),
            bic: round_dp(output.bic, 2),
        },
    })
}

/// Run a CPU-bound job on the blocking pool, abandoning it after `timeout`.
///
/// The solver never yields, so the deadline is enforced from outside: on expiry
/// the join handle is dropped and the job's result is discarded when it ends.
/// Jobs must own their inputs.
pub async fn run_with_deadline<T, F>(timeout: Option<Duration>, job: F) -> Result<T, AnalysisError>
where
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(job);

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                return Err(AnalysisError::ModelFit(format!(
                    "fit exceeded the {:?} deadline",
                    limit
                )))
            }
        },
        None => handle.await,
    };

    joined.map_err(|e| AnalysisError::ModelFit(e.to_string()))?
}
