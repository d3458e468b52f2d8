use forecast_engine::model::{DEFAULT_FIT_TIMEOUT, DEFAULT_MAX_HISTORY, DEFAULT_MAX_ITERATIONS};
use forecast_engine::{ArimaOrder, ForecastModel};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_CACHE_TTL;

pub const DEFAULT_BASELINE_SYMBOL: &str = "SPY";
pub const MAX_SYMBOLS: usize = 4;

/// What a request does when one symbol's pipeline fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    /// Fail the whole request with that symbol's "No data" error.
    #[default]
    Abort,
    /// Keep going and put an error marker in that symbol's slot.
    PerSymbol,
}

impl FromStr for BatchFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(BatchFailurePolicy::Abort),
            "per_symbol" | "per-symbol" => Ok(BatchFailurePolicy::PerSymbol),
            other => Err(format!("unknown batch failure policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub baseline_symbol: String,
    pub order: ArimaOrder,
    pub max_history: Option<usize>,
    pub max_iterations: usize,
    pub fit_timeout: Option<Duration>,
    pub batch_policy: BatchFailurePolicy,
    pub cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            baseline_symbol: DEFAULT_BASELINE_SYMBOL.to_string(),
            order: ArimaOrder::default(),
            max_history: Some(DEFAULT_MAX_HISTORY),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            fit_timeout: Some(DEFAULT_FIT_TIMEOUT),
            batch_policy: BatchFailurePolicy::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl PipelineConfig {
    pub fn forecast_model(&self) -> ForecastModel {
        ForecastModel::new(
            self.order,
            self.max_history,
            self.max_iterations,
            self.fit_timeout,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("abort".parse::<BatchFailurePolicy>(), Ok(BatchFailurePolicy::Abort));
        assert_eq!(
            " Per_Symbol ".parse::<BatchFailurePolicy>(),
            Ok(BatchFailurePolicy::PerSymbol)
        );
        assert!("skip".parse::<BatchFailurePolicy>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.baseline_symbol, "SPY");
        assert_eq!(config.order.to_string(), "(5,1,0)");
        assert_eq!(config.max_history, Some(300));
        assert_eq!(config.batch_policy, BatchFailurePolicy::Abort);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
    }
}
