use analysis_orchestrator::{BatchFailurePolicy, PipelineConfig};
use anyhow::{anyhow, Context, Result};
use forecast_engine::ArimaOrder;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// `["*"]` allows any origin.
    pub allowed_origins: Vec<String>,
    pub yahoo_base_url: String,
    pub yahoo_timeout: Duration,
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let pipeline = PipelineConfig {
            baseline_symbol: env::var("BASELINE_SYMBOL")
                .unwrap_or_else(|_| "SPY".to_string())
                .trim()
                .to_uppercase(),
            order: env::var("ARIMA_ORDER")
                .unwrap_or_else(|_| "5,1,0".to_string())
                .parse::<ArimaOrder>()
                .map_err(|e| anyhow!("ARIMA_ORDER: {}", e))?,
            max_iterations: env::var("ARIMA_MAX_ITER")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .context("ARIMA_MAX_ITER must be a positive integer")?,
            // 0 disables the limit
            max_history: match env::var("MAX_HISTORY")
                .unwrap_or_else(|_| "300".to_string())
                .parse::<usize>()
                .context("MAX_HISTORY must be an integer")?
            {
                0 => None,
                n => Some(n),
            },
            fit_timeout: match env::var("FIT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse::<u64>()
                .context("FIT_TIMEOUT_SECS must be an integer")?
            {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            batch_policy: env::var("BATCH_FAILURE_POLICY")
                .unwrap_or_else(|_| "abort".to_string())
                .parse::<BatchFailurePolicy>()
                .map_err(|e| anyhow!("BATCH_FAILURE_POLICY: {}", e))?,
            cache_ttl: Duration::from_secs(
                env::var("CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .context("CACHE_TTL_SECS must be an integer")?,
            ),
        };

        Ok(Self {
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            allowed_origins: parse_origins(
                &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
            ),
            yahoo_base_url: env::var("YAHOO_BASE_URL")
                .unwrap_or_else(|_| yahoo_client::DEFAULT_CHART_URL.to_string()),
            yahoo_timeout: Duration::from_secs(
                env::var("YAHOO_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("YAHOO_TIMEOUT_SECS must be an integer")?,
            ),
            pipeline,
        })
    }
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        vec!["*".to_string()]
    } else {
        origins
    }
}
