use analysis_core::{
    AnalysisBatch, AnalysisError, AnalysisReport, Clock, PriceSource, SymbolOutcome, SystemClock,
};
use chrono::NaiveDate;
use forecast_engine::{derive_signals, ForecastModel};
use futures_util::future::join_all;
use std::sync::Arc;
use technical_analysis::{normalize, summary_stats, IndicatorEngine};

pub mod cache;
pub mod config;
pub mod fetcher;


pub use cache::{CacheKey, ManualClock, ResultCache};
pub use config::{BatchFailurePolicy, PipelineConfig, MAX_SYMBOLS};
pub use fetcher::PriceFetcher;

/// Runs the per-symbol pipeline for a batch of symbols against a shared
/// baseline: fetch, indicators, forecast, signals, normalization and bands.
pub struct AnalysisOrchestrator {
    fetcher: PriceFetcher,
    indicators: IndicatorEngine,
    forecaster: ForecastModel,
    config: PipelineConfig,
}

impl AnalysisOrchestrator {
    pub fn new(source: Arc<dyn PriceSource>, config: PipelineConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn PriceSource>,
        mut config: PipelineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        config.baseline_symbol = config.baseline_symbol.trim().to_uppercase();
        let cache = ResultCache::new(config.cache_ttl, clock.clone());
        Self {
            fetcher: PriceFetcher::new(source, cache, clock),
            indicators: IndicatorEngine::new(),
            forecaster: config.forecast_model(),
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn fetcher(&self) -> &PriceFetcher {
        &self.fetcher
    }

    /// Analyze 1 to 4 symbols plus the baseline over `[start, end]`.
    ///
    /// The baseline is always the first entry. Symbols are upper-cased and
    /// repeated symbols collapse onto their first occurrence.
    pub async fn run_analysis(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AnalysisBatch, AnalysisError> {
        let symbols = self.resolve_symbols(symbols)?;
        let baseline = self.config.baseline_symbol.as_str();
        tracing::info!(
            "Starting analysis for {:?} ({} to {}, baseline {})",
            symbols,
            start,
            end,
            baseline
        );

        let baseline_series = self.fetcher.fetch(baseline, Some(start), Some(end)).await;
        let baseline0 = match baseline_series.first_close() {
            Some(close) if close.is_finite() && close > 0.0 => close,
            _ => {
                tracing::warn!("No usable {} data, aborting request", baseline);
                return Err(AnalysisError::NoBaselineData(baseline.to_string()));
            }
        };

        let outcomes = join_all(
            symbols
                .iter()
                .map(|symbol| self.analyze_symbol(symbol, start, end, baseline0)),
        )
        .await;

        let mut batch = AnalysisBatch::default();
        for (symbol, outcome) in symbols.into_iter().zip(outcomes) {
            match outcome {
                Ok(report) => batch
                    .entries
                    .push((symbol, SymbolOutcome::Report(Box::new(report)))),
                Err(e) => {
                    tracing::warn!("Analysis failed for {}: {}", symbol, e);
                    match self.config.batch_policy {
                        BatchFailurePolicy::PerSymbol => {
                            batch.entries.push((symbol, SymbolOutcome::failed()))
                        }
                        BatchFailurePolicy::Abort if e.is_symbol_failure() => {
                            return Err(AnalysisError::DataUnavailable(symbol))
                        }
                        BatchFailurePolicy::Abort => return Err(e),
                    }
                }
            }
        }

        tracing::info!("Analysis complete for {} symbols", batch.len());
        Ok(batch)
    }

    /// Full pipeline for one symbol. `baseline0` is the baseline's first close.
    pub async fn analyze_symbol(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        baseline0: f64,
    ) -> Result<AnalysisReport, AnalysisError> {
        let series = self.fetcher.fetch(symbol, Some(start), Some(end)).await;
        if series.is_empty() {
            return Err(AnalysisError::DataUnavailable(symbol.to_string()));
        }
        tracing::debug!("{}: {} closes", symbol, series.len());

        let frame = self.indicators.frame(&series)?;
        let forecast = self.forecaster.forecast(&frame).await?;

        let last_close = frame
            .last()
            .map(|row| row.close)
            .ok_or_else(|| AnalysisError::InsufficientData(symbol.to_string()))?;
        let actions = derive_signals(&forecast.predicted_values(), last_close);

        let normalized = normalize(&series, baseline0);
        let stats = summary_stats(&normalized.values);
        let bollinger = self.indicators.bands(&series);

        Ok(AnalysisReport {
            forecast,
            actions,
            normalized,
            summary_stats: stats,
            bollinger,
        })
    }

    fn resolve_symbols(&self, symbols: &[String]) -> Result<Vec<String>, AnalysisError> {
        if symbols.is_empty() || symbols.len() > MAX_SYMBOLS {
            return Err(AnalysisError::Validation(format!(
                "Provide between 1–{} symbols",
                MAX_SYMBOLS
            )));
        }
        if symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(AnalysisError::Validation(
                "Symbols must be non-empty strings".to_string(),
            ));
        }

        let mut resolved = vec![self.config.baseline_symbol.clone()];
        for symbol in symbols {
            let symbol = symbol.trim().to_uppercase();
            if !resolved.contains(&symbol) {
                resolved.push(symbol);
            }
        }
        Ok(resolved)
    }
}
