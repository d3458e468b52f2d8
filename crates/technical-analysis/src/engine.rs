use analysis_core::{
    round_dp, AnalysisError, BollingerSeries, IndicatorFrame, IndicatorRow, PriceSeries,
};

use crate::indicators::*;

pub const SMA_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;
pub const BAND_PERIOD: usize = 20;
pub const BAND_WIDTH: f64 = 2.0;
pub const MIN_FRAME_ROWS: usize = 20;

/// Computes the moving average, momentum oscillator and volatility bands for a
/// close series.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    pub sma_period: usize,
    pub rsi_period: usize,
    pub band_period: usize,
    pub band_width: f64,
    pub min_rows: usize,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self {
            sma_period: SMA_PERIOD,
            rsi_period: RSI_PERIOD,
            band_period: BAND_PERIOD,
            band_width: BAND_WIDTH,
            min_rows: MIN_FRAME_ROWS,
        }
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join close, SMA and RSI on date, keeping only rows where all three exist.
    pub fn frame(&self, series: &PriceSeries) -> Result<IndicatorFrame, AnalysisError> {
        let closes = series.closes();
        let sma_values = rolling_sma(&closes, self.sma_period);
        let rsi_values = rsi(&closes, self.rsi_period);

        let rows: Vec<IndicatorRow> = series
            .points
            .iter()
            .zip(sma_values.iter().zip(rsi_values.iter()))
            .filter_map(|(point, (sma, rsi))| match (sma, rsi) {
                (Some(sma), Some(rsi)) => Some(IndicatorRow {
                    date: point.date,
                    close: point.close,
                    sma: *sma,
                    rsi: *rsi,
                }),
                _ => None,
            })
            .collect();

        if rows.len() < self.min_rows {
            tracing::warn!(
                "Insufficient data for {}: {} indicator rows (need {})",
                series.symbol,
                rows.len(),
                self.min_rows
            );
            return Err(AnalysisError::InsufficientData(format!(
                "{} has {} valid indicator rows, need {}",
                series.symbol,
                rows.len(),
                self.min_rows
            )));
        }

        Ok(IndicatorFrame {
            symbol: series.symbol.clone(),
            rows,
        })
    }

    /// Volatility bands over the full close series, rounded to cents.
    pub fn bands(&self, series: &PriceSeries) -> BollingerSeries {
        let closes = series.closes();
        let bb = bollinger_bands(&closes, self.band_period, self.band_width);

        BollingerSeries {
            dates: series.dates(),
            upper: bb.upper.iter().map(|v| v.map(|x| round_dp(x, 2))).collect(),
            lower: bb.lower.iter().map(|v| v.map(|x| round_dp(x, 2))).collect(),
            close: closes.iter().map(|&c| round_dp(c, 2)).collect(),
        }
    }
}
