use analysis_core::{AnalysisError, PriceSource, RawObservation};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Daily close history from the Yahoo Finance chart API.
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    chart_url: String,
}

impl YahooFinanceClient {
    pub fn new() -> Self {
        Self::with_chart_url(DEFAULT_CHART_URL.to_string(), Duration::from_secs(30))
    }

    pub fn with_chart_url(chart_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            chart_url: chart_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get daily closes with timestamps in `[period1, period2)` (unix seconds).
    pub async fn get_daily_closes(
        &self,
        symbol: &str,
        period1: i64,
        period2: i64,
    ) -> Result<Vec<RawObservation>, AnalysisError> {
        let url = format!("{}/{}", self.chart_url, symbol);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AnalysisError::Provider(e.to_string()))?;

        // Unknown symbols come back as 404 with a chart.error body.
        if response.status().as_u16() == 404 {
            tracing::debug!("Yahoo has no chart for {}", symbol);
            return Ok(Vec::new());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Provider(format!("HTTP {}: {}", status, body)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalysisError::Provider(e.to_string()))?;

        parse_chart_closes(&json)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceSource for YahooFinanceClient {
    async fn daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, AnalysisError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let period1 = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        let period2 = end.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        match (period1, period2) {
            (Some(p1), Some(p2)) => self.get_daily_closes(symbol, p1, p2).await,
            _ => Err(AnalysisError::Provider(format!(
                "Invalid range {} .. {}",
                start, end
            ))),
        }
    }
}

/// Extract `(date, close)` pairs from a chart response. Null closes are kept as `None`.
pub fn parse_chart_closes(json: &serde_json::Value) -> Result<Vec<RawObservation>, AnalysisError> {
    let chart = match json
        .get("chart")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
    {
        Some(chart) => chart,
        None => {
            if let Some(err) = json.get("chart").and_then(|v| v.get("error")).filter(|e| !e.is_null()) {
                tracing::debug!("Yahoo chart error: {}", err);
            }
            return Ok(Vec::new());
        }
    };

    // No trading days in range: the result carries no timestamp array.
    let timestamps = match chart.get("timestamp").and_then(|v| v.as_array()) {
        Some(ts) => ts,
        None => return Ok(Vec::new()),
    };

    let closes = chart
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|q| q.get("close"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| AnalysisError::Provider("No close prices".to_string()))?;

    let mut observations = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let ts = ts
            .as_i64()
            .ok_or_else(|| AnalysisError::Provider("Invalid timestamp".to_string()))?;
        let date = DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| AnalysisError::Provider("Invalid timestamp".to_string()))?
            .date_naive();
        let close = closes.get(i).and_then(|v| v.as_f64());
        observations.push(RawObservation { date, close });
    }

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_chart_closes_keeps_nulls() {
        let body = json!({
            "chart": {
                "result": [{
                    "timestamp": [1672756200, 1672842600, 1672929000],
                    "indicators": {"quote": [{"close": [125.07, null, 126.36]}]}
                }],
                "error": null
            }
        });

        let obs = parse_chart_closes(&body).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].date, date("2023-01-03"));
        assert_eq!(obs[0].close, Some(125.07));
        assert_eq!(obs[1].close, None);
        assert_eq!(obs[2].date, date("2023-01-05"));
    }

    #[test]
    fn test_parse_chart_without_timestamps_is_empty() {
        let body = json!({
            "chart": {"result": [{"meta": {}, "indicators": {"quote": [{}]}}], "error": null}
        });
        assert!(parse_chart_closes(&body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_chart_error_is_empty() {
        let body = json!({
            "chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}
        });
        assert!(parse_chart_closes(&body).unwrap().is_empty());
    }

    #[test]
    fn test_parse_chart_missing_closes_is_error() {
        let body = json!({
            "chart": {"result": [{"timestamp": [1672756200], "indicators": {"quote": [{}]}}]}
        });
        assert!(matches!(parse_chart_closes(&body), Err(AnalysisError::Provider(_))));
    }

    #[tokio::test]
    #[ignore] // Hits the live Yahoo endpoint
    async fn test_daily_closes_live() {
        let client = YahooFinanceClient::new();
        let obs = client
            .daily_closes("SPY", date("2023-01-01"), date("2023-03-02"))
            .await
            .unwrap();
        assert!(obs.len() > 30);
    }
}
