use analysis_core::{Clock, PricePoint, PriceSeries, PriceSource, RawObservation};
use chrono::{Days, NaiveDate};
use std::sync::Arc;

use crate::cache::{CacheKey, ResultCache};

/// Trailing window used when the requested range comes back empty.
pub const FALLBACK_DAYS: u64 = 60;

/// Cached daily-close retrieval with a recent-history fallback.
///
/// Never fails: provider errors and empty ranges both surface as an empty
/// series so callers decide what missing data means.
pub struct PriceFetcher {
    source: Arc<dyn PriceSource>,
    cache: ResultCache,
    clock: Arc<dyn Clock>,
}

impl PriceFetcher {
    pub fn new(source: Arc<dyn PriceSource>, cache: ResultCache, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            cache,
            clock,
        }
    }

    pub async fn fetch(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> PriceSeries {
        let key = CacheKey::new(symbol, start, end);
        if let Some(series) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {} ({} points)", symbol, series.len());
            return series;
        }

        let fetched = self.fetch_uncached(symbol, start, end).await;
        // Genuinely empty results are cached too; anything touched by a provider error is not.
        if !fetched.provider_failed {
            self.cache.set(key, fetched.series.clone());
        }
        fetched.series
    }

    async fn fetch_uncached(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Fetched {
        let mut provider_failed = false;

        if let (Some(start), Some(end)) = (start, end) {
            // The user's end date is inclusive, the provider's is not.
            let series = match end.checked_add_days(Days::new(1)) {
                Some(end_exclusive) => self.request(symbol, start, end_exclusive).await,
                None => Some(PriceSeries::empty(symbol)),
            };
            match series {
                Some(series) if !series.is_empty() => {
                    return Fetched {
                        series,
                        provider_failed: false,
                    }
                }
                Some(_) => {}
                None => provider_failed = true,
            }
            tracing::info!(
                "No data for {} between {} and {}, falling back to last {} days",
                symbol,
                start,
                end,
                FALLBACK_DAYS
            );
        }

        match self.recent(symbol).await {
            Some(series) => Fetched {
                series,
                provider_failed,
            },
            None => Fetched {
                series: PriceSeries::empty(symbol),
                provider_failed: true,
            },
        }
    }

    async fn recent(&self, symbol: &str) -> Option<PriceSeries> {
        let today = self.clock.today();
        let start = today.checked_sub_days(Days::new(FALLBACK_DAYS));
        let end = today.checked_add_days(Days::new(1));
        match (start, end) {
            (Some(start), Some(end)) => self.request(symbol, start, end).await,
            _ => Some(PriceSeries::empty(symbol)),
        }
    }

    /// `None` when the provider call itself failed.
    async fn request(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Option<PriceSeries> {
        match self.source.daily_closes(symbol, start, end).await {
            Ok(raw) => Some(clean_observations(symbol, raw)),
            Err(e) => {
                tracing::warn!("Error fetching {}: {}", symbol, e);
                None
            }
        }
    }
}

struct Fetched {
    series: PriceSeries,
    provider_failed: bool,
}

/// Drop missing or non-finite closes, sort by date and keep the last
/// observation for any repeated date.
pub fn clean_observations(symbol: &str, raw: Vec<RawObservation>) -> PriceSeries {
    let mut points: Vec<PricePoint> = raw
        .into_iter()
        .filter_map(|obs| {
            obs.close
                .filter(|close| close.is_finite())
                .map(|close| PricePoint {
                    date: obs.date,
                    close,
                })
        })
        .collect();
    points.sort_by_key(|p| p.date);

    let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
    for point in points {
        match deduped.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => deduped.push(point),
        }
    }

    PriceSeries::new(symbol, deduped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_clean_drops_missing_and_non_finite() {
        let raw = vec![
            RawObservation { date: date(2023, 1, 3), close: Some(125.07) },
            RawObservation { date: date(2023, 1, 4), close: None },
            RawObservation { date: date(2023, 1, 5), close: Some(f64::NAN) },
            RawObservation { date: date(2023, 1, 6), close: Some(129.62) },
        ];

        let series = clean_observations("AAPL", raw);
        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.dates(), vec![date(2023, 1, 3), date(2023, 1, 6)]);
    }

    #[test]
    fn test_clean_sorts_and_keeps_last_duplicate() {
        let raw = vec![
            RawObservation { date: date(2023, 1, 5), close: Some(3.0) },
            RawObservation { date: date(2023, 1, 3), close: Some(1.0) },
            RawObservation { date: date(2023, 1, 5), close: Some(4.0) },
        ];

        let series = clean_observations("AAPL", raw);
        assert_eq!(series.closes(), vec![1.0, 4.0]);
    }
}
