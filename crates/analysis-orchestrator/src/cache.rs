use analysis_core::{Clock, PriceSeries};
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Fetch parameters identifying a cached series. Absent bounds key as "".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub symbol: String,
    pub start: String,
    pub end: String,
}

impl CacheKey {
    pub fn new(symbol: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            symbol: symbol.to_string(),
            start: start.map(|d| d.to_string()).unwrap_or_default(),
            end: end.map(|d| d.to_string()).unwrap_or_default(),
        }
    }
}

struct CacheEntry<T> {
    data: T,
    expires_at: DateTime<Utc>,
}

/// Price series memoized per key for a fixed TTL.
///
/// Concurrent misses on the same key each go to the provider; the last write wins.
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry<PriceSeries>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let ttl = chrono::Duration::from_std(ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_CACHE_TTL.as_secs() as i64));
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<PriceSeries> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if now <= entry.expires_at => return Some(entry.data.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| now > entry.expires_at);
        }
        None
    }

    pub fn set(&self, key: CacheKey, series: PriceSeries) {
        self.entries.insert(
            key,
            CacheEntry {
                data: series,
                expires_at: self.clock.now() + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::PricePoint;
    use chrono::TimeZone;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2023, 3, 1, 12, 0, 0).unwrap()))
    }

    fn series(symbol: &str) -> PriceSeries {
        PriceSeries::new(
            symbol,
            vec![PricePoint {
                date: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
                close: 125.07,
            }],
        )
    }

    fn key(symbol: &str) -> CacheKey {
        CacheKey::new(
            symbol,
            NaiveDate::from_ymd_opt(2023, 1, 1),
            NaiveDate::from_ymd_opt(2023, 3, 1),
        )
    }

    #[test]
    fn test_hit_within_ttl() {
        let clock = clock();
        let cache = ResultCache::new(Duration::from_secs(300), clock.clone());
        cache.set(key("AAPL"), series("AAPL"));

        clock.advance(chrono::Duration::seconds(300));
        assert_eq!(cache.get(&key("AAPL")), Some(series("AAPL")));
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let clock = clock();
        let cache = ResultCache::new(Duration::from_secs(300), clock.clone());
        cache.set(key("AAPL"), series("AAPL"));

        clock.advance(chrono::Duration::seconds(301));
        assert_eq!(cache.get(&key("AAPL")), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entries_expire_independently() {
        let clock = clock();
        let cache = ResultCache::new(Duration::from_secs(300), clock.clone());
        cache.set(key("AAPL"), series("AAPL"));
        clock.advance(chrono::Duration::seconds(200));
        cache.set(key("MSFT"), series("MSFT"));
        clock.advance(chrono::Duration::seconds(200));

        assert!(cache.get(&key("AAPL")).is_none());
        assert!(cache.get(&key("MSFT")).is_some());
    }

    #[test]
    fn test_keys_distinguish_bounds() {
        let clock = clock();
        let cache = ResultCache::new(Duration::from_secs(300), clock);
        cache.set(key("AAPL"), series("AAPL"));

        assert!(cache.get(&CacheKey::new("AAPL", None, None)).is_none());
        assert_eq!(CacheKey::new("AAPL", None, None).start, "");
    }

    #[test]
    fn test_overwrite_refreshes_expiry() {
        let clock = clock();
        let cache = ResultCache::new(Duration::from_secs(300), clock.clone());
        cache.set(key("AAPL"), series("AAPL"));
        clock.advance(chrono::Duration::seconds(250));
        cache.set(key("AAPL"), series("AAPL"));
        clock.advance(chrono::Duration::seconds(250));

        assert!(cache.get(&key("AAPL")).is_some());
        assert_eq!(cache.len(), 1);
    }
}
