use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{AnalysisError, RawObservation};

/// Market-data provider able to return daily close history.
///
/// `end` is exclusive. Observations may carry a missing close; cleaning is the
/// caller's job.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawObservation>, AnalysisError>;
}

/// Source of "now" for TTL bookkeeping and relative date windows.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
